//! modcat - workflow catalog synchronizer
//!
//! Periodically synchronizes a catalog of reusable workflow modules and
//! top-level pipelines published across a GitHub organization into SQLite,
//! and reconciles which modules each pipeline currently declares.

pub mod config;
pub mod error;
pub mod github;
pub mod models;
pub mod store;
pub mod sync;
