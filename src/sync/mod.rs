//! Catalog synchronization procedures and run reporting
//!
//! Module sync and pipeline sync are independent of each other; link
//! reconciliation reads the primary keys both produce and must run last.

pub mod links;
pub mod modules;
pub mod pipelines;

pub use links::*;
pub use modules::*;
pub use pipelines::*;

use crate::config::Config;
use crate::error::Result;
use crate::github::GithubClient;
use crate::store::CatalogDb;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A record whose write was skipped, with the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub name: String,
    pub reason: String,
}

/// Per-catalog outcome counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// Records seen upstream
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: Vec<SkippedRecord>,
    /// Set when the whole procedure failed before producing records
    pub failed: Option<String>,
}

impl SyncStats {
    pub fn skip(&mut self, name: &str, reason: impl ToString) {
        self.skipped.push(SkippedRecord {
            name: name.to_string(),
            reason: reason.to_string(),
        });
    }

    fn failed(error: impl ToString) -> Self {
        Self {
            failed: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// Link reconciliation outcome counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkStats {
    pub pipelines_checked: usize,
    /// No lock file, or one that declares nothing under the namespace
    pub pipelines_without_lock_file: usize,
    /// Lock file fetch or parse failed for this pipeline
    pub pipelines_with_errors: usize,
    pub links_written: usize,
    /// Declared module names with no catalog row
    pub modules_not_found: Vec<String>,
    pub failed: Option<String>,
}

impl LinkStats {
    fn failed(error: impl ToString) -> Self {
        Self {
            failed: Some(error.to_string()),
            ..Self::default()
        }
    }
}

/// Aggregate report for one full synchronization run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: String,
    pub finished_at: String,
    pub modules: SyncStats,
    pub pipelines: SyncStats,
    pub links: LinkStats,
}

/// Run the full synchronization: both catalog refreshes, then link
/// reconciliation. A failed procedure is recorded in the report and does
/// not abort the rest of the run.
pub async fn run_full_sync(
    config: &Config,
    client: &GithubClient,
    db: &CatalogDb,
) -> Result<RunReport> {
    let started_at = Utc::now().to_rfc3339();
    info!("Updating catalog details - {}", started_at);

    let modules = match sync_modules(config, client, db).await {
        Ok(stats) => stats,
        Err(e) => {
            warn!("Module catalog sync failed: {}", e);
            SyncStats::failed(e)
        }
    };

    let pipelines = match sync_pipelines(config, client, db).await {
        Ok(stats) => stats,
        Err(e) => {
            warn!("Pipeline catalog sync failed: {}", e);
            SyncStats::failed(e)
        }
    };

    let links = match reconcile_links(config, client, db).await {
        Ok(stats) => stats,
        Err(e) => {
            warn!("Link reconciliation failed: {}", e);
            LinkStats::failed(e)
        }
    };

    let finished_at = Utc::now().to_rfc3339();
    info!("Catalog update done - {}", finished_at);

    Ok(RunReport {
        started_at,
        finished_at,
        modules,
        pipelines,
        links,
    })
}

/// Print one catalog's counters
pub fn print_sync_stats(label: &str, stats: &SyncStats) {
    if let Some(error) = &stats.failed {
        println!("✗ {} sync failed: {}", label, error);
        return;
    }
    println!("✓ {} sync complete", label);
    println!("  Fetched:  {}", stats.fetched);
    println!("  Inserted: {}", stats.inserted);
    println!("  Updated:  {}", stats.updated);
    println!("  Skipped:  {}", stats.skipped.len());
    for skipped in &stats.skipped {
        println!("    - {}: {}", skipped.name, skipped.reason);
    }
}

/// Print link reconciliation counters
pub fn print_link_stats(stats: &LinkStats) {
    if let Some(error) = &stats.failed {
        println!("✗ link reconciliation failed: {}", error);
        return;
    }
    println!("✓ link reconciliation complete");
    println!("  Pipelines checked:   {}", stats.pipelines_checked);
    println!(
        "  Without lock file:   {}",
        stats.pipelines_without_lock_file
    );
    println!("  Fetch/parse errors:  {}", stats.pipelines_with_errors);
    println!("  Links written:       {}", stats.links_written);
    println!("  Modules not found:   {}", stats.modules_not_found.len());
    for name in &stats.modules_not_found {
        println!("    - {}", name);
    }
}

/// Print the aggregate run report
pub fn print_run_report(report: &RunReport) {
    println!("Run started  {}", report.started_at);
    print_sync_stats("module", &report.modules);
    print_sync_stats("pipeline", &report.pipelines);
    print_link_stats(&report.links);
    println!("Run finished {}", report.finished_at);
}
