//! Remote API payloads and catalog row types

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::str::FromStr;

// ===== Remote API payloads =====

/// Recursive git tree listing of a repository
#[derive(Debug, Clone, Deserialize)]
pub struct TreeResponse {
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

/// One entry of a git tree listing
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(default)]
    pub url: String,
}

/// A file fetched through the content or blob API
#[derive(Debug, Clone, Deserialize)]
pub struct RepoFile {
    pub sha: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: String,
}

/// One repository from the organization listing.
/// Upstream fields are frequently null or absent; everything non-identity
/// is therefore optional or defaulted.
#[derive(Debug, Clone, Deserialize)]
pub struct OrgRepo {
    pub id: i64,
    pub name: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stargazers_count: i64,
    #[serde(default)]
    pub forks_count: i64,
    #[serde(default)]
    pub open_issues_count: i64,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub archived: bool,
}

/// One release from the releases listing
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Module metadata file (`meta.yml`) as published in the modules repository
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: StringOrList,
    #[serde(default)]
    pub authors: StringOrList,
    #[serde(default)]
    pub tools: Value,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub output: Value,
}

/// A metadata field that may arrive as a scalar, a list, or a key that is
/// present but empty (`keywords:` with nothing under it parses as null)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
    Null,
}

impl Default for StringOrList {
    fn default() -> Self {
        StringOrList::Many(Vec::new())
    }
}

impl StringOrList {
    /// Semicolon-join lists; scalars pass through unchanged; empty keys
    /// normalize to the empty string.
    pub fn join(&self) -> String {
        match self {
            StringOrList::One(s) => s.clone(),
            StringOrList::Many(items) => items.join(";"),
            StringOrList::Null => String::new(),
        }
    }
}

/// Committed dependency lock file (`modules.json`) of a pipeline
#[derive(Debug, Clone, Deserialize)]
pub struct LockFile {
    #[serde(default)]
    pub repos: BTreeMap<String, Value>,
}

impl LockFile {
    /// Module names declared under the given repository namespace,
    /// or `None` when the namespace is absent.
    pub fn declared_modules(&self, namespace: &str) -> Option<Vec<String>> {
        let map = self.repos.get(namespace)?.as_object()?;
        Some(map.keys().cloned().collect())
    }
}

// ===== Catalog rows =====

/// Pipeline classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineType {
    Pipelines,
    CoreRepos,
}

impl std::fmt::Display for PipelineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineType::Pipelines => write!(f, "pipelines"),
            PipelineType::CoreRepos => write!(f, "core_repos"),
        }
    }
}

impl FromStr for PipelineType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pipelines" => Ok(PipelineType::Pipelines),
            "core_repos" => Ok(PipelineType::CoreRepos),
            _ => Err(Error::Config(format!("Unknown pipeline type: {}", s))),
        }
    }
}

/// A module catalog record ready to be upserted by `name`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub name: String,
    pub github_sha: String,
    pub github_path: String,
    pub api_url: String,
    pub description: Option<String>,
    pub keywords: String,
    /// Opaque structured documents, stored as serialized JSON
    pub tools: String,
    pub input: String,
    pub output: String,
    pub authors: String,
}

/// A stored module row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ModuleRow {
    pub id: i64,
    pub name: String,
    pub github_sha: String,
    pub github_path: String,
    pub api_url: String,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub tools: String,
    pub input: String,
    pub output: String,
    pub authors: String,
    pub date_added: String,
    pub date_updated: String,
}

/// A pipeline catalog record ready to be upserted by `name`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub github_id: i64,
    pub name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub gh_created_at: String,
    pub gh_updated_at: String,
    pub gh_pushed_at: String,
    pub stargazers_count: i64,
    pub watchers_count: i64,
    pub forks_count: i64,
    pub open_issues_count: i64,
    pub open_pr_count: i64,
    pub topics: String,
    pub default_branch: String,
    pub pipeline_type: String,
    pub archived: bool,
    pub first_release_date: Option<String>,
    pub last_release_date: Option<String>,
}

/// A stored pipeline row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PipelineRow {
    pub id: i64,
    pub github_id: i64,
    pub name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub gh_created_at: String,
    pub gh_updated_at: String,
    pub gh_pushed_at: String,
    pub stargazers_count: i64,
    pub watchers_count: i64,
    pub forks_count: i64,
    pub open_issues_count: i64,
    pub open_pr_count: i64,
    pub topics: Option<String>,
    pub default_branch: String,
    pub pipeline_type: String,
    pub archived: bool,
    pub first_release_date: Option<String>,
    pub last_release_date: Option<String>,
    pub date_added: String,
}
