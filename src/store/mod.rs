//! Catalog storage using SQLite
//!
//! This module handles the relational side of the sync:
//! - Idempotent schema bootstrap
//! - Upsert-by-name for modules and pipelines (parameterized throughout)
//! - Set-reconciled pipeline-module links

mod schema;

pub use schema::*;

use crate::error::Result;
use crate::models::{ModuleRecord, ModuleRow, PipelineRecord, PipelineRow};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

/// Outcome of an upsert against a natural key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Row counts per catalog table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogCounts {
    pub modules: i64,
    pub pipelines: i64,
    pub links: i64,
}

/// Catalog database handle
#[derive(Clone)]
pub struct CatalogDb {
    pool: SqlitePool,
}

impl CatalogDb {
    /// Open (creating if missing) the catalog database
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Create the catalog tables if they do not already exist
    pub async fn ensure_schema(&self) -> Result<()> {
        let tables = [
            ("modules", MODULES_TABLE_SQL),
            ("pipelines", PIPELINES_TABLE_SQL),
            ("pipeline_module_links", LINKS_TABLE_SQL),
        ];
        for (name, sql) in tables {
            sqlx::query(sql).execute(&self.pool).await?;
            info!("`{}` table ensured", name);
        }
        for sql in INDEX_SQL {
            sqlx::query(sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    // ===== Module operations =====

    /// Upsert a module by name. An existing row is updated in place with
    /// `date_added` left untouched; a new row stamps both timestamps.
    pub async fn upsert_module(&self, record: &ModuleRecord) -> Result<UpsertOutcome> {
        let now = Utc::now().to_rfc3339();
        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM modules WHERE name = ?")
            .bind(&record.name)
            .fetch_optional(&self.pool)
            .await?;

        if existing.is_some() {
            sqlx::query(
                r#"
                UPDATE modules SET
                    github_sha = ?, github_path = ?, api_url = ?, description = ?,
                    keywords = ?, tools = ?, input = ?, output = ?, authors = ?,
                    date_updated = ?
                WHERE name = ?
                "#,
            )
            .bind(&record.github_sha)
            .bind(&record.github_path)
            .bind(&record.api_url)
            .bind(&record.description)
            .bind(&record.keywords)
            .bind(&record.tools)
            .bind(&record.input)
            .bind(&record.output)
            .bind(&record.authors)
            .bind(&now)
            .bind(&record.name)
            .execute(&self.pool)
            .await?;
            Ok(UpsertOutcome::Updated)
        } else {
            sqlx::query(
                r#"
                INSERT INTO modules
                    (name, github_sha, github_path, api_url, description, keywords,
                     tools, input, output, authors, date_added, date_updated)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.name)
            .bind(&record.github_sha)
            .bind(&record.github_path)
            .bind(&record.api_url)
            .bind(&record.description)
            .bind(&record.keywords)
            .bind(&record.tools)
            .bind(&record.input)
            .bind(&record.output)
            .bind(&record.authors)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await?;
            Ok(UpsertOutcome::Inserted)
        }
    }

    /// Get a module by name
    pub async fn get_module(&self, name: &str) -> Result<Option<ModuleRow>> {
        let module = sqlx::query_as::<_, ModuleRow>("SELECT * FROM modules WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(module)
    }

    /// Resolve a module name to its surrogate key
    pub async fn module_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM modules WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    // ===== Pipeline operations =====

    /// Upsert a pipeline by name, same timestamp contract as modules
    pub async fn upsert_pipeline(&self, record: &PipelineRecord) -> Result<UpsertOutcome> {
        let now = Utc::now().to_rfc3339();
        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM pipelines WHERE name = ?")
            .bind(&record.name)
            .fetch_optional(&self.pool)
            .await?;

        if existing.is_some() {
            sqlx::query(
                r#"
                UPDATE pipelines SET
                    github_id = ?, html_url = ?, description = ?,
                    gh_created_at = ?, gh_updated_at = ?, gh_pushed_at = ?,
                    stargazers_count = ?, watchers_count = ?, forks_count = ?,
                    open_issues_count = ?, open_pr_count = ?, topics = ?,
                    default_branch = ?, pipeline_type = ?, archived = ?,
                    first_release_date = ?, last_release_date = ?
                WHERE name = ?
                "#,
            )
            .bind(record.github_id)
            .bind(&record.html_url)
            .bind(&record.description)
            .bind(&record.gh_created_at)
            .bind(&record.gh_updated_at)
            .bind(&record.gh_pushed_at)
            .bind(record.stargazers_count)
            .bind(record.watchers_count)
            .bind(record.forks_count)
            .bind(record.open_issues_count)
            .bind(record.open_pr_count)
            .bind(&record.topics)
            .bind(&record.default_branch)
            .bind(&record.pipeline_type)
            .bind(record.archived)
            .bind(&record.first_release_date)
            .bind(&record.last_release_date)
            .bind(&record.name)
            .execute(&self.pool)
            .await?;
            Ok(UpsertOutcome::Updated)
        } else {
            sqlx::query(
                r#"
                INSERT INTO pipelines
                    (github_id, name, html_url, description,
                     gh_created_at, gh_updated_at, gh_pushed_at,
                     stargazers_count, watchers_count, forks_count,
                     open_issues_count, open_pr_count, topics,
                     default_branch, pipeline_type, archived,
                     first_release_date, last_release_date, date_added)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.github_id)
            .bind(&record.name)
            .bind(&record.html_url)
            .bind(&record.description)
            .bind(&record.gh_created_at)
            .bind(&record.gh_updated_at)
            .bind(&record.gh_pushed_at)
            .bind(record.stargazers_count)
            .bind(record.watchers_count)
            .bind(record.forks_count)
            .bind(record.open_issues_count)
            .bind(record.open_pr_count)
            .bind(&record.topics)
            .bind(&record.default_branch)
            .bind(&record.pipeline_type)
            .bind(record.archived)
            .bind(&record.first_release_date)
            .bind(&record.last_release_date)
            .bind(&now)
            .execute(&self.pool)
            .await?;
            Ok(UpsertOutcome::Inserted)
        }
    }

    /// Get a pipeline by name
    pub async fn get_pipeline(&self, name: &str) -> Result<Option<PipelineRow>> {
        let pipeline = sqlx::query_as::<_, PipelineRow>("SELECT * FROM pipelines WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(pipeline)
    }

    /// All pipelines of a given type, ordered case-insensitively by name
    pub async fn pipelines_by_type(&self, pipeline_type: &str) -> Result<Vec<PipelineRow>> {
        let pipelines = sqlx::query_as::<_, PipelineRow>(
            "SELECT * FROM pipelines WHERE pipeline_type = ? ORDER BY LOWER(name)",
        )
        .bind(pipeline_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(pipelines)
    }

    // ===== Link operations =====

    /// Replace a pipeline's link set with the given module ids.
    /// Runs in one transaction so a crash never leaves a half-written set.
    pub async fn replace_pipeline_links(
        &self,
        pipeline_id: i64,
        module_ids: &[i64],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM pipeline_module_links WHERE pipeline_id = ?")
            .bind(pipeline_id)
            .execute(&mut *tx)
            .await?;
        for module_id in module_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO pipeline_module_links (pipeline_id, module_id) VALUES (?, ?)",
            )
            .bind(pipeline_id)
            .bind(module_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Module ids currently linked to a pipeline
    pub async fn linked_module_ids(&self, pipeline_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT module_id FROM pipeline_module_links WHERE pipeline_id = ? ORDER BY module_id",
        )
        .bind(pipeline_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Row counts for the status report
    pub async fn counts(&self) -> Result<CatalogCounts> {
        let modules: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM modules")
            .fetch_one(&self.pool)
            .await?;
        let pipelines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pipelines")
            .fetch_one(&self.pool)
            .await?;
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pipeline_module_links")
            .fetch_one(&self.pool)
            .await?;
        Ok(CatalogCounts {
            modules,
            pipelines,
            links,
        })
    }
}
