//! Pipeline catalog refresh
//!
//! Lists the organization's repositories, enriches each with watcher and
//! open-PR cardinalities and release dates, classifies it against the ignore
//! list, and upserts one catalog row per repository name.

use crate::config::Config;
use crate::error::Result;
use crate::github::GithubClient;
use crate::models::{OrgRepo, PipelineRecord, PipelineType};
use crate::store::{CatalogDb, UpsertOutcome};
use crate::sync::SyncStats;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Refresh the pipeline catalog for the configured organization
pub async fn sync_pipelines(
    config: &Config,
    client: &GithubClient,
    db: &CatalogDb,
) -> Result<SyncStats> {
    let catalog = &config.catalog;
    info!("Refreshing pipeline catalog for organization {}", catalog.org);

    let repos = client.org_repos(&catalog.org).await?;
    let mut stats = SyncStats::default();

    for repo in &repos {
        stats.fetched += 1;

        let record = match pipeline_record(config, client, repo).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Could not enrich {}: {}", repo.name, e);
                stats.skip(&repo.name, &e);
                continue;
            }
        };

        match db.upsert_pipeline(&record).await {
            Ok(UpsertOutcome::Inserted) => stats.inserted += 1,
            Ok(UpsertOutcome::Updated) => stats.updated += 1,
            Err(e) => {
                warn!("Could not store pipeline {}: {}", record.name, e);
                stats.skip(&record.name, &e);
            }
        }
    }

    info!(
        "Pipeline catalog refreshed: {} inserted, {} updated, {} skipped",
        stats.inserted,
        stats.updated,
        stats.skipped.len()
    );
    Ok(stats)
}

/// Classify a repository: ignore-listed names are core/infrastructure,
/// everything else is a pipeline.
pub fn classify(name: &str, ignored_repos: &[String]) -> PipelineType {
    if ignored_repos.iter().any(|ignored| ignored == name) {
        PipelineType::CoreRepos
    } else {
        PipelineType::Pipelines
    }
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.to_rfc3339()).unwrap_or_default()
}

/// Enrich one repository listing entry into a full catalog record
async fn pipeline_record(
    config: &Config,
    client: &GithubClient,
    repo: &OrgRepo,
) -> Result<PipelineRecord> {
    let org = &config.catalog.org;

    // The repo object's own watcher field mirrors stargazers upstream;
    // count the watcher collection instead.
    let watchers = client.repo_watchers(org, &repo.name).await?;
    let pulls = client.open_pulls(org, &repo.name).await?;

    // A repository with no releases 404s on /releases/latest
    let last_release_date = client
        .latest_release(org, &repo.name)
        .await?
        .and_then(|release| release.published_at);
    // The release listing is newest-first; the earliest is the final entry
    let first_release_date = client
        .releases(org, &repo.name)
        .await?
        .last()
        .and_then(|release| release.published_at);

    Ok(PipelineRecord {
        github_id: repo.id,
        name: repo.name.clone(),
        html_url: repo.html_url.clone(),
        description: repo.description.clone(),
        gh_created_at: format_date(repo.created_at),
        gh_updated_at: format_date(repo.updated_at),
        gh_pushed_at: format_date(repo.pushed_at),
        stargazers_count: repo.stargazers_count,
        watchers_count: watchers.len() as i64,
        forks_count: repo.forks_count,
        open_issues_count: repo.open_issues_count,
        open_pr_count: pulls.len() as i64,
        topics: repo.topics.join(";"),
        default_branch: repo
            .default_branch
            .clone()
            .unwrap_or_else(|| "master".to_string()),
        pipeline_type: classify(&repo.name, &config.catalog.ignored_repos).to_string(),
        archived: repo.archived,
        first_release_date: first_release_date.map(|d| d.to_rfc3339()),
        last_release_date: last_release_date.map(|d| d.to_rfc3339()),
    })
}
