//! Pipeline-module link reconciliation
//!
//! For every repository classified as a pipeline, fetches its committed
//! dependency lock file, resolves each declared module name to a catalog
//! row, and replaces the pipeline's association set with the current
//! declarations. Must run after both catalog refreshes, since it reads the
//! primary keys they produce.

use crate::config::Config;
use crate::error::Result;
use crate::github::{decode_content, GithubClient};
use crate::models::{LockFile, PipelineType, RepoFile};
use crate::store::CatalogDb;
use crate::sync::LinkStats;
use tracing::{debug, info, warn};

/// Reconcile pipeline-module links against each pipeline's lock file
pub async fn reconcile_links(
    config: &Config,
    client: &GithubClient,
    db: &CatalogDb,
) -> Result<LinkStats> {
    let catalog = &config.catalog;
    let namespace = catalog.modules_namespace();
    info!("Reconciling pipeline-module links ({})", namespace);

    let pipelines = db
        .pipelines_by_type(&PipelineType::Pipelines.to_string())
        .await?;
    let mut stats = LinkStats::default();

    for pipeline in &pipelines {
        stats.pipelines_checked += 1;

        let file = match client
            .file_contents(&catalog.org, &pipeline.name, &catalog.lock_file)
            .await
        {
            Ok(Some(file)) => file,
            Ok(None) => {
                debug!("{} has no {}", pipeline.name, catalog.lock_file);
                stats.pipelines_without_lock_file += 1;
                continue;
            }
            Err(e) => {
                warn!(
                    "Could not fetch {} for {}: {}",
                    catalog.lock_file, pipeline.name, e
                );
                stats.pipelines_with_errors += 1;
                continue;
            }
        };

        let declared = match declared_modules(&file, &namespace) {
            Ok(Some(names)) => names,
            Ok(None) => {
                debug!("{} does not declare modules under {}", pipeline.name, namespace);
                stats.pipelines_without_lock_file += 1;
                continue;
            }
            Err(e) => {
                warn!(
                    "Could not parse {} for {}: {}",
                    catalog.lock_file, pipeline.name, e
                );
                stats.pipelines_with_errors += 1;
                continue;
            }
        };

        let mut module_ids = Vec::new();
        for declared_name in &declared {
            // Lock files use slash-separated names; the module table joins
            // path segments with underscores
            let module_name = declared_name.replace('/', "_");
            match db.module_id_by_name(&module_name).await? {
                Some(id) => module_ids.push(id),
                None => {
                    info!("No module named {} found", module_name);
                    stats.modules_not_found.push(module_name);
                }
            }
        }

        // Distinct declared names can collapse to the same module after
        // normalization; dedup so the counter matches rows actually written
        module_ids.sort_unstable();
        module_ids.dedup();

        if let Err(e) = db.replace_pipeline_links(pipeline.id, &module_ids).await {
            warn!("Could not store links for {}: {}", pipeline.name, e);
            continue;
        }
        stats.links_written += module_ids.len();
    }

    info!(
        "Links reconciled: {} written across {} pipelines, {} declared modules unresolved",
        stats.links_written,
        stats.pipelines_checked,
        stats.modules_not_found.len()
    );
    Ok(stats)
}

/// Extract declared module names for the given namespace, or `None` when
/// the lock file does not mention it
fn declared_modules(file: &RepoFile, namespace: &str) -> Result<Option<Vec<String>>> {
    let text = decode_content(&file.content)?;
    let lock: LockFile = serde_json::from_str(&text)?;
    Ok(lock.declared_modules(namespace))
}
