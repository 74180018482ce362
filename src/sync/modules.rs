//! Module catalog refresh
//!
//! Walks the fixed modules repository tree for metadata files, fetches and
//! parses each one, and upserts one catalog row per module name.

use crate::config::Config;
use crate::error::Result;
use crate::github::{decode_content, GithubClient};
use crate::models::{ModuleMeta, ModuleRecord, RepoFile, TreeEntry};
use crate::store::{CatalogDb, UpsertOutcome};
use crate::sync::SyncStats;
use tracing::{info, warn};

/// Refresh the module catalog from the modules repository
pub async fn sync_modules(
    config: &Config,
    client: &GithubClient,
    db: &CatalogDb,
) -> Result<SyncStats> {
    let catalog = &config.catalog;
    info!(
        "Refreshing module catalog from {}/{}@{}",
        catalog.org, catalog.modules_repo, catalog.modules_ref
    );

    let tree = client
        .repo_tree(&catalog.org, &catalog.modules_repo, &catalog.modules_ref)
        .await?;
    if tree.truncated {
        warn!("Tree listing was truncated upstream; some modules may be missed this run");
    }

    let dir_prefix = format!("{}/", catalog.modules_dir.trim_end_matches('/'));
    let mut stats = SyncStats::default();

    for entry in &tree.tree {
        if !(entry.path.starts_with(&dir_prefix) && entry.path.ends_with(&catalog.meta_filename)) {
            continue;
        }
        stats.fetched += 1;

        let file: RepoFile = match client.get_json(&entry.url).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Could not fetch {}: {}", entry.url, e);
                stats.skip(&entry.path, &e);
                continue;
            }
        };

        let record = match module_record(entry, &file) {
            Ok(record) => record,
            Err(e) => {
                warn!("Could not parse {}: {}", entry.path, e);
                stats.skip(&entry.path, &e);
                continue;
            }
        };

        match db.upsert_module(&record).await {
            Ok(UpsertOutcome::Inserted) => stats.inserted += 1,
            Ok(UpsertOutcome::Updated) => stats.updated += 1,
            Err(e) => {
                warn!("Could not store module {}: {}", record.name, e);
                stats.skip(&record.name, &e);
            }
        }
    }

    info!(
        "Module catalog refreshed: {} inserted, {} updated, {} skipped",
        stats.inserted,
        stats.updated,
        stats.skipped.len()
    );
    Ok(stats)
}

/// Decode and parse one metadata file into a catalog record.
/// Keywords and authors arriving as lists are semicolon-joined; absent
/// fields become empty strings.
fn module_record(entry: &TreeEntry, file: &RepoFile) -> Result<ModuleRecord> {
    let text = decode_content(&file.content)?;
    let meta: ModuleMeta = serde_yaml::from_str(&text)?;
    Ok(ModuleRecord {
        name: meta.name,
        github_sha: file.sha.clone(),
        github_path: entry.path.clone(),
        api_url: file.url.clone(),
        description: meta.description,
        keywords: meta.keywords.join(),
        tools: serde_json::to_string(&meta.tools)?,
        input: serde_json::to_string(&meta.input)?,
        output: serde_json::to_string(&meta.output)?,
        authors: meta.authors.join(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn encode(text: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(text)
    }

    fn test_file(content: &str) -> RepoFile {
        RepoFile {
            sha: "abc123".to_string(),
            url: "https://api.example.com/blobs/abc123".to_string(),
            content: encode(content),
            encoding: "base64".to_string(),
        }
    }

    fn test_entry(path: &str) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            url: "https://api.example.com/blobs/abc123".to_string(),
        }
    }

    async fn test_setup(server: &MockServer) -> (Config, GithubClient, CatalogDb, tempfile::TempDir) {
        let mut config = Config::default();
        config.github.api_url = server.uri();
        config.github.retry_backoff_ms = 1;
        config.github.timeout_secs = 5;
        config.github.token_env = "MODCAT_TEST_TOKEN_UNSET".to_string();

        let client = GithubClient::new(&config.github).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let db = CatalogDb::connect(&dir.path().join("catalog.db"))
            .await
            .unwrap();
        db.ensure_schema().await.unwrap();
        (config, client, db, dir)
    }

    #[test]
    fn test_module_record_joins_list_fields() {
        let meta = "name: fastqc\ndescription: Run quality control\nkeywords:\n  - qc\n  - fastq\nauthors:\n  - '@alice'\n  - '@bob'\ntools:\n  fastqc:\n    description: A QC tool\n";
        let record = module_record(&test_entry("modules/fastqc/meta.yml"), &test_file(meta)).unwrap();

        assert_eq!(record.name, "fastqc");
        assert_eq!(record.keywords, "qc;fastq");
        assert_eq!(record.authors, "@alice;@bob");
        assert_eq!(record.github_path, "modules/fastqc/meta.yml");
        let tools: serde_json::Value = serde_json::from_str(&record.tools).unwrap();
        assert_eq!(tools["fastqc"]["description"], json!("A QC tool"));
    }

    #[test]
    fn test_module_record_passes_scalars_and_tolerates_absent() {
        let meta = "name: multiqc\nkeywords: reporting\n";
        let record = module_record(&test_entry("modules/multiqc/meta.yml"), &test_file(meta)).unwrap();
        assert_eq!(record.keywords, "reporting");
        // Absent authors must not crash normalization
        assert_eq!(record.authors, "");
    }

    #[test]
    fn test_module_record_tolerates_empty_list_keys() {
        // `keywords:` with nothing under it parses as null; the module
        // must still be cataloged with empty fields, not skipped
        let meta = "name: samtools\nkeywords:\nauthors:\n";
        let record =
            module_record(&test_entry("modules/samtools/meta.yml"), &test_file(meta)).unwrap();
        assert_eq!(record.name, "samtools");
        assert_eq!(record.keywords, "");
        assert_eq!(record.authors, "");
    }

    #[tokio::test]
    async fn test_sync_modules_is_idempotent() {
        let server = MockServer::start().await;
        let (config, client, db, _dir) = test_setup(&server).await;

        let blob_url = format!("{}/blobs/fastqc", server.uri());
        Mock::given(method("GET"))
            .and(path("/repos/nf-core/modules/git/trees/master"))
            .and(query_param("recursive", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tree": [
                    {"path": "modules/fastqc/meta.yml", "url": blob_url},
                    {"path": "modules/fastqc/main.nf", "url": format!("{}/blobs/other", server.uri())},
                    {"path": "subworkflows/align/meta.yml", "url": format!("{}/blobs/sub", server.uri())}
                ],
                "truncated": false
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/blobs/fastqc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "abc123",
                "url": blob_url,
                "content": encode("name: fastqc\nkeywords:\n  - qc\nauthors:\n  - '@alice'\n"),
                "encoding": "base64"
            })))
            .mount(&server)
            .await;

        let first = sync_modules(&config, &client, &db).await.unwrap();
        assert_eq!(first.fetched, 1);
        assert_eq!(first.inserted, 1);
        assert_eq!(first.updated, 0);

        let row_before = db.get_module("fastqc").await.unwrap().unwrap();

        let second = sync_modules(&config, &client, &db).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 1);

        let row_after = db.get_module("fastqc").await.unwrap().unwrap();
        assert_eq!(row_after.date_added, row_before.date_added);
        assert_eq!(db.counts().await.unwrap().modules, 1);
    }

    #[tokio::test]
    async fn test_unparseable_metadata_is_skipped_not_fatal() {
        let server = MockServer::start().await;
        let (config, client, db, _dir) = test_setup(&server).await;

        Mock::given(method("GET"))
            .and(path("/repos/nf-core/modules/git/trees/master"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tree": [
                    {"path": "modules/broken/meta.yml", "url": format!("{}/blobs/broken", server.uri())},
                    {"path": "modules/good/meta.yml", "url": format!("{}/blobs/good", server.uri())}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/blobs/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "bad", "url": "u", "content": "!!!not-base64!!!", "encoding": "base64"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/blobs/good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sha": "ok", "url": "u", "content": encode("name: good\n"), "encoding": "base64"
            })))
            .mount(&server)
            .await;

        let stats = sync_modules(&config, &client, &db).await.unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.skipped.len(), 1);
        assert_eq!(stats.skipped[0].name, "modules/broken/meta.yml");
        assert!(db.get_module("good").await.unwrap().is_some());
    }
}
