//! SQLite schema definition

/// Modules: one row per reusable unit of workflow logic, keyed by name
pub const MODULES_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS modules (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL UNIQUE,
    github_sha   TEXT NOT NULL,
    github_path  TEXT NOT NULL,
    api_url      TEXT NOT NULL,
    description  TEXT,
    keywords     TEXT,
    tools        TEXT NOT NULL,
    input        TEXT NOT NULL,
    output       TEXT NOT NULL,
    authors      TEXT NOT NULL,
    date_added   TEXT NOT NULL,
    date_updated TEXT NOT NULL
)
"#;

/// Pipelines: one row per repository in the organization, keyed by name
pub const PIPELINES_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pipelines (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    github_id          INTEGER NOT NULL,
    name               TEXT NOT NULL UNIQUE,
    html_url           TEXT NOT NULL,
    description        TEXT,
    gh_created_at      TEXT NOT NULL,
    gh_updated_at      TEXT NOT NULL,
    gh_pushed_at       TEXT NOT NULL,
    stargazers_count   INTEGER NOT NULL,
    watchers_count     INTEGER NOT NULL,
    forks_count        INTEGER NOT NULL,
    open_issues_count  INTEGER NOT NULL,
    open_pr_count      INTEGER NOT NULL,
    topics             TEXT,
    default_branch     TEXT NOT NULL,
    pipeline_type      TEXT NOT NULL,
    archived           INTEGER NOT NULL,
    first_release_date TEXT,
    last_release_date  TEXT,
    date_added         TEXT NOT NULL
)
"#;

/// Pipeline-module associations with a composite natural key
pub const LINKS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pipeline_module_links (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    pipeline_id INTEGER NOT NULL REFERENCES pipelines(id),
    module_id   INTEGER NOT NULL REFERENCES modules(id),
    UNIQUE(pipeline_id, module_id)
)
"#;

/// Indexes for lookup paths the sync uses
pub const INDEX_SQL: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_modules_name ON modules(name)",
    "CREATE INDEX IF NOT EXISTS idx_pipelines_type ON pipelines(pipeline_type)",
    "CREATE INDEX IF NOT EXISTS idx_links_pipeline ON pipeline_module_links(pipeline_id)",
];
