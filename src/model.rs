use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPaths {
    pub source_dir: String,
    pub cache_root: String,
    pub db_path: String,
    pub heading_log_path: String,
    pub manifest_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestCounts {
    pub files_found: usize,
    pub files_processed: usize,
    pub files_skipped_resume: usize,
    pub files_skipped_no_heading: usize,
    pub files_failed_read: usize,
    pub sections_upserted: usize,
    pub bridge_splits: usize,
    pub bridge_duplicates: usize,
    pub same_line_splits: usize,
    pub same_line_duplicates: usize,
    pub inline_splits: usize,
    pub reference_backfills: usize,
    pub dosage_fallbacks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub min_heading_score: f64,
    pub source_encoding: String,
    pub paths: IngestPaths,
    pub counts: IngestCounts,
    pub warnings: Vec<String>,
    pub notes: Vec<String>,
}
