use std::fs;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::IngestRunManifest;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let db_path = args
        .db_path
        .unwrap_or_else(|| args.cache_root.join("pkginsert.sqlite"));

    info!(cache_root = %args.cache_root.display(), "status requested");

    match latest_manifest(&manifest_dir)? {
        Some((path, manifest)) => {
            info!(
                path = %path,
                run_id = %manifest.run_id,
                status = %manifest.status,
                started_at = %manifest.started_at,
                updated_at = %manifest.updated_at,
                files_processed = manifest.counts.files_processed,
                files_skipped_no_heading = manifest.counts.files_skipped_no_heading,
                sections_upserted = manifest.counts.sections_upserted,
                warnings = manifest.warnings.len(),
                "latest ingest run manifest"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no ingest run manifests found"),
    }

    if db_path.exists() {
        let connection = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;

        let docs = query_count(&connection, "SELECT COUNT(*) FROM docs").unwrap_or(0);
        let sections =
            query_count(&connection, "SELECT COUNT(*) FROM document_sections").unwrap_or(0);
        info!(path = %db_path.display(), docs, sections, "database status");

        let mut statement = connection
            .prepare(
                "SELECT section_key, COUNT(*), AVG(content_length)
                 FROM document_sections GROUP BY section_key ORDER BY COUNT(*) DESC",
            )
            .context("failed to prepare section summary query")?;
        let rows = statement
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            })
            .context("failed to query section summary")?;

        for row in rows {
            let (section_key, count, avg_length) =
                row.context("failed to read section summary row")?;
            info!(
                section_key = %section_key,
                count,
                avg_length = format!("{avg_length:.0}"),
                "section summary"
            );
        }
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

fn latest_manifest(manifest_dir: &std::path::Path) -> Result<Option<(String, IngestRunManifest)>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let mut paths: Vec<_> = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with("ingest_run_") && name.ends_with(".json"))
                .unwrap_or(false)
        })
        .collect();

    // run ids embed a UTC timestamp, so name order is chronological
    paths.sort();
    let Some(path) = paths.pop() else {
        return Ok(None);
    };

    let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: IngestRunManifest = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    Ok(Some((path.display().to_string(), manifest)))
}

fn query_count(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
