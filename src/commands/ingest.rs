use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::{info, warn};

use crate::cli::IngestArgs;
use crate::commands::{load_rules, read_document};
use crate::model::{IngestCounts, IngestPaths, IngestRunManifest};
use crate::segment::{
    LineIndex, ReportOptions, Resolution, Segmentation, Segmenter, append_report,
};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

const DB_SCHEMA_VERSION: &str = "0.1.0";

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| cache_root.join("pkginsert.sqlite"));
    let heading_log_path = args
        .heading_log_path
        .clone()
        .unwrap_or_else(|| cache_root.join("heading_detect.log"));
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("ingest_run_{}.json", utc_compact_string(started_ts)))
    });

    // Invalid rules must halt the run before any document is scored.
    let rules = load_rules(args.rules_path.as_deref(), args.min_heading_score)?;
    let min_heading_score = rules.min_heading_score;
    let segmenter = Segmenter::new(rules)?;

    info!(
        source_dir = %args.source_dir.display(),
        run_id = %run_id,
        min_heading_score,
        "starting ingest"
    );

    let files = discover_documents(&args.source_dir)?;
    if files.is_empty() {
        bail!("no .txt documents found in {}", args.source_dir.display());
    }

    let mut connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&heading_log_path)
        .with_context(|| format!("failed to open heading log {}", heading_log_path.display()))?;
    let mut report_out = BufWriter::new(log_file);
    let report_opts = ReportOptions {
        log_candidates: !args.no_report_candidates,
        min_score: args.report_min_score,
        max_lines: args.report_max_lines,
    };

    let mut counts = IngestCounts {
        files_found: files.len(),
        ..IngestCounts::default()
    };
    let mut warnings: Vec<String> = Vec::new();

    for path in &files {
        let Some(yj_code) = path.file_stem().and_then(|stem| stem.to_str()) else {
            warnings.push(format!("invalid document filename: {}", path.display()));
            continue;
        };
        let yj_code = yj_code.to_string();

        if let Some(resume_after) = &args.resume_after {
            if yj_code.as_str() <= resume_after.as_str() {
                counts.files_skipped_resume += 1;
                continue;
            }
        }

        let text = match read_document(path, args.encoding) {
            Ok(text) => text,
            Err(err) => {
                let warning = format!("failed to read {}: {err}", path.display());
                warn!(warning = %warning, "document read warning");
                warnings.push(warning);
                counts.files_failed_read += 1;
                continue;
            }
        };

        let outcome = segmenter.segment(&text);

        let index = LineIndex::build(&text);
        if let Err(err) = append_report(
            &mut report_out,
            &yj_code,
            &index,
            &outcome.matrix,
            &outcome.anchors,
            &outcome.decisions,
            segmenter.rules(),
            &report_opts,
        ) {
            warn!(doc_id = %yj_code, error = %err, "failed to append heading report");
        }

        if outcome.sections.is_empty() {
            warn!(doc_id = %yj_code, min_heading_score, "no headings detected");
            counts.files_skipped_no_heading += 1;
            continue;
        }

        let sha256 = match sha256_file(path) {
            Ok(digest) => digest,
            Err(err) => {
                let warning = format!("failed to hash {}: {err}", path.display());
                warn!(warning = %warning, "document hash warning");
                warnings.push(warning);
                counts.files_failed_read += 1;
                continue;
            }
        };

        let upserted = upsert_document(&mut connection, &yj_code, path, &sha256, &outcome)?;
        counts.sections_upserted += upserted;
        counts.files_processed += 1;
        tally_decisions(&mut counts, &outcome.decisions);

        info!(
            doc_id = %yj_code,
            sections = outcome.sections.len(),
            decisions = outcome.decisions.len(),
            "upserted document sections"
        );
    }

    report_out
        .flush()
        .context("failed to flush heading report")?;

    let docs_total = count_rows(&connection, "SELECT COUNT(*) FROM docs")?;
    let sections_total = count_rows(&connection, "SELECT COUNT(*) FROM document_sections")?;
    let updated_at = now_utc_string();

    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at,
        command: render_ingest_command(&args),
        min_heading_score,
        source_encoding: args.encoding.as_str().to_string(),
        paths: IngestPaths {
            source_dir: args.source_dir.display().to_string(),
            cache_root: cache_root.display().to_string(),
            db_path: db_path.display().to_string(),
            heading_log_path: heading_log_path.display().to_string(),
            manifest_path: manifest_path.display().to_string(),
        },
        counts: counts.clone(),
        warnings,
        notes: vec![
            "Sections upserted on (yj_code, section_key); re-ingest overwrites content."
                .to_string(),
            "Heading detection is lexical scoring over alias phrasings; see the heading log for per-document evidence."
                .to_string(),
        ],
    };

    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote ingest run manifest");
    info!(
        processed = counts.files_processed,
        skipped_no_heading = counts.files_skipped_no_heading,
        sections = counts.sections_upserted,
        docs_total,
        sections_total,
        "ingest completed"
    );

    Ok(())
}

fn discover_documents(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(source_dir)
        .with_context(|| format!("failed to read {}", source_dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", source_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_txt = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if is_txt {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS docs (
          yj_code TEXT PRIMARY KEY,
          filename TEXT NOT NULL,
          sha256 TEXT NOT NULL,
          ingested_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS document_sections (
          yj_code TEXT NOT NULL,
          section_key TEXT NOT NULL,
          content TEXT NOT NULL,
          content_length INTEGER NOT NULL,
          created_at TEXT NOT NULL,
          PRIMARY KEY (yj_code, section_key),
          FOREIGN KEY (yj_code) REFERENCES docs(yj_code)
        );
        ",
    )?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

fn upsert_document(
    connection: &mut Connection,
    yj_code: &str,
    path: &Path,
    sha256: &str,
    outcome: &Segmentation,
) -> Result<usize> {
    let now = now_utc_string();
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(yj_code);

    let tx = connection.transaction()?;
    tx.execute(
        "INSERT INTO docs(yj_code, filename, sha256, ingested_at)
         VALUES(?1, ?2, ?3, ?4)
         ON CONFLICT(yj_code) DO UPDATE SET
           filename=excluded.filename,
           sha256=excluded.sha256,
           ingested_at=excluded.ingested_at",
        params![yj_code, filename, sha256, now],
    )?;

    let mut upserted = 0;
    {
        let mut statement = tx.prepare(
            "INSERT INTO document_sections(yj_code, section_key, content, content_length, created_at)
             VALUES(?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(yj_code, section_key) DO UPDATE SET
               content=excluded.content,
               content_length=excluded.content_length,
               created_at=excluded.created_at",
        )?;

        for (key, content) in &outcome.sections {
            let content_length = content.chars().count() as i64;
            statement.execute(params![yj_code, key.as_str(), content, content_length, now])?;
            upserted += 1;
        }
    }

    tx.commit()?;
    Ok(upserted)
}

fn tally_decisions(counts: &mut IngestCounts, decisions: &[Resolution]) {
    for decision in decisions {
        match decision {
            Resolution::BridgeSplit { .. } => counts.bridge_splits += 1,
            Resolution::BridgeDuplicate { .. } => counts.bridge_duplicates += 1,
            Resolution::SameLineSplit { .. } => counts.same_line_splits += 1,
            Resolution::SameLineDuplicate { .. } => counts.same_line_duplicates += 1,
            Resolution::InlineSplit { .. } => counts.inline_splits += 1,
            Resolution::ReferencesBackfill { .. } | Resolution::ContactBackfill { .. } => {
                counts.reference_backfills += 1;
            }
            Resolution::DosageDuplicated => counts.dosage_fallbacks += 1,
        }
    }
}

fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}

fn render_ingest_command(args: &IngestArgs) -> String {
    let mut command = vec![
        "pkginsert".to_string(),
        "ingest".to_string(),
        "--source-dir".to_string(),
        args.source_dir.display().to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
        "--encoding".to_string(),
        args.encoding.as_str().to_string(),
    ];

    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.rules_path {
        command.push("--rules-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(score) = args.min_heading_score {
        command.push("--min-heading-score".to_string());
        command.push(score.to_string());
    }
    if let Some(resume_after) = &args.resume_after {
        command.push("--resume-after".to_string());
        command.push(resume_after.clone());
    }

    command.join(" ")
}
