use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ExtractArgs;
use crate::commands::{load_rules, read_document};
use crate::segment::{Anchor, Resolution, SectionKey, SectionSpan, Segmenter};

#[derive(Debug, Serialize)]
struct SectionDump {
    content: String,
    content_length: usize,
}

#[derive(Debug, Serialize)]
struct ExtractReport {
    doc_id: String,
    line_count: usize,
    sections: BTreeMap<SectionKey, SectionDump>,
    anchors: BTreeMap<SectionKey, Anchor>,
    spans: Vec<SectionSpan>,
    decisions: Vec<Resolution>,
}

pub fn run(args: ExtractArgs) -> Result<()> {
    let rules = load_rules(args.rules_path.as_deref(), args.min_heading_score)?;
    let segmenter = Segmenter::new(rules)?;

    let doc_id = args
        .input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("invalid document filename: {}", args.input.display()))?;

    let text = read_document(&args.input, args.encoding)?;
    let outcome = segmenter.segment(&text);

    info!(
        doc_id = %doc_id,
        lines = outcome.line_count,
        sections = outcome.sections.len(),
        decisions = outcome.decisions.len(),
        "segmented document"
    );

    let report = ExtractReport {
        doc_id,
        line_count: outcome.line_count,
        sections: outcome
            .sections
            .into_iter()
            .map(|(key, content)| {
                let content_length = content.chars().count();
                (
                    key,
                    SectionDump {
                        content,
                        content_length,
                    },
                )
            })
            .collect(),
        anchors: outcome.anchors,
        spans: outcome.spans,
        decisions: outcome.decisions,
    };

    let rendered =
        serde_json::to_string_pretty(&report).context("failed to serialize extract report")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote extract report");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{rendered}").context("failed to write extract report to stdout")?;
        }
    }

    Ok(())
}
