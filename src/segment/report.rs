use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};

use super::anchors::{Anchor, ScoreMatrix};
use super::keys::SectionKey;
use super::offsets::LineIndex;
use super::resolve::Resolution;
use super::rules::SegmentRules;
use crate::util::now_utc_string;

const BANNER: &str = "====================================================================================================";

/// Verbosity of the heading-detection report; controls the candidates block
/// only, anchors and resolutions are always written.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub log_candidates: bool,
    pub min_score: f64,
    pub max_lines: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            log_candidates: true,
            min_score: 0.0,
            max_lines: 300,
        }
    }
}

/// Appends one document's detection report to the audit log: scored candidate
/// lines, chosen anchors in priority order, multi-key lines, and co-heading
/// resolutions. Non-authoritative, for offline audit only.
pub fn append_report(
    out: &mut dyn Write,
    doc_id: &str,
    index: &LineIndex,
    matrix: &ScoreMatrix,
    anchors: &BTreeMap<SectionKey, Anchor>,
    decisions: &[Resolution],
    rules: &SegmentRules,
    opts: &ReportOptions,
) -> Result<()> {
    writeln!(out, "{BANNER}")?;
    writeln!(
        out,
        "[{}] doc={} total_lines={} min_score={:.2}",
        now_utc_string(),
        doc_id,
        index.line_count(),
        opts.min_score
    )?;

    if opts.log_candidates && !matrix.is_empty() {
        writeln!(out, "[CANDIDATES] (idx: text :: key:score,...)")?;
        let mut written = 0;
        for (idx, scores) in matrix {
            let mut items: Vec<(SectionKey, f64)> = scores
                .iter()
                .filter(|(_, score)| **score >= opts.min_score)
                .map(|(key, score)| (*key, *score))
                .collect();
            if items.is_empty() {
                continue;
            }
            items.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            });

            let pairs = items
                .iter()
                .map(|(key, score)| format!("{key}:{score:.2}"))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(out, "  [{idx:>5}] {} :: {pairs}", shorten(index.line(*idx), 120))?;

            written += 1;
            if written >= opts.max_lines {
                writeln!(out, "  ... (truncated at {} candidates)", opts.max_lines)?;
                break;
            }
        }
    }

    writeln!(out, "[ANCHORS]")?;
    for key in rules.priority() {
        if let Some(anchor) = anchors.get(key) {
            writeln!(
                out,
                "  {:<22} -> line {:<5} score {:.2} | {}",
                key.as_str(),
                anchor.line,
                anchor.score,
                shorten(index.line(anchor.line), 120)
            )?;
        }
    }

    let mut by_line: BTreeMap<usize, Vec<SectionKey>> = BTreeMap::new();
    for anchor in anchors.values() {
        by_line.entry(anchor.line).or_default().push(anchor.key);
    }
    by_line.retain(|_, keys| keys.len() >= 2);
    if !by_line.is_empty() {
        writeln!(out, "[MULTI-KEY-LINE]")?;
        for (line, keys) in &by_line {
            let names = keys
                .iter()
                .map(|key| key.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                out,
                "  line {line:<5} keys=[{names}] | {}",
                shorten(index.line(*line), 120)
            )?;
        }
    }

    if !decisions.is_empty() {
        writeln!(out, "[RESOLUTION]")?;
        for decision in decisions {
            writeln!(out, "  {decision}")?;
        }
    }

    writeln!(out, "{BANNER}")?;
    writeln!(out)?;
    out.flush().context("failed to flush heading report")?;

    Ok(())
}

fn shorten(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|ch| if ch == '\r' || ch == '\n' { ' ' } else { ch })
        .collect();
    let total = flat.chars().count();
    if total <= max_chars {
        return flat;
    }

    let head: String = flat.chars().take(max_chars).collect();
    format!("{head}...(+{})", total - max_chars)
}
