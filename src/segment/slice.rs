use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::Serialize;

use super::anchors::{Anchor, ScoreMatrix};
use super::keys::SectionKey;
use super::offsets::LineIndex;
use super::resolve::{
    Resolution, backfill_references_contact, dosage_split_offset, resolve_bridge,
};
use super::rules::SegmentRules;

/// Absolute byte range of the document assigned to one section.
#[derive(Debug, Clone, Serialize)]
pub struct SectionSpan {
    pub key: SectionKey,
    pub start: usize,
    pub end: usize,
}

/// Slices the document into per-key content using the selected anchors.
/// Bridged efficacy/dosage regions are resolved first and inserted as-is;
/// everything else runs anchor start to next anchor start with the matched
/// heading phrase stripped.
pub fn slice_sections(
    text: &str,
    index: &LineIndex,
    anchors: &BTreeMap<SectionKey, Anchor>,
    matrix: &ScoreMatrix,
    rules: &SegmentRules,
    dosage_start: &Regex,
) -> (BTreeMap<SectionKey, String>, Vec<SectionSpan>, Vec<Resolution>) {
    let mut sections: BTreeMap<SectionKey, String> = BTreeMap::new();
    let mut spans: Vec<SectionSpan> = Vec::new();
    let mut decisions: Vec<Resolution> = Vec::new();

    if anchors.is_empty() {
        return (sections, spans, decisions);
    }

    let mut order: Vec<&Anchor> = anchors.values().collect();
    order.sort_by(|a, b| {
        a.line
            .cmp(&b.line)
            .then(rules.priority_of(a.key).cmp(&rules.priority_of(b.key)))
    });

    let mut distinct_lines: Vec<usize> = order.iter().map(|anchor| anchor.line).collect();
    distinct_lines.dedup();
    let mut next_abs: BTreeMap<usize, usize> = BTreeMap::new();
    for (pos, line) in distinct_lines.iter().enumerate() {
        let next = distinct_lines
            .get(pos + 1)
            .map(|next_line| index.start(*next_line))
            .unwrap_or(index.total_len());
        next_abs.insert(*line, next);
    }
    let next_of = |line: usize| next_abs.get(&line).copied().unwrap_or(index.total_len());

    let mut skip: BTreeSet<usize> = BTreeSet::new();

    if let Some(bridge) = resolve_bridge(text, index, anchors, matrix, dosage_start, next_of) {
        sections.insert(SectionKey::Efficacy, bridge.efficacy);
        sections.insert(SectionKey::Dosage, bridge.dosage);
        spans.push(SectionSpan {
            key: SectionKey::Efficacy,
            start: bridge.efficacy_span.0,
            end: bridge.efficacy_span.1,
        });
        spans.push(SectionSpan {
            key: SectionKey::Dosage,
            start: bridge.dosage_span.0,
            end: bridge.dosage_span.1,
        });
        decisions.push(bridge.decision);
        skip.extend(bridge.skip_lines);
    }

    for anchor in &order {
        if skip.contains(&anchor.line) {
            continue;
        }

        let start = index.start(anchor.line);
        let end = next_of(anchor.line);
        let block = &text[start..end];

        // Pure same-line co-heading: both keys anchored to one line.
        if matches!(anchor.key, SectionKey::Efficacy | SectionKey::Dosage) {
            let other = if anchor.key == SectionKey::Efficacy {
                SectionKey::Dosage
            } else {
                SectionKey::Efficacy
            };
            if anchors
                .get(&other)
                .is_some_and(|other_anchor| other_anchor.line == anchor.line)
            {
                let trimmed = block.trim_end();
                match dosage_split_offset(dosage_start, trimmed) {
                    Some(at) => {
                        sections.insert(
                            SectionKey::Efficacy,
                            trimmed[..at].trim_end().to_string(),
                        );
                        sections
                            .insert(SectionKey::Dosage, trimmed[at..].trim_start().to_string());
                        spans.push(SectionSpan {
                            key: SectionKey::Efficacy,
                            start,
                            end: start + at,
                        });
                        spans.push(SectionSpan {
                            key: SectionKey::Dosage,
                            start: start + at,
                            end,
                        });
                        decisions.push(Resolution::SameLineSplit {
                            line: anchor.line,
                            split_offset: start + at,
                        });
                    }
                    None => {
                        sections.insert(SectionKey::Efficacy, trimmed.to_string());
                        sections.insert(SectionKey::Dosage, trimmed.to_string());
                        spans.push(SectionSpan {
                            key: SectionKey::Efficacy,
                            start,
                            end,
                        });
                        spans.push(SectionSpan {
                            key: SectionKey::Dosage,
                            start,
                            end,
                        });
                        decisions.push(Resolution::SameLineDuplicate { line: anchor.line });
                    }
                }
                skip.insert(anchor.line);
                continue;
            }
        }

        let content = strip_heading(block, &anchor.alias).trim().to_string();
        let replace = match sections.get(&anchor.key) {
            None => true,
            Some(existing) => !content.is_empty() && content.len() > existing.len(),
        };
        if replace {
            sections.insert(anchor.key, content);
        }
        spans.push(SectionSpan {
            key: anchor.key,
            start,
            end,
        });
    }

    backfill_references_contact(rules, index, anchors, &mut sections, &mut decisions);

    ensure_dosage_not_empty(
        text,
        index,
        anchors,
        &skip,
        next_of,
        dosage_start,
        &mut sections,
        &mut spans,
        &mut decisions,
    );

    (sections, spans, decisions)
}

/// Last-resort guarantee that dosage is never silently empty when efficacy
/// text exists. Tries an inline split on the efficacy heading line first
/// (combined phrasing with no separate dosage anchor), then duplicates.
#[allow(clippy::too_many_arguments)]
fn ensure_dosage_not_empty(
    text: &str,
    index: &LineIndex,
    anchors: &BTreeMap<SectionKey, Anchor>,
    skip: &BTreeSet<usize>,
    next_of: impl Fn(usize) -> usize,
    dosage_start: &Regex,
    sections: &mut BTreeMap<SectionKey, String>,
    spans: &mut Vec<SectionSpan>,
    decisions: &mut Vec<Resolution>,
) {
    let dosage_empty = sections
        .get(&SectionKey::Dosage)
        .map(|content| content.trim().is_empty())
        .unwrap_or(true);
    let efficacy_present = sections
        .get(&SectionKey::Efficacy)
        .is_some_and(|content| !content.trim().is_empty());
    if !dosage_empty || !efficacy_present {
        return;
    }

    if !anchors.contains_key(&SectionKey::Dosage) {
        if let Some(efficacy) = anchors.get(&SectionKey::Efficacy) {
            if !skip.contains(&efficacy.line) {
                let start = index.start(efficacy.line);
                let end = next_of(efficacy.line);
                let block = &text[start..end];
                if let Some(at) = inline_split_offset(block, &efficacy.alias, dosage_start) {
                    sections.insert(SectionKey::Efficacy, block[..at].trim().to_string());
                    sections.insert(SectionKey::Dosage, block[at..].trim().to_string());
                    for span in spans.iter_mut() {
                        if span.key == SectionKey::Efficacy && span.start == start {
                            span.end = start + at;
                        }
                    }
                    spans.push(SectionSpan {
                        key: SectionKey::Dosage,
                        start: start + at,
                        end,
                    });
                    decisions.push(Resolution::InlineSplit {
                        line: efficacy.line,
                        split_offset: start + at,
                    });
                    return;
                }
            }
        }
    }

    if let Some(efficacy) = sections.get(&SectionKey::Efficacy).cloned() {
        sections.insert(SectionKey::Dosage, efficacy);
        decisions.push(Resolution::DosageDuplicated);
    }
}

/// Marker search constrained to the text after the matched efficacy alias on
/// the heading line, so ordinary efficacy prose is not cut in half.
fn inline_split_offset(block: &str, alias: &str, dosage_start: &Regex) -> Option<usize> {
    let first_line_end = block
        .find(['\n', '\r'])
        .unwrap_or(block.len());
    let alias_pos = block.find(alias)?;
    if alias_pos >= first_line_end {
        return None;
    }

    let alias_end = alias_pos + alias.len();
    if alias_end > first_line_end {
        return None;
    }

    dosage_split_offset(dosage_start, &block[alias_end..first_line_end]).map(|rel| alias_end + rel)
}

fn strip_heading<'a>(block: &'a str, alias: &str) -> &'a str {
    let first_line_end = block.find(['\n', '\r']).unwrap_or(block.len());
    match block.find(alias) {
        Some(pos) if pos < first_line_end => &block[pos + alias.len()..],
        _ => block,
    }
}
