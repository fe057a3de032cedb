use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

use super::anchors::{Anchor, ScoreMatrix};
use super::keys::SectionKey;
use super::offsets::LineIndex;
use super::rules::SegmentRules;

/// One co-heading resolution decision, recorded for the audit trail.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    BridgeSplit {
        efficacy_line: usize,
        combined_line: usize,
        split_offset: usize,
    },
    BridgeDuplicate {
        efficacy_line: usize,
        combined_line: usize,
    },
    SameLineSplit {
        line: usize,
        split_offset: usize,
    },
    SameLineDuplicate {
        line: usize,
    },
    InlineSplit {
        line: usize,
        split_offset: usize,
    },
    ReferencesBackfill {
        line: usize,
    },
    ContactBackfill {
        line: usize,
    },
    DosageDuplicated,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::BridgeSplit {
                efficacy_line,
                combined_line,
                split_offset,
            } => write!(
                f,
                "efficacy@{efficacy_line} + combined@{combined_line} split={split_offset}"
            ),
            Resolution::BridgeDuplicate {
                efficacy_line,
                combined_line,
            } => write!(
                f,
                "efficacy@{efficacy_line} + combined@{combined_line} split=FAILED -> duplicate"
            ),
            Resolution::SameLineSplit { line, split_offset } => {
                write!(f, "combined line {line} split={split_offset}")
            }
            Resolution::SameLineDuplicate { line } => {
                write!(f, "combined line {line} split=FAILED -> duplicate")
            }
            Resolution::InlineSplit { line, split_offset } => {
                write!(f, "inline marker on efficacy line {line} split={split_offset}")
            }
            Resolution::ReferencesBackfill { line } => {
                write!(f, "main_references back-filled from contact_info line {line}")
            }
            Resolution::ContactBackfill { line } => {
                write!(f, "contact_info back-filled from main_references line {line}")
            }
            Resolution::DosageDuplicated => {
                write!(f, "dosage empty -> duplicated efficacy content")
            }
        }
    }
}

/// Byte offset of the first dosage-start marker in `block`, if any.
pub fn dosage_split_offset(dosage_start: &Regex, block: &str) -> Option<usize> {
    dosage_start
        .captures(block)
        .and_then(|captures| captures.get(1))
        .map(|m| m.start())
}

/// A line carries combined evidence when both efficacy and dosage scored on
/// it, whatever the anchor outcome was.
pub fn is_combined_line(matrix: &ScoreMatrix, line: usize) -> bool {
    matrix.get(&line).is_some_and(|scores| {
        scores.contains_key(&SectionKey::Efficacy) && scores.contains_key(&SectionKey::Dosage)
    })
}

#[derive(Debug)]
pub struct BridgeOutcome {
    pub efficacy: String,
    pub dosage: String,
    pub efficacy_span: (usize, usize),
    pub dosage_span: (usize, usize),
    pub skip_lines: [usize; 2],
    pub decision: Resolution,
}

/// Resolves the "efficacy anchor followed by a combined efficacy/dosage line"
/// case. Returns `None` when the document does not exhibit the pattern.
pub fn resolve_bridge(
    text: &str,
    index: &LineIndex,
    anchors: &BTreeMap<SectionKey, Anchor>,
    matrix: &ScoreMatrix,
    dosage_start: &Regex,
    next_abs_of: impl Fn(usize) -> usize,
) -> Option<BridgeOutcome> {
    let efficacy = anchors.get(&SectionKey::Efficacy)?;
    let dosage = anchors.get(&SectionKey::Dosage)?;
    if efficacy.line >= dosage.line || !is_combined_line(matrix, dosage.line) {
        return None;
    }

    // The combined line must be the next anchor after efficacy, otherwise the
    // bridged region would swallow an unrelated section's span.
    let intervening = anchors
        .values()
        .any(|anchor| anchor.line > efficacy.line && anchor.line < dosage.line);
    if intervening {
        return None;
    }

    let block_start = index.start(dosage.line);
    let block_end = next_abs_of(dosage.line);
    let block = &text[block_start..block_end];
    let pre = &text[index.start(efficacy.line)..block_start];

    let outcome = match dosage_split_offset(dosage_start, block) {
        Some(at) => {
            let efficacy_text = format!("{}{}", pre, block[..at].trim_end())
                .trim()
                .to_string();
            let dosage_text = block[at..].trim().to_string();
            let dosage_text = if dosage_text.is_empty() {
                efficacy_text.clone()
            } else {
                dosage_text
            };

            BridgeOutcome {
                efficacy_span: (index.start(efficacy.line), block_start + at),
                dosage_span: (block_start + at, block_end),
                efficacy: efficacy_text,
                dosage: dosage_text,
                skip_lines: [efficacy.line, dosage.line],
                decision: Resolution::BridgeSplit {
                    efficacy_line: efficacy.line,
                    combined_line: dosage.line,
                    split_offset: block_start + at,
                },
            }
        }
        None => {
            // No split point: duplicate the whole region into both keys
            // rather than dropping data. Spans overlap here, documented.
            let efficacy_text = format!("{pre}{block}").trim().to_string();
            let dosage_text = block.trim().to_string();
            let dosage_text = if dosage_text.is_empty() {
                efficacy_text.clone()
            } else {
                dosage_text
            };

            BridgeOutcome {
                efficacy_span: (index.start(efficacy.line), block_end),
                dosage_span: (block_start, block_end),
                efficacy: efficacy_text,
                dosage: dosage_text,
                skip_lines: [efficacy.line, dosage.line],
                decision: Resolution::BridgeDuplicate {
                    efficacy_line: efficacy.line,
                    combined_line: dosage.line,
                },
            }
        }
    };

    Some(outcome)
}

/// When only one of main_references/contact_info anchored and the anchored
/// line textually mentions the other key's phrasing, the missing key gets the
/// same content instead of staying absent.
pub fn backfill_references_contact(
    rules: &SegmentRules,
    index: &LineIndex,
    anchors: &BTreeMap<SectionKey, Anchor>,
    sections: &mut BTreeMap<SectionKey, String>,
    decisions: &mut Vec<Resolution>,
) {
    let main = anchors.get(&SectionKey::MainReferences);
    let contact = anchors.get(&SectionKey::ContactInfo);

    match (main, contact) {
        (Some(main), None) => {
            if !sections.contains_key(&SectionKey::ContactInfo)
                && mentions_any(index.line(main.line), rules.aliases_for(SectionKey::ContactInfo))
            {
                if let Some(content) = sections.get(&SectionKey::MainReferences).cloned() {
                    sections.insert(SectionKey::ContactInfo, content);
                    decisions.push(Resolution::ContactBackfill { line: main.line });
                }
            }
        }
        (None, Some(contact)) => {
            if !sections.contains_key(&SectionKey::MainReferences)
                && mentions_any(
                    index.line(contact.line),
                    rules.aliases_for(SectionKey::MainReferences),
                )
            {
                if let Some(content) = sections.get(&SectionKey::ContactInfo).cloned() {
                    sections.insert(SectionKey::MainReferences, content);
                    decisions.push(Resolution::ReferencesBackfill { line: contact.line });
                }
            }
        }
        _ => {}
    }
}

fn mentions_any(line: &str, aliases: &[String]) -> bool {
    aliases.iter().any(|alias| line.contains(alias.as_str()))
}
