use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::Regex;

use super::keys::SectionKey;
use super::offsets::LineIndex;
use super::rules::SegmentRules;

pub const EXACT_MATCH_SCORE: f64 = 8.0;
pub const SUBSTRING_MATCH_SCORE: f64 = 5.0;

const FLUSH_LEFT_BONUS: f64 = 2.0;
const SHORT_LINE_BONUS: f64 = 1.5;
const MEDIUM_LINE_BONUS: f64 = 0.8;
const NO_TERMINAL_PUNCT_BONUS: f64 = 0.5;
const BLANK_ADJACENCY_BONUS: f64 = 0.5;
const BRACKET_BONUS: f64 = 0.5;
const COMBINED_HEADING_BONUS: f64 = 0.5;

// Leading decoration/numbering: bullets like * or ※, clause numbers like
// "1.", "1.2", "3)".
const LEAD_NOISE: &str = r"^\s*(?:[*※＊]?\s*)?(?:[0-9０-９]+(?:\.[0-9０-９]+)*[.)]?\s*)?";

/// Evidence one line carries for one section key: the score and the alias
/// phrasing that produced it.
#[derive(Debug, Clone)]
pub struct LineScore {
    pub score: f64,
    pub alias: String,
}

#[derive(Debug)]
pub struct LineScorer {
    lead_noise: Regex,
}

impl LineScorer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            lead_noise: Regex::new(LEAD_NOISE).context("failed to compile lead-noise regex")?,
        })
    }

    /// Scores one line against every section key. Keys with no lexical match
    /// are absent; bonuses apply only on top of a non-zero base score.
    pub fn score_line(
        &self,
        rules: &SegmentRules,
        index: &LineIndex,
        idx: usize,
    ) -> BTreeMap<SectionKey, LineScore> {
        let raw = index.line(idx);
        let cleaned = self.lead_noise.replace(raw, "").trim().to_string();
        if cleaned.is_empty() {
            return BTreeMap::new();
        }

        let indent = raw.chars().count() - raw.trim_start().chars().count();
        let length = cleaned.chars().count();
        let has_terminal_punct = cleaned.contains('。');
        let prev_blank = idx > 0 && index.is_blank(idx - 1);
        let next_blank = idx + 1 < index.line_count() && index.is_blank(idx + 1);
        let trimmed = raw.trim();
        let bracketed = trimmed.starts_with('【')
            || trimmed.starts_with('[')
            || trimmed.ends_with('】')
            || trimmed.ends_with(']');

        let mut scores = BTreeMap::new();

        for (key, variants) in rules.alias_entries() {
            let mut base = 0.0;
            let mut matched: Option<&str> = None;

            for variant in variants {
                if cleaned == *variant {
                    if base < EXACT_MATCH_SCORE {
                        base = EXACT_MATCH_SCORE;
                        matched = Some(variant);
                    }
                } else if cleaned.contains(variant.as_str()) && base < SUBSTRING_MATCH_SCORE {
                    base = SUBSTRING_MATCH_SCORE;
                    matched = Some(variant);
                }
            }

            let Some(alias) = matched else {
                continue;
            };

            let mut score = base;
            if indent <= 4 {
                score += FLUSH_LEFT_BONUS;
            }
            if length <= 20 {
                score += SHORT_LINE_BONUS;
            } else if length <= 35 {
                score += MEDIUM_LINE_BONUS;
            }
            if !has_terminal_punct {
                score += NO_TERMINAL_PUNCT_BONUS;
            }
            if prev_blank || next_blank {
                score += BLANK_ADJACENCY_BONUS;
            }
            if bracketed {
                score += BRACKET_BONUS;
            }

            // Combined "references and contact" phrasing boosts both keys.
            if matches!(key, SectionKey::MainReferences | SectionKey::ContactInfo)
                && alias.contains("主要文献")
                && alias.contains("文献請求先")
            {
                score += COMBINED_HEADING_BONUS;
            }

            scores.insert(
                key,
                LineScore {
                    score,
                    alias: alias.to_string(),
                },
            );
        }

        scores
    }
}
