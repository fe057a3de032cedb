use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use super::keys::SectionKey;
use super::offsets::LineIndex;
use super::rules::SegmentRules;
use super::score::LineScorer;

/// Per-line, per-key score table. Lines with no evidence are omitted.
pub type ScoreMatrix = BTreeMap<usize, BTreeMap<SectionKey, f64>>;

/// The chosen heading line for one section key.
#[derive(Debug, Clone, Serialize)]
pub struct Anchor {
    pub key: SectionKey,
    pub line: usize,
    pub score: f64,
    pub alias: String,
}

/// Detection strategy seam: the shipped implementation is lexical scoring,
/// but an externally-classified variant can be plugged in by configuration.
pub trait HeadingDetector {
    fn detect(
        &self,
        rules: &SegmentRules,
        index: &LineIndex,
    ) -> (BTreeMap<SectionKey, Anchor>, ScoreMatrix);
}

#[derive(Debug)]
pub struct LexicalDetector {
    scorer: LineScorer,
}

impl LexicalDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            scorer: LineScorer::new()?,
        })
    }
}

impl HeadingDetector for LexicalDetector {
    fn detect(
        &self,
        rules: &SegmentRules,
        index: &LineIndex,
    ) -> (BTreeMap<SectionKey, Anchor>, ScoreMatrix) {
        let mut anchors: BTreeMap<SectionKey, Anchor> = BTreeMap::new();
        let mut matrix = ScoreMatrix::new();

        for idx in 0..index.line_count() {
            let scores = self.scorer.score_line(rules, index, idx);
            if scores.is_empty() {
                continue;
            }

            for (key, entry) in &scores {
                if entry.score < rules.min_heading_score {
                    continue;
                }

                // Highest score wins; on a tie the earlier line stands.
                let replace = anchors
                    .get(key)
                    .is_none_or(|current| entry.score > current.score);
                if replace {
                    anchors.insert(
                        *key,
                        Anchor {
                            key: *key,
                            line: idx,
                            score: entry.score,
                            alias: entry.alias.clone(),
                        },
                    );
                }
            }

            matrix.insert(
                idx,
                scores
                    .into_iter()
                    .map(|(key, entry)| (key, entry.score))
                    .collect(),
            );
        }

        (anchors, matrix)
    }
}
