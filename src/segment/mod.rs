use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

mod anchors;
mod keys;
mod offsets;
mod report;
mod resolve;
mod rules;
mod score;
mod slice;
#[cfg(test)]
mod tests;

pub use anchors::{Anchor, HeadingDetector, LexicalDetector, ScoreMatrix};
pub use keys::SectionKey;
pub use offsets::LineIndex;
pub use report::{ReportOptions, append_report};
pub use resolve::Resolution;
pub use rules::{DEFAULT_MIN_HEADING_SCORE, RulesFile, SegmentRules};
pub use slice::SectionSpan;

/// Everything produced for one document. Sections omit keys with no evidence;
/// callers must treat every key as optional.
#[derive(Debug, Serialize)]
pub struct Segmentation {
    pub sections: BTreeMap<SectionKey, String>,
    pub anchors: BTreeMap<SectionKey, Anchor>,
    pub spans: Vec<SectionSpan>,
    pub decisions: Vec<Resolution>,
    pub line_count: usize,
    #[serde(skip)]
    pub matrix: ScoreMatrix,
}

/// One-document segmentation pipeline. Construction validates the rules and
/// compiles the split pattern, so invalid configuration fails before any
/// document is scored; `segment` itself never fails.
pub struct Segmenter {
    rules: SegmentRules,
    dosage_start: Regex,
    detector: Box<dyn HeadingDetector>,
}

impl Segmenter {
    pub fn new(rules: SegmentRules) -> Result<Self> {
        let detector = Box::new(LexicalDetector::new()?);
        Self::with_detector(rules, detector)
    }

    pub fn with_detector(rules: SegmentRules, detector: Box<dyn HeadingDetector>) -> Result<Self> {
        rules.validate()?;
        let dosage_start = Regex::new(&rules.dosage_start_pattern)
            .context("failed to compile dosage-start pattern")?;

        Ok(Self {
            rules,
            dosage_start,
            detector,
        })
    }

    pub fn rules(&self) -> &SegmentRules {
        &self.rules
    }

    pub fn segment(&self, text: &str) -> Segmentation {
        let index = LineIndex::build(text);
        let (anchors, matrix) = self.detector.detect(&self.rules, &index);

        let (sections, spans, decisions) = slice::slice_sections(
            text,
            &index,
            &anchors,
            &matrix,
            &self.rules,
            &self.dosage_start,
        );

        Segmentation {
            sections,
            anchors,
            spans,
            decisions,
            line_count: index.line_count(),
            matrix,
        }
    }
}
