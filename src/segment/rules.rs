use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use super::keys::SectionKey;

pub const DEFAULT_MIN_HEADING_SCORE: f64 = 5.0;

// Tokens that typically open the dosage half of a combined efficacy/dosage
// region: dosage-form nouns, administration verbs, and numeric-plus-unit
// patterns. The marker may sit at a line start or after inline whitespace on
// a combined heading line; the split point is the start of capture group 1.
pub const DEFAULT_DOSAGE_START: &str = concat!(
    r"(?m)(?:^|[ \t\u{3000}])[ \t\u{3000}]*(",
    r"(?:錠|ドライシロップ|カプセル|散|内用液|坐剤|注|吸入|貼付|懸濁|シロップ)",
    r"|(?:通常|用法|投与|経口|静注|点滴)",
    r"|分[ \u{3000}]*[0-9０-９]+",
    r"|[0-9０-９]+[ \u{3000}]*(?:mg|mL|g|回)",
    r")"
);

/// Immutable scoring/slicing rules shared read-only across documents.
#[derive(Debug, Clone)]
pub struct SegmentRules {
    pub min_heading_score: f64,
    pub dosage_start_pattern: String,
    aliases: BTreeMap<SectionKey, Vec<String>>,
    priority: Vec<SectionKey>,
}

/// Optional JSON overrides merged over the built-in defaults.
#[derive(Debug, Default, Deserialize)]
pub struct RulesFile {
    pub min_heading_score: Option<f64>,
    pub dosage_start_pattern: Option<String>,
    pub aliases: Option<BTreeMap<SectionKey, Vec<String>>>,
    pub priority: Option<Vec<SectionKey>>,
}

impl Default for SegmentRules {
    fn default() -> Self {
        Self {
            min_heading_score: DEFAULT_MIN_HEADING_SCORE,
            dosage_start_pattern: DEFAULT_DOSAGE_START.to_string(),
            aliases: default_aliases(),
            priority: SectionKey::ALL.to_vec(),
        }
    }
}

impl SegmentRules {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("failed to read rules file: {}", path.display()))?;
        let file: RulesFile = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse rules file: {}", path.display()))?;

        let mut rules = Self::default();
        rules.apply(file);
        Ok(rules)
    }

    pub fn apply(&mut self, file: RulesFile) {
        if let Some(score) = file.min_heading_score {
            self.min_heading_score = score;
        }
        if let Some(pattern) = file.dosage_start_pattern {
            self.dosage_start_pattern = pattern;
        }
        if let Some(overrides) = file.aliases {
            for (key, variants) in overrides {
                self.aliases.insert(key, variants);
            }
        }
        if let Some(priority) = file.priority {
            self.priority = priority;
        }
    }

    pub fn validate(&self) -> Result<()> {
        for key in SectionKey::ALL {
            let variants = self.aliases.get(&key);
            match variants {
                None => bail!("alias dictionary has no entry for section key: {key}"),
                Some(variants) if variants.is_empty() => {
                    bail!("alias dictionary has zero aliases for section key: {key}")
                }
                Some(variants) if variants.iter().any(|v| v.trim().is_empty()) => {
                    bail!("alias dictionary has a blank alias for section key: {key}")
                }
                Some(_) => {}
            }

            if !self.priority.contains(&key) {
                bail!("priority order omits section key: {key}");
            }
        }

        let mut seen = Vec::with_capacity(self.priority.len());
        for key in &self.priority {
            if seen.contains(key) {
                bail!("priority order lists section key twice: {key}");
            }
            seen.push(*key);
        }

        Ok(())
    }

    pub fn aliases_for(&self, key: SectionKey) -> &[String] {
        self.aliases.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn priority(&self) -> &[SectionKey] {
        &self.priority
    }

    pub fn priority_of(&self, key: SectionKey) -> usize {
        self.priority
            .iter()
            .position(|candidate| *candidate == key)
            .unwrap_or(usize::MAX)
    }

    pub fn alias_entries(&self) -> impl Iterator<Item = (SectionKey, &[String])> {
        self.aliases
            .iter()
            .map(|(key, variants)| (*key, variants.as_slice()))
    }
}

fn default_aliases() -> BTreeMap<SectionKey, Vec<String>> {
    let mut aliases = BTreeMap::new();
    let mut add = |key: SectionKey, variants: &[&str]| {
        aliases.insert(key, variants.iter().map(|v| v.to_string()).collect());
    };

    add(SectionKey::Warning, &["警告"]);
    add(
        SectionKey::Contraindications,
        &["禁忌", "禁忌（次の患者には投与しないこと）"],
    );
    add(
        SectionKey::Efficacy,
        &["効能又は効果", "効能・効果", "効能効果", "効能及び効果"],
    );
    add(
        SectionKey::EfficacyNotes,
        &["効能又は効果に関連する注意", "効能又は効果に関する注意"],
    );
    add(
        SectionKey::Dosage,
        &["用法及び用量", "用法・用量", "用法、用量", "用量及び用法"],
    );
    add(
        SectionKey::DosageNotes,
        &[
            "用法及び用量に関連する注意",
            "用法及び用量に関する注意",
            "用法及び用量に関連する使用上の注意",
        ],
    );
    add(SectionKey::Precautions, &["使用上の注意"]);
    add(SectionKey::ImportantNotes, &["重要な基本的注意"]);
    add(
        SectionKey::SpecialPatientNotes,
        &["特定の背景を有する患者に関する注意"],
    );
    add(SectionKey::Interactions, &["相互作用"]);
    add(
        SectionKey::SideEffects,
        &["副作用", "その他の副作用", "重大な副作用"],
    );
    add(SectionKey::LabInfluence, &["臨床検査結果に及ぼす影響"]);
    add(SectionKey::Overdose, &["過量投与"]);
    add(SectionKey::ApplicationNotes, &["適用上の注意"]);
    add(SectionKey::OtherNotes, &["その他の注意"]);
    add(
        SectionKey::Pharmacokinetics,
        &["薬物動態", "薬物動態パラメータ"],
    );
    add(SectionKey::ClinicalResults, &["臨床成績"]);
    add(SectionKey::Pharmacodynamics, &["薬効薬理"]);
    add(
        SectionKey::CompoundProperties,
        &["有効成分に関する理化学的知見"],
    );
    add(SectionKey::HandlingNotes, &["取扱い上の注意"]);
    add(SectionKey::ApprovalConditions, &["承認条件"]);
    add(SectionKey::Packaging, &["包装"]);
    add(
        SectionKey::MainReferences,
        &["主要文献", "主要文献及び文献請求先"],
    );
    add(
        SectionKey::ContactInfo,
        &[
            "文献請求先",
            "文献請求先及び問い合わせ先",
            "製造販売業者等の氏名又は名称及び所在地",
            "主要文献及び文献請求先",
        ],
    );

    aliases
}
