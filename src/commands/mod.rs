use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::EUC_JP;

use crate::cli::SourceEncoding;
use crate::segment::SegmentRules;

pub mod extract;
pub mod ingest;
pub mod status;

/// Built-in rules, optionally overridden by a JSON rules file and a CLI
/// threshold. Validation happens when the `Segmenter` is constructed.
pub fn load_rules(
    rules_path: Option<&Path>,
    min_heading_score: Option<f64>,
) -> Result<SegmentRules> {
    let mut rules = match rules_path {
        Some(path) => SegmentRules::load(path)?,
        None => SegmentRules::default(),
    };
    if let Some(score) = min_heading_score {
        rules.min_heading_score = score;
    }
    Ok(rules)
}

/// Reads and decodes one source document. Encoding normalization happens here,
/// before the text reaches the segmentation core: EUC-JP with replacement on
/// error, tabs flattened to spaces.
pub fn read_document(path: &Path, encoding: SourceEncoding) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = match encoding {
        SourceEncoding::EucJp => EUC_JP.decode(&bytes).0.into_owned(),
        SourceEncoding::Utf8 => String::from_utf8_lossy(&bytes).into_owned(),
    };
    Ok(text.replace('\t', " "))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;
    use crate::segment::SectionKey;

    #[test]
    fn read_document_decodes_euc_jp_and_flattens_tabs() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let (encoded, _, _) = EUC_JP.encode("効能又は効果\t本文");
        file.write_all(&encoded).expect("write");

        let text = read_document(file.path(), SourceEncoding::EucJp).expect("decode");
        assert_eq!(text, "効能又は効果 本文");
    }

    #[test]
    fn read_document_replaces_undecodable_bytes() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&[0xFF, b'a']).expect("write");

        let text = read_document(file.path(), SourceEncoding::EucJp).expect("decode");
        assert!(text.contains('\u{FFFD}'));
        assert!(text.ends_with('a'));
    }

    #[test]
    fn load_rules_applies_file_and_cli_overrides() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            r#"{"min_heading_score": 7.25, "aliases": {"warning": ["警告・注意"]}}"#.as_bytes(),
        )
        .expect("write");

        let rules = load_rules(Some(file.path()), None).expect("rules");
        assert_eq!(rules.min_heading_score, 7.25);
        assert_eq!(rules.aliases_for(SectionKey::Warning), ["警告・注意"]);

        let rules = load_rules(Some(file.path()), Some(3.0)).expect("rules");
        assert_eq!(rules.min_heading_score, 3.0);
    }
}
