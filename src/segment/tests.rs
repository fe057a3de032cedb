use super::offsets::LineIndex;
use super::rules::DEFAULT_MIN_HEADING_SCORE;
use super::score::LineScorer;
use super::*;

fn segmenter() -> Segmenter {
    Segmenter::new(SegmentRules::default()).expect("default rules must be valid")
}

#[test]
fn line_index_handles_mixed_line_endings() {
    let index = LineIndex::build("a\r\nbb\nc\rdd");

    assert_eq!(index.line_count(), 4);
    assert_eq!(index.line(0), "a");
    assert_eq!(index.line(1), "bb");
    assert_eq!(index.line(2), "c");
    assert_eq!(index.line(3), "dd");
    assert_eq!(index.start(0), 0);
    assert_eq!(index.start(1), 3);
    assert_eq!(index.start(2), 6);
    assert_eq!(index.start(3), 8);
    assert_eq!(index.total_len(), 10);
}

#[test]
fn line_index_of_empty_document_has_no_lines() {
    let index = LineIndex::build("");
    assert_eq!(index.line_count(), 0);
    assert_eq!(index.total_len(), 0);
}

#[test]
fn every_short_alias_scores_above_threshold_when_isolated() {
    let rules = SegmentRules::default();
    let scorer = LineScorer::new().expect("scorer");

    for (key, aliases) in rules.alias_entries() {
        for alias in aliases {
            if alias.chars().count() >= 20 {
                continue;
            }

            let text = format!("\n{alias}\n\n");
            let index = LineIndex::build(&text);
            let scores = scorer.score_line(&rules, &index, 1);
            let entry = scores
                .get(&key)
                .unwrap_or_else(|| panic!("no score for {key} alias {alias}"));
            assert!(
                entry.score >= DEFAULT_MIN_HEADING_SCORE,
                "{key} alias {alias} scored {}",
                entry.score
            );
        }
    }
}

#[test]
fn isolated_dosage_heading_anchors_dosage() {
    let text = "\n用法及び用量\n\n通常、成人に100mgを投与する。\n";
    let outcome = segmenter().segment(text);

    let anchor = outcome
        .anchors
        .get(&SectionKey::Dosage)
        .expect("dosage anchor");
    assert_eq!(anchor.line, 1);
    assert!(anchor.score >= DEFAULT_MIN_HEADING_SCORE);

    // span runs to document end, heading stripped from content
    assert_eq!(
        outcome.sections.get(&SectionKey::Dosage).map(String::as_str),
        Some("通常、成人に100mgを投与する。")
    );
}

#[test]
fn document_without_alias_matches_yields_nothing() {
    let text = "こんにちは\n今日はいい天気です。\nさようなら\n";
    let outcome = segmenter().segment(text);

    assert!(outcome.anchors.is_empty());
    assert!(outcome.sections.is_empty());
    assert!(outcome.spans.is_empty());
    assert!(outcome.decisions.is_empty());
}

#[test]
fn segmentation_is_idempotent() {
    let text = "警告\n重大な事故のおそれ。\n\n相互作用\n併用に注意すること。\n";
    let seg = segmenter();

    let first = seg.segment(text);
    let second = seg.segment(text);
    assert_eq!(first.sections, second.sections);
}

#[test]
fn mixed_line_endings_slice_without_drift() {
    let text = "警告\r\n本文一\n\r\n用法及び用量\r\n本文二\n";
    let outcome = segmenter().segment(text);

    assert_eq!(
        outcome
            .sections
            .get(&SectionKey::Warning)
            .map(String::as_str),
        Some("本文一")
    );
    assert_eq!(
        outcome.sections.get(&SectionKey::Dosage).map(String::as_str),
        Some("本文二")
    );
}

#[test]
fn tie_on_score_keeps_earliest_line() {
    let text = "\n警告\n\n本文\n\n警告\n\n";
    let outcome = segmenter().segment(text);

    let anchor = outcome
        .anchors
        .get(&SectionKey::Warning)
        .expect("warning anchor");
    assert_eq!(anchor.line, 1);
}

#[test]
fn spans_stay_within_document_and_do_not_overlap() {
    let text = "警告\n本文一\n\n相互作用\n本文二\n\n包装\n100錠\n";
    let outcome = segmenter().segment(text);

    let mut spans = outcome.spans.clone();
    spans.sort_by_key(|span| span.start);
    assert_eq!(spans.len(), 3);

    for span in &spans {
        assert!(span.start <= span.end);
        assert!(span.end <= text.len());
    }
    for pair in spans.windows(2) {
        assert!(pair[0].end <= pair[1].start, "spans overlap: {pair:?}");
    }
}

#[test]
fn bridge_with_combined_line_splits_at_dosage_marker() {
    let text = "効能又は効果\n高血圧症\n効能・効果　用法・用量\n通常、成人には50mgを1日1回経口投与する。\n相互作用\n併用注意\n";
    let outcome = segmenter().segment(text);

    let efficacy = outcome
        .sections
        .get(&SectionKey::Efficacy)
        .expect("efficacy content");
    let dosage = outcome
        .sections
        .get(&SectionKey::Dosage)
        .expect("dosage content");

    assert!(efficacy.contains("高血圧症"));
    assert!(!efficacy.contains("通常、成人には"));
    assert!(dosage.contains("通常、成人には50mg"));
    assert!(outcome
        .decisions
        .iter()
        .any(|decision| matches!(decision, Resolution::BridgeSplit { .. })));

    // bridged spans are disjoint when the split succeeds
    let eff_span = outcome
        .spans
        .iter()
        .find(|span| span.key == SectionKey::Efficacy)
        .expect("efficacy span");
    let dos_span = outcome
        .spans
        .iter()
        .find(|span| span.key == SectionKey::Dosage)
        .expect("dosage span");
    assert_eq!(eff_span.end, dos_span.start);
}

#[test]
fn bridge_without_marker_duplicates_region_into_both_keys() {
    let text = "効能又は効果\n高血圧症\n\n効能・効果用法・用量\n特になし\n";
    let outcome = segmenter().segment(text);

    let efficacy = outcome
        .sections
        .get(&SectionKey::Efficacy)
        .expect("efficacy content");
    let dosage = outcome
        .sections
        .get(&SectionKey::Dosage)
        .expect("dosage content");

    assert!(efficacy.contains("特になし"));
    assert!(dosage.contains("特になし"));
    assert!(outcome
        .decisions
        .iter()
        .any(|decision| matches!(decision, Resolution::BridgeDuplicate { .. })));

    // the duplicated efficacy/dosage pair is the only legitimate overlap
    let eff_span = outcome
        .spans
        .iter()
        .find(|span| span.key == SectionKey::Efficacy)
        .expect("efficacy span");
    let dos_span = outcome
        .spans
        .iter()
        .find(|span| span.key == SectionKey::Dosage)
        .expect("dosage span");
    assert!(dos_span.start < eff_span.end);
}

#[test]
fn same_line_anchors_split_at_dosage_marker() {
    let text = "効能・効果　用法・用量\n通常、1日1回。\n";
    let outcome = segmenter().segment(text);

    assert_eq!(
        outcome
            .anchors
            .get(&SectionKey::Efficacy)
            .map(|anchor| anchor.line),
        outcome
            .anchors
            .get(&SectionKey::Dosage)
            .map(|anchor| anchor.line)
    );
    assert_eq!(
        outcome
            .sections
            .get(&SectionKey::Efficacy)
            .map(String::as_str),
        Some("効能・効果")
    );
    let dosage = outcome
        .sections
        .get(&SectionKey::Dosage)
        .expect("dosage content");
    assert!(dosage.starts_with("用法・用量"));
    assert!(dosage.contains("通常、1日1回。"));
    assert!(outcome
        .decisions
        .iter()
        .any(|decision| matches!(decision, Resolution::SameLineSplit { .. })));
}

#[test]
fn combined_single_line_heading_splits_inline_at_marker() {
    let text = "効能又は効果　通常、成人に1日1回100mgを経口投与する。\n";
    let outcome = segmenter().segment(text);

    assert!(outcome.anchors.contains_key(&SectionKey::Efficacy));
    assert!(!outcome.anchors.contains_key(&SectionKey::Dosage));

    assert_eq!(
        outcome
            .sections
            .get(&SectionKey::Efficacy)
            .map(String::as_str),
        Some("効能又は効果")
    );
    let dosage = outcome
        .sections
        .get(&SectionKey::Dosage)
        .expect("dosage content");
    assert!(dosage.starts_with("通常"));
    assert!(dosage.contains("100mg"));
    assert!(outcome
        .decisions
        .iter()
        .any(|decision| matches!(decision, Resolution::InlineSplit { .. })));
}

#[test]
fn empty_dosage_is_backfilled_from_efficacy() {
    let text = "効能又は効果\n高血圧症の治療。\n\n相互作用\n併用に注意。\n";
    let outcome = segmenter().segment(text);

    let efficacy = outcome
        .sections
        .get(&SectionKey::Efficacy)
        .expect("efficacy content");
    assert_eq!(efficacy, "高血圧症の治療。");
    assert_eq!(
        outcome.sections.get(&SectionKey::Dosage),
        outcome.sections.get(&SectionKey::Efficacy)
    );
    assert!(outcome
        .decisions
        .iter()
        .any(|decision| matches!(decision, Resolution::DosageDuplicated)));
}

#[test]
fn contact_info_backfilled_from_combined_references_heading() {
    // restrict contact_info aliases so only main_references anchors on the
    // combined heading, then the mention-based back-fill has to fire
    let mut rules = SegmentRules::default();
    rules.apply(RulesFile {
        min_heading_score: Some(10.0),
        aliases: Some(
            [(SectionKey::ContactInfo, vec!["文献請求先".to_string()])]
                .into_iter()
                .collect(),
        ),
        ..RulesFile::default()
    });
    let seg = Segmenter::new(rules).expect("rules");

    let text = "主要文献及び文献請求先\n1) 文献A\n2) 文献B\n";
    let outcome = seg.segment(text);

    assert!(outcome.anchors.contains_key(&SectionKey::MainReferences));
    assert!(!outcome.anchors.contains_key(&SectionKey::ContactInfo));
    assert_eq!(
        outcome.sections.get(&SectionKey::MainReferences),
        outcome.sections.get(&SectionKey::ContactInfo)
    );
    assert!(outcome
        .decisions
        .iter()
        .any(|decision| matches!(decision, Resolution::ContactBackfill { .. })));
}

#[test]
fn heading_with_lead_numbering_still_matches_exactly() {
    let text = "\n3. 相互作用\n\n併用に注意。\n";
    let outcome = segmenter().segment(text);

    let anchor = outcome
        .anchors
        .get(&SectionKey::Interactions)
        .expect("interactions anchor");
    assert_eq!(anchor.line, 1);
    assert!(anchor.score >= DEFAULT_MIN_HEADING_SCORE);
    assert_eq!(
        outcome
            .sections
            .get(&SectionKey::Interactions)
            .map(String::as_str),
        Some("併用に注意。")
    );
}

#[test]
fn rules_reject_empty_alias_set() {
    let mut rules = SegmentRules::default();
    rules.apply(RulesFile {
        aliases: Some([(SectionKey::Warning, Vec::new())].into_iter().collect()),
        ..RulesFile::default()
    });

    assert!(Segmenter::new(rules).is_err());
}

#[test]
fn rules_reject_incomplete_priority_order() {
    let mut rules = SegmentRules::default();
    rules.apply(RulesFile {
        priority: Some(vec![SectionKey::Warning, SectionKey::Dosage]),
        ..RulesFile::default()
    });

    assert!(Segmenter::new(rules).is_err());
}

#[test]
fn rules_reject_duplicate_priority_entry() {
    let mut rules = SegmentRules::default();
    let mut priority = SectionKey::ALL.to_vec();
    priority.push(SectionKey::Warning);
    rules.apply(RulesFile {
        priority: Some(priority),
        ..RulesFile::default()
    });

    assert!(Segmenter::new(rules).is_err());
}

#[test]
fn rules_file_overrides_merge_over_defaults() {
    let mut rules = SegmentRules::default();
    rules.apply(RulesFile {
        min_heading_score: Some(9.5),
        aliases: Some(
            [(SectionKey::Warning, vec!["けいこく".to_string()])]
                .into_iter()
                .collect(),
        ),
        ..RulesFile::default()
    });

    assert_eq!(rules.min_heading_score, 9.5);
    assert_eq!(rules.aliases_for(SectionKey::Warning), ["けいこく"]);
    // untouched keys keep their defaults
    assert!(rules
        .aliases_for(SectionKey::Dosage)
        .contains(&"用法及び用量".to_string()));
    assert!(rules.validate().is_ok());
}

#[test]
fn score_matrix_records_subthreshold_evidence() {
    // substring match inside a long sentence stays below the anchor
    // threshold but must still appear in the matrix for diagnostics
    let text = "この薬の警告事項については医師に相談し、添付の文書を必ず確認してから服用してください。\n";
    let mut rules = SegmentRules::default();
    rules.min_heading_score = 20.0;
    let outcome = Segmenter::new(rules).expect("rules").segment(text);

    assert!(outcome.anchors.is_empty());
    let line_scores = outcome.matrix.get(&0).expect("line 0 evidence");
    assert!(line_scores.contains_key(&SectionKey::Warning));
}

#[test]
fn report_writer_lists_anchors_and_decisions() {
    let text = "効能又は効果\n高血圧症\n効能・効果　用法・用量\n通常、成人には50mgを1日1回経口投与する。\n";
    let seg = segmenter();
    let outcome = seg.segment(text);
    let index = LineIndex::build(text);

    let mut buffer: Vec<u8> = Vec::new();
    append_report(
        &mut buffer,
        "1234567890123",
        &index,
        &outcome.matrix,
        &outcome.anchors,
        &outcome.decisions,
        seg.rules(),
        &ReportOptions::default(),
    )
    .expect("report");

    let rendered = String::from_utf8(buffer).expect("utf-8 report");
    assert!(rendered.contains("doc=1234567890123"));
    assert!(rendered.contains("[CANDIDATES]"));
    assert!(rendered.contains("[ANCHORS]"));
    assert!(rendered.contains("efficacy"));
    assert!(rendered.contains("[RESOLUTION]"));
}
