use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::types::{Cue, SentenceId, SourceSentence};

// {\an8}, {\i1}, {\pos(10,20)} ...
static SSA_OVERRIDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\\[^}]*\}").expect("static SSA override regex"));
// <i>, </i>, <font color="...">
static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][^<>]*>").expect("static markup tag regex"));
static SSA_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\[Nnh]").expect("static SSA escape regex"));

/// Strips styling artifacts and collapses whitespace. Deterministic.
pub fn normalize_text(raw: &str) -> String {
    let text = SSA_OVERRIDE.replace_all(raw, "");
    let text = MARKUP_TAG.replace_all(&text, "");
    let text = SSA_ESCAPE.replace_all(&text, " ");
    text.replace('\u{00A0}', " ")
        .replace('\u{3000}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Builds the SourceSentence for a cue, or `None` when nothing is left after cleaning.
pub fn normalize_cue(cue: &Cue) -> Option<SourceSentence> {
    let raw_text = normalize_text(&cue.raw_text);
    if raw_text.is_empty() {
        debug!(order_index = cue.order_index, "cue normalized to empty text, skipped");
        return None;
    }
    Some(SourceSentence {
        sentence_id: SentenceId::from_order_index(cue.order_index),
        order_index: cue.order_index,
        raw_text,
        start_time: cue.start_time,
        end_time: cue.end_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(order_index: u32, raw_text: &str) -> Cue {
        Cue {
            order_index,
            raw_text: raw_text.to_string(),
            start_time: Some(1.5),
            end_time: Some(3.0),
        }
    }

    #[test]
    fn strips_ssa_and_html_markup() {
        assert_eq!(
            normalize_text(r"{\an8}<i>今日は</i>\N{\i1}いい天気"),
            "今日は いい天気"
        );
        assert_eq!(normalize_text(r##"<font color="#ffffff">雨</font>"##), "雨");
    }

    #[test]
    fn collapses_whitespace_and_line_breaks() {
        assert_eq!(normalize_text("  行こう\n\n  よ\u{3000}!  "), "行こう よ !");
    }

    #[test]
    fn keeps_text_that_only_looks_like_comparison() {
        assert_eq!(normalize_text("1 < 2"), "1 < 2");
    }

    #[test]
    fn empty_cue_yields_no_sentence() {
        assert!(normalize_cue(&cue(4, r"{\an8}<i> </i>\N")).is_none());
    }

    #[test]
    fn sentence_carries_order_and_timing() {
        let sentence = normalize_cue(&cue(12, "走る")).unwrap();
        assert_eq!(sentence.sentence_id.as_str(), "s12");
        assert_eq!(sentence.order_index, 12);
        assert_eq!(sentence.start_time, Some(1.5));
        assert_eq!(normalize_cue(&cue(12, "走る")), Some(sentence));
    }
}
