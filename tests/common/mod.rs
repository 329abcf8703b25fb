use subweave::pipeline::{AnalyzerError, MorphAnalyzer, Morpheme};
use subweave::types::Cue;
use subweave::CancelFlag;

/// Analyzer for tests: each whitespace-separated word is `surface/TAG[/lemma]`,
/// where TAG may carry sub-tags joined by `+` (e.g. `三/名詞+数`).
/// A sentence containing `#fail` is rejected as malformed.
pub struct ScriptedAnalyzer;

impl MorphAnalyzer for ScriptedAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>, AnalyzerError> {
        if text.contains("#fail") {
            return Err(AnalyzerError::Malformed("scripted failure".to_string()));
        }
        Ok(text
            .split_whitespace()
            .map(|word| {
                let mut parts = word.split('/');
                let surface = parts.next().unwrap_or_default().to_string();
                let pos_tags = parts
                    .next()
                    .map(|tags| tags.split('+').map(str::to_string).collect())
                    .unwrap_or_default();
                let lemma = parts.next().map(str::to_string).unwrap_or_else(|| surface.clone());
                Morpheme {
                    surface,
                    lemma,
                    reading: None,
                    pos_tags,
                }
            })
            .collect())
    }
}

/// Raises `flag` when it analyzes a sentence containing `#cancel`, then behaves
/// like `ScriptedAnalyzer`.
pub struct CancellingAnalyzer {
    pub flag: CancelFlag,
}

impl MorphAnalyzer for CancellingAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>, AnalyzerError> {
        if text.contains("#cancel") {
            self.flag.cancel();
        }
        ScriptedAnalyzer.analyze(text)
    }
}

pub fn cue(order_index: u32, raw_text: &str) -> Cue {
    Cue {
        order_index,
        raw_text: raw_text.to_string(),
        start_time: Some(order_index as f64),
        end_time: Some(order_index as f64 + 0.5),
    }
}
