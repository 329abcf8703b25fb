use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use super::analyzer::{AnalyzerError, MorphAnalyzer, Morpheme};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{PartOfSpeech, SourceSentence, Token, TokenId};

// Digits, punctuation, symbols and underscores only.
static SYMBOLS_OR_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\W_]+$").expect("static symbol regex"));
static SINGLE_KANA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ぁ-んァ-ヶー]$").expect("static kana regex"));

/// Why a morpheme was not turned into a Token.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    PosExcluded,
    Empty,
    Numeral,
    SymbolOrNumeral,
    SingleKanaNoise,
    Filler,
    NoisePattern,
}

/// Counts of discarded morphemes per reason.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FilterStats {
    pub kept: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl FilterStats {
    pub fn record_skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &FilterStats) {
        self.kept += other.kept;
        for (reason, count) in &other.skipped {
            *self.skipped.entry(*reason).or_insert(0) += count;
        }
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Compiled POS whitelist and noise-exclusion rule set.
#[derive(Debug, Clone)]
pub struct FilterRules {
    pos_tags: HashMap<String, PartOfSpeech>,
    whitelist: HashSet<PartOfSpeech>,
    fillers: HashSet<String>,
    noise_patterns: Vec<Regex>,
    numeral_tags: HashSet<String>,
    single_kana_noise: bool,
}

impl FilterRules {
    pub fn from_config(config: &Config) -> Result<Self> {
        let noise_patterns = config
            .filter
            .noise_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    Error::Config(format!("invalid noise pattern '{}': {}", pattern, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FilterRules {
            pos_tags: config.pos_tags.clone(),
            whitelist: config.filter.pos_whitelist.iter().copied().collect(),
            fillers: config.filter.fillers.iter().cloned().collect(),
            noise_patterns,
            numeral_tags: config.filter.numeral_tags.iter().cloned().collect(),
            single_kana_noise: config.filter.single_kana_noise,
        })
    }

    /// Part of speech of a morpheme, if it is one the whitelist admits.
    pub fn classify(&self, morpheme: &Morpheme) -> Option<PartOfSpeech> {
        morpheme
            .major_pos()
            .and_then(|tag| self.pos_tags.get(tag))
            .copied()
            .filter(|pos| self.whitelist.contains(pos))
    }

    /// Noise-exclusion check for a morpheme already classified as `pos`.
    pub fn noise_reason(&self, morpheme: &Morpheme, pos: PartOfSpeech) -> Option<SkipReason> {
        let lemma = morpheme.lemma.trim();
        let surface = morpheme.surface.trim();

        if lemma.is_empty() || surface.is_empty() {
            return Some(SkipReason::Empty);
        }
        if morpheme.pos_tags.iter().any(|t| self.numeral_tags.contains(t)) {
            return Some(SkipReason::Numeral);
        }
        // "1等" starts with a digit but carries letters, so it stays.
        if SYMBOLS_OR_DIGITS.is_match(lemma) || SYMBOLS_OR_DIGITS.is_match(surface) {
            return Some(SkipReason::SymbolOrNumeral);
        }
        if self.single_kana_noise && pos != PartOfSpeech::Noun && SINGLE_KANA.is_match(lemma) {
            return Some(SkipReason::SingleKanaNoise);
        }
        if self.fillers.contains(surface) || self.fillers.contains(lemma) {
            return Some(SkipReason::Filler);
        }
        if self
            .noise_patterns
            .iter()
            .any(|re| re.is_match(lemma) || re.is_match(surface))
        {
            return Some(SkipReason::NoisePattern);
        }
        None
    }
}

/// Filtered tokens of one sentence plus the tally of what was dropped.
#[derive(Debug, Clone)]
pub struct TokenizedSentence {
    pub tokens: Vec<Token>,
    pub stats: FilterStats,
}

/// Turns analyzer output into Tokens. Positions count kept tokens only.
pub fn extract_tokens(
    sentence: &SourceSentence,
    morphemes: &[Morpheme],
    rules: &FilterRules,
) -> TokenizedSentence {
    let mut tokens = Vec::new();
    let mut stats = FilterStats::default();

    for morpheme in morphemes {
        let pos = match rules.classify(morpheme) {
            Some(pos) => pos,
            None => {
                stats.record_skip(SkipReason::PosExcluded);
                continue;
            }
        };
        if let Some(reason) = rules.noise_reason(morpheme, pos) {
            debug!(surface = %morpheme.surface, ?reason, "morpheme dropped");
            stats.record_skip(reason);
            continue;
        }

        let position = tokens.len();
        tokens.push(Token {
            token_id: TokenId::new(&sentence.sentence_id, position),
            sentence_id: sentence.sentence_id.clone(),
            surface_form: morpheme.surface.clone(),
            lemma: morpheme.lemma.clone(),
            pos,
            position_in_sentence: position,
            reading: morpheme.reading.clone(),
        });
    }
    stats.kept = tokens.len();

    TokenizedSentence { tokens, stats }
}

pub fn tokenize_sentence(
    analyzer: &dyn MorphAnalyzer,
    rules: &FilterRules,
    sentence: &SourceSentence,
) -> std::result::Result<TokenizedSentence, AnalyzerError> {
    let morphemes = analyzer.analyze(&sentence.raw_text)?;
    Ok(extract_tokens(sentence, &morphemes, rules))
}
