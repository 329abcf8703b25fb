//! Morphological analysis seam.
//!
//! The filter only needs surface, lemma, reading and the POS hierarchy of each
//! morpheme, so anything that can produce those can sit behind `MorphAnalyzer`.
//! `DictionaryAnalyzer` is the production implementation over a MeCab-format
//! system dictionary compiled for vibrato.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use thiserror::Error;
use tracing::info;
use vibrato::{Dictionary, Tokenizer};

use crate::config::AnalyzerConfig;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("dictionary could not be loaded from {path}: {reason}")]
    Dictionary { path: String, reason: String },

    #[error("sentence of {chars} characters exceeds the analyzer limit of {limit}")]
    InputTooLong { chars: usize, limit: usize },

    #[error("malformed input: {0}")]
    Malformed(String),
}

/// One unit of morphological segmentation, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morpheme {
    pub surface: String,
    pub lemma: String,
    pub reading: Option<String>,
    /// Major tag first, then sub-tags (e.g. `["名詞", "数"]`).
    pub pos_tags: Vec<String>,
}

impl Morpheme {
    pub fn major_pos(&self) -> Option<&str> {
        self.pos_tags.first().map(String::as_str)
    }
}

pub trait MorphAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>, AnalyzerError>;
}

pub struct DictionaryAnalyzer {
    tokenizer: Tokenizer,
    config: AnalyzerConfig,
}

impl DictionaryAnalyzer {
    /// Loads a compiled dictionary; `.zst` files are decompressed on the fly.
    pub fn from_path(path: &Path, config: AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let dictionary_error = |reason: String| AnalyzerError::Dictionary {
            path: path.display().to_string(),
            reason,
        };

        let file = File::open(path).map_err(|e| dictionary_error(e.to_string()))?;
        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "zst") {
            Box::new(zstd::Decoder::new(file).map_err(|e| dictionary_error(e.to_string()))?)
        } else {
            Box::new(BufReader::new(file))
        };
        let dictionary = Dictionary::read(reader).map_err(|e| dictionary_error(e.to_string()))?;
        info!("Loaded analyzer dictionary from {}", path.display());

        Ok(DictionaryAnalyzer {
            tokenizer: Tokenizer::new(dictionary),
            config,
        })
    }
}

impl MorphAnalyzer for DictionaryAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Morpheme>, AnalyzerError> {
        validate_input(text, self.config.max_sentence_chars)?;

        let mut worker = self.tokenizer.new_worker();
        worker.reset_sentence(text);
        worker.tokenize();

        Ok(worker
            .token_iter()
            .map(|token| morpheme_from_feature(token.surface(), token.feature(), &self.config))
            .collect())
    }
}

/// Builds a Morpheme from a comma-separated IPADIC-style feature string.
///
/// `*` and empty fields count as absent: unknown words get their surface as
/// lemma and no reading.
pub fn morpheme_from_feature(surface: &str, feature: &str, config: &AnalyzerConfig) -> Morpheme {
    let fields: Vec<&str> = feature.split(',').collect();
    let field = |index: usize| {
        fields
            .get(index)
            .map(|f| f.trim())
            .filter(|f| !f.is_empty() && *f != "*")
    };

    let pos_tags = (0..config.pos_fields)
        .filter_map(|i| field(i).map(str::to_string))
        .collect();
    let lemma = field(config.lemma_field).unwrap_or(surface).to_string();
    // Readings are kana only; no fallback to the lemma.
    let reading = field(config.reading_field).map(katakana_to_hiragana);

    Morpheme {
        surface: surface.to_string(),
        lemma,
        reading,
        pos_tags,
    }
}

/// Rejects input the analyzer cannot segment meaningfully.
pub fn validate_input(text: &str, max_chars: usize) -> Result<(), AnalyzerError> {
    let chars = text.chars().count();
    if chars > max_chars {
        return Err(AnalyzerError::InputTooLong {
            chars,
            limit: max_chars,
        });
    }
    if let Some(c) = text.chars().find(|c| c.is_control()) {
        return Err(AnalyzerError::Malformed(format!(
            "control character U+{:04X}",
            c as u32
        )));
    }
    Ok(())
}

/// Maps katakana (ァ..ヶ) onto hiragana, leaving everything else untouched.
pub fn katakana_to_hiragana(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{30A1}'..='\u{30F6}' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
            _ => c,
        })
        .collect()
}
