use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::PartOfSpeech;

pub const DEFAULT_GROUP_SIZE: usize = 3;

/// Low-information interjections and fillers common in Japanese dialogue.
const DEFAULT_FILLERS: &[&str] = &[
    "えー", "えっと", "ええと", "あの", "あのう", "その", "まあ", "うん", "ううん", "ああ", "おお",
    "ほら", "はい", "いいえ", "ねえ", "なあ", "へえ", "ふーん", "うわ", "あれ",
];

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub group_size: usize,
    /// Sentences interleaved together per generation batch; `None` means the whole file.
    pub sentences_per_batch: Option<usize>,
    pub filter: FilterConfig,
    /// Analyzer major POS tag -> part of speech kept by the filter.
    pub pos_tags: HashMap<String, PartOfSpeech>,
    pub analyzer: AnalyzerConfig,
    pub response: ResponseConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct FilterConfig {
    pub pos_whitelist: Vec<PartOfSpeech>,
    pub fillers: Vec<String>,
    /// Extra regexes; a lemma or surface matching any of them is dropped.
    pub noise_patterns: Vec<String>,
    /// Sub-tags in the analyzer's POS hierarchy that mark numerals.
    pub numeral_tags: Vec<String>,
    pub single_kana_noise: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub dictionary_path: Option<PathBuf>,
    /// Leading feature fields that make up the POS hierarchy.
    pub pos_fields: usize,
    pub lemma_field: usize,
    pub reading_field: usize,
    pub max_sentence_chars: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ResponseConfig {
    pub id_field: String,
    pub items_field: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            group_size: DEFAULT_GROUP_SIZE,
            sentences_per_batch: None,
            filter: FilterConfig::default(),
            pos_tags: default_pos_tags(),
            analyzer: AnalyzerConfig::default(),
            response: ResponseConfig::default(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            pos_whitelist: PartOfSpeech::ALL.to_vec(),
            fillers: DEFAULT_FILLERS.iter().map(|s| s.to_string()).collect(),
            noise_patterns: Vec::new(),
            numeral_tags: vec!["数".to_string()],
            single_kana_noise: true,
        }
    }
}

impl Default for AnalyzerConfig {
    // IPADIC feature layout: pos,pos1,pos2,pos3,conj_type,conj_form,base,reading,pronunciation
    fn default() -> Self {
        AnalyzerConfig {
            dictionary_path: None,
            pos_fields: 2,
            lemma_field: 6,
            reading_field: 7,
            max_sentence_chars: 4096,
        }
    }
}

impl Default for ResponseConfig {
    fn default() -> Self {
        ResponseConfig {
            id_field: "token_id".to_string(),
            items_field: "words".to_string(),
        }
    }
}

pub fn default_pos_tags() -> HashMap<String, PartOfSpeech> {
    [
        ("名詞", PartOfSpeech::Noun),
        ("動詞", PartOfSpeech::Verb),
        ("形容詞", PartOfSpeech::Adjective),
        ("副詞", PartOfSpeech::Adverb),
        ("NOUN", PartOfSpeech::Noun),
        ("PROPN", PartOfSpeech::Noun),
        ("VERB", PartOfSpeech::Verb),
        ("ADJ", PartOfSpeech::Adjective),
        ("ADV", PartOfSpeech::Adverb),
    ]
    .into_iter()
    .map(|(tag, pos)| (tag.to_string(), pos))
    .collect()
}

impl Config {
    /// Target word-group size. Rejects 0 before any processing happens.
    pub fn group_size(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.group_size).ok_or(Error::InvalidGroupSize(self.group_size))
    }

    pub fn batch_size(&self) -> Result<Option<NonZeroUsize>> {
        match self.sentences_per_batch {
            None => Ok(None),
            Some(n) => NonZeroUsize::new(n).map(Some).ok_or_else(|| {
                Error::Config("sentences_per_batch must be >= 1 when set".to_string())
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.group_size()?;
        self.batch_size()?;
        if self.filter.pos_whitelist.is_empty() {
            return Err(Error::Config("filter.pos_whitelist is empty".to_string()));
        }
        if self.analyzer.lemma_field < self.analyzer.pos_fields {
            return Err(Error::Config(format!(
                "analyzer.lemma_field ({}) overlaps the POS fields (0..{})",
                self.analyzer.lemma_field, self.analyzer.pos_fields
            )));
        }
        Ok(())
    }
}

pub fn load_config_from_file(file_path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(file_path).map_err(|e| {
        Error::Config(format!(
            "Failed to read {}: {}. Please ensure it exists.",
            file_path.display(),
            e
        ))
    })?;
    let config: Config = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}
