//! Whole-file orchestration: cues in, generation batches out, and later
//! generated items back to tokens.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::filter::TokenizedSentence;
use crate::pipeline::{
    build_requests, interleave_batches, map_items, normalize_cue, tokenize_sentence, BucketSet,
    FilterRules, FilterStats, MappingReport, MorphAnalyzer, TokenIndex, Vocabulary,
};
use crate::types::{
    Cue, GeneratedItem, GenerationBatch, GroupRequest, SentenceId, SourceSentence,
};

/// What happened to each cue, in order_index order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SentenceOutcome {
    Bucketed {
        order_index: u32,
        sentence_id: SentenceId,
        tokens: usize,
    },
    /// Nothing left after normalization; skipped, not failed.
    EmptyNormalizedSentence { order_index: u32 },
    /// Every morpheme was filtered out; no bucket, no error.
    NoTokens {
        order_index: u32,
        sentence_id: SentenceId,
    },
    /// The analyzer rejected the sentence; it is excluded from bucketing.
    AnalysisFailed {
        order_index: u32,
        sentence_id: SentenceId,
        reason: String,
    },
    DuplicateOrderIndex { order_index: u32 },
}

/// Shared flag checked at sentence boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything produced for one subtitle file before generation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PreparedRun {
    pub source_name: String,
    pub group_size: usize,
    pub sentences: Vec<SourceSentence>,
    pub buckets: BucketSet,
    pub batches: Vec<GenerationBatch>,
    pub requests: Vec<GroupRequest>,
    pub outcomes: Vec<SentenceOutcome>,
    pub filter_stats: FilterStats,
    pub vocabulary: Vocabulary,
}

impl PreparedRun {
    pub fn token_index(&self) -> TokenIndex {
        TokenIndex::from_buckets(&self.buckets)
    }

    pub fn analysis_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SentenceOutcome::AnalysisFailed { .. }))
            .count()
    }

    pub fn group_count(&self) -> usize {
        self.batches.iter().map(|b| b.groups.len()).sum()
    }

    /// Resolves one batch of generated items against this run's tokens.
    pub fn reconcile<I>(&self, items: I) -> MappingReport
    where
        I: IntoIterator<Item = GeneratedItem>,
    {
        map_items(&self.token_index(), items)
    }
}

pub struct SubtitlePipeline {
    rules: FilterRules,
    group_size: NonZeroUsize,
    sentences_per_batch: Option<NonZeroUsize>,
    analyzer: Box<dyn MorphAnalyzer>,
}

impl SubtitlePipeline {
    /// Validates configuration up front; a bad group size never reaches the cues.
    pub fn new(config: &Config, analyzer: Box<dyn MorphAnalyzer>) -> Result<Self> {
        let group_size = config.group_size()?;
        let sentences_per_batch = config.batch_size()?;
        config.validate()?;
        let rules = FilterRules::from_config(config)?;

        Ok(SubtitlePipeline {
            rules,
            group_size,
            sentences_per_batch,
            analyzer,
        })
    }

    pub fn prepare(&self, source_name: &str, cues: &[Cue], cancel: &CancelFlag) -> Result<PreparedRun> {
        info!("Preparing {} ({} cues)", source_name, cues.len());

        // Subtitle order is order_index order; the sort is stable so repeats keep file order.
        let mut ordered: Vec<&Cue> = cues.iter().collect();
        ordered.sort_by_key(|cue| cue.order_index);

        // Only a cue with text left after cleaning claims its order index.
        let mut seen = HashSet::new();
        let mut normalized: Vec<std::result::Result<SourceSentence, SentenceOutcome>> =
            Vec::with_capacity(ordered.len());
        for cue in ordered {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let Some(sentence) = normalize_cue(cue) else {
                normalized.push(Err(SentenceOutcome::EmptyNormalizedSentence {
                    order_index: cue.order_index,
                }));
                continue;
            };
            if !seen.insert(cue.order_index) {
                warn!(order_index = cue.order_index, "duplicate cue order index, skipped");
                normalized.push(Err(SentenceOutcome::DuplicateOrderIndex {
                    order_index: cue.order_index,
                }));
                continue;
            }
            normalized.push(Ok(sentence));
        }

        // Sentences are independent; collect keeps cue order.
        let analyzed: Vec<Option<std::result::Result<TokenizedSentence, String>>> = normalized
            .par_iter()
            .map(|entry| match entry {
                Ok(sentence) if !cancel.is_cancelled() => Some(
                    tokenize_sentence(self.analyzer.as_ref(), &self.rules, sentence)
                        .map_err(|e| e.to_string()),
                ),
                _ => None,
            })
            .collect();
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // Bucket building waits for every sentence of the file.
        let mut buckets = BucketSet::new();
        let mut sentences = Vec::new();
        let mut outcomes = Vec::with_capacity(cues.len());
        let mut filter_stats = FilterStats::default();

        for (entry, analysis) in normalized.into_iter().zip(analyzed) {
            let sentence = match entry {
                Ok(sentence) => sentence,
                Err(outcome) => {
                    outcomes.push(outcome);
                    continue;
                }
            };
            let order_index = sentence.order_index;
            let sentence_id = sentence.sentence_id.clone();

            match analysis {
                Some(Ok(tokenized)) => {
                    filter_stats.merge(&tokenized.stats);
                    let count = tokenized.tokens.len();
                    buckets.insert(sentence_id.clone(), tokenized.tokens);
                    outcomes.push(if count == 0 {
                        SentenceOutcome::NoTokens {
                            order_index,
                            sentence_id,
                        }
                    } else {
                        SentenceOutcome::Bucketed {
                            order_index,
                            sentence_id,
                            tokens: count,
                        }
                    });
                }
                Some(Err(reason)) => {
                    warn!(sentence_id = %sentence_id, "analysis failed: {}", reason);
                    outcomes.push(SentenceOutcome::AnalysisFailed {
                        order_index,
                        sentence_id,
                        reason,
                    });
                }
                None => return Err(Error::Cancelled),
            }
            sentences.push(sentence);
        }

        let batches = interleave_batches(&buckets, self.group_size, self.sentences_per_batch);
        let requests = batches
            .iter()
            .flat_map(|batch| build_requests(batch, &buckets, &sentences))
            .collect();

        let mut vocabulary = Vocabulary::new();
        vocabulary.populate_from_buckets(&buckets);

        let run = PreparedRun {
            source_name: source_name.to_string(),
            group_size: self.group_size.get(),
            sentences,
            buckets,
            batches,
            requests,
            outcomes,
            filter_stats,
            vocabulary,
        };

        let failures = run.analysis_failures();
        if failures > 0 {
            warn!("{} sentence(s) failed analysis and were excluded", failures);
        }
        info!(
            "Prepared {}: {} buckets, {} tokens, {} groups in {} batch(es)",
            run.source_name,
            run.buckets.len(),
            run.buckets.token_count(),
            run.group_count(),
            run.batches.len()
        );
        Ok(run)
    }
}
