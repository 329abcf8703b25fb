use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use tracing::warn;

use crate::types::{SentenceId, Token};

/// The filtered tokens of one sentence, in sentence position order. Never empty.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SentenceBucket {
    pub sentence_id: SentenceId,
    pub tokens: Vec<Token>,
}

impl SentenceBucket {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketInsert {
    Inserted,
    /// Zero tokens; no bucket is created.
    Empty,
    /// The sentence already has a bucket; buckets are write-once.
    Duplicate,
}

/// Buckets in the order their sentences were received (subtitle order).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(try_from = "Vec<SentenceBucket>", into = "Vec<SentenceBucket>")]
pub struct BucketSet {
    buckets: Vec<SentenceBucket>,
    positions: HashMap<SentenceId, usize>,
}

impl BucketSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sentence_id: SentenceId, tokens: Vec<Token>) -> BucketInsert {
        if tokens.is_empty() {
            return BucketInsert::Empty;
        }
        if self.positions.contains_key(&sentence_id) {
            warn!(sentence_id = %sentence_id, "bucket already exists, keeping the first one");
            return BucketInsert::Duplicate;
        }
        self.positions.insert(sentence_id.clone(), self.buckets.len());
        self.buckets.push(SentenceBucket {
            sentence_id,
            tokens,
        });
        BucketInsert::Inserted
    }

    pub fn get(&self, sentence_id: &SentenceId) -> Option<&SentenceBucket> {
        self.positions.get(sentence_id).map(|&i| &self.buckets[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SentenceBucket> {
        self.buckets.iter()
    }

    pub fn buckets(&self) -> &[SentenceBucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.buckets.iter().map(SentenceBucket::len).sum()
    }

    pub fn max_len(&self) -> usize {
        self.buckets.iter().map(SentenceBucket::len).max().unwrap_or(0)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.buckets.iter().flat_map(|b| b.tokens.iter())
    }

    /// Consecutive runs of `per_slice` buckets, order preserved.
    pub fn slices(&self, per_slice: NonZeroUsize) -> Vec<BucketSet> {
        self.buckets
            .chunks(per_slice.get())
            .map(|chunk| {
                let mut set = BucketSet::new();
                for bucket in chunk {
                    set.insert(bucket.sentence_id.clone(), bucket.tokens.clone());
                }
                set
            })
            .collect()
    }
}

impl TryFrom<Vec<SentenceBucket>> for BucketSet {
    type Error = String;

    fn try_from(buckets: Vec<SentenceBucket>) -> Result<Self, Self::Error> {
        let mut set = BucketSet::new();
        for bucket in buckets {
            if bucket
                .tokens
                .iter()
                .any(|t| t.sentence_id != bucket.sentence_id)
            {
                return Err(format!(
                    "bucket {} holds tokens from another sentence",
                    bucket.sentence_id
                ));
            }
            let id = bucket.sentence_id.clone();
            match set.insert(bucket.sentence_id, bucket.tokens) {
                BucketInsert::Inserted => {}
                BucketInsert::Empty => return Err(format!("bucket {} is empty", id)),
                BucketInsert::Duplicate => return Err(format!("bucket {} appears twice", id)),
            }
        }
        Ok(set)
    }
}

impl From<BucketSet> for Vec<SentenceBucket> {
    fn from(set: BucketSet) -> Self {
        set.buckets
    }
}

/// Collects per-sentence token lists into buckets, dropping sentences that
/// yielded nothing.
pub fn build_buckets<I>(sentences: I) -> BucketSet
where
    I: IntoIterator<Item = (SentenceId, Vec<Token>)>,
{
    let mut set = BucketSet::new();
    for (sentence_id, tokens) in sentences {
        set.insert(sentence_id, tokens);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PartOfSpeech, TokenId};

    fn tokens(order_index: u32, count: usize) -> (SentenceId, Vec<Token>) {
        let sentence_id = SentenceId::from_order_index(order_index);
        let tokens = (0..count)
            .map(|position| Token {
                token_id: TokenId::new(&sentence_id, position),
                sentence_id: sentence_id.clone(),
                surface_form: format!("w{}", position),
                lemma: format!("w{}", position),
                pos: PartOfSpeech::Noun,
                position_in_sentence: position,
                reading: None,
            })
            .collect();
        (sentence_id, tokens)
    }

    #[test]
    fn empty_sentences_produce_no_bucket() {
        let set = build_buckets(vec![tokens(1, 2), tokens(2, 0), tokens(3, 1)]);
        assert_eq!(set.len(), 2);
        assert!(set.get(&SentenceId::from_order_index(2)).is_none());
        assert!(set.iter().all(|b| !b.is_empty()));
        assert_eq!(set.token_count(), 3);
        assert_eq!(set.max_len(), 2);
    }

    #[test]
    fn preserves_received_order() {
        let set = build_buckets(vec![tokens(9, 1), tokens(2, 1), tokens(5, 1)]);
        let ids: Vec<_> = set.iter().map(|b| b.sentence_id.as_str()).collect();
        assert_eq!(ids, vec!["s9", "s2", "s5"]);
    }

    #[test]
    fn buckets_are_write_once() {
        let mut set = BucketSet::new();
        let (id, first) = tokens(1, 2);
        assert_eq!(set.insert(id.clone(), first), BucketInsert::Inserted);
        let (_, second) = tokens(1, 5);
        assert_eq!(set.insert(id.clone(), second), BucketInsert::Duplicate);
        assert_eq!(set.get(&id).unwrap().len(), 2);
    }

    #[test]
    fn slices_keep_order() {
        let set = build_buckets(vec![tokens(1, 1), tokens(2, 2), tokens(3, 3)]);
        let slices = set.slices(NonZeroUsize::new(2).unwrap());
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].len(), 2);
        assert_eq!(slices[1].buckets()[0].sentence_id.as_str(), "s3");
    }

    #[test]
    fn deserialization_rejects_empty_bucket() {
        let json = r#"[{"sentence_id": "s1", "tokens": []}]"#;
        assert!(serde_json::from_str::<BucketSet>(json).is_err());
    }

    #[test]
    fn json_keeps_lookup_index() {
        let set = build_buckets(vec![tokens(1, 2), tokens(4, 1)]);
        let json = serde_json::to_string(&set).unwrap();
        let restored: BucketSet = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, set);
        assert_eq!(restored.get(&SentenceId::from_order_index(4)).unwrap().len(), 1);
    }
}
