//! Round-robin interleaving across sentence buckets.
//!
//! Position 0 of every bucket comes first (in bucket order), then position 1 of
//! every bucket that still has one, and so on up to the longest bucket. The flat
//! stream is then cut into groups of `k`; the last group may be shorter. Tokens
//! that sat next to each other in a sentence end up in different groups, which
//! keeps the generator from reproducing the source line verbatim.
//!
//! This needs every bucket up front: the number of rounds is the length of the
//! longest bucket.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;

use super::bucket::BucketSet;
use crate::types::{
    GenerationBatch, GroupMember, GroupRequest, SentenceId, SourceSentence, Token, TokenId,
    WordGroup,
};

/// Flat round-robin order of every token in `buckets`.
pub fn round_robin(buckets: &BucketSet) -> Vec<TokenId> {
    let max_len = buckets.max_len();
    let mut interleaved = Vec::with_capacity(buckets.token_count());

    for round in 0..max_len {
        for bucket in buckets.iter() {
            if let Some(token) = bucket.tokens.get(round) {
                interleaved.push(token.token_id.clone());
            }
        }
    }
    interleaved
}

pub fn interleave(buckets: &BucketSet, group_size: NonZeroUsize) -> Vec<WordGroup> {
    round_robin(buckets)
        .chunks(group_size.get())
        .enumerate()
        .map(|(group_id, members)| WordGroup {
            group_id,
            members: members.to_vec(),
        })
        .collect()
}

/// Interleaves each run of `sentences_per_batch` buckets on its own.
/// With no batch size the whole set forms a single batch.
pub fn interleave_batches(
    buckets: &BucketSet,
    group_size: NonZeroUsize,
    sentences_per_batch: Option<NonZeroUsize>,
) -> Vec<GenerationBatch> {
    let slices = match sentences_per_batch {
        Some(per_batch) => buckets.slices(per_batch),
        None if buckets.is_empty() => Vec::new(),
        None => vec![buckets.clone()],
    };

    slices
        .iter()
        .enumerate()
        .map(|(batch_index, slice)| GenerationBatch {
            batch_index,
            sentence_ids: slice.iter().map(|b| b.sentence_id.clone()).collect(),
            groups: interleave(slice, group_size),
        })
        .collect()
}

/// Expands a batch's groups into what the generation collaborator receives:
/// member details plus the text of each contributing sentence.
pub fn build_requests(
    batch: &GenerationBatch,
    buckets: &BucketSet,
    sentences: &[SourceSentence],
) -> Vec<GroupRequest> {
    let tokens: HashMap<&TokenId, &Token> = buckets.tokens().map(|t| (&t.token_id, t)).collect();
    let texts: HashMap<&SentenceId, &str> = sentences
        .iter()
        .map(|s| (&s.sentence_id, s.raw_text.as_str()))
        .collect();

    batch
        .groups
        .iter()
        .map(|group| {
            let members: Vec<&Token> = group
                .members
                .iter()
                .filter_map(|id| tokens.get(id).copied())
                .collect();

            let mut seen = HashSet::new();
            let contexts = members
                .iter()
                .filter(|t| seen.insert(t.sentence_id.clone()))
                .filter_map(|t| texts.get(&t.sentence_id).map(|text| text.to_string()))
                .collect();

            GroupRequest {
                batch_index: batch.batch_index,
                group_id: group.group_id,
                members: members.into_iter().map(GroupMember::from).collect(),
                contexts,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::bucket::build_buckets;
    use crate::types::PartOfSpeech;

    fn bucket(order_index: u32, count: usize) -> (SentenceId, Vec<Token>) {
        let sentence_id = SentenceId::from_order_index(order_index);
        let tokens = (0..count)
            .map(|position| Token {
                token_id: TokenId::new(&sentence_id, position),
                sentence_id: sentence_id.clone(),
                surface_form: format!("{}{}", sentence_id, position),
                lemma: format!("{}{}", sentence_id, position),
                pos: PartOfSpeech::Verb,
                position_in_sentence: position,
                reading: None,
            })
            .collect();
        (sentence_id, tokens)
    }

    fn ids(group: &WordGroup) -> Vec<&str> {
        group.members.iter().map(TokenId::as_str).collect()
    }

    fn k(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn interleaves_uneven_buckets() {
        // A=[a0,a1,a2], B=[b0], C=[c0,c1]
        let buckets = build_buckets(vec![bucket(1, 3), bucket(2, 1), bucket(3, 2)]);
        let groups = interleave(&buckets, k(3));

        assert_eq!(groups.len(), 2);
        assert_eq!(ids(&groups[0]), vec!["s1-t0", "s2-t0", "s3-t0"]);
        assert_eq!(ids(&groups[1]), vec!["s1-t1", "s3-t1", "s1-t2"]);
        assert_eq!(groups[0].group_id, 0);
        assert_eq!(groups[1].group_id, 1);
    }

    #[test]
    fn final_group_may_be_short() {
        let buckets = build_buckets(vec![bucket(1, 4), bucket(2, 3)]);
        let sizes: Vec<_> = interleave(&buckets, k(3)).iter().map(WordGroup::size).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn single_bucket_keeps_sentence_order() {
        let buckets = build_buckets(vec![bucket(5, 5)]);
        let groups = interleave(&buckets, k(2));
        assert_eq!(ids(&groups[0]), vec!["s5-t0", "s5-t1"]);
        assert_eq!(ids(&groups[1]), vec!["s5-t2", "s5-t3"]);
        assert_eq!(ids(&groups[2]), vec!["s5-t4"]);
    }

    #[test]
    fn every_token_appears_exactly_once() {
        let buckets = build_buckets(vec![
            bucket(1, 6),
            bucket(2, 1),
            bucket(3, 4),
            bucket(4, 2),
            bucket(5, 7),
        ]);
        for size in 1..=8 {
            let groups = interleave(&buckets, k(size));
            let members: Vec<&TokenId> = groups.iter().flat_map(|g| g.members.iter()).collect();
            assert_eq!(members.len(), buckets.token_count());
            let unique: HashSet<_> = members.iter().collect();
            assert_eq!(unique.len(), members.len());
            assert!(groups.iter().all(|g| g.size() >= 1 && g.size() <= size));
        }
    }

    #[test]
    fn groups_draw_from_distinct_sentences_while_buckets_remain() {
        let buckets = build_buckets(vec![bucket(1, 2), bucket(2, 2), bucket(3, 2)]);
        let groups = interleave(&buckets, k(3));
        for group in &groups {
            let sentences: HashSet<_> = group
                .members
                .iter()
                .map(|id| id.as_str().split('-').next().unwrap_or_default())
                .collect();
            assert_eq!(sentences.len(), 3);
        }
    }

    #[test]
    fn output_is_deterministic() {
        let buckets = build_buckets(vec![bucket(1, 3), bucket(2, 5), bucket(3, 1)]);
        let first = serde_json::to_vec(&interleave(&buckets, k(3))).unwrap();
        let second = serde_json::to_vec(&interleave(&buckets, k(3))).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_bucket_set_yields_no_groups() {
        let buckets = BucketSet::new();
        assert!(interleave(&buckets, k(3)).is_empty());
        assert!(interleave_batches(&buckets, k(3), None).is_empty());
    }

    #[test]
    fn batches_restart_group_ids() {
        let buckets = build_buckets(vec![bucket(1, 2), bucket(2, 2), bucket(3, 4)]);
        let batches = interleave_batches(&buckets, k(3), Some(k(2)));

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].sentence_ids.len(), 2);
        assert_eq!(ids(&batches[0].groups[0]), vec!["s1-t0", "s2-t0", "s1-t1"]);
        assert_eq!(batches[1].batch_index, 1);
        assert_eq!(batches[1].groups[0].group_id, 0);
        assert_eq!(ids(&batches[1].groups[0]), vec!["s3-t0", "s3-t1", "s3-t2"]);
    }

    #[test]
    fn requests_carry_contexts_of_contributing_sentences() {
        let buckets = build_buckets(vec![bucket(1, 2), bucket(2, 1)]);
        let sentences: Vec<SourceSentence> = [(1, "一つ目"), (2, "二つ目")]
            .into_iter()
            .map(|(order_index, text)| SourceSentence {
                sentence_id: SentenceId::from_order_index(order_index),
                order_index,
                raw_text: text.to_string(),
                start_time: None,
                end_time: None,
            })
            .collect();
        let batches = interleave_batches(&buckets, k(2), None);
        let requests = build_requests(&batches[0], &buckets, &sentences);

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].contexts, vec!["一つ目", "二つ目"]);
        assert_eq!(requests[1].members.len(), 1);
        assert_eq!(requests[1].members[0].token_id.as_str(), "s1-t1");
        assert_eq!(requests[1].contexts, vec!["一つ目"]);
    }
}
