//! Reconciles generated items back to the tokens they claim.
//!
//! Claim tracking lives in an explicit `ClaimLedger` that is threaded through
//! `resolve`, so one mapping batch can never leak claims into another.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::warn;

use super::bucket::BucketSet;
use crate::types::{GeneratedItem, MappingIssue, ResolvedRecord, Token, TokenId};

/// Every token issued to the generation collaborator, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TokenIndex {
    order: Vec<TokenId>,
    tokens: HashMap<TokenId, Token>,
}

impl TokenIndex {
    pub fn from_buckets(buckets: &BucketSet) -> Self {
        let mut index = TokenIndex::default();
        for token in buckets.tokens() {
            index.order.push(token.token_id.clone());
            index.tokens.insert(token.token_id.clone(), token.clone());
        }
        index
    }

    pub fn get(&self, token_id: &TokenId) -> Option<&Token> {
        self.tokens.get(token_id)
    }

    /// Ids in bucket order.
    pub fn ids(&self) -> impl Iterator<Item = &TokenId> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Token ids already claimed within one mapping batch.
#[derive(Debug, Clone, Default)]
pub struct ClaimLedger {
    claimed: HashSet<TokenId>,
}

impl ClaimLedger {
    pub fn is_claimed(&self, token_id: &TokenId) -> bool {
        self.claimed.contains(token_id)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }

    /// Indexed tokens nobody claimed, in bucket order.
    pub fn unresolved(&self, index: &TokenIndex) -> Vec<TokenId> {
        index
            .ids()
            .filter(|id| !self.claimed.contains(*id))
            .cloned()
            .collect()
    }
}

/// Resolves one item against the index. The ledger goes in and comes back out
/// with the claim recorded when the item resolved.
pub fn resolve(
    mut ledger: ClaimLedger,
    index: &TokenIndex,
    item: GeneratedItem,
) -> (ClaimLedger, ResolvedRecord) {
    let GeneratedItem {
        claimed_token_id,
        content,
    } = item;

    let record = match index.get(&claimed_token_id) {
        None => {
            warn!(token_id = %claimed_token_id, "generated item claims an unknown token");
            ResolvedRecord::Failed {
                issue: MappingIssue::UnknownTokenId(claimed_token_id),
                content,
            }
        }
        Some(_) if ledger.is_claimed(&claimed_token_id) => {
            warn!(token_id = %claimed_token_id, "token claimed more than once");
            ResolvedRecord::Failed {
                issue: MappingIssue::DuplicateClaim(claimed_token_id),
                content,
            }
        }
        Some(token) => {
            let token = token.clone();
            ledger.claimed.insert(claimed_token_id);
            ResolvedRecord::Resolved { token, content }
        }
    };
    (ledger, record)
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MappingReport {
    /// One record per generated item, in input order.
    pub records: Vec<ResolvedRecord>,
    /// Tokens the collaborator never returned content for.
    pub unresolved: Vec<TokenId>,
}

impl MappingReport {
    pub fn resolved_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_resolved()).count()
    }

    /// Every problem, itemized: failed records first, then unresolved tokens.
    pub fn issues(&self) -> Vec<MappingIssue> {
        self.records
            .iter()
            .filter_map(|r| r.issue().cloned())
            .chain(
                self.unresolved
                    .iter()
                    .cloned()
                    .map(MappingIssue::UnresolvedToken),
            )
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.issues().is_empty()
    }
}

/// Maps a whole batch with a fresh ledger.
pub fn map_items<I>(index: &TokenIndex, items: I) -> MappingReport
where
    I: IntoIterator<Item = GeneratedItem>,
{
    let mut ledger = ClaimLedger::default();
    let mut records = Vec::new();
    for item in items {
        let (next, record) = resolve(ledger, index, item);
        ledger = next;
        records.push(record);
    }
    let unresolved = ledger.unresolved(index);
    if !unresolved.is_empty() {
        warn!("{} token(s) received no generated content", unresolved.len());
    }
    MappingReport {
        records,
        unresolved,
    }
}

#[derive(Default)]
struct MapperState {
    ledger: ClaimLedger,
    records: Vec<ResolvedRecord>,
}

/// Mapper front end for callers that run generation calls concurrently.
///
/// Items are resolved one at a time under a single lock, so duplicate-claim
/// detection stays exact; records are kept in arrival order.
pub struct ConcurrentMapper<'a> {
    index: &'a TokenIndex,
    state: Mutex<MapperState>,
}

impl<'a> ConcurrentMapper<'a> {
    pub fn new(index: &'a TokenIndex) -> Self {
        ConcurrentMapper {
            index,
            state: Mutex::new(MapperState::default()),
        }
    }

    pub fn submit(&self, item: GeneratedItem) -> ResolvedRecord {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let ledger = std::mem::take(&mut state.ledger);
        let (ledger, record) = resolve(ledger, self.index, item);
        state.ledger = ledger;
        state.records.push(record.clone());
        record
    }

    pub fn finish(self) -> MappingReport {
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        MappingReport {
            unresolved: state.ledger.unresolved(self.index),
            records: state.records,
        }
    }
}
