use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::subtitle::{PartOfSpeech, SentenceId, Token, TokenId};

/// A chunk of interleaved tokens sent as one unit to the generation collaborator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WordGroup {
    pub group_id: usize,
    pub members: Vec<TokenId>,
}

impl WordGroup {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// One batch of sentences interleaved together. Group ids restart at 0 per batch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerationBatch {
    pub batch_index: usize,
    pub sentence_ids: Vec<SentenceId>,
    pub groups: Vec<WordGroup>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GroupMember {
    pub token_id: TokenId,
    pub surface_form: String,
    pub lemma: String,
    pub pos: PartOfSpeech,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading: Option<String>,
}

impl From<&Token> for GroupMember {
    fn from(token: &Token) -> Self {
        GroupMember {
            token_id: token.token_id.clone(),
            surface_form: token.surface_form.clone(),
            lemma: token.lemma.clone(),
            pos: token.pos,
            reading: token.reading.clone(),
        }
    }
}

/// What the generation collaborator receives per WordGroup: the members plus the
/// raw text of every sentence that contributed one of them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GroupRequest {
    pub batch_index: usize,
    pub group_id: usize,
    pub members: Vec<GroupMember>,
    pub contexts: Vec<String>,
}

/// Generated content keyed by the token identity the collaborator claims it belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeneratedItem {
    pub claimed_token_id: TokenId,
    pub content: Value,
}

/// Reasons a generated item (or a token) did not resolve. These feed the
/// external retry loop and are never raised as errors.
#[derive(Error, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "token_id")]
pub enum MappingIssue {
    #[error("token {0} was claimed more than once")]
    DuplicateClaim(TokenId),

    #[error("token {0} was never issued")]
    UnknownTokenId(TokenId),

    #[error("token {0} received no generated content")]
    UnresolvedToken(TokenId),
}

/// Mapper output, one per GeneratedItem, in arrival order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolvedRecord {
    Resolved { token: Token, content: Value },
    Failed { issue: MappingIssue, content: Value },
}

impl ResolvedRecord {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolvedRecord::Resolved { .. })
    }

    pub fn issue(&self) -> Option<&MappingIssue> {
        match self {
            ResolvedRecord::Resolved { .. } => None,
            ResolvedRecord::Failed { issue, .. } => Some(issue),
        }
    }
}
