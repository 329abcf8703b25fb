pub mod generation;
pub mod subtitle;

pub use generation::{
    GeneratedItem, GenerationBatch, GroupMember, GroupRequest, MappingIssue, ResolvedRecord,
    WordGroup,
};
pub use subtitle::{Cue, PartOfSpeech, SentenceId, SourceSentence, Token, TokenId};
