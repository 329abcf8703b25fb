pub mod analyzer;
pub mod bucket;
pub mod filter;
pub mod interleaver;
pub mod mapper;
pub mod normalizer;
pub mod vocabulary;

// Re-export the stage entry points the runner and the binary use
pub use analyzer::{AnalyzerError, DictionaryAnalyzer, MorphAnalyzer, Morpheme};
pub use bucket::{build_buckets, BucketSet, SentenceBucket};
pub use filter::{tokenize_sentence, FilterRules, FilterStats, SkipReason};
pub use interleaver::{build_requests, interleave, interleave_batches};
pub use mapper::{map_items, resolve, ClaimLedger, ConcurrentMapper, MappingReport, TokenIndex};
pub use normalizer::{normalize_cue, normalize_text};
pub use vocabulary::Vocabulary;
