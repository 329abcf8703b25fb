//! Subtitle tokenization and interleaving pipeline.
//!
//! Turns timestamped subtitle cues into de-contextualized word groups for a
//! generation step, then reconciles the generated items back to the exact
//! source tokens they describe.

pub mod config;
pub mod error;
pub mod types;
pub mod parsing;
pub mod pipeline;
pub mod report_io;
pub mod runner;

pub use config::{load_config_from_file, Config};
pub use error::{Error, Result};
pub use runner::{CancelFlag, PreparedRun, SentenceOutcome, SubtitlePipeline};
