//! Warcvault Worker Library
//!
//! The storage committer: consolidates each closed recording's index
//! fragments into a CDXJ file and migrates the recording's files to the
//! durable backend of its collection.

pub mod committer;
pub mod index_writer;
pub mod runner;
pub mod telemetry;

pub use committer::{CycleSummary, RecordingOutcome, StorageCommitter};
pub use index_writer::IndexWriter;
pub use runner::{CommitterService, CommitterServiceConfig, CLOSE_IDLE_CHANNEL};
