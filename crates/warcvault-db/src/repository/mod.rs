//! Repositories over the fast store.

mod collection;
mod commit;
mod profile;
mod recording;

pub use collection::CollectionRepository;
pub use commit::CommitTracker;
pub use profile::ProfileRepository;
pub use recording::RecordingRepository;
