pub mod dedup;

pub use dedup::{dedup_journal, find_duplicates, DedupReport};
