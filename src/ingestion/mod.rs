//! Document ingestion: extraction into records, then chunking

mod chunker;
mod extractor;

pub use chunker::Chunker;
pub use extractor::Extractor;
