//! GeoSage Ingest — context excerpts and overlap-safe NER chunking.

pub mod chunking;
pub mod context;

pub use chunking::{split_chunks, EntitySpan, NerChunker, TextChunk};
pub use context::get_context;
