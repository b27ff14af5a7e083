//! Evidence chunks: retrieved passages plus citation metadata.

mod model;


pub use model::{Citation, EvidenceChunk};
