//! Zero-shot classifier implementations and result caching.

pub mod cache;
pub mod huggingface;

pub use cache::{text_hash, TextCache};
pub use huggingface::{HuggingFaceClassifier, DEFAULT_MODEL};
