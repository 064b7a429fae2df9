mod client;
mod index;


pub use client::{EmbedError, EmbeddingClient};
pub use index::{cosine_similarity, VectorIndex};
