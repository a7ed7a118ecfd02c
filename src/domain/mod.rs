//! Domain layer types for postvec.
//!
//! Rows of the two store tables (`posts` and `embeddings`) and the
//! identifier type shared between them.

mod post;
mod record;
mod types;
pub mod vector;

pub use post::Post;
pub use record::{EmbeddingRecord, StoredEmbedding, MEAN_EMBEDDING_LABEL, POST_LABEL_PREFIX};
pub use types::PostId;
