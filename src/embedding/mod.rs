//! Word-vector embeddings and similarity ranking.
//!
//! This module turns post text into fixed-length vectors using a
//! pretrained word-embedding table and ranks stored vectors against a
//! query by cosine similarity.
//!
//! # Architecture
//!
//! - [`EmbeddingTable`] - Immutable token → vector table loaded from disk
//! - [`tokenize`] - Raw text → normalized lowercase tokens
//! - [`DocumentEmbedder`] - Tokens → mean vector, with a mean-vector fallback
//! - [`rank`] - Top-k candidates by cosine similarity
//!
//! # Example
//!
//! ```ignore
//! use postvec::embedding::{rank, DocumentEmbedder, EmbeddingTable};
//!
//! let table = EmbeddingTable::load("model_weights.safetensors")?;
//! let embedder = DocumentEmbedder::new(&table);
//!
//! let query = embedder.embed_text("project deadline");
//! let results = rank(&query.values, candidates, 10);
//! ```

mod artifact;
mod engine;
mod ranker;
mod table;
mod tokenizer;

pub use artifact::{sidecar_vocab_path, ArtifactError, ArtifactFormat, EMBEDDING_TENSOR};
pub use engine::{DocumentEmbedder, Embedding, TokenCoverage};
pub use ranker::{cosine_similarity, rank, Ranked, DEFAULT_LIMIT};
pub use table::{EmbeddingTable, TableEntry};
pub use tokenizer::{normalize_quotes, tokenize};
