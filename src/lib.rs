//! postvec - Word-vector document embeddings and similarity search
//!
//! This crate embeds blog posts by averaging pretrained word vectors,
//! writes the vectors into a hosted table store, and ranks stored posts
//! against free-text queries by cosine similarity.

pub mod app;
pub mod config;
pub mod domain;
pub mod embedding;
pub mod services;
pub mod storage;

pub use app::App;
