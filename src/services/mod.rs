//! Business services layer.
//!
//! This module contains the two pipelines that sit between the binaries and
//! the store, coordinating the embedding table and the store gateway.
//!
//! # Architecture
//!
//! ```text
//! Binaries (postvec, postvec-search)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Infrastructure (Embedding table, Store gateway)
//! ```
//!
//! # Services Overview
//!
//! - [`UploadService`]: Bulk upserts of vocabulary rows, the mean row and post embeddings
//! - [`SearchService`]: Ranks stored posts against a free-text query

mod search_service;
mod upload_service;

pub use search_service::{SearchHit, SearchOutcome, SearchService};
pub use upload_service::{
    ExportOptions, ExportReport, ExportStart, PopulateReport, UploadService,
};
