//! Immutable token → vector table loaded from a pretrained artifact.

use std::collections::HashMap;
use std::path::Path;

use super::artifact::{self, ArtifactError, ArtifactFormat, RawArtifact};

/// Pretrained word-embedding table.
///
/// Every vector has the same dimensionality `D`. The mean of all rows is
/// computed once at construction and serves as the fallback representation
/// for unknown tokens and empty documents.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    dimension: usize,
    /// Token → row index in `rows`.
    index: HashMap<String, usize>,
    /// Row-major matrix, `row_count * dimension` values.
    rows: Vec<f32>,
    row_count: usize,
    mean: Vec<f32>,
}

impl EmbeddingTable {
    /// Loads a table from disk, picking the format from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let format = ArtifactFormat::detect(path);
        let table = Self::from_raw(artifact::read(path, format)?)?;
        tracing::info!(
            path = %path.display(),
            ?format,
            tokens = table.len(),
            dimension = table.dimension(),
            "Loaded embedding table"
        );
        Ok(table)
    }

    /// Loads a safetensors matrix with an explicitly located vocabulary file.
    pub fn load_safetensors(
        path: impl AsRef<Path>,
        vocab_path: impl AsRef<Path>,
    ) -> Result<Self, ArtifactError> {
        let (path, vocab_path) = (path.as_ref(), vocab_path.as_ref());
        let table = Self::from_raw(artifact::read_safetensors(path, vocab_path)?)?;
        tracing::info!(
            path = %path.display(),
            vocab = %vocab_path.display(),
            tokens = table.len(),
            dimension = table.dimension(),
            "Loaded embedding table"
        );
        Ok(table)
    }

    /// Builds a table from a token → index mapping and the row matrix.
    ///
    /// Fails when the matrix is empty, rows differ in length, or a token
    /// points past the last row.
    pub fn from_parts(
        stoi: HashMap<String, usize>,
        rows: Vec<Vec<f32>>,
    ) -> Result<Self, ArtifactError> {
        let first = rows.first().ok_or(ArtifactError::Empty)?;
        let dimension = first.len();
        if dimension == 0 {
            return Err(ArtifactError::Empty);
        }

        let row_count = rows.len();
        let mut flat = Vec::with_capacity(row_count * dimension);
        let mut sums = vec![0f64; dimension];
        for (row, values) in rows.iter().enumerate() {
            if values.len() != dimension {
                return Err(ArtifactError::Ragged {
                    row,
                    expected: dimension,
                    found: values.len(),
                });
            }
            for (sum, value) in sums.iter_mut().zip(values) {
                *sum += f64::from(*value);
            }
            flat.extend_from_slice(values);
        }

        if let Some((token, index)) = stoi.iter().find(|(_, index)| **index >= row_count) {
            return Err(ArtifactError::IndexOutOfRange {
                token: token.clone(),
                index: *index,
                rows: row_count,
            });
        }

        let mean = sums
            .into_iter()
            .map(|sum| (sum / row_count as f64) as f32)
            .collect();

        Ok(Self {
            dimension,
            index: stoi,
            rows: flat,
            row_count,
            mean,
        })
    }

    fn from_raw(raw: RawArtifact) -> Result<Self, ArtifactError> {
        Self::from_parts(raw.stoi, raw.rows)
    }

    /// Vector length `D`.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vocabulary tokens.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of rows in the matrix.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns whether the token is in the vocabulary.
    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    /// Looks up the vector for a token.
    pub fn get(&self, token: &str) -> Option<&[f32]> {
        self.index.get(token).map(|&index| self.row(index))
    }

    /// Element-wise mean of every row.
    pub fn mean_vector(&self) -> &[f32] {
        &self.mean
    }

    /// Vocabulary entries ordered by their original index.
    ///
    /// Tokens sharing an index are ordered by label so the order is stable
    /// across runs.
    pub fn entries(&self) -> Vec<TableEntry<'_>> {
        let mut entries: Vec<TableEntry<'_>> = self
            .index
            .iter()
            .map(|(token, &index)| TableEntry {
                token: token.as_str(),
                index,
                vector: self.row(index),
            })
            .collect();
        entries.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.token.cmp(b.token)));
        entries
    }

    fn row(&self, index: usize) -> &[f32] {
        let start = index * self.dimension;
        &self.rows[start..start + self.dimension]
    }
}

/// A single vocabulary entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableEntry<'a> {
    /// Token label.
    pub token: &'a str,
    /// Original vocabulary index.
    pub index: usize,
    /// Token vector.
    pub vector: &'a [f32],
}
