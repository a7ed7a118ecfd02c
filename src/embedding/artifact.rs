//! Pretrained embedding artifact formats.
//!
//! An artifact provides two things: a `[vocab, D]` matrix of token vectors
//! and a token → row index mapping. Three on-disk layouts are understood:
//!
//! - `.safetensors`: a 2-D float tensor named `C`, with the mapping in a
//!   `<stem>.vocab.json` sidecar (`{"token": index}`).
//! - `.json`: `{"stoi": {"token": index}, "C": [[...], ...]}`.
//! - anything else: word-vector text, `token v1 v2 .. vD` per line.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use serde::Deserialize;
use thiserror::Error;

/// Name of the embedding matrix inside tensor artifacts.
pub const EMBEDDING_TENSOR: &str = "C";

/// Errors raised while loading an embedding artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    #[error("invalid artifact JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tensor '{0}' not found in artifact")]
    MissingTensor(String),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("row {row} has {found} values, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("token '{token}' points at row {index} but the table has {rows} rows")]
    IndexOutOfRange {
        token: String,
        index: usize,
        rows: usize,
    },

    #[error("embedding table is empty")]
    Empty,
}

/// On-disk layout of an embedding artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// Safetensors matrix plus vocabulary sidecar.
    SafeTensors,
    /// Single JSON document with `stoi` and `C`.
    Json,
    /// Whitespace-separated word-vector text.
    Text,
}

impl ArtifactFormat {
    /// Picks a format from the file extension.
    pub fn detect(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("safetensors") => Self::SafeTensors,
            Some("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Raw artifact contents before validation.
#[derive(Debug, Default)]
pub struct RawArtifact {
    /// Token → row index.
    pub stoi: HashMap<String, usize>,
    /// Row-major vectors.
    pub rows: Vec<Vec<f32>>,
}

/// Default location of the vocabulary sidecar for a tensor artifact.
pub fn sidecar_vocab_path(path: &Path) -> PathBuf {
    path.with_extension("vocab.json")
}

/// Reads an artifact in the given format.
pub fn read(path: &Path, format: ArtifactFormat) -> Result<RawArtifact, ArtifactError> {
    match format {
        ArtifactFormat::SafeTensors => read_safetensors(path, &sidecar_vocab_path(path)),
        ArtifactFormat::Json => read_json(path),
        ArtifactFormat::Text => read_text(path),
    }
}

/// Reads the `C` matrix from a safetensors file and the mapping from `vocab_path`.
pub fn read_safetensors(path: &Path, vocab_path: &Path) -> Result<RawArtifact, ArtifactError> {
    ensure_readable(path)?;
    let mut tensors = candle_core::safetensors::load(path, &Device::Cpu)?;
    let matrix = tensors
        .remove(EMBEDDING_TENSOR)
        .ok_or_else(|| ArtifactError::MissingTensor(EMBEDDING_TENSOR.to_string()))?;
    let rows = matrix.to_dtype(DType::F32)?.to_vec2::<f32>()?;

    let vocab = File::open(vocab_path).map_err(|source| ArtifactError::Io {
        path: vocab_path.to_path_buf(),
        source,
    })?;
    let stoi: HashMap<String, usize> = serde_json::from_reader(BufReader::new(vocab))?;

    Ok(RawArtifact { stoi, rows })
}

#[derive(Deserialize)]
struct JsonArtifact {
    stoi: HashMap<String, usize>,
    #[serde(rename = "C")]
    rows: Vec<Vec<f32>>,
}

/// Reads a single-document JSON artifact.
pub fn read_json(path: &Path) -> Result<RawArtifact, ArtifactError> {
    let file = File::open(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: JsonArtifact = serde_json::from_reader(BufReader::new(file))?;
    Ok(RawArtifact {
        stoi: artifact.stoi,
        rows: artifact.rows,
    })
}

/// Reads word-vector text; the row index of a token is its line order.
///
/// A leading `count dim` header line (word2vec style) is skipped. When a
/// token repeats, the later line wins the mapping.
pub fn read_text(path: &Path) -> Result<RawArtifact, ArtifactError> {
    let file = File::open(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut artifact = RawArtifact::default();

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut fields = line.split_whitespace();
        let Some(token) = fields.next() else {
            continue;
        };
        let rest: Vec<&str> = fields.collect();

        if artifact.rows.is_empty() && is_header(token, &rest) {
            continue;
        }

        let values = rest
            .iter()
            .map(|field| field.parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ArtifactError::Parse {
                line: line_no + 1,
                message: format!("invalid value for '{}': {}", token, e),
            })?;

        artifact.stoi.insert(token.to_string(), artifact.rows.len());
        artifact.rows.push(values);
    }

    Ok(artifact)
}

fn is_header(first: &str, rest: &[&str]) -> bool {
    rest.len() == 1 && first.parse::<usize>().is_ok() && rest[0].parse::<usize>().is_ok()
}

fn ensure_readable(path: &Path) -> Result<(), ArtifactError> {
    std::fs::metadata(path)
        .map(|_| ())
        .map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(
            ArtifactFormat::detect(Path::new("model.safetensors")),
            ArtifactFormat::SafeTensors
        );
        assert_eq!(
            ArtifactFormat::detect(Path::new("model.JSON")),
            ArtifactFormat::Json
        );
        assert_eq!(
            ArtifactFormat::detect(Path::new("glove.6B.200d.txt")),
            ArtifactFormat::Text
        );
        assert_eq!(ArtifactFormat::detect(Path::new("vectors")), ArtifactFormat::Text);
    }

    #[test]
    fn sidecar_sits_next_to_tensor_file() {
        assert_eq!(
            sidecar_vocab_path(Path::new("/models/weights.safetensors")),
            PathBuf::from("/models/weights.vocab.json")
        );
    }

    #[test]
    fn text_reader_skips_header_and_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "2 2").unwrap();
        writeln!(file, "a 1 0").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "b 0 1").unwrap();

        let artifact = read_text(file.path()).unwrap();
        assert_eq!(artifact.rows, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(artifact.stoi.get("a"), Some(&0));
        assert_eq!(artifact.stoi.get("b"), Some(&1));
    }

    #[test]
    fn text_reader_reports_bad_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a 1 0").unwrap();
        writeln!(file, "b 0 oops").unwrap();

        let err = read_text(file.path()).unwrap_err();
        match err {
            ArtifactError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read(Path::new("/nonexistent/model.json"), ArtifactFormat::Json).unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/model.json"));
    }
}
