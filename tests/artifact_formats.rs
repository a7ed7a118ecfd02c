//! The three artifact formats load to the same table.

use std::collections::HashMap;

use candle_core::{Device, Tensor};
use postvec::embedding::{sidecar_vocab_path, DocumentEmbedder, EmbeddingTable};

fn assert_same_table(table: &EmbeddingTable) {
    assert_eq!(table.dimension(), 2);
    assert_eq!(table.len(), 2);
    assert_eq!(table.get("sun"), Some(&[1.0, 0.0][..]));
    assert_eq!(table.get("moon"), Some(&[0.0, 1.0][..]));
    assert_eq!(table.mean_vector(), &[0.5, 0.5]);
}

#[test]
fn safetensors_with_sidecar_vocabulary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.safetensors");

    let matrix = Tensor::new(&[[1.0f32, 0.0], [0.0, 1.0]], &Device::Cpu).unwrap();
    matrix.save_safetensors("C", &path).unwrap();
    let stoi: HashMap<&str, usize> = [("sun", 0), ("moon", 1)].into_iter().collect();
    std::fs::write(
        sidecar_vocab_path(&path),
        serde_json::to_string(&stoi).unwrap(),
    )
    .unwrap();

    assert_same_table(&EmbeddingTable::load(&path).unwrap());
}

#[test]
fn safetensors_without_vocabulary_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.safetensors");
    let matrix = Tensor::new(&[[1.0f32, 0.0]], &Device::Cpu).unwrap();
    matrix.save_safetensors("C", &path).unwrap();

    assert!(EmbeddingTable::load(&path).is_err());
}

#[test]
fn json_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.json");
    std::fs::write(
        &path,
        r#"{"stoi": {"sun": 0, "moon": 1}, "C": [[1.0, 0.0], [0.0, 1.0]]}"#,
    )
    .unwrap();

    assert_same_table(&EmbeddingTable::load(&path).unwrap());
}

#[test]
fn word_vector_text_with_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vectors.txt");
    std::fs::write(&path, "2 2\nsun 1 0\nmoon 0 1\n").unwrap();

    let table = EmbeddingTable::load(&path).unwrap();
    assert_same_table(&table);

    let embedder = DocumentEmbedder::new(&table);
    assert_eq!(embedder.embed_text("Sun sun, SUN & stars").into_values(), vec![0.875, 0.125]);
}
