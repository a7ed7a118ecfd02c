//! Document embedder.
//!
//! A document vector is the element-wise mean of its token vectors, looked
//! up in a pretrained [`EmbeddingTable`]. Out-of-vocabulary tokens count
//! as the table's mean vector instead of being dropped, so a post full of
//! unknown words is not dominated by the few words the table does know.

use super::ranker::cosine_similarity;
use super::table::EmbeddingTable;
use super::tokenizer::tokenize;

/// A vector embedding representing text semantics.
///
/// The dimensionality matches the table it was computed from
/// (200 for the site's model).
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector.
    pub values: Vec<f32>,
}

impl Embedding {
    /// Creates a new embedding from a vector of values.
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Returns the dimensionality of this embedding.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Computes cosine similarity with another embedding.
    ///
    /// Returns a value between -1.0 and 1.0, where 1.0 means identical.
    /// Zero vectors and mismatched dimensions score 0.0.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        cosine_similarity(&self.values, &other.values)
    }

    /// Consumes the embedding, returning the raw vector.
    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.values
    }
}

/// How many tokens of a document the vocabulary knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenCoverage {
    /// Tokens found in the table.
    pub known: usize,
    /// All tokens.
    pub total: usize,
}

impl TokenCoverage {
    /// Tokens that fell back to the mean vector.
    pub fn unknown(&self) -> usize {
        self.total - self.known
    }
}

/// Turns token sequences into document embeddings.
#[derive(Debug, Clone, Copy)]
pub struct DocumentEmbedder<'a> {
    table: &'a EmbeddingTable,
}

impl<'a> DocumentEmbedder<'a> {
    /// Creates an embedder over a loaded table.
    pub fn new(table: &'a EmbeddingTable) -> Self {
        Self { table }
    }

    /// The table backing this embedder.
    pub fn table(&self) -> &'a EmbeddingTable {
        self.table
    }

    /// Embeds an already tokenized document.
    ///
    /// Returns the table's mean vector when the sequence is empty or none
    /// of its tokens are in the vocabulary.
    pub fn embed_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Embedding {
        let mean = self.table.mean_vector();
        if !tokens.iter().any(|t| self.table.contains(t.as_ref())) {
            return Embedding::new(mean.to_vec());
        }

        let mut sums = vec![0f32; self.table.dimension()];
        for token in tokens {
            let vector = self.table.get(token.as_ref()).unwrap_or(mean);
            for (sum, value) in sums.iter_mut().zip(vector) {
                *sum += value;
            }
        }

        let count = tokens.len() as f32;
        for sum in &mut sums {
            *sum /= count;
        }
        Embedding::new(sums)
    }

    /// Tokenizes and embeds raw text.
    pub fn embed_text(&self, text: &str) -> Embedding {
        self.embed_tokens(&tokenize(text))
    }

    /// Embeds a batch of texts, preserving order.
    pub fn embed_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Embedding> {
        texts.iter().map(|t| self.embed_text(t.as_ref())).collect()
    }

    /// Lazily embeds texts as they are pulled from the iterator.
    pub fn embed_stream<I>(&self, texts: I) -> impl Iterator<Item = Embedding> + 'a
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        I::IntoIter: 'a,
    {
        let embedder = *self;
        texts
            .into_iter()
            .map(move |text| embedder.embed_text(text.as_ref()))
    }

    /// Counts the tokens the vocabulary knows.
    pub fn coverage<S: AsRef<str>>(&self, tokens: &[S]) -> TokenCoverage {
        TokenCoverage {
            known: tokens
                .iter()
                .filter(|t| self.table.contains(t.as_ref()))
                .count(),
            total: tokens.len(),
        }
    }
}
