/// Sentence embeddings for documentation pages and search queries.
///
/// fastembed's `TextEmbedding` is synchronous and CPU-bound, so every call is
/// shipped to `tokio::task::spawn_blocking`. The model is shared through an
/// `Arc` and only ever touched from blocking tasks.
///
/// nomic-embed-text-v1.5 expects task prefixes: `search_document: ` for
/// indexed text and `search_query: ` for queries. They are added here so
/// callers pass plain text.
use std::sync::Arc;

use crate::error::CommonError;

/// Output width of nomic-embed-text-v1.5.
pub const EMBEDDING_DIM: usize = 768;

/// Pages are embedded a few at a time to bound peak ONNX memory.
const DOCUMENT_BATCH_SIZE: usize = 4;

pub struct Embedder {
    model: Arc<fastembed::TextEmbedding>,
}

impl Embedder {
    /// Loads the model, downloading it (~300MB) on first run.
    pub async fn new() -> Result<Self, CommonError> {
        let model = tokio::task::spawn_blocking(|| {
            let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::NomicEmbedTextV15)
                .with_show_download_progress(true);
            fastembed::TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
        .map_err(|e| CommonError::Embedding(format!("model initialization failed: {e}")))?;

        Ok(Self {
            model: Arc::new(model),
        })
    }

    /// Embeds page texts for indexing; one vector per input, same order.
    pub async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError> {
        let prefixed: Vec<String> = texts.iter().map(|t| document_input(t)).collect();
        let expected = prefixed.len();
        let model = Arc::clone(&self.model);
        let vectors = tokio::task::spawn_blocking(move || {
            model.embed(prefixed, Some(DOCUMENT_BATCH_SIZE))
        })
        .await
        .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
        .map_err(|e| CommonError::Embedding(format!("document embedding failed: {e}")))?;

        if vectors.len() != expected {
            return Err(CommonError::Embedding(format!(
                "embedding count mismatch: expected {expected}, got {}",
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, CommonError> {
        let input = vec![query_input(query)];
        let model = Arc::clone(&self.model);
        let mut vectors = tokio::task::spawn_blocking(move || model.embed(input, None))
            .await
            .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
            .map_err(|e| CommonError::Embedding(format!("query embedding failed: {e}")))?;
        vectors
            .pop()
            .ok_or_else(|| CommonError::Embedding("empty embedding result".to_string()))
    }

    pub fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

fn document_input(text: &str) -> String {
    format!("search_document: {text}")
}

fn query_input(query: &str) -> String {
    format!("search_query: {query}")
}
