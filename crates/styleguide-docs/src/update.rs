/// Keeps the vector index in step with the content tree.
///
/// The corpus digest stored in Redis stands for "what is indexed". On startup
/// and on `update_docs`, the tree is re-read; a different digest (or a missing
/// LanceDB table) triggers a full re-index.
use std::sync::Arc;

use arrow_array::{ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use tracing::info;

use crate::cache::DocsCache;
use crate::config::Config;
use crate::corpus::Corpus;
use crate::error::AppError;
use crate::parser;
use crate::search::SearchEngine;
use crate::traversal::ContentTree;
use docs_common::embedding::Embedder;
use docs_common::vectordb::VectorDb;

pub struct UpdateResult {
    /// `false` when the index already matched the tree.
    pub updated: bool,
    pub digest: String,
    pub document_count: usize,
}

pub struct UpdateService {
    config: Config,
    embedder: Arc<Embedder>,
    vectordb: Arc<VectorDb>,
    cache: Arc<DocsCache>,
}

impl UpdateService {
    pub fn new(
        config: Config,
        embedder: Arc<Embedder>,
        vectordb: Arc<VectorDb>,
        cache: Arc<DocsCache>,
    ) -> Self {
        Self {
            config,
            embedder,
            vectordb,
            cache,
        }
    }

    /// Walks the tree on a blocking thread.
    pub async fn load_corpus(&self) -> Result<Corpus, AppError> {
        let layout = self.config.layout.clone();
        tokio::task::spawn_blocking(move || Corpus::load(&ContentTree::new(layout)))
            .await
            .map_err(|e| AppError::Index(format!("corpus load task failed: {e}")))
    }

    /// `true` when `corpus` differs from what the index was built from.
    pub async fn needs_update(&self, corpus: &Corpus) -> Result<bool, AppError> {
        let digest = corpus.digest();
        match self.cache.get_corpus_digest().await {
            Some(indexed) if indexed == digest => {
                if self.vectordb.table_exists(SearchEngine::table_name()).await? {
                    Ok(false)
                } else {
                    info!("vector table missing, re-index needed");
                    Ok(true)
                }
            }
            _ => Ok(true),
        }
    }

    /// Embeds every document, replaces the LanceDB table and repopulates the cache.
    pub async fn reindex(&self, corpus: &Corpus) -> Result<String, AppError> {
        let digest = corpus.digest();
        info!(digest = %digest, documents = corpus.documents.len(), "starting full re-index");

        let texts: Vec<String> = corpus
            .documents
            .iter()
            .map(parser::compose_embedding_text)
            .collect();

        info!("generating embeddings for {} documents", texts.len());
        let embeddings = self.embedder.embed_documents(&texts).await?;

        let batch = build_record_batch(corpus, &texts, &embeddings, self.embedder.dimensions())?;
        let schema = batch.schema();
        self.vectordb
            .create_or_replace_table(SearchEngine::table_name(), schema, vec![batch])
            .await?;

        self.cache.invalidate_all().await;
        for document in &corpus.documents {
            self.cache.set_document(document).await;
        }

        self.cache.set_corpus_digest(&digest).await;
        info!(digest = %digest, documents = corpus.documents.len(), "re-index complete");
        Ok(digest)
    }

    /// Re-reads the tree and re-indexes if it changed. Returns the fresh
    /// corpus only when the index was rebuilt.
    pub async fn update(&self) -> Result<(UpdateResult, Option<Corpus>), AppError> {
        let corpus = self.load_corpus().await?;

        if !self.needs_update(&corpus).await? {
            let digest = corpus.digest();
            info!(digest = %digest, "documents up to date, skipping re-index");
            return Ok((
                UpdateResult {
                    updated: false,
                    digest,
                    document_count: corpus.documents.len(),
                },
                None,
            ));
        }

        let digest = self.reindex(&corpus).await?;
        Ok((
            UpdateResult {
                updated: true,
                digest,
                document_count: corpus.documents.len(),
            },
            Some(corpus),
        ))
    }
}

fn build_record_batch(
    corpus: &Corpus,
    texts: &[String],
    embeddings: &[Vec<f32>],
    dimensions: usize,
) -> Result<RecordBatch, AppError> {
    let embedding_dim = i32::try_from(dimensions)
        .map_err(|_| AppError::Index(format!("embedding width {dimensions} out of range")))?;
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
        return Err(AppError::Index(format!(
            "embedding width mismatch: expected {dimensions}, got {}",
            bad.len()
        )));
    }

    let docs = &corpus.documents;
    let column = |values: Vec<&str>| -> ArrayRef { Arc::new(StringArray::from(values)) };
    let id_array = column(docs.iter().map(|d| d.id.as_str()).collect());
    let title_array = column(docs.iter().map(|d| d.title()).collect());
    let topic_array = column(docs.iter().map(|d| d.topic()).collect());
    let locale_array = column(docs.iter().map(|d| d.locale()).collect());
    let text_array = column(texts.iter().map(String::as_str).collect());

    let item_field = Arc::new(Field::new("item", DataType::Float32, true));
    let values: Vec<f32> = embeddings.iter().flatten().copied().collect();
    let embedding_array: ArrayRef = Arc::new(
        FixedSizeListArray::try_new(
            Arc::clone(&item_field),
            embedding_dim,
            Arc::new(Float32Array::from(values)),
            None,
        )
        .map_err(|e| AppError::Index(format!("failed to build embedding array: {e}")))?,
    );

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("topic", DataType::Utf8, false),
        Field::new("locale", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new(
            "embedding",
            DataType::FixedSizeList(item_field, embedding_dim),
            false,
        ),
    ]));

    RecordBatch::try_new(
        schema,
        vec![
            id_array,
            title_array,
            topic_array,
            locale_array,
            text_array,
            embedding_array,
        ],
    )
    .map_err(|e| AppError::Index(format!("failed to build record batch: {e}")))
}
