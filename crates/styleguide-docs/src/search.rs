use std::sync::Arc;

use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use tracing::{info, warn};

use crate::cache::{DocsCache, SearchScope};
use crate::error::AppError;
use crate::model::DocumentResult;
use docs_common::embedding::Embedder;
use docs_common::vectordb::{eq_filter, VectorDb};

const VECTOR_TABLE_NAME: &str = "styleguide_docs";
const MAX_SUMMARY_LEN: usize = 300;

pub struct SearchEngine {
    embedder: Arc<Embedder>,
    vectordb: Arc<VectorDb>,
    cache: Arc<DocsCache>,
}

impl SearchEngine {
    pub fn new(embedder: Arc<Embedder>, vectordb: Arc<VectorDb>, cache: Arc<DocsCache>) -> Self {
        Self {
            embedder,
            vectordb,
            cache,
        }
    }

    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        scope: SearchScope<'_>,
    ) -> Result<Vec<DocumentResult>, AppError> {
        if let Some(cached) = self.cache.get_search_results(query, limit, scope).await {
            info!(query, "search cache hit");
            return Ok(cached);
        }

        let query_embedding = self.embedder.embed_query(query).await?;
        let batches = self
            .vectordb
            .search(
                VECTOR_TABLE_NAME,
                &query_embedding,
                limit,
                scope_filter(scope),
            )
            .await?;

        let results = extract_search_results(&batches);
        self.cache
            .set_search_results(query, limit, scope, &results)
            .await;
        Ok(results)
    }

    pub fn table_name() -> &'static str {
        VECTOR_TABLE_NAME
    }
}

fn scope_filter(scope: SearchScope<'_>) -> Option<String> {
    let clauses: Vec<String> = [("locale", scope.locale), ("topic", scope.topic)]
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| eq_filter(column, v)))
        .collect();
    (!clauses.is_empty()).then(|| clauses.join(" AND "))
}

fn extract_search_results(batches: &[RecordBatch]) -> Vec<DocumentResult> {
    let mut results = Vec::new();

    for batch in batches {
        let (Some(id_col), Some(title_col), Some(topic_col), Some(locale_col), Some(text_col)) = (
            string_column(batch, "id"),
            string_column(batch, "title"),
            string_column(batch, "topic"),
            string_column(batch, "locale"),
            string_column(batch, "text"),
        ) else {
            warn!("search result batch missing expected columns");
            continue;
        };
        let distance_col = float_column(batch, "_distance");

        for row in 0..batch.num_rows() {
            let distance = distance_col.map(|c| c.value(row)).unwrap_or(0.0);
            results.push(DocumentResult {
                id: id_col.value(row).to_string(),
                title: title_col.value(row).to_string(),
                topic: topic_col.value(row).to_string(),
                locale: locale_col.value(row).to_string(),
                score: (1.0_f32 - distance).max(0.0),
                summary: summarize(text_col.value(row)),
            });
        }
    }

    results
}

fn summarize(text: &str) -> String {
    if text.chars().count() > MAX_SUMMARY_LEN {
        format!("{}...", text.chars().take(MAX_SUMMARY_LEN).collect::<String>())
    } else {
        text.to_string()
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a StringArray> {
    batch
        .column_by_name(name)?
        .as_any()
        .downcast_ref::<StringArray>()
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a Float32Array> {
    batch
        .column_by_name(name)?
        .as_any()
        .downcast_ref::<Float32Array>()
}
