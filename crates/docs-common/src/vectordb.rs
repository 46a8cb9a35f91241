/// LanceDB wrapper holding one row per indexed documentation page.
///
/// Table schema (built by the caller):
/// - id: Utf8, the document id (`java/code-style`, `fr/java/code-style`)
/// - title, topic, locale: Utf8
/// - text: Utf8, the text that was embedded
/// - embedding: FixedSizeList<Float32, 768>
use std::sync::Arc;

use arrow_array::{RecordBatch, RecordBatchIterator};
use arrow_schema::Schema;
use lancedb::query::{ExecutableQuery, QueryBase};
use tracing::info;

use crate::error::CommonError;

pub struct VectorDb {
    db: lancedb::Connection,
}

impl VectorDb {
    pub async fn connect(path: &str) -> Result<Self, CommonError> {
        let db = lancedb::connect(path)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("connection failed: {e}")))?;
        Ok(Self { db })
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool, CommonError> {
        let names = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("listing tables failed: {e}")))?;
        Ok(names.iter().any(|n| n == table_name))
    }

    /// Drops `table_name` if present and recreates it from `batches`.
    pub async fn create_or_replace_table(
        &self,
        table_name: &str,
        schema: Arc<Schema>,
        batches: Vec<RecordBatch>,
    ) -> Result<(), CommonError> {
        if self.table_exists(table_name).await? {
            self.db
                .drop_table(table_name)
                .await
                .map_err(|e| CommonError::VectorDb(format!("drop table failed: {e}")))?;
        }

        let batch_iter = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);
        self.db
            .create_table(table_name, Box::new(batch_iter))
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("create table failed: {e}")))?;

        info!(table = table_name, "vector table created");
        Ok(())
    }

    /// Nearest-neighbour search. `filter` is a DataFusion SQL predicate applied
    /// before ranking (see [`eq_filter`]). Rows carry a `_distance` column.
    pub async fn search(
        &self,
        table_name: &str,
        query_embedding: &[f32],
        limit: usize,
        filter: Option<String>,
    ) -> Result<Vec<RecordBatch>, CommonError> {
        let table = self
            .db
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("open table failed: {e}")))?;

        let mut query = table
            .vector_search(query_embedding)
            .map_err(|e| CommonError::VectorDb(format!("vector search setup failed: {e}")))?
            .limit(limit);
        if let Some(filter) = filter {
            query = query.only_if(filter);
        }

        let results = query
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("vector search failed: {e}")))?;

        futures::TryStreamExt::try_collect(results)
            .await
            .map_err(|e| CommonError::VectorDb(format!("collecting search results failed: {e}")))
    }
}

/// Builds `column = 'value'` with the value quoted for DataFusion SQL.
pub fn eq_filter(column: &str, value: &str) -> String {
    format!("{column} = '{}'", value.replace('\'', "''"))
}
