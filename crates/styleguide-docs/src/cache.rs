/// Redis caching for the style-guide server. Every read is an `Option` and
/// every write best-effort; a cold or absent Redis only costs latency.
///
/// Key schema:
/// - `sgd:v1:document:{id}`: JSON Document
/// - `sgd:v1:search:{sha256(query|limit|locale|topic)}`: JSON Vec<DocumentResult> (TTL 3600s)
/// - `sgd:v1:corpus_digest`: digest of the indexed corpus
use sha2::{Digest, Sha256};

use crate::model::{Document, DocumentResult};
use docs_common::redis::RedisCache;

const KEY_PREFIX: &str = "sgd:v1:";
const SEARCH_TTL_SECS: u64 = 3600;

/// Optional filters that scope a search.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchScope<'a> {
    pub locale: Option<&'a str>,
    pub topic: Option<&'a str>,
}

pub struct DocsCache {
    redis: RedisCache,
}

impl DocsCache {
    pub fn new(redis: RedisCache) -> Self {
        Self { redis }
    }

    pub async fn get_document(&self, id: &str) -> Option<Document> {
        self.redis.get_json(&document_key(id)).await
    }

    pub async fn set_document(&self, document: &Document) {
        self.redis.set_json(&document_key(&document.id), document, None).await;
    }

    pub async fn get_search_results(
        &self,
        query: &str,
        limit: usize,
        scope: SearchScope<'_>,
    ) -> Option<Vec<DocumentResult>> {
        self.redis.get_json(&search_key(query, limit, scope)).await
    }

    pub async fn set_search_results(
        &self,
        query: &str,
        limit: usize,
        scope: SearchScope<'_>,
        results: &[DocumentResult],
    ) {
        self.redis
            .set_json(&search_key(query, limit, scope), results, Some(SEARCH_TTL_SECS))
            .await;
    }

    pub async fn get_corpus_digest(&self) -> Option<String> {
        self.redis.get(&format!("{KEY_PREFIX}corpus_digest")).await
    }

    pub async fn set_corpus_digest(&self, digest: &str) {
        self.redis
            .set(&format!("{KEY_PREFIX}corpus_digest"), digest)
            .await;
    }

    pub async fn invalidate_all(&self) {
        self.redis.delete_by_prefix(KEY_PREFIX).await;
    }
}

fn document_key(id: &str) -> String {
    format!("{KEY_PREFIX}document:{}", id.to_ascii_lowercase())
}

fn search_key(query: &str, limit: usize, scope: SearchScope<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update(b"|");
    hasher.update(limit.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(scope.locale.unwrap_or("*").as_bytes());
    hasher.update(b"|");
    hasher.update(scope.topic.unwrap_or("*").as_bytes());
    format!("{KEY_PREFIX}search:{:x}", hasher.finalize())
}
