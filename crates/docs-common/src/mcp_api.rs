use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchDocsParams {
    /// What you are looking for, in natural language.
    pub query: String,
    /// Maximum number of results to return (default: 10, max: 50).
    pub limit: Option<u32>,
    /// Restrict results to one locale, e.g. "en" or "fr".
    pub locale: Option<String>,
    /// Restrict results to one topic, e.g. "flutter" or "java".
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetDocumentParams {
    /// Document id: "<topic>/<page>" for the default locale, "<locale>/<topic>/<page>" otherwise.
    pub document_id: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTopicParams {
    /// Topic name such as "react" or "unity".
    pub topic: String,
    /// Only list documents in this locale.
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CheckDocsParams {
    /// Only report coverage for this locale.
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentSearchResult {
    pub id: String,
    pub title: String,
    pub topic: String,
    pub locale: String,
    pub score: f32,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchDocsResponse {
    pub results: Vec<DocumentSearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentSection {
    pub heading: String,
    pub level: u8,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CodeSample {
    /// Info-string language tag (`dart`, `tsx`, ...) when the fence has one.
    pub language: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentDetailResponse {
    pub id: String,
    pub path: String,
    pub locale: String,
    pub topic: String,
    pub title: String,
    pub description: String,
    pub sections: Vec<DocumentSection>,
    pub code_samples: Vec<CodeSample>,
    /// Other locales in which this page exists.
    pub translations: Vec<String>,
    pub raw_markdown: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopicInfo {
    pub key: String,
    pub display_name: String,
    pub document_count: usize,
    pub locales: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentSummary {
    pub id: String,
    pub locale: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TopicListResponse {
    pub topic: TopicInfo,
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentProblem {
    pub path: String,
    /// "malformed" or "io".
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StructureMismatch {
    pub slug: String,
    pub locale: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LocaleCoverage {
    pub locale: String,
    pub translated: usize,
    /// Default-locale slugs without a variant in this locale.
    pub missing: Vec<String>,
    /// Slugs present in this locale but absent from the default locale.
    pub orphans: Vec<String>,
    pub structure_mismatches: Vec<StructureMismatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckDocsResponse {
    pub document_count: usize,
    pub problems: Vec<DocumentProblem>,
    pub coverage: Vec<LocaleCoverage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateDocsResponse {
    pub updated: bool,
    /// SHA-256 digest of the corpus that is now indexed.
    pub digest: String,
    pub document_count: usize,
}
