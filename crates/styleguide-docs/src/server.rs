/// MCP server over the style-guide corpus.
///
/// Tools:
/// - `search_docs`: semantic search, optionally scoped to a locale or topic
/// - `get_document`: one page with its sections and code samples
/// - `list_topic`: the pages of a topic
/// - `check_docs`: malformed pages and translation coverage
/// - `update_docs`: re-read the tree and re-index when it changed
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tokio::sync::RwLock;
use tracing::info;

use crate::cache::{DocsCache, SearchScope};
use crate::config::Config;
use crate::corpus::Corpus;
use crate::locale::{self, CoverageReport};
use crate::model::{Document, DocumentFailure};
use crate::search::SearchEngine;
use crate::update::UpdateService;
use docs_common::embedding::Embedder;
use docs_common::mcp_api::{
    CheckDocsParams, CheckDocsResponse, CodeSample, DocumentDetailResponse, DocumentProblem,
    DocumentSearchResult, DocumentSection as ApiDocumentSection, DocumentSummary,
    GetDocumentParams, ListTopicParams, LocaleCoverage as ApiLocaleCoverage, SearchDocsParams,
    SearchDocsResponse, StructureMismatch as ApiStructureMismatch, TopicInfo, TopicListResponse,
    UpdateDocsResponse,
};
use docs_common::vectordb::VectorDb;

const DEFAULT_SEARCH_LIMIT: u32 = 10;
const MAX_SEARCH_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct StyleguideDocsServer {
    corpus: Arc<RwLock<Corpus>>,
    search_engine: Arc<SearchEngine>,
    update_service: Arc<UpdateService>,
    cache: Arc<DocsCache>,
    tool_router: ToolRouter<StyleguideDocsServer>,
}

impl StyleguideDocsServer {
    pub fn new(
        corpus: Corpus,
        embedder: Arc<Embedder>,
        vectordb: Arc<VectorDb>,
        cache: Arc<DocsCache>,
        config: Config,
    ) -> Self {
        let search_engine = Arc::new(SearchEngine::new(
            Arc::clone(&embedder),
            Arc::clone(&vectordb),
            Arc::clone(&cache),
        ));

        let update_service = Arc::new(UpdateService::new(
            config,
            Arc::clone(&embedder),
            Arc::clone(&vectordb),
            Arc::clone(&cache),
        ));

        Self {
            corpus: Arc::new(RwLock::new(corpus)),
            search_engine,
            update_service,
            cache,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl StyleguideDocsServer {
    #[tool(description = "Search the style guides (Flutter, Java, React, Unity, ...) by semantic similarity. Optionally restrict to a locale ('en', 'fr') or a topic.")]
    async fn search_docs(
        &self,
        Parameters(params): Parameters<SearchDocsParams>,
    ) -> Result<Json<SearchDocsResponse>, String> {
        let query = params.query.trim().to_string();
        if query.is_empty() {
            return Err("query must not be empty".to_string());
        }

        let limit = params
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT) as usize;
        // Filters take the corpus's own spelling; the index stores it verbatim.
        let (locale, topic) = {
            let corpus = self.corpus.read().await;
            resolve_scope(&corpus, params.locale.as_deref(), params.topic.as_deref())?
        };
        let scope = SearchScope {
            locale: locale.as_deref(),
            topic: topic.as_deref(),
        };

        let results = self
            .search_engine
            .search(&query, limit, scope)
            .await
            .map_err(|e| format!("search failed: {e}"))?;

        Ok(Json(SearchDocsResponse {
            results: results
                .into_iter()
                .map(|r| DocumentSearchResult {
                    id: r.id,
                    title: r.title,
                    topic: r.topic,
                    locale: r.locale,
                    score: r.score,
                    summary: r.summary,
                })
                .collect(),
        }))
    }

    #[tool(description = "Get a full style-guide page by id, e.g. 'java/code-style' or 'fr/flutter/project-structure'.")]
    async fn get_document(
        &self,
        Parameters(params): Parameters<GetDocumentParams>,
    ) -> Result<Json<DocumentDetailResponse>, String> {
        let document_id = params.document_id.trim().to_string();
        if document_id.is_empty() {
            return Err("document_id must not be empty".to_string());
        }

        let cached = self.cache.get_document(&document_id).await;
        let corpus = self.corpus.read().await;
        if let Some(cached) = cached {
            let translations = corpus.translations_of(&cached);
            return Ok(Json(to_api_document(&cached, translations)));
        }

        let document = corpus
            .find(&document_id)
            .ok_or_else(|| format!("document not found: {document_id}"))?;
        Ok(Json(to_api_document(
            document,
            corpus.translations_of(document),
        )))
    }

    #[tool(description = "List the pages of one style-guide topic such as 'flutter', 'java', 'react' or 'unity', optionally in a single locale.")]
    async fn list_topic(
        &self,
        Parameters(params): Parameters<ListTopicParams>,
    ) -> Result<Json<TopicListResponse>, String> {
        let topic_name = params.topic.trim().to_string();
        if topic_name.is_empty() {
            return Err("topic must not be empty".to_string());
        }
        let locale = normalize_filter(params.locale.as_deref());

        let corpus = self.corpus.read().await;
        let topic = corpus
            .topic(&topic_name)
            .cloned()
            .ok_or_else(|| unknown_topic(&corpus, &topic_name))?;

        let mut documents: Vec<&Document> = corpus
            .documents
            .iter()
            .filter(|d| d.topic() == topic.key)
            .filter(|d| locale.as_deref().map_or(true, |l| d.locale().eq_ignore_ascii_case(l)))
            .collect();
        documents.sort_by(|a, b| {
            a.sidebar_order
                .unwrap_or(i64::MAX)
                .cmp(&b.sidebar_order.unwrap_or(i64::MAX))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(Json(TopicListResponse {
            topic: TopicInfo {
                key: topic.key,
                display_name: topic.display_name,
                document_count: topic.document_count,
                locales: topic.locales,
            },
            documents: documents
                .into_iter()
                .map(|d| DocumentSummary {
                    id: d.id.clone(),
                    locale: d.locale().to_string(),
                    title: d.descriptor.title.clone(),
                    description: d.descriptor.description.clone(),
                })
                .collect(),
        }))
    }

    #[tool(description = "Report style-guide pages with malformed frontmatter or read errors, and translation coverage (missing, orphaned or structurally different locale variants).")]
    async fn check_docs(
        &self,
        Parameters(params): Parameters<CheckDocsParams>,
    ) -> Result<Json<CheckDocsResponse>, String> {
        let locale = normalize_filter(params.locale.as_deref());
        let corpus = self.corpus.read().await;
        let coverage = locale::coverage(&corpus);
        Ok(Json(to_api_check(
            corpus.documents.len(),
            &corpus.failures,
            coverage,
            locale.as_deref(),
        )))
    }

    #[tool(description = "Re-read the style-guide content tree and re-index it if anything changed.")]
    async fn update_docs(&self) -> Result<Json<UpdateDocsResponse>, String> {
        info!("update_docs tool invoked");

        let (result, fresh) = self
            .update_service
            .update()
            .await
            .map_err(|e| format!("update failed: {e}"))?;

        if let Some(corpus) = fresh {
            let documents = corpus.documents.len();
            *self.corpus.write().await = corpus;
            info!(documents, "in-memory corpus replaced");
        }

        Ok(Json(UpdateDocsResponse {
            updated: result.updated,
            digest: result.digest,
            document_count: result.document_count,
        }))
    }
}

fn normalize_filter(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Maps user-supplied filters onto the locale and topic names the corpus
/// (and so the vector index) actually uses.
fn resolve_scope(
    corpus: &Corpus,
    locale: Option<&str>,
    topic: Option<&str>,
) -> Result<(Option<String>, Option<String>), String> {
    let locale = normalize_filter(locale)
        .map(|wanted| {
            corpus.locale(&wanted).ok_or_else(|| {
                format!(
                    "unknown locale: '{wanted}'. Available locales: {}",
                    corpus.layout.all_locales().join(", ")
                )
            })
        })
        .transpose()?;
    let topic = normalize_filter(topic)
        .map(|wanted| {
            corpus
                .topic(&wanted)
                .map(|t| t.key.clone())
                .ok_or_else(|| unknown_topic(corpus, &wanted))
        })
        .transpose()?;
    Ok((locale, topic))
}

fn unknown_topic(corpus: &Corpus, name: &str) -> String {
    let mut available: Vec<&str> = corpus.topics.keys().map(String::as_str).collect();
    available.sort_unstable();
    format!(
        "unknown topic: '{name}'. Available topics: {}",
        available.join(", ")
    )
}

fn to_api_document(document: &Document, translations: Vec<String>) -> DocumentDetailResponse {
    DocumentDetailResponse {
        id: document.id.clone(),
        path: document.descriptor.path.clone(),
        locale: document.descriptor.locale.clone(),
        topic: document.descriptor.topic.clone(),
        title: document.descriptor.title.clone(),
        description: document.descriptor.description.clone(),
        sections: document
            .sections
            .iter()
            .map(|s| ApiDocumentSection {
                heading: s.heading.clone(),
                level: s.level,
                content: s.content.clone(),
            })
            .collect(),
        code_samples: document
            .code_blocks
            .iter()
            .map(|c| CodeSample {
                language: c.language.clone(),
                code: c.code.clone(),
            })
            .collect(),
        translations,
        raw_markdown: document.raw_markdown.clone(),
    }
}

fn to_api_check(
    document_count: usize,
    failures: &[DocumentFailure],
    coverage: CoverageReport,
    locale: Option<&str>,
) -> CheckDocsResponse {
    CheckDocsResponse {
        document_count,
        problems: failures
            .iter()
            .map(|f| DocumentProblem {
                path: f.path.clone(),
                kind: f.kind.clone(),
                message: f.message.clone(),
            })
            .collect(),
        coverage: coverage
            .locales
            .into_iter()
            .filter(|c| locale.map_or(true, |l| c.locale.eq_ignore_ascii_case(l)))
            .map(|c| ApiLocaleCoverage {
                locale: c.locale,
                translated: c.translated,
                missing: c.missing,
                orphans: c.orphans,
                structure_mismatches: c
                    .structure_mismatches
                    .into_iter()
                    .map(|m| ApiStructureMismatch {
                        slug: m.slug,
                        locale: m.locale,
                        detail: m.detail,
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[tool_handler]
impl ServerHandler for StyleguideDocsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "styleguide-docs".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Style-guide documentation server. Covers coding conventions and \
                 architecture guidance for Flutter/Dart, Java, React/TypeScript and \
                 Unity/C#, in English and French. Use search_docs for natural language \
                 queries, get_document to read a page, list_topic to browse a topic, \
                 check_docs to find broken or untranslated pages, and update_docs to \
                 pick up edits to the content tree."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::{LocaleCoverage, StructureMismatch};

    #[test]
    fn tools_publish_output_schemas() {
        let tools = StyleguideDocsServer::tool_router().list_all();
        for name in [
            "search_docs",
            "get_document",
            "list_topic",
            "check_docs",
            "update_docs",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[test]
    fn filters_are_trimmed_and_lowercased() {
        assert_eq!(normalize_filter(Some(" FR ")), Some("fr".to_string()));
        assert_eq!(normalize_filter(Some("   ")), None);
        assert_eq!(normalize_filter(None), None);
    }

    #[test]
    fn search_scope_uses_corpus_spelling() {
        use crate::config::ContentLayout;
        use crate::traversal::ContentTree;

        let dir = tempfile::tempdir().unwrap();
        for rel in ["React/hooks.md", "pt-BR/React/hooks.md"] {
            let path = dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "---\ntitle: Hooks\ndescription: Hook rules\n---\nBody\n").unwrap();
        }
        let layout = ContentLayout::new(dir.path(), "en", &["pt-BR"]);
        let corpus = Corpus::load(&ContentTree::new(layout));

        assert_eq!(
            resolve_scope(&corpus, Some(" PT-br "), Some("react")),
            Ok((Some("pt-BR".to_string()), Some("React".to_string())))
        );
        assert_eq!(resolve_scope(&corpus, None, Some("  ")), Ok((None, None)));

        let err = resolve_scope(&corpus, Some("de"), None).unwrap_err();
        assert!(err.contains("en, pt-BR"), "{err}");
        let err = resolve_scope(&corpus, None, Some("vue")).unwrap_err();
        assert!(err.contains("React"), "{err}");
    }

    #[test]
    fn check_response_filters_locale() {
        let coverage = CoverageReport {
            default_locale: "en".to_string(),
            locales: vec![
                LocaleCoverage {
                    locale: "fr".to_string(),
                    translated: 1,
                    missing: vec!["java/code-style".to_string()],
                    orphans: Vec::new(),
                    structure_mismatches: vec![StructureMismatch {
                        slug: "react/hooks".to_string(),
                        locale: "fr".to_string(),
                        detail: "code blocks 2 (en) vs 1 (fr)".to_string(),
                    }],
                },
                LocaleCoverage {
                    locale: "de".to_string(),
                    translated: 0,
                    missing: vec!["java/code-style".to_string()],
                    orphans: Vec::new(),
                    structure_mismatches: Vec::new(),
                },
            ],
        };
        let failures = vec![DocumentFailure {
            path: "java/broken.md".to_string(),
            kind: "malformed".to_string(),
            message: "malformed document java/broken.md: frontmatter field 'description' is missing"
                .to_string(),
        }];

        let response = to_api_check(3, &failures, coverage, Some("fr"));
        assert_eq!(response.document_count, 3);
        assert_eq!(response.problems.len(), 1);
        assert_eq!(response.coverage.len(), 1);
        assert_eq!(response.coverage[0].locale, "fr");
        assert_eq!(response.coverage[0].structure_mismatches[0].slug, "react/hooks");
    }
}
