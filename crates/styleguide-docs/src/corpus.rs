/// In-memory view of one traversal: the pages that loaded, the topics they
/// form, and the pages that did not load.
use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use crate::config::ContentLayout;
use crate::error::DocumentError;
use crate::model::{Document, DocumentFailure, Topic, ROOT_TOPIC};
use crate::traversal::ContentTree;

#[derive(Debug, Clone)]
pub struct Corpus {
    pub layout: ContentLayout,
    /// In traversal order.
    pub documents: Vec<Document>,
    pub topics: HashMap<String, Topic>,
    pub failures: Vec<DocumentFailure>,
}

impl Corpus {
    pub fn load(tree: &ContentTree) -> Self {
        let mut documents = Vec::new();
        let mut failures = Vec::new();

        for result in tree.documents() {
            match result {
                Ok(doc) => documents.push(doc),
                Err(err) if err.is_malformed() => {
                    warn!(path = %err.path().display(), reason = %err, "skipping malformed document");
                    failures.push(to_failure(&err));
                }
                Err(err) => {
                    error!(path = %err.path().display(), error = %err, "failed to read document");
                    failures.push(to_failure(&err));
                }
            }
        }

        let topics = build_topics(tree.layout(), &documents);
        info!(
            documents = documents.len(),
            topics = topics.len(),
            failures = failures.len(),
            "corpus loaded"
        );

        Self {
            layout: tree.layout().clone(),
            documents,
            topics,
            failures,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Case-insensitive lookup, also accepting a trailing `.md`/`.mdx` path.
    pub fn find(&self, id: &str) -> Option<&Document> {
        let id = id.trim().trim_matches('/');
        self.get(id).or_else(|| {
            self.documents
                .iter()
                .find(|d| d.id.eq_ignore_ascii_case(id) || d.descriptor.path.eq_ignore_ascii_case(id))
        })
    }

    /// The configured spelling of `name`, matched case-insensitively.
    pub fn locale(&self, name: &str) -> Option<String> {
        let name = name.trim();
        self.layout
            .all_locales()
            .into_iter()
            .find(|l| l.eq_ignore_ascii_case(name))
    }

    pub fn topic(&self, key: &str) -> Option<&Topic> {
        self.topics
            .values()
            .find(|t| t.key.eq_ignore_ascii_case(key.trim()))
    }

    /// Locales, other than the document's own, in which the same slug exists.
    pub fn translations_of(&self, document: &Document) -> Vec<String> {
        self.documents
            .iter()
            .filter(|d| d.slug == document.slug && d.locale() != document.locale())
            .map(|d| d.locale().to_string())
            .collect()
    }

    /// SHA-256 over everything the index is built from, in traversal order.
    /// Two loads of an unchanged tree give the same digest.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for doc in &self.documents {
            for field in [
                doc.descriptor.path.as_str(),
                doc.descriptor.title.as_str(),
                doc.descriptor.description.as_str(),
                doc.raw_markdown.as_str(),
            ] {
                hasher.update(field.as_bytes());
                hasher.update([0u8]);
            }
            hasher.update(doc.sidebar_order.unwrap_or(i64::MIN).to_le_bytes());
        }
        for failure in &self.failures {
            hasher.update(failure.path.as_bytes());
            hasher.update([0u8]);
            hasher.update(failure.message.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

pub fn to_failure(err: &DocumentError) -> DocumentFailure {
    DocumentFailure {
        path: err.path().to_string_lossy().replace('\\', "/"),
        kind: err.kind().to_string(),
        message: err.to_string(),
    }
}

fn build_topics(layout: &ContentLayout, documents: &[Document]) -> HashMap<String, Topic> {
    let locale_order = layout.all_locales();
    let mut topics: HashMap<String, Topic> = HashMap::new();

    for doc in documents {
        let topic = topics.entry(doc.topic().to_string()).or_insert_with(|| Topic {
            key: doc.topic().to_string(),
            display_name: display_name(doc.topic()),
            document_count: 0,
            locales: Vec::new(),
        });
        topic.document_count += 1;
        if !topic.locales.iter().any(|l| l == doc.locale()) {
            topic.locales.push(doc.locale().to_string());
        }
    }

    for topic in topics.values_mut() {
        topic.locales.sort_by_key(|l| {
            locale_order
                .iter()
                .position(|known| known == l)
                .unwrap_or(usize::MAX)
        });
    }
    topics
}

/// `unity` -> `Unity`, `clean-architecture` -> `Clean Architecture`.
fn display_name(topic: &str) -> String {
    if topic == ROOT_TOPIC {
        return "Overview".to_string();
    }
    topic
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
