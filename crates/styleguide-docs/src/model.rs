use serde::{Deserialize, Serialize};

/// Topic assigned to pages that sit directly under a locale root (`index.mdx`).
pub const ROOT_TOPIC: &str = "_root";

/// Minimal record produced for every well-formed page during traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// Path relative to the content root, `/`-separated: `fr/java/code-style.md`.
    pub path: String,
    pub locale: String,
    pub topic: String,
    pub title: String,
    pub description: String,
}

/// A fully parsed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// `java/code-style` for the default locale, `fr/java/code-style` otherwise.
    pub id: String,
    /// Locale-independent key pairing translations: `java/code-style`.
    pub slug: String,
    pub descriptor: DocumentDescriptor,
    /// `sidebar.order` from the frontmatter, used to order topic listings.
    pub sidebar_order: Option<i64>,
    pub sections: Vec<DocumentSection>,
    pub code_blocks: Vec<CodeBlock>,
    /// Body without the frontmatter block.
    pub raw_markdown: String,
}

impl Document {
    pub fn locale(&self) -> &str {
        &self.descriptor.locale
    }

    pub fn topic(&self) -> &str {
        &self.descriptor.topic
    }

    pub fn title(&self) -> &str {
        &self.descriptor.title
    }

    /// Number of headings at each level 1..=6, used to compare translations.
    pub fn heading_outline(&self) -> [usize; 6] {
        let mut outline = [0; 6];
        for section in &self.sections {
            if let Some(slot) = (section.level as usize)
                .checked_sub(1)
                .and_then(|i| outline.get_mut(i))
            {
                *slot += 1;
            }
        }
        outline
    }
}

/// A heading and the text up to the next heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub heading: String,
    pub level: u8,
    pub content: String,
}

/// A fenced code sample. Illustrative only; never compiled or run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: Option<String>,
    /// 1-based line of the opening fence within the body.
    pub line: usize,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub key: String,
    pub display_name: String,
    pub document_count: usize,
    /// Locales with at least one page in this topic, default first.
    pub locales: Vec<String>,
}

/// A page that could not be loaded, kept for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub path: String,
    /// "malformed" or "io".
    pub kind: String,
    pub message: String,
}

/// A search hit from the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    pub id: String,
    pub title: String,
    pub topic: String,
    pub locale: String,
    pub score: f32,
    pub summary: String,
}
