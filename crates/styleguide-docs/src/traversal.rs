//! Lazy walk over the content tree.
//!
//! ```text
//! <root>/java/code-style.md          -> locale en, topic java
//! <root>/fr/java/code-style.md       -> locale fr, topic java
//! <root>/index.mdx                   -> locale en, topic _root
//! ```
//!
//! Each call to [`ContentTree::documents`] starts a fresh walk, so traversal
//! is restartable and, over an unchanged tree, yields the same sequence every
//! time: entries are visited in file-name order. Per-file failures are items
//! of the sequence and never end it.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::config::ContentLayout;
use crate::error::{DocumentError, MalformedReason};
use crate::frontmatter;
use crate::model::{Document, DocumentDescriptor, ROOT_TOPIC};
use crate::parser;

const DOCUMENT_EXTENSIONS: &[&str] = &["md", "mdx"];

type Walker = walkdir::FilterEntry<walkdir::IntoIter, fn(&DirEntry) -> bool>;

pub struct ContentTree {
    layout: ContentLayout,
}

impl ContentTree {
    pub fn new(layout: ContentLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ContentLayout {
        &self.layout
    }

    /// Every page, fully parsed.
    pub fn documents(&self) -> Documents<'_> {
        let walker = WalkDir::new(&self.layout.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(is_visible as fn(&DirEntry) -> bool);
        Documents {
            layout: &self.layout,
            walker,
        }
    }

    /// Every page as a `{path, locale, topic, title, description}` record.
    pub fn descriptors(&self) -> impl Iterator<Item = Result<DocumentDescriptor, DocumentError>> + '_ {
        self.documents().map(|doc| doc.map(|d| d.descriptor))
    }
}

pub struct Documents<'a> {
    layout: &'a ContentLayout,
    walker: Walker,
}

impl Iterator for Documents<'_> {
    type Item = Result<Document, DocumentError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = relative_to(
                        &self.layout.root,
                        err.path().unwrap_or(&self.layout.root),
                    );
                    return Some(Err(DocumentError::Io {
                        path,
                        source: err.into(),
                    }));
                }
            };

            // Symlinks are read through; a dangling one is an io failure.
            if entry.file_type().is_dir() {
                continue;
            }
            if !is_document_file(entry.path()) {
                debug!(path = %entry.path().display(), "skipping non-document file");
                continue;
            }
            return Some(load_document(self.layout, entry.path()));
        }
    }
}

/// Where a relative path sits in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub path: String,
    pub locale: String,
    pub topic: String,
    pub slug: String,
    pub id: String,
}

pub fn classify(layout: &ContentLayout, rel_path: &Path) -> Placement {
    let components: Vec<String> = rel_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    let (locale, rest) = match components.split_first() {
        Some((first, rest)) if !rest.is_empty() && layout.is_locale_prefix(first) => {
            (first.clone(), rest)
        }
        _ => (layout.default_locale.clone(), components.as_slice()),
    };

    let topic = if rest.len() > 1 {
        rest[0].clone()
    } else {
        ROOT_TOPIC.to_string()
    };

    let mut slug_parts: Vec<&str> = rest.iter().map(String::as_str).collect();
    if let Some(last) = slug_parts.last_mut() {
        *last = strip_document_extension(*last);
    }
    let slug = slug_parts.join("/");

    let id = if locale == layout.default_locale {
        slug.clone()
    } else {
        format!("{locale}/{slug}")
    };

    Placement {
        path: components.join("/"),
        locale,
        topic,
        slug,
        id,
    }
}

/// Reads and parses one page. `path` is absolute (or relative to the cwd);
/// errors and descriptors report it relative to the content root.
pub fn load_document(layout: &ContentLayout, path: &Path) -> Result<Document, DocumentError> {
    let rel = relative_to(&layout.root, path);

    let bytes = std::fs::read(path).map_err(|source| DocumentError::Io {
        path: rel.clone(),
        source,
    })?;
    let content = String::from_utf8(bytes).map_err(|_| DocumentError::Malformed {
        path: rel.clone(),
        reason: MalformedReason::InvalidUtf8,
    })?;

    let (fm, body) = frontmatter::parse(&content).map_err(|reason| DocumentError::Malformed {
        path: rel.clone(),
        reason,
    })?;

    let placement = classify(layout, &rel);
    let parsed = parser::parse_body(body);

    Ok(Document {
        id: placement.id,
        slug: placement.slug,
        descriptor: DocumentDescriptor {
            path: placement.path,
            locale: placement.locale,
            topic: placement.topic,
            title: fm.title,
            description: fm.description,
        },
        sidebar_order: fm.sidebar_order,
        sections: parsed.sections,
        code_blocks: parsed.code_blocks,
        raw_markdown: body.to_string(),
    })
}

fn is_visible(entry: &DirEntry) -> bool {
    entry.depth() == 0
        || !entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn is_document_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext))
}

fn strip_document_extension(name: &str) -> &str {
    DOCUMENT_EXTENSIONS
        .iter()
        .find_map(|ext| name.strip_suffix(ext).and_then(|n| n.strip_suffix('.')))
        .unwrap_or(name)
}

/// `path` relative to `root`; the root itself is reported as given.
fn relative_to(root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn page(title: &str, description: &str) -> String {
        format!("---\ntitle: {title}\ndescription: {description}\n---\n\n## Rules\n\nBody.\n")
    }

    fn tree(root: &Path) -> ContentTree {
        ContentTree::new(ContentLayout::with_defaults(root))
    }

    #[test]
    fn classify_default_and_locale_paths() {
        let layout = ContentLayout::with_defaults("/docs");

        let en = classify(&layout, Path::new("java/code-style.md"));
        assert_eq!(en.locale, "en");
        assert_eq!(en.topic, "java");
        assert_eq!(en.slug, "java/code-style");
        assert_eq!(en.id, "java/code-style");
        assert_eq!(en.path, "java/code-style.md");

        let fr = classify(&layout, Path::new("fr/java/code-style.md"));
        assert_eq!(fr.locale, "fr");
        assert_eq!(fr.topic, "java");
        assert_eq!(fr.slug, "java/code-style");
        assert_eq!(fr.id, "fr/java/code-style");
    }

    #[test]
    fn classify_root_pages_and_nested_pages() {
        let layout = ContentLayout::with_defaults("/docs");

        let index = classify(&layout, Path::new("index.mdx"));
        assert_eq!(index.topic, ROOT_TOPIC);
        assert_eq!(index.slug, "index");

        let fr_index = classify(&layout, Path::new("fr/index.mdx"));
        assert_eq!(fr_index.locale, "fr");
        assert_eq!(fr_index.topic, ROOT_TOPIC);
        assert_eq!(fr_index.id, "fr/index");

        let nested = classify(&layout, Path::new("react/hooks/custom.md"));
        assert_eq!(nested.topic, "react");
        assert_eq!(nested.slug, "react/hooks/custom");

        // A file named like a locale is not a locale prefix.
        let fr_file = classify(&layout, Path::new("fr.md"));
        assert_eq!(fr_file.locale, "en");
        assert_eq!(fr_file.slug, "fr");
    }

    #[test]
    fn valid_and_malformed_siblings() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "java/code-style.md", &page("Code style", "Java formatting"));
        write(dir.path(), "java/broken.md", "---\ntitle: Broken\n---\nbody\n");

        let results: Vec<_> = tree(dir.path()).descriptors().collect();
        assert_eq!(results.len(), 2);

        // File-name order: broken.md before code-style.md.
        match &results[0] {
            Err(DocumentError::Malformed { path, reason }) => {
                assert_eq!(path, Path::new("java/broken.md"));
                assert_eq!(*reason, MalformedReason::MissingField("description"));
            }
            other => panic!("expected malformed document, got {other:?}"),
        }
        let descriptor = results[1].as_ref().unwrap();
        assert_eq!(
            *descriptor,
            DocumentDescriptor {
                path: "java/code-style.md".to_string(),
                locale: "en".to_string(),
                topic: "java".to_string(),
                title: "Code style".to_string(),
                description: "Java formatting".to_string(),
            }
        );
    }

    #[test]
    fn locale_variants_share_topic() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "flutter/project-structure.md",
            &page("Project structure", "Folder layout"),
        );
        write(
            dir.path(),
            "fr/flutter/project-structure.md",
            &page("Structure du projet", "Organisation des dossiers"),
        );

        let descriptors: Vec<DocumentDescriptor> = tree(dir.path())
            .descriptors()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(descriptors.len(), 2);
        assert!(descriptors.iter().all(|d| d.topic == "flutter"));
        let mut locales: Vec<&str> = descriptors.iter().map(|d| d.locale.as_str()).collect();
        locales.sort();
        assert_eq!(locales, vec!["en", "fr"]);
    }

    #[test]
    fn traversal_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "unity/naming.md", &page("Naming", "C# naming"));
        write(dir.path(), "react/hooks.mdx", &page("Hooks", "Hook rules"));
        write(dir.path(), "fr/react/hooks.mdx", &page("Hooks", "Règles des hooks"));
        write(dir.path(), "java/bad.md", "no frontmatter\n");

        let tree = tree(dir.path());
        let render = |tree: &ContentTree| -> Vec<String> {
            tree.descriptors()
                .map(|r| match r {
                    Ok(d) => format!("ok {} {} {}", d.path, d.locale, d.title),
                    Err(e) => format!("err {e}"),
                })
                .collect()
        };
        let first = render(&tree);
        let second = render(&tree);
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        assert_eq!(first[0], "ok fr/react/hooks.mdx fr Hooks");
    }

    #[test]
    fn malformed_page_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "java/a.md", &page("A", "first"));
        write(dir.path(), "java/b.md", "---\ntitle: [oops\n---\n");
        write(dir.path(), "java/c.md", &page("C", "third"));
        std::fs::write(dir.path().join("java/d.md"), [0xff, 0xfe, 0x00]).unwrap();

        let results: Vec<_> = tree(dir.path()).documents().collect();
        let ok: Vec<&str> = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ok, vec!["java/a", "java/c"]);
        let failures: Vec<&DocumentError> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|e| e.is_malformed()));
        assert!(matches!(
            failures[1],
            DocumentError::Malformed {
                reason: MalformedReason::InvalidUtf8,
                ..
            }
        ));
    }

    #[test]
    fn skips_non_documents_and_hidden_entries() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "java/code-style.md", &page("Code style", "Java"));
        write(dir.path(), "java/diagram.png", "not really a png");
        write(dir.path(), ".DS_Store", "junk");
        write(dir.path(), ".drafts/secret.md", "no frontmatter");

        let results: Vec<_> = tree(dir.path()).descriptors().collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
    }

    #[test]
    fn missing_root_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let results: Vec<_> = tree(&missing).documents().collect();
        assert_eq!(results.len(), 1);
        let err = results[0].as_ref().unwrap_err();
        assert_eq!(err.kind(), "io");
        assert_eq!(err.path(), missing.as_path());
        assert!(err.to_string().contains("missing"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_page_does_not_block_siblings() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "java/a.md", &page("A", "first"));
        write(dir.path(), "java/c.md", &page("C", "third"));
        std::os::unix::fs::symlink(
            dir.path().join("java/gone.md"),
            dir.path().join("java/b.md"),
        )
        .unwrap();

        let results: Vec<_> = tree(dir.path()).descriptors().collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().path, "java/a.md");
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.kind(), "io");
        assert_eq!(err.path(), Path::new("java/b.md"));
        assert_eq!(results[2].as_ref().unwrap().path, "java/c.md");
    }

    #[test]
    fn parsed_document_carries_sections_and_code() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "flutter/widgets.md",
            "---\ntitle: Widgets\ndescription: Widget rules\nsidebar:\n  order: 1\n---\n## Stateless\n\n```dart\nclass A extends StatelessWidget {}\n```\n",
        );
        let doc = tree(dir.path()).documents().next().unwrap().unwrap();
        assert_eq!(doc.id, "flutter/widgets");
        assert_eq!(doc.sidebar_order, Some(1));
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.code_blocks[0].language.as_deref(), Some("dart"));
        assert_eq!(doc.heading_outline(), [0, 1, 0, 0, 0, 0]);
    }
}
