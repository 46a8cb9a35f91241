/// Reports for `styleguide-docs check` and `styleguide-docs list`.
///
/// Output goes to any `io::Write`. A reader that hangs up early (`list | head`)
/// surfaces as `BrokenPipe`, which ends the output without being an error.
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Write as _};

use serde::Serialize;
use tracing::warn;

use crate::corpus::Corpus;
use crate::locale::{self, CoverageReport};
use crate::model::DocumentFailure;
use crate::traversal::ContentTree;

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub document_count: usize,
    /// locale -> topic -> number of valid pages.
    pub counts: BTreeMap<String, BTreeMap<String, usize>>,
    pub malformed: Vec<DocumentFailure>,
    pub io_failures: Vec<DocumentFailure>,
    pub coverage: CoverageReport,
}

impl CheckReport {
    pub fn from_corpus(corpus: &Corpus) -> Self {
        let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        for doc in &corpus.documents {
            *counts
                .entry(doc.locale().to_string())
                .or_default()
                .entry(doc.topic().to_string())
                .or_default() += 1;
        }

        let (malformed, io_failures): (Vec<_>, Vec<_>) = corpus
            .failures
            .iter()
            .cloned()
            .partition(|f| f.kind == "malformed");

        Self {
            document_count: corpus.documents.len(),
            counts,
            malformed,
            io_failures,
            coverage: locale::coverage(corpus),
        }
    }

    /// Malformed pages and read failures always fail the check; coverage
    /// problems only under `strict`.
    pub fn passed(&self, strict: bool) -> bool {
        self.malformed.is_empty()
            && self.io_failures.is_empty()
            && (!strict || self.coverage.is_clean())
    }

    /// Text, or pretty JSON when `json` is set.
    pub fn write_to<W: io::Write>(&self, out: &mut W, json: bool) -> io::Result<()> {
        let written = if json {
            serde_json::to_writer_pretty(&mut *out, self)
                .map_err(io::Error::from)
                .and_then(|()| writeln!(out))
        } else {
            out.write_all(self.render_text().as_bytes())
        };
        ignore_broken_pipe(written.and_then(|()| out.flush()))
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} valid documents", self.document_count);
        for (locale, topics) in &self.counts {
            let listed: Vec<String> = topics.iter().map(|(t, n)| format!("{t}={n}")).collect();
            let _ = writeln!(out, "  {locale}: {}", listed.join(", "));
        }

        if !self.malformed.is_empty() {
            let _ = writeln!(out, "\n{} malformed:", self.malformed.len());
            for failure in &self.malformed {
                let _ = writeln!(out, "  {}", failure.message);
            }
        }
        if !self.io_failures.is_empty() {
            let _ = writeln!(out, "\n{} unreadable:", self.io_failures.len());
            for failure in &self.io_failures {
                let _ = writeln!(out, "  {}", failure.message);
            }
        }

        for locale in &self.coverage.locales {
            let _ = writeln!(
                out,
                "\n{}: {} translated, {} missing, {} orphaned, {} structure mismatches",
                locale.locale,
                locale.translated,
                locale.missing.len(),
                locale.orphans.len(),
                locale.structure_mismatches.len()
            );
            for slug in &locale.missing {
                let _ = writeln!(out, "  missing  {slug}");
            }
            for slug in &locale.orphans {
                let _ = writeln!(out, "  orphan   {slug}");
            }
            for mismatch in &locale.structure_mismatches {
                let _ = writeln!(out, "  drift    {}: {}", mismatch.slug, mismatch.detail);
            }
        }
        out
    }
}

/// Outcome of streaming descriptors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListSummary {
    pub written: usize,
    pub failures: usize,
    /// The reader went away before the walk finished.
    pub closed_early: bool,
}

impl ListSummary {
    pub fn passed(&self) -> bool {
        self.failures == 0
    }
}

/// Writes one JSON descriptor per line. Failed pages are logged and counted;
/// they never stop the walk.
pub fn write_descriptors<W: io::Write>(tree: &ContentTree, out: &mut W) -> io::Result<ListSummary> {
    let mut summary = ListSummary::default();
    for result in tree.descriptors() {
        let descriptor = match result {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(path = %err.path().display(), kind = err.kind(), reason = %err, "skipping document");
                summary.failures += 1;
                continue;
            }
        };
        let line = serde_json::to_writer(&mut *out, &descriptor)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(out));
        match line {
            Ok(()) => summary.written += 1,
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                summary.closed_early = true;
                return Ok(summary);
            }
            Err(e) => return Err(e),
        }
    }
    match out.flush() {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => summary.closed_early = true,
        other => other?,
    }
    Ok(summary)
}

fn ignore_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentLayout;
    use crate::traversal::ContentTree;
    use std::path::Path;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn page(title: &str) -> String {
        format!("---\ntitle: {title}\ndescription: About {title}\n---\n\n## Rules\n")
    }

    #[test]
    fn clean_tree_passes_strict() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "java/code-style.md", &page("Code style"));
        write(dir.path(), "fr/java/code-style.md", &page("Style de code"));
        let corpus = Corpus::load(&ContentTree::new(ContentLayout::with_defaults(dir.path())));

        let report = CheckReport::from_corpus(&corpus);
        assert!(report.passed(true));
        assert_eq!(report.counts["en"]["java"], 1);
        assert_eq!(report.counts["fr"]["java"], 1);
        assert!(report.render_text().starts_with("2 valid documents"));
    }

    #[test]
    fn malformed_page_fails_check() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "java/code-style.md", &page("Code style"));
        write(dir.path(), "java/broken.md", "---\ntitle: Broken\n---\n");
        let corpus = Corpus::load(&ContentTree::new(ContentLayout::with_defaults(dir.path())));

        let report = CheckReport::from_corpus(&corpus);
        assert_eq!(report.document_count, 1);
        assert_eq!(report.malformed.len(), 1);
        assert!(report.io_failures.is_empty());
        assert!(!report.passed(false));
        assert!(report.render_text().contains("java/broken.md"));
    }

    #[test]
    fn missing_translation_fails_only_in_strict_mode() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "unity/naming.md", &page("Naming"));
        let corpus = Corpus::load(&ContentTree::new(ContentLayout::with_defaults(dir.path())));

        let report = CheckReport::from_corpus(&corpus);
        assert!(report.passed(false));
        assert!(!report.passed(true));
        assert!(report.render_text().contains("missing  unity/naming"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["coverage"]["locales"][0]["missing"][0], "unity/naming");
    }

    /// Accepts `capacity` writes, then fails like a closed pipe.
    struct ClosedPipe {
        capacity: usize,
        written: Vec<u8>,
    }

    impl io::Write for ClosedPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.capacity == 0 {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            self.capacity -= 1;
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn tree_of(root: &Path) -> ContentTree {
        ContentTree::new(ContentLayout::with_defaults(root))
    }

    #[test]
    fn list_writes_json_lines_and_counts_failures() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "java/a.md", &page("A"));
        write(dir.path(), "java/b.md", "no frontmatter\n");
        write(dir.path(), "fr/java/a.md", &page("A fr"));

        let mut out = Vec::new();
        let summary = write_descriptors(&tree_of(dir.path()), &mut out).unwrap();
        assert_eq!(summary.written, 2);
        assert_eq!(summary.failures, 1);
        assert!(!summary.closed_early);
        assert!(!summary.passed());

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["path"], "fr/java/a.md");
        assert_eq!(lines[0]["locale"], "fr");
        assert_eq!(lines[1]["topic"], "java");
    }

    #[cfg(unix)]
    #[test]
    fn list_counts_unreadable_page_and_keeps_siblings() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "react/a.md", &page("A"));
        write(dir.path(), "react/c.md", &page("C"));
        std::os::unix::fs::symlink(dir.path().join("react/gone.md"), dir.path().join("react/b.md"))
            .unwrap();

        let mut out = Vec::new();
        let summary = write_descriptors(&tree_of(dir.path()), &mut out).unwrap();
        assert_eq!(summary.written, 2);
        assert_eq!(summary.failures, 1);
        assert!(!summary.passed());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("react/a.md") && text.contains("react/c.md"));
    }

    #[test]
    fn list_stops_quietly_when_reader_hangs_up() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c", "d"] {
            write(dir.path(), &format!("unity/{name}.md"), &page(name));
        }

        let mut pipe = ClosedPipe {
            capacity: 0,
            written: Vec::new(),
        };
        let summary = write_descriptors(&tree_of(dir.path()), &mut pipe).unwrap();
        assert!(summary.closed_early);
        assert_eq!(summary.written, 0);
        assert!(summary.passed());
        assert!(pipe.written.is_empty());
    }

    #[test]
    fn report_ignores_closed_pipe() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "java/code-style.md", &page("Code style"));
        let corpus = Corpus::load(&tree_of(dir.path()));
        let report = CheckReport::from_corpus(&corpus);

        for json in [false, true] {
            let mut pipe = ClosedPipe {
                capacity: 0,
                written: Vec::new(),
            };
            assert!(report.write_to(&mut pipe, json).is_ok());
        }

        let mut out = Vec::new();
        report.write_to(&mut out, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["document_count"], 1);
    }
}
