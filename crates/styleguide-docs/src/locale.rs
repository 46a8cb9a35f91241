/// Translation coverage: which default-locale pages each locale is missing,
/// which translated pages have no original, and which pairs drifted apart in
/// structure. Reported only; nothing here rejects a document.
use std::collections::BTreeMap;

use serde::Serialize;

use crate::corpus::Corpus;
use crate::model::Document;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub default_locale: String,
    pub locales: Vec<LocaleCoverage>,
}

impl CoverageReport {
    pub fn problem_count(&self) -> usize {
        self.locales.iter().map(LocaleCoverage::problem_count).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.problem_count() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleCoverage {
    pub locale: String,
    pub translated: usize,
    pub missing: Vec<String>,
    pub orphans: Vec<String>,
    pub structure_mismatches: Vec<StructureMismatch>,
}

impl LocaleCoverage {
    pub fn problem_count(&self) -> usize {
        self.missing.len() + self.orphans.len() + self.structure_mismatches.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureMismatch {
    pub slug: String,
    pub locale: String,
    pub detail: String,
}

pub fn coverage(corpus: &Corpus) -> CoverageReport {
    coverage_of(
        &corpus.documents,
        &corpus.layout.default_locale,
        &corpus.layout.locales,
    )
}

pub fn coverage_of(documents: &[Document], default_locale: &str, locales: &[String]) -> CoverageReport {
    let originals = by_slug(documents, default_locale);

    let locales = locales
        .iter()
        .filter(|l| l.as_str() != default_locale)
        .map(|locale| {
            let variants = by_slug(documents, locale);

            let missing = originals
                .keys()
                .filter(|slug| !variants.contains_key(*slug))
                .map(|slug| slug.to_string())
                .collect();
            let orphans = variants
                .keys()
                .filter(|slug| !originals.contains_key(*slug))
                .map(|slug| slug.to_string())
                .collect();

            let mut translated = 0;
            let mut structure_mismatches = Vec::new();
            for (slug, variant) in &variants {
                let Some(original) = originals.get(slug) else {
                    continue;
                };
                translated += 1;
                if let Some(detail) = compare_structure(original, variant) {
                    structure_mismatches.push(StructureMismatch {
                        slug: slug.to_string(),
                        locale: locale.clone(),
                        detail,
                    });
                }
            }

            LocaleCoverage {
                locale: locale.clone(),
                translated,
                missing,
                orphans,
                structure_mismatches,
            }
        })
        .collect();

    CoverageReport {
        default_locale: default_locale.to_string(),
        locales,
    }
}

fn by_slug<'a>(documents: &'a [Document], locale: &str) -> BTreeMap<&'a str, &'a Document> {
    documents
        .iter()
        .filter(|d| d.locale() == locale)
        .map(|d| (d.slug.as_str(), d))
        .collect()
}

fn compare_structure(original: &Document, variant: &Document) -> Option<String> {
    let mut differences = Vec::new();

    let (ours, theirs) = (original.heading_outline(), variant.heading_outline());
    if ours != theirs {
        differences.push(format!(
            "headings {} ({}) vs {} ({})",
            render_outline(&ours),
            original.locale(),
            render_outline(&theirs),
            variant.locale()
        ));
    }

    let (ours, theirs) = (original.code_blocks.len(), variant.code_blocks.len());
    if ours != theirs {
        differences.push(format!(
            "code blocks {ours} ({}) vs {theirs} ({})",
            original.locale(),
            variant.locale()
        ));
    }

    (!differences.is_empty()).then(|| differences.join("; "))
}

/// `[0, 3, 1, 0, 0, 0]` -> `h2:3 h3:1`.
fn render_outline(outline: &[usize; 6]) -> String {
    let parts: Vec<String> = outline
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(level, count)| format!("h{}:{count}", level + 1))
        .collect();
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(" ")
    }
}
