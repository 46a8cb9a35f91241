/// Body parser for style-guide pages.
///
/// Pages are CommonMark with fenced code samples:
/// - ATX headings (`#` .. `######`) open a new section
/// - fences are ``` or ~~~, three or more, optionally followed by a language tag
/// - `#` lines inside a fence are code, never headings
/// - a fence left open runs to the end of the body
///
/// Text before the first heading becomes a level-0 section with an empty
/// heading. MDX `import` lines in that preamble are dropped.
///
/// Line-by-line scan with a regex for heading detection; never fails.
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{CodeBlock, Document, DocumentSection};

const EMBEDDING_TEXT_LIMIT: usize = 3000;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})[ \t]+(.+?)(?:[ \t]+#+)?[ \t]*$").expect("valid regex")
});

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedBody {
    pub sections: Vec<DocumentSection>,
    pub code_blocks: Vec<CodeBlock>,
}

struct OpenFence {
    marker: char,
    width: usize,
    language: Option<String>,
    line: usize,
    lines: Vec<String>,
}

struct SectionBuilder {
    heading: String,
    level: u8,
    lines: Vec<String>,
}

impl SectionBuilder {
    fn finish(self, sections: &mut Vec<DocumentSection>) {
        let content = self.lines.join("\n").trim().to_string();
        // An empty preamble is not a section.
        if self.level == 0 && content.is_empty() {
            return;
        }
        sections.push(DocumentSection {
            heading: self.heading,
            level: self.level,
            content,
        });
    }
}

pub fn parse_body(body: &str) -> ParsedBody {
    let mut parsed = ParsedBody::default();
    let mut current = SectionBuilder {
        heading: String::new(),
        level: 0,
        lines: Vec::new(),
    };
    let mut fence: Option<OpenFence> = None;

    for (idx, line) in body.lines().enumerate() {
        let line_number = idx + 1;

        if let Some(open) = fence.as_mut() {
            if closes_fence(line, open.marker, open.width) {
                if let Some(done) = fence.take() {
                    parsed.code_blocks.push(CodeBlock {
                        language: done.language,
                        line: done.line,
                        code: done.lines.join("\n"),
                    });
                }
            } else {
                open.lines.push(line.to_string());
            }
            current.lines.push(line.to_string());
            continue;
        }

        if let Some((marker, width, info)) = opens_fence(line) {
            fence = Some(OpenFence {
                marker,
                width,
                language: info.split_whitespace().next().map(str::to_string),
                line: line_number,
                lines: Vec::new(),
            });
            current.lines.push(line.to_string());
            continue;
        }

        if let Some(caps) = HEADING_RE.captures(line) {
            let level = caps[1].len() as u8;
            let heading = caps[2].trim().to_string();
            let previous = std::mem::replace(
                &mut current,
                SectionBuilder {
                    heading,
                    level,
                    lines: Vec::new(),
                },
            );
            previous.finish(&mut parsed.sections);
            continue;
        }

        if current.level == 0 && is_mdx_import(line) {
            continue;
        }
        current.lines.push(line.to_string());
    }

    if let Some(open) = fence.take() {
        parsed.code_blocks.push(CodeBlock {
            language: open.language,
            line: open.line,
            code: open.lines.join("\n"),
        });
    }
    current.finish(&mut parsed.sections);

    parsed
}

/// Returns the fence character, its run length and the info string.
fn opens_fence(line: &str) -> Option<(char, usize, &str)> {
    let trimmed = strip_indent(line)?;
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let width = trimmed.chars().take_while(|c| *c == marker).count();
    if width < 3 {
        return None;
    }
    let info = trimmed[width..].trim();
    // Backtick fences cannot carry backticks in their info string.
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some((marker, width, info))
}

fn closes_fence(line: &str, marker: char, width: usize) -> bool {
    let Some(trimmed) = strip_indent(line) else {
        return false;
    };
    let run = trimmed.chars().take_while(|c| *c == marker).count();
    run >= width && trimmed[run..].trim().is_empty()
}

/// Up to three spaces of indentation; four or more is an indented code line.
fn strip_indent(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    (indent <= 3).then(|| &line[indent..])
}

fn is_mdx_import(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("import ") && (trimmed.contains(" from ") || trimmed.ends_with(';'))
}

/// Text handed to the embedding model: title, description and body, capped.
pub fn compose_embedding_text(document: &Document) -> String {
    let text = format!(
        "{}. {}. Topic: {}. {}",
        document.descriptor.title,
        document.descriptor.description,
        document.descriptor.topic,
        document.raw_markdown.trim()
    );
    if text.chars().count() > EMBEDDING_TEXT_LIMIT {
        text.chars().take(EMBEDDING_TEXT_LIMIT).collect()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocumentDescriptor;

    #[test]
    fn splits_sections_at_headings() {
        let body = "Intro paragraph.\n\n## Naming\n\nUse camelCase.\n\n### Files\n\nsnake_case.dart\n\n## Layout\n\nOne widget per file.\n";
        let parsed = parse_body(body);
        let headings: Vec<(&str, u8)> = parsed
            .sections
            .iter()
            .map(|s| (s.heading.as_str(), s.level))
            .collect();
        assert_eq!(
            headings,
            vec![("", 0), ("Naming", 2), ("Files", 3), ("Layout", 2)]
        );
        assert_eq!(parsed.sections[0].content, "Intro paragraph.");
        assert_eq!(parsed.sections[2].content, "snake_case.dart");
    }

    #[test]
    fn hashes_inside_fences_are_not_headings() {
        let body = "## Scripts\n\n```bash\n# install deps\nflutter pub get\n```\n\n## Next\n";
        let parsed = parse_body(body);
        assert_eq!(parsed.sections.len(), 2);
        assert_eq!(parsed.code_blocks.len(), 1);
        let block = &parsed.code_blocks[0];
        assert_eq!(block.language.as_deref(), Some("bash"));
        assert_eq!(block.line, 3);
        assert_eq!(block.code, "# install deps\nflutter pub get");
        assert!(parsed.sections[0].content.contains("# install deps"));
    }

    #[test]
    fn tilde_fence_and_longer_backtick_runs() {
        let body = "~~~yaml\nkey: value\n~~~\n\n````tsx title=\"App.tsx\"\n```\nnested\n````\n";
        let parsed = parse_body(body);
        assert_eq!(parsed.code_blocks.len(), 2);
        assert_eq!(parsed.code_blocks[0].language.as_deref(), Some("yaml"));
        assert_eq!(parsed.code_blocks[1].language.as_deref(), Some("tsx"));
        assert_eq!(parsed.code_blocks[1].code, "```\nnested");
    }

    #[test]
    fn fence_without_language() {
        let parsed = parse_body("```\nplain\n```\n");
        assert_eq!(parsed.code_blocks[0].language, None);
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let parsed = parse_body("## Example\n\n```java\nclass Foo {}\n## not a heading\n");
        assert_eq!(parsed.sections.len(), 1);
        assert_eq!(parsed.code_blocks.len(), 1);
        assert_eq!(parsed.code_blocks[0].code, "class Foo {}\n## not a heading");
    }

    #[test]
    fn closing_hashes_are_stripped() {
        let parsed = parse_body("## Naming ##\n\ntext\n");
        assert_eq!(parsed.sections[0].heading, "Naming");
    }

    #[test]
    fn indented_hash_line_is_not_a_heading() {
        let parsed = parse_body("    # indented code\n");
        assert_eq!(parsed.sections.len(), 1);
        assert_eq!(parsed.sections[0].level, 0);
    }

    #[test]
    fn mdx_imports_are_dropped_from_preamble() {
        let body = "import { Tabs, TabItem } from '@astrojs/starlight/components';\n\nWelcome.\n\n## Setup\n\nimport is a keyword here\n";
        let parsed = parse_body(body);
        assert_eq!(parsed.sections[0].content, "Welcome.");
        assert_eq!(parsed.sections[1].content, "import is a keyword here");
    }

    #[test]
    fn empty_body_has_no_sections() {
        assert_eq!(parse_body(""), ParsedBody::default());
    }

    #[test]
    fn embedding_text_is_capped() {
        let document = Document {
            id: "java/code-style".to_string(),
            slug: "java/code-style".to_string(),
            descriptor: DocumentDescriptor {
                path: "java/code-style.md".to_string(),
                locale: "en".to_string(),
                topic: "java".to_string(),
                title: "Code style".to_string(),
                description: "Formatting rules".to_string(),
            },
            sidebar_order: None,
            sections: Vec::new(),
            code_blocks: Vec::new(),
            raw_markdown: "x".repeat(5000),
        };
        let text = compose_embedding_text(&document);
        assert!(text.starts_with("Code style. Formatting rules. Topic: java."));
        assert_eq!(text.chars().count(), EMBEDDING_TEXT_LIMIT);
    }
}
