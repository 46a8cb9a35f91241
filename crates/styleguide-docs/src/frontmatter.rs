/// YAML frontmatter at the top of every page:
///
/// ```text
/// ---
/// title: Naming conventions
/// description: How to name classes, files and widgets
/// sidebar:
///   order: 2
/// ---
/// ```
///
/// `title` and `description` are required and must be non-empty. Any other
/// key belongs to the renderer and is ignored, except `sidebar.order`, which
/// is picked up leniently for topic ordering.
use serde::Deserialize;

use crate::error::MalformedReason;

const FENCE: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontmatter {
    pub title: String,
    pub description: String,
    pub sidebar_order: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawFrontmatter {
    title: Option<String>,
    description: Option<String>,
    sidebar: Option<serde_yaml::Value>,
}

/// Splits `content` into the YAML block and the body that follows it.
pub fn split(content: &str) -> Result<(&str, &str), MalformedReason> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut lines = content.split_inclusive('\n');
    let first = lines.next().ok_or(MalformedReason::MissingFrontmatter)?;
    if first.trim_end() != FENCE {
        return Err(MalformedReason::MissingFrontmatter);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == FENCE {
            let yaml = &content[yaml_start..offset];
            let body = &content[offset + line.len()..];
            return Ok((yaml, body));
        }
        offset += line.len();
    }
    Err(MalformedReason::UnterminatedFrontmatter)
}

/// Parses and validates the frontmatter, returning it with the page body.
pub fn parse(content: &str) -> Result<(Frontmatter, &str), MalformedReason> {
    let (yaml, body) = split(content)?;

    if yaml.trim().is_empty() {
        return Err(MalformedReason::MissingField("title"));
    }
    let raw: RawFrontmatter =
        serde_yaml::from_str(yaml).map_err(|e| MalformedReason::InvalidYaml(e.to_string()))?;

    let title = required(raw.title, "title")?;
    let description = required(raw.description, "description")?;
    let sidebar_order = raw
        .sidebar
        .as_ref()
        .and_then(|s| s.get("order"))
        .and_then(serde_yaml::Value::as_i64);

    Ok((
        Frontmatter {
            title,
            description,
            sidebar_order,
        },
        body,
    ))
}

fn required(value: Option<String>, field: &'static str) -> Result<String, MalformedReason> {
    let value = value.ok_or(MalformedReason::MissingField(field))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MalformedReason::EmptyField(field));
    }
    Ok(trimmed.to_string())
}
