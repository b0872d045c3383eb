//! # Metadata Extraction
//!
//! Markdown frontmatter takes priority: the first line is `---` and the
//! block runs to the next line that is exactly `---`. Otherwise a document
//! whose first non-blank text is `<!--` carries its metadata in that
//! comment. Anything else has no metadata block.
//!
//! An unterminated block is reported as [`MetadataState::Unparseable`], as
//! is YAML that fails to parse. YAML that parses to something other than a
//! mapping is [`MetadataState::Malformed`].

use std::path::Path;

use serde_yaml::{Mapping, Value as Yaml};

use stamp_policy::MetadataState;

use crate::collaborators::{BlockStyle, Extraction, MetadataExtractor};
use crate::error::EngineError;

const FENCE: &str = "---";
const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

/// Frontmatter / HTML-comment extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontmatterExtractor;

impl MetadataExtractor for FrontmatterExtractor {
    fn extract(&self, path: &Path, text: &str) -> Extraction {
        let extraction = split(text);
        tracing::trace!(path = %path.display(), style = ?extraction.style, "extracted metadata block");
        extraction
    }

    fn render(&self, metadata: &Mapping, body: &str, style: BlockStyle) -> Result<String, EngineError> {
        let yaml = serde_yaml::to_string(metadata)?;
        Ok(match style {
            BlockStyle::HtmlComment => format!("{COMMENT_OPEN}\n{yaml}{COMMENT_CLOSE}\n{body}"),
            BlockStyle::Frontmatter | BlockStyle::Absent => format!("{FENCE}\n{yaml}{FENCE}\n{body}"),
        })
    }
}

fn split(text: &str) -> Extraction {
    if text.lines().next().map(str::trim_end) == Some(FENCE) {
        return split_frontmatter(text);
    }
    let trimmed = text.trim_start();
    if let Some(inner) = trimmed.strip_prefix(COMMENT_OPEN) {
        return split_comment(text, inner);
    }
    Extraction {
        metadata: MetadataState::Missing,
        body: text.to_string(),
        style: BlockStyle::Absent,
    }
}

fn split_frontmatter(text: &str) -> Extraction {
    // Skip the opening fence line, keeping byte offsets.
    let start = text.find('\n').map_or(text.len(), |i| i + 1);
    let mut offset = start;
    for line in text[start..].split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Extraction {
                metadata: parse_block(&text[start..offset]),
                body: text[offset + line.len()..].to_string(),
                style: BlockStyle::Frontmatter,
            };
        }
        offset += line.len();
    }
    Extraction {
        metadata: MetadataState::Unparseable("Unterminated YAML frontmatter block".to_string()),
        body: text.to_string(),
        style: BlockStyle::Frontmatter,
    }
}

fn split_comment(text: &str, inner: &str) -> Extraction {
    let Some(end) = inner.find(COMMENT_CLOSE) else {
        return Extraction {
            metadata: MetadataState::Unparseable("Unterminated HTML comment metadata block".to_string()),
            body: text.to_string(),
            style: BlockStyle::HtmlComment,
        };
    };
    let rest = &inner[end + COMMENT_CLOSE.len()..];
    Extraction {
        metadata: parse_block(inner[..end].trim()),
        body: rest.strip_prefix('\n').unwrap_or(rest).to_string(),
        style: BlockStyle::HtmlComment,
    }
}

fn parse_block(block: &str) -> MetadataState {
    if block.trim().is_empty() {
        return MetadataState::Empty;
    }
    match serde_yaml::from_str::<Yaml>(block) {
        Ok(Yaml::Null) => MetadataState::Empty,
        Ok(Yaml::Mapping(m)) => MetadataState::Present(m),
        Ok(other) => MetadataState::Malformed(kind_of(&other).to_string()),
        Err(e) => MetadataState::Unparseable(e.to_string()),
    }
}

fn kind_of(value: &Yaml) -> &'static str {
    match value {
        Yaml::Null => "null",
        Yaml::Bool(_) => "a boolean",
        Yaml::Number(_) => "a number",
        Yaml::String(_) => "a string",
        Yaml::Sequence(_) => "a list",
        Yaml::Mapping(_) => "a mapping",
        Yaml::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn extract(text: &str) -> Extraction {
        FrontmatterExtractor.extract(Path::new("doc.md"), text)
    }

    #[test]
    fn frontmatter_block() {
        let e = extract("---\ntitle: T\nversion: 1.0.0\n---\n\n# Heading\n");
        assert_eq!(e.style, BlockStyle::Frontmatter);
        let m = e.metadata.mapping().unwrap();
        assert_eq!(m.get("title").and_then(Yaml::as_str), Some("T"));
        assert_eq!(e.body, "\n# Heading\n");
    }

    #[test]
    fn dates_stay_strings() {
        let e = extract("---\ncreated: 2025-01-01\n---\n");
        let m = e.metadata.mapping().unwrap();
        assert_eq!(m.get("created").and_then(Yaml::as_str), Some("2025-01-01"));
    }

    #[test]
    fn html_comment_block() {
        let e = extract("\n<!--\ntitle: T\n-->\nBody text\n");
        assert_eq!(e.style, BlockStyle::HtmlComment);
        assert!(e.metadata.mapping().is_some());
        assert_eq!(e.body, "Body text\n");
    }

    #[test]
    fn frontmatter_wins_over_comment() {
        let e = extract("---\ntitle: A\n---\n<!--\ntitle: B\n-->\n");
        assert_eq!(e.style, BlockStyle::Frontmatter);
        let m = e.metadata.mapping().unwrap();
        assert_eq!(m.get("title").and_then(Yaml::as_str), Some("A"));
    }

    #[test]
    fn no_block() {
        let e = extract("# Just a heading\n");
        assert_eq!(e.metadata, MetadataState::Missing);
        assert_eq!(e.style, BlockStyle::Absent);
        assert_eq!(e.body, "# Just a heading\n");
    }

    #[test]
    fn empty_and_unterminated_blocks() {
        assert_eq!(extract("---\n---\nbody").metadata, MetadataState::Empty);
        assert_eq!(extract("<!-- -->").metadata, MetadataState::Empty);
        assert_eq!(
            extract("---\ntitle: T\n").metadata,
            MetadataState::Unparseable("Unterminated YAML frontmatter block".to_string())
        );
        assert_eq!(
            extract("<!-- title: T").metadata,
            MetadataState::Unparseable("Unterminated HTML comment metadata block".to_string())
        );
    }

    #[test]
    fn invalid_yaml_and_non_mapping() {
        assert!(matches!(extract("---\ntitle: [\n---\n").metadata, MetadataState::Unparseable(_)));
        assert_eq!(
            extract("---\n- a\n- b\n---\n").metadata,
            MetadataState::Malformed("a list".to_string())
        );
    }

    #[test]
    fn render_round_trips_style() {
        let src = "---\ntitle: T\nversion: 1.0.0\n---\n\n# Heading\n";
        let e = extract(src);
        let out = FrontmatterExtractor
            .render(e.metadata.mapping().unwrap(), &e.body, e.style)
            .unwrap();
        assert_eq!(out, src);

        let src = "<!--\ntitle: T\n-->\nBody\n";
        let e = extract(src);
        let out = FrontmatterExtractor
            .render(e.metadata.mapping().unwrap(), &e.body, e.style)
            .unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn render_absent_as_frontmatter() {
        let mut m = Mapping::new();
        m.insert(Yaml::from("title"), Yaml::from("T"));
        let out = FrontmatterExtractor.render(&m, "body\n", BlockStyle::Absent).unwrap();
        assert_eq!(out, "---\ntitle: T\n---\nbody\n");
    }

    proptest! {
        #[test]
        fn rendered_frontmatter_extracts_to_same_content(
            entries in proptest::collection::btree_map("[a-z_]{1,8}", "[A-Za-z0-9 .:-]{0,12}", 1..6),
            body in "[a-z# \n]{0,40}",
        ) {
            let mut m = Mapping::new();
            for (k, v) in entries {
                m.insert(Yaml::String(k), Yaml::String(v));
            }
            let text = FrontmatterExtractor.render(&m, &body, BlockStyle::Frontmatter).unwrap();
            let e = extract(&text);
            prop_assert_eq!(e.metadata, MetadataState::Present(m));
            prop_assert_eq!(e.body, body);
        }
    }
}
