//! Metadata block ("frontmatter") reading.
//!
//! Only a documented subset of the YAML-looking header is recognized, line by
//! line. This is deliberately not a YAML parser:
//!
//! ```text
//! boundary   := "---" WS*                       (first line, and a later line)
//! tags-line  := WS* "tags:" value               (key matched case-insensitively)
//!   value    := "[" item ("," item)* "]" ...    inline array, no continuation
//!             | item ("," item)*                bare list, no continuation
//!             | ""                              opens a block list
//! dash-line  := WS* "-" WS* item WS*            one tag while a block list is open
//! key-line   := non-blank line not starting with space or tab; closes a block list
//! publish    := WS* "publish:" WS* "true" WS*   (case-insensitive)
//! item       := text, trimmed, surrounding quotes stripped, lowercased
//! ```

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// The tag that marks a note as publishable.
pub const PUBLISH_TAG: &str = "publish";

/// Tags are kept sorted so that derived output is deterministic.
pub type TagSet = BTreeSet<String>;

static BOUNDARY_REGEX: OnceLock<Regex> = OnceLock::new();
static PUBLISH_REGEX: OnceLock<Regex> = OnceLock::new();

fn boundary_regex() -> &'static Regex {
    BOUNDARY_REGEX.get_or_init(|| Regex::new(r"^---\s*$").unwrap())
}

fn publish_regex() -> &'static Regex {
    PUBLISH_REGEX.get_or_init(|| Regex::new(r"(?i)^\s*publish:\s*true\s*$").unwrap())
}

/// Parsed metadata block of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontmatter {
    lines: Vec<String>,
    tags: TagSet,
    has_publish: bool,
}

impl Frontmatter {
    /// Raw lines between the two boundaries, in order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// True when `publish: true` is set or the `publish` tag is present.
    pub fn has_publish(&self) -> bool {
        self.has_publish
    }
}

/// Parse the metadata block of `content`.
///
/// Returns `None` when the first line is not a boundary or no closing
/// boundary follows; such documents are never published.
///
/// # Example
///
/// ```
/// use notepress_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ntags: [Draft, publish]\n---\nBody\n";
/// let fm = parse_frontmatter(content).unwrap();
/// assert!(fm.has_publish());
/// assert!(fm.tags().contains("draft"));
/// ```
pub fn parse_frontmatter(content: &str) -> Option<Frontmatter> {
    let lines: Vec<&str> = content.lines().collect();
    let end = closing_boundary(&lines)?;
    let block = &lines[1..end];

    let tags = extract_tags(block);
    let has_publish =
        block.iter().any(|line| publish_regex().is_match(line)) || tags.contains(PUBLISH_TAG);

    Some(Frontmatter {
        lines: block.iter().map(|l| l.to_string()).collect(),
        tags,
        has_publish,
    })
}

/// Collect tags from the lines of a metadata block.
pub fn extract_tags<S: AsRef<str>>(block: &[S]) -> TagSet {
    let mut tags = TagSet::new();
    let mut in_block = false;

    for line in block {
        let line = line.as_ref();
        if let Some(value) = tags_value(line) {
            in_block = false;
            match value {
                TagsValue::Inline(items) | TagsValue::Bare(items) => {
                    tags.extend(split_items(items).map(|(_, item)| item));
                }
                TagsValue::Block => in_block = true,
            }
            continue;
        }

        if in_block {
            if let Some(item) = dash_item(line) {
                let item = clean_item(item);
                if !item.is_empty() {
                    tags.insert(item);
                }
            } else if closes_block(line) {
                in_block = false;
            }
        }
    }

    tags
}

/// Index of the closing boundary line, if `lines` opens with a metadata block.
pub(crate) fn closing_boundary<S: AsRef<str>>(lines: &[S]) -> Option<usize> {
    if !is_boundary(lines.first()?.as_ref()) {
        return None;
    }
    lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, line)| is_boundary(line.as_ref()))
        .map(|(idx, _)| idx)
}

pub(crate) fn is_boundary(line: &str) -> bool {
    boundary_regex().is_match(line.trim_end_matches(['\r', '\n']))
}

/// Value side of a `tags:` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagsValue<'a> {
    /// Text between `[` and the first `]`.
    Inline(&'a str),
    Bare(&'a str),
    Block,
}

pub(crate) fn tags_value(line: &str) -> Option<TagsValue<'_>> {
    let trimmed = line.trim();
    let key = trimmed.get(..5)?;
    if !key.eq_ignore_ascii_case("tags:") {
        return None;
    }
    let value = trimmed[5..].trim();
    if value.is_empty() {
        return Some(TagsValue::Block);
    }
    if let Some(rest) = value.strip_prefix('[') {
        if let Some(close) = rest.find(']') {
            return Some(TagsValue::Inline(&rest[..close]));
        }
    }
    Some(TagsValue::Bare(value))
}

/// Item text of a block-list line (`  - item`), untrimmed of quotes.
pub(crate) fn dash_item(line: &str) -> Option<&str> {
    let item = line.trim_start().strip_prefix('-')?.trim();
    (!item.is_empty()).then_some(item)
}

/// A non-blank line at column zero ends a block list.
pub(crate) fn closes_block(line: &str) -> bool {
    !line.trim().is_empty() && !line.starts_with([' ', '\t'])
}

/// Trim whitespace and surrounding quotes, then lowercase.
pub(crate) fn clean_item(raw: &str) -> String {
    raw.trim().trim_matches(['\'', '"']).to_lowercase()
}

/// Split a comma list into `(raw item, cleaned item)` pairs, skipping empties.
pub(crate) fn split_items(list: &str) -> impl Iterator<Item = (&str, String)> {
    list.split(',')
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| (raw, clean_item(raw)))
        .filter(|(_, item)| !item.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags_of(content: &str) -> Vec<String> {
        parse_frontmatter(content)
            .expect("frontmatter")
            .tags()
            .iter()
            .cloned()
            .collect()
    }

    #[test]
    fn test_no_frontmatter() {
        assert!(parse_frontmatter("# Just Content\n\npublish: true\n").is_none());
        assert!(parse_frontmatter("").is_none());
    }

    #[test]
    fn test_unclosed_frontmatter() {
        assert!(parse_frontmatter("---\npublish: true\nno closing\n").is_none());
    }

    #[test]
    fn test_boundary_must_be_first_line() {
        assert!(parse_frontmatter("\n---\npublish: true\n---\n").is_none());
    }

    #[test]
    fn test_boundary_allows_trailing_whitespace() {
        let fm = parse_frontmatter("---  \npublish: true\n---\t\nbody").unwrap();
        assert!(fm.has_publish());
        assert_eq!(fm.lines(), &["publish: true".to_string()]);
    }

    #[test]
    fn test_crlf_document() {
        let fm = parse_frontmatter("---\r\ntags: [a]\r\npublish: TRUE\r\n---\r\nbody\r\n").unwrap();
        assert!(fm.has_publish());
        assert_eq!(tags_of("---\r\ntags: [a]\r\n---\r\n"), vec!["a"]);
    }

    #[test]
    fn test_publish_flag_case_insensitive() {
        let fm = parse_frontmatter("---\nPublish:   True \n---\n").unwrap();
        assert!(fm.has_publish());

        let fm = parse_frontmatter("---\npublish: false\n---\n").unwrap();
        assert!(!fm.has_publish());
    }

    #[test]
    fn test_inline_tags() {
        let content = "---\ntags: [Draft, \"Rust\", 'web dev', publish]\n---\n";
        assert_eq!(tags_of(content), vec!["draft", "publish", "rust", "web dev"]);
        assert!(parse_frontmatter(content).unwrap().has_publish());
    }

    #[test]
    fn test_inline_tags_do_not_continue() {
        let content = "---\ntags: [a]\n  - publish\n---\n";
        assert_eq!(tags_of(content), vec!["a"]);
        assert!(!parse_frontmatter(content).unwrap().has_publish());
    }

    #[test]
    fn test_bare_comma_list() {
        assert_eq!(tags_of("---\ntags: one, Two\n---\n"), vec!["one", "two"]);
    }

    #[test]
    fn test_block_tags() {
        let content = "---\ntitle: x\ntags:\n  - Rust\n  - \"publish\"\n\n  - later\nauthor: me\n  - not-a-tag\n---\n";
        let fm = parse_frontmatter(content).unwrap();
        assert_eq!(tags_of(content), vec!["later", "publish", "rust"]);
        assert!(fm.has_publish());
    }

    #[test]
    fn test_block_stops_at_first_key_line() {
        let content = "---\ntags:\n- a\nstatus: draft\n- b\n---\n";
        assert_eq!(tags_of(content), vec!["a"]);
    }

    #[test]
    fn test_inline_and_block_equivalent() {
        let inline = parse_frontmatter("---\ntags: [alpha, beta]\n---\n").unwrap();
        let block = parse_frontmatter("---\ntags:\n  - alpha\n  - beta\n---\n").unwrap();
        assert_eq!(inline.tags(), block.tags());
    }

    #[test]
    fn test_tags_key_case_insensitive() {
        assert_eq!(tags_of("---\nTags: [x]\n---\n"), vec!["x"]);
    }

    #[test]
    fn test_publish_tag_only() {
        let fm = parse_frontmatter("---\ntags:\n  - publish\n---\n").unwrap();
        assert!(fm.has_publish());
    }

    #[test]
    fn test_draft_publish_example() {
        let fm = parse_frontmatter("---\ntags: [draft, publish]\n---\n").unwrap();
        assert!(fm.has_publish());
        assert_eq!(tags_of("---\ntags: [draft, publish]\n---\n"), vec!["draft", "publish"]);
    }

    #[test]
    fn test_closing_boundary_index() {
        assert_eq!(closing_boundary(&["---", "a: b", "---", "body"]), Some(2));
        assert_eq!(closing_boundary(&["body", "---"]), None);
        let empty: [&str; 0] = [];
        assert_eq!(closing_boundary(&empty), None);
    }
}
