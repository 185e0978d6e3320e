//! Content rewrites applied to a note before it is published.
//!
//! Each pass is a pure `&str -> String` function. [`ContentTransformer`]
//! chains them in a fixed order:
//!
//! 1. [`remove_publish_tag`]
//! 2. [`promote_title`]
//! 3. [`rewrite_note_links`]
//! 4. [`rewrite_image_embeds`]
//! 5. [`rewrite_wikilinks`]
//!
//! Passes 3-5 only touch the body and leave fenced code blocks alone.

use crate::config::TransformConfig;
use crate::frontmatter::{
    clean_item, closes_block, closing_boundary, dash_item, split_items, tags_value, TagsValue,
    PUBLISH_TAG,
};
use crate::slug::slugify;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Extensions an `![[...]]` embed may name to be treated as media.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "bmp", "pdf",
];

static HEADING_REGEX: OnceLock<Regex> = OnceLock::new();
static TITLE_KEY_REGEX: OnceLock<Regex> = OnceLock::new();
static NOTE_LINK_REGEX: OnceLock<Regex> = OnceLock::new();
static EMBED_REGEX: OnceLock<Regex> = OnceLock::new();
static WIKILINK_REGEX: OnceLock<Regex> = OnceLock::new();

fn heading_regex() -> &'static Regex {
    HEADING_REGEX.get_or_init(|| Regex::new(r"^#[ \t]+(.*?)(?:[ \t]+#+)?[ \t]*$").unwrap())
}

fn title_key_regex() -> &'static Regex {
    TITLE_KEY_REGEX.get_or_init(|| Regex::new(r"^([ \t]*)title[ \t]*:").unwrap())
}

fn note_link_regex() -> &'static Regex {
    NOTE_LINK_REGEX.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+\.md)\)").unwrap())
}

fn embed_regex() -> &'static Regex {
    EMBED_REGEX.get_or_init(|| Regex::new(r"!\[\[([^\]|]+)(?:\|[^\]]*)?\]\]").unwrap())
}

fn wikilink_regex() -> &'static Regex {
    WIKILINK_REGEX.get_or_init(|| Regex::new(r"!?\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").unwrap())
}

/// Applies every rewrite pass, in order, to a publishable note.
#[derive(Debug, Clone)]
pub struct ContentTransformer {
    media_url: String,
    media_prefixes: Vec<String>,
}

impl ContentTransformer {
    pub fn new(config: &TransformConfig) -> Self {
        Self {
            media_url: config.media_url.trim_end_matches('/').to_string(),
            media_prefixes: config.media_prefixes.clone(),
        }
    }

    /// Run the full pipeline over a note's raw text.
    pub fn transform(&self, text: &str) -> String {
        let text = remove_publish_tag(text);
        let text = promote_title(&text);

        let (header, body) = split_header(&text);
        let body = map_outside_fences(body, |prose| {
            let prose = rewrite_note_links(prose);
            let prose = rewrite_image_embeds(&prose, &self.media_url, &self.media_prefixes);
            rewrite_wikilinks(&prose)
        });

        let mut out = String::with_capacity(header.len() + body.len());
        out.push_str(header);
        out.push_str(&body);
        out
    }
}

impl Default for ContentTransformer {
    fn default() -> Self {
        Self::new(&TransformConfig::default())
    }
}

/// Drop the `publish` marker from the tags of the metadata block.
///
/// Inline arrays are re-rendered without it, bare lists likewise, and a
/// `- publish` block-list line is removed. All other tags keep their spelling.
pub fn remove_publish_tag(text: &str) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let Some(end) = closing_boundary(&lines) else {
        return text.to_string();
    };

    let mut out = String::with_capacity(text.len());
    let mut in_block = false;

    for (idx, line) in lines.iter().enumerate() {
        if idx == 0 || idx >= end {
            out.push_str(line);
            continue;
        }

        if let Some(value) = tags_value(line) {
            in_block = value == TagsValue::Block;
            out.push_str(&rewrite_tags_line(line, value));
            continue;
        }

        if in_block {
            if let Some(item) = dash_item(line) {
                if clean_item(item) == PUBLISH_TAG {
                    continue;
                }
            } else if closes_block(line) {
                in_block = false;
            }
        }
        out.push_str(line);
    }

    out
}

fn rewrite_tags_line(line: &str, value: TagsValue<'_>) -> String {
    let items = match value {
        TagsValue::Inline(items) | TagsValue::Bare(items) => items,
        TagsValue::Block => return line.to_string(),
    };
    if !split_items(items).any(|(_, item)| item == PUBLISH_TAG) {
        return line.to_string();
    }

    let kept: Vec<&str> = split_items(items)
        .filter(|(_, item)| item != PUBLISH_TAG)
        .map(|(raw, _)| raw)
        .collect();
    let prefix = line.split(':').next().unwrap_or("tags");

    match value {
        TagsValue::Inline(_) => {
            // Keep whatever followed the closing bracket (comments, line ending).
            let after = line
                .find('[')
                .and_then(|open| line[open..].find(']').map(|close| open + close + 1))
                .map(|pos| &line[pos..])
                .unwrap_or_else(|| line_ending(line));
            format!("{prefix}: [{}]{after}", kept.join(", "))
        }
        _ if kept.is_empty() => format!("{prefix}: []{}", line_ending(line)),
        _ => format!("{prefix}: {}{}", kept.join(", "), line_ending(line)),
    }
}

/// Move a leading `# Heading` of the body into a `title:` metadata field.
///
/// Only the first non-blank body line is considered, and only a level-one
/// heading with text. The heading and at most one blank line after it are
/// removed. An existing `title:` line is overwritten in place (indentation
/// kept); otherwise the field is inserted right after the opening boundary.
pub fn promote_title(text: &str) -> String {
    let mut lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
    let Some(end) = closing_boundary(&lines) else {
        return text.to_string();
    };

    let Some(heading_idx) = (end + 1..lines.len()).find(|&i| !lines[i].trim().is_empty()) else {
        return text.to_string();
    };
    let heading = lines[heading_idx].trim_end_matches(['\r', '\n']);
    let Some(title) = heading_regex()
        .captures(heading)
        .map(|caps| caps[1].trim().to_string())
        .filter(|title| !title.is_empty())
    else {
        return text.to_string();
    };

    let followed_by_blank = lines
        .get(heading_idx + 1)
        .is_some_and(|next| next.trim().is_empty());
    if followed_by_blank {
        lines.remove(heading_idx + 1);
    }
    lines.remove(heading_idx);

    let quoted = quote_title(&title);
    let existing = (1..end).find(|&i| title_key_regex().is_match(&lines[i]));
    match existing {
        Some(i) => {
            let indent = title_key_regex()
                .captures(&lines[i])
                .map(|caps| caps[1].to_string())
                .unwrap_or_default();
            let eol = line_ending(&lines[i]).to_string();
            lines[i] = format!("{indent}title: {quoted}{eol}");
        }
        None => {
            let eol = match line_ending(&lines[0]) {
                "" => "\n",
                eol => eol,
            };
            let line = format!("title: {quoted}{eol}");
            lines.insert(1, line);
        }
    }

    lines.concat()
}

fn quote_title(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Rewrite `[text](path/note.md)` into the clean URL form `[text](/path/note/)`.
///
/// Absolute URLs (`scheme://...`) are left untouched.
pub fn rewrite_note_links(text: &str) -> String {
    note_link_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            let label = &caps[1];
            let target = &caps[2];
            if target.contains("://") {
                return caps[0].to_string();
            }

            let mut path = target[..target.len() - ".md".len()].to_string();
            if !path.starts_with('/') {
                path.insert(0, '/');
            }
            if !path.ends_with('/') {
                path.push('/');
            }
            format!("[{label}]({path})")
        })
        .into_owned()
}

/// Rewrite `![[file.png]]` media embeds into standard image references
/// rooted at `media_url`.
///
/// A leading prefix from `media_prefixes` is stripped first, and each path
/// segment is percent-encoded. Embeds of other files are left for
/// [`rewrite_wikilinks`].
pub fn rewrite_image_embeds(text: &str, media_url: &str, media_prefixes: &[String]) -> String {
    let media_url = media_url.trim_end_matches('/');
    embed_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps[1].trim();
            if !is_media_file(name) {
                return caps[0].to_string();
            }

            let name = name.trim_start_matches('/');
            let name = media_prefixes
                .iter()
                .find_map(|prefix| name.strip_prefix(prefix.as_str()))
                .unwrap_or(name);
            let alt = name.rsplit('/').next().unwrap_or(name);
            let encoded: Vec<String> = name
                .split('/')
                .map(|segment| urlencoding::encode(segment).into_owned())
                .collect();

            format!("![{alt}]({media_url}/{})", encoded.join("/"))
        })
        .into_owned()
}

fn is_media_file(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.as_str()))
}

/// Rewrite `[[Target]]` and `[[Target|Label]]` into `[Label](/target/)`.
///
/// A `#Heading` suffix on the target becomes a slugged fragment. Leftover
/// `![[...]]` embeds of non-media files become ordinary links.
pub fn rewrite_wikilinks(text: &str) -> String {
    wikilink_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            let target = caps[1].trim();
            let label = caps
                .get(2)
                .map(|m| m.as_str().trim())
                .unwrap_or(target);
            format!("[{label}]({})", wikilink_href(target))
        })
        .into_owned()
}

fn wikilink_href(target: &str) -> String {
    let (page, fragment) = match target.split_once('#') {
        Some((page, fragment)) => (page.trim(), Some(slugify(fragment))),
        None => (target, None),
    };
    let fragment = fragment.filter(|f| !f.is_empty());

    match fragment {
        Some(fragment) if page.is_empty() => format!("#{fragment}"),
        Some(fragment) => format!("/{}/#{fragment}", slugify(page)),
        None => format!("/{}/", slugify(page)),
    }
}

/// Split into (metadata block including both boundaries, body).
fn split_header(text: &str) -> (&str, &str) {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    match closing_boundary(&lines) {
        Some(end) => {
            let header_len: usize = lines[..=end].iter().map(|l| l.len()).sum();
            text.split_at(header_len)
        }
        None => ("", text),
    }
}

/// Apply `f` to every stretch of text outside fenced code blocks.
fn map_outside_fences(text: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prose = String::new();
    let mut fence: Option<&'static str> = None;

    for line in text.split_inclusive('\n') {
        let marker = fence_marker(line);
        match fence {
            Some(open) => {
                out.push_str(line);
                if marker == Some(open) {
                    fence = None;
                }
            }
            None if marker.is_some() => {
                out.push_str(&f(&prose));
                prose.clear();
                out.push_str(line);
                fence = marker;
            }
            None => prose.push_str(line),
        }
    }

    out.push_str(&f(&prose));
    out
}

fn fence_marker(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

fn line_ending(line: &str) -> &str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}
