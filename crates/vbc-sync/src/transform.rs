//! Content transformation: source HTML to destination plain text.
//!
//! Rendering is best-effort. If the HTML cannot be rendered the raw content is
//! used as-is. Replies and posts with attachments are rejected outright.

use std::sync::OnceLock;

use regex::{Captures, Regex, RegexBuilder};
use thiserror::Error;
use vbc_core::Post;

use crate::error::UnsupportedPost;

/// Why a piece of HTML could not be rendered to plain text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("unterminated tag at byte {offset}")]
    UnterminatedTag { offset: usize },

    #[error("rendering produced no text")]
    Empty,

    #[error("invalid rendering pattern: {0}")]
    Pattern(String),
}

struct Patterns {
    line_break: Regex,
    list_item: Regex,
    block_start: Regex,
    block_end: Regex,
    tag: Regex,
    entity: Regex,
    blank_lines: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        let insensitive = |pattern: &str| RegexBuilder::new(pattern).case_insensitive(true).build();

        Ok(Self {
            line_break: insensitive(r"<br\s*/?>")?,
            list_item: insensitive(r"<li(?:\s[^>]*)?>")?,
            block_start: insensitive(r"<(?:ul|ol|pre|blockquote|h[1-6])(?:\s[^>]*)?>")?,
            block_end: insensitive(r"</(?:p|div|ul|ol|pre|blockquote|h[1-6])\s*>")?,
            tag: Regex::new(r"<[^>]*>")?,
            entity: Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);")?,
            blank_lines: Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+")?,
        })
    }
}

static PATTERNS: OnceLock<Result<Patterns, regex::Error>> = OnceLock::new();

fn patterns() -> Result<&'static Patterns, RenderError> {
    PATTERNS
        .get_or_init(Patterns::compile)
        .as_ref()
        .map_err(|e| RenderError::Pattern(e.to_string()))
}

/// Render post HTML as plain text.
///
/// Line breaks become newlines. Block elements (paragraphs, divs, lists,
/// headings, quotes, preformatted text) are separated by blank lines and each
/// list item starts a `* ` line. Links render as their text and every other
/// tag is dropped. Common entities are decoded last so escaped markup
/// survives as text.
pub fn render_plain_text(html: &str) -> Result<String, RenderError> {
    check_tags_terminated(html)?;
    let patterns = patterns()?;

    let text = html.replace("\r\n", "\n");
    let text = patterns.line_break.replace_all(&text, "\n");
    let text = patterns.list_item.replace_all(&text, "\n* ");
    let text = patterns.block_start.replace_all(&text, "\n\n");
    let text = patterns.block_end.replace_all(&text, "\n\n");
    let text = patterns.tag.replace_all(&text, "");
    let text = patterns
        .entity
        .replace_all(&text, |caps: &Captures| decode_entity(&caps[0], &caps[1]));
    let text = patterns.blank_lines.replace_all(&text, "\n\n");
    let text = text.trim();

    if text.is_empty() && !html.trim().is_empty() {
        return Err(RenderError::Empty);
    }
    Ok(text.to_string())
}

fn check_tags_terminated(html: &str) -> Result<(), RenderError> {
    let mut rest = html;
    let mut offset = 0;

    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        match after.find(['<', '>']) {
            Some(close) if after.as_bytes()[close] == b'>' => {
                let consumed = open + 1 + close + 1;
                offset += consumed;
                rest = &rest[consumed..];
            }
            _ => {
                return Err(RenderError::UnterminatedTag {
                    offset: offset + open,
                })
            }
        }
    }

    Ok(())
}

fn decode_entity(whole: &str, name: &str) -> String {
    let decoded = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse().ok()
            } else {
                None
            };
            // NUL is left encoded, like surrogates.
            code.filter(|&c| c != 0).and_then(char::from_u32)
        }
    };

    decoded.map_or_else(|| whole.to_string(), String::from)
}

/// Turns a source post into destination text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTransformer;

impl ContentTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Produce the text to publish for `post`.
    ///
    /// Replies and posts with attachments are rejected. Rendering failures are
    /// not errors: the raw content is returned instead.
    pub fn transform(&self, post: &Post) -> Result<String, UnsupportedPost> {
        if post.is_reply() {
            return Err(UnsupportedPost::Reply);
        }
        if post.has_attachments() {
            return Err(UnsupportedPost::Attachments);
        }

        match render_plain_text(&post.content) {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::debug!(post = %post.id, error = %e, "rendering failed, using raw content");
                Ok(post.content.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use vbc_core::PostId;

    fn post(content: &str) -> Post {
        Post {
            id: PostId(1),
            created_at: Utc::now(),
            content: content.to_string(),
            url: None,
            in_reply_to: None,
            attachment_count: 0,
        }
    }

    #[test]
    fn test_paragraphs_and_line_breaks() {
        let html = "<p>Hello &amp; welcome</p><p>Line one<br>Line two<BR /></p>";
        assert_eq!(
            render_plain_text(html).unwrap(),
            "Hello & welcome\n\nLine one\nLine two"
        );
    }

    #[test]
    fn test_links_render_as_text() {
        let html = concat!(
            r#"<p>see <a href="https://example.org/a" rel="nofollow noopener">"#,
            r#"<span class="invisible">https://</span><span class="">example.org/a</span>"#,
            r#"<span class="invisible"></span></a></p>"#
        );
        assert_eq!(render_plain_text(html).unwrap(), "see https://example.org/a");
    }

    #[test]
    fn test_entities() {
        assert_eq!(
            render_plain_text("&lt;b&gt; &quot;q&quot; it&#39;s &apos;x&apos; a&nbsp;b").unwrap(),
            "<b> \"q\" it's 'x' a b"
        );
        assert_eq!(render_plain_text("caf&#233; &#x1F600;").unwrap(), "café 😀");
        assert_eq!(render_plain_text("&bogus; &#xFFFFFF;").unwrap(), "&bogus; &#xFFFFFF;");
        assert_eq!(render_plain_text("a&#0;b &#x0;").unwrap(), "a&#0;b &#x0;");
        assert_eq!(render_plain_text("&#xD800;").unwrap(), "&#xD800;");
    }

    #[test]
    fn test_blank_lines_collapse() {
        let html = "<div>a</div>\n\n\n<div>b</div>";
        assert_eq!(render_plain_text(html).unwrap(), "a\n\nb");
    }

    #[test]
    fn test_lists() {
        let html = "<p>todo:</p><ul><li>milk</li><li>eggs</li></ul>";
        assert_eq!(render_plain_text(html).unwrap(), "todo:\n\n* milk\n* eggs");

        let html = "<ol start=\"2\"><li>one</li><LI class=\"x\">two</LI></ol><p>after</p>";
        assert_eq!(render_plain_text(html).unwrap(), "* one\n* two\n\nafter");
    }

    #[test]
    fn test_headings() {
        for level in 1..=6 {
            let html = format!("<h{0}>Title</h{0}><p>body</p>", level);
            assert_eq!(render_plain_text(&html).unwrap(), "Title\n\nbody");
        }
    }

    #[test]
    fn test_blockquote() {
        let html = "<h1>Title</h1><blockquote>quoted</blockquote><p>body</p>";
        assert_eq!(render_plain_text(html).unwrap(), "Title\n\nquoted\n\nbody");

        let html = "<p>intro</p><blockquote><p>quoted</p></blockquote>outro";
        assert_eq!(render_plain_text(html).unwrap(), "intro\n\nquoted\n\noutro");
    }

    #[test]
    fn test_preformatted() {
        let html = "<p>run:</p><pre><code>cargo fmt\ncargo test</code></pre><p>done</p>";
        assert_eq!(
            render_plain_text(html).unwrap(),
            "run:\n\ncargo fmt\ncargo test\n\ndone"
        );
    }

    #[test]
    fn test_similar_tag_names_not_blocks() {
        assert_eq!(render_plain_text("a<hr>b<preview>c</preview>").unwrap(), "abc");
    }

    #[test]
    fn test_render_errors() {
        assert_eq!(
            render_plain_text("<p>fine</p><a href=\"x\""),
            Err(RenderError::UnterminatedTag { offset: 11 })
        );
        assert_eq!(
            render_plain_text("a < b <i>c</i>"),
            Err(RenderError::UnterminatedTag { offset: 2 })
        );
        assert_eq!(render_plain_text("<p></p>"), Err(RenderError::Empty));
        assert_eq!(render_plain_text("").unwrap(), "");
    }

    proptest! {
        #[test]
        fn prop_plain_text_unchanged(text in "[a-zA-Z0-9 .,!?']{0,64}") {
            prop_assert_eq!(render_plain_text(&text).unwrap(), text.trim());
        }

        #[test]
        fn prop_render_never_leaves_tags(words in prop::collection::vec("[a-z]{1,8}", 1..6)) {
            let html = format!("<p>{}</p>", words.join("<br>"));
            let text = render_plain_text(&html).unwrap();
            prop_assert!(!text.contains('<'));
            prop_assert_eq!(text, words.join("\n"));
        }
    }

    #[test]
    fn test_transform_renders() {
        let transformer = ContentTransformer::new();
        assert_eq!(
            transformer.transform(&post("<p>just text</p>")).unwrap(),
            "just text"
        );
    }

    #[test]
    fn test_transform_falls_back_to_raw() {
        let transformer = ContentTransformer::new();
        assert_eq!(transformer.transform(&post("a <b")).unwrap(), "a <b");
        assert_eq!(transformer.transform(&post("<br>")).unwrap(), "<br>");
    }

    #[test]
    fn test_transform_rejects_reply() {
        let mut reply = post("<p>@someone hi</p>");
        reply.in_reply_to = Some(PostId(0));
        assert_eq!(
            ContentTransformer::new().transform(&reply),
            Err(UnsupportedPost::Reply)
        );
    }

    #[test]
    fn test_transform_rejects_attachments() {
        let mut media = post("<p>look</p>");
        media.attachment_count = 2;
        assert_eq!(
            ContentTransformer::new().transform(&media),
            Err(UnsupportedPost::Attachments)
        );
    }
}
