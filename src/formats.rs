//! Single-file output formats: HTML, Markdown, and plain text.

use crate::encode::{validate_post, BookEncoder, EncodeError};
use crate::model::Post;
use scraper::Html;
use std::io::Write;

pub(crate) fn html_escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Strip HTML from a post body to plain text using scraper.
pub(crate) fn body_to_plain_text(body: &str) -> String {
    let fragment = Html::parse_fragment(body);
    let root = fragment.root_element();
    let text: String = root.text().collect();
    if text.trim().is_empty() {
        body.trim().to_string()
    } else {
        text.trim().to_string()
    }
}

fn io_error<'a>(
    format: &'static str,
    post: &'a Post,
) -> impl FnOnce(std::io::Error) -> EncodeError + 'a {
    move |e| EncodeError::Io {
        format,
        title: post.title.clone(),
        source: e,
    }
}

/// Standalone HTML page with the title as heading and the post body verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlEncoder;

impl HtmlEncoder {
    fn write(post: &Post, f: &mut impl Write) -> std::io::Result<()> {
        let title_esc = html_escape_attr(&post.title);

        writeln!(f, r#"<!DOCTYPE html>"#)?;
        writeln!(f, r#"<html lang="en">"#)?;
        writeln!(f, r#"<head>"#)?;
        writeln!(f, r#"  <meta charset="UTF-8"/>"#)?;
        writeln!(f, r#"  <title>{}</title>"#, title_esc)?;
        writeln!(f, r#"</head>"#)?;
        writeln!(f, r#"<body>"#)?;
        writeln!(f, r#"  <h1>{}</h1>"#, title_esc)?;
        writeln!(f, r#"  <article class="post-body">"#)?;
        f.write_all(post.html.as_bytes())?;
        writeln!(f)?;
        writeln!(f, r#"  </article>"#)?;
        writeln!(f, r#"</body>"#)?;
        writeln!(f, r#"</html>"#)?;
        Ok(())
    }
}

impl BookEncoder for HtmlEncoder {
    fn format(&self) -> &str {
        "html"
    }

    fn encode(&self, post: &Post, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        validate_post(post)?;
        Self::write(post, out).map_err(io_error("html", post))
    }
}

/// Markdown document: `# title` followed by the body converted with html2md.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownEncoder;

impl BookEncoder for MarkdownEncoder {
    fn format(&self) -> &str {
        "md"
    }

    fn encode(&self, post: &Post, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        validate_post(post)?;
        let md = html2md::parse_html(&post.html);
        write_markdown(&post.title, md.trim(), out).map_err(io_error("md", post))
    }
}

/// Plain text: title, an underline, then the body with all markup stripped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextEncoder;

impl BookEncoder for TextEncoder {
    fn format(&self) -> &str {
        "txt"
    }

    fn encode(&self, post: &Post, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        validate_post(post)?;
        let text = body_to_plain_text(&post.html);
        write_text(&post.title, &text, out).map_err(io_error("txt", post))
    }
}

fn write_markdown(title: &str, body: &str, f: &mut impl Write) -> std::io::Result<()> {
    writeln!(f, "# {}", title)?;
    writeln!(f)?;
    writeln!(f, "{}", body)
}

fn write_text(title: &str, body: &str, f: &mut impl Write) -> std::io::Result<()> {
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "=".repeat(title.chars().count()))?;
    writeln!(f)?;
    writeln!(f, "{}", body)
}
