use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, LocalName, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::cell::RefCell;

#[derive(Clone, Default, Debug)]
pub struct ExtractedText {
    pub title: String,
    pub body: String,
}

impl ExtractedText {
    /// Title and body joined the way they are fed to the LLM.
    pub fn readable(&self) -> String {
        let body = compress_whitespace(&self.body);
        match (self.title.trim(), body.is_empty()) {
            ("", _) => body,
            (title, true) => title.to_string(),
            (title, false) => format!("# {title}\n\n{body}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Copy)]
pub enum Context {
    Title,
    Heading,
    Body,
}

/// Turns an HTML document into readable text, skipping scripts, styles and
/// page chrome (navigation, cookie banners, ads and the like).
///
/// html5ever is lenient, so any string parses; plain text comes back as-is.
#[derive(Debug, Default)]
pub struct HtmlTextExtractor;

impl HtmlTextExtractor {
    pub fn get_dom(html: &str) -> RcDom {
        parse_document(RcDom::default(), Default::default()).one(html)
    }

    pub fn extract(&self, html: &str) -> ExtractedText {
        let dom = Self::get_dom(html);
        let mut out = ExtractedText::default();
        Self::walk_html(&dom.document, Context::Body, &mut out);
        out
    }

    pub fn has_boilerplate_class_or_id(attrs: &RefCell<Vec<Attribute>>) -> bool {
        for attr in attrs.borrow().iter() {
            let name = &*attr.name.local;
            if name != "class" && name != "id" && name != "role" {
                continue;
            }
            let v = attr.value.to_lowercase();
            if v.contains("nav")
                || v.contains("menu")
                || v.contains("sidebar")
                || v.contains("footer")
                || v.contains("cookie")
                || v.contains("banner")
                || v.contains("promo")
                || v.split(|c: char| !c.is_alphanumeric()).any(|w| w == "ads" || w == "ad")
            {
                return true;
            }
        }

        false
    }

    pub fn is_block_like(local: &LocalName) -> bool {
        matches!(
            &**local,
            "p" | "div"
                | "section"
                | "article"
                | "main"
                | "li"
                | "ul"
                | "ol"
                | "table"
                | "tr"
                | "br"
                | "blockquote"
                | "pre"
        )
    }

    /// Page roots whose classes describe layout (`has-sidebar`, `menu-open`),
    /// never boilerplate to drop wholesale.
    fn is_structural(local: &LocalName) -> bool {
        matches!(&**local, "html" | "body" | "main" | "article")
    }

    fn is_skipped(local: &LocalName) -> bool {
        matches!(
            &**local,
            "script" | "style" | "noscript" | "template" | "svg" | "nav" | "footer" | "iframe"
        )
    }

    pub fn walk_html(handle: &Handle, ctx: Context, out: &mut ExtractedText) {
        let node = handle;
        match &node.data {
            NodeData::Text { contents } => {
                let s = contents.borrow();
                let s = s.trim();
                if s.is_empty() {
                    return;
                }

                match ctx {
                    Context::Title => {
                        if !out.title.is_empty() {
                            out.title.push(' ');
                        }
                        out.title.push_str(s);
                    }
                    Context::Heading | Context::Body => Self::push_body(out, s),
                }
            }
            NodeData::Element { name, attrs, .. } => {
                let local = &name.local;

                if Self::is_skipped(local)
                    || (!Self::is_structural(local) && Self::has_boilerplate_class_or_id(attrs))
                {
                    return;
                }

                let new_ctx = if &**local == "title" {
                    Context::Title
                } else if matches!(&**local, "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
                    if !out.body.is_empty() && !out.body.ends_with('\n') {
                        out.body.push('\n');
                    }
                    Context::Heading
                } else if ctx == Context::Title {
                    Context::Body
                } else {
                    ctx
                };

                if new_ctx == Context::Body && Self::is_block_like(local) {
                    if !out.body.is_empty() && !out.body.ends_with('\n') {
                        out.body.push('\n');
                    }
                }

                for child in node.children.borrow().iter() {
                    Self::walk_html(child, new_ctx, out);
                }

                if new_ctx == Context::Heading && ctx != Context::Heading {
                    out.body.push('\n');
                }
            }
            _ => {
                for child in node.children.borrow().iter() {
                    Self::walk_html(child, ctx, out);
                }
            }
        }
    }

    fn push_body(out: &mut ExtractedText, s: &str) {
        if !out.body.is_empty() && !out.body.ends_with(' ') && !out.body.ends_with('\n') {
            out.body.push(' ');
        }
        out.body.push_str(s);
    }
}

/// Trims every line and collapses runs of blank lines into one.
pub fn compress_whitespace(text: &str) -> String {
    let mut result: Vec<&str> = Vec::new();
    let mut last_was_blank = true;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !last_was_blank {
                result.push("");
                last_was_blank = true;
            }
        } else {
            result.push(trimmed);
            last_was_blank = false;
        }
    }
    while result.last() == Some(&"") {
        result.pop();
    }
    result.join("\n")
}

/// Cuts `s` to at most `max` chars.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
