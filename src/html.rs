//! HTML post-processing: title detection, table-of-contents extraction,
//! body and link harvesting.
//!
//! The converter hands back a full HTML document; this module turns it into
//! the pieces templates need. The interesting part is the heading index:
//! `h1`/`h2`/`h3` elements are scanned in document order and folded into a
//! tree whose depth mirrors heading level. A heading that skips a level
//! (an `h3` directly after an `h1`) gets a synthetic "no title" placeholder
//! at the missing level, so the serialized list nesting is always
//! well-formed no matter how sloppy the document's heading sequence is.
//!
//! Tree construction uses an iterative cursor descent along each level's
//! last child — no recursion, so the placeholder logic is a plain loop that
//! can be tested in isolation.

use tl::ParserOptions;

/// Title and serialized table of contents extracted from one document.
#[derive(Debug, Clone, Default)]
pub struct HeadingIndex {
    pub title: String,
    pub toc: String,
}

/// One node of the heading tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingNode {
    /// `id` attribute of the heading element, if present.
    pub anchor: Option<String>,
    pub text: String,
    pub children: Vec<HeadingNode>,
}

/// Label used for synthetic nodes filling a skipped heading level.
pub const PLACEHOLDER_TEXT: &str = "no title";

impl HeadingNode {
    fn new(anchor: Option<String>, text: String) -> Self {
        Self {
            anchor,
            text,
            children: Vec::new(),
        }
    }

    fn placeholder() -> Self {
        Self::new(None, PLACEHOLDER_TEXT.to_string())
    }

    pub fn is_placeholder(&self) -> bool {
        self.anchor.is_none() && self.text == PLACEHOLDER_TEXT
    }
}

fn attr(tag: &tl::HTMLTag, name: &str) -> Option<String> {
    for (key, value) in tag.attributes().iter() {
        if key.as_ref() == name {
            return value.map(|v| v.to_string());
        }
    }
    None
}

fn heading_level(name: &str) -> Option<usize> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        _ => None,
    }
}

/// Extract title and TOC in one pass.
pub fn index(html: &str) -> HeadingIndex {
    HeadingIndex {
        title: title(html),
        toc: render_toc(&heading_tree(html)),
    }
}

/// Page title: explicit `<title>` first, then the first non-empty `h1`,
/// then the first non-empty `h2`.
pub fn title(html: &str) -> String {
    let Ok(dom) = tl::parse(html, ParserOptions::default()) else {
        return String::new();
    };
    let parser = dom.parser();

    let mut first_h1 = None;
    let mut first_h2 = None;
    for node in dom.nodes() {
        let Some(tag) = node.as_tag() else { continue };
        let name = tag.name().as_utf8_str().to_lowercase();
        let text = tag.inner_text(parser).trim().to_string();
        if text.is_empty() {
            continue;
        }
        match name.as_str() {
            "title" => return text,
            "h1" if first_h1.is_none() => first_h1 = Some(text),
            "h2" if first_h2.is_none() => first_h2 = Some(text),
            _ => {}
        }
    }
    first_h1.or(first_h2).unwrap_or_default()
}

/// Build the heading tree from `h1`/`h2`/`h3` elements in document order.
pub fn heading_tree(html: &str) -> Vec<HeadingNode> {
    let Ok(dom) = tl::parse(html, ParserOptions::default()) else {
        return Vec::new();
    };
    let parser = dom.parser();

    let mut roots: Vec<HeadingNode> = Vec::new();
    for node in dom.nodes() {
        let Some(tag) = node.as_tag() else { continue };
        let name = tag.name().as_utf8_str().to_lowercase();
        let Some(level) = heading_level(&name) else {
            continue;
        };
        let anchor = attr(tag, "id");
        let text = tag.inner_text(parser).trim().to_string();

        // descend level-1 steps along each tier's last child, creating a
        // placeholder wherever a tier has no node to descend into
        let mut children = &mut roots;
        for _ in 1..level {
            if children.is_empty() {
                children.push(HeadingNode::placeholder());
            }
            let last = children.len() - 1;
            children = &mut children[last].children;
        }
        children.push(HeadingNode::new(anchor, text));
    }
    roots
}

/// Serialize a heading tree as nested list markup.
pub fn render_toc(nodes: &[HeadingNode]) -> String {
    if nodes.is_empty() {
        return String::new();
    }
    let mut out = String::from("<ul class=\"toc\">");
    render_nodes(nodes, &mut out);
    out.push_str("</ul>");
    out
}

fn render_nodes(nodes: &[HeadingNode], out: &mut String) {
    for node in nodes {
        out.push_str("<li>");
        // heading text comes out of the parsed document still in source
        // form (entities intact), so it embeds verbatim; only the anchor
        // needs attribute escaping
        match &node.anchor {
            Some(anchor) => {
                out.push_str("<a href=\"#");
                out.push_str(&escape(anchor));
                out.push_str("\">");
                out.push_str(&node.text);
                out.push_str("</a>");
            }
            None => out.push_str(&node.text),
        }
        if !node.children.is_empty() {
            out.push_str("<ul>");
            render_nodes(&node.children, out);
            out.push_str("</ul>");
        }
        out.push_str("</li>");
    }
}

/// Inner HTML of the `<body>` element, or the whole fragment when the
/// converter produced no enclosing document.
pub fn extract_body(html: &str) -> String {
    let Ok(dom) = tl::parse(html, ParserOptions::default()) else {
        return html.to_string();
    };
    let parser = dom.parser();

    for node in dom.nodes() {
        if let Some(tag) = node.as_tag()
            && tag.name().as_utf8_str().eq_ignore_ascii_case("body")
        {
            return tag.inner_html(parser).to_string();
        }
    }
    html.to_string()
}

/// All `href` targets of anchor elements, in document order.
pub fn extract_links(html: &str) -> Vec<String> {
    let Ok(dom) = tl::parse(html, ParserOptions::default()) else {
        return Vec::new();
    };

    let mut links = Vec::new();
    for node in dom.nodes() {
        if let Some(tag) = node.as_tag()
            && tag.name().as_utf8_str().eq_ignore_ascii_case("a")
            && let Some(href) = attr(tag, "href")
        {
            links.push(href);
        }
    }
    links
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
