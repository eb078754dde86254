//! Lexical rich-text to HTML.
//!
//! Walks the serialized editor state, emits HTML for the node types editors
//! can produce, then runs the result through an ammonia allow-list.

use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use serde_json::Value;

use crate::domain::pages::RichText;

const FORMAT_BOLD: u64 = 1;
const FORMAT_ITALIC: u64 = 1 << 1;
const FORMAT_STRIKETHROUGH: u64 = 1 << 2;
const FORMAT_UNDERLINE: u64 = 1 << 3;
const FORMAT_CODE: u64 = 1 << 4;
const FORMAT_SUBSCRIPT: u64 = 1 << 5;
const FORMAT_SUPERSCRIPT: u64 = 1 << 6;

/// Innermost tag first.
const TEXT_FORMATS: [(u64, &str); 7] = [
    (FORMAT_CODE, "code"),
    (FORMAT_BOLD, "strong"),
    (FORMAT_ITALIC, "em"),
    (FORMAT_STRIKETHROUGH, "s"),
    (FORMAT_UNDERLINE, "u"),
    (FORMAT_SUBSCRIPT, "sub"),
    (FORMAT_SUPERSCRIPT, "sup"),
];

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

pub struct RichTextRenderer {
    sanitizer: AmmoniaBuilder<'static>,
}

impl Default for RichTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RichTextRenderer {
    pub fn new() -> Self {
        Self {
            sanitizer: build_sanitizer(),
        }
    }

    /// Render editor state to sanitized HTML. Malformed state renders as
    /// whatever could be understood, possibly nothing.
    pub fn render(&self, rich_text: &RichText) -> String {
        let root = rich_text.0.get("root").unwrap_or(&rich_text.0);
        let mut html = String::new();
        render_children(root, &mut html);
        self.sanitizer.clean(&html).to_string()
    }
}

fn build_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();
    builder.tags(HashSet::from([
        "a",
        "blockquote",
        "br",
        "code",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "li",
        "ol",
        "p",
        "s",
        "strong",
        "sub",
        "sup",
        "u",
        "ul",
    ]));
    builder.add_tag_attributes("a", &["target"]);
    builder
}

fn render_children(node: &Value, out: &mut String) {
    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            render_node(child, out);
        }
    }
}

fn render_node(node: &Value, out: &mut String) {
    let kind = node.get("type").and_then(Value::as_str).unwrap_or_default();

    match kind {
        "text" => render_text(node, out),
        "linebreak" => out.push_str("<br>"),
        "tab" => out.push('\t'),
        "horizontalrule" => out.push_str("<hr>"),
        "paragraph" => wrap(node, "p", out),
        "quote" => wrap(node, "blockquote", out),
        "listitem" => wrap(node, "li", out),
        "heading" => {
            let tag = node
                .get("tag")
                .and_then(Value::as_str)
                .filter(|tag| HEADING_TAGS.contains(tag))
                .unwrap_or("h2");
            wrap(node, tag, out);
        }
        "list" => {
            let ordered = node.get("listType").and_then(Value::as_str) == Some("number")
                || node.get("tag").and_then(Value::as_str) == Some("ol");
            wrap(node, if ordered { "ol" } else { "ul" }, out);
        }
        "link" | "autolink" => render_link(node, out),
        _ => render_children(node, out),
    }
}

fn wrap(node: &Value, tag: &str, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    render_children(node, out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn render_text(node: &Value, out: &mut String) {
    let text = node.get("text").and_then(Value::as_str).unwrap_or_default();
    if text.is_empty() {
        return;
    }
    let format = node.get("format").and_then(Value::as_u64).unwrap_or(0);

    let active: Vec<&str> = TEXT_FORMATS
        .iter()
        .filter(|(bit, _)| format & bit != 0)
        .map(|(_, tag)| *tag)
        .collect();

    for tag in active.iter().rev() {
        out.push_str(&format!("<{tag}>"));
    }
    out.push_str(&ammonia::clean_text(text));
    for tag in &active {
        out.push_str(&format!("</{tag}>"));
    }
}

fn render_link(node: &Value, out: &mut String) {
    let fields = node.get("fields").unwrap_or(node);
    let Some(href) = link_href(fields) else {
        render_children(node, out);
        return;
    };

    out.push_str(&format!("<a href=\"{}\"", ammonia::clean_text(&href)));
    if fields.get("newTab").and_then(Value::as_bool).unwrap_or(false) {
        out.push_str(" target=\"_blank\"");
    }
    out.push('>');
    render_children(node, out);
    out.push_str("</a>");
}

/// Internal links point at a populated document; custom links carry a url.
fn link_href(fields: &Value) -> Option<String> {
    if fields.get("linkType").and_then(Value::as_str) == Some("internal")
        && let Some(doc) = fields.get("doc")
        && let Some(slug) = doc
            .pointer("/value/slug")
            .and_then(Value::as_str)
            .filter(|slug| !slug.is_empty())
    {
        let collection = doc.get("relationTo").and_then(Value::as_str).unwrap_or("pages");
        return Some(if collection == "pages" {
            format!("/{slug}")
        } else {
            format!("/{collection}/{slug}")
        });
    }

    fields
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn render(root: Value) -> String {
        RichTextRenderer::new().render(&RichText(json!({ "root": root })))
    }

    fn text(value: &str, format: u64) -> Value {
        json!({ "type": "text", "text": value, "format": format })
    }

    #[test]
    fn paragraphs_and_formats() {
        let html = render(json!({
            "type": "root",
            "children": [{
                "type": "paragraph",
                "children": [text("Plain ", 0), text("bold", 1), text(" and ", 0), text("both", 3)]
            }]
        }));

        assert_eq!(
            html,
            "<p>Plain <strong>bold</strong> and <em><strong>both</strong></em></p>"
        );
    }

    #[test]
    fn headings_lists_and_quotes() {
        let html = render(json!({
            "children": [
                { "type": "heading", "tag": "h3", "children": [text("Title", 0)] },
                { "type": "heading", "tag": "script", "children": [text("Odd", 0)] },
                {
                    "type": "list",
                    "listType": "number",
                    "children": [
                        { "type": "listitem", "children": [text("one", 0)] },
                        { "type": "listitem", "children": [text("two", 0)] }
                    ]
                },
                { "type": "quote", "children": [text("quoted", 0)] }
            ]
        }));

        assert!(html.starts_with("<h3>Title</h3><h2>Odd</h2>"));
        assert!(html.contains("<ol><li>one</li><li>two</li></ol>"));
        assert!(html.ends_with("<blockquote>quoted</blockquote>"));
    }

    #[test]
    fn links_resolve_and_open_in_new_tab() {
        let html = render(json!({
            "children": [{
                "type": "paragraph",
                "children": [
                    {
                        "type": "link",
                        "fields": { "linkType": "custom", "url": "https://example.com", "newTab": true },
                        "children": [text("external", 0)]
                    },
                    {
                        "type": "link",
                        "fields": {
                            "linkType": "internal",
                            "doc": { "relationTo": "products", "value": { "id": 1, "slug": "vase-1" } }
                        },
                        "children": [text("vase", 0)]
                    }
                ]
            }]
        }));

        assert!(html.contains("href=\"https://example.com\""));
        assert!(html.contains("target=\"_blank\""));
        assert!(html.contains("href=\"/products/vase-1\""));
    }

    #[test]
    fn text_is_escaped_and_scripts_removed() {
        let html = render(json!({
            "children": [{
                "type": "paragraph",
                "children": [text("<script>alert(1)</script>", 0)]
            }]
        }));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));

        let html = render(json!({
            "children": [{
                "type": "link",
                "fields": { "url": "javascript:alert(1)" },
                "children": [text("click", 0)]
            }]
        }));
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn unknown_nodes_render_their_children() {
        let html = render(json!({
            "children": [{ "type": "upload", "children": [text("caption", 0)] }, { "type": "linebreak" }]
        }));
        assert_eq!(html, "caption<br>");
    }

    #[test]
    fn empty_state_renders_nothing() {
        assert_eq!(RichTextRenderer::new().render(&RichText(json!(null))), "");
        assert_eq!(RichTextRenderer::new().render(&RichText(json!({ "root": {} }))), "");
    }
}
