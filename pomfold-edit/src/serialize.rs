//! Deterministic pretty printer.
//!
//! Output rules:
//! - a fixed `<?xml ...?>` declaration on the first line;
//! - four spaces per nesting level, one node per line;
//! - elements holding only text render inline, empty elements self-close;
//! - attributes keep document order;
//! - no blank lines, and a single trailing newline.
//!
//! Re-serializing a parsed serialization yields the same bytes, so an
//! unchanged run can be checked with a plain diff.

use crate::document::{Document, Element, Node};
use quick_xml::escape::{escape, partial_escape};

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
pub const INDENT: &str = "    ";

pub fn to_pretty_string(doc: &Document) -> String {
    let mut out = String::new();
    out.push_str(XML_DECLARATION);
    out.push('\n');

    for node in doc.prolog() {
        write_node(&mut out, node, 0);
    }
    write_element(&mut out, doc.root(), 0);
    for node in doc.epilog() {
        write_node(&mut out, node, 0);
    }

    let mut cleaned = out
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    cleaned.push('\n');
    cleaned
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    match node {
        Node::Element(e) => write_element(out, e, depth),
        Node::Text(t) => {
            let t = t.trim();
            if !t.is_empty() {
                push_line(out, depth, &partial_escape(t));
            }
        }
        Node::CData(t) => push_line(out, depth, &format!("<![CDATA[{t}]]>")),
        Node::Comment(c) => push_line(out, depth, &format!("<!--{c}-->")),
        Node::ProcessingInstruction(p) => push_line(out, depth, &format!("<?{p}?>")),
        Node::DocType(d) => push_line(out, depth, &format!("<!DOCTYPE {d}>")),
    }
}

fn write_element(out: &mut String, el: &Element, depth: usize) {
    let children = el.children();

    if children.is_empty() {
        let mut line = open_tag(el);
        line.insert(line.len() - 1, '/');
        push_line(out, depth, &line);
        return;
    }

    if is_text_only(el) {
        let mut line = open_tag(el);
        write_inline_children(&mut line, children);
        line.push_str(&close_tag(el));
        push_line(out, depth, &line);
        return;
    }

    push_line(out, depth, &open_tag(el));
    for child in children {
        write_node(out, child, depth + 1);
    }
    push_line(out, depth, &close_tag(el));
}

/// Single-line form used when an element is turned into a comment.
pub(crate) fn write_compact(out: &mut String, el: &Element) {
    if el.children().is_empty() {
        let mut tag = open_tag(el);
        tag.insert(tag.len() - 1, '/');
        out.push_str(&tag);
        return;
    }
    out.push_str(&open_tag(el));
    write_inline_children(out, el.children());
    out.push_str(&close_tag(el));
}

fn write_inline_children(out: &mut String, children: &[Node]) {
    for child in children {
        match child {
            Node::Element(e) => write_compact(out, e),
            Node::Text(t) => out.push_str(&partial_escape(t.as_str())),
            Node::CData(t) => {
                out.push_str("<![CDATA[");
                out.push_str(t);
                out.push_str("]]>");
            }
            Node::Comment(c) => {
                out.push_str("<!--");
                out.push_str(c);
                out.push_str("-->");
            }
            Node::ProcessingInstruction(p) => {
                out.push_str("<?");
                out.push_str(p);
                out.push_str("?>");
            }
            Node::DocType(_) => {}
        }
    }
}

fn is_text_only(el: &Element) -> bool {
    el.children()
        .iter()
        .all(|n| matches!(n, Node::Text(_) | Node::CData(_)))
}

fn open_tag(el: &Element) -> String {
    let mut tag = String::with_capacity(el.name().len() + 2);
    tag.push('<');
    tag.push_str(el.name());
    for (key, value) in el.attributes() {
        tag.push(' ');
        tag.push_str(key);
        tag.push_str("=\"");
        tag.push_str(&escape(value.as_str()));
        tag.push('"');
    }
    tag.push('>');
    tag
}

fn close_tag(el: &Element) -> String {
    format!("</{}>", el.name())
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(line);
    out.push('\n');
}
