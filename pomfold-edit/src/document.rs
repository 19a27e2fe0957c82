//! In-memory descriptor tree.
//!
//! The tree is deliberately small: elements, text, CDATA, comments and the
//! odd processing instruction. Element names are matched within the default
//! namespace only, so a prefixed `<ext:modules>` never answers to `modules`.
//! Whitespace-only text between elements is dropped on parse; the serializer
//! owns indentation.

use crate::error::SyntaxError;
use crate::serialize;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut el = Self::new(name);
        el.children.push(Node::Text(text.into()));
        el
    }

    /// Qualified name as written, prefix included.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when this element is `name` in the default namespace.
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name && !self.name.contains(':')
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.is_named(name))
    }

    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|n| match n {
            Node::Comment(c) => Some(c.as_str()),
            _ => None,
        })
    }

    /// Concatenated text and CDATA content, or `None` when there is none.
    pub fn text(&self) -> Option<String> {
        let mut out: Option<String> = None;
        for node in &self.children {
            if let Node::Text(t) | Node::CData(t) = node {
                out.get_or_insert_with(String::new).push_str(t);
            }
        }
        out
    }

    /// Replace all text and CDATA content with `text`, keeping child elements.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let first = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Text(_) | Node::CData(_)))
            .unwrap_or(0);
        self.children
            .retain(|n| !matches!(n, Node::Text(_) | Node::CData(_)));
        let at = first.min(self.children.len());
        self.children.insert(at, Node::Text(text.into()));
    }

    /// Text of the first child element called `name`.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.find_section(name).and_then(Element::text)
    }

    /// First child element called `name`; absence is not an error.
    pub fn find_section(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is_named(name))
    }

    pub fn find_section_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if e.is_named(name) => Some(e),
            _ => None,
        })
    }

    /// Existing child `name`, or a freshly appended empty one.
    pub fn ensure_section(&mut self, name: &str) -> &mut Element {
        let idx = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.is_named(name)));
        match idx {
            Some(i) => self.element_at_mut(i),
            None => self.append_element(Element::new(name)),
        }
    }

    /// Drop every child called `name` and append exactly one empty replacement.
    pub fn replace_collection(&mut self, name: &str) -> &mut Element {
        self.children
            .retain(|n| !matches!(n, Node::Element(e) if e.is_named(name)));
        self.append_element(Element::new(name))
    }

    /// Append a leaf element `<name>text</name>`.
    pub fn append_child(&mut self, name: &str, text: &str) -> &mut Element {
        self.append_element(Element::with_text(name, text))
    }

    pub fn append_element(&mut self, element: Element) -> &mut Element {
        self.children.push(Node::Element(element));
        let last = self.children.len() - 1;
        self.element_at_mut(last)
    }

    pub fn append_comment(&mut self, text: impl Into<String>) {
        self.children.push(Node::Comment(text.into()));
    }

    /// First child element satisfying `pred`.
    pub fn find_child_mut(&mut self, mut pred: impl FnMut(&Element) -> bool) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) if pred(e) => Some(e),
            _ => None,
        })
    }

    /// Remove the first child element satisfying `pred` and append a comment
    /// holding its compact textual form, e.g. `<module>c</module>`.
    ///
    /// Returns the comment text, or `None` when nothing matched.
    pub fn comment_out(&mut self, mut pred: impl FnMut(&Element) -> bool) -> Option<String> {
        let idx = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if pred(e)))?;
        let removed = match self.children.remove(idx) {
            Node::Element(e) => e,
            _ => unreachable!("position matched an element"),
        };
        let comment = comment_safe(&removed.to_compact_string());
        self.children.push(Node::Comment(comment.clone()));
        Some(comment)
    }

    /// Single-line rendering without indentation.
    pub fn to_compact_string(&self) -> String {
        let mut out = String::new();
        serialize::write_compact(&mut out, self);
        out
    }

    fn element_at_mut(&mut self, idx: usize) -> &mut Element {
        match &mut self.children[idx] {
            Node::Element(e) => e,
            _ => unreachable!("index {idx} is not an element"),
        }
    }
}

/// `--` may not appear inside a comment, nor may it end in `-`.
fn comment_safe(text: &str) -> String {
    let mut out = text.to_string();
    while out.contains("--") {
        out = out.replace("--", "- -");
    }
    if out.ends_with('-') {
        out.push(' ');
    }
    out
}

/// A parsed descriptor: the root element plus whatever surrounds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    prolog: Vec<Node>,
    root: Element,
    epilog: Vec<Node>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    pub fn parse(text: &str) -> Result<Self, SyntaxError> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut prolog: Vec<Node> = Vec::new();
        let mut epilog: Vec<Node> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let pos = reader.buffer_position() as u64;
            let event = reader
                .read_event()
                .map_err(|e| SyntaxError::at(e.to_string(), reader.buffer_position() as u64))?;

            match event {
                Event::Start(e) => stack.push(start_element(&e, pos)?),
                Event::Empty(e) => {
                    let el = start_element(&e, pos)?;
                    close_element(el, &mut stack, &mut root, pos)?;
                }
                Event::End(_) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| SyntaxError::at("closing tag without an open element", pos))?;
                    close_element(el, &mut stack, &mut root, pos)?;
                }
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| SyntaxError::at(format!("bad text content: {e}"), pos))?;
                    if text.trim().is_empty() && stack.is_empty() {
                        continue;
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Text(text.into_owned())),
                        None => return Err(SyntaxError::at("text outside the root element", pos)),
                    }
                }
                Event::CData(c) => {
                    let text = utf8(&c, pos)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::CData(text)),
                        None => return Err(SyntaxError::at("CDATA outside the root element", pos)),
                    }
                }
                Event::Comment(c) => {
                    let node = Node::Comment(utf8(&c, pos)?);
                    push_misc(node, &mut stack, &root, &mut prolog, &mut epilog);
                }
                Event::PI(p) => {
                    let node = Node::ProcessingInstruction(utf8(&p, pos)?);
                    push_misc(node, &mut stack, &root, &mut prolog, &mut epilog);
                }
                Event::DocType(d) => {
                    if root.is_some() || !stack.is_empty() {
                        return Err(SyntaxError::at("DOCTYPE after the root element", pos));
                    }
                    prolog.push(Node::DocType(utf8(&d, pos)?.trim().to_string()));
                }
                Event::Decl(_) => {}
                Event::Eof => break,
            }
        }

        if let Some(open) = stack.last() {
            return Err(SyntaxError::new(format!("unclosed element <{}>", open.name)));
        }
        let root = root.ok_or_else(|| SyntaxError::new("document has no root element"))?;

        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    /// Parse a standalone element such as a `<plugin>` block.
    pub fn parse_fragment(text: &str) -> Result<Element, SyntaxError> {
        Document::parse(text).map(|doc| doc.root)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn prolog(&self) -> &[Node] {
        &self.prolog
    }

    pub fn epilog(&self) -> &[Node] {
        &self.epilog
    }

    /// Deterministic pretty-printed form; see [`serialize::to_pretty_string`].
    pub fn serialize(&self) -> String {
        serialize::to_pretty_string(self)
    }
}

fn start_element(e: &BytesStart<'_>, pos: u64) -> Result<Element, SyntaxError> {
    let name = utf8(e.name().as_ref(), pos)?;
    let mut el = Element::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| SyntaxError::at(format!("bad attribute: {err}"), pos))?;
        let key = utf8(attr.key.as_ref(), pos)?;
        let value = attr
            .unescape_value()
            .map_err(|err| SyntaxError::at(format!("bad attribute value for {key}: {err}"), pos))?;
        el.attributes.push((key, value.into_owned()));
    }
    Ok(el)
}

fn close_element(
    mut el: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
    pos: u64,
) -> Result<(), SyntaxError> {
    drop_indentation(&mut el);
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
        return Ok(());
    }
    if root.is_some() {
        return Err(SyntaxError::at(
            format!("second root element <{}>", el.name),
            pos,
        ));
    }
    *root = Some(el);
    Ok(())
}

/// Whitespace-only text is layout once an element holds anything besides text.
/// A leaf keeps it as content, so `<argLine> </argLine>` survives.
fn drop_indentation(el: &mut Element) {
    let mixed = el.children.iter().any(|n| !matches!(n, Node::Text(_)));
    if mixed {
        el.children
            .retain(|n| !matches!(n, Node::Text(t) if t.trim().is_empty()));
    }
}

fn push_misc(
    node: Node,
    stack: &mut [Element],
    root: &Option<Element>,
    prolog: &mut Vec<Node>,
    epilog: &mut Vec<Node>,
) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_some() => epilog.push(node),
        None => prolog.push(node),
    }
}

fn utf8(bytes: &[u8], pos: u64) -> Result<String, SyntaxError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| SyntaxError::at(format!("invalid UTF-8: {e}"), pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modules(doc: &Document) -> Vec<String> {
        doc.root()
            .find_section("modules")
            .map(|m| m.elements_named("module").filter_map(Element::text).collect())
            .unwrap_or_default()
    }

    #[test]
    fn parses_nested_elements_and_attributes() {
        let doc = Document::parse(
            r#"<?xml version="1.0"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <modules>
        <module>a</module>
        <module>b</module>
    </modules>
</project>"#,
        )
        .unwrap();

        assert_eq!(doc.root().name(), "project");
        assert_eq!(
            doc.root().attribute("xmlns"),
            Some("http://maven.apache.org/POM/4.0.0")
        );
        assert_eq!(modules(&doc), vec!["a", "b"]);
    }

    #[test]
    fn find_section_ignores_prefixed_elements() {
        let doc = Document::parse(r#"<project xmlns:x="urn:x"><x:modules/></project>"#).unwrap();
        assert!(doc.root().find_section("modules").is_none());
    }

    #[test]
    fn rejects_unbalanced_tags() {
        assert!(Document::parse("<project><modules></project>").is_err());
        assert!(Document::parse("<project>").is_err());
    }

    #[test]
    fn rejects_missing_or_duplicate_roots() {
        assert!(Document::parse("").is_err());
        assert!(Document::parse("<!-- only a comment -->").is_err());
        assert!(Document::parse("<a/><b/>").is_err());
        assert!(Document::parse("stray<a/>").is_err());
    }

    #[test]
    fn ensure_section_is_stable() {
        let mut root = Element::new("project");
        root.ensure_section("build").ensure_section("plugins");
        root.ensure_section("build").ensure_section("plugins");
        assert_eq!(root.elements_named("build").count(), 1);
        let build = root.find_section("build").unwrap();
        assert_eq!(build.elements_named("plugins").count(), 1);
    }

    #[test]
    fn replace_collection_collapses_duplicates() {
        let mut doc = Document::parse(
            "<project><modules><module>a</module></modules><name>x</name><modules><module>b</module></modules></project>",
        )
        .unwrap();
        doc.root_mut().replace_collection("modules");
        assert_eq!(doc.root().elements_named("modules").count(), 1);
        assert!(modules(&doc).is_empty());
        assert_eq!(doc.root().child_text("name").as_deref(), Some("x"));
        assert!(matches!(doc.root().children().last(), Some(Node::Element(e)) if e.is_named("modules")));
    }

    #[test]
    fn comment_out_keeps_original_form() {
        let mut doc = Document::parse(
            "<project><modules><module>a</module><module>c</module></modules></project>",
        )
        .unwrap();
        let modules_el = doc.root_mut().find_section_mut("modules").unwrap();
        let comment = modules_el
            .comment_out(|e| e.is_named("module") && e.text().as_deref() == Some("c"))
            .unwrap();
        assert_eq!(comment, "<module>c</module>");
        assert_eq!(modules_el.comments().collect::<Vec<_>>(), vec!["<module>c</module>"]);
        assert_eq!(modules(&doc), vec!["a"]);
    }

    #[test]
    fn comment_out_without_match_is_none() {
        let mut root = Element::new("modules");
        root.append_child("module", "a");
        assert!(root.comment_out(|e| e.text().as_deref() == Some("zzz")).is_none());
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn comment_safe_removes_double_hyphens() {
        assert_eq!(comment_safe("<module>a--b</module>"), "<module>a- -b</module>");
        assert_eq!(comment_safe("x-"), "x- ");
        assert!(!comment_safe("a---b").contains("--"));
    }

    #[test]
    fn set_text_replaces_existing_text() {
        let mut el = Element::with_text("module", "b");
        el.set_text("b/x");
        assert_eq!(el.text().as_deref(), Some("b/x"));
        assert_eq!(el.children().len(), 1);
    }

    #[test]
    fn unescapes_entities_in_text_and_attributes() {
        let doc = Document::parse(r#"<a k="x &amp; y"><b>1 &lt; 2</b></a>"#).unwrap();
        assert_eq!(doc.root().attribute("k"), Some("x & y"));
        assert_eq!(doc.root().child_text("b").as_deref(), Some("1 < 2"));
    }

    #[test]
    fn keeps_prolog_and_epilog_comments() {
        let doc = Document::parse("<!-- head --><a/><!-- tail -->").unwrap();
        assert_eq!(doc.prolog(), &[Node::Comment(" head ".to_string())]);
        assert_eq!(doc.epilog(), &[Node::Comment(" tail ".to_string())]);
    }

    #[test]
    fn whitespace_only_leaf_text_survives_a_round_trip() {
        let doc = Document::parse(
            "<project>\n  <argLine> </argLine>\n  <a>&#32;</a>\n  <b>\n  </b>\n</project>",
        )
        .unwrap();
        assert_eq!(doc.root().child_text("argLine").as_deref(), Some(" "));
        assert_eq!(doc.root().child_text("a").as_deref(), Some(" "));
        assert_eq!(doc.root().elements().count(), 3);

        let out = doc.serialize();
        assert!(out.contains("<argLine> </argLine>"));
        assert!(out.contains("<a> </a>"));
        assert_eq!(Document::parse(&out).unwrap().serialize(), out);
    }

    #[test]
    fn indentation_between_elements_is_dropped() {
        let doc = Document::parse("<modules>\n    <module>a</module>\n</modules>").unwrap();
        assert_eq!(doc.root().children().len(), 1);
        assert_eq!(doc.root().text(), None);
    }
}
