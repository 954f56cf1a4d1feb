//! Pretty-printing serializer for [`Document`].
//!
//! Layout rules:
//! - elements whose children are elements, comments or processing
//!   instructions (plus indentation whitespace) get one child per line,
//!   indented by two spaces per level; the old indentation is discarded.
//! - elements holding real text are written inline, byte for byte, so
//!   mixed content is never altered.
//! - childless elements are self-closing.
//!
//! No XML declaration is written. The output is UTF-8 and ends with a newline.

use super::element::{Attribute, Document, Element, XmlNode};

const INDENT: &str = "  ";

/// Serializes the whole document, including DOCTYPE and top-level comments.
pub fn to_pretty_string(document: &Document) -> String {
    let mut out = String::with_capacity(4096);

    for (index, node) in document.prolog.iter().enumerate() {
        if index == document.doctype_position {
            write_doctype(&mut out, document);
        }
        if !matches!(node, XmlNode::Text(_)) {
            write_node(&mut out, node, 0);
            out.push('\n');
        }
    }
    if document.doctype_position >= document.prolog.len() {
        write_doctype(&mut out, document);
    }

    write_element(&mut out, &document.root, 0);
    out.push('\n');

    for node in document.epilog.iter().filter(|n| !matches!(n, XmlNode::Text(_))) {
        write_node(&mut out, node, 0);
        out.push('\n');
    }
    out
}

fn write_doctype(out: &mut String, document: &Document) {
    if let Some(doctype) = &document.doctype {
        out.push_str(doctype);
        out.push('\n');
    }
}

fn write_node(out: &mut String, node: &XmlNode, depth: usize) {
    match node {
        XmlNode::Element(element) => write_element(out, element, depth),
        XmlNode::Text(text) => escape_text(out, text),
        XmlNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        XmlNode::ProcessingInstruction { target, value } => {
            out.push_str("<?");
            out.push_str(target);
            if let Some(value) = value {
                out.push(' ');
                out.push_str(value);
            }
            out.push_str("?>");
        }
    }
}

fn write_element(out: &mut String, element: &Element, depth: usize) {
    out.push('<');
    out.push_str(&element.name);
    for attribute in &element.attributes {
        write_attribute(out, attribute);
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    if is_block(element) {
        for child in element.children.iter().filter(|c| !c.is_blank_text()) {
            out.push('\n');
            push_indent(out, depth + 1);
            write_node(out, child, depth + 1);
        }
        out.push('\n');
        push_indent(out, depth);
    } else {
        for child in &element.children {
            write_inline(out, child);
        }
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

/// Writes a node without introducing any whitespace, at any depth.
fn write_inline(out: &mut String, node: &XmlNode) {
    match node {
        XmlNode::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for attribute in &element.attributes {
                write_attribute(out, attribute);
            }
            if element.children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in &element.children {
                write_inline(out, child);
            }
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
        other => write_node(out, other, 0),
    }
}

/// Block layout applies when every text child is indentation only and at
/// least one non-text child exists.
fn is_block(element: &Element) -> bool {
    let mut has_structure = false;
    for child in &element.children {
        match child {
            XmlNode::Text(_) if child.is_blank_text() => {}
            XmlNode::Text(_) => return false,
            _ => has_structure = true,
        }
    }
    has_structure
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn write_attribute(out: &mut String, attribute: &Attribute) {
    out.push(' ');
    out.push_str(&attribute.name);
    out.push_str("=\"");
    for ch in attribute.value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
    out.push('"');
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}
