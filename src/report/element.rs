// element.rs
// ──────────────────────────────────────────────────────────────────────────────
// Owned, mutable XML tree for a coverage report. `roxmltree` only gives a
// read-only view, so the loader copies every node into these types and the
// rewriter mutates them in place before the writer serializes them back.
// ──────────────────────────────────────────────────────────────────────────────

/// A single `name="value"` pair. Names are qualified (`prefix:local`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Any node that can appear inside an element or around the root element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        value: Option<String>,
    },
}

impl XmlNode {
    /// `true` for text nodes made of whitespace only (indentation).
    pub fn is_blank_text(&self) -> bool {
        matches!(self, XmlNode::Text(text) if text.trim().is_empty())
    }
}

/// An element with its attributes (in document order) and children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<XmlNode>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Overwrites an existing attribute in place, keeping its position,
    /// or appends a new one.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Text placed before the first child node, if any.
    pub fn text(&self) -> Option<&str> {
        match self.children.first() {
            Some(XmlNode::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// First direct child element with the given name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|child| child.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.child_elements_mut().find(|child| child.name == name)
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Keeps only the child elements for which `keep` returns `true`.
    ///
    /// Children are visited once, in document order, and may be mutated by
    /// `keep`. A dropped element takes the text node right after it (its
    /// tail) with it; other non-element children are kept.
    pub fn retain_child_elements<F>(&mut self, mut keep: F)
    where
        F: FnMut(&mut Element) -> bool,
    {
        let mut index = 0;
        while index < self.children.len() {
            let kept = match &mut self.children[index] {
                XmlNode::Element(element) => keep(element),
                _ => true,
            };
            if kept {
                index += 1;
                continue;
            }
            self.children.remove(index);
            if matches!(self.children.get(index), Some(XmlNode::Text(_))) {
                self.children.remove(index);
            }
        }
    }
}

//─────────────────────────────────────────────────────────────────────────────

/// A parsed coverage report.
///
/// `doctype` holds the verbatim `<!DOCTYPE ...>` declaration, `prolog` and
/// `epilog` the comments and processing instructions around the root.
/// `doctype_position` is the number of prolog nodes that precede the DOCTYPE.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub doctype: Option<String>,
    pub doctype_position: usize,
    pub prolog: Vec<XmlNode>,
    pub root: Element,
    pub epilog: Vec<XmlNode>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Document {
            doctype: None,
            doctype_position: 0,
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(filename: &str) -> Element {
        let mut element = Element::new("class");
        element.set_attribute("name", "Foo");
        element.set_attribute("filename", filename);
        element
    }

    #[test]
    fn set_attribute_keeps_position() {
        let mut element = class("Foo.java");
        element.set_attribute("line-rate", "1.0");
        element.set_attribute("filename", "/src/Foo.java");

        let names: Vec<&str> = element.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["name", "filename", "line-rate"]);
        assert_eq!(element.attribute("filename"), Some("/src/Foo.java"));
        assert_eq!(element.attribute("missing"), None);
    }

    #[test]
    fn find_returns_first_match() {
        let mut parent = Element::new("packages");
        parent.children.push(XmlNode::Text("\n  ".into()));
        parent.children.push(XmlNode::Element(class("A.java")));
        parent.children.push(XmlNode::Comment(" second ".into()));
        parent.children.push(XmlNode::Element(class("B.java")));

        let found = parent.find("class").expect("class child");
        assert_eq!(found.attribute("filename"), Some("A.java"));
        assert!(parent.find("package").is_none());
        assert_eq!(parent.child_elements().count(), 2);
    }

    #[test]
    fn text_is_leading_text_only() {
        let mut source = Element::new("source");
        assert_eq!(source.text(), None);

        source.children.push(XmlNode::Text("/root/a".into()));
        assert_eq!(source.text(), Some("/root/a"));

        let mut commented = Element::new("source");
        commented.children.push(XmlNode::Comment("c".into()));
        commented.children.push(XmlNode::Text("/root/b".into()));
        assert_eq!(commented.text(), None);
    }

    #[test]
    fn retain_visits_in_order_and_keeps_other_nodes() {
        let mut classes = Element::new("classes");
        for name in ["A.java", "B.java", "C.java", "D.java"] {
            classes.children.push(XmlNode::Element(class(name)));
            classes.children.push(XmlNode::Text("\n".into()));
        }

        let mut visited = Vec::new();
        classes.retain_child_elements(|element| {
            let name = element.attribute("filename").unwrap_or_default().to_string();
            visited.push(name.clone());
            name == "B.java" || name == "D.java"
        });

        assert_eq!(visited, vec!["A.java", "B.java", "C.java", "D.java"]);
        let kept: Vec<&str> = classes
            .child_elements()
            .filter_map(|e| e.attribute("filename"))
            .collect();
        assert_eq!(kept, vec!["B.java", "D.java"]);
        // A and C left together with their trailing text.
        assert_eq!(classes.children.len(), 4);
    }

    #[test]
    fn blank_text_detection() {
        assert!(XmlNode::Text(" \n\t".into()).is_blank_text());
        assert!(!XmlNode::Text(" x ".into()).is_blank_text());
        assert!(!XmlNode::Comment(" ".into()).is_blank_text());
    }
}
