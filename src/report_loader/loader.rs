use encoding_rs::{Encoding, UTF_8};
use roxmltree::{NodeType, ParsingOptions};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::error::ReportLoaderError;
use crate::report::{Attribute, Document, Element, XmlNode};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

//─────────────────────────────────────────────────────────────────────────────

/// Reads a coverage report from disk and builds an owned `Document`.
///
/// The bytes are decoded from the encoding named by a byte order mark or by
/// the XML declaration, falling back to UTF-8.
pub fn load_report_from_file(file_path: &Path) -> Result<Document, ReportLoaderError> {
    let display_path = file_path.display().to_string();

    let file_bytes =
        fs::read(file_path).map_err(|e| ReportLoaderError::ReadFile(display_path.clone(), e))?;
    let file_content = decode_report(&file_bytes)
        .map_err(|encoding| ReportLoaderError::Decode(display_path.clone(), encoding))?;

    parse_report(&file_content).map_err(|e| ReportLoaderError::ParseXml(display_path, e))
}

/// Decodes raw report bytes to text. Returns the encoding name when the
/// bytes are not valid in that encoding.
fn decode_report(bytes: &[u8]) -> Result<Cow<'_, str>, &'static str> {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| declared_encoding(bytes))
        .unwrap_or(UTF_8);
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(used.name());
    }
    Ok(text)
}

/// Reads the `encoding="..."` pseudo-attribute of a leading XML declaration.
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let declaration = bytes.strip_prefix(b"<?xml")?;
    let end = declaration.windows(2).position(|pair| pair == b"?>")?;
    let declaration = &declaration[..end];

    let key = declaration
        .windows(b"encoding".len())
        .position(|window| window == b"encoding")?;
    let rest = &declaration[key + b"encoding".len()..];
    let rest = rest.trim_ascii_start().strip_prefix(b"=")?.trim_ascii_start();
    let (&quote, rest) = rest.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let label_end = rest.iter().position(|&byte| byte == quote)?;
    Encoding::for_label(&rest[..label_end])
}

/// Parses XML text into an owned `Document`.
///
/// DTDs are accepted since Cobertura reports reference one; the DOCTYPE
/// declaration itself is carried over verbatim, in its place among the
/// prolog comments.
pub fn parse_report(xml_text: &str) -> Result<Document, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let parsed = roxmltree::Document::parse_with_options(xml_text, options)?;
    let root_node = parsed.root_element();

    let mut document = Document::new(convert_element(root_node));
    let doctype = extract_doctype(&xml_text[..root_node.range().start]);

    let mut after_root = false;
    for node in parsed.root().children() {
        if node.id() == root_node.id() {
            after_root = true;
            continue;
        }
        if let Some(converted) = convert_node(node) {
            if after_root {
                document.epilog.push(converted);
            } else {
                if let Some((offset, _)) = &doctype {
                    if node.range().start < *offset {
                        document.doctype_position += 1;
                    }
                }
                document.prolog.push(converted);
            }
        }
    }
    document.doctype = doctype.map(|(_, text)| text);

    Ok(document)
}

/// Converts any non-root node; returns `None` for node kinds the tree does
/// not keep.
fn convert_node(node: roxmltree::Node) -> Option<XmlNode> {
    match node.node_type() {
        NodeType::Element => Some(XmlNode::Element(convert_element(node))),
        NodeType::Text => node.text().map(|text| XmlNode::Text(text.to_string())),
        NodeType::Comment => node.text().map(|text| XmlNode::Comment(text.to_string())),
        NodeType::PI => node.pi().map(|pi| XmlNode::ProcessingInstruction {
            target: pi.target.to_string(),
            value: pi.value.map(str::to_string),
        }),
        NodeType::Root => None,
    }
}

fn convert_element(node: roxmltree::Node) -> Element {
    let mut element = Element::new(qualified_name(
        node,
        node.tag_name().namespace(),
        node.tag_name().name(),
    ));

    // Namespace declarations are kept as plain attributes on the element
    // that introduced them.
    let inherited: HashSet<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    for namespace in node.namespaces() {
        if namespace.name() == Some("xml")
            || inherited.contains(&(namespace.name(), namespace.uri()))
        {
            continue;
        }
        let name = match namespace.name() {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        element.attributes.push(Attribute {
            name,
            value: namespace.uri().to_string(),
        });
    }

    for attribute in node.attributes() {
        element.attributes.push(Attribute {
            name: qualified_name(node, attribute.namespace(), attribute.name()),
            value: attribute.value().to_string(),
        });
    }

    element.children = node.children().filter_map(convert_node).collect();
    element
}

fn qualified_name(node: roxmltree::Node, namespace: Option<&str>, local: &str) -> String {
    let prefix = match namespace {
        Some(XML_NAMESPACE) => Some("xml"),
        Some(uri) => node.lookup_prefix(uri),
        None => None,
    };
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}

/// Pulls the `<!DOCTYPE ...>` declaration, internal subset included, out of
/// the text that precedes the root element, with its byte offset.
fn extract_doctype(prolog: &str) -> Option<(usize, String)> {
    let start = find_doctype_start(prolog)?;
    let rest = &prolog[start..];

    let mut subset_depth = 0usize;
    let mut quote: Option<char> = None;
    for (offset, ch) in rest.char_indices() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '[' => subset_depth += 1,
                ']' => subset_depth = subset_depth.saturating_sub(1),
                '>' if subset_depth == 0 => return Some((start, rest[..=offset].to_string())),
                _ => {}
            },
        }
    }
    None
}

fn find_doctype_start(prolog: &str) -> Option<usize> {
    let mut position = 0;
    while position < prolog.len() {
        let rest = &prolog[position..];
        if rest.starts_with("<!--") {
            position += rest.find("-->").map_or(rest.len(), |end| end + 3);
            continue;
        }
        if rest.starts_with("<!DOCTYPE") {
            return Some(position);
        }
        position += rest.chars().next().map_or(1, char::len_utf8);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const COBERTURA: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE coverage SYSTEM "http://cobertura.sourceforge.net/xml/coverage-04.dtd">
<!-- Generated by a converter -->
<coverage line-rate="0.5" branch-rate="0" version="1.9" timestamp="1">
	<sources>
		<source>/work/src/main/kotlin</source>
	</sources>
	<packages>
		<package name="de.example" line-rate="0.5">
			<classes>
				<class name="de.example.Foo" filename="de/example/Foo.kt">
					<methods/>
					<lines><line number="1" hits="1"/></lines>
				</class>
			</classes>
		</package>
	</packages>
</coverage>
"#;

    #[test]
    fn parses_cobertura_layout() {
        let document = parse_report(COBERTURA).expect("valid report");

        assert_eq!(document.root.name, "coverage");
        assert_eq!(document.root.attribute("version"), Some("1.9"));
        assert_eq!(
            document.doctype.as_deref(),
            Some("<!DOCTYPE coverage SYSTEM \"http://cobertura.sourceforge.net/xml/coverage-04.dtd\">")
        );
        assert_eq!(
            document.prolog,
            vec![XmlNode::Comment(" Generated by a converter ".into())]
        );

        let source = document
            .root
            .find("sources")
            .and_then(|sources| sources.find("source"))
            .expect("source element");
        assert_eq!(source.text(), Some("/work/src/main/kotlin"));

        let class = document
            .root
            .find("packages")
            .and_then(|p| p.find("package"))
            .and_then(|p| p.find("classes"))
            .and_then(|c| c.find("class"))
            .expect("class element");
        let names: Vec<&str> = class.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["name", "filename"]);
        assert_eq!(class.attribute("filename"), Some("de/example/Foo.kt"));
        assert!(class.find("lines").is_some());
    }

    #[test]
    fn keeps_internal_subset_and_skips_commented_doctype() {
        let xml = "<!-- <!DOCTYPE fake> -->\n<!DOCTYPE coverage [\n  <!ELEMENT coverage ANY>\n]>\n<coverage/>";
        let document = parse_report(xml).expect("valid report");
        assert_eq!(
            document.doctype.as_deref(),
            Some("<!DOCTYPE coverage [\n  <!ELEMENT coverage ANY>\n]>")
        );
    }

    #[test]
    fn doctype_after_a_comment_keeps_its_position() {
        let xml = "<!-- header -->\n<!DOCTYPE coverage>\n<!-- body -->\n<coverage/>";
        let document = parse_report(xml).expect("valid report");
        assert_eq!(document.doctype.as_deref(), Some("<!DOCTYPE coverage>"));
        assert_eq!(document.prolog.len(), 2);
        assert_eq!(document.doctype_position, 1);
        assert_eq!(parse_report(COBERTURA).expect("valid").doctype_position, 0);
    }

    #[test]
    fn latin1_report_is_decoded_from_its_declaration() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("coverage.xml");
        let mut bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<coverage><packages><package name=\"".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b"t\xE9\"/></packages></coverage>");
        fs::write(&path, bytes).expect("write");

        let document = load_report_from_file(&path).expect("latin-1 report");
        let package = document
            .root
            .find("packages")
            .and_then(|p| p.find("package"))
            .expect("package");
        assert_eq!(package.attribute("name"), Some("\u{e9}t\u{e9}"));
    }

    #[test]
    fn utf8_bom_and_single_quoted_declaration() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("<?xml version='1.0' encoding='utf-8'?><c n=\"\u{e9}\"/>".as_bytes());
        assert_eq!(decode_report(&bytes).expect("utf-8").as_ref(), "<?xml version='1.0' encoding='utf-8'?><c n=\"\u{e9}\"/>");
        assert_eq!(declared_encoding(b"<?xml version='1.0' encoding = 'latin1'?>"), Encoding::for_label(b"latin1"));
        assert_eq!(declared_encoding(b"<coverage/>"), None);
    }

    #[test]
    fn invalid_utf8_without_declaration_is_a_decode_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("coverage.xml");
        fs::write(&path, b"<coverage name=\"\xFF\"/>").expect("write");

        let err = load_report_from_file(&path).expect_err("must fail");
        assert!(matches!(err, ReportLoaderError::Decode(_, "UTF-8")));
    }

    #[test]
    fn no_doctype_when_absent() {
        let document = parse_report("<coverage><sources/></coverage>").expect("valid report");
        assert_eq!(document.doctype, None);
        assert!(document.prolog.is_empty());
        assert!(document.epilog.is_empty());
    }

    #[test]
    fn namespaces_are_kept_where_declared() {
        let xml = r#"<r:report xmlns:r="urn:r" xmlns="urn:d"><r:item r:id="1" xml:lang="en"><plain/></r:item></r:report>"#;
        let document = parse_report(xml).expect("valid report");

        assert_eq!(document.root.name, "r:report");
        let mut declared: Vec<&str> = document
            .root
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        declared.sort_unstable();
        assert_eq!(declared, vec!["xmlns", "xmlns:r"]);

        let item = document.root.find("r:item").expect("item");
        assert_eq!(item.attribute("r:id"), Some("1"));
        assert_eq!(item.attribute("xml:lang"), Some("en"));
        assert!(item.attribute("xmlns:r").is_none());
        assert!(item.find("plain").is_some());
    }

    #[test]
    fn entities_and_cdata_become_text() {
        let document =
            parse_report("<source>a &amp; b<![CDATA[ <c> ]]></source>").expect("valid report");
        assert_eq!(document.root.text(), Some("a & b <c> "));
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("coverage.xml");
        let mut file = fs::File::create(&path).expect("create");
        file.write_all(b"<coverage><sources></coverage>").expect("write");

        let err = load_report_from_file(&path).expect_err("must fail");
        assert!(matches!(err, ReportLoaderError::ParseXml(_, _)));
        assert!(err.to_string().contains("coverage.xml"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_report_from_file(&dir.path().join("absent.xml")).expect_err("must fail");
        assert!(matches!(err, ReportLoaderError::ReadFile(_, _)));
    }
}
