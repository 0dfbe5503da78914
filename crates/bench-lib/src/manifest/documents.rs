//! Multi-document YAML streams

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Parse every document of a YAML stream, in order.
///
/// Empty and non-mapping documents are kept as they are. A stream holding
/// only comments or whitespace has no documents at all.
pub fn parse_documents(text: &str) -> Result<Vec<Value>, serde_yaml::Error> {
    if !has_content(text) {
        return Ok(Vec::new());
    }

    serde_yaml::Deserializer::from_str(text)
        .map(Value::deserialize)
        .collect()
}

fn has_content(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Render documents as one stream separated by `---`.
///
/// Mappings use block style and strings containing newlines are emitted as
/// literal blocks, so embedded configs and scripts stay readable.
pub fn render_documents(docs: &[Value]) -> Result<String, serde_yaml::Error> {
    let mut serializer = serde_yaml::Serializer::new(Vec::new());
    for doc in docs {
        doc.serialize(&mut serializer)?;
    }
    let buffer = serializer.into_inner()?;

    // The emitter only produces UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_order_and_non_mappings() {
        let text = "kind: Service\n---\n- a\n- b\n---\nplain scalar\n---\nkind: Deployment\n";
        let docs = parse_documents(text).unwrap();

        assert_eq!(docs.len(), 4);
        assert_eq!(docs[0]["kind"], "Service");
        assert!(docs[1].is_sequence());
        assert_eq!(docs[2], Value::String("plain scalar".into()));
        assert_eq!(docs[3]["kind"], "Deployment");
    }

    #[test]
    fn test_parse_blank_and_commented_streams() {
        assert!(parse_documents("").unwrap().is_empty());
        assert!(parse_documents("\n  \n").unwrap().is_empty());
        assert!(parse_documents("# disabled for now\n# kind: Service\n")
            .unwrap()
            .is_empty());

        // An explicit empty document is still a document
        let docs = parse_documents("a: 1\n---\n").unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[1].is_null());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_documents("kind: Deployment\n  bad: [unclosed\n").is_err());
    }

    #[test]
    fn test_render_separates_documents() {
        let docs = parse_documents("a: 1\n---\nb: 2\n").unwrap();
        let rendered = render_documents(&docs).unwrap();

        assert!(rendered.contains("---"));
        assert_eq!(parse_documents(&rendered).unwrap(), docs);
    }

    #[test]
    fn test_render_keeps_multiline_strings_intact() {
        let docs = parse_documents("data:\n  script: |\n    echo one\n    echo two\n").unwrap();
        let rendered = render_documents(&docs).unwrap();

        assert!(!rendered.contains("\\n"), "newlines should not be escaped");
        let reparsed = parse_documents(&rendered).unwrap();
        assert_eq!(reparsed[0]["data"]["script"], "echo one\necho two\n");
    }
}
