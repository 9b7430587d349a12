//! Frontmatter codec
//!
//! Every vault document starts with a structured header between `---`
//! delimiters. Writing is canonical, with stable key order and quoted
//! scalars, so unchanged state re-encodes to identical bytes.
//! Reading is tolerant: quoted or unquoted values, scalar-or-list syntax,
//! and absent keys are all accepted, since older runs and hand edits have
//! produced all of them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("document has no frontmatter block")]
    Missing,

    #[error("invalid frontmatter: {0}")]
    Invalid(String),
}

/// A typed header field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    List(Vec<String>),
}

/// An ordered set of header fields.
///
/// Order is significant: `encode()` emits fields exactly as pushed, which
/// is what keeps re-runs byte-stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    fields: Vec<(String, FieldValue)>,
}

impl Frontmatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Append a string field.
    pub fn push_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields
            .push((key.into(), FieldValue::Str(value.into())));
    }

    /// Append an integer field.
    pub fn push_int(&mut self, key: impl Into<String>, value: i64) {
        self.fields.push((key.into(), FieldValue::Int(value)));
    }

    /// Append a float field.
    pub fn push_float(&mut self, key: impl Into<String>, value: f64) {
        self.fields.push((key.into(), FieldValue::Float(value)));
    }

    /// Append a list field.
    pub fn push_list<I, S>(&mut self, key: impl Into<String>, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.push((
            key.into(),
            FieldValue::List(items.into_iter().map(Into::into).collect()),
        ));
    }

    /// First string-typed value for a key. Numbers are stringified;
    /// lists are not.
    pub fn str_value(&self, key: &str) -> Option<String> {
        self.fields.iter().find(|(k, _)| k == key).and_then(|(_, v)| match v {
            FieldValue::Str(s) => Some(s.clone()),
            FieldValue::Int(n) => Some(n.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::List(_) => None,
        })
    }

    /// List-typed value for a key. A scalar is promoted to a one-item
    /// list; an absent key yields an empty list.
    pub fn list_value(&self, key: &str) -> Vec<String> {
        match self.fields.iter().find(|(k, _)| k == key) {
            Some((_, FieldValue::List(items))) => items.clone(),
            Some((_, FieldValue::Str(s))) => vec![s.clone()],
            Some((_, FieldValue::Int(n))) => vec![n.to_string()],
            Some((_, FieldValue::Float(f))) => vec![f.to_string()],
            None => Vec::new(),
        }
    }

    /// Integer-typed value for a key, parsing string forms too.
    pub fn int_value(&self, key: &str) -> Option<i64> {
        self.fields.iter().find(|(k, _)| k == key).and_then(|(_, v)| match v {
            FieldValue::Int(n) => Some(*n),
            FieldValue::Float(f) => Some(*f as i64),
            FieldValue::Str(s) => s.trim().parse().ok(),
            FieldValue::List(_) => None,
        })
    }

    /// Render the canonical block, including both `---` delimiters and a
    /// trailing newline.
    pub fn encode(&self) -> String {
        let mut out = String::from("---\n");
        for (key, value) in &self.fields {
            out.push_str(key);
            out.push_str(": ");
            match value {
                FieldValue::Str(s) => out.push_str(&quote(s)),
                FieldValue::Int(n) => out.push_str(&n.to_string()),
                FieldValue::Float(f) => out.push_str(&f.to_string()),
                FieldValue::List(items) => {
                    out.push('[');
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&quote(item));
                    }
                    out.push(']');
                }
            }
            out.push('\n');
        }
        out.push_str("---\n");
        out
    }

    /// Parse the frontmatter block of a full document, tolerantly.
    pub fn parse(text: &str) -> Result<Frontmatter, FrontmatterError> {
        let (block, _) = split_document(text);
        let block = block.ok_or(FrontmatterError::Missing)?;
        Self::parse_block(block)
    }

    /// Parse a bare block (no `---` delimiters).
    pub fn parse_block(block: &str) -> Result<Frontmatter, FrontmatterError> {
        if block.trim().is_empty() {
            return Ok(Frontmatter::new());
        }
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(block)
            .map_err(|e| FrontmatterError::Invalid(e.to_string()))?;

        let mut fm = Frontmatter::new();
        for (key, value) in mapping {
            let key = match key {
                serde_yaml::Value::String(s) => s,
                other => yaml_scalar_to_string(&other).unwrap_or_default(),
            };
            if key.is_empty() {
                continue;
            }
            match value {
                serde_yaml::Value::Sequence(seq) => {
                    let items = seq
                        .iter()
                        .filter_map(yaml_scalar_to_string)
                        .collect::<Vec<_>>();
                    fm.fields.push((key, FieldValue::List(items)));
                }
                serde_yaml::Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        fm.fields.push((key, FieldValue::Int(i)));
                    } else {
                        fm.fields
                            .push((key, FieldValue::Float(n.as_f64().unwrap_or(0.0))));
                    }
                }
                serde_yaml::Value::Null => {}
                other => {
                    if let Some(s) = yaml_scalar_to_string(&other) {
                        fm.fields.push((key, FieldValue::Str(s)));
                    }
                }
            }
        }
        Ok(fm)
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Split a document into its frontmatter block (without delimiters) and
/// the body that follows the closing delimiter.
pub fn split_document(text: &str) -> (Option<&str>, &str) {
    let trimmed = text.trim_start_matches('\u{feff}');
    let Some(after_open) = trimmed.strip_prefix("---\n") else {
        return (None, text);
    };
    match after_open.find("\n---") {
        Some(end) => {
            let block = &after_open[..end];
            let rest = &after_open[end + 4..];
            // Drop the single newline that terminates the closing delimiter.
            let body = rest.strip_prefix('\n').unwrap_or(rest);
            (Some(block), body)
        }
        None => (None, text),
    }
}

/// Extract a single key's value from a document header without a full
/// parse, stripping surrounding quotes. Lines outside the frontmatter
/// block are never consulted.
pub fn extract_value(text: &str, key: &str) -> Option<String> {
    let (block, _) = split_document(text);
    for line in block?.lines() {
        let Some((k, v)) = line.split_once(':') else {
            continue;
        };
        if k.trim() != key {
            continue;
        }
        let v = v.trim();
        if v.is_empty() {
            return None;
        }
        return Some(
            v.trim_matches('"')
                .trim_matches('\'')
                .to_string(),
        );
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_canonical_shape() {
        let mut fm = Frontmatter::new();
        fm.push_str("title", "Auth");
        fm.push_list("sources", ["src1", "src2"]);
        fm.push_int("questions", 3);
        fm.push_str("created", "2024-03-01T12:00:00Z");

        assert_eq!(
            fm.encode(),
            "---\ntitle: \"Auth\"\nsources: [\"src1\", \"src2\"]\nquestions: 3\ncreated: \"2024-03-01T12:00:00Z\"\n---\n"
        );
    }

    #[test]
    fn test_encode_escapes_quotes() {
        let mut fm = Frontmatter::new();
        fm.push_str("title", "The \"Big\" One");
        assert_eq!(fm.encode(), "---\ntitle: \"The \\\"Big\\\" One\"\n---\n");
    }

    #[test]
    fn test_encode_empty_list() {
        let mut fm = Frontmatter::new();
        fm.push_list("tags", Vec::<String>::new());
        assert_eq!(fm.encode(), "---\ntags: []\n---\n");
    }

    #[test]
    fn test_parse_roundtrip() {
        let mut fm = Frontmatter::new();
        fm.push_str("title", "Backend Services");
        fm.push_list("contributors", ["Alice", "Bob"]);
        fm.push_int("answers", 2);

        let doc = format!("{}\n# Body\n", fm.encode());
        let parsed = Frontmatter::parse(&doc).unwrap();
        assert_eq!(parsed.str_value("title").as_deref(), Some("Backend Services"));
        assert_eq!(parsed.list_value("contributors"), vec!["Alice", "Bob"]);
        assert_eq!(parsed.int_value("answers"), Some(2));
    }

    #[test]
    fn test_parse_tolerates_unquoted_and_scalar() {
        let doc = "---\ntitle: Auth\nsources: src1\ncreated: 2024-03-01T12:00:00Z\n---\nbody\n";
        let parsed = Frontmatter::parse(doc).unwrap();
        assert_eq!(parsed.str_value("title").as_deref(), Some("Auth"));
        // Scalar promoted to a one-item list.
        assert_eq!(parsed.list_value("sources"), vec!["src1"]);
        assert_eq!(
            parsed.str_value("created").as_deref(),
            Some("2024-03-01T12:00:00Z")
        );
    }

    #[test]
    fn test_parse_tolerates_block_lists() {
        let doc = "---\ntags:\n  - auth\n  - tokens\n---\n";
        let parsed = Frontmatter::parse(doc).unwrap();
        assert_eq!(parsed.list_value("tags"), vec!["auth", "tokens"]);
    }

    #[test]
    fn test_absent_keys_are_zero_values() {
        let parsed = Frontmatter::parse("---\ntitle: \"X\"\n---\n").unwrap();
        assert_eq!(parsed.str_value("missing"), None);
        assert!(parsed.list_value("missing").is_empty());
        assert_eq!(parsed.int_value("missing"), None);
    }

    #[test]
    fn test_missing_block_is_an_error() {
        assert!(matches!(
            Frontmatter::parse("# Just a heading\n"),
            Err(FrontmatterError::Missing)
        ));
    }

    #[test]
    fn test_invalid_block_is_an_error() {
        let doc = "---\ntitle: \"unterminated\n---\n";
        assert!(matches!(
            Frontmatter::parse(doc),
            Err(FrontmatterError::Invalid(_))
        ));
    }

    #[test]
    fn test_split_document_body() {
        let doc = "---\ntitle: \"X\"\n---\n# Heading\n\ntext\n";
        let (block, body) = split_document(doc);
        assert_eq!(block, Some("title: \"X\""));
        assert_eq!(body, "# Heading\n\ntext\n");
    }

    #[test]
    fn test_split_document_without_block() {
        let doc = "no header here\n";
        let (block, body) = split_document(doc);
        assert!(block.is_none());
        assert_eq!(body, doc);
    }

    #[test]
    fn test_extract_value_strips_quotes() {
        let doc = "---\nid: \"q_0001\"\nauthor: Alice\n---\nbody\n";
        assert_eq!(extract_value(doc, "id").as_deref(), Some("q_0001"));
        assert_eq!(extract_value(doc, "author").as_deref(), Some("Alice"));
        assert_eq!(extract_value(doc, "missing"), None);
    }

    #[test]
    fn test_encode_parse_encode_is_stable() {
        let mut fm = Frontmatter::new();
        fm.push_str("title", "Auth");
        fm.push_list("sources", ["src1"]);
        fm.push_str("created", "2024-03-01T12:00:00Z");

        let doc = format!("{}body\n", fm.encode());
        let reparsed = Frontmatter::parse(&doc).unwrap();
        assert_eq!(reparsed.encode(), fm.encode());
    }
}
