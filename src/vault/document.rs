//! Vault document model
//!
//! A document is a frontmatter header plus an ordered list of typed
//! sections. Exactly one section kind, `Generated`, is ever replaced by
//! later runs; it is fenced between explicit markers on disk. Everything
//! else round-trips byte-for-byte, which is how hand-authored content
//! survives re-runs: structurally, not by careful splicing.
//!
//! Documents only ever *emit* wiki directives (`[[target|Label]]` links,
//! `![[target]]` embeds); resolving them is the vault viewer's concern.

use super::frontmatter::{split_document, Frontmatter};

/// Opening fence of the generated region.
pub const GENERATED_BEGIN: &str = "<!-- trellis:begin -->";
/// Closing fence of the generated region.
pub const GENERATED_END: &str = "<!-- trellis:end -->";

/// One line inside a generated region.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Group heading, preceded by a blank line: `\n## {0}`.
    Heading(String),
    /// Transclusion of another document: `![[{0}]]`.
    Embed(String),
    /// Bulleted bare cross-reference: `- [[{0}]]`.
    Ref(String),
    /// Bulleted labeled cross-reference: `- [[{target}|{label}]]`.
    Link { target: String, label: String },
    /// Verbatim line.
    Text(String),
}

impl Block {
    fn render_into(&self, out: &mut String) {
        match self {
            Block::Heading(text) => {
                out.push_str("\n## ");
                out.push_str(text);
                out.push('\n');
            }
            Block::Embed(target) => {
                out.push_str("![[");
                out.push_str(target);
                out.push_str("]]\n");
            }
            Block::Ref(target) => {
                out.push_str("- [[");
                out.push_str(target);
                out.push_str("]]\n");
            }
            Block::Link { target, label } => {
                out.push_str("- [[");
                out.push_str(target);
                out.push('|');
                out.push_str(label);
                out.push_str("]]\n");
            }
            Block::Text(line) => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
}

/// One body section.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// Document title line: `# {0}`.
    Title(String),
    /// Transclusion line: `![[{0}]]`.
    Embed(String),
    /// A single blank line. Spacing is explicit so rendering stays
    /// byte-deterministic.
    Blank,
    /// Text preserved exactly as read from disk.
    Verbatim(String),
    /// The replaceable fenced region.
    Generated(Vec<Block>),
}

/// A full vault document: header plus body sections.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub frontmatter: Frontmatter,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new(frontmatter: Frontmatter) -> Self {
        Self {
            frontmatter,
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Standard scaffold for a fresh entity document: title heading and
    /// description embed, followed by an empty generated region.
    pub fn scaffold(frontmatter: Frontmatter, title: &str, description_target: &str) -> Self {
        Self::new(frontmatter)
            .with_section(Section::Blank)
            .with_section(Section::Title(title.to_string()))
            .with_section(Section::Blank)
            .with_section(Section::Embed(description_target.to_string()))
            .with_section(Section::Blank)
            .with_section(Section::Generated(Vec::new()))
    }

    /// Replace the generated region, appending one if the document has
    /// none yet (legacy files created before the markers existed).
    pub fn set_generated(&mut self, blocks: Vec<Block>) {
        for section in &mut self.sections {
            if let Section::Generated(existing) = section {
                *existing = blocks;
                return;
            }
        }
        if let Some(Section::Verbatim(text)) = self.sections.last() {
            if !text.ends_with("\n\n") {
                self.sections.push(Section::Blank);
            }
        }
        self.sections.push(Section::Generated(blocks));
    }

    /// Serialize the whole document. The single place bytes are produced.
    pub fn render(&self) -> String {
        let mut out = self.frontmatter.encode();
        for section in &self.sections {
            match section {
                Section::Title(title) => {
                    out.push_str("# ");
                    out.push_str(title);
                    out.push('\n');
                }
                Section::Embed(target) => {
                    out.push_str("![[");
                    out.push_str(target);
                    out.push_str("]]\n");
                }
                Section::Blank => out.push('\n'),
                Section::Verbatim(text) => out.push_str(text),
                Section::Generated(blocks) => {
                    out.push_str(GENERATED_BEGIN);
                    out.push('\n');
                    for block in blocks {
                        block.render_into(&mut out);
                    }
                    out.push_str(GENERATED_END);
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Parse an existing file into a shell that preserves everything
    /// outside the generated region. Total: a missing or malformed header
    /// parses as an empty one (the scanner reports that separately), and
    /// the body is never lost.
    pub fn parse(text: &str) -> Document {
        let (block, body) = split_document(text);
        let frontmatter = block
            .and_then(|b| Frontmatter::parse_block(b).ok())
            .unwrap_or_default();
        let body = if block.is_some() { body } else { text };

        let mut sections = Vec::new();
        match generated_bounds(body) {
            Some((begin, inner_start, inner_end, end)) => {
                if begin > 0 {
                    sections.push(Section::Verbatim(body[..begin].to_string()));
                }
                let blocks = body[inner_start..inner_end]
                    .lines()
                    .map(|l| Block::Text(l.to_string()))
                    .collect();
                sections.push(Section::Generated(blocks));
                if end < body.len() {
                    sections.push(Section::Verbatim(body[end..].to_string()));
                }
            }
            None => {
                if !body.is_empty() {
                    sections.push(Section::Verbatim(body.to_string()));
                }
            }
        }
        Document {
            frontmatter,
            sections,
        }
    }
}

/// Byte bounds of the generated region within a body:
/// (begin-marker start, content start, content end, end-marker line end).
fn generated_bounds(body: &str) -> Option<(usize, usize, usize, usize)> {
    let begin = find_marker_line(body, GENERATED_BEGIN)?;
    let inner_start = line_end(body, begin + GENERATED_BEGIN.len());
    let rel_end = find_marker_line(&body[inner_start..], GENERATED_END)?;
    let end_marker = inner_start + rel_end;
    let end = line_end(body, end_marker + GENERATED_END.len());
    Some((begin, inner_start, end_marker, end))
}

/// Find a marker that sits at the start of a line.
fn find_marker_line(text: &str, marker: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = text[from..].find(marker) {
        let at = from + rel;
        if at == 0 || text.as_bytes()[at - 1] == b'\n' {
            return Some(at);
        }
        from = at + marker.len();
    }
    None
}

/// Index just past the newline terminating the line containing `from`.
fn line_end(text: &str, from: usize) -> usize {
    match text[from..].find('\n') {
        Some(rel) => from + rel + 1,
        None => text.len(),
    }
}

/// The raw content of a document's generated region, if fenced.
pub fn generated_region(text: &str) -> Option<&str> {
    let (block, body) = split_document(text);
    let body = if block.is_some() { body } else { text };
    let (_, inner_start, inner_end, _) = generated_bounds(body)?;
    Some(&body[inner_start..inner_end])
}

/// A wiki directive found in body text.
#[derive(Debug, Clone, PartialEq)]
pub struct WikiLink {
    pub target: String,
    /// Display label; the target when the `|label` part is absent.
    pub label: String,
    pub embed: bool,
}

/// Scan text for `[[target|Label]]` links and `![[target]]` embeds.
pub fn parse_wiki_links(text: &str) -> Vec<WikiLink> {
    let bytes = text.as_bytes();
    let mut links = Vec::new();
    let mut from = 0;
    while let Some(rel) = text[from..].find("[[") {
        let open = from + rel;
        let Some(close_rel) = text[open + 2..].find("]]") else {
            break;
        };
        let close = open + 2 + close_rel;
        let embed = open > 0 && bytes[open - 1] == b'!';
        let inner = &text[open + 2..close];
        let (target, label) = match inner.split_once('|') {
            Some((t, l)) => (t.trim(), l.trim()),
            None => (inner.trim(), inner.trim()),
        };
        if !target.is_empty() {
            links.push(WikiLink {
                target: target.to_string(),
                label: label.to_string(),
                embed,
            });
        }
        from = close + 2;
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic_frontmatter() -> Frontmatter {
        let mut fm = Frontmatter::new();
        fm.push_str("title", "Auth");
        fm.push_list("sources", ["src1"]);
        fm
    }

    #[test]
    fn test_scaffold_render_shape() {
        let mut doc = Document::scaffold(topic_frontmatter(), "Auth", "topics/auth/description");
        doc.set_generated(vec![
            Block::Heading("Notes".into()),
            Block::Embed("n_0001".into()),
        ]);

        let expected = "---\n\
            title: \"Auth\"\n\
            sources: [\"src1\"]\n\
            ---\n\
            \n\
            # Auth\n\
            \n\
            ![[topics/auth/description]]\n\
            \n\
            <!-- trellis:begin -->\n\
            \n\
            ## Notes\n\
            ![[n_0001]]\n\
            <!-- trellis:end -->\n";
        assert_eq!(doc.render(), expected);
    }

    #[test]
    fn test_parse_render_roundtrip_is_byte_exact() {
        let mut doc = Document::scaffold(topic_frontmatter(), "Auth", "topics/auth/description");
        doc.set_generated(vec![
            Block::Heading("Notes".into()),
            Block::Embed("n_0001".into()),
        ]);
        let text = doc.render();

        let reparsed = Document::parse(&text);
        assert_eq!(reparsed.render(), text);
    }

    #[test]
    fn test_hand_authored_body_survives_regeneration() {
        let mut doc = Document::scaffold(topic_frontmatter(), "Auth", "topics/auth/description");
        doc.set_generated(vec![Block::Embed("q_0001".into())]);
        let mut text = doc.render();
        // A person edits outside the fences, before and after.
        text = text.replace(
            "![[topics/auth/description]]\n",
            "![[topics/auth/description]]\n\nMy own paragraph about auth.\n",
        );
        text.push_str("\nTrailing hand notes.\n");

        let mut edited = Document::parse(&text);
        edited.set_generated(vec![
            Block::Embed("q_0001".into()),
            Block::Embed("q_0002".into()),
        ]);
        let rewritten = edited.render();

        assert!(rewritten.contains("My own paragraph about auth.\n"));
        assert!(rewritten.contains("\nTrailing hand notes.\n"));
        assert!(rewritten.contains("![[q_0002]]"));
        // Regenerating with the same blocks is byte-stable.
        let mut again = Document::parse(&rewritten);
        again.set_generated(vec![
            Block::Embed("q_0001".into()),
            Block::Embed("q_0002".into()),
        ]);
        assert_eq!(again.render(), rewritten);
    }

    #[test]
    fn test_legacy_file_without_markers_gains_region_at_end() {
        let text = "---\ntitle: \"Auth\"\n---\n\n# Auth\n\nOld hand-written body.\n";
        let mut doc = Document::parse(text);
        doc.set_generated(vec![Block::Heading("Notes".into())]);
        let rendered = doc.render();

        assert!(rendered.contains("Old hand-written body.\n"));
        let idx_body = rendered.find("Old hand-written body.").unwrap();
        let idx_begin = rendered.find(GENERATED_BEGIN).unwrap();
        assert!(idx_begin > idx_body);
        assert!(rendered.ends_with(&format!("{}\n", GENERATED_END)));
    }

    #[test]
    fn test_parse_without_frontmatter_keeps_body() {
        let text = "# Loose file\n\nNo header at all.\n";
        let doc = Document::parse(text);
        assert!(doc.frontmatter.is_empty());
        assert_eq!(doc.render(), format!("---\n---\n{}", text));
    }

    #[test]
    fn test_generated_region_extraction() {
        let mut doc = Document::scaffold(topic_frontmatter(), "Auth", "topics/auth/description");
        doc.set_generated(vec![
            Block::Heading("Topics".into()),
            Block::Link {
                target: "auth".into(),
                label: "Auth".into(),
            },
        ]);
        let text = doc.render();
        let region = generated_region(&text).unwrap();
        assert_eq!(region, "\n## Topics\n- [[auth|Auth]]\n");
    }

    #[test]
    fn test_parse_wiki_links_mixed() {
        let text = "intro [[auth|Auth]] and ![[q_0001]] plus [[plain]]\n";
        let links = parse_wiki_links(text);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].target, "auth");
        assert_eq!(links[0].label, "Auth");
        assert!(!links[0].embed);
        assert_eq!(links[1].target, "q_0001");
        assert!(links[1].embed);
        assert_eq!(links[2].label, "plain");
    }

    #[test]
    fn test_marker_must_start_a_line() {
        let body = format!("mentioning {} inline\n", GENERATED_BEGIN);
        assert!(generated_region(&body).is_none());
    }
}
