//! Flat key space to nested document reconstruction.
//!
//! Keys are split on `/` and merged into a tree of owned nodes. A node whose
//! children are exactly the slots `0..n` renders as a sequence, every other
//! node as a mapping, so the shape of the document is inferred from the key
//! space alone.
//!
//! ```text
//! traefik/http/routers/x/entrypoints/0 = web       http:
//! traefik/http/routers/x/rule = Host(`a`)    →         routers:
//! traefik/http/services/a/.../servers/0/url = u            x:
//!                                                              entrypoints:
//!                                                                  - web
//!                                                              rule: Host(`a`)
//! ```

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use crate::entries::keys::SEPARATOR;
use crate::entries::Snapshot;

/// Indentation character of rendered documents.
pub const INDENT_CHAR: char = ' ';

/// One path segment of a key.
///
/// Numeric segments keep their raw text, so `7` and `007` stay distinct.
/// They order numerically and before mapping keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Index(u64, String),
    Name(String),
}

impl Segment {
    pub fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = raw.parse() {
                return Segment::Index(index, raw.to_string());
            }
        }
        Segment::Name(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Segment::Index(_, raw) | Segment::Name(raw) => raw,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tree node: child nodes by segment plus the values of keys ending here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    children: BTreeMap<Segment, Node>,
    leaves: Vec<String>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-branch tree holding `value` at `path` below this node.
    pub fn from_path(path: &[&str], value: String) -> Self {
        match path.split_first() {
            None => Node {
                children: BTreeMap::new(),
                leaves: vec![value],
            },
            Some((first, rest)) => Node {
                children: BTreeMap::from([(Segment::parse(first), Node::from_path(rest, value))]),
                leaves: Vec::new(),
            },
        }
    }

    /// Union children by segment, recursively, and concatenate leaves.
    pub fn merge(&mut self, other: Node) {
        for (segment, child) in other.children {
            match self.children.entry(segment) {
                Entry::Occupied(mut existing) => existing.get_mut().merge(child),
                Entry::Vacant(slot) => {
                    slot.insert(child);
                }
            }
        }
        self.leaves.extend(other.leaves);
    }

    pub fn child(&self, segment: &Segment) -> Option<&Node> {
        self.children.get(segment)
    }

    pub fn children(&self) -> impl Iterator<Item = (&Segment, &Node)> {
        self.children.iter()
    }

    pub fn leaves(&self) -> &[String] {
        &self.leaves
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether the children are exactly the slots `0..n`, written canonically.
    ///
    /// Anything else renders as a mapping so every key survives a reparse.
    pub fn is_sequence(&self) -> bool {
        !self.children.is_empty()
            && self.children.keys().enumerate().all(|(i, segment)| match segment {
                Segment::Index(index, raw) => *index == i as u64 && *raw == i.to_string(),
                Segment::Name(_) => false,
            })
    }

    /// Flatten back into keys, each prefixed with `prefix` when non-empty.
    pub fn flatten(&self, prefix: &str) -> Snapshot {
        let mut entries = Snapshot::new();
        self.flatten_into(prefix, &mut entries);
        entries
    }

    fn flatten_into(&self, path: &str, entries: &mut Snapshot) {
        if let Some(value) = self.leaves.last() {
            entries.insert(path.to_string(), value.clone());
        }
        for (segment, child) in &self.children {
            let child_path = if path.is_empty() {
                segment.to_string()
            } else {
                format!("{path}{SEPARATOR}{segment}")
            };
            child.flatten_into(&child_path, entries);
        }
    }
}

/// Build the tree of a whole snapshot. The returned node is an unnamed root.
pub fn build_tree(snapshot: &Snapshot) -> Node {
    let mut root = Node::new();
    for (key, value) in snapshot {
        let path: Vec<&str> = key.split(SEPARATOR).collect();
        root.merge(Node::from_path(&path, value.clone()));
    }
    root
}

/// Serializes a tree as an indented YAML document.
#[derive(Debug, Clone, Copy)]
pub struct TreeWriter {
    step: usize,
}

impl Default for TreeWriter {
    fn default() -> Self {
        Self { step: 4 }
    }
}

impl TreeWriter {
    /// `step` indentation characters per nesting level.
    pub fn new(step: usize) -> Self {
        Self { step: step.max(1) }
    }

    /// Render the children of `node` as a document.
    pub fn render(&self, node: &Node) -> String {
        let mut out = String::new();
        self.write_children(&mut out, node, 0);
        out
    }

    fn write_children(&self, out: &mut String, node: &Node, indent: usize) {
        if node.is_sequence() {
            for child in node.children.values() {
                self.write_item(out, child, indent);
            }
            return;
        }

        for (segment, child) in &node.children {
            pad(out, indent);
            out.push_str(&scalar(segment.as_str()));
            out.push(':');
            if child.is_leaf() {
                if let [value] = child.leaves.as_slice() {
                    out.push(' ');
                    out.push_str(&scalar(value));
                }
                out.push('\n');
            } else {
                // A mapping cannot also carry a scalar; leaves here are dropped.
                out.push('\n');
                self.write_children(out, child, indent + self.step);
            }
        }
    }

    /// One sequence slot: `- value` per leaf, or `- key: value` followed by
    /// the slot's remaining attributes aligned under the first.
    fn write_item(&self, out: &mut String, node: &Node, indent: usize) {
        if node.is_leaf() {
            for value in &node.leaves {
                pad(out, indent);
                out.push_str("- ");
                out.push_str(&scalar(value));
                out.push('\n');
            }
            return;
        }

        let content_indent = indent + 2;
        let mut body = String::new();
        self.write_children(&mut body, node, content_indent);

        pad(out, indent);
        out.push_str("- ");
        out.push_str(&body[content_indent * INDENT_CHAR.len_utf8()..]);
    }
}

fn pad(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat(INDENT_CHAR).take(indent));
}

/// Emit `raw` plain when YAML reads it back as the same string, otherwise
/// double-quoted with every non-printable character escaped.
fn scalar(raw: &str) -> String {
    if is_plain_safe(raw) {
        return raw.to_string();
    }

    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for c in raw.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if is_printable(c) => quoted.push(c),
            c if (c as u32) <= 0xFF => quoted.push_str(&format!("\\x{:02X}", c as u32)),
            c if (c as u32) <= 0xFFFF => quoted.push_str(&format!("\\u{:04X}", c as u32)),
            c => quoted.push_str(&format!("\\U{:08X}", c as u32)),
        }
    }
    quoted.push('"');
    quoted
}

/// Characters a YAML reader takes literally inside a quoted scalar.
///
/// NEL, the Unicode line and paragraph separators, and the BOM are line
/// breaks or stream markers to YAML 1.1 readers.
fn is_printable(c: char) -> bool {
    matches!(
        c,
        '\u{20}'..='\u{7E}' | '\u{A0}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    ) && !matches!(c, '\u{2028}' | '\u{2029}' | '\u{FEFF}')
}

fn is_plain_safe(raw: &str) -> bool {
    const INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@',
        '`', '+', '.', '~',
    ];
    const RESERVED: &[&str] = &["true", "false", "null", "yes", "no", "on", "off", "y", "n"];

    let Some(first) = raw.chars().next() else {
        return false;
    };

    !(INDICATORS.contains(&first)
        || first.is_ascii_digit()
        || raw.trim() != raw
        || raw.ends_with(':')
        || raw.contains(": ")
        || raw.contains(" #")
        || !raw.chars().all(is_printable)
        || RESERVED.contains(&raw.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn render(pairs: &[(&str, &str)]) -> String {
        let tree = build_tree(&snapshot(pairs));
        let root = tree.child(&Segment::Name("traefik".into())).unwrap();
        TreeWriter::default().render(root)
    }

    #[test]
    fn test_segment_parse() {
        assert_eq!(Segment::parse("0"), Segment::Index(0, "0".into()));
        assert_eq!(Segment::parse("12"), Segment::Index(12, "12".into()));
        assert_ne!(Segment::parse("007"), Segment::parse("7"));
        assert_eq!(Segment::parse("-1"), Segment::Name("-1".into()));
        assert_eq!(Segment::parse("+1"), Segment::Name("+1".into()));
        assert_eq!(Segment::parse("web"), Segment::Name("web".into()));
        assert!(Segment::parse("2") < Segment::parse("10"));
        assert!(Segment::parse("10") < Segment::parse("a"));
    }

    #[test]
    fn test_merge_unions_children() {
        let mut root = Node::from_path(&["a", "b"], "1".into());
        root.merge(Node::from_path(&["a", "c"], "2".into()));
        root.merge(Node::from_path(&["d"], "3".into()));

        let a = root.child(&Segment::Name("a".into())).unwrap();
        assert_eq!(a.children().count(), 2);
        assert_eq!(root.children().count(), 2);

        let mut twice = Node::from_path(&["x"], "1".into());
        twice.merge(Node::from_path(&["x"], "2".into()));
        let x = twice.child(&Segment::Name("x".into())).unwrap();
        assert_eq!(x.leaves(), ["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_render_router_and_service() {
        let doc = render(&[
            ("traefik/http/routers/app_a/entrypoints/0", "web"),
            ("traefik/http/routers/app_a/entrypoints/1", "websecure"),
            ("traefik/http/routers/app_a/rule", "Host(`app.example.com`)"),
            ("traefik/http/routers/app_a/service", "a"),
            ("traefik/http/services/a/loadbalancer/servers/0/url", "http://10.0.0.1"),
        ]);

        let expected = "\
http:
    routers:
        app_a:
            entrypoints:
                - web
                - websecure
            rule: Host(`app.example.com`)
            service: a
    services:
        a:
            loadbalancer:
                servers:
                    - url: http://10.0.0.1
";
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_render_item_with_several_attributes() {
        let doc = render(&[
            ("traefik/tcp/services/s/loadbalancer/servers/0/address", "10.0.0.1:5432"),
            ("traefik/tcp/services/s/loadbalancer/servers/0/weight", "2"),
            ("traefik/tcp/services/s/loadbalancer/servers/1/address", "10.0.0.2:5432"),
        ]);

        let expected = "\
tcp:
    services:
        s:
            loadbalancer:
                servers:
                    - address: \"10.0.0.1:5432\"
                      weight: \"2\"
                    - address: \"10.0.0.2:5432\"
";
        assert_eq!(doc, expected);
    }

    #[test]
    fn test_indices_order_numerically() {
        let pairs: Vec<(String, String)> = (0..12)
            .map(|i| (format!("traefik/http/routers/r/entrypoints/{i}"), format!("ep{i}")))
            .collect();
        let snap: Snapshot = pairs.into_iter().collect();
        let tree = build_tree(&snap);
        let doc = TreeWriter::new(2).render(tree.child(&Segment::Name("traefik".into())).unwrap());

        let items: Vec<&str> = doc.lines().filter(|l| l.trim_start().starts_with("- ")).collect();
        assert_eq!(items.len(), 12);
        assert_eq!(items[2].trim(), "- ep2");
        assert_eq!(items[10].trim(), "- ep10");
    }

    #[test]
    fn test_scalars_needing_quotes() {
        assert_eq!(scalar("web"), "web");
        assert_eq!(scalar("http://10.0.0.1:80"), "http://10.0.0.1:80");
        assert_eq!(scalar("auth@file"), "auth@file");
        assert_eq!(scalar("@home"), "\"@home\"");
        assert_eq!(scalar("true"), "\"true\"");
        assert_eq!(scalar("8080"), "\"8080\"");
        assert_eq!(scalar(""), "\"\"");
        assert_eq!(scalar("a: b"), "\"a: b\"");
        assert_eq!(scalar("line\nbreak"), "\"line\\nbreak\"");
        assert_eq!(scalar("say \"hi\""), "say \"hi\"");
        assert_eq!(scalar("\"hi\" \\ x"), "\"\\\"hi\\\" \\\\ x\"");
        assert_eq!(scalar("del\u{7f}"), "\"del\\x7F\"");
        assert_eq!(scalar("a\u{2028}b"), "\"a\\u2028b\"");
        assert_eq!(scalar("héllo"), "héllo");
    }

    #[test]
    fn test_tree_flattens_back() {
        let snap = snapshot(&[
            ("traefik/http/routers/x/entrypoints/0", "web"),
            ("traefik/http/routers/x/rule", "Host(`a`)"),
            ("traefik/http/services/a/loadbalancer/servers/0/url", "http://a"),
        ]);
        assert_eq!(build_tree(&snap).flatten(""), snap);
    }

    fn flatten_yaml(value: &serde_yaml::Value, path: String, out: &mut Snapshot) {
        match value {
            serde_yaml::Value::Mapping(map) => {
                for (k, v) in map {
                    let k = k.as_str().unwrap();
                    flatten_yaml(v, format!("{path}/{k}"), out);
                }
            }
            serde_yaml::Value::Sequence(items) => {
                for (i, v) in items.iter().enumerate() {
                    flatten_yaml(v, format!("{path}/{i}"), out);
                }
            }
            serde_yaml::Value::String(s) => {
                out.insert(path, s.clone());
            }
            other => panic!("unexpected non-string scalar at {path}: {other:?}"),
        }
    }

    #[test]
    fn test_document_round_trip() {
        let snap = snapshot(&[
            ("traefik/http/routers/api_a/entrypoints/0", "web"),
            ("traefik/http/routers/api_a/middlewares/0", "auth@file"),
            ("traefik/http/routers/api_a/rule", "Host(`a.io`) && PathPrefix(`/api`)"),
            ("traefik/http/routers/api_a/service", "a"),
            ("traefik/http/routers/2fa_b/rule", "Path(`/#frag`) || Host(`x: y`)"),
            ("traefik/http/routers/2fa_b/service", "true"),
            ("traefik/http/routers/2fa_b/entrypoints/0", "8443"),
            ("traefik/http/services/a/loadbalancer/servers/0/url", "http://10.0.0.1:8080"),
            ("traefik/tcp/routers/db_a/rule", "HostSNI(`*`)"),
            ("traefik/tcp/routers/db_a/service", "a"),
            ("traefik/tcp/routers/db_a/entrypoints/0", "postgres"),
        ]);

        let tree = build_tree(&snap);
        let doc = TreeWriter::default().render(tree.child(&Segment::Name("traefik".into())).unwrap());

        let parsed: serde_yaml::Value = serde_yaml::from_str(&doc).unwrap();
        let mut flattened = Snapshot::new();
        flatten_yaml(&parsed, "traefik".to_string(), &mut flattened);
        assert_eq!(flattened, snap);
    }

    fn round_trip(snap: &Snapshot) -> Snapshot {
        let tree = build_tree(snap);
        let doc = TreeWriter::default().render(tree.child(&Segment::Name("traefik".into())).unwrap());
        let parsed: serde_yaml::Value = serde_yaml::from_str(&doc).unwrap();
        let mut flattened = Snapshot::new();
        flatten_yaml(&parsed, "traefik".to_string(), &mut flattened);
        flattened
    }

    #[test]
    fn test_numeric_segments_with_distinct_text_stay_apart() {
        let snap = snapshot(&[
            ("traefik/http/routers/007/rule", "a"),
            ("traefik/http/routers/7/rule", "b"),
        ]);
        assert_eq!(build_tree(&snap).flatten(""), snap);
        assert_eq!(round_trip(&snap), snap);
    }

    #[test]
    fn test_numeric_key_beside_names_renders_as_mapping() {
        let snap = snapshot(&[
            ("traefik/http/services/1/loadbalancer/servers/0/url", "http://10.0.0.1"),
            ("traefik/http/services/edge/loadbalancer/servers/0/url", "http://10.0.0.2"),
        ]);
        let tree = build_tree(&snap);
        let doc = TreeWriter::new(2).render(tree.child(&Segment::Name("traefik".into())).unwrap());
        assert!(doc.contains("    \"1\":\n"));
        assert_eq!(round_trip(&snap), snap);
    }

    #[test]
    fn test_sparse_slots_render_as_mapping() {
        let snap = snapshot(&[("traefik/http/routers/r/entrypoints/1", "web")]);
        assert_eq!(round_trip(&snap), snap);
    }

    #[test]
    fn test_non_printable_values_round_trip() {
        let snap = snapshot(&[
            ("traefik/http/routers/r/rule", "Host(`a`)\u{7f}"),
            ("traefik/http/routers/r/service", "a\u{2028}b\u{2029}c"),
            ("traefik/http/routers/s/rule", "tab\there \\ \"q\" \u{85}\u{feff}\u{1}"),
        ]);
        assert_eq!(round_trip(&snap), snap);
    }
}
