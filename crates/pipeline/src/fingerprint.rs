//! Batch fingerprints for the generation cache.
//!
//! Two submissions of the same diagram share a fingerprint when they differ
//! only in line endings, surrounding blanks, indentation between tags,
//! attribute order, misspelled `bpmn:` prefixes or empty elements written
//! as open/close pairs.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use variantflow_core::catalog::VariantDescriptor;
use variantflow_core::hashing::sha256_hex_parts;
use variantflow_core::tier::DiagramType;

static INTER_TAG_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("valid regex"));

/// `bpmns:` and `BPMN:` on tag names and namespace declarations.
static BAD_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(</?|xmlns:)(?:bpmns|BPMN)([:=])").expect("valid regex"));

/// An opening or self-closing tag with only quoted attributes.
static START_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([A-Za-z_][\w:.-]*)((?:\s+[\w:.-]+\s*=\s*(?:"[^"]*"|'[^']*'))*)\s*(/?)>"#)
        .expect("valid regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([\w:.-]+)\s*=\s*("[^"]*"|'[^']*')"#).expect("valid regex")
});

/// An element with nothing between its tags.
static EMPTY_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z_][\w:.-]*)((?:\s[^<>]*)?)></([A-Za-z_][\w:.-]*)>").expect("valid regex")
});

/// Canonical form of a source diagram.
///
/// Unifies line endings, trims, fixes misspelled `bpmn:` prefixes, drops
/// whitespace between tags, sorts attributes by name and collapses empty
/// open/close pairs to self-closing tags. Text content is left alone.
pub fn normalize_source(source: &str) -> String {
    let unified = source.replace("\r\n", "\n").replace('\r', "\n");
    let prefixed = BAD_PREFIX.replace_all(unified.trim(), "${1}bpmn${2}");
    let compact = INTER_TAG_WS.replace_all(&prefixed, "><");
    let sorted = START_TAG.replace_all(&compact, sort_attributes);
    EMPTY_PAIR
        .replace_all(&sorted, |c: &Captures| {
            if c[1] == c[3] {
                format!("<{}{}/>", &c[1], &c[2])
            } else {
                c[0].to_string()
            }
        })
        .into_owned()
}

fn sort_attributes(c: &Captures) -> String {
    let mut attrs: Vec<(&str, &str)> = ATTRIBUTE
        .captures_iter(&c[2])
        .filter_map(|a| Some((a.get(1)?.as_str(), a.get(2)?.as_str())))
        .collect();
    attrs.sort_by(|a, b| a.0.cmp(b.0));

    let mut tag = format!("<{}", &c[1]);
    for (name, value) in attrs {
        tag.push(' ');
        tag.push_str(name);
        tag.push('=');
        tag.push_str(value);
    }
    tag.push_str(&c[3]);
    tag.push('>');
    tag
}

/// SHA-256 over the normalized source, the diagram type and the selected
/// variant ids in order.
pub fn batch_fingerprint(
    source: &str,
    diagram_type: DiagramType,
    variants: &[VariantDescriptor],
) -> String {
    let normalized = normalize_source(source);
    let ids = variants
        .iter()
        .map(|v| v.id)
        .collect::<Vec<_>>()
        .join(",");
    sha256_hex_parts([normalized.as_str(), diagram_type.as_str(), ids.as_str()])
}
