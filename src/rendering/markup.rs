//! Import description markup into a `Document`.

use crate::rendering::dom::{Document, NodeId};
use scraper::{ElementRef, Html};

/// How a gallery item's description is placed into the details block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DescriptionPolicy {
    /// Parse as markup and keep only inline formatting: allowlisted tags and
    /// attributes, `http`/`https`/`mailto` or relative URLs.
    #[default]
    Sanitized,
    /// Parse as markup and keep every element and attribute.
    Trusted,
    /// Insert the raw string as a single text node.
    PlainText,
}

// Tags kept by the sanitizer, with the attributes each may carry
const ALLOWED_TAGS: &[(&str, &[&str])] = &[
    ("a", &["href"]),
    ("abbr", &[]),
    ("b", &[]),
    ("blockquote", &[]),
    ("br", &[]),
    ("cite", &[]),
    ("code", &[]),
    ("del", &[]),
    ("em", &[]),
    ("i", &[]),
    ("img", &["src", "alt", "width", "height"]),
    ("li", &[]),
    ("mark", &[]),
    ("ol", &["start"]),
    ("p", &[]),
    ("pre", &[]),
    ("q", &[]),
    ("s", &[]),
    ("small", &[]),
    ("span", &[]),
    ("strong", &[]),
    ("sub", &[]),
    ("sup", &[]),
    ("u", &[]),
    ("ul", &[]),
];

// Allowed on every kept tag
const GLOBAL_ATTRIBUTES: &[&str] = &["title", "lang", "dir"];

const URL_ATTRIBUTES: &[&str] = &["href", "src"];

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

// Dropped with everything inside; other unknown tags are unwrapped
const DROPPED_SUBTREES: &[&str] = &[
    "script", "style", "svg", "math", "iframe", "object", "embed", "frame", "frameset", "template",
    "noscript", "noembed", "noframes", "textarea", "title", "xmp", "select", "head",
];

/// Append the nodes described by `markup` to `parent` according to `policy`.
pub fn insert_markup(doc: &mut Document, parent: NodeId, markup: &str, policy: DescriptionPolicy) {
    if policy == DescriptionPolicy::PlainText {
        let text = doc.create_text(markup);
        doc.append_child(parent, text);
        return;
    }
    let fragment = Html::parse_fragment(markup);
    match policy {
        DescriptionPolicy::Trusted => import_trusted(doc, parent, fragment.root_element()),
        _ => import_sanitized(doc, parent, fragment.root_element()),
    }
}

fn import_trusted(doc: &mut Document, parent: NodeId, source: ElementRef<'_>) {
    for child in source.children() {
        if let Some(text) = child.value().as_text() {
            let node = doc.create_text(&**text);
            doc.append_child(parent, node);
        } else if let Some(el) = ElementRef::wrap(child) {
            let node = doc.create_element(el.value().name());
            for (attr, value) in el.value().attrs() {
                doc.set_attribute(node, attr, value);
            }
            doc.append_child(parent, node);
            import_trusted(doc, node, el);
        }
    }
}

fn import_sanitized(doc: &mut Document, parent: NodeId, source: ElementRef<'_>) {
    for child in source.children() {
        if let Some(text) = child.value().as_text() {
            let node = doc.create_text(&**text);
            doc.append_child(parent, node);
            continue;
        }
        let Some(el) = ElementRef::wrap(child) else {
            // comments and doctypes
            continue;
        };
        let name = el.value().name();
        if DROPPED_SUBTREES.contains(&name) {
            log::debug!("dropping <{}> from description markup", name);
            continue;
        }
        let Some((_, allowed)) = ALLOWED_TAGS.iter().find(|(tag, _)| *tag == name) else {
            log::debug!("unwrapping <{}> in description markup", name);
            import_sanitized(doc, parent, el);
            continue;
        };
        let node = doc.create_element(name);
        for (attr, value) in el.value().attrs() {
            if attribute_allowed(allowed, attr, value) {
                doc.set_attribute(node, attr, value);
            }
        }
        doc.append_child(parent, node);
        import_sanitized(doc, node, el);
    }
}

fn attribute_allowed(allowed: &[&str], name: &str, value: &str) -> bool {
    let name = name.to_ascii_lowercase();
    if !allowed.contains(&name.as_str()) && !GLOBAL_ATTRIBUTES.contains(&name.as_str()) {
        return false;
    }
    !URL_ATTRIBUTES.contains(&name.as_str()) || url_allowed(value)
}

/// Relative URLs pass; absolute ones need an allowlisted scheme.
fn url_allowed(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect();
    let scheme_end = compact.find(|c: char| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(i) if compact[i..].starts_with(':') => {
            let scheme = compact[..i].to_ascii_lowercase();
            ALLOWED_SCHEMES.contains(&scheme.as_str())
        }
        _ => true,
    }
}
