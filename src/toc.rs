//! Table of contents extracted from an XHTML navigation document.
//!
//! Real-world navigation markup is loose: the `nav` element may or may
//! not be namespace-qualified, anchors may carry their label as direct
//! text, in a `toc-label` child, or buried somewhere in the subtree.
//! Everything here degrades instead of failing; the worst outcome is an
//! empty toc or an entry without a bound resource, reported through
//! [`TocDiagnostic`] values.

use std::collections::HashMap;

use crate::doc::Resource;
use crate::xmlutils::{XMLElement, XMLNode};

/// Namespace of the `epub:nav` element in EPUB 3 navigation documents.
pub const EPUB_OPS_NAMESPACE: &str = "http://www.idpf.org/2007/ops";

const FRAGMENT_SEPARATOR: char = '#';
const TOC_LABEL_CLASS: &str = "toc-label";

/// Non-fatal conditions found while extracting the toc.
///
/// None of these stop the extraction or the loading of the book; they
/// are collected and handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TocDiagnostic {
    #[error("no nav element found in the navigation document")]
    NavigationNotFound,
    #[error("nav element contains no ol list")]
    ListNotFound,
    #[error("navigation document could not be parsed: {0}")]
    MarkupParseError(String),
    #[error("resource with href {href} in XHTML TOC document not found")]
    UnresolvedReference { href: String },
}

/// One entry of the table of contents.
///
/// Built fully formed from its source anchor; the title is never
/// rewritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocReference {
    /// the title of this entry, may be empty
    pub title: String,
    /// the resource the href points to, absent when the href isn't in
    /// the book manifest
    pub resource: Option<Resource>,
    /// the part of the href after '#', absent when there's no fragment
    pub fragment: Option<String>,
}

/// The book table of contents, entries in document order of their
/// source anchors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOfContents {
    pub references: Vec<TocReference>,
}

impl TableOfContents {
    pub fn new(references: Vec<TocReference>) -> Self {
        Self { references }
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TocReference> {
        self.references.iter()
    }

    /// Returns the resources referenced from the toc, deduplicated by
    /// href, in order of first appearance.
    pub fn unique_resources(&self) -> Vec<&Resource> {
        let mut seen: Vec<&Resource> = vec![];
        for reference in &self.references {
            if let Some(resource) = &reference.resource {
                if !seen.iter().any(|r| r.href == resource.href) {
                    seen.push(resource);
                }
            }
        }
        seen
    }
}

impl<'a> IntoIterator for &'a TableOfContents {
    type Item = &'a TocReference;
    type IntoIter = std::slice::Iter<'a, TocReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.references.iter()
    }
}

/// Result of walking a navigation list: the references found plus any
/// diagnostic raised along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocParse {
    pub references: Vec<TocReference>,
    pub diagnostics: Vec<TocDiagnostic>,
}

/// Locates the top `ol` of the navigation list under `root`.
///
/// A namespace-qualified `<epub:nav>` wins over a plain `<nav>`; a lot
/// of books only carry the plain one. Both "no nav" and "nav without
/// list" are legitimate terminal states, reported as the matching
/// diagnostic.
///
/// # Errors
///
/// Returns [`TocDiagnostic::NavigationNotFound`] or
/// [`TocDiagnostic::ListNotFound`].
pub fn find_nav_list(root: &XMLElement) -> Result<&XMLElement, TocDiagnostic> {
    let nav = root
        .find_ns(EPUB_OPS_NAMESPACE, "nav")
        .or_else(|| root.find("nav"))
        .ok_or(TocDiagnostic::NavigationNotFound)?;
    nav.find("ol").ok_or(TocDiagnostic::ListNotFound)
}

/// Walks the direct children of the top `ol` element and builds one
/// [`TocReference`] per anchor found in its `li` items.
///
/// Only one list level is processed: a nested `ol` under a list item is
/// not descended into, so sub-toc levels don't show up in the result.
pub fn parse_toc_list(top_ol: &XMLElement, resources: &HashMap<String, Resource>) -> TocParse {
    let mut parse = TocParse::default();
    for child in top_ol.child_elements() {
        if child.name.local_name == "li" {
            read_toc_references(child, resources, &mut parse);
        }
    }
    parse
}

/// Scans the direct children of one `li` element. Every `a` child
/// yields a reference, in the order encountered.
fn read_toc_references(
    li: &XMLElement,
    resources: &HashMap<String, Resource>,
    parse: &mut TocParse,
) {
    for anchor in li.child_elements() {
        if anchor.name.local_name != "a" {
            continue;
        }

        let reference = anchor.get_attr("href").unwrap_or_default();
        let (href, fragment) = split_fragment(&reference);
        let title = resolve_title(anchor);

        let resource = resources.get(href).cloned();
        if resource.is_none() {
            parse.diagnostics.push(TocDiagnostic::UnresolvedReference {
                href: href.to_string(),
            });
        }

        parse.references.push(TocReference {
            title,
            resource,
            fragment: fragment.map(String::from),
        });
    }
}

/// Splits a raw href at the first fragment separator. The fragment is
/// absent when there's no separator or nothing follows it.
fn split_fragment(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once(FRAGMENT_SEPARATOR) {
        Some((href, fragment)) if !fragment.is_empty() => (href, Some(fragment)),
        Some((href, _)) => (href, None),
        None => (reference, None),
    }
}

type TitleStage = fn(&XMLElement) -> Option<String>;

/// The fallback chain for anchor titles, in the order tried.
const TITLE_STAGES: [TitleStage; 4] = [
    shallow_text,
    labeled_child_text,
    first_child_text,
    deep_text,
];

/// Derives a human-readable title from an anchor element, trying each
/// stage in turn and keeping the first non-empty result. When every
/// stage comes up empty the title is the empty string.
fn resolve_title(anchor: &XMLElement) -> String {
    TITLE_STAGES
        .iter()
        .find_map(|stage| stage(anchor))
        .unwrap_or_default()
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Direct text children of the anchor itself.
fn shallow_text(anchor: &XMLElement) -> Option<String> {
    non_empty(&anchor.text_children_content())
}

/// First direct child element classed `toc-label`, whole subtree text.
fn labeled_child_text(anchor: &XMLElement) -> Option<String> {
    let label = anchor
        .child_elements()
        .find(|child| child.get_attr("class").as_deref() == Some(TOC_LABEL_CLASS))?;
    non_empty(&label.deep_text_content())
}

/// Only the first child node: its value if text, its direct text if an
/// element.
fn first_child_text(anchor: &XMLElement) -> Option<String> {
    match anchor.children.first()? {
        XMLNode::Text(text) => non_empty(text),
        XMLNode::Element(element) => non_empty(&element.text_children_content()),
    }
}

/// Whatever text is in there, however deep.
fn deep_text(anchor: &XMLElement) -> Option<String> {
    non_empty(&anchor.deep_text_content())
}
