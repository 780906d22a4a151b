#![forbid(unsafe_code)]

//! XML document wrapper over uppsala with ID attribute registration.

use soapsig_core::{ns, Error};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uppsala::{Document, NodeId, NodeKind};

/// An owned XML document.  Stores the text and pre-computed metadata.
///
/// To work with the parsed tree, call [`XmlDocument::parse_doc`] which
/// returns a temporary `uppsala::Document` borrowing from the text.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    text: String,
    /// Additional ID attribute names to register (beyond `Id` and
    /// `wsu:Id`).  Either a plain local name or `{namespace}local`.
    extra_id_attrs: Vec<String>,
}

impl XmlDocument {
    /// Parse and validate XML from a string, taking ownership.
    ///
    /// Documents carrying a DTD are rejected.
    pub fn parse(text: String) -> Result<Self, Error> {
        crate::parse_tree(&text)?;
        Ok(Self {
            text,
            extra_id_attrs: Vec::new(),
        })
    }

    /// Parse and validate XML from bytes.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?
            .to_owned();
        Self::parse(text)
    }

    /// Get the raw XML text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the document and return its text.
    pub fn into_text(self) -> String {
        self.text
    }

    /// Register an additional ID attribute name.
    pub fn add_id_attr(&mut self, name: &str) {
        if !self.extra_id_attrs.iter().any(|n| n == name) {
            self.extra_id_attrs.push(name.to_owned());
        }
    }

    /// Parse the document and return a temporary `uppsala::Document`.
    ///
    /// Call this once per processing phase and pass the resulting
    /// document reference down through the call chain.
    pub fn parse_doc(&self) -> Result<Document<'_>, Error> {
        crate::parse(&self.text)
    }

    /// Parse the document into a positional `roxmltree` tree.
    pub fn parse_tree(&self) -> Result<roxmltree::Document<'_>, Error> {
        crate::parse_tree(&self.text)
    }

    /// Build the ID → NodeId mapping for a parsed document.
    ///
    /// A value carried by more than one element is kept out of the map and
    /// only fails when something tries to resolve it.
    pub fn build_id_map(&self, doc: &Document<'_>) -> IdMap {
        let mut map = IdMap::default();
        for id in doc.descendants(doc.root()) {
            let Some(elem) = doc.element(id) else {
                continue;
            };
            for attr in &elem.attributes {
                let namespace = attr.name.namespace_uri.as_deref().filter(|u| !u.is_empty());
                if self.is_id_attr(namespace, &attr.name.local_name) {
                    map.insert(attr.value.to_string(), id);
                }
            }
        }
        map
    }

    fn is_id_attr(&self, namespace: Option<&str>, local_name: &str) -> bool {
        match namespace {
            None if local_name == ns::attr::ID => return true,
            Some(ns::WSU) if local_name == ns::attr::ID => return true,
            _ => {}
        }
        self.extra_id_attrs.iter().any(|name| match name.strip_prefix('{') {
            Some(clark) => match clark.split_once('}') {
                Some((uri, local)) => namespace == Some(uri) && local_name == local,
                None => false,
            },
            None => namespace.is_none() && local_name == name,
        })
    }
}

/// Registered ID values of a parsed document.
#[derive(Default)]
pub struct IdMap {
    ids: HashMap<String, NodeId>,
    ambiguous: HashSet<String>,
}

impl IdMap {
    fn insert(&mut self, value: String, node: NodeId) {
        match self.ids.get(&value) {
            Some(existing) if *existing != node => {
                debug!(id = %value, "ID value carried by more than one element");
                self.ambiguous.insert(value);
            }
            Some(_) => {}
            None => {
                self.ids.insert(value, node);
            }
        }
    }

    /// The element carrying `id`, unless the value is missing or ambiguous.
    pub fn get(&self, id: &str) -> Option<NodeId> {
        if self.ambiguous.contains(id) {
            return None;
        }
        self.ids.get(id).copied()
    }

    /// Like [`IdMap::get`], reporting why a value does not resolve.
    pub fn resolve(&self, id: &str) -> Result<NodeId, Error> {
        if self.ambiguous.contains(id) {
            return Err(Error::InvalidUri(format!("ambiguous ID: {id}")));
        }
        self.get(id)
            .ok_or_else(|| Error::InvalidUri(format!("ID not found: {id}")))
    }

    /// Whether more than one element carries `id`.
    pub fn is_ambiguous(&self, id: &str) -> bool {
        self.ambiguous.contains(id)
    }

    /// Number of distinct ID values seen.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Whether `id` is an element with the given namespace and local name.
pub fn is_element(doc: &Document<'_>, id: NodeId, ns: &str, local_name: &str) -> bool {
    doc.element(id).is_some_and(|elem| {
        elem.name.local_name == local_name && elem.name.namespace_uri.as_deref().unwrap_or("") == ns
    })
}

/// The namespace URI and local name of an element.
pub fn expanded_name(doc: &Document<'_>, id: NodeId) -> Option<(Option<String>, String)> {
    let elem = doc.element(id)?;
    Some((
        elem.name.namespace_uri.as_deref().map(str::to_owned),
        elem.name.local_name.to_string(),
    ))
}

/// The value of attribute `{namespace}local_name` on an element.
pub fn attribute<'d>(
    doc: &'d Document<'_>,
    id: NodeId,
    namespace: Option<&str>,
    local_name: &str,
) -> Option<&'d str> {
    doc.element(id)?
        .attributes
        .iter()
        .find(|a| {
            a.name.namespace_uri.as_deref().filter(|u| !u.is_empty()) == namespace
                && a.name.local_name == local_name
        })
        .map(|a| &*a.value)
}

/// Concatenated text and CDATA children of an element.
pub fn text_content(doc: &Document<'_>, id: NodeId) -> String {
    let mut out = String::new();
    for child in doc.children(id) {
        if let Some(NodeKind::Text(text)) | Some(NodeKind::CData(text)) = doc.node_kind(child) {
            out.push_str(text);
        }
    }
    out
}

/// Find the first descendant element with the given local name and namespace.
pub fn find_element(doc: &Document<'_>, ns: &str, local_name: &str) -> Option<NodeId> {
    doc.descendants(doc.root())
        .into_iter()
        .find(|id| is_element(doc, *id, ns, local_name))
}

/// Find all descendant elements with the given local name and namespace.
pub fn find_elements(doc: &Document<'_>, ns: &str, local_name: &str) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .into_iter()
        .filter(|id| is_element(doc, *id, ns, local_name))
        .collect()
}

/// Find the first child element with the given local name and namespace.
pub fn find_child_element(
    doc: &Document<'_>,
    parent: NodeId,
    ns: &str,
    local_name: &str,
) -> Option<NodeId> {
    doc.children(parent)
        .into_iter()
        .find(|id| is_element(doc, *id, ns, local_name))
}

/// Find all child elements with the given local name and namespace.
pub fn find_child_elements(
    doc: &Document<'_>,
    parent: NodeId,
    ns: &str,
    local_name: &str,
) -> Vec<NodeId> {
    doc.children(parent)
        .into_iter()
        .filter(|id| is_element(doc, *id, ns, local_name))
        .collect()
}
