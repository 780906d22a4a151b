#![forbid(unsafe_code)]

//! Transform pipeline and trait definitions.

use soapsig_xml::{Document, NodeId};
use soapsig_c14n::C14nMode;
use soapsig_core::{ns, Error};
use soapsig_xml::{document, NodeSet};

/// Data flowing through the transform pipeline.
pub enum TransformData<'a, 'input> {
    /// A node set over a parsed document.
    Xml {
        doc: &'a Document<'input>,
        node_set: Option<NodeSet>,
    },
    /// Raw octets.
    Binary(Vec<u8>),
}

impl<'a, 'input> TransformData<'a, 'input> {
    /// The subtree rooted at `node`, without comments.
    pub fn subtree(doc: &'a Document<'input>, node: NodeId) -> Self {
        TransformData::Xml {
            doc,
            node_set: Some(NodeSet::tree_without_comments(node, doc)),
        }
    }

    /// Convert to octets.
    ///
    /// A node set left over at the end of the chain is serialized with
    /// Exclusive C14N without comments.
    pub fn into_binary(self) -> Result<Vec<u8>, Error> {
        match self {
            TransformData::Binary(data) => Ok(data),
            TransformData::Xml { doc, node_set } => {
                soapsig_c14n::canonicalize_doc(doc, C14nMode::Exclusive, node_set.as_ref(), &[])
            }
        }
    }
}

/// Trait for individual transforms.
pub trait Transform: Send + Sync {
    /// The algorithm URI for this transform.
    fn uri(&self) -> &str;

    /// Execute the transform on the given data.
    fn execute<'a, 'input>(
        &self,
        input: TransformData<'a, 'input>,
    ) -> Result<TransformData<'a, 'input>, Error>;
}

/// A pipeline of transforms executed in sequence.
#[derive(Default)]
pub struct TransformPipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the pipeline declared by a `ds:Transforms` element.
    ///
    /// A missing `Transforms` element yields an empty pipeline.
    pub fn from_transforms_node(
        doc: &Document<'_>,
        transforms: Option<NodeId>,
    ) -> Result<Self, Error> {
        let mut pipeline = Self::new();
        let Some(transforms) = transforms else {
            return Ok(pipeline);
        };
        for transform in
            document::find_child_elements(doc, transforms, ns::DSIG, ns::node::TRANSFORM)
        {
            let uri = document::attribute(doc, transform, None, ns::attr::ALGORITHM)
                .ok_or_else(|| {
                    Error::MissingAttribute(format!("{} on Transform", ns::attr::ALGORITHM))
                })?;
            let mode = C14nMode::from_uri(uri)
                .ok_or_else(|| Error::UnsupportedAlgorithm(format!("transform: {uri}")))?;
            pipeline.push(Box::new(C14nTransform::new(
                mode,
                read_inclusive_prefixes(doc, transform),
            )));
        }
        Ok(pipeline)
    }

    /// Add a transform to the pipeline.
    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Execute all transforms in order.
    pub fn execute<'a, 'input>(
        &self,
        input: TransformData<'a, 'input>,
    ) -> Result<TransformData<'a, 'input>, Error> {
        let mut data = input;
        for transform in &self.transforms {
            data = transform.execute(data)?;
        }
        Ok(data)
    }

    /// Number of transforms in the pipeline.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Check if pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

/// Read the `PrefixList` of an `ec:InclusiveNamespaces` child of `node`.
pub fn read_inclusive_prefixes(doc: &Document<'_>, node: NodeId) -> Vec<String> {
    document::find_child_element(doc, node, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|inc| document::attribute(doc, inc, None, ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

// ── C14N Transform ───────────────────────────────────────────────────

/// A canonicalization transform.
pub struct C14nTransform {
    mode: C14nMode,
    inclusive_prefixes: Vec<String>,
}

impl C14nTransform {
    pub fn new(mode: C14nMode, inclusive_prefixes: Vec<String>) -> Self {
        Self {
            mode,
            inclusive_prefixes,
        }
    }

    pub fn inclusive_prefixes(&self) -> &[String] {
        &self.inclusive_prefixes
    }
}

impl Transform for C14nTransform {
    fn uri(&self) -> &str {
        self.mode.uri()
    }

    fn execute<'a, 'input>(
        &self,
        input: TransformData<'a, 'input>,
    ) -> Result<TransformData<'a, 'input>, Error> {
        match input {
            TransformData::Xml { doc, node_set } => {
                let bytes = soapsig_c14n::canonicalize_doc(
                    doc,
                    self.mode,
                    node_set.as_ref(),
                    &self.inclusive_prefixes,
                )?;
                Ok(TransformData::Binary(bytes))
            }
            TransformData::Binary(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| Error::Transform(format!("invalid UTF-8: {e}")))?;
                let bytes =
                    soapsig_c14n::canonicalize(text, self.mode, None, &self.inclusive_prefixes)?;
                Ok(TransformData::Binary(bytes))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNED: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" xmlns:urn="urn:svc" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:ec="http://www.w3.org/2001/10/xml-exc-c14n#">
  <ds:Transforms>
    <ds:Transform Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#">
      <ec:InclusiveNamespaces PrefixList="urn  s"/>
    </ds:Transform>
  </ds:Transforms>
  <s:Body><urn:op>x</urn:op></s:Body>
</s:Envelope>"#;

    fn find(doc: &Document<'_>, local: &str) -> NodeId {
        doc.descendants(doc.root())
            .into_iter()
            .find(|id| doc.element(*id).is_some_and(|e| e.name.local_name == local))
            .unwrap()
    }

    #[test]
    fn test_from_transforms_node() {
        let doc = soapsig_xml::parse(SIGNED).unwrap();
        let pipeline = TransformPipeline::from_transforms_node(&doc, Some(find(&doc, "Transforms"))).unwrap();
        assert_eq!(pipeline.len(), 1);
        assert_eq!(
            read_inclusive_prefixes(&doc, find(&doc, "Transform")),
            vec!["urn".to_owned(), "s".to_owned()]
        );

        let body = find(&doc, "Body");
        let out = pipeline
            .execute(TransformData::subtree(&doc, body))
            .unwrap()
            .into_binary()
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<s:Body xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" xmlns:urn="urn:svc"><urn:op>x</urn:op></s:Body>"#
        );
    }

    #[test]
    fn test_empty_pipeline_defaults_to_exclusive() {
        let doc = soapsig_xml::parse(SIGNED).unwrap();
        let pipeline = TransformPipeline::from_transforms_node(&doc, None).unwrap();
        assert!(pipeline.is_empty());
        let out = pipeline
            .execute(TransformData::subtree(&doc, find(&doc, "Body")))
            .unwrap()
            .into_binary()
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<s:Body xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><urn:op xmlns:urn="urn:svc">x</urn:op></s:Body>"#
        );
    }

    #[test]
    fn test_unsupported_transform() {
        let xml = r#"<ds:Transforms xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/></ds:Transforms>"#;
        let doc = soapsig_xml::parse(xml).unwrap();
        assert!(matches!(
            TransformPipeline::from_transforms_node(&doc, Some(find(&doc, "Transforms"))),
            Err(Error::UnsupportedAlgorithm(_))
        ));

        let xml = r#"<ds:Transforms xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:Transform/></ds:Transforms>"#;
        let doc = soapsig_xml::parse(xml).unwrap();
        assert!(matches!(
            TransformPipeline::from_transforms_node(&doc, Some(find(&doc, "Transforms"))),
            Err(Error::MissingAttribute(_))
        ));
    }
}
