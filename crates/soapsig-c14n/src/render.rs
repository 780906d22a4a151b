#![forbid(unsafe_code)]

//! Namespace declarations and attributes as they appear in canonical output.

use crate::escape;
use std::cmp::Ordering;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    /// The namespace URI ("" undeclares the default namespace).
    pub uri: String,
}

impl NsDecl {
    /// Append ` xmlns:prefix="uri"` to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b" xmlns");
        if !self.prefix.is_empty() {
            out.push(b':');
            out.extend_from_slice(self.prefix.as_bytes());
        }
        write_value(out, &self.uri);
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> Ordering {
        // The default namespace sorts first since "" < any prefix.
        self.prefix.cmp(&other.prefix)
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// The namespace URI of the attribute ("" for no namespace).
    pub ns_uri: String,
    /// The local name.
    pub local_name: String,
    /// The qualified name as written in the source.
    pub qualified_name: String,
    /// The attribute value.
    pub value: String,
}

impl Attr {
    /// Append ` name="value"` to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(b' ');
        out.extend_from_slice(self.qualified_name.as_bytes());
        write_value(out, &self.value);
    }
}

impl Ord for Attr {
    fn cmp(&self, other: &Self) -> Ordering {
        // Unqualified attributes first, by local name; then qualified ones
        // by (namespace URI, local name).
        (!self.ns_uri.is_empty(), &self.ns_uri, &self.local_name).cmp(&(
            !other.ns_uri.is_empty(),
            &other.ns_uri,
            &other.local_name,
        ))
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn write_value(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(b"=\"");
    out.extend_from_slice(escape::escape_attr(value).as_bytes());
    out.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(ns_uri: &str, qname: &str) -> Attr {
        Attr {
            ns_uri: ns_uri.to_owned(),
            local_name: qname.rsplit(':').next().unwrap().to_owned(),
            qualified_name: qname.to_owned(),
            value: "v".to_owned(),
        }
    }

    fn render(write: impl Fn(&mut Vec<u8>)) -> String {
        let mut out = Vec::new();
        write(&mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_attr_sort_uses_namespace_not_prefix() {
        let mut attrs = vec![
            attr("urn:b", "a:x"),
            attr("urn:a", "z:y"),
            attr("", "b"),
            attr("", "a"),
        ];
        attrs.sort();
        let names: Vec<&str> = attrs.iter().map(|a| a.qualified_name.as_str()).collect();
        assert_eq!(names, ["a", "b", "z:y", "a:x"]);
    }

    #[test]
    fn test_ns_decl_render_and_order() {
        let mut decls = vec![
            NsDecl {
                prefix: "wsu".into(),
                uri: "urn:u".into(),
            },
            NsDecl {
                prefix: String::new(),
                uri: String::new(),
            },
        ];
        decls.sort();
        assert_eq!(render(|o| decls[0].write_to(o)), " xmlns=\"\"");
        assert_eq!(render(|o| decls[1].write_to(o)), " xmlns:wsu=\"urn:u\"");
    }

    #[test]
    fn test_attr_value_escaped() {
        let mut a = attr("", "t");
        a.value = "1\t\"2\"".into();
        assert_eq!(render(|o| a.write_to(o)), " t=\"1&#x9;&quot;2&quot;\"");
    }
}
