#![forbid(unsafe_code)]

//! XML writing utilities using uppsala's XmlWriter for building the
//! fragments inserted into an envelope.

/// A simple XML writer wrapping uppsala's XmlWriter.
pub struct XmlWriter {
    writer: uppsala::XmlWriter,
}

impl XmlWriter {
    /// Create a new XML writer.
    pub fn new() -> Self {
        Self {
            writer: uppsala::XmlWriter::new(),
        }
    }

    /// Start an element with the given name and attributes.
    pub fn start_element(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.writer.start_element(name, attrs);
    }

    /// Write an empty element.
    pub fn empty_element(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.writer.empty_element(name, attrs);
    }

    /// End the current element.
    pub fn end_element(&mut self, name: &str) {
        self.writer.end_element(name);
    }

    /// Write text content.
    pub fn write_text(&mut self, text: &str) {
        self.writer.text(text);
    }

    /// Write an element holding only `text`.
    pub fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) {
        self.start_element(name, attrs);
        self.write_text(text);
        self.end_element(name);
    }

    /// Finish writing and return the XML as a string.
    pub fn into_string(self) -> String {
        self.writer.into_string()
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}
