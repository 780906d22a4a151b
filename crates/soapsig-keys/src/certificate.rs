#![forbid(unsafe_code)]

//! Human-readable summary of an X.509 certificate.

use der::Decode;
use soapsig_core::Error;
use x509_cert::Certificate;

/// Subject, issuer, serial and validity window of a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    /// Serial number as lowercase hex.
    pub serial: String,
    pub not_before: String,
    pub not_after: String,
}

impl CertificateInfo {
    /// Summarize a DER-encoded certificate.
    pub fn from_der(data: &[u8]) -> Result<Self, Error> {
        let cert = Certificate::from_der(data)
            .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
        let tbs = &cert.tbs_certificate;
        Ok(Self {
            subject: tbs.subject.to_string(),
            issuer: tbs.issuer.to_string(),
            serial: tbs
                .serial_number
                .as_bytes()
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect(),
            not_before: tbs.validity.not_before.to_date_time().to_string(),
            not_after: tbs.validity.not_after.to_date_time().to_string(),
        })
    }

    /// Whether the certificate is self-signed (subject equals issuer).
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }
}
