//! Loading TLS material referenced by [`TlsConfig`].
//!
//! Two on-disk formats are accepted:
//!
//! - a PEM bundle: the client certificate first, then any CA certificates,
//!   and at most one private key, in any order
//! - a JSON bundle: `{"certificate": "...", "private_key": "...", "ca_chain": ["..."]}`
//!   where each field holds PEM text
//!
//! When both are configured the PEM bundle wins. When neither is, TLS is used
//! with no client certificate.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::config::{TlsConfig, TlsVersion};
use crate::error::{SessionError, SessionResult};

/// Decoded TLS material handed to the driver. Certificates are DER.
#[derive(Clone, Default)]
pub struct TlsMaterial {
    pub certificate: Option<Vec<u8>>,
    pub private_key: Option<Vec<u8>>,
    pub ca_chain: Vec<Vec<u8>>,
    pub skip_verify: bool,
    pub min_version: TlsVersion,
}

#[derive(Deserialize)]
struct JsonBundle {
    #[serde(default)]
    certificate: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
    #[serde(default)]
    ca_chain: Vec<String>,
}

impl TlsMaterial {
    /// Read and decode the material named by `config`.
    pub fn load(config: &TlsConfig) -> SessionResult<Self> {
        let mut material = if let Some(path) = &config.pem_bundle_file {
            Self::from_pem_bundle(&read_file(path)?)?
        } else if let Some(path) = &config.pem_json_file {
            Self::from_json_bundle(&read_file(path)?)?
        } else {
            Self::default()
        };
        material.skip_verify = config.skip_verify;
        material.min_version = config.min_version;
        tracing::debug!(
            has_certificate = material.certificate.is_some(),
            ca_count = material.ca_chain.len(),
            min_version = ?material.min_version,
            "loaded TLS material"
        );
        Ok(material)
    }

    /// Decode a PEM bundle.
    pub fn from_pem_bundle(contents: &str) -> SessionResult<Self> {
        let blocks = pem::parse_many(contents)
            .map_err(|e| SessionError::Tls(format!("invalid PEM bundle: {e}")))?;
        if blocks.is_empty() {
            return Err(SessionError::Tls("PEM bundle contains no blocks".into()));
        }

        let mut material = Self::default();
        for block in blocks {
            match block.tag() {
                "CERTIFICATE" => {
                    if material.certificate.is_none() {
                        material.certificate = Some(block.contents().to_vec());
                    } else {
                        material.ca_chain.push(block.contents().to_vec());
                    }
                }
                tag if tag.ends_with("PRIVATE KEY") => {
                    if material.private_key.is_some() {
                        return Err(SessionError::Tls(
                            "PEM bundle contains more than one private key".into(),
                        ));
                    }
                    material.private_key = Some(block.contents().to_vec());
                }
                other => {
                    return Err(SessionError::Tls(format!(
                        "unexpected PEM block {other:?} in bundle"
                    )))
                }
            }
        }
        material.validate()?;
        Ok(material)
    }

    /// Decode a JSON bundle.
    pub fn from_json_bundle(contents: &str) -> SessionResult<Self> {
        let bundle: JsonBundle = serde_json::from_str(contents)
            .map_err(|e| SessionError::Tls(format!("invalid JSON bundle: {e}")))?;
        let material = Self {
            certificate: bundle
                .certificate
                .as_deref()
                .map(|pem| decode_one(pem, "certificate"))
                .transpose()?,
            private_key: bundle
                .private_key
                .as_deref()
                .map(|pem| decode_one(pem, "private_key"))
                .transpose()?,
            ca_chain: bundle
                .ca_chain
                .iter()
                .map(|pem| decode_one(pem, "ca_chain"))
                .collect::<SessionResult<_>>()?,
            ..Default::default()
        };
        material.validate()?;
        Ok(material)
    }

    fn validate(&self) -> SessionResult<()> {
        if self.private_key.is_some() && self.certificate.is_none() {
            return Err(SessionError::Tls(
                "private key supplied without a certificate".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("has_certificate", &self.certificate.is_some())
            .field("has_private_key", &self.private_key.is_some())
            .field("ca_count", &self.ca_chain.len())
            .field("skip_verify", &self.skip_verify)
            .field("min_version", &self.min_version)
            .finish()
    }
}

fn read_file(path: &Path) -> SessionResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| SessionError::Tls(format!("cannot read {}: {e}", path.display())))
}

fn decode_one(text: &str, field: &str) -> SessionResult<Vec<u8>> {
    pem::parse(text)
        .map(|block| block.contents().to_vec())
        .map_err(|e| SessionError::Tls(format!("invalid PEM in '{field}': {e}")))
}
