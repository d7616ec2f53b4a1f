use crate::error::{CertTreeError, Result};

/// PEM label of X.509 certificates.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Concatenates PEM blocks into one trust-chain bundle, preserving order.
pub fn concat_pem<S: AsRef<str>>(blocks: &[S]) -> String {
    let mut bundle = String::new();
    for block in blocks {
        let block = block.as_ref();
        bundle.push_str(block);
        if !block.ends_with('\n') {
            bundle.push('\n');
        }
    }
    bundle
}

/// Splits a bundle into the DER bodies of its certificates, in file order.
pub fn certificates_from_bundle(bundle: &str) -> Result<Vec<Vec<u8>>> {
    pem::parse_many(bundle)?
        .into_iter()
        .map(|block| {
            if block.tag() == CERTIFICATE_LABEL {
                Ok(block.into_contents())
            } else {
                Err(CertTreeError::DecodingError(format!(
                    "Unexpected PEM block {} in certificate bundle",
                    block.tag()
                )))
            }
        })
        .collect()
}
