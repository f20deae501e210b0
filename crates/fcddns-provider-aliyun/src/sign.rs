// # ACS3-HMAC-SHA256 Request Signing
//
// Alidns is an RPC-style API: every parameter travels in the query string
// and the body is empty. The signature covers the sorted query, the `host`
// header and every `x-acs-*` header, including `x-acs-security-token` when
// STS credentials are used.
//
// Reference: https://www.alibabacloud.com/help/en/sdk/product-overview/v3-request-structure-and-signature

use std::collections::BTreeMap;
use std::fmt::Write;

use fcddns_core::SessionCredentials;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// Alidns API version
pub(crate) const API_VERSION: &str = "2015-01-09";

/// SHA-256 of the empty body
pub(crate) const EMPTY_BODY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

const ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// RFC3986 percent-encoding
pub(crate) fn url_encode(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                let _ = write!(encoded, "%{byte:02X}");
            }
        }
    }
    encoded
}

/// Canonical (sorted, encoded) query string
pub(crate) fn canonical_query(params: &BTreeMap<&str, &str>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", url_encode(k), url_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// One request about to be signed
#[derive(Debug)]
pub(crate) struct SigningInput<'a> {
    pub host: &'a str,
    pub action: &'a str,
    pub query: &'a str,
    pub timestamp: &'a str,
    pub nonce: &'a str,
}

impl SigningInput<'_> {
    /// Headers covered by the signature, sorted by name
    pub(crate) fn signed_headers<'s>(
        &'s self,
        security_token: Option<&'s str>,
    ) -> Vec<(&'static str, &'s str)> {
        let mut headers = vec![
            ("host", self.host),
            ("x-acs-action", self.action),
            ("x-acs-content-sha256", EMPTY_BODY_SHA256),
            ("x-acs-date", self.timestamp),
        ];
        if let Some(token) = security_token {
            headers.push(("x-acs-security-token", token));
        }
        headers.push(("x-acs-signature-nonce", self.nonce));
        headers.push(("x-acs-version", API_VERSION));
        headers
    }
}

/// Compute the `Authorization` header value
pub(crate) fn authorization(
    credentials: &SessionCredentials,
    input: &SigningInput<'_>,
) -> Result<String, String> {
    let headers = input.signed_headers(credentials.security_token.as_deref());

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "POST\n/\n{}\n{canonical_headers}\n{signed_headers}\n{EMPTY_BODY_SHA256}",
        input.query
    );
    tracing::trace!("CanonicalRequest:\n{}", canonical_request);

    let string_to_sign = format!(
        "{ALGORITHM}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let mut mac = Hmac::<Sha256>::new_from_slice(credentials.access_key_secret.as_bytes())
        .map_err(|e| format!("Failed to initialize HMAC: {e}"))?;
    mac.update(string_to_sign.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(format!(
        "{ALGORITHM} Credential={},SignedHeaders={},Signature={}",
        credentials.access_key_id, signed_headers, signature
    ))
}
