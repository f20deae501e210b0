//! Request path parsing
//!
//! The only routed shape is `/ddns/v1/{token}[/{ip}]`.

use crate::error::{Error, Result};

/// Fixed prefix every update path starts with
pub const PATH_PREFIX: &str = "/ddns/v1/";

/// Token and optional IP override extracted from a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedRequest {
    /// Signed claim token, still unverified
    pub token: String,
    /// Literal IP from the path; wins over the IP claim
    pub ip_override: Option<String>,
}

/// Split an update path into its token and IP override
pub fn parse_path(path: &str) -> Result<RoutedRequest> {
    let rest = path
        .strip_prefix(PATH_PREFIX)
        .ok_or_else(|| Error::bad_path(path))?;

    let mut segments = rest.split('/');
    let token = segments.next().unwrap_or_default();
    if token.is_empty() {
        return Err(Error::bad_path(path));
    }

    let ip_override = segments
        .next()
        .filter(|ip| !ip.is_empty())
        .map(str::to_string);

    Ok(RoutedRequest {
        token: token.to_string(),
        ip_override,
    })
}
