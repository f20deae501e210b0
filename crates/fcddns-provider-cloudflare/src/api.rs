// Cloudflare API v4 client and the zone-scoped record backend.
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use fcddns_core::{DnsRecord, Error, RecordBackend, RecordStatus, Result};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

/// Envelope every Cloudflare v4 response is wrapped in
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Zone {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Record {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
}

impl From<Record> for DnsRecord {
    fn from(record: Record) -> Self {
        // Cloudflare has no paused records; everything listed is served
        DnsRecord {
            id: record.id,
            record_type: record.record_type,
            name: record.name,
            value: record.content,
            status: RecordStatus::Enabled,
        }
    }
}

const PROVIDER: &str = "cloudflare";

fn failed(message: impl Into<String>) -> Error {
    Error::provider(PROVIDER, message)
}

/// Authenticated Cloudflare API client
pub struct CloudflareClient {
    pub(crate) http: reqwest::Client,
    /// ⚠️ NEVER log this value
    pub(crate) api_token: String,
    pub(crate) base_url: String,
}

impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareClient {
    /// Send one request and unwrap the v4 envelope
    ///
    /// A rejected token (401/403) is an authentication error; everything
    /// else is a provider error.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Cloudflare {} {}", method, path);

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.api_token)
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| failed(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(Error::auth(status_error(status, &text)));
        }
        if !status.is_success() {
            return Err(failed(status_error(status, &text)));
        }

        let envelope: Envelope<T> = serde_json::from_str(&text)
            .map_err(|e| failed(format!("Failed to parse response: {e}")))?;
        if !envelope.success {
            return Err(failed(api_errors(&envelope.errors)));
        }

        envelope
            .result
            .ok_or_else(|| failed("Invalid response format: result is missing"))
    }

    /// Resolve a zone name to its ID
    pub(crate) async fn zone_id(&self, domain: &str) -> Result<String> {
        let zones: Vec<Zone> = self
            .call(Method::GET, "/zones", &[("name", domain)], None)
            .await?;

        zones
            .into_iter()
            .find(|zone| zone.name == domain)
            .map(|zone| zone.id)
            .ok_or_else(|| failed(format!("Zone not found: {domain}")))
    }
}

/// Maps a non-2xx status to a message
pub(crate) fn status_error(status: StatusCode, body: &str) -> String {
    match status.as_u16() {
        401 | 403 => format!("Invalid API token or insufficient permissions. Status: {status}"),
        404 => format!("Not found. Status: {status}"),
        409 => format!("Conflict: Record is being updated by another process. Status: {status}"),
        429 => format!("Rate limit exceeded. Please retry later. Status: {status}"),
        500..=599 => format!("Cloudflare server error (transient): {status} - {body}"),
        _ => format!("Request failed: {status} - {body}"),
    }
}

fn api_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "Cloudflare reported failure without details".to_string();
    }

    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Record primitives scoped to one zone
pub(crate) struct ZoneBackend<'a> {
    pub client: &'a CloudflareClient,
    pub zone_id: String,
}

impl ZoneBackend<'_> {
    fn records_path(&self) -> String {
        format!("/zones/{}/dns_records", self.zone_id)
    }
}

#[async_trait]
impl RecordBackend for ZoneBackend<'_> {
    async fn list_a_records(&self, _domain: &str, fqdn: &str) -> Result<Vec<DnsRecord>> {
        let records: Vec<Record> = self
            .client
            .call(
                Method::GET,
                &self.records_path(),
                &[("type", "A"), ("name", fqdn)],
                None,
            )
            .await?;

        Ok(records.into_iter().map(DnsRecord::from).collect())
    }

    async fn create_a_record(&self, domain: &str, host: &str, ip: &str) -> Result<()> {
        let payload = json!({
            "type": "A",
            "name": fcddns_core::fqdn(host, domain),
            "content": ip,
            // 1 means automatic
            "ttl": 1,
            "proxied": false,
        });

        let _: serde_json::Value = self
            .client
            .call(Method::POST, &self.records_path(), &[], Some(payload))
            .await?;
        Ok(())
    }

    async fn update_a_record(&self, record: &DnsRecord, ip: &str) -> Result<()> {
        let payload = json!({
            "type": "A",
            "name": record.name,
            "content": ip,
        });

        let path = format!("{}/{}", self.records_path(), record.id);
        let _: serde_json::Value = self
            .client
            .call(Method::PATCH, &path, &[], Some(payload))
            .await?;
        Ok(())
    }
}
