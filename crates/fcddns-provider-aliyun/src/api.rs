// Alidns RPC client and the record backend built on it.
//
// - DescribeSubDomainRecords: list records of one FQDN
// - AddDomainRecord: create a record
// - UpdateDomainRecord: change an existing record

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use fcddns_core::{DnsRecord, Error, RecordBackend, RecordStatus, Result, SessionCredentials};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};

use crate::sign::{self, API_VERSION, EMPTY_BODY_SHA256, SigningInput};

const PROVIDER: &str = "aliyun";

/// Error codes meaning the credentials were rejected
const CREDENTIAL_ERRORS: &[&str] = &[
    "InvalidAccessKeyId.NotFound",
    "InvalidSecurityToken.Expired",
    "InvalidSecurityToken.Malformed",
    "SignatureDoesNotMatch",
];

/// Error body returned with a non-2xx status or in place of a result
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: String,
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        let message = format!("{} ({})", err.message, err.code);
        if CREDENTIAL_ERRORS.contains(&err.code.as_str()) {
            Error::auth(message)
        } else {
            Error::provider(PROVIDER, message)
        }
    }
}

fn failed(message: impl Into<String>) -> Error {
    Error::provider(PROVIDER, message)
}

#[derive(Debug, Deserialize)]
pub(crate) struct DescribeSubDomainRecordsResponse {
    #[serde(rename = "DomainRecords")]
    pub domain_records: Option<RecordsWrapper>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordsWrapper {
    #[serde(rename = "Record", default)]
    pub record: Vec<Record>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Record {
    #[serde(rename = "RecordId")]
    pub record_id: String,
    #[serde(rename = "RR")]
    pub rr: String,
    #[serde(rename = "DomainName")]
    pub domain_name: Option<String>,
    #[serde(rename = "Type")]
    pub record_type: String,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Status")]
    pub status: Option<String>,
}

impl Record {
    fn into_dns_record(self, domain: &str) -> DnsRecord {
        let zone = self.domain_name.as_deref().unwrap_or(domain);
        // A record without a status cannot be shown to be served
        let status = match self.status.as_deref() {
            Some(status) if status.eq_ignore_ascii_case("ENABLE") => RecordStatus::Enabled,
            _ => RecordStatus::Disabled,
        };

        DnsRecord {
            name: fcddns_core::fqdn(&self.rr, zone),
            id: self.record_id,
            record_type: self.record_type,
            value: self.value,
            status,
        }
    }
}

/// Signed Alidns client bound to one set of credentials
pub struct AliyunClient {
    pub(crate) http: reqwest::Client,
    pub(crate) credentials: SessionCredentials,
    /// Host the signature is computed for
    pub(crate) endpoint: String,
    /// Where requests are sent, `https://{endpoint}` unless overridden
    pub(crate) base_url: String,
}

impl std::fmt::Debug for AliyunClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliyunClient")
            .field("credentials", &self.credentials)
            .field("endpoint", &self.endpoint)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AliyunClient {
    /// Call one API action and decode its result
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &BTreeMap<&str, &str>,
    ) -> Result<T> {
        let query = sign::canonical_query(params);
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = uuid::Uuid::new_v4().to_string();

        let input = SigningInput {
            host: &self.endpoint,
            action,
            query: &query,
            timestamp: &timestamp,
            nonce: &nonce,
        };
        let authorization = sign::authorization(&self.credentials, &input).map_err(failed)?;

        let url = if query.is_empty() {
            format!("{}/", self.base_url)
        } else {
            format!("{}/?{}", self.base_url, query)
        };
        tracing::debug!("Aliyun POST {} (Action: {})", self.endpoint, action);

        let mut request = self
            .http
            .post(&url)
            .header("x-acs-action", action)
            .header("x-acs-version", API_VERSION)
            .header("x-acs-date", &timestamp)
            .header("x-acs-signature-nonce", &nonce)
            .header("x-acs-content-sha256", EMPTY_BODY_SHA256)
            .header("Authorization", authorization);
        if let Some(token) = &self.credentials.security_token {
            request = request.header("x-acs-security-token", token);
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

        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(_) if !status.is_success() => return Err(failed(format!("HTTP {status}: {text}"))),
            Err(e) => return Err(failed(format!("Failed to parse response: {e}"))),
        };

        if let Ok(err) = serde_json::from_value::<ApiError>(value.clone()) {
            return Err(err.into());
        }
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}: {text}")));
        }

        serde_json::from_value(value).map_err(|e| failed(format!("Failed to parse response: {e}")))
    }
}

/// Record primitives for one host label
pub(crate) struct HostBackend<'a> {
    pub client: &'a AliyunClient,
    /// Resource record (label) being reconciled
    pub rr: &'a str,
}

#[async_trait]
impl RecordBackend for HostBackend<'_> {
    async fn list_a_records(&self, domain: &str, fqdn: &str) -> Result<Vec<DnsRecord>> {
        let params = BTreeMap::from([
            ("DomainName", domain),
            ("SubDomain", fqdn),
            ("Type", "A"),
        ]);
        let response: DescribeSubDomainRecordsResponse =
            self.client.call("DescribeSubDomainRecords", &params).await?;

        Ok(response
            .domain_records
            .map(|wrapper| wrapper.record)
            .unwrap_or_default()
            .into_iter()
            .map(|record| record.into_dns_record(domain))
            .collect())
    }

    async fn create_a_record(&self, domain: &str, host: &str, ip: &str) -> Result<()> {
        let params = BTreeMap::from([
            ("DomainName", domain),
            ("RR", host),
            ("Type", "A"),
            ("Value", ip),
        ]);
        let _: IgnoredAny = self.client.call("AddDomainRecord", &params).await?;
        Ok(())
    }

    async fn update_a_record(&self, record: &DnsRecord, ip: &str) -> Result<()> {
        let params = BTreeMap::from([
            ("RecordId", record.id.as_str()),
            ("RR", self.rr),
            ("Type", "A"),
            ("Value", ip),
        ]);
        let _: IgnoredAny = self.client.call("UpdateDomainRecord", &params).await?;
        Ok(())
    }
}
