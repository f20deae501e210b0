// # Record Backend Trait
//
// The three provider primitives the reconciler needs. An operator builds a
// backend per call (usually an authenticated client plus whatever zone
// lookup the provider requires) and hands it to `Reconciler::reconcile`.

use async_trait::async_trait;

use crate::error::Result;

/// Provider-reported status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Record is served
    Enabled,
    /// Record exists but is paused/disabled
    Disabled,
}

/// A DNS record as observed at the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// The record ID (provider-specific)
    pub id: String,
    /// Record type as reported (`A`, `AAAA`, `CNAME`, ...)
    pub record_type: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record value
    pub value: String,
    /// Whether the record is active
    pub status: RecordStatus,
}

impl DnsRecord {
    /// Convenience constructor for an enabled A record
    pub fn a(id: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record_type: "A".to_string(),
            name: name.into(),
            value: value.into(),
            status: RecordStatus::Enabled,
        }
    }

    /// Whether the reconciler should consider this record at all
    pub fn is_active_a(&self) -> bool {
        self.record_type.eq_ignore_ascii_case("A") && self.status == RecordStatus::Enabled
    }
}

/// List/create/update primitives of one DNS provider
///
/// Provider failures are reported as [`crate::Error::Provider`]; the
/// reconciler turns them into [`crate::Error::Backend`] naming the operation
/// and the FQDN. Authentication failures keep their own variant.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// List records named `fqdn` in `domain`
    ///
    /// Backends may return records of other types or disabled ones; the
    /// reconciler filters them out.
    async fn list_a_records(&self, domain: &str, fqdn: &str) -> Result<Vec<DnsRecord>>;

    /// Create an A record `host` in `domain` with value `ip`
    async fn create_a_record(&self, domain: &str, host: &str, ip: &str) -> Result<()>;

    /// Point an existing record at `ip`
    async fn update_a_record(&self, record: &DnsRecord, ip: &str) -> Result<()>;
}
