//! Provider-agnostic A record upsert
//!
//! ## Algorithm
//!
//! ```text
//! list(fqdn) ── keep type A + enabled ──┬── 0 ──▶ create            ▶ Created
//!                                       ├── 1 ──▶ same value?  yes  ▶ Unchanged
//!                                       │                      no   ▶ update ▶ Updated
//!                                       └── >1 ─▶ AmbiguousRecord (no mutation)
//! ```
//!
//! Nothing is ever deleted. With several candidate records there is no way
//! to tell which one is authoritative, so the reconciler refuses instead of
//! picking the first one.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::traits::{RecordBackend, UpdateResult};

/// Fully-qualified name of `host` in `domain`
pub fn fqdn(host: &str, domain: &str) -> String {
    format!("{host}.{domain}")
}

/// Fully resolved input of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// DNS zone
    pub domain: String,
    /// Record label
    pub host: String,
    /// Value the record must end up with
    pub desired_ip: String,
}

impl UpdateRequest {
    /// Build a request, rejecting empty fields
    pub fn new(
        domain: impl Into<String>,
        host: impl Into<String>,
        desired_ip: impl Into<String>,
    ) -> Result<Self> {
        let request = Self {
            domain: domain.into(),
            host: host.into(),
            desired_ip: desired_ip.into(),
        };

        if request.domain.is_empty() || request.host.is_empty() {
            return Err(Error::InvalidClaims {
                host: request.host,
                domain: request.domain,
            });
        }
        if request.desired_ip.is_empty() {
            return Err(Error::MissingIp);
        }

        Ok(request)
    }

    /// `host.domain`
    pub fn fqdn(&self) -> String {
        fqdn(&self.host, &self.domain)
    }
}

/// Runs the upsert against one backend
pub struct Reconciler<'a, B: RecordBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: RecordBackend + ?Sized> Reconciler<'a, B> {
    /// Bind the reconciler to a backend
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Make the A record of `request` hold `request.desired_ip`
    pub async fn reconcile(&self, request: &UpdateRequest) -> Result<UpdateResult> {
        let fqdn = request.fqdn();

        let mut records = self
            .backend
            .list_a_records(&request.domain, &fqdn)
            .await
            .map_err(|e| e.in_operation("list", &fqdn))?;
        records.retain(|record| record.is_active_a());

        debug!("Found {} active A record(s) for {}", records.len(), fqdn);

        match records.as_slice() {
            [] => {
                self.backend
                    .create_a_record(&request.domain, &request.host, &request.desired_ip)
                    .await
                    .map_err(|e| e.in_operation("create", &fqdn))?;

                info!("Created A record {} -> {}", fqdn, request.desired_ip);
                Ok(UpdateResult::Created {
                    new_ip: request.desired_ip.clone(),
                })
            }
            [record] if record.value == request.desired_ip => {
                debug!("A record {} already points at {}", fqdn, record.value);
                Ok(UpdateResult::Unchanged {
                    current_ip: record.value.clone(),
                })
            }
            [record] => {
                self.backend
                    .update_a_record(record, &request.desired_ip)
                    .await
                    .map_err(|e| e.in_operation("update", &fqdn))?;

                info!(
                    "Updated A record {} -> {} (was: {})",
                    fqdn, request.desired_ip, record.value
                );
                Ok(UpdateResult::Updated {
                    previous_ip: record.value.clone(),
                    new_ip: request.desired_ip.clone(),
                })
            }
            many => {
                warn!(
                    "Refusing to touch {}: {} active A records match",
                    fqdn,
                    many.len()
                );
                Err(Error::AmbiguousRecord {
                    fqdn,
                    count: many.len(),
                })
            }
        }
    }
}
