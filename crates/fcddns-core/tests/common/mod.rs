//! Test doubles shared by the contract tests
//!
//! `FakeBackend` keeps provider records in memory and counts every
//! primitive call; `FakeOperator` runs the real reconciler against it the
//! same way the provider crates do.

#![allow(dead_code)]

use async_trait::async_trait;
use fcddns_core::{
    DnsRecord, Error, InvocationContext, Reconciler, RecordBackend, RecordOperator, Result,
    UpdateRequest, UpdateResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory provider that records every call
#[derive(Default)]
pub struct FakeBackend {
    records: Mutex<Vec<DnsRecord>>,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    /// Make `update_a_record` fail with this message
    pub fail_update: Option<String>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given records
    pub fn with_records(records: Vec<DnsRecord>) -> Self {
        let backend = Self::default();
        backend.next_id.store(records.len(), Ordering::SeqCst);
        *backend.records.lock().unwrap() = records;
        backend
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Number of create + update calls
    pub fn mutations(&self) -> usize {
        self.create_calls() + self.update_calls()
    }
}

#[async_trait]
impl RecordBackend for FakeBackend {
    async fn list_a_records(
        &self,
        _domain: &str,
        fqdn: &str,
    ) -> Result<Vec<DnsRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.name == fqdn)
            .cloned()
            .collect())
    }

    async fn create_a_record(
        &self,
        domain: &str,
        host: &str,
        ip: &str,
    ) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push(DnsRecord::a(
            format!("rec-{id}"),
            format!("{host}.{domain}"),
            ip,
        ));
        Ok(())
    }

    async fn update_a_record(
        &self,
        record: &DnsRecord,
        ip: &str,
    ) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_update {
            return Err(Error::provider("fake", message.clone()));
        }

        let mut records = self.records.lock().unwrap();
        let stored = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| Error::provider("fake", format!("record {} not found", record.id)))?;
        stored.value = ip.to_string();
        Ok(())
    }
}

/// Operator that reconciles against a shared `FakeBackend`
pub struct FakeOperator {
    pub backend: Arc<FakeBackend>,
    pub name: &'static str,
    /// Artificial latency before touching the backend
    pub delay: Option<Duration>,
}

impl FakeOperator {
    pub fn new(name: &'static str, backend: Arc<FakeBackend>) -> Self {
        Self {
            backend,
            name,
            delay: None,
        }
    }
}

#[async_trait]
impl RecordOperator for FakeOperator {
    async fn update(
        &self,
        _ctx: &InvocationContext,
        domain: &str,
        host: &str,
        ip: &str,
    ) -> Result<UpdateResult> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let request = UpdateRequest::new(domain, host, ip)?;
        Reconciler::new(self.backend.as_ref()).reconcile(&request).await
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

/// An `Arc<dyn RecordOperator>` over a fresh backend, plus the backend
pub fn operator(name: &'static str) -> (Arc<dyn RecordOperator>, Arc<FakeBackend>) {
    let backend = Arc::new(FakeBackend::new());
    let operator: Arc<dyn RecordOperator> =
        Arc::new(FakeOperator::new(name, Arc::clone(&backend)));
    (operator, backend)
}
