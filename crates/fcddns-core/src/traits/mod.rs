//! Core traits for the DDNS gateway
//!
//! - [`RecordOperator`]: Reconcile one A record at a specific DNS provider
//! - [`RecordBackend`]: The list/create/update primitives the reconciler drives

pub mod operator;
pub mod record_backend;

pub use operator::{InvocationContext, RecordOperator, SessionCredentials, UpdateResult};
pub use record_backend::{DnsRecord, RecordBackend, RecordStatus};
