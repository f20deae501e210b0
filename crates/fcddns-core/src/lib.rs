// # fcddns-core
//
// Core library for the token-authenticated DDNS gateway.
//
// ## Architecture Overview
//
// A request arrives as a path of the shape `/ddns/v1/{token}[/{ip}]` and ends as a
// status code plus a plain-text body:
//
// - **router**: Splits the path into a token and an optional IP override
// - **token**: Signs and verifies the HS256 claim token (domain, host, optional ip)
// - **registry**: Resolves a domain to the `RecordOperator` responsible for it
// - **traits**: `RecordOperator` (one per DNS provider) and `RecordBackend`
//   (the list/create/update primitives a provider plugs into the reconciler)
// - **reconcile**: The provider-agnostic upsert of a single A record
// - **client**: Lock-free cache for the authenticated provider client
// - **service**: Glues everything into `DdnsService::handle`
//
// ## Design Principles
//
// 1. **Fail closed**: claims are only used after the signature and time bounds check out
// 2. **Idempotent**: repeating a request with the same IP never mutates the record again
// 3. **Refuse ambiguity**: more than one matching A record is never auto-resolved
// 4. **No globals**: the registry is built once at startup and shared by `Arc`

pub mod client;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod registry;
pub mod router;
pub mod service;
pub mod token;
pub mod traits;

// Re-export core types for convenience
pub use client::ClientCache;
pub use config::{AliyunConfig, CloudflareConfig, DdnsConfig};
pub use error::{Error, Result};
pub use reconcile::{Reconciler, UpdateRequest, fqdn};
pub use registry::OperatorRegistry;
pub use router::{RoutedRequest, parse_path};
pub use service::{DdnsRequest, DdnsResponse, DdnsService};
pub use token::{Claims, TokenCodec, TokenError, TokenInspection};
pub use traits::{
    DnsRecord, InvocationContext, RecordBackend, RecordOperator, RecordStatus, SessionCredentials,
    UpdateResult,
};
