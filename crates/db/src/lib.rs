//! In-memory stores backing the renewal services.
//!
//! Every store is keyed by credential fingerprint and hands out clones, so a
//! caller mutating a returned value never changes what is stored.

pub mod credentials;
pub mod snapshots;
pub mod webhooks;

pub use credentials::CredentialRepository;
pub use snapshots::SnapshotRepository;
pub use webhooks::WebhookRepository;
