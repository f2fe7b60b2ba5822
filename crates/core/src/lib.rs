pub mod auth;
pub mod clock;
pub mod config;
pub mod delivery;
pub mod digest;
pub mod formatter;
pub mod ingestion;
pub mod renewals;
pub mod slack;
pub mod store;
pub mod types;
