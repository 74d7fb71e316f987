//! Credential handling for upstream API access.

pub mod credentials;

pub use credentials::{ApiCredentials, SecretString};
