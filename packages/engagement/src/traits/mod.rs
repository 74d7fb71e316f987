//! Core trait abstractions for the engagement pipeline.
//!
//! Applications implement these to plug in an upstream API and a storage
//! backend.

pub mod source;
pub mod store;
