//! Data types for the engagement pipeline.

pub mod actor;
pub mod config;
pub mod extraction;
pub mod summary;
pub mod target;
