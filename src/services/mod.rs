//! Business logic services.

pub mod cache;
pub mod fingerprint;
pub mod import;
pub mod review;
