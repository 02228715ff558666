//! imgview - media delivery core for a personal media library
//!
//! This library crate exposes the delivery service, fingerprinting and the
//! request caches for the binary and for integration testing.

pub mod caches;
pub mod config;
pub mod delivery;
pub mod fingerprint;
