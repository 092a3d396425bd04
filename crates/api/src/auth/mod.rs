//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- JWT access-token generation, validation, and refresh-token helpers.
//! - [`bootstrap`] -- first-run admin account.

pub mod bootstrap;
pub mod jwt;
pub mod password;
