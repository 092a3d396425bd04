//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::Permissions`] -- Resolves the caller's effective permission set.

pub mod auth;
pub mod rbac;
