//! Request handlers, one submodule per resource.
//!
//! Handlers check permissions through [`crate::middleware::rbac`], delegate
//! persistence to the matching repository in `clinicops_db`, and map errors
//! via [`crate::error::AppError`]. State-changing handlers record an audit
//! entry and publish domain events on the bus.

pub mod assets;
pub mod audit;
pub mod auth;
pub mod dashboard;
pub mod documents;
pub mod finance;
pub mod handovers;
pub mod hr;
pub mod inventory;
pub mod notifications;
pub mod permissions;
pub mod procurement;
pub mod quality;
pub mod scheduling;
pub mod users;
