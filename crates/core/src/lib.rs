//! Domain rules for the clinic operations backend.
//!
//! This crate has no IO and no internal dependencies so it can be shared by
//! the repository layer, the HTTP layer and background jobs.

#[macro_use]
mod macros;

pub mod assets;
pub mod audit;
pub mod dates;
pub mod documents;
pub mod error;
pub mod event_types;
pub mod export;
pub mod finance;
pub mod handover;
pub mod hr;
pub mod inventory;
pub mod pagination;
pub mod permissions;
pub mod procurement;
pub mod quality;
pub mod roles;
pub mod scheduling;
pub mod types;
