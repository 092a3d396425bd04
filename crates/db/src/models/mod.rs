//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches
//! - List parameter structs used directly as `Query<...>` extractors

pub mod asset;
pub mod audit;
pub mod dashboard;
pub mod document;
pub mod finance;
pub mod handover;
pub mod hr;
pub mod inventory;
pub mod notification;
pub mod permission;
pub mod procurement;
pub mod quality;
pub mod scheduling;
pub mod session;
pub mod user;
