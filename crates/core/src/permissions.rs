//! Position-based permission matrix and effective-permission resolution.
//!
//! A user's effective permissions are the defaults of their position plus
//! the extras of their role, plus active `grant` overrides, minus active
//! `revoke` overrides. An override is active until its `expires_at` passes.
//! Admins hold every permission and are not affected by overrides.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::roles::{Position, Role};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Permission keys
// ---------------------------------------------------------------------------

pub const HANDOVER_VIEW: &str = "handover.view";
pub const HANDOVER_MANAGE: &str = "handover.manage";
pub const INVENTORY_VIEW: &str = "inventory.view";
pub const INVENTORY_MANAGE: &str = "inventory.manage";
pub const SCHEDULE_VIEW: &str = "schedule.view";
pub const SCHEDULE_MANAGE: &str = "schedule.manage";
pub const HR_VIEW: &str = "hr.view";
pub const HR_MANAGE: &str = "hr.manage";
pub const ASSET_VIEW: &str = "asset.view";
pub const ASSET_MANAGE: &str = "asset.manage";
pub const PROCUREMENT_VIEW: &str = "procurement.view";
pub const PROCUREMENT_REQUEST: &str = "procurement.request";
pub const PROCUREMENT_APPROVE: &str = "procurement.approve";
pub const QUALITY_VIEW: &str = "quality.view";
pub const QUALITY_MANAGE: &str = "quality.manage";
pub const DOCUMENT_VIEW: &str = "document.view";
pub const DOCUMENT_PUBLISH: &str = "document.publish";
pub const FINANCE_VIEW: &str = "finance.view";
pub const FINANCE_MANAGE: &str = "finance.manage";
pub const AUDIT_VIEW: &str = "audit.view";
pub const USER_MANAGE: &str = "user.manage";
pub const PERMISSION_MANAGE: &str = "permission.manage";

/// Every permission key known to the system.
pub const ALL_PERMISSIONS: &[&str] = &[
    HANDOVER_VIEW,
    HANDOVER_MANAGE,
    INVENTORY_VIEW,
    INVENTORY_MANAGE,
    SCHEDULE_VIEW,
    SCHEDULE_MANAGE,
    HR_VIEW,
    HR_MANAGE,
    ASSET_VIEW,
    ASSET_MANAGE,
    PROCUREMENT_VIEW,
    PROCUREMENT_REQUEST,
    PROCUREMENT_APPROVE,
    QUALITY_VIEW,
    QUALITY_MANAGE,
    DOCUMENT_VIEW,
    DOCUMENT_PUBLISH,
    FINANCE_VIEW,
    FINANCE_MANAGE,
    AUDIT_VIEW,
    USER_MANAGE,
    PERMISSION_MANAGE,
];

/// Validate that a permission key is known.
pub fn validate_permission_key(key: &str) -> Result<(), CoreError> {
    if ALL_PERMISSIONS.contains(&key) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!("Unknown permission: '{key}'")))
    }
}

// ---------------------------------------------------------------------------
// Default matrix
// ---------------------------------------------------------------------------

/// Default permission set for a position.
pub fn position_defaults(position: Position) -> &'static [&'static str] {
    match position {
        Position::Director => &[
            HANDOVER_VIEW,
            HANDOVER_MANAGE,
            INVENTORY_VIEW,
            SCHEDULE_VIEW,
            SCHEDULE_MANAGE,
            HR_VIEW,
            HR_MANAGE,
            ASSET_VIEW,
            PROCUREMENT_VIEW,
            PROCUREMENT_APPROVE,
            QUALITY_VIEW,
            QUALITY_MANAGE,
            DOCUMENT_VIEW,
            DOCUMENT_PUBLISH,
            FINANCE_VIEW,
            AUDIT_VIEW,
        ],
        Position::Doctor | Position::Nurse => &[
            HANDOVER_VIEW,
            INVENTORY_VIEW,
            SCHEDULE_VIEW,
            ASSET_VIEW,
            PROCUREMENT_REQUEST,
            QUALITY_VIEW,
            DOCUMENT_VIEW,
        ],
        Position::Pharmacist => &[
            HANDOVER_VIEW,
            INVENTORY_VIEW,
            INVENTORY_MANAGE,
            SCHEDULE_VIEW,
            PROCUREMENT_VIEW,
            PROCUREMENT_REQUEST,
            QUALITY_VIEW,
            DOCUMENT_VIEW,
        ],
        Position::Receptionist => &[HANDOVER_VIEW, SCHEDULE_VIEW, QUALITY_VIEW, DOCUMENT_VIEW],
        Position::LabTechnician => &[
            HANDOVER_VIEW,
            INVENTORY_VIEW,
            SCHEDULE_VIEW,
            ASSET_VIEW,
            QUALITY_VIEW,
            DOCUMENT_VIEW,
        ],
        Position::Accountant => &[
            HANDOVER_VIEW,
            SCHEDULE_VIEW,
            PROCUREMENT_VIEW,
            FINANCE_VIEW,
            FINANCE_MANAGE,
            DOCUMENT_VIEW,
        ],
        Position::Technician => &[
            HANDOVER_VIEW,
            INVENTORY_VIEW,
            SCHEDULE_VIEW,
            ASSET_VIEW,
            ASSET_MANAGE,
            DOCUMENT_VIEW,
        ],
    }
}

/// Permissions added on top of the position defaults by the role tier.
pub fn role_extras(role: Role) -> &'static [&'static str] {
    match role {
        Role::Admin => ALL_PERMISSIONS,
        Role::Manager => &[HANDOVER_MANAGE, SCHEDULE_MANAGE, HR_VIEW, QUALITY_MANAGE],
        Role::Staff => &[],
    }
}

/// One row of the position matrix, as returned by the catalog endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PositionDefaults {
    pub position: &'static str,
    pub permissions: Vec<&'static str>,
}

/// The full position -> default permissions matrix.
pub fn position_matrix() -> Vec<PositionDefaults> {
    Position::ALL
        .iter()
        .map(|p| PositionDefaults {
            position: p.as_str(),
            permissions: position_defaults(*p).to_vec(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Overrides and resolution
// ---------------------------------------------------------------------------

define_text_enum! {
    /// Whether an override adds or removes a permission.
    OverrideEffect("override effect") {
        Grant = "grant",
        Revoke = "revoke",
    }
}

define_text_enum! {
    PermissionRequestStatus("permission request status") {
        Pending = "pending",
        Approved = "approved",
        Rejected = "rejected",
    }
}

/// A per-user override, decoupled from the database row.
#[derive(Debug, Clone)]
pub struct PermissionOverride {
    pub permission: String,
    pub effect: OverrideEffect,
    pub expires_at: Option<Timestamp>,
}

impl PermissionOverride {
    /// An override without expiry is always active; otherwise it is active
    /// strictly before `expires_at`.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.expires_at.map_or(true, |exp| now < exp)
    }
}

/// Resolve the effective permission set for a user.
pub fn effective_permissions(
    role: Role,
    position: Option<Position>,
    overrides: &[PermissionOverride],
    now: Timestamp,
) -> BTreeSet<String> {
    if role == Role::Admin {
        return ALL_PERMISSIONS.iter().map(|p| p.to_string()).collect();
    }

    let mut set: BTreeSet<String> = position
        .map(position_defaults)
        .unwrap_or(&[])
        .iter()
        .chain(role_extras(role).iter())
        .map(|p| p.to_string())
        .collect();

    let active = overrides.iter().filter(|o| o.is_active(now));
    let (grants, revokes): (Vec<_>, Vec<_>) =
        active.partition(|o| o.effect == OverrideEffect::Grant);

    for g in grants {
        set.insert(g.permission.clone());
    }
    for r in revokes {
        set.remove(&r.permission);
    }
    set
}
