//! Dot-separated event names published on the event bus.
//!
//! The same string is stored as `notifications.kind` for every notification
//! fanned out from the event.

pub const HANDOVER_ASSIGNED: &str = "handover.assigned";
pub const INVENTORY_LOW_STOCK: &str = "inventory.low_stock";
pub const LEAVE_SUBMITTED: &str = "leave.submitted";
pub const LEAVE_REVIEWED: &str = "leave.reviewed";
pub const INCIDENT_REPORTED: &str = "incident.reported";
pub const FAULT_REPORTED: &str = "asset.fault_reported";
pub const MAINTENANCE_DUE: &str = "maintenance.due";
pub const CERTIFICATION_EXPIRING: &str = "certification.expiring";
pub const PURCHASE_REQUEST_SUBMITTED: &str = "purchase_request.submitted";
pub const PURCHASE_REQUEST_REVIEWED: &str = "purchase_request.reviewed";
pub const DOCUMENT_PUBLISHED: &str = "document.published";
pub const ANNOUNCEMENT_PUBLISHED: &str = "announcement.published";
pub const PERMISSION_REQUEST_SUBMITTED: &str = "permission_request.submitted";
pub const PERMISSION_REQUEST_REVIEWED: &str = "permission_request.reviewed";
