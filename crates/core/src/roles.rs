//! Authorization tiers (roles) and HR job titles (positions).
//!
//! These must match the CHECK constraints on `users.role` and
//! `users.position` in the initial migration.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_STAFF: &str = "staff";

define_text_enum! {
    /// Coarse authorization tier carried in the JWT.
    Role("role") {
        Admin = "admin",
        Manager = "manager",
        Staff = "staff",
    }
}

define_text_enum! {
    /// HR job title. Drives the default permission set.
    Position("position") {
        Director = "director",
        Doctor = "doctor",
        Nurse = "nurse",
        Pharmacist = "pharmacist",
        Receptionist = "receptionist",
        LabTechnician = "lab_technician",
        Accountant = "accountant",
        Technician = "technician",
    }
}

/// Roles that receive operational alerts (low stock, serious incidents,
/// purchase requests awaiting approval).
pub const ALERT_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_MANAGER];
