//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods that
//! accept `&PgPool` as the first argument. Multi-step writes that must
//! compose with other repositories take `&mut Transaction<'_, Postgres>`
//! instead.

pub mod asset_repo;
pub mod audit_repo;
pub mod dashboard_repo;
pub mod document_repo;
pub mod finance_repo;
pub mod handover_repo;
pub mod hr_repo;
pub mod inventory_repo;
pub mod notification_repo;
pub mod permission_repo;
pub mod procurement_repo;
pub mod quality_repo;
pub mod schedule_repo;
pub mod session_repo;
pub mod user_repo;

pub use asset_repo::AssetRepo;
pub use audit_repo::AuditLogRepo;
pub use dashboard_repo::DashboardRepo;
pub use document_repo::DocumentRepo;
pub use finance_repo::FinanceRepo;
pub use handover_repo::HandoverRepo;
pub use hr_repo::HrRepo;
pub use inventory_repo::InventoryRepo;
pub use notification_repo::NotificationRepo;
pub use permission_repo::PermissionRepo;
pub use procurement_repo::ProcurementRepo;
pub use quality_repo::QualityRepo;
pub use schedule_repo::ScheduleRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
