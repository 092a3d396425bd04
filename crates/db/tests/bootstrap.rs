use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify schema.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    clinicops_db::health_check(&pool).await.unwrap();

    let tables = [
        "users",
        "user_sessions",
        "user_permissions",
        "permission_requests",
        "audit_logs",
        "notifications",
        "handovers",
        "handover_comments",
        "inventory_categories",
        "inventory_items",
        "inventory_transactions",
        "shifts",
        "schedule_entries",
        "certifications",
        "leave_requests",
        "user_skills",
        "vendors",
        "assets",
        "maintenance_schedules",
        "maintenance_logs",
        "fault_reports",
        "purchase_requests",
        "purchase_request_lines",
        "purchase_orders",
        "purchase_order_lines",
        "goods_receipts",
        "goods_receipt_lines",
        "incidents",
        "complaints",
        "documents",
        "document_versions",
        "document_acknowledgements",
        "announcements",
        "cost_entries",
        "revenue_entries",
        "cost_snapshots",
    ];

    for table in tables {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap_or_else(|e| panic!("{table} lookup failed: {e}"));
        assert!(exists, "table {table} should exist after migrations");
    }
}

/// Default shift codes are seeded by the scheduling migration.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_default_shifts_seeded(pool: PgPool) {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shifts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(count > 0, "shifts should have seed data");
}
