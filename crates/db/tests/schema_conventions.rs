//! Catalog checks that keep new migrations consistent with the rest of the
//! schema.

use sqlx::PgPool;

/// Tables whose rows are never updated, so they carry no `updated_at`
/// trigger.
const APPEND_ONLY: &[&str] = &[
    "audit_logs",
    "inventory_transactions",
    "maintenance_logs",
    "purchase_request_lines",
    "goods_receipts",
    "goods_receipt_lines",
    "document_versions",
    "document_acknowledgements",
];

async fn tables(pool: &PgPool) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT table_name::TEXT FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
           AND table_name <> '_sqlx_migrations' \
         ORDER BY 1",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_ids_are_bigint_and_timestamps_are_tz(pool: PgPool) {
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT table_name::TEXT, column_name::TEXT, data_type::TEXT \
         FROM information_schema.columns \
         WHERE table_schema = 'public' AND table_name <> '_sqlx_migrations' \
           AND column_name IN ('id', 'created_at', 'updated_at')",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for table in tables(&pool).await {
        for (column, expected) in [
            ("id", "bigint"),
            ("created_at", "timestamp with time zone"),
            ("updated_at", "timestamp with time zone"),
        ] {
            let found = rows
                .iter()
                .find(|(t, c, _)| *t == table && c == column)
                .unwrap_or_else(|| panic!("{table} is missing {column}"));
            assert_eq!(found.2, expected, "{table}.{column}");
        }
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_money_is_integer_cents(pool: PgPool) {
    let rows: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT table_name::TEXT, column_name::TEXT, data_type::TEXT \
         FROM information_schema.columns \
         WHERE table_schema = 'public' \
           AND (column_name LIKE '%\\_cents' OR data_type IN ('numeric', 'money')) \
           AND column_name NOT LIKE '%\\_pct'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!rows.is_empty());
    for (table, column, data_type) in &rows {
        assert!(column.ends_with("_cents"), "{table}.{column} stores money as {data_type}");
        assert_eq!(data_type, "bigint", "{table}.{column}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mutable_tables_touch_updated_at(pool: PgPool) {
    let triggered: Vec<String> = sqlx::query_scalar(
        "SELECT event_object_table::TEXT FROM information_schema.triggers \
         WHERE trigger_schema = 'public' AND trigger_name = 'set_updated_at' \
           AND event_manipulation = 'UPDATE'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for table in tables(&pool).await {
        let append_only = APPEND_ONLY.contains(&table.as_str());
        assert_eq!(
            triggered.contains(&table),
            !append_only,
            "{table}: set_updated_at trigger expected only on mutable tables"
        );
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_columns_are_constrained(pool: PgPool) {
    let unchecked: Vec<String> = sqlx::query_scalar(
        "SELECT c.relname::TEXT \
         FROM pg_attribute a \
         JOIN pg_class c ON c.oid = a.attrelid \
         JOIN pg_namespace n ON n.oid = c.relnamespace \
         WHERE n.nspname = 'public' AND c.relkind = 'r' AND a.attname = 'status' \
           AND NOT EXISTS ( \
               SELECT 1 FROM pg_constraint k \
               WHERE k.conrelid = c.oid AND k.contype = 'c' AND a.attnum = ANY (k.conkey))",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(unchecked.is_empty(), "status without CHECK: {unchecked:?}");
}

/// Each foreign key column leads some index on its table.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_foreign_keys_are_indexed(pool: PgPool) {
    let missing: Vec<(String, String)> = sqlx::query_as(
        "SELECT c.relname::TEXT, a.attname::TEXT \
         FROM pg_constraint k \
         JOIN pg_class c ON c.oid = k.conrelid \
         JOIN pg_namespace n ON n.oid = c.relnamespace \
         JOIN pg_attribute a ON a.attrelid = k.conrelid AND a.attnum = k.conkey[1] \
         WHERE n.nspname = 'public' AND k.contype = 'f' \
           AND NOT EXISTS ( \
               SELECT 1 FROM pg_index i \
               WHERE i.indrelid = k.conrelid AND i.indkey[0] = k.conkey[1]) \
         ORDER BY 1, 2",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(missing.is_empty(), "unindexed foreign keys: {missing:?}");
}
