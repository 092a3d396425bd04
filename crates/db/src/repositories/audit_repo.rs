//! Repository for the `audit_logs` table.

use clinicops_core::pagination::Page;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::audit::{AuditFilter, AuditLog, CreateAuditLog};

/// Entries are joined to `users` so listings show who acted even after
/// the id means nothing to the reader.
const SELECT: &str = "\
    SELECT l.id, l.user_id, u.email AS actor_email, l.action, l.entity_type, l.entity_id, \
           l.details_json, l.ip_address, l.created_at \
    FROM audit_logs l \
    LEFT JOIN users u ON u.id = l.user_id";

pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Append an entry. Rows are never updated or deleted.
    pub async fn create(pool: &PgPool, input: &CreateAuditLog) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO audit_logs (user_id, action, entity_type, entity_id, details_json, ip_address) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(input.user_id)
        .bind(&input.action)
        .bind(&input.entity_type)
        .bind(input.entity_id)
        .bind(&input.details_json)
        .bind(&input.ip_address)
        .fetch_one(pool)
        .await
    }

    /// One page of matching entries, newest first.
    pub async fn query(
        pool: &PgPool,
        filter: &AuditFilter,
        page: Page,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY l.created_at DESC, l.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        qb.build_query_as::<AuditLog>().fetch_all(pool).await
    }

    pub async fn count(pool: &PgPool, filter: &AuditFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*)::BIGINT FROM audit_logs l LEFT JOIN users u ON u.id = l.user_id",
        );
        push_filter(&mut qb, filter);
        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Every matching entry, oldest first, for export.
    pub async fn export(pool: &PgPool, filter: &AuditFilter) -> Result<Vec<AuditLog>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY l.created_at ASC, l.id ASC");
        qb.build_query_as::<AuditLog>().fetch_all(pool).await
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &AuditFilter) {
    qb.push(" WHERE TRUE");
    if let Some(user_id) = filter.user_id {
        qb.push(" AND l.user_id = ").push_bind(user_id);
    }
    if let Some(action) = &filter.action {
        qb.push(" AND l.action = ").push_bind(action.clone());
    }
    if let Some(entity_type) = &filter.entity_type {
        qb.push(" AND l.entity_type = ").push_bind(entity_type.clone());
    }
    if let Some(entity_id) = filter.entity_id {
        qb.push(" AND l.entity_id = ").push_bind(entity_id);
    }
    if let Some(actor) = &filter.actor_email {
        qb.push(" AND u.email ILIKE ")
            .push_bind(format!("%{}%", actor.trim()));
    }
    if let Some(from) = filter.from {
        qb.push(" AND l.created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND l.created_at <= ").push_bind(to);
    }
}
