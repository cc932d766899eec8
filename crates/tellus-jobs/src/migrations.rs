// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Database migrations for the jobs service.
//!
//! This module exposes embedded migrations that can be run programmatically.
//! The service binary calls [`run_postgres`] at startup; test harnesses can
//! do the same against a scratch database.

use sqlx::migrate::MigrateError;

/// PostgreSQL migrator with all jobs-service migrations embedded.
pub static POSTGRES: sqlx::migrate::Migrator = sqlx::migrate!("./migrations/postgresql");

/// Run PostgreSQL migrations.
///
/// Applies all pending migrations to the database. Safe to call multiple times;
/// already-applied migrations are skipped.
pub async fn run_postgres(pool: &sqlx::PgPool) -> Result<(), MigrateError> {
    POSTGRES.run(pool).await
}
