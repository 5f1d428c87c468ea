//! Shared test utilities for integration tests across the workspace.
//!
//! Every test gets its own freshly migrated database inside one PostgreSQL
//! server shared by the whole test binary:
//!
//! - **`AURA_TEST_PG_URL`** set: use that server directly (CI service
//!   container or a local PostgreSQL). The URL has no database path.
//! - **No env var**: start a container via testcontainers on first use and
//!   keep it alive in a `OnceCell`.
//!
//! [`fixtures`] seeds the rows most tests need.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use aura_db::pool;

pub mod fixtures;

const PG_IMAGE_TAG: &str = "17";

struct SharedPg {
    base_url: String,
    /// Keeps the container running. `None` for an external server.
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn init_shared_pg() -> SharedPg {
    if let Ok(url) = std::env::var("AURA_TEST_PG_URL") {
        return SharedPg {
            base_url: url.trim_end_matches('/').to_owned(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag(PG_IMAGE_TAG)
        .start()
        .await
        .expect("failed to start PostgreSQL container");
    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedPg {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Server URL of the shared PostgreSQL, without a database name.
pub async fn pg_url() -> &'static str {
    let shared = SHARED_PG.get_or_init(init_shared_pg).await;
    &shared.base_url
}

async fn connect(url: &str, max_connections: u32) -> PgPool {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to {url}: {e}"))
}

/// Create a uniquely named database with every migration applied.
///
/// Returns `(pool, db_name)`; pass `db_name` to [`drop_test_db`] at the end
/// of the test.
pub async fn create_test_db() -> (PgPool, String) {
    let base_url = pg_url().await;
    let db_name = format!("aura_test_{}", Uuid::new_v4().simple());

    let maint_pool = connect(&format!("{base_url}/postgres"), 1).await;
    maint_pool
        .execute(format!("CREATE DATABASE {db_name}").as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create temp database {db_name}: {e}"));
    maint_pool.close().await;

    let pool = connect(&format!("{base_url}/{db_name}"), 5).await;
    pool::run_migrations(&pool)
        .await
        .expect("migrations should succeed");

    (pool, db_name)
}

/// Drop a database made by [`create_test_db`], terminating its connections
/// first. Errors are ignored so cleanup never masks a test failure.
pub async fn drop_test_db(db_name: &str) {
    let base_url = pg_url().await;
    let maint_pool = connect(&format!("{base_url}/postgres"), 1).await;

    let _ = maint_pool
        .execute(
            format!(
                "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
                 WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
            )
            .as_str(),
        )
        .await;
    let _ = maint_pool
        .execute(format!("DROP DATABASE IF EXISTS {db_name}").as_str())
        .await;
    maint_pool.close().await;
}
