use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use crate::error::ServiceError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Round-trip connectivity check.
    async fn ping(&self) -> Result<(), ServiceError>;
}

pub struct SqlxDatabaseClient {
    pool: PgPool,
}

impl SqlxDatabaseClient {
    pub async fn connect(url: &str) -> Result<Self, ServiceError> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(url)
            .await
            .map_err(|error| ServiceError::Database(error.to_string()))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DatabaseClient for SqlxDatabaseClient {
    async fn ping(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|error| ServiceError::Database(error.to_string()))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct StubDatabaseClient;

#[async_trait]
impl DatabaseClient for StubDatabaseClient {
    async fn ping(&self) -> Result<(), ServiceError> {
        debug!("postgres stub: ping ok");
        Ok(())
    }
}
