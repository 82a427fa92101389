//! SurrealDB implementation for relevance-bot data storage.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::{
    RecordId, Surreal,
    engine::any::{self, Any},
    opt::auth::Root,
};
use tracing::{debug, info, instrument};

use crate::base::{
    config::Config,
    types::{Res, ServerPreferences, UserPreferences, Void},
};

use super::{DbClient, GenericDbClient};

/// Table holding one record per authorized user, keyed by user ID.
const USER_TABLE: &str = "authorized_user";

// Extra methods on `DbClient` applied by the surreal implementation.

impl DbClient {
    /// Connect to the configured SurrealDB endpoint.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let client = SurrealDbClient::new(config).await?;
        Ok(Self::new(Arc::new(client)))
    }

    /// Create an isolated in-memory store.
    pub async fn surreal_memory() -> Res<Self> {
        let client = SurrealDbClient::memory().await?;
        Ok(Self::new(Arc::new(client)))
    }
}

// Records.

/// A user record as stored in SurrealDB.
#[derive(Debug, Serialize, Deserialize)]
struct SurrealUserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    user_id: String,
    #[serde(default)]
    servers: Vec<ServerPreferences>,
}

impl From<&UserPreferences> for SurrealUserRecord {
    fn from(record: &UserPreferences) -> Self {
        Self {
            id: None,
            user_id: record.user_id.clone(),
            servers: record.servers.clone(),
        }
    }
}

impl From<SurrealUserRecord> for UserPreferences {
    fn from(record: SurrealUserRecord) -> Self {
        Self {
            user_id: record.user_id,
            servers: record.servers,
        }
    }
}

// Specific implementations.

/// SurrealDB client implementation.
struct SurrealDbClient {
    db: Surreal<Any>,
}

impl SurrealDbClient {
    /// Connect, authenticate (when a username is configured), and prepare the schema.
    #[instrument(name = "SurrealDbClient::new", skip_all, fields(endpoint = %config.db_endpoint))]
    async fn new(config: &Config) -> Res<Self> {
        let db = any::connect(config.db_endpoint.as_str()).await?;

        if !config.db_username.is_empty() {
            db.signin(Root {
                username: &config.db_username,
                password: &config.db_password,
            })
            .await?;
        }

        db.use_ns(config.db_namespace.as_str()).use_db(config.db_database.as_str()).await?;

        Self::define_schema(&db).await?;

        info!("Database initialized successfully.");

        Ok(Self { db })
    }

    /// Create an in-memory database instance.
    #[instrument(name = "SurrealDbClient::memory", skip_all)]
    async fn memory() -> Res<Self> {
        let db = any::connect("mem://").await?;

        db.use_ns("relevance").use_db("user_data").await?;

        Self::define_schema(&db).await?;

        Ok(Self { db })
    }

    async fn define_schema(db: &Surreal<Any>) -> Void {
        db.query(format!("DEFINE TABLE IF NOT EXISTS {USER_TABLE} SCHEMALESS;")).await?.check()?;
        Ok(())
    }
}

#[async_trait]
impl GenericDbClient for SurrealDbClient {
    #[instrument(skip(self))]
    async fn get_user_ids(&self) -> Res<Vec<String>> {
        let mut response = self.db.query(format!("SELECT VALUE user_id FROM {USER_TABLE};")).await?;
        let ids: Vec<String> = response.take(0)?;

        debug!("Found {} user IDs.", ids.len());

        Ok(ids)
    }

    #[instrument(skip(self))]
    async fn get_all_users(&self) -> Res<Vec<UserPreferences>> {
        let records: Vec<SurrealUserRecord> = self.db.select(USER_TABLE).await?;

        Ok(records.into_iter().map(UserPreferences::from).collect())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Res<Option<UserPreferences>> {
        let record: Option<SurrealUserRecord> = self.db.select((USER_TABLE, user_id)).await?;

        Ok(record.map(UserPreferences::from))
    }

    #[instrument(skip_all, fields(user_id = %record.user_id))]
    async fn upsert_user(&self, record: &UserPreferences) -> Void {
        let _: Option<SurrealUserRecord> = self.db.upsert((USER_TABLE, record.user_id.as_str())).content(SurrealUserRecord::from(record)).await?;

        debug!("User `{}` saved with {} servers.", record.user_id, record.servers.len());

        Ok(())
    }
}

// Tests.
