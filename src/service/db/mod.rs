//! Preference store for the relevance-bot.
//!
//! The store maps a user ID to that user's per-server preference lists. Backends implement
//! [`GenericDbClient`]; [`DbClient`] wraps a backend and serializes writes per user so that
//! overlapping commands for the same user cannot lose each other's updates.

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;

use crate::base::types::{Res, UserPreferences, Void};

pub mod surreal;

// Traits.

/// Generic database client trait that clients must implement.
///
/// This trait defines the core functionality for storing and retrieving user
/// preference records. Implementing this trait allows different database backends
/// to be used with the relevance-bot.
#[async_trait]
pub trait GenericDbClient: Send + Sync + 'static {
    /// Gets the IDs of every user with a stored record.
    async fn get_user_ids(&self) -> Res<Vec<String>>;

    /// Gets every stored user record.
    async fn get_all_users(&self) -> Res<Vec<UserPreferences>>;

    /// Gets a user record by its ID, if one exists.
    async fn get_user(&self, user_id: &str) -> Res<Option<UserPreferences>>;

    /// Replaces the user's record, inserting it if absent.
    async fn upsert_user(&self, record: &UserPreferences) -> Void;
}

// Structs.

/// Database client for relevance-bot.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DbClient {
    /// The database client instance.
    inner: Arc<dyn GenericDbClient>,
    /// One write guard per user ID.
    user_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Deref for DbClient {
    type Target = dyn GenericDbClient;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DbClient {
    pub fn new(inner: Arc<dyn GenericDbClient>) -> Self {
        Self {
            inner,
            user_locks: Arc::new(DashMap::new()),
        }
    }

    /// Acquire the write guard for a user.
    ///
    /// Guards are never evicted; the map holds at most one entry per authorized user.
    async fn lock_user(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = self.user_locks.entry(user_id.to_string()).or_default().clone();
        lock.lock_owned().await
    }

    /// Read-modify-write a user record while holding that user's write guard.
    ///
    /// The closure receives the current record (if any) and returns the record to persist
    /// (`None` to leave the store untouched) along with an outcome for the caller.
    #[instrument(skip(self, update))]
    pub async fn update_user<T, F>(&self, user_id: &str, update: F) -> Res<T>
    where
        F: FnOnce(Option<UserPreferences>) -> (Option<UserPreferences>, T) + Send,
        T: Send,
    {
        let _guard = self.lock_user(user_id).await;

        let current = self.get_user(user_id).await?;
        let (updated, outcome) = update(current);

        if let Some(record) = updated {
            self.upsert_user(&record).await?;
        }

        Ok(outcome)
    }

    /// Replace a user record while holding that user's write guard.
    #[instrument(skip_all, fields(user_id = %record.user_id))]
    pub async fn replace_user(&self, record: &UserPreferences) -> Void {
        let _guard = self.lock_user(&record.user_id).await;

        self.upsert_user(record).await
    }
}
