//! Bulk import of user preference records.
//!
//! The input is either the `{ "authorized_users": [...] }` export shape or a bare array of
//! records. Each record carries an `_id` (number or string) and an optional `servers` list,
//! and replaces whatever the store holds for that user.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, instrument};

use crate::{
    base::types::{Res, ServerPreferences, UserPreferences},
    service::db::DbClient,
};

/// A user ID as found in an export: numeric or textual.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportedUserId {
    Number(u64),
    Text(String),
}

impl From<ImportedUserId> for String {
    fn from(id: ImportedUserId) -> Self {
        match id {
            ImportedUserId::Number(id) => id.to_string(),
            ImportedUserId::Text(id) => id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImportedUser {
    #[serde(rename = "_id")]
    id: ImportedUserId,
    #[serde(default)]
    servers: Vec<ServerPreferences>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportDocument {
    Wrapped { authorized_users: Vec<ImportedUser> },
    Bare(Vec<ImportedUser>),
}

/// Parse an import document into user records.
pub fn parse_import(json: &str) -> Res<Vec<UserPreferences>> {
    let document: ImportDocument = serde_json::from_str(json)?;

    let users = match document {
        ImportDocument::Wrapped { authorized_users } => authorized_users,
        ImportDocument::Bare(users) => users,
    };

    Ok(users
        .into_iter()
        .map(|user| UserPreferences {
            user_id: user.id.into(),
            servers: user.servers,
        })
        .collect())
}

/// Upsert every record, returning how many were processed.
#[instrument(skip_all, fields(count = records.len()))]
pub async fn import_users(db: &DbClient, records: &[UserPreferences]) -> Res<usize> {
    for record in records {
        db.replace_user(record).await?;
    }

    info!("Updated or inserted {} users.", records.len());

    Ok(records.len())
}

/// Read an import file and upsert its records.
#[instrument(skip(db))]
pub async fn import_file(db: &DbClient, path: &Path) -> Res<usize> {
    let json = tokio::fs::read_to_string(path).await?;
    let records = parse_import(&json)?;

    import_users(db, &records).await
}

// Tests.
