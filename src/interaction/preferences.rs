//! Preference command semantics.
//!
//! These functions are independent of the chat platform: they take the invoking user and
//! server, read-modify-write the user's record under that user's write guard, and return a
//! [`PreferenceReply`] whose `Display` is the text sent back to the user.

use tracing::{info, instrument};

use crate::{
    base::types::{CommandInvocation, PreferenceReply, Res, UserPreferences},
    service::db::DbClient,
};

/// Append a preference to the invoking user's list for the current server.
///
/// Creates the user record and / or the server entry if either is missing.
#[instrument(skip(db), fields(user_id = %invocation.user_id, server = %invocation.server_name))]
pub async fn add_preference(db: &DbClient, invocation: &CommandInvocation, preference: &str) -> Res<PreferenceReply> {
    db.update_user(&invocation.user_id, |current| {
        let mut record = current.unwrap_or_else(|| UserPreferences::new(invocation.user_id.clone()));

        record.server_or_insert(&invocation.server_name).preferences.push(preference.to_string());

        (Some(record), ())
    })
    .await?;

    info!("Preference added.");

    Ok(PreferenceReply::Added {
        user_name: invocation.user_name.clone(),
        preference: preference.to_string(),
    })
}

/// Remove the first exact match of a preference from the current server's list.
#[instrument(skip(db), fields(user_id = %invocation.user_id, server = %invocation.server_name))]
pub async fn remove_preference(db: &DbClient, invocation: &CommandInvocation, preference: &str) -> Res<PreferenceReply> {
    db.update_user(&invocation.user_id, |current| {
        let Some(mut record) = current else {
            return (None, PreferenceReply::NoUserRecord);
        };

        let Some(server) = record.server_mut(&invocation.server_name) else {
            return (None, PreferenceReply::NotFound);
        };

        let Some(index) = server.preferences.iter().position(|p| p == preference) else {
            return (None, PreferenceReply::NotFound);
        };

        server.preferences.remove(index);

        let reply = PreferenceReply::Removed {
            user_name: invocation.user_name.clone(),
            preference: preference.to_string(),
        };

        (Some(record), reply)
    })
    .await
}

/// List the invoking user's preferences for the current server.
#[instrument(skip(db), fields(user_id = %invocation.user_id, server = %invocation.server_name))]
pub async fn view_preferences(db: &DbClient, invocation: &CommandInvocation) -> Res<PreferenceReply> {
    let record = db.get_user(&invocation.user_id).await?;

    let preferences = record
        .as_ref()
        .and_then(|record| record.server(&invocation.server_name))
        .map(|server| server.preferences.clone())
        .unwrap_or_default();

    if preferences.is_empty() {
        return Ok(PreferenceReply::Empty {
            user_name: invocation.user_name.clone(),
        });
    }

    Ok(PreferenceReply::Listing {
        user_name: invocation.user_name.clone(),
        preferences,
    })
}

/// Clear the invoking user's preferences for the current server.
#[instrument(skip(db), fields(user_id = %invocation.user_id, server = %invocation.server_name))]
pub async fn reset_preferences(db: &DbClient, invocation: &CommandInvocation) -> Res<PreferenceReply> {
    db.update_user(&invocation.user_id, |current| {
        let Some(mut record) = current else {
            return (None, PreferenceReply::NoUserRecord);
        };

        let Some(server) = record.server_mut(&invocation.server_name) else {
            return (None, PreferenceReply::NoServerEntry);
        };

        server.preferences.clear();

        let reply = PreferenceReply::Reset {
            user_name: invocation.user_name.clone(),
        };

        (Some(record), reply)
    })
    .await
}

// Tests.
