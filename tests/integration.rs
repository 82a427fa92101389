#![cfg(test)]

use std::sync::Arc;

use async_trait::async_trait;
use mockall::{mock, predicate::eq};
use relevance_bot::{
    base::{
        config::{Config, ConfigInner},
        pacing::ReconcilePacing,
        types::{ChatServer, CommandInvocation, IncomingMessage, PreferenceReply, RelevanceContext, Res, ServerPreferences, UserPreferences, Void},
    },
    import::{import_users, parse_import},
    interaction::{message_event::process_message_event, preferences, ready_event::reconcile_authorized_users},
    runtime::Runtime,
    service::{
        chat::{
            ChatClient, GenericChatClient,
            commands::{ADD_FAILURE_REPLY, REMOVE_FAILURE_REPLY, RESET_FAILURE_REPLY, VIEW_FAILURE_REPLY, reply_text},
        },
        db::{DbClient, GenericDbClient},
        llm::{GenericLlmClient, LlmClient},
    },
};

// Mocks.

// Mock chat client for testing.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        fn bot_user_id(&self) -> &str;
        async fn start(&self) -> Void;
        async fn send_direct_message(&self, user_id: &str, text: &str) -> Void;
        async fn get_user_name(&self, user_id: &str) -> Res<String>;
        async fn get_owner_id(&self) -> Res<String>;
        async fn get_servers(&self) -> Res<Vec<ChatServer>>;
        async fn is_server_member(&self, server_id: &str, user_id: &str) -> Res<bool>;
    }
}

// Mock LLM client for testing.

mock! {
    pub Llm {}

    #[async_trait]
    impl GenericLlmClient for Llm {
        async fn get_relevance_agent_response(&self, context: &RelevanceContext) -> Res<String>;
    }
}

// Mock database client for testing store failures.

mock! {
    pub Db {}

    #[async_trait]
    impl GenericDbClient for Db {
        async fn get_user_ids(&self) -> Res<Vec<String>>;
        async fn get_all_users(&self) -> Res<Vec<UserPreferences>>;
        async fn get_user(&self, user_id: &str) -> Res<Option<UserPreferences>>;
        async fn upsert_user(&self, record: &UserPreferences) -> Void;
    }
}

const BOT_USER_ID: &str = "1000";
const OWNER_ID: &str = "2000";
const SUBSCRIBER_ID: &str = "3000";

fn get_mock_chat() -> MockChat {
    let mut mock = MockChat::new();

    mock.expect_bot_user_id().return_const(BOT_USER_ID.to_string());
    mock.expect_start().returning(|| Ok(()));

    mock
}

fn get_mock_llm(answer: &'static str) -> MockLlm {
    let mut mock = MockLlm::new();

    mock.expect_get_relevance_agent_response().returning(move |_| Ok(answer.to_string()));

    mock
}

/// Helper function to setup the test environment.
async fn setup_test_environment(chat: MockChat, llm: MockLlm) -> Runtime {
    let config = Config {
        inner: Arc::new(ConfigInner {
            discord_token: "discord-test".to_string(),
            llm_api_key: "llm-test".to_string(),
            command_prefix: "!".to_string(),
            db_endpoint: "mem://".to_string(),
            ..Default::default()
        }),
    };

    // Initialize the database (using in-memory for tests).
    let db = DbClient::surreal_memory().await.expect("Failed to create DB client");

    let llm = LlmClient::new(Arc::new(llm));
    let chat = ChatClient::new(Arc::new(chat));

    Runtime { config, db, llm, chat }
}

fn invocation(user_id: &str, server_name: &str) -> CommandInvocation {
    CommandInvocation {
        user_id: user_id.to_string(),
        user_name: "ferris".to_string(),
        server_name: server_name.to_string(),
    }
}

fn incoming_message(author_id: &str, server_name: &str, content: &str) -> IncomingMessage {
    IncomingMessage {
        author_id: author_id.to_string(),
        author_name: "recruiter".to_string(),
        server_name: server_name.to_string(),
        channel_name: "jobs".to_string(),
        content: content.to_string(),
    }
}

async fn subscribe(db: &DbClient, user_id: &str, server_name: &str, preference: &str) {
    preferences::add_preference(db, &invocation(user_id, server_name), preference)
        .await
        .expect("Failed to add preference");
}

// Preference commands.

#[tokio::test]
async fn test_view_returns_preferences_in_insertion_order() {
    let runtime = setup_test_environment(get_mock_chat(), MockLlm::new()).await;

    for preference in ["rust jobs", "embedded", "async runtimes"] {
        subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", preference).await;
    }

    let reply = preferences::view_preferences(&runtime.db, &invocation(SUBSCRIBER_ID, "Rustaceans")).await.unwrap();

    assert_eq!(
        reply,
        PreferenceReply::Listing {
            user_name: "ferris".to_string(),
            preferences: vec!["rust jobs".to_string(), "embedded".to_string(), "async runtimes".to_string()],
        }
    );
}

#[tokio::test]
async fn test_add_then_view_contains_new_preference() {
    let runtime = setup_test_environment(get_mock_chat(), MockLlm::new()).await;

    subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", "rust jobs").await;
    subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", "rust jobs").await;

    let reply = preferences::view_preferences(&runtime.db, &invocation(SUBSCRIBER_ID, "Rustaceans")).await.unwrap();

    assert_eq!(reply.to_string(), "Current preferences for ferris:\n- rust jobs\n- rust jobs");
}

#[tokio::test]
async fn test_remove_missing_preference_leaves_list_unchanged() {
    let runtime = setup_test_environment(get_mock_chat(), MockLlm::new()).await;

    subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", "rust jobs").await;

    let reply = preferences::remove_preference(&runtime.db, &invocation(SUBSCRIBER_ID, "Rustaceans"), "go jobs").await.unwrap();

    assert_eq!(reply.to_string(), "Preference not found.");
    let record = runtime.db.get_user(SUBSCRIBER_ID).await.unwrap().unwrap();
    assert_eq!(record.server("Rustaceans").unwrap().preferences, vec!["rust jobs"]);
}

#[tokio::test]
async fn test_reset_then_view_is_empty() {
    let runtime = setup_test_environment(get_mock_chat(), MockLlm::new()).await;

    subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", "rust jobs").await;
    subscribe(&runtime.db, SUBSCRIBER_ID, "Gophers", "go jobs").await;

    let reply = preferences::reset_preferences(&runtime.db, &invocation(SUBSCRIBER_ID, "Rustaceans")).await.unwrap();
    assert_eq!(reply.to_string(), "Preferences reset for ferris in this server.");

    let reply = preferences::view_preferences(&runtime.db, &invocation(SUBSCRIBER_ID, "Rustaceans")).await.unwrap();
    assert_eq!(reply.to_string(), "No preferences set for ferris in this server.");

    // Other servers are untouched.
    let reply = preferences::view_preferences(&runtime.db, &invocation(SUBSCRIBER_ID, "Gophers")).await.unwrap();
    assert_eq!(reply.to_string(), "Current preferences for ferris:\n- go jobs");
}

#[tokio::test]
async fn test_concurrent_adds_for_same_user_are_not_lost() {
    let runtime = setup_test_environment(get_mock_chat(), MockLlm::new()).await;

    let tasks = (0..10)
        .map(|i| {
            let db = runtime.db.clone();
            tokio::spawn(async move { subscribe(&db, SUBSCRIBER_ID, "Rustaceans", &format!("topic {i}")).await })
        })
        .collect::<Vec<_>>();

    for task in tasks {
        task.await.unwrap();
    }

    let record = runtime.db.get_user(SUBSCRIBER_ID).await.unwrap().unwrap();
    assert_eq!(record.servers.len(), 1);
    assert_eq!(record.server("Rustaceans").unwrap().preferences.len(), 10);
}

// Store failures.

fn stored_subscriber() -> UserPreferences {
    UserPreferences {
        user_id: SUBSCRIBER_ID.to_string(),
        servers: vec![ServerPreferences { server_name: "Rustaceans".to_string(), preferences: vec!["rust jobs".to_string()] }],
    }
}

/// A store that serves one record and rejects every write.
fn get_read_only_db() -> DbClient {
    let mut mock = MockDb::new();

    mock.expect_get_user().returning(|_| Ok(Some(stored_subscriber())));
    mock.expect_upsert_user().times(3).returning(|_| Err(anyhow::anyhow!("store unavailable")));

    DbClient::new(Arc::new(mock))
}

#[tokio::test]
async fn test_failed_writes_surface_fixed_replies() {
    let db = get_read_only_db();
    let invocation = invocation(SUBSCRIBER_ID, "Rustaceans");

    let result = preferences::add_preference(&db, &invocation, "embedded").await;
    assert!(result.is_err());
    assert_eq!(reply_text(result, ADD_FAILURE_REPLY), "An error occurred while adding the preference.");

    let result = preferences::remove_preference(&db, &invocation, "rust jobs").await;
    assert!(result.is_err());
    assert_eq!(reply_text(result, REMOVE_FAILURE_REPLY), "An error occurred while removing the preference.");

    let result = preferences::reset_preferences(&db, &invocation).await;
    assert!(result.is_err());
    assert_eq!(reply_text(result, RESET_FAILURE_REPLY), "An error occurred while resetting preferences.");

    // The stored record is exactly what it was before the failed commands.
    assert_eq!(db.get_user(SUBSCRIBER_ID).await.unwrap(), Some(stored_subscriber()));
}

#[tokio::test]
async fn test_failed_read_surfaces_fixed_reply() {
    let mut mock = MockDb::new();
    mock.expect_get_user().returning(|_| Err(anyhow::anyhow!("store unavailable")));
    mock.expect_upsert_user().never();

    let db = DbClient::new(Arc::new(mock));

    let result = preferences::view_preferences(&db, &invocation(SUBSCRIBER_ID, "Rustaceans")).await;
    assert!(result.is_err());
    assert_eq!(reply_text(result, VIEW_FAILURE_REPLY), "An error occurred while retrieving preferences.");

    // Nothing is written when the read fails.
    let result = preferences::add_preference(&db, &invocation(SUBSCRIBER_ID, "Rustaceans"), "embedded").await;
    assert_eq!(reply_text(result, ADD_FAILURE_REPLY), ADD_FAILURE_REPLY);
}

#[tokio::test]
async fn test_successful_command_replies_with_outcome() {
    let runtime = setup_test_environment(get_mock_chat(), MockLlm::new()).await;

    let result = preferences::add_preference(&runtime.db, &invocation(SUBSCRIBER_ID, "Rustaceans"), "rust jobs").await;

    assert_eq!(reply_text(result, ADD_FAILURE_REPLY), "New preference added for ferris: rust jobs");
}

// Relevance routing.

#[tokio::test]
async fn test_relevant_message_sends_one_direct_message() {
    let mut chat = get_mock_chat();
    chat.expect_send_direct_message()
        .with(eq(SUBSCRIBER_ID), eq("New relevant post by recruiter in Rustaceans - #jobs:\nHiring Rust engineers now"))
        .times(1)
        .returning(|_, _| Ok(()));

    let mut llm = MockLlm::new();
    llm.expect_get_relevance_agent_response()
        .withf(|context| context.preferences == vec!["rust jobs".to_string()] && context.message_text == "Hiring Rust engineers now")
        .times(1)
        .returning(|_| Ok("Yes".to_string()));

    let runtime = setup_test_environment(chat, llm).await;
    subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", "rust jobs").await;

    let message = incoming_message("4000", "Rustaceans", "Hiring Rust engineers now");
    let notified = process_message_event(&message, &runtime.db, &runtime.llm, &runtime.chat).await.unwrap();

    assert_eq!(notified, 1);
}

#[tokio::test]
async fn test_irrelevant_message_sends_nothing() {
    let mut chat = get_mock_chat();
    chat.expect_send_direct_message().never();

    let runtime = setup_test_environment(chat, get_mock_llm("No")).await;
    subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", "rust jobs").await;

    let message = incoming_message("4000", "Rustaceans", "Hiring Rust engineers now");
    let notified = process_message_event(&message, &runtime.db, &runtime.llm, &runtime.chat).await.unwrap();

    assert_eq!(notified, 0);
}

#[tokio::test]
async fn test_llm_failure_fails_closed() {
    let mut chat = get_mock_chat();
    chat.expect_send_direct_message().never();

    let mut llm = MockLlm::new();
    llm.expect_get_relevance_agent_response().times(1).returning(|_| Err(anyhow::anyhow!("upstream unavailable")));

    let runtime = setup_test_environment(chat, llm).await;
    subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", "rust jobs").await;

    let message = incoming_message("4000", "Rustaceans", "Hiring Rust engineers now");
    let notified = process_message_event(&message, &runtime.db, &runtime.llm, &runtime.chat).await.unwrap();

    assert_eq!(notified, 0);
}

#[tokio::test]
async fn test_messages_only_reach_users_subscribed_to_that_server() {
    let mut chat = get_mock_chat();
    chat.expect_send_direct_message().with(eq(SUBSCRIBER_ID), mockall::predicate::always()).times(1).returning(|_, _| Ok(()));

    let runtime = setup_test_environment(chat, get_mock_llm("yes")).await;
    subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", "rust jobs").await;
    subscribe(&runtime.db, OWNER_ID, "Gophers", "go jobs").await;

    // A user whose entry for the server is empty is skipped, too.
    preferences::add_preference(&runtime.db, &invocation("5000", "Rustaceans"), "anything").await.unwrap();
    preferences::reset_preferences(&runtime.db, &invocation("5000", "Rustaceans")).await.unwrap();

    let message = incoming_message("4000", "Rustaceans", "Hiring Rust engineers now");
    let notified = process_message_event(&message, &runtime.db, &runtime.llm, &runtime.chat).await.unwrap();

    assert_eq!(notified, 1);
}

#[tokio::test]
async fn test_bot_messages_are_ignored() {
    let mut chat = get_mock_chat();
    chat.expect_send_direct_message().never();

    let mut llm = MockLlm::new();
    llm.expect_get_relevance_agent_response().never();

    let runtime = setup_test_environment(chat, llm).await;
    subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", "rust jobs").await;

    let message = incoming_message(BOT_USER_ID, "Rustaceans", "Hiring Rust engineers now");
    let notified = process_message_event(&message, &runtime.db, &runtime.llm, &runtime.chat).await.unwrap();

    assert_eq!(notified, 0);
}

#[tokio::test]
async fn test_failed_delivery_does_not_stop_other_users() {
    let mut chat = get_mock_chat();
    chat.expect_send_direct_message().with(eq(OWNER_ID), mockall::predicate::always()).times(1).returning(|_, _| Err(anyhow::anyhow!("DMs closed")));
    chat.expect_send_direct_message().with(eq(SUBSCRIBER_ID), mockall::predicate::always()).times(1).returning(|_, _| Ok(()));

    let runtime = setup_test_environment(chat, get_mock_llm("Yes")).await;
    subscribe(&runtime.db, OWNER_ID, "Rustaceans", "rust").await;
    subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", "rust jobs").await;

    let message = incoming_message("4000", "Rustaceans", "Hiring Rust engineers now");
    let notified = process_message_event(&message, &runtime.db, &runtime.llm, &runtime.chat).await.unwrap();

    assert_eq!(notified, 1);
}

// Ready reconciliation.

#[tokio::test]
async fn test_ready_seeds_owner_when_no_users_exist() {
    let mut chat = get_mock_chat();
    chat.expect_get_owner_id().times(1).returning(|| Ok(OWNER_ID.to_string()));
    chat.expect_get_servers().returning(|| {
        Ok(vec![
            ChatServer { id: "1".to_string(), name: "Rustaceans".to_string() },
            ChatServer { id: "2".to_string(), name: "Gophers".to_string() },
        ])
    });
    chat.expect_get_user_name().with(eq(OWNER_ID)).returning(|_| Ok("owner".to_string()));
    chat.expect_is_server_member().with(eq("1"), eq(OWNER_ID)).returning(|_, _| Ok(true));
    chat.expect_is_server_member().with(eq("2"), eq(OWNER_ID)).returning(|_, _| Ok(false));

    let runtime = setup_test_environment(chat, MockLlm::new()).await;

    let summary = reconcile_authorized_users(&runtime.db, &runtime.chat, &ReconcilePacing::unlimited()).await.unwrap();

    assert_eq!(runtime.db.get_user_ids().await.unwrap(), vec![OWNER_ID.to_string()]);
    assert_eq!(runtime.db.get_user(OWNER_ID).await.unwrap().unwrap(), UserPreferences::new(OWNER_ID));

    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].user_name, "owner");
    assert_eq!(summary[0].shared_servers, vec!["Rustaceans".to_string()]);
}

#[tokio::test]
async fn test_ready_keeps_existing_users_and_preferences() {
    let mut chat = get_mock_chat();
    chat.expect_get_owner_id().never();
    chat.expect_get_servers().returning(|| Ok(vec![ChatServer { id: "1".to_string(), name: "Rustaceans".to_string() }]));
    chat.expect_get_user_name().returning(|_| Ok("ferris".to_string()));
    chat.expect_is_server_member().returning(|_, _| Err(anyhow::anyhow!("rate limited")));

    let runtime = setup_test_environment(chat, MockLlm::new()).await;
    subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", "rust jobs").await;

    let summary = reconcile_authorized_users(&runtime.db, &runtime.chat, &ReconcilePacing::unlimited()).await.unwrap();

    // Lookup failures are treated as "not shared"; the record itself is untouched.
    assert_eq!(summary.len(), 1);
    assert!(summary[0].shared_servers.is_empty());

    let record = runtime.db.get_user(SUBSCRIBER_ID).await.unwrap().unwrap();
    assert_eq!(record.servers, vec![ServerPreferences { server_name: "Rustaceans".to_string(), preferences: vec!["rust jobs".to_string()] }]);
}

#[tokio::test]
async fn test_ready_skips_users_that_cannot_be_fetched() {
    let mut chat = get_mock_chat();
    chat.expect_get_servers().returning(|| Ok(Vec::new()));
    chat.expect_get_user_name().with(eq(OWNER_ID)).returning(|_| Err(anyhow::anyhow!("Unknown User")));
    chat.expect_get_user_name().with(eq(SUBSCRIBER_ID)).returning(|_| Ok("ferris".to_string()));

    let runtime = setup_test_environment(chat, MockLlm::new()).await;
    subscribe(&runtime.db, OWNER_ID, "Rustaceans", "rust").await;
    subscribe(&runtime.db, SUBSCRIBER_ID, "Rustaceans", "rust jobs").await;

    let summary = reconcile_authorized_users(&runtime.db, &runtime.chat, &ReconcilePacing::unlimited()).await.unwrap();

    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].user_id, SUBSCRIBER_ID);
}

// Import.

#[tokio::test]
async fn test_import_upserts_every_record() {
    let runtime = setup_test_environment(get_mock_chat(), MockLlm::new()).await;

    // An existing record is replaced wholesale.
    subscribe(&runtime.db, OWNER_ID, "Gophers", "go jobs").await;

    let records = parse_import(
        r#"{
            "authorized_users": [
                { "_id": 2000, "servers": [{ "server_name": "Rustaceans", "preferences": ["rust jobs"] }] },
                { "_id": 3000, "servers": [] }
            ]
        }"#,
    )
    .unwrap();

    let count = import_users(&runtime.db, &records).await.unwrap();

    assert_eq!(count, 2);

    let mut ids = runtime.db.get_user_ids().await.unwrap();
    ids.sort();
    assert_eq!(ids, vec![OWNER_ID.to_string(), SUBSCRIBER_ID.to_string()]);

    let owner = runtime.db.get_user(OWNER_ID).await.unwrap().unwrap();
    assert!(owner.server("Gophers").is_none());
    assert_eq!(owner.server("Rustaceans").unwrap().preferences, vec!["rust jobs"]);
}
