//! Real-time update notifications for subscribed clients.
//!
//! Every user change is announced on the list topic and, for changes a
//! single-user view cares about, on that user's item topic.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::error::UserResult;
use crate::models::UserResponse;
use crate::user::User;

pub const USERS_LIST_TOPIC: &str = "users::update";
pub const USER_ITEM_TOPIC: &str = "user::update";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    UserCreate,
    UserUpdate,
    UserSoftDelete,
    UserRestore,
    UserForceDelete,
    /// Session changes: login, logout, register.
    Update,
}

impl UpdateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateAction::UserCreate => "user_create",
            UpdateAction::UserUpdate => "user_update",
            UpdateAction::UserSoftDelete => "user_soft_delete",
            UpdateAction::UserRestore => "user_restore",
            UpdateAction::UserForceDelete => "user_force_delete",
            UpdateAction::Update => "update",
        }
    }

    fn publishes_to_item(&self) -> bool {
        matches!(
            self,
            UpdateAction::UserUpdate | UpdateAction::UserSoftDelete | UpdateAction::UserForceDelete
        )
    }
}

pub fn item_topic(user: &User) -> String {
    format!("{USER_ITEM_TOPIC}::{}", user.id())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateMessage {
    pub topic: String,
    pub payload: Value,
}

/// Transport to the pub/sub hub.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpdateNotifier: Send + Sync {
    async fn notify(&self, message: UpdateMessage) -> UserResult<()>;
}

/// Writes updates to the log only.
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

#[async_trait]
impl UpdateNotifier for LoggingNotifier {
    async fn notify(&self, message: UpdateMessage) -> UserResult<()> {
        info!(topic = %message.topic, payload = %message.payload, "Update published");
        Ok(())
    }
}

/// In-process hub backed by a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<UpdateMessage>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UpdateMessage> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl UpdateNotifier for BroadcastNotifier {
    async fn notify(&self, message: UpdateMessage) -> UserResult<()> {
        // No subscribers is not a failure.
        if self.tx.send(message).is_err() {
            debug!("Update dropped, no subscribers");
        }
        Ok(())
    }
}

/// Builds update payloads and hands them to the notifier. Failures are
/// logged, never returned.
#[derive(Clone)]
pub struct UserUpdatePublisher {
    notifier: Arc<dyn UpdateNotifier>,
}

impl UserUpdatePublisher {
    pub fn new(notifier: Arc<dyn UpdateNotifier>) -> Self {
        Self { notifier }
    }

    #[instrument(skip(self, user), fields(user_id = %user.id(), action = action.as_str()))]
    pub async fn publish_user(&self, user: &User, action: UpdateAction, causer: Option<&str>) {
        let payload = json!({
            "item": UserResponse::from(user),
            "action": action.as_str(),
            "causer": causer,
        });

        self.publish(USERS_LIST_TOPIC.to_string(), payload.clone())
            .await;

        if action.publishes_to_item() {
            self.publish(item_topic(user), payload).await;
        }
    }

    /// Publishes an arbitrary update as given.
    pub async fn publish(&self, topic: String, payload: Value) {
        let message = UpdateMessage { topic, payload };
        let topic = message.topic.clone();

        if let Err(e) = self.notifier.notify(message).await {
            warn!(topic = %topic, error = %e, "Failed to publish update");
        }
    }
}
