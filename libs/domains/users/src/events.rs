//! Domain events emitted by the user aggregate.
//!
//! Aggregate methods return the events they produce; services hand them to
//! the [`EventPublisher`] after the change is persisted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::UserResult;
use crate::security::Clock;
use crate::value_objects::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UserDomainEvent {
    UserCreated {
        user_id: EntityId,
        email: String,
    },
    UserEmailChanged {
        user_id: EntityId,
        old_email: String,
        new_email: String,
    },
    UserSoftDeleted {
        user_id: EntityId,
    },
    UserRestored {
        user_id: EntityId,
    },
}

impl UserDomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            UserDomainEvent::UserCreated { .. } => "user.created",
            UserDomainEvent::UserEmailChanged { .. } => "user.email_changed",
            UserDomainEvent::UserSoftDeleted { .. } => "user.soft_deleted",
            UserDomainEvent::UserRestored { .. } => "user.restored",
        }
    }

    pub fn aggregate_id(&self) -> EntityId {
        match self {
            UserDomainEvent::UserCreated { user_id, .. }
            | UserDomainEvent::UserEmailChanged { user_id, .. }
            | UserDomainEvent::UserSoftDeleted { user_id }
            | UserDomainEvent::UserRestored { user_id } => *user_id,
        }
    }
}

/// Transport form of a domain event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub aggregate_id: EntityId,
    pub occurred_on: DateTime<Utc>,
    pub payload: Value,
}

impl EventEnvelope {
    pub fn wrap(event: &UserDomainEvent, occurred_on: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type(),
            aggregate_id: event.aggregate_id(),
            occurred_on,
            payload: serde_json::to_value(event).unwrap_or(Value::Null),
        }
    }
}

#[async_trait]
pub trait EventSubscriber: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &EventEnvelope) -> UserResult<()>;
}

/// Subscriber that records every event in the log.
#[derive(Debug, Default, Clone)]
pub struct LoggingEventSubscriber;

#[async_trait]
impl EventSubscriber for LoggingEventSubscriber {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(&self, event: &EventEnvelope) -> UserResult<()> {
        info!(
            event_id = %event.event_id,
            event_type = event.event_type,
            aggregate_id = %event.aggregate_id,
            payload = %event.payload,
            "Domain event"
        );
        Ok(())
    }
}

/// Fans events out to every subscriber. Subscriber failures are logged and
/// never reach the caller.
#[derive(Clone)]
pub struct EventPublisher {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
    clock: Arc<dyn Clock>,
}

impl EventPublisher {
    pub fn new(subscribers: Vec<Arc<dyn EventSubscriber>>, clock: Arc<dyn Clock>) -> Self {
        Self { subscribers, clock }
    }

    #[instrument(skip(self, events), fields(count = events.len()))]
    pub async fn publish(&self, events: Vec<UserDomainEvent>) {
        for event in events {
            let envelope = EventEnvelope::wrap(&event, self.clock.now());

            for subscriber in &self.subscribers {
                if let Err(e) = subscriber.handle(&envelope).await {
                    warn!(
                        subscriber = subscriber.name(),
                        event_type = envelope.event_type,
                        error = %e,
                        "Event subscriber failed"
                    );
                }
            }
        }
    }
}
