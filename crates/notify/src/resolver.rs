//! Event and recipient resolution for a single notification.
//!
//! [`NotificationResolver`] looks up the event for an identifier and
//! the user behind a reference object. Both results are computed at
//! most once per resolver and reused afterwards.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::model::{NotificationEvent, ReferenceObject, User};
use crate::traits::NotifyError;

// ── Event store ─────────────────────────────────────────────────────

/// Source of notification events.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Load the event for `identifier` together with its mediums.
    ///
    /// Returns `Ok(None)` when no event matches.
    async fn find_event_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<NotificationEvent>, NotifyError>;
}

/// Event store held in memory, optionally loaded from YAML.
///
/// When several events share an identifier, the first one inserted wins.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    events: Vec<NotificationEvent>,
}

#[derive(Debug, Deserialize)]
struct EventsFile {
    #[serde(default)]
    events: Vec<NotificationEvent>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: impl IntoIterator<Item = NotificationEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Parse a YAML document of the form `events: [...]`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, NotifyError> {
        let file: EventsFile = serde_yaml::from_str(yaml)
            .map_err(|e| NotifyError::Store(format!("invalid events YAML: {e}")))?;
        Ok(Self::from_events(file.events))
    }

    /// Read and parse a YAML events file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, NotifyError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| NotifyError::Store(format!("failed to read {}: {e}", path.display())))?;
        let store = Self::from_yaml_str(&yaml)?;
        tracing::info!(path = %path.display(), events = store.len(), "loaded notification events");
        Ok(store)
    }

    pub fn insert(&mut self, event: NotificationEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn find_event_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<NotificationEvent>, NotifyError> {
        Ok(self
            .events
            .iter()
            .find(|e| e.identifier == identifier)
            .cloned())
    }
}

// ── Resolver ────────────────────────────────────────────────────────

/// Resolves the event and user for one `(reference object, identifier)` pair.
pub struct NotificationResolver<'a> {
    ref_obj: &'a dyn ReferenceObject,
    identifier: String,
    store: Arc<dyn EventStore>,
    event: OnceCell<NotificationEvent>,
    user: OnceLock<User>,
}

impl<'a> NotificationResolver<'a> {
    pub fn new(
        ref_obj: &'a dyn ReferenceObject,
        identifier: impl Into<String>,
        store: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            ref_obj,
            identifier: identifier.into(),
            store,
            event: OnceCell::new(),
            user: OnceLock::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn reference(&self) -> &'a dyn ReferenceObject {
        self.ref_obj
    }

    /// The event for this resolver's identifier.
    ///
    /// The store is queried on first success only. A failed lookup is
    /// not cached and will be retried on the next call.
    pub async fn event(&self) -> Result<&NotificationEvent, NotifyError> {
        self.event
            .get_or_try_init(|| async {
                let found = self
                    .store
                    .find_event_by_identifier(&self.identifier)
                    .await?;
                found.ok_or_else(|| NotifyError::EventNotFound {
                    identifier: self.identifier.clone(),
                })
            })
            .await
    }

    /// The recipient: the reference object itself when it is a user,
    /// otherwise its `user` relation.
    pub fn user(&self) -> Result<&User, NotifyError> {
        if let Some(user) = self.user.get() {
            return Ok(user);
        }

        let user = self
            .ref_obj
            .as_user()
            .or_else(|| self.ref_obj.user().filter(|u| !u.is_empty()))
            .ok_or(NotifyError::UserNotFound)?;

        Ok(self.user.get_or_init(|| user))
    }
}
