//! Entry point for sending notifications.
//!
//! The dispatcher holds the long-lived collaborators (event store,
//! sender registry, follow-up hook) and builds a fresh
//! [`NotificationHandler`] per dispatch, so nothing resolved for one
//! notification leaks into the next.

use std::sync::Arc;

use crate::handler::{FollowupHook, NoopHook, NotificationHandler};
use crate::model::ReferenceObject;
use crate::registry::SenderRegistry;
use crate::resolver::EventStore;
use crate::traits::{DispatchResult, NotifyError};

/// Dispatches notification events to the senders of their mediums.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn EventStore>,
    registry: Arc<SenderRegistry>,
    hook: Arc<dyn FollowupHook>,
}

impl Dispatcher {
    /// Create a dispatcher with a no-op follow-up hook.
    pub fn new(store: Arc<dyn EventStore>, registry: Arc<SenderRegistry>) -> Self {
        Self {
            store,
            registry,
            hook: Arc::new(NoopHook),
        }
    }

    /// Run `hook` after every per-medium send.
    pub fn with_hook(mut self, hook: Arc<dyn FollowupHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn registry(&self) -> &SenderRegistry {
        &self.registry
    }

    /// Build the handler for one notification.
    pub fn handler<'a>(
        &self,
        ref_obj: &'a dyn ReferenceObject,
        identifier: &str,
    ) -> NotificationHandler<'a> {
        NotificationHandler::new(ref_obj, identifier, self.store.clone(), self.registry.clone())
            .with_hook(self.hook.clone())
    }

    /// Send the event `identifier` about `ref_obj` through all its mediums.
    ///
    /// See [`NotificationHandler::send`] for the failure semantics.
    pub async fn dispatch(
        &self,
        ref_obj: &dyn ReferenceObject,
        identifier: &str,
    ) -> Result<Vec<DispatchResult>, NotifyError> {
        tracing::debug!(identifier, "dispatching notification");
        self.handler(ref_obj, identifier).send().await
    }
}
