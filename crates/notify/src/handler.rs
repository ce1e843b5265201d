//! Per-notification orchestration.
//!
//! A [`NotificationHandler`] owns one resolution of `(reference object,
//! identifier)` and walks the event's mediums in stored order: render
//! the template, pick the sender, send, then run the follow-up hook.
//! The first failure stops the walk; mediums already sent stay sent.

use std::sync::Arc;
use std::time::Instant;

use crate::model::{EventMedium, Medium, ReferenceObject, User};
use crate::registry::SenderRegistry;
use crate::resolver::{EventStore, NotificationResolver};
use crate::templating::TemplateRenderer;
use crate::traits::{DispatchResult, NotifyError};

/// What the follow-up hook sees after a successful send.
#[derive(Debug, Clone, Copy)]
pub struct FollowupContext<'a> {
    pub identifier: &'a str,
    pub medium: &'a Medium,
    pub user: &'a User,
    pub text: &'a str,
}

/// Side effects to run after each per-medium send.
///
/// Errors are returned to the caller of the dispatch unchanged.
#[async_trait::async_trait]
pub trait FollowupHook: Send + Sync {
    async fn after_send(&self, ctx: &FollowupContext<'_>) -> Result<(), NotifyError>;
}

/// Hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

#[async_trait::async_trait]
impl FollowupHook for NoopHook {
    async fn after_send(&self, _ctx: &FollowupContext<'_>) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Rendered text for one medium, without sending it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMedium {
    pub medium: Medium,
    pub text: String,
}

pub struct NotificationHandler<'a> {
    resolver: NotificationResolver<'a>,
    registry: Arc<SenderRegistry>,
    renderer: TemplateRenderer,
    hook: Arc<dyn FollowupHook>,
}

impl<'a> NotificationHandler<'a> {
    pub fn new(
        ref_obj: &'a dyn ReferenceObject,
        identifier: impl Into<String>,
        store: Arc<dyn EventStore>,
        registry: Arc<SenderRegistry>,
    ) -> Self {
        Self {
            resolver: NotificationResolver::new(ref_obj, identifier, store),
            registry,
            renderer: TemplateRenderer::new(),
            hook: Arc::new(NoopHook),
        }
    }

    /// Replace the follow-up hook (default: [`NoopHook`]).
    pub fn with_hook(mut self, hook: Arc<dyn FollowupHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn resolver(&self) -> &NotificationResolver<'a> {
        &self.resolver
    }

    /// Render the event's template for `medium` against the reference object.
    ///
    /// Looks the template up by slug; the first association wins.
    pub async fn generate_text_for_medium(&self, medium: &Medium) -> Result<String, NotifyError> {
        let event = self.resolver.event().await?;
        Ok(self.render(medium, event.text_for_medium(medium)))
    }

    fn render_association(&self, association: &EventMedium) -> String {
        self.render(&association.medium, &association.text)
    }

    fn render(&self, medium: &Medium, template: &str) -> String {
        tracing::debug!(
            identifier = self.resolver.identifier(),
            medium = %medium.slug,
            fields = ?self.renderer.placeholders(template),
            "rendering template"
        );
        self.renderer.render(template, self.resolver.reference())
    }

    /// Resolve everything `send` would, without delivering.
    ///
    /// Fails the same way `send` would before its first delivery:
    /// missing event, missing user, or an unroutable medium.
    pub async fn preview(&self) -> Result<Vec<RenderedMedium>, NotifyError> {
        let event = self.resolver.event().await?;
        self.resolver.user()?;

        let mut rendered = Vec::with_capacity(event.mediums.len());
        for association in &event.mediums {
            self.registry.get_sender(&association.medium)?;
            rendered.push(RenderedMedium {
                medium: association.medium.clone(),
                text: self.render_association(association),
            });
        }
        Ok(rendered)
    }

    /// Deliver the notification through every medium of the event.
    ///
    /// Returns one [`DispatchResult`] per delivered medium. An error
    /// aborts the remaining mediums and is returned as is.
    pub async fn send(&self) -> Result<Vec<DispatchResult>, NotifyError> {
        let identifier = self.resolver.identifier();
        let event = self.resolver.event().await?;
        let user = self.resolver.user()?;

        if event.mediums.is_empty() {
            tracing::debug!(identifier, "event has no mediums, nothing to send");
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(event.mediums.len());

        for association in &event.mediums {
            let medium = &association.medium;
            let text = self.render_association(association);
            let sender = self.registry.get_sender(medium)?;

            let start = Instant::now();
            if let Err(e) = sender.send(user, &text).await {
                tracing::warn!(
                    identifier,
                    medium = %medium.slug,
                    user = %user.id,
                    error = %e,
                    "notification delivery failed"
                );
                return Err(e);
            }
            let duration_ms = start.elapsed().as_millis() as u64;

            tracing::info!(
                identifier,
                medium = %medium.slug,
                user = %user.id,
                duration_ms,
                "notification delivered"
            );

            self.hook
                .after_send(&FollowupContext {
                    identifier,
                    medium,
                    user,
                    text: &text,
                })
                .await?;

            results.push(DispatchResult {
                medium: medium.slug.clone(),
                label: medium.label.clone(),
                duration_ms,
            });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JsonObject, NotificationEvent};
    use crate::resolver::InMemoryEventStore;
    use crate::traits::Sender;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recording {
        slug: &'static str,
        log: Log,
    }

    #[async_trait::async_trait]
    impl Sender for Recording {
        fn slug(&self) -> &str {
            self.slug
        }

        async fn send(&self, user: &User, text: &str) -> Result<(), NotifyError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("send:{}:{}:{}", self.slug, user.id, text));
            Ok(())
        }
    }

    struct HookLog(Log);

    #[async_trait::async_trait]
    impl FollowupHook for HookLog {
        async fn after_send(&self, ctx: &FollowupContext<'_>) -> Result<(), NotifyError> {
            self.0
                .lock()
                .unwrap()
                .push(format!("hook:{}:{}", ctx.identifier, ctx.medium.slug));
            Ok(())
        }
    }

    fn setup(log: &Log) -> (Arc<dyn EventStore>, Arc<SenderRegistry>) {
        let store = InMemoryEventStore::from_events([NotificationEvent::new("order-shipped")
            .with_medium(Medium::new("email", "E-mail"), "Hi {{ name }}, order {{ order }} shipped")
            .with_medium(Medium::new("sms", "SMS"), "{{order}} shipped")]);

        let mut registry = SenderRegistry::new();
        registry.register_sender(Recording {
            slug: "email",
            log: log.clone(),
        });
        registry.register_sender(Recording {
            slug: "sms",
            log: log.clone(),
        });

        (Arc::new(store), Arc::new(registry))
    }

    fn order() -> JsonObject {
        JsonObject::from_json_str(r#"{"name": "Ann", "order": "A-17", "user": {"id": "u1"}}"#)
            .unwrap()
    }

    #[tokio::test]
    async fn send_runs_hook_after_each_medium() {
        let log: Log = Arc::default();
        let (store, registry) = setup(&log);
        let obj = order();

        let handler = NotificationHandler::new(&obj, "order-shipped", store, registry)
            .with_hook(Arc::new(HookLog(log.clone())));
        let results = handler.send().await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "send:email:u1:Hi Ann, order A-17 shipped",
                "hook:order-shipped:email",
                "send:sms:u1:A-17 shipped",
                "hook:order-shipped:sms",
            ]
        );
    }

    #[tokio::test]
    async fn generate_text_for_medium_renders_template() {
        let log: Log = Arc::default();
        let (store, registry) = setup(&log);
        let obj = order();

        let handler = NotificationHandler::new(&obj, "order-shipped", store, registry);
        let text = handler
            .generate_text_for_medium(&Medium::new("sms", "SMS"))
            .await
            .unwrap();
        assert_eq!(text, "A-17 shipped");
    }

    #[tokio::test]
    async fn preview_does_not_send() {
        let log: Log = Arc::default();
        let (store, registry) = setup(&log);
        let obj = order();

        let handler = NotificationHandler::new(&obj, "order-shipped", store, registry);
        let rendered = handler.preview().await.unwrap();

        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].medium.slug, "email");
        assert_eq!(rendered[0].text, "Hi Ann, order A-17 shipped");
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_slug_associations_keep_their_own_text() {
        let log: Log = Arc::default();
        let (_, registry) = setup(&log);
        let store: Arc<dyn EventStore> =
            Arc::new(InMemoryEventStore::from_events([NotificationEvent::new("twice")
                .with_medium(Medium::new("email", "E-mail"), "first")
                .with_medium(Medium::new("email", "E-mail"), "second")]));
        let obj = order();

        let handler = NotificationHandler::new(&obj, "twice", store, registry);
        let rendered = handler.preview().await.unwrap();
        let texts: Vec<&str> = rendered.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);

        handler.send().await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["send:email:u1:first", "send:email:u1:second"]
        );
    }

    #[tokio::test]
    async fn hook_failure_propagates() {
        struct Failing;

        #[async_trait::async_trait]
        impl FollowupHook for Failing {
            async fn after_send(&self, _ctx: &FollowupContext<'_>) -> Result<(), NotifyError> {
                Err(NotifyError::Hook("audit table unavailable".to_string()))
            }
        }

        let log: Log = Arc::default();
        let (store, registry) = setup(&log);
        let obj = order();

        let handler = NotificationHandler::new(&obj, "order-shipped", store, registry)
            .with_hook(Arc::new(Failing));
        let err = handler.send().await.unwrap_err();

        assert!(matches!(err, NotifyError::Hook(_)), "got: {err:?}");
        // First medium was sent before its hook failed; the second was not.
        assert_eq!(*log.lock().unwrap(), vec!["send:email:u1:Hi Ann, order A-17 shipped"]);
    }

    #[tokio::test]
    async fn missing_user_stops_before_sending() {
        let log: Log = Arc::default();
        let (store, registry) = setup(&log);
        let obj = JsonObject::from_json_str(r#"{"name": "Ann"}"#).unwrap();

        let handler = NotificationHandler::new(&obj, "order-shipped", store, registry);
        let err = handler.send().await.unwrap_err();

        assert!(matches!(err, NotifyError::UserNotFound), "got: {err:?}");
        assert!(log.lock().unwrap().is_empty());
    }
}
