//! Templated notification dispatch across pluggable delivery mediums.
//!
//! This crate provides:
//! - `Sender` trait for pluggable delivery channels, plus email,
//!   Telegram, webhook and log implementations
//! - `SenderRegistry` routing a medium's slug to its sender
//! - `{{ field }}` placeholder rendering against a reference object
//! - `NotificationResolver` loading the event and recipient once per notification
//! - `Dispatcher` walking an event's mediums: render, route, send, follow up

pub mod config;
pub mod dispatcher;
pub mod email;
pub mod handler;
pub mod log;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod telegram;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use config::NotifyConfig;
pub use dispatcher::Dispatcher;
pub use handler::{FollowupContext, FollowupHook, NoopHook, NotificationHandler};
pub use model::{JsonObject, Medium, NotificationEvent, ReferenceObject, User};
pub use registry::SenderRegistry;
pub use resolver::{EventStore, InMemoryEventStore, NotificationResolver};
pub use traits::{DispatchResult, NotifyError, Sender};
