//! Events, mediums, users, and the reference objects templates read from.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::traits::NotifyError;

// ── Mediums and events ──────────────────────────────────────────────

/// A delivery channel, routed to a sender by its slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Medium {
    /// Stable routing key (e.g. `"email"`).
    pub slug: String,
    /// Human-readable name (e.g. `"E-mail"`).
    pub label: String,
}

impl Medium {
    pub fn new(slug: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            label: label.into(),
        }
    }
}

/// A medium attached to an event, with the template used for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMedium {
    #[serde(flatten)]
    pub medium: Medium,
    /// Raw template text, rendered against the reference object.
    #[serde(default)]
    pub text: String,
}

/// A named notification definition with per-medium templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub identifier: String,
    /// Associations in stored order.
    #[serde(default)]
    pub mediums: Vec<EventMedium>,
}

impl NotificationEvent {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            mediums: Vec::new(),
        }
    }

    /// Attach a medium with its template, after the existing ones.
    pub fn with_medium(mut self, medium: Medium, text: impl Into<String>) -> Self {
        self.mediums.push(EventMedium {
            medium,
            text: text.into(),
        });
        self
    }

    /// Mediums in stored order.
    pub fn mediums(&self) -> impl Iterator<Item = &Medium> {
        self.mediums.iter().map(|m| &m.medium)
    }

    /// Template text configured for `medium`, or `""` when the medium
    /// is not attached to this event.
    pub fn text_for_medium(&self, medium: &Medium) -> &str {
        self.mediums
            .iter()
            .find(|m| m.medium.slug == medium.slug)
            .map(|m| m.text.as_str())
            .unwrap_or("")
    }
}

// ── Users ───────────────────────────────────────────────────────────

/// Notification recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Accepts a string or a numeric primary key.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

impl User {
    /// A user with neither id nor username does not identify anyone.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.username.is_empty()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Text(s)) => s,
        Some(Id::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

// ── Reference objects ───────────────────────────────────────────────

/// Read-only view of the record a notification is about.
///
/// Templates pull named fields from it, and the dispatch pipeline
/// derives the recipient from it. Unknown fields are `None`, never an
/// error.
pub trait ReferenceObject: Send + Sync {
    /// String value of the field called `name`.
    fn field(&self, name: &str) -> Option<String>;

    /// The `user` relation, if the object has one.
    fn user(&self) -> Option<User> {
        None
    }

    /// The object itself, when it is a user.
    fn as_user(&self) -> Option<User> {
        None
    }
}

impl ReferenceObject for User {
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.clone()),
            "username" => Some(self.username.clone()),
            "email" => self.email.clone(),
            "phone" => self.phone.clone(),
            "telegram_chat_id" => self.telegram_chat_id.clone(),
            _ => None,
        }
    }

    fn as_user(&self) -> Option<User> {
        Some(self.clone())
    }
}

impl ReferenceObject for HashMap<String, String> {
    fn field(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Reference object backed by a JSON object.
///
/// Strings render verbatim, numbers and booleans as their JSON text.
/// `null`, arrays and nested objects count as absent. The `user` key
/// holds either a [`User`] object or a bare user id (string or number).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonObject(serde_json::Map<String, serde_json::Value>);

impl JsonObject {
    pub fn from_value(value: serde_json::Value) -> Result<Self, NotifyError> {
        match value {
            serde_json::Value::Object(map) => Ok(Self(map)),
            other => Err(NotifyError::Config(format!(
                "reference object must be a JSON object, got: {other}"
            ))),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, NotifyError> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| NotifyError::Config(format!("invalid reference object JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }
}

impl ReferenceObject for JsonObject {
    fn field(&self, name: &str) -> Option<String> {
        match self.0.get(name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn user(&self) -> Option<User> {
        let value = self.0.get("user")?;
        match value {
            serde_json::Value::String(id) if !id.is_empty() => Some(User {
                id: id.clone(),
                ..User::default()
            }),
            serde_json::Value::Number(id) => Some(User {
                id: id.to_string(),
                ..User::default()
            }),
            serde_json::Value::Object(map) if !map.is_empty() => {
                match serde_json::from_value::<User>(value.clone()) {
                    Ok(user) => Some(user),
                    Err(e) => {
                        tracing::warn!(error = %e, "reference object `user` is not a valid user");
                        None
                    }
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> NotificationEvent {
        NotificationEvent::new("order-shipped")
            .with_medium(Medium::new("email", "E-mail"), "Hi {{ name }}")
            .with_medium(Medium::new("sms", "SMS"), "Shipped")
    }

    #[test]
    fn mediums_keep_stored_order() {
        let event = sample_event();
        let slugs: Vec<&str> = event.mediums().map(|m| m.slug.as_str()).collect();
        assert_eq!(slugs, vec!["email", "sms"]);
    }

    #[test]
    fn text_for_attached_medium() {
        let event = sample_event();
        assert_eq!(event.text_for_medium(&Medium::new("sms", "SMS")), "Shipped");
    }

    #[test]
    fn text_for_unattached_medium_is_empty() {
        let event = sample_event();
        assert_eq!(event.text_for_medium(&Medium::new("push", "Push")), "");
    }

    #[test]
    fn user_is_its_own_user() {
        let user = User {
            id: "42".to_string(),
            username: "ann".to_string(),
            email: Some("ann@example.com".to_string()),
            ..User::default()
        };
        assert_eq!(user.as_user(), Some(user.clone()));
        assert_eq!(user.field("username").as_deref(), Some("ann"));
        assert_eq!(user.field("email").as_deref(), Some("ann@example.com"));
        assert_eq!(user.field("phone"), None);
        assert_eq!(user.field("password"), None);
    }

    #[test]
    fn json_object_scalar_fields() {
        let obj = JsonObject::from_json_str(
            r#"{"name": "Ann", "count": 3, "paid": true, "note": null, "tags": ["a"]}"#,
        )
        .unwrap();
        assert_eq!(obj.field("name").as_deref(), Some("Ann"));
        assert_eq!(obj.field("count").as_deref(), Some("3"));
        assert_eq!(obj.field("paid").as_deref(), Some("true"));
        assert_eq!(obj.field("note"), None);
        assert_eq!(obj.field("tags"), None);
        assert_eq!(obj.field("missing"), None);
        assert_eq!(obj.as_user(), None);
    }

    #[test]
    fn json_object_user_relation() {
        let obj = JsonObject::from_json_str(
            r#"{"user": {"id": "7", "username": "bob", "email": "bob@example.com"}}"#,
        )
        .unwrap();
        let user = obj.user().unwrap();
        assert_eq!(user.id, "7");
        assert_eq!(user.email.as_deref(), Some("bob@example.com"));
    }

    #[test]
    fn json_object_user_id_string() {
        let obj = JsonObject::from_json_str(r#"{"user": "u-1"}"#).unwrap();
        assert_eq!(obj.user().unwrap().id, "u-1");
    }

    #[test]
    fn json_object_numeric_user_ids() {
        let obj = JsonObject::from_json_str(r#"{"user": 42}"#).unwrap();
        assert_eq!(obj.user().unwrap().id, "42");

        let obj = JsonObject::from_json_str(r#"{"user": {"id": 42, "username": "ann"}}"#).unwrap();
        let user = obj.user().unwrap();
        assert_eq!(user.id, "42");
        assert_eq!(user.username, "ann");
    }

    #[test]
    fn user_id_from_yaml_number_or_null() {
        let user: User = serde_yaml::from_str("id: 7\nusername: bob").unwrap();
        assert_eq!(user.id, "7");

        let user: User = serde_yaml::from_str("id: null\nusername: bob").unwrap();
        assert_eq!(user.id, "");
        assert_eq!(user.username, "bob");
    }

    #[test]
    fn json_object_empty_user_is_absent() {
        for raw in [r#"{"user": null}"#, r#"{"user": ""}"#, r#"{"user": {}}"#, "{}"] {
            let obj = JsonObject::from_json_str(raw).unwrap();
            assert_eq!(obj.user(), None, "input: {raw}");
        }
    }

    #[test]
    fn json_object_rejects_non_objects() {
        let err = JsonObject::from_json_str("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("must be a JSON object"), "got: {err}");
    }

    #[test]
    fn event_deserializes_flattened_mediums() {
        let yaml = r#"
identifier: welcome
mediums:
  - slug: email
    label: E-mail
    text: "Welcome {{ username }}"
  - slug: log
    label: Log
"#;
        let event: NotificationEvent = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(event.identifier, "welcome");
        assert_eq!(event.mediums.len(), 2);
        assert_eq!(event.mediums[0].medium, Medium::new("email", "E-mail"));
        assert_eq!(event.mediums[0].text, "Welcome {{ username }}");
        assert_eq!(event.mediums[1].text, "");
    }
}
