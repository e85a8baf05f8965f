use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The action an audited call performed. Classified from the RPC method
/// name by the audit interceptor's substring rule; producers building an
/// entry by hand set it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Read,
    Update,
    Delete,
    Login,
    Logout,
    Solve,
    Analyze,
}

/// Whether the audited call succeeded, failed, or was denied before
/// reaching the handler (e.g. by the rate limiter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

/// Caller identity captured from request metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditIdentity {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// The resource an audited call acted on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditResource {
    pub resource: Option<String>,
    pub resource_id: Option<String>,
}

/// Before/after snapshot for mutation audits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditChanges {
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub changed_fields: Vec<String>,
}

/// A single audit record.
///
/// Metadata values are coerced to strings on write rather than kept as
/// typed JSON — a numeric or boolean value round-trips through `Display`,
/// matching the lossy metadata behavior of the system this was modeled on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub method: String,
    pub action: AuditAction,
    pub outcome: AuditOutcome,
    #[serde(flatten)]
    pub identity: AuditIdentity,
    #[serde(flatten)]
    pub resource: AuditResource,
    pub request_id: Option<String>,
    pub duration_ms: u64,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub changes: Option<AuditChanges>,
}

/// Fluent builder for [`AuditEntry`]. `build()` assigns an id if none was
/// supplied: a millisecond timestamp prefix followed by a random suffix,
/// which collides far less than once in 10^8 per second at any realistic
/// request rate.
pub struct AuditEntryBuilder {
    id: Option<String>,
    service: String,
    method: String,
    action: AuditAction,
    outcome: AuditOutcome,
    identity: AuditIdentity,
    resource: AuditResource,
    request_id: Option<String>,
    duration: Duration,
    error_code: Option<String>,
    error_message: Option<String>,
    metadata: BTreeMap<String, String>,
    changes: Option<AuditChanges>,
}

impl AuditEntryBuilder {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            id: None,
            service: String::new(),
            method: method.into(),
            action: AuditAction::Read,
            outcome: AuditOutcome::Success,
            identity: AuditIdentity::default(),
            resource: AuditResource::default(),
            request_id: None,
            duration: Duration::ZERO,
            error_code: None,
            error_message: None,
            metadata: BTreeMap::new(),
            changes: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = action;
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.identity.user_id = Some(user_id.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.identity.username = Some(username.into());
        self
    }

    pub fn client_ip(mut self, client_ip: impl Into<String>) -> Self {
        self.identity.client_ip = Some(client_ip.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.identity.user_agent = Some(user_agent.into());
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource.resource = Some(resource.into());
        self
    }

    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource.resource_id = Some(resource_id.into());
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Marks the entry as a failure and records the wire error code and
    /// message.
    pub fn error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self.error_message = Some(message.into());
        self.outcome = AuditOutcome::Failure;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl std::fmt::Display) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }

    pub fn changes(mut self, before: Option<serde_json::Value>, after: Option<serde_json::Value>, changed_fields: Vec<String>) -> Self {
        self.changes = Some(AuditChanges { before, after, changed_fields });
        self
    }

    pub fn build(self) -> AuditEntry {
        let id = self.id.unwrap_or_else(generate_id);
        AuditEntry {
            id,
            timestamp: Utc::now(),
            service: self.service,
            method: self.method,
            action: self.action,
            outcome: self.outcome,
            identity: self.identity,
            resource: self.resource,
            request_id: self.request_id,
            duration_ms: self.duration.as_millis() as u64,
            error_code: self.error_code,
            error_message: self.error_message,
            metadata: self.metadata,
            changes: self.changes,
        }
    }
}

fn generate_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{millis}-{}", &suffix[..8])
}

/// Classifies an RPC method name into an [`AuditAction`]: a prefix or
/// embedded verb decides the action; methods matching none of the known
/// verbs default to `READ`.
pub fn classify_action(method: &str) -> AuditAction {
    const CREATE_VERBS: &[&str] = &["Create", "Save", "Register"];
    const READ_VERBS: &[&str] = &["Get", "List", "Find"];
    const UPDATE_VERBS: &[&str] = &["Update", "Refresh"];
    const DELETE_VERBS: &[&str] = &["Delete", "Remove"];

    if method.contains("Login") {
        AuditAction::Login
    } else if method.contains("Logout") {
        AuditAction::Logout
    } else if method.contains("Solve") {
        AuditAction::Solve
    } else if method.contains("Analyze") {
        AuditAction::Analyze
    } else if CREATE_VERBS.iter().any(|v| method.contains(v)) {
        AuditAction::Create
    } else if UPDATE_VERBS.iter().any(|v| method.contains(v)) {
        AuditAction::Update
    } else if DELETE_VERBS.iter().any(|v| method.contains(v)) {
        AuditAction::Delete
    } else if READ_VERBS.iter().any(|v| method.contains(v)) {
        AuditAction::Read
    } else {
        AuditAction::Read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_assigns_an_id_when_none_supplied() {
        let entry = AuditEntryBuilder::new("MaxFlow").build();
        assert!(!entry.id.is_empty());
    }

    #[test]
    fn build_keeps_a_supplied_id() {
        let entry = AuditEntryBuilder::new("MaxFlow").id("fixed-id").build();
        assert_eq!(entry.id, "fixed-id");
    }

    #[test]
    fn error_sets_failure_outcome_and_wire_fields() {
        let entry = AuditEntryBuilder::new("MaxFlow").error("NOT_FOUND", "boom").build();
        assert_eq!(entry.outcome, AuditOutcome::Failure);
        assert_eq!(entry.error_code.as_deref(), Some("NOT_FOUND"));
        assert_eq!(entry.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn metadata_values_are_coerced_to_strings() {
        let entry = AuditEntryBuilder::new("MaxFlow").metadata("node_count", 42).build();
        assert_eq!(entry.metadata.get("node_count"), Some(&"42".to_string()));
    }

    #[test]
    fn two_builds_in_quick_succession_produce_distinct_ids() {
        let a = AuditEntryBuilder::new("MaxFlow").build();
        let b = AuditEntryBuilder::new("MaxFlow").build();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn classify_action_matches_literal_verbs_first() {
        assert_eq!(classify_action("RoutingService/Solve"), AuditAction::Solve);
        assert_eq!(classify_action("AuthService/Login"), AuditAction::Login);
        assert_eq!(classify_action("AuthService/Logout"), AuditAction::Logout);
        assert_eq!(classify_action("AnalyticsService/Analyze"), AuditAction::Analyze);
    }

    #[test]
    fn classify_action_recognizes_crud_substrings() {
        assert_eq!(classify_action("UserService/CreateUser"), AuditAction::Create);
        assert_eq!(classify_action("UserService/GetUser"), AuditAction::Read);
        assert_eq!(classify_action("UserService/ListUsers"), AuditAction::Read);
        assert_eq!(classify_action("UserService/UpdateUser"), AuditAction::Update);
        assert_eq!(classify_action("UserService/DeleteUser"), AuditAction::Delete);
        assert_eq!(classify_action("UserService/RegisterDevice"), AuditAction::Create);
    }

    #[test]
    fn classify_action_defaults_to_read_for_unmatched_methods() {
        assert_eq!(classify_action("Health/Check"), AuditAction::Read);
    }
}
