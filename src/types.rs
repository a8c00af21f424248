//! Core types for the Pro IRP backend.
//!
//! Everything that crosses the HTTP boundary serializes with camelCase field
//! names. Timestamps are milliseconds since the Unix epoch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default cap on the number of comms kept per client.
pub const MAX_COMMS_PER_CLIENT: usize = 5000;

/// Longest comm preview kept, in characters.
pub const MAX_PREVIEW_CHARS: usize = 500;

/// A validation failure tied to one input field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
    /// The field was absent rather than malformed.
    pub missing: bool,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            missing: false,
        }
    }

    pub fn required(field: &str) -> Self {
        Self {
            missing: true,
            ..Self::new(field, format!("{} is required", field))
        }
    }
}

/// Retention risk label assigned to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            "unknown" => Some(RiskLevel::Unknown),
            _ => None,
        }
    }
}

/// Lifecycle status of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    #[default]
    Lead,
    Active,
    AtRisk,
    Churned,
}

impl ClientStatus {
    pub const ALL: [ClientStatus; 4] = [
        ClientStatus::Lead,
        ClientStatus::Active,
        ClientStatus::AtRisk,
        ClientStatus::Churned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Lead => "lead",
            ClientStatus::Active => "active",
            ClientStatus::AtRisk => "at_risk",
            ClientStatus::Churned => "churned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lead" => Some(ClientStatus::Lead),
            "active" => Some(ClientStatus::Active),
            "at_risk" => Some(ClientStatus::AtRisk),
            "churned" => Some(ClientStatus::Churned),
            _ => None,
        }
    }
}

/// Channel a comm happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommType {
    Sms,
    Email,
    Call,
    Note,
}

impl CommType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommType::Sms => "sms",
            CommType::Email => "email",
            CommType::Call => "call",
            CommType::Note => "note",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sms" => Some(CommType::Sms),
            "email" => Some(CommType::Email),
            "call" => Some(CommType::Call),
            "note" => Some(CommType::Note),
            _ => None,
        }
    }
}

/// Direction of a comm relative to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommDirection {
    Inbound,
    Outbound,
    #[default]
    Internal,
}

impl CommDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommDirection::Inbound => "inbound",
            CommDirection::Outbound => "outbound",
            CommDirection::Internal => "internal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(CommDirection::Inbound),
            "outbound" => Some(CommDirection::Outbound),
            "internal" => Some(CommDirection::Internal),
            _ => None,
        }
    }
}

/// A logged communication event attached to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comm {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CommType,
    #[serde(default)]
    pub direction: CommDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub created_at: i64,
}

/// Metadata for a file uploaded against a client. Bytes live on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub id: String,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_at: i64,
}

/// An insurance customer or prospect owned by one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub risk: RiskLevel,
    #[serde(default)]
    pub status: ClientStatus,
    #[serde(default)]
    pub comms: Vec<Comm>,
    #[serde(default)]
    pub uploads: Vec<Upload>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

/// Input for creating a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub carrier: Option<String>,
    pub plan: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub risk: Option<RiskLevel>,
    pub status: Option<ClientStatus>,
}

impl NewClient {
    /// Validate the input and build a client owned by `user_id`.
    pub fn into_client(self, user_id: &str, id: String, now: i64) -> Result<Client, FieldError> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| FieldError::required("name"))?
            .to_string();
        let email = non_blank(self.email);
        if let Some(ref email) = email {
            validate_email(email)?;
        }

        Ok(Client {
            id,
            user_id: user_id.to_string(),
            name,
            email,
            phone: non_blank(self.phone),
            address: non_blank(self.address),
            date_of_birth: non_blank(self.date_of_birth),
            carrier: non_blank(self.carrier),
            plan: non_blank(self.plan),
            notes: non_blank(self.notes),
            tags: normalize_tags(self.tags.unwrap_or_default()),
            risk: self.risk.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            comms: Vec::new(),
            uploads: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update for a client. Absent fields are left alone; an empty
/// string clears an optional text field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub carrier: Option<String>,
    pub plan: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub risk: Option<RiskLevel>,
    pub status: Option<ClientStatus>,
}

impl ClientPatch {
    /// Apply the patch in place. Validation happens before any field changes.
    pub fn apply(self, client: &mut Client, now: i64) -> Result<(), FieldError> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err(FieldError::new("name", "name cannot be empty"));
            }
        }
        if let Some(email) = self.email.as_deref().map(str::trim) {
            if !email.is_empty() {
                validate_email(email)?;
            }
        }

        if let Some(name) = self.name {
            client.name = name.trim().to_string();
        }
        patch_text(&mut client.email, self.email);
        patch_text(&mut client.phone, self.phone);
        patch_text(&mut client.address, self.address);
        patch_text(&mut client.date_of_birth, self.date_of_birth);
        patch_text(&mut client.carrier, self.carrier);
        patch_text(&mut client.plan, self.plan);
        patch_text(&mut client.notes, self.notes);
        if let Some(tags) = self.tags {
            client.tags = normalize_tags(tags);
        }
        if let Some(risk) = self.risk {
            client.risk = risk;
        }
        if let Some(status) = self.status {
            client.status = status;
        }
        client.updated_at = now;
        Ok(())
    }
}

/// Input for logging a comm.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComm {
    #[serde(rename = "type")]
    pub kind: Option<CommType>,
    pub direction: Option<CommDirection>,
    pub subject: Option<String>,
    #[serde(alias = "body", alias = "text")]
    pub preview: Option<String>,
    pub metadata: Option<Value>,
}

impl NewComm {
    pub fn into_comm(self, id: String, now: i64) -> Result<Comm, FieldError> {
        let kind = self.kind.ok_or_else(|| FieldError::required("type"))?;
        let preview = non_blank(self.preview).map(|p| truncate_chars(&p, MAX_PREVIEW_CHARS));

        Ok(Comm {
            id,
            kind,
            direction: self.direction.unwrap_or_default(),
            subject: non_blank(self.subject),
            preview,
            metadata: self.metadata.filter(|m| !m.is_null()),
            created_at: now,
        })
    }
}

/// Prepend `comm` to a newest-first log and drop the oldest entries past `cap`.
pub fn push_comm(comms: &mut Vec<Comm>, comm: Comm, cap: usize) {
    comms.insert(0, comm);
    comms.truncate(cap.max(1));
}

/// Task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(TaskStatus::Open),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

/// A follow-up item for an agent, optionally tied to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: Option<String>,
    pub client_id: Option<String>,
    pub due_at: Option<i64>,
    pub notes: Option<String>,
}

impl NewTask {
    /// Returns the trimmed title, or an error if it is missing.
    pub fn validated_title(&self) -> Result<String, FieldError> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| FieldError::required("title"))
    }
}

/// Filters for listing tasks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub client_id: Option<String>,
}

/// Role of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Agent,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Agent => "agent",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "agent" => Some(UserRole::Agent),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// An agent account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: i64,
}

/// Lowercase and trim an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose shape check: one `@` with something on both sides and a dot in the domain.
pub fn validate_email(email: &str) -> Result<(), FieldError> {
    let valid = match email.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FieldError::new("email", format!("invalid email address: {}", email)))
    }
}

/// Trim tags, drop blanks and duplicates, keep first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            out.push(tag.to_string());
        }
    }
    out
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn patch_text(field: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        *field = non_blank(Some(value));
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
