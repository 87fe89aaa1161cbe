use committee_core_types::RequestId;
use thiserror::Error;

/// Result type alias using CommitteeError
pub type Result<T> = std::result::Result<T, CommitteeError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure surfaced by the orchestrators collapses into one of these
/// four kinds. The transport boundary maps them to status classes and must
/// preserve the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    /// Referenced committee, project, parent, member or key does not exist
    NotFound,
    /// Uniqueness violation or stale revision
    Conflict,
    /// Malformed input or category-conditional rule violation
    Validation,
    /// Internal, storage or transport failure (including exhausted retries)
    Unexpected,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::Conflict => "ERR_CONFLICT",
            ExErrorKind::Validation => "ERR_VALIDATION",
            ExErrorKind::Unexpected => "ERR_UNEXPECTED",
        }
    }

    /// HTTP-like status class used by the transport boundary
    pub fn status_class(&self) -> u16 {
        match self {
            ExErrorKind::NotFound => 404,
            ExErrorKind::Conflict => 409,
            ExErrorKind::Validation => 400,
            ExErrorKind::Unexpected => 500,
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus enough context (operation, entity, key)
/// for the transport layer to serialize a response without re-parsing
/// messages.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    key: Option<String>,
    request_id: Option<RequestId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            key: None,
            request_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity UID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add storage key context
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn status_class(&self) -> u16 {
        self.kind.status_class()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {})", key)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain error taxonomy for committee orchestration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommitteeError {
    // ===== Existence =====
    #[error("committee not found: {uid}")]
    CommitteeNotFound { uid: String },

    #[error("committee settings not found: {uid}")]
    SettingsNotFound { uid: String },

    #[error("committee member not found: {uid}")]
    MemberNotFound { uid: String },

    #[error("project not found: {uid}")]
    ProjectNotFound { uid: String },

    #[error("parent committee not found: {uid}")]
    ParentNotFound { uid: String },

    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    // ===== Uniqueness / concurrency =====
    #[error("committee name '{name}' already exists in project {project_uid}")]
    NameTaken {
        project_uid: String,
        name: String,
        owner_uid: Option<String>,
    },

    #[error("sso group name '{sso_group_name}' is already taken")]
    SsoGroupNameTaken {
        sso_group_name: String,
        owner_uid: Option<String>,
    },

    #[error("member with this email already exists in committee {committee_uid}")]
    MemberAlreadyExists {
        committee_uid: String,
        owner_uid: Option<String>,
    },

    #[error("key already exists: {key}")]
    KeyExists { key: String },

    #[error("revision mismatch on key {key}: expected {expected}")]
    KeyRevisionMismatch { key: String, expected: u64 },

    #[error("{entity} has been modified by another process")]
    RevisionMismatch {
        entity: &'static str,
        uid: String,
        expected: u64,
        actual: u64,
    },

    // ===== Validation =====
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("missing required fields for category {category}: {}", fields.join(", "))]
    MissingRequiredFields {
        category: String,
        fields: Vec<String>,
    },

    #[error("unknown committee attribute: {name}")]
    UnknownAttribute { name: String },

    // ===== Unexpected =====
    #[error("serialization error: {message}")]
    Serialization { message: String },

    #[error("storage error: {message}")]
    Storage { message: String },

    #[error("publish to {subject} failed: {message}")]
    Publish { subject: String, message: String },

    #[error("{op}: exceeded maximum retries ({attempts})")]
    RetriesExhausted { op: String, attempts: u32 },

    #[error("{op} cancelled")]
    Cancelled { op: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CommitteeError {
    /// Classify this error into the canonical taxonomy
    pub fn kind(&self) -> ExErrorKind {
        match self {
            CommitteeError::CommitteeNotFound { .. }
            | CommitteeError::SettingsNotFound { .. }
            | CommitteeError::MemberNotFound { .. }
            | CommitteeError::ProjectNotFound { .. }
            | CommitteeError::ParentNotFound { .. }
            | CommitteeError::KeyNotFound { .. } => ExErrorKind::NotFound,

            CommitteeError::NameTaken { .. }
            | CommitteeError::SsoGroupNameTaken { .. }
            | CommitteeError::MemberAlreadyExists { .. }
            | CommitteeError::KeyExists { .. }
            | CommitteeError::KeyRevisionMismatch { .. }
            | CommitteeError::RevisionMismatch { .. } => ExErrorKind::Conflict,

            CommitteeError::InvalidInput { .. }
            | CommitteeError::MissingRequiredFields { .. }
            | CommitteeError::UnknownAttribute { .. } => ExErrorKind::Validation,

            CommitteeError::Serialization { .. }
            | CommitteeError::Storage { .. }
            | CommitteeError::Publish { .. }
            | CommitteeError::RetriesExhausted { .. }
            | CommitteeError::Cancelled { .. }
            | CommitteeError::Internal { .. } => ExErrorKind::Unexpected,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ExErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ExErrorKind::Conflict
    }
}

/// Conversion from CommitteeError to the canonical ExError
impl From<CommitteeError> for ExError {
    fn from(err: CommitteeError) -> Self {
        let base = ExError::new(err.kind()).with_message(err.to_string());
        match err {
            CommitteeError::CommitteeNotFound { uid }
            | CommitteeError::SettingsNotFound { uid }
            | CommitteeError::MemberNotFound { uid }
            | CommitteeError::ProjectNotFound { uid }
            | CommitteeError::ParentNotFound { uid }
            | CommitteeError::RevisionMismatch { uid, .. } => base.with_entity_id(uid),

            CommitteeError::KeyNotFound { key }
            | CommitteeError::KeyExists { key }
            | CommitteeError::KeyRevisionMismatch { key, .. } => base.with_key(key),

            CommitteeError::NameTaken {
                owner_uid: Some(owner),
                ..
            }
            | CommitteeError::SsoGroupNameTaken {
                owner_uid: Some(owner),
                ..
            }
            | CommitteeError::MemberAlreadyExists {
                owner_uid: Some(owner),
                ..
            } => base.with_entity_id(owner),

            CommitteeError::RetriesExhausted { op, .. } | CommitteeError::Cancelled { op } => {
                base.with_op(op)
            }

            _ => base,
        }
    }
}

/// Conversion from serde_json::Error to CommitteeError
impl From<serde_json::Error> for CommitteeError {
    fn from(err: serde_json::Error) -> Self {
        CommitteeError::Serialization {
            message: err.to_string(),
        }
    }
}
