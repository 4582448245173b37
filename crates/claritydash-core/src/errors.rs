use thiserror::Error;

/// Result type alias using the canonical ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers (CLI, request layer)
/// can match on without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    /// Read/patch/delete addressed to a key with no stored state
    NotFound,
    /// Create addressed to a key that already has stored state
    AlreadyExists,
    /// Key failed key policy validation (empty, not a string)
    InvalidKey,
    /// Underlying durable storage errored or timed out, or store and index drifted
    StorageFailure,
    /// Caller-supplied payload is malformed (e.g. patch is not an object)
    InvalidInput,
    /// Stored blob could not be encoded or decoded
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::InvalidKey => "ERR_INVALID_KEY",
            ExErrorKind::StorageFailure => "ERR_STORAGE_FAILURE",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus the entity coordinates (type and key) and
/// the operation that failed, so failures can be reported without losing
/// context as they cross layers.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_type: Option<String>,
    key: Option<String>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_type: None,
            key: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity type context
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Add entity key context
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity type context, if any
    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    /// Get the entity key context, if any
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// True if this error has the given kind
    pub fn is(&self, kind: ExErrorKind) -> bool {
        self.kind == kind
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
        if let Some(entity_type) = &self.entity_type {
            write!(f, " (entity_type: {})", entity_type)?;
        }
        if let Some(key) = &self.key {
            write!(f, " (key: {})", key)?;
        }
        if let Some(source) = &self.source {
            write!(f, "; caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Named error cases raised by the entity store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No state stored for the key
    #[error("Entity not found: {entity_type}/{key}")]
    NotFound { entity_type: String, key: String },

    /// State already stored for the key
    #[error("Entity already exists: {entity_type}/{key}")]
    AlreadyExists { entity_type: String, key: String },

    /// Key rejected by the key policy
    #[error("Invalid key: {reason}")]
    InvalidKey { reason: String },

    /// Patch payload rejected before touching storage
    #[error("Invalid patch for {entity_type}/{key}: {reason}")]
    InvalidPatch {
        entity_type: String,
        key: String,
        reason: String,
    },

    /// Stored blob did not decode as the entity type
    #[error("Corrupt record {entity_type}/{key}: {message}")]
    CorruptRecord {
        entity_type: String,
        key: String,
        message: String,
    },

    /// Storage call failed
    #[error("Storage failure in {op}: {message}")]
    Storage { op: String, message: String },

    /// Store and index disagree
    #[error("Index drift for {entity_type}: {message}")]
    IndexDrift {
        entity_type: String,
        message: String,
    },

    /// Lock poisoned by a panicking holder
    #[error("Lock poisoned: {lock}")]
    LockPoisoned { lock: String },
}

impl From<StoreError> for ExError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity_type, key } => ExError::new(ExErrorKind::NotFound)
                .with_entity_type(entity_type)
                .with_key(key)
                .with_message("Entity not found"),

            StoreError::AlreadyExists { entity_type, key } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_entity_type(entity_type)
                    .with_key(key)
                    .with_message("Entity already exists")
            }

            StoreError::InvalidKey { reason } => ExError::new(ExErrorKind::InvalidKey)
                .with_op("validate_key")
                .with_message(reason),

            StoreError::InvalidPatch {
                entity_type,
                key,
                reason,
            } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("patch")
                .with_entity_type(entity_type)
                .with_key(key)
                .with_message(reason),

            StoreError::CorruptRecord {
                entity_type,
                key,
                message,
            } => ExError::new(ExErrorKind::Serialization)
                .with_entity_type(entity_type)
                .with_key(key)
                .with_message(message),

            StoreError::Storage { op, message } => ExError::new(ExErrorKind::StorageFailure)
                .with_op(op)
                .with_message(message),

            StoreError::IndexDrift {
                entity_type,
                message,
            } => ExError::new(ExErrorKind::StorageFailure)
                .with_op("check_consistency")
                .with_entity_type(entity_type)
                .with_message(message),

            StoreError::LockPoisoned { lock } => ExError::new(ExErrorKind::Internal)
                .with_op("lock")
                .with_message(format!("Lock poisoned: {}", lock)),
        }
    }
}
