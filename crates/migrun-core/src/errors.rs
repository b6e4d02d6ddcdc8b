use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure the runner can report is classified by one of these kinds.
/// Each kind maps to a stable error code used in logs, test assertions, and
/// the CLI's exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Input
    InvalidInput,
    DuplicateMigration,
    Config,
    Io,

    // Database
    /// The connection could not be established or was lost
    Connection,
    /// A migration script's SQL failed; the transaction was rolled back
    SqlExecution,
    /// The bookkeeping table could not be created, read, or written
    Bookkeeping,
    /// A verification query attempted to modify the database
    ReadOnlyViolation,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::DuplicateMigration => "ERR_DUPLICATE_MIGRATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Connection => "ERR_CONNECTION",
            ExErrorKind::SqlExecution => "ERR_SQL_EXECUTION",
            ExErrorKind::Bookkeeping => "ERR_BOOKKEEPING",
            ExErrorKind::ReadOnlyViolation => "ERR_READ_ONLY_VIOLATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether this kind describes a problem with the caller's input or
    /// configuration rather than with the database
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            ExErrorKind::InvalidInput
                | ExErrorKind::DuplicateMigration
                | ExErrorKind::Config
                | ExErrorKind::Io
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification kind for programmatic handling plus the
/// operation and migration it happened in.
#[derive(Debug, Clone, PartialEq)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    migration: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            migration: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the name of the migration being processed
    pub fn with_migration(mut self, name: impl Into<String>) -> Self {
        self.migration = Some(name.into());
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

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn migration(&self) -> Option<&str> {
        self.migration.as_deref()
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
        if let Some(migration) = &self.migration {
            write!(f, " (migration: {})", migration)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain errors raised before or around database work
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrunError {
    /// A migration script was given an empty name
    #[error("Migration name must not be empty")]
    EmptyName,

    /// Two scripts in one run share a name
    #[error("Duplicate migration name: {name}")]
    DuplicateName { name: String },

    /// A script directory contained nothing to run
    #[error("No .sql files found in {path}")]
    NoScripts { path: String },

    /// A script file name has no usable stem
    #[error("Cannot derive a migration name from {path}")]
    InvalidFileName { path: String },

    /// No database connection settings were supplied
    #[error("No database configured: {reason}")]
    NotConfigured { reason: String },

    /// A connection URL could not be interpreted
    #[error("Unsupported database URL: {reason}")]
    InvalidUrl { reason: String },

    /// The verification query was empty after trimming
    #[error("Verification query is empty")]
    EmptyQuery,

    /// The verification query held more than one statement
    #[error("Verification query must be a single statement, found {count}")]
    MultipleStatements { count: usize },

    /// The verification query would modify the database
    #[error("Verification query must be read-only")]
    NotReadOnly,
}

/// Conversion from MigrunError to ExError
impl From<MigrunError> for ExError {
    fn from(err: MigrunError) -> Self {
        let message = err.to_string();
        match err {
            MigrunError::EmptyName => ExError::new(ExErrorKind::InvalidInput)
                .with_op("validate_scripts")
                .with_message(message),

            MigrunError::DuplicateName { name } => ExError::new(ExErrorKind::DuplicateMigration)
                .with_op("validate_scripts")
                .with_migration(name)
                .with_message(message),

            MigrunError::NoScripts { .. } | MigrunError::InvalidFileName { .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("load_scripts")
                    .with_message(message)
            }

            MigrunError::NotConfigured { .. } | MigrunError::InvalidUrl { .. } => {
                ExError::new(ExErrorKind::Config)
                    .with_op("resolve_config")
                    .with_message(message)
            }

            MigrunError::EmptyQuery | MigrunError::MultipleStatements { .. } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("verify")
                .with_message(message),

            MigrunError::NotReadOnly => ExError::new(ExErrorKind::ReadOnlyViolation)
                .with_op("verify")
                .with_message(message),
        }
    }
}
