use thiserror::Error;

/// Boxed error raised by user-supplied factories and close handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, ContainerError>;

/// Errors raised by the value container.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Slot '{0}' already holds a value")]
    AlreadySet(String),

    #[error("Slot '{0}' is read-only")]
    ReadOnly(String),

    #[error("Slot '{0}' is immutable and cannot be deleted")]
    Immutable(String),

    #[error("Unknown alias: {0}")]
    UnknownAlias(String),

    #[error("Container '{container}' declares no slot named '{slot}'")]
    UnknownSlot { container: String, slot: String },

    #[error("No container at path '{0}'")]
    UnknownPath(String),

    #[error("Type cast failed for '{name}': expected '{expected}'")]
    TypeCastFailed {
        name: String,
        expected: &'static str,
    },

    #[error("Slot '{0}' has an async factory; resolve it with resolve_async")]
    AsyncFactory(String),

    #[error("Close handler for '{0}' is async; drain with close_async")]
    AsyncHandler(String),

    #[error("The container tree owning '{0}' has been dropped")]
    Detached(String),

    #[error("Invalid member name '{name}' in '{container}': {reason}")]
    InvalidName {
        container: String,
        name: String,
        reason: &'static str,
    },

    #[error("'{container}' declares '{name}' more than once")]
    DuplicateMember { container: String, name: String },

    #[error("Invalid name pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// An error raised inside a user factory or close handler, passed through
    /// untouched. Use `downcast_ref` on the inner error to recover it.
    #[error(transparent)]
    Callback(BoxError),

    #[error("{} close handler(s) failed: {}", .0.len(), summarize(.0))]
    CloseFailed(Vec<ContainerError>),
}

fn summarize(errors: &[ContainerError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ContainerError {
    /// Returns the user error carried by a `Callback` variant, if any.
    pub fn callback_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            ContainerError::Callback(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },
}
