#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    InvalidName { name: String },
    DuplicateQueue { id: String },
    UnknownQueue { path: String },
    RootQueue,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "queue name can not be empty"),
            Self::InvalidName { name } => {
                write!(f, "queue name must not contain '.' or ',': {name}")
            }
            Self::RootQueue => write!(f, "the root queue can not be removed"),
            Self::DuplicateQueue { id } => write!(f, "queue already exists: {id}"),
            Self::UnknownQueue { path } => write!(f, "queue not found: {path}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// A failed exchange with the configuration service.
///
/// This is terminal: nothing in the crate retries it.
#[derive(Debug)]
pub enum TransportError {
    Request(reqwest::Error),
    Http { status: u16, body: String },
    Decode { reason: String },
}

impl TransportError {
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            Self::Decode { .. } => None,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(e) => write!(f, "request error: {e}"),
            Self::Http { status, body } if body.is_empty() => write!(f, "http status {status}"),
            Self::Http { status, body } => write!(f, "http status {status}: {body}"),
            Self::Decode { reason } => write!(f, "unexpected response: {reason}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(e) => Some(e),
            Self::Http { .. } | Self::Decode { .. } => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::decode(value.to_string());
        }
        Self::Request(value)
    }
}

#[derive(Debug)]
pub enum StoreError {
    Validation(ValidationError),
    Transport(TransportError),
}

impl StoreError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "validation error: {e}"),
            Self::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(e) => Some(e),
            Self::Transport(e) => Some(e),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<TransportError> for StoreError {
    fn from(value: TransportError) -> Self {
        Self::Transport(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display_includes_body_when_present() {
        let err = TransportError::Http {
            status: 404,
            body: "tag not found".to_string(),
        };
        assert_eq!(err.to_string(), "http status 404: tag not found");
        assert_eq!(err.status(), Some(404));

        let err = TransportError::Http {
            status: 500,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "http status 500");
    }

    #[test]
    fn store_error_kinds() {
        let err = StoreError::from(ValidationError::EmptyName);
        assert!(err.is_validation());
        assert!(!err.is_transport());
        assert_eq!(
            err.to_string(),
            "validation error: queue name can not be empty"
        );

        let err = StoreError::from(TransportError::decode("missing items"));
        assert!(err.is_transport());
        assert_eq!(
            err.to_string(),
            "transport error: unexpected response: missing items"
        );
    }
}
