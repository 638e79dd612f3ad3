use bk_store::StoreError;

use crate::api::Operation;

/// Failure classes callers can tell apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server could not be reached or did not answer in time.
    Connectivity,
    /// Missing, expired or rejected credentials.
    Authentication,
    /// Valid identity without enough rights.
    Forbidden,
    NotFound,
    BadRequest,
    /// The server no longer accepts this client version.
    ObsoleteClient,
    /// Any other server-side failure, including undecodable replies.
    Service,
    /// An endpoint pattern kept an unfilled placeholder.
    InvalidUrl,
    /// Cached parents no longer match the server.
    CacheMismatch,
    LocalStore,
}

impl ErrorKind {
    /// Maps an HTTP status to an error kind; `None` for success codes.
    #[must_use]
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            400 => Some(Self::BadRequest),
            401 => Some(Self::Authentication),
            403 => Some(Self::Forbidden),
            404 => Some(Self::NotFound),
            412 => Some(Self::ObsoleteClient),
            _ => Some(Self::Service),
        }
    }

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Connectivity => "BK810",
            Self::Authentication => "BK811",
            Self::Forbidden => "BK812",
            Self::NotFound => "BK813",
            Self::BadRequest => "BK814",
            Self::ObsoleteClient => "BK815",
            Self::Service => "BK816",
            Self::InvalidUrl => "BK817",
            Self::CacheMismatch => "BK818",
            Self::LocalStore => "BK819",
        }
    }
}

/// Error raised by the registry access layer.
#[derive(Debug, thiserror::Error)]
#[error("[{}] {}", .kind.code(), .message)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub(crate) fn connectivity() -> Self {
        Self::new(
            ErrorKind::Connectivity,
            "can't connect to the registry, check your internet connection",
        )
    }

    pub(crate) fn unexpected_reply(operation: Operation, reply: &crate::api::Reply) -> Self {
        Self::new(
            ErrorKind::Service,
            format!(
                "unexpected {} reply to {}",
                reply.name(),
                operation.as_str()
            ),
        )
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::new(ErrorKind::LocalStore, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table_is_exhaustive() {
        assert_eq!(ErrorKind::from_status(200), None);
        assert_eq!(ErrorKind::from_status(204), None);
        assert_eq!(ErrorKind::from_status(400), Some(ErrorKind::BadRequest));
        assert_eq!(ErrorKind::from_status(401), Some(ErrorKind::Authentication));
        assert_eq!(ErrorKind::from_status(403), Some(ErrorKind::Forbidden));
        assert_eq!(ErrorKind::from_status(404), Some(ErrorKind::NotFound));
        assert_eq!(ErrorKind::from_status(412), Some(ErrorKind::ObsoleteClient));
        for unknown in [302, 418, 500, 502, 599] {
            assert_eq!(ErrorKind::from_status(unknown), Some(ErrorKind::Service));
        }
    }

    #[test]
    fn display_carries_the_kind_code() {
        let err = ApiError::new(ErrorKind::NotFound, "block gone");
        assert_eq!(err.to_string(), "[BK813] block gone");
        assert!(err.is(ErrorKind::NotFound));
    }
}
