use serde::{Deserialize, Serialize};

/// Locally remembered identity: who the user claims to be and the token
/// the server issued, either of which may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub token: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(username: impl Into<String>, token: Option<String>) -> Self {
        Self {
            username: Some(username.into()),
            token,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some() && self.token.is_some()
    }

    /// Same user, token dropped.
    #[must_use]
    pub fn without_token(&self) -> Self {
        Self {
            username: self.username.clone(),
            token: None,
        }
    }
}
