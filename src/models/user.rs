use serde::{Deserialize, Serialize};

/// A resolved user reference as shown on the read side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub username: Option<String>,
}

impl UserSummary {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: Some(username.into()),
        }
    }

    /// A reference the directory could not resolve.
    pub fn unresolved(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
        }
    }
}
