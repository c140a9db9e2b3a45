use serde::{Deserialize, Serialize};

/// The bearer token and display name of the logged-in user.
///
/// A value only exists when both fields are non-blank; anything else counts
/// as "not logged in".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    token: String,
    #[serde(rename = "user_name")]
    display_name: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, display_name: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let display_name = display_name.into();
        if token.trim().is_empty() || display_name.trim().is_empty() {
            None
        } else {
            Some(Self {
                token,
                display_name,
            })
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Re-applies the non-blank invariant to a value read from storage.
    pub fn validated(self) -> Option<Self> {
        Self::new(self.token, self.display_name)
    }
}
