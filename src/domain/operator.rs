use crate::error::PosError;

/// How the cashier ("kassierer") attached to a payment is determined.
///
/// A deployment picks exactly one policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorPolicy {
    /// Staff pick a name from a local list; the device's own name is always
    /// one of the choices and is used when nobody is picked.
    FixedList { operators: Vec<String> },
    /// The logged-in user's display name is used, no selection step.
    AuthenticatedUser,
}

impl OperatorPolicy {
    /// Builds a fixed-list policy, dropping blank and duplicate names.
    pub fn fixed_list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut operators: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && !operators.iter().any(|o| o == name) {
                operators.push(name.to_string());
            }
        }
        Self::FixedList { operators }
    }

    /// Names staff may choose from in fixed-list mode.
    pub fn choices(&self, device: &str) -> Vec<String> {
        match self {
            Self::FixedList { operators } => {
                let mut choices = operators.clone();
                choices.push(device.to_string());
                choices
            }
            Self::AuthenticatedUser => Vec::new(),
        }
    }

    /// Resolves the selection made in fixed-list mode.
    pub fn select(&self, selected: Option<&str>, device: &str) -> Result<String, PosError> {
        match (self, selected.map(str::trim)) {
            (Self::FixedList { .. }, None) | (Self::FixedList { .. }, Some("")) => {
                Ok(device.to_string())
            }
            (Self::FixedList { operators }, Some(name)) => {
                if name == device || operators.iter().any(|o| o == name) {
                    Ok(name.to_string())
                } else {
                    Err(PosError::UnknownOperator(name.to_string()))
                }
            }
            (Self::AuthenticatedUser, _) => Err(PosError::NotAuthenticated),
        }
    }
}
