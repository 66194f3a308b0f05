use serde::{Deserialize, Deserializer, de};
use std::fmt::{Display, Formatter};
use thiserror::Error;

const MAX_LENGTH: usize = 768;
const FORBIDDEN_CHARACTERS: [char; 6] = ['.', '$', '#', '[', ']', '/'];

/// Opaque key identifying whose location is tracked.
///
/// An identity ends up as a single path segment in the realtime database, so it has to be a valid key there.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Result<Self, IdentityError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(IdentityError::Empty);
        }

        if value.len() > MAX_LENGTH {
            return Err(IdentityError::TooLong(value.len()));
        }

        if let Some(c) = value.chars().find(|c| FORBIDDEN_CHARACTERS.contains(c) || c.is_ascii_control()) {
            return Err(IdentityError::ForbiddenCharacter(c));
        }

        Ok(Identity(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Identity::new(value).map_err(|e| de::Error::custom(format!("invalid tracking identity: {}", e)))
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum IdentityError {
    #[error("identity must not be empty")]
    Empty,
    #[error("identity is {0} bytes long, at most {max} are allowed", max = MAX_LENGTH)]
    TooLong(usize),
    #[error("identity contains forbidden character {0:?}")]
    ForbiddenCharacter(char),
}
