//! Evaluator configuration.

use crate::error::AuthzError;

/// What a caller sees when an object exists but lies outside its closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concealment {
    /// Report the denial as forbidden.
    #[default]
    Forbidden,
    /// Report the object as absent, hiding that it exists.
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthzConfig {
    pub concealment: Concealment,
    /// Lets staff list every child instead of their closure.
    pub staff_child_roster: bool,
    pub max_message_chars: usize,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            concealment: Concealment::Forbidden,
            staff_child_roster: false,
            max_message_chars: 1000,
        }
    }
}

impl AuthzConfig {
    pub fn from_json_str(json: &str) -> Result<Self, AuthzError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AuthzError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AuthzError> {
        if self.max_message_chars == 0 {
            return Err(AuthzError::Config(
                "max_message_chars must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
