//! Token generation.

use uuid::Uuid;

/// Generator for session and API tokens.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a random token suitable for a session cookie or bearer header.
    #[must_use]
    pub fn generate_token(&self) -> String {
        // v4 carries no time component
        Uuid::new_v4().simple().to_string()
    }

    /// Generate a short random suffix used to disambiguate file names.
    #[must_use]
    pub fn generate_suffix(&self) -> String {
        let mut token = self.generate_token();
        token.truncate(7);
        token
    }
}
