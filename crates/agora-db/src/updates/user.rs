//! User profile update builder.

use agora_core::locale::Locale;
use serde::Serialize;

/// Profile fields to change. `Some(None)` clears a nullable field.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<Option<Locale>>,
}

impl UserUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.bio.is_none() && self.locale.is_none()
    }
}

#[derive(Debug, Default)]
pub struct UserUpdateBuilder(UserUpdate);

impl UserUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn display_name(mut self, val: Option<String>) -> Self {
        self.0.display_name = Some(val);
        self
    }

    #[must_use]
    pub fn bio(mut self, val: Option<String>) -> Self {
        self.0.bio = Some(val);
        self
    }

    #[must_use]
    pub fn locale(mut self, val: Option<Locale>) -> Self {
        self.0.locale = Some(val);
        self
    }

    #[must_use]
    pub fn build(self) -> UserUpdate {
        self.0
    }
}
