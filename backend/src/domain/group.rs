//! Comparison groups and their session membership.

use chrono::{DateTime, Utc};

/// Maximum group name length in characters.
pub const GROUP_NAME_MAX_LEN: usize = 200;

/// Stored group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub owner_id: Option<String>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Validation failures for group input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GroupValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("name must be at most {GROUP_NAME_MAX_LEN} characters")]
    NameTooLong,
    #[error("session_id must not be empty")]
    EmptySession,
}

/// Validated group to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    owner_id: Option<String>,
    name: String,
}

impl NewGroup {
    /// # Examples
    /// ```
    /// use carbon_tracker::domain::group::NewGroup;
    ///
    /// let group = NewGroup::new(Some(" u1 ".into()), " Famille ").expect("valid group");
    /// assert_eq!(group.name(), "Famille");
    /// assert_eq!(group.owner_id(), Some("u1"));
    /// ```
    pub fn new(owner_id: Option<String>, name: &str) -> Result<Self, GroupValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GroupValidationError::EmptyName);
        }
        if name.chars().count() > GROUP_NAME_MAX_LEN {
            return Err(GroupValidationError::NameTooLong);
        }
        let owner_id = owner_id
            .map(|owner| owner.trim().to_owned())
            .filter(|owner| !owner.is_empty());
        Ok(Self {
            owner_id,
            name: name.to_owned(),
        })
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Client shopping session identifier attached to a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(raw: &str) -> Result<Self, GroupValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(GroupValidationError::EmptySession);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
