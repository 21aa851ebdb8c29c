//! Port for group and session membership persistence.

use async_trait::async_trait;

use crate::domain::group::{Group, NewGroup, SessionId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by group repository adapters.
    pub enum GroupRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "group repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "group repository query failed: {message}",
        /// The referenced group does not exist.
        UnknownGroup { group_id: i64 } =>
            "group {group_id} does not exist",
    }
}

/// Port for group storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, group: &NewGroup) -> Result<Group, GroupRepositoryError>;

    /// Groups newest first, optionally filtered by owner.
    async fn list(&self, owner_id: Option<String>) -> Result<Vec<Group>, GroupRepositoryError>;

    /// Delete a group and its sessions. Returns false when nothing existed.
    async fn delete(&self, group_id: i64) -> Result<bool, GroupRepositoryError>;

    /// Attach a session, ignoring duplicates; `UnknownGroup` when absent.
    async fn add_session(
        &self,
        group_id: i64,
        session_id: &SessionId,
    ) -> Result<(), GroupRepositoryError>;

    async fn remove_session(
        &self,
        group_id: i64,
        session_id: &SessionId,
    ) -> Result<(), GroupRepositoryError>;
}

/// Fixture repository with no groups.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureGroupRepository;

#[async_trait]
impl GroupRepository for FixtureGroupRepository {
    async fn create(&self, _group: &NewGroup) -> Result<Group, GroupRepositoryError> {
        Err(GroupRepositoryError::connection(
            "fixture group repository is read-only",
        ))
    }

    async fn list(&self, _owner_id: Option<String>) -> Result<Vec<Group>, GroupRepositoryError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _group_id: i64) -> Result<bool, GroupRepositoryError> {
        Ok(false)
    }

    async fn add_session(
        &self,
        group_id: i64,
        _session_id: &SessionId,
    ) -> Result<(), GroupRepositoryError> {
        Err(GroupRepositoryError::unknown_group(group_id))
    }

    async fn remove_session(
        &self,
        _group_id: i64,
        _session_id: &SessionId,
    ) -> Result<(), GroupRepositoryError> {
        Ok(())
    }
}
