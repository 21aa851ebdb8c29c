//! Driving ports for managing groups.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::group::{Group, NewGroup, SessionId};

/// Domain use-case port for group mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupCommand: Send + Sync {
    async fn create(&self, group: NewGroup) -> Result<Group, Error>;

    /// Delete a group; `not_found` when it does not exist.
    async fn delete(&self, group_id: i64) -> Result<(), Error>;

    async fn add_session(&self, group_id: i64, session_id: SessionId) -> Result<(), Error>;

    async fn remove_session(&self, group_id: i64, session_id: SessionId) -> Result<(), Error>;
}

/// Domain use-case port for group reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupQuery: Send + Sync {
    async fn list(&self, owner_id: Option<String>) -> Result<Vec<Group>, Error>;
}

/// Fixture group ports without storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureGroupService;

#[async_trait]
impl GroupCommand for FixtureGroupService {
    async fn create(&self, _group: NewGroup) -> Result<Group, Error> {
        Err(Error::service_unavailable("group storage is not configured"))
    }

    async fn delete(&self, group_id: i64) -> Result<(), Error> {
        Err(Error::not_found(format!("group {group_id} not found")))
    }

    async fn add_session(&self, group_id: i64, _session_id: SessionId) -> Result<(), Error> {
        Err(Error::not_found(format!("group {group_id} not found")))
    }

    async fn remove_session(&self, _group_id: i64, _session_id: SessionId) -> Result<(), Error> {
        Ok(())
    }
}

#[async_trait]
impl GroupQuery for FixtureGroupService {
    async fn list(&self, _owner_id: Option<String>) -> Result<Vec<Group>, Error> {
        Ok(Vec::new())
    }
}
