//! Group membership service.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::group::{Group, NewGroup, SessionId};
use crate::domain::ports::{GroupCommand, GroupQuery, GroupRepository, GroupRepositoryError};

/// Group service implementing [`GroupCommand`] and [`GroupQuery`].
#[derive(Clone)]
pub struct GroupService<R> {
    repo: Arc<R>,
}

impl<R> GroupService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

fn map_group_error(error: GroupRepositoryError) -> Error {
    match error {
        GroupRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("group repository unavailable: {message}"))
        }
        GroupRepositoryError::Query { message } => {
            Error::internal(format!("group repository error: {message}"))
        }
        GroupRepositoryError::UnknownGroup { group_id } => {
            Error::not_found(format!("group {group_id} not found"))
        }
    }
}

#[async_trait]
impl<R> GroupCommand for GroupService<R>
where
    R: GroupRepository,
{
    async fn create(&self, group: NewGroup) -> Result<Group, Error> {
        self.repo.create(&group).await.map_err(map_group_error)
    }

    async fn delete(&self, group_id: i64) -> Result<(), Error> {
        let deleted = self.repo.delete(group_id).await.map_err(map_group_error)?;
        if deleted {
            Ok(())
        } else {
            Err(Error::not_found(format!("group {group_id} not found")))
        }
    }

    async fn add_session(&self, group_id: i64, session_id: SessionId) -> Result<(), Error> {
        self.repo
            .add_session(group_id, &session_id)
            .await
            .map_err(map_group_error)
    }

    async fn remove_session(&self, group_id: i64, session_id: SessionId) -> Result<(), Error> {
        self.repo
            .remove_session(group_id, &session_id)
            .await
            .map_err(map_group_error)
    }
}

#[async_trait]
impl<R> GroupQuery for GroupService<R>
where
    R: GroupRepository,
{
    async fn list(&self, owner_id: Option<String>) -> Result<Vec<Group>, Error> {
        self.repo.list(owner_id).await.map_err(map_group_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockGroupRepository;
    use crate::domain::test_fixtures::fixture_timestamp;
    use rstest::rstest;

    #[tokio::test]
    async fn create_returns_stored_group() {
        let mut repo = MockGroupRepository::new();
        repo.expect_create()
            .withf(|group| group.name() == "Colocation")
            .return_once(|group| {
                Ok(Group {
                    id: 3,
                    owner_id: group.owner_id().map(str::to_owned),
                    name: group.name().to_owned(),
                    created_at: fixture_timestamp(),
                })
            });

        let group = GroupService::new(Arc::new(repo))
            .create(NewGroup::new(Some("u-1".to_owned()), "Colocation").expect("valid"))
            .await
            .expect("created");
        assert_eq!(group.id, 3);
        assert_eq!(group.owner_id.as_deref(), Some("u-1"));
    }

    #[rstest]
    #[case(true, None)]
    #[case(false, Some(ErrorCode::NotFound))]
    #[tokio::test]
    async fn delete_reports_missing_groups(
        #[case] existed: bool,
        #[case] expected: Option<ErrorCode>,
    ) {
        let mut repo = MockGroupRepository::new();
        repo.expect_delete().return_once(move |_| Ok(existed));

        let result = GroupService::new(Arc::new(repo)).delete(8).await;
        assert_eq!(result.err().map(|error| error.code()), expected);
    }

    #[tokio::test]
    async fn add_session_to_unknown_group_is_not_found() {
        let mut repo = MockGroupRepository::new();
        repo.expect_add_session()
            .return_once(|group_id, _| Err(GroupRepositoryError::unknown_group(group_id)));

        let error = GroupService::new(Arc::new(repo))
            .add_session(42, SessionId::new("s").expect("valid"))
            .await
            .expect_err("unknown group");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn list_maps_connection_failures() {
        let mut repo = MockGroupRepository::new();
        repo.expect_list()
            .return_once(|_| Err(GroupRepositoryError::connection("refused")));

        let error = GroupService::new(Arc::new(repo))
            .list(None)
            .await
            .expect_err("unavailable");
        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }
}
