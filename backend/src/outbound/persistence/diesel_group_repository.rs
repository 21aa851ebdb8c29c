//! PostgreSQL-backed `GroupRepository` implementation using Diesel ORM.
//!
//! Session membership rows cascade with their group, so deleting a group
//! needs a single statement.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::group::{Group, NewGroup, SessionId};
use crate::domain::ports::{GroupRepository, GroupRepositoryError};

use super::diesel_basic_error_mapping::{basic_error_mappers, is_foreign_key_violation};
use super::models::{GroupRow, NewGroupRow, NewGroupSessionRow};
use super::pool::DbPool;
use super::schema::{user_group_sessions, user_groups};

/// Diesel-backed implementation of the group repository port.
#[derive(Clone)]
pub struct DieselGroupRepository {
    pool: DbPool,
}

impl DieselGroupRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

basic_error_mappers!(GroupRepositoryError);

fn row_to_group(row: GroupRow) -> Group {
    Group {
        id: row.id,
        owner_id: row.owner_id,
        name: row.name,
        created_at: row.created_at,
    }
}

#[async_trait]
impl GroupRepository for DieselGroupRepository {
    async fn create(&self, group: &NewGroup) -> Result<Group, GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: GroupRow = diesel::insert_into(user_groups::table)
            .values(&NewGroupRow {
                owner_id: group.owner_id(),
                name: group.name(),
            })
            .returning(GroupRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(row_to_group(row))
    }

    async fn list(&self, owner_id: Option<String>) -> Result<Vec<Group>, GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = user_groups::table
            .select(GroupRow::as_select())
            .order((user_groups::created_at.desc(), user_groups::id.desc()))
            .into_boxed();
        if let Some(owner) = owner_id {
            query = query.filter(user_groups::owner_id.eq(owner));
        }
        let rows: Vec<GroupRow> = query.load(&mut conn).await.map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_group).collect())
    }

    async fn delete(&self, group_id: i64) -> Result<bool, GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(user_groups::table.find(group_id))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }

    async fn add_session(
        &self,
        group_id: i64,
        session_id: &SessionId,
    ) -> Result<(), GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(user_group_sessions::table)
            .values(&NewGroupSessionRow {
                group_id,
                session_id: session_id.as_str(),
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    GroupRepositoryError::unknown_group(group_id)
                } else {
                    map_diesel_error(err)
                }
            })
    }

    async fn remove_session(
        &self,
        group_id: i64,
        session_id: &SessionId,
    ) -> Result<(), GroupRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::delete(
            user_group_sessions::table
                .filter(user_group_sessions::group_id.eq(group_id))
                .filter(user_group_sessions::session_id.eq(session_id.as_str())),
        )
        .execute(&mut conn)
        .await
        .map(|_| ())
        .map_err(map_diesel_error)
    }
}
