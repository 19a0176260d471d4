use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{UserError, UserResult};
use crate::models::{UserListResponse, UserResponse};
use crate::repository::{UserListCriteria, UserOrder, UserRepository};
use crate::user::User;
use crate::value_objects::EntityId;

/// Read side of user management.
#[derive(Clone)]
pub struct UserQueryService {
    users: Arc<dyn UserRepository>,
}

impl UserQueryService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn find(&self, id: EntityId, with_deleted: bool) -> UserResult<User> {
        self.users
            .find(id, with_deleted)
            .await?
            .ok_or_else(UserError::not_found)
    }

    /// One page of users. `page == 0` or `limit == 0` returns everything on a single page.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: u64,
        limit: u64,
        order_by: &str,
        order_type: &str,
        with_deleted: bool,
    ) -> UserResult<UserListResponse> {
        let paginate = page > 0 && limit > 0;
        let criteria = UserListCriteria {
            order: UserOrder::from_key(order_by),
            ascending: order_type.eq_ignore_ascii_case("ASC"),
            with_deleted,
            limit: paginate.then_some(limit),
            offset: if paginate { limit.saturating_mul(page - 1) } else { 0 },
        };

        let (users, total_items) = self.users.list(&criteria).await?;
        let total_pages = if paginate {
            total_items.div_ceil(limit)
        } else {
            1
        };

        debug!(total_items, total_pages, "Listed users");
        Ok(UserListResponse {
            items: users.iter().map(UserResponse::from).collect(),
            total_items,
            total_pages,
        })
    }
}
