use super::bus::Query;
use crate::models::UserListResponse;

/// Paginated user list for administrators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUserList {
    pub page: u64,
    pub limit: u64,
    pub order_by: String,
    pub order_type: String,
    pub with_deleted: bool,
}

impl Default for AdminUserList {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 15,
            order_by: "name".to_string(),
            order_type: "ASC".to_string(),
            with_deleted: false,
        }
    }
}

impl Query for AdminUserList {
    type Output = UserListResponse;
}
