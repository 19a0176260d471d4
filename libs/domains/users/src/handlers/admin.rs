use axum::{
    Json,
    extract::{Query, State},
};
use axum_helpers::{
    JsonPayload, UuidPath,
    errors::responses::{
        BadRequestResponse, ConflictResponse, ForbiddenResponse, InternalServerErrorResponse,
        NotFoundResponse, UnauthorizedResponse, ValidationFailedResponse,
    },
};

use crate::application::commands::{
    AdminCreateUser, AdminForceDeleteUser, AdminRestoreUser, AdminSoftDeleteUser, AdminUpdateUser,
};
use crate::application::queries::AdminUserList;
use crate::auth::AdminUser;
use crate::error::UserResult;
use crate::models::{
    AdminCreateUserRequest, AdminUpdateUserRequest, MessageResponse, UserEnvelope,
    UserListParams, UserListResponse,
};
use crate::module::UsersState;

use super::ADMIN_TAG;

/// List users, paginated
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = ADMIN_TAG,
    params(UserListParams),
    responses(
        (status = 200, description = "One page of users", body = UserListResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn list_users(
    State(state): State<UsersState>,
    AdminUser(_admin): AdminUser,
    Query(params): Query<UserListParams>,
) -> UserResult<Json<UserListResponse>> {
    let defaults = AdminUserList::default();
    let query = AdminUserList {
        page: params.page.unwrap_or(defaults.page),
        limit: params.limit.unwrap_or(defaults.limit),
        order_by: params.order_by.unwrap_or(defaults.order_by),
        order_type: params.order_type.unwrap_or(defaults.order_type),
        with_deleted: params.with_deleted.unwrap_or(defaults.with_deleted),
    };

    Ok(Json(state.queries.ask(query).await?))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = ADMIN_TAG,
    request_body = AdminCreateUserRequest,
    responses(
        (status = 200, description = "User created", body = UserEnvelope),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 409, response = ConflictResponse),
        (status = 422, response = ValidationFailedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn create_user(
    State(state): State<UsersState>,
    AdminUser(admin): AdminUser,
    JsonPayload(request): JsonPayload<AdminCreateUserRequest>,
) -> UserResult<Json<UserEnvelope>> {
    let user = state
        .commands
        .dispatch(AdminCreateUser {
            request,
            causer: admin,
        })
        .await?;
    Ok(Json(user.into()))
}

/// Update a user. An empty or absent password keeps the current one.
#[utoipa::path(
    patch,
    path = "/api/admin/user/{id}",
    tag = ADMIN_TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserEnvelope),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 422, response = ValidationFailedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn update_user(
    State(state): State<UsersState>,
    AdminUser(admin): AdminUser,
    UuidPath(id): UuidPath,
    JsonPayload(request): JsonPayload<AdminUpdateUserRequest>,
) -> UserResult<Json<UserEnvelope>> {
    let user = state
        .commands
        .dispatch(AdminUpdateUser {
            id: id.into(),
            request,
            causer: admin,
        })
        .await?;
    Ok(Json(user.into()))
}

/// Delete a user and its tokens for good
#[utoipa::path(
    delete,
    path = "/api/admin/user/{id}",
    tag = ADMIN_TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn force_delete_user(
    State(state): State<UsersState>,
    AdminUser(admin): AdminUser,
    UuidPath(id): UuidPath,
) -> UserResult<Json<MessageResponse>> {
    state
        .commands
        .dispatch(AdminForceDeleteUser {
            id: id.into(),
            causer: admin,
        })
        .await?;
    Ok(Json(MessageResponse::new("User successfully deleted.")))
}

/// Soft-delete a user
#[utoipa::path(
    patch,
    path = "/api/admin/user/delete/{id}",
    tag = ADMIN_TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User soft-deleted", body = UserEnvelope),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn soft_delete_user(
    State(state): State<UsersState>,
    AdminUser(admin): AdminUser,
    UuidPath(id): UuidPath,
) -> UserResult<Json<UserEnvelope>> {
    let user = state
        .commands
        .dispatch(AdminSoftDeleteUser {
            id: id.into(),
            causer: admin,
        })
        .await?;
    Ok(Json(user.into()))
}

/// Restore a soft-deleted user
#[utoipa::path(
    patch,
    path = "/api/admin/user/restore/{id}",
    tag = ADMIN_TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User restored", body = UserEnvelope),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn restore_user(
    State(state): State<UsersState>,
    AdminUser(admin): AdminUser,
    UuidPath(id): UuidPath,
) -> UserResult<Json<UserEnvelope>> {
    let user = state
        .commands
        .dispatch(AdminRestoreUser {
            id: id.into(),
            causer: admin,
        })
        .await?;
    Ok(Json(user.into()))
}
