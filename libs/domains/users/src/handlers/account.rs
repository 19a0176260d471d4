use axum::{Json, extract::State};
use axum_helpers::{
    JsonPayload, ValidatedJson,
    errors::responses::{
        BadRequestResponse, ConflictResponse, InternalServerErrorResponse, UnauthorizedResponse,
        ValidationFailedResponse,
    },
};

use crate::application::commands::{ChangePassword, DeleteAccount, PublishUpdate, UpdateProfile};
use crate::auth::CurrentUser;
use crate::error::UserResult;
use crate::models::{
    ChangePasswordRequest, DashboardResponse, DeleteAccountRequest, DispatchResponse,
    MessageResponse, PublishUpdateRequest, UpdateProfileRequest, UserEnvelope, UserResponse,
};
use crate::module::UsersState;

use super::TAG;

/// Update email and names of the caller
#[utoipa::path(
    patch,
    path = "/api/{scope}/account/me/update",
    tag = TAG,
    params(("scope" = String, Path, description = "`app` or `web`")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserEnvelope),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 409, response = ConflictResponse),
        (status = 422, response = ValidationFailedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn update_profile(
    State(state): State<UsersState>,
    CurrentUser(user): CurrentUser,
    JsonPayload(request): JsonPayload<UpdateProfileRequest>,
) -> UserResult<Json<UserEnvelope>> {
    let user = state
        .commands
        .dispatch(UpdateProfile {
            user_id: user.id(),
            request,
        })
        .await?;
    Ok(Json(user.into()))
}

/// Change the password of the caller
#[utoipa::path(
    patch,
    path = "/api/{scope}/account/me/change-password",
    tag = TAG,
    params(("scope" = String, Path, description = "`app` or `web`")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = UserEnvelope),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 422, response = ValidationFailedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn change_password(
    State(state): State<UsersState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> UserResult<Json<UserEnvelope>> {
    let user = state
        .commands
        .dispatch(ChangePassword {
            user_id: user.id(),
            request,
        })
        .await?;
    Ok(Json(user.into()))
}

/// Delete the account of the caller
#[utoipa::path(
    post,
    path = "/api/{scope}/account/me/delete-account",
    tag = TAG,
    params(("scope" = String, Path, description = "`app` or `web`")),
    request_body = DeleteAccountRequest,
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 422, response = ValidationFailedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn delete_account(
    State(state): State<UsersState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(request): ValidatedJson<DeleteAccountRequest>,
) -> UserResult<Json<MessageResponse>> {
    state
        .commands
        .dispatch(DeleteAccount {
            user_id: user.id(),
            password: request.password,
        })
        .await?;
    Ok(Json(MessageResponse::new("User account deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/{scope}/dashboard",
    tag = TAG,
    params(("scope" = String, Path, description = "`app` or `web`")),
    responses(
        (status = 200, description = "Caller and greeting", body = DashboardResponse),
        (status = 401, response = UnauthorizedResponse)
    )
)]
pub(super) async fn dashboard(CurrentUser(user): CurrentUser) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        data: MessageResponse::new("Welcome to dashboard. You are logged in."),
        user: UserResponse::with_auth_tokens(&user),
    })
}

/// Publish an arbitrary update to the hub
#[utoipa::path(
    post,
    path = "/api/{scope}/test-mercure",
    tag = TAG,
    params(("scope" = String, Path, description = "`app` or `web`")),
    request_body = PublishUpdateRequest,
    responses(
        (status = 200, description = "Update dispatched", body = DispatchResponse),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn publish_update(
    State(state): State<UsersState>,
    CurrentUser(_user): CurrentUser,
    ValidatedJson(request): ValidatedJson<PublishUpdateRequest>,
) -> UserResult<Json<DispatchResponse>> {
    state
        .commands
        .dispatch(PublishUpdate {
            topic: request.topic,
            payload: request.payload,
        })
        .await?;

    Ok(Json(DispatchResponse {
        message_dispatched: "OK".to_string(),
    }))
}
