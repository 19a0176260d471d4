use axum::{Json, extract::State};
use axum_helpers::{
    ValidatedJson,
    errors::responses::{
        BadRequestResponse, InternalServerErrorResponse, NotFoundResponse, ValidationFailedResponse,
    },
};

use crate::application::commands::{RequestPasswordReset, ResetPassword};
use crate::error::UserResult;
use crate::models::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest, UserEnvelope};
use crate::module::UsersState;

use super::TAG;

/// Same answer whether or not the address is registered.
pub const RESET_REQUESTED: &str =
    "If the email belongs to a registered user, a reset password email has been sent";

/// Request a password reset email
#[utoipa::path(
    post,
    path = "/api/forgot-password",
    tag = TAG,
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Request accepted", body = MessageResponse),
        (status = 400, response = BadRequestResponse),
        (status = 422, response = ValidationFailedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn forgot_password(
    State(state): State<UsersState>,
    ValidatedJson(request): ValidatedJson<ForgotPasswordRequest>,
) -> UserResult<Json<MessageResponse>> {
    state
        .commands
        .dispatch_async(RequestPasswordReset::new(request.email))
        .await?;
    Ok(Json(MessageResponse::new(RESET_REQUESTED)))
}

/// Set a new password with a mailed reset token
#[utoipa::path(
    post,
    path = "/api/reset-password",
    tag = TAG,
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = UserEnvelope),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = ValidationFailedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn reset_password(
    State(state): State<UsersState>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> UserResult<Json<UserEnvelope>> {
    let user = state.commands.dispatch(ResetPassword { request }).await?;
    Ok(Json(user.into()))
}
