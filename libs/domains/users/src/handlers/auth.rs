use axum::{Json, extract::State};
use axum_helpers::{
    JsonPayload, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestResponse, ConflictResponse, InternalServerErrorResponse, NotFoundResponse,
        UnauthorizedResponse, ValidationFailedResponse,
    },
};

use crate::application::commands::{
    LoginUser, LogoutToken, RefreshWebToken, RegisterUser, RegisterWebUser, SignOutUser,
    WebLoginCheck, WebLogout,
};
use crate::auth::CurrentUser;
use crate::error::UserResult;
use crate::models::{
    LoginRequest, MessageResponse, RefreshTokenRequest, RegisterRequest, TokenPairResponse,
    UserEnvelope, UserResponse, UserTokenResponse,
};
use crate::module::UsersState;
use crate::services::LOGGED_OUT;

use super::TAG;

/// Register from the mobile app and receive a device token
#[utoipa::path(
    post,
    path = "/api/app/register",
    tag = TAG,
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = UserTokenResponse),
        (status = 400, response = BadRequestResponse),
        (status = 409, response = ConflictResponse),
        (status = 422, response = ValidationFailedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn register_app(
    State(state): State<UsersState>,
    JsonPayload(request): JsonPayload<RegisterRequest>,
) -> UserResult<Json<UserTokenResponse>> {
    let (user, token) = state.commands.dispatch(RegisterUser { request }).await?;

    Ok(Json(UserTokenResponse {
        user: UserResponse::with_auth_tokens(&user),
        token,
    }))
}

/// Register from the web client
#[utoipa::path(
    post,
    path = "/api/web/register",
    tag = TAG,
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = UserEnvelope),
        (status = 400, response = BadRequestResponse),
        (status = 409, response = ConflictResponse),
        (status = 422, response = ValidationFailedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn register_web(
    State(state): State<UsersState>,
    JsonPayload(request): JsonPayload<RegisterRequest>,
) -> UserResult<Json<UserEnvelope>> {
    let user = state.commands.dispatch(RegisterWebUser { request }).await?;
    Ok(Json(user.into()))
}

/// Log in from the mobile app. Replaces the token of the same device.
#[utoipa::path(
    post,
    path = "/api/app/login",
    tag = TAG,
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = UserTokenResponse),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn login_app(
    State(state): State<UsersState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> UserResult<Json<UserTokenResponse>> {
    let (user, token) = state
        .commands
        .dispatch(LoginUser {
            email: request.email,
            password: request.password,
            device_name: request.device_name,
        })
        .await?;

    Ok(Json(UserTokenResponse {
        user: UserResponse::with_auth_tokens(&user),
        token,
    }))
}

/// Exchange credentials for a JWT and a refresh token
#[utoipa::path(
    post,
    path = "/api/web/login_check",
    tag = TAG,
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenPairResponse),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn login_check(
    State(state): State<UsersState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> UserResult<Json<TokenPairResponse>> {
    let pair = state
        .commands
        .dispatch(WebLoginCheck {
            email: request.email,
            password: request.password,
        })
        .await?;
    Ok(Json(pair))
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/api/web/token/refresh",
    tag = TAG,
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPairResponse),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn refresh_token(
    State(state): State<UsersState>,
    ValidatedJson(request): ValidatedJson<RefreshTokenRequest>,
) -> UserResult<Json<TokenPairResponse>> {
    let pair = state
        .commands
        .dispatch(RefreshWebToken {
            refresh_token: request.refresh_token,
        })
        .await?;
    Ok(Json(pair))
}

/// Revoke one device token
#[utoipa::path(
    delete,
    path = "/api/{scope}/account/logout/{tokenId}",
    tag = TAG,
    params(
        ("scope" = String, Path, description = "`app` or `web`"),
        ("tokenId" = Uuid, Path, description = "Device token ID")
    ),
    responses(
        (status = 200, description = "Token revoked", body = UserEnvelope),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn logout_token(
    State(state): State<UsersState>,
    UuidPath(token_id): UuidPath,
) -> UserResult<Json<UserEnvelope>> {
    let user = state.commands.dispatch(LogoutToken { token_id }).await?;
    Ok(Json(user.into()))
}

/// Revoke every device token of the caller
#[utoipa::path(
    post,
    path = "/api/{scope}/account/me/sign-out",
    tag = TAG,
    params(("scope" = String, Path, description = "`app` or `web`")),
    responses(
        (status = 200, description = "Signed out", body = UserEnvelope),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn sign_out(
    State(state): State<UsersState>,
    CurrentUser(user): CurrentUser,
) -> UserResult<Json<UserEnvelope>> {
    let user = state
        .commands
        .dispatch(SignOutUser { user_id: user.id() })
        .await?;
    Ok(Json(user.into()))
}

/// Revoke every refresh token of the caller
#[utoipa::path(
    post,
    path = "/api/web/account/me/logout",
    tag = TAG,
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
pub(super) async fn web_logout(
    State(state): State<UsersState>,
    CurrentUser(user): CurrentUser,
) -> UserResult<Json<MessageResponse>> {
    state.commands.dispatch(WebLogout { user }).await?;
    Ok(Json(MessageResponse::new(LOGGED_OUT)))
}
