//! HTTP layer of the users domain.
//!
//! Handlers only translate between HTTP and commands/queries; all rules live
//! in the services behind the buses.

mod account;
mod admin;
mod auth;
mod home;
mod password;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use axum_helpers::{
    ErrorResponse, FieldError,
    errors::responses::{
        BadRequestResponse, ConflictResponse, ForbiddenResponse, InternalServerErrorResponse,
        NotFoundResponse, UnauthorizedResponse, ValidationFailedResponse,
    },
};
use utoipa::OpenApi;

use crate::models::{
    AdminCreateUserRequest, AdminUpdateUserRequest, AuthTokenResponse, ChangePasswordRequest,
    DashboardResponse, DeleteAccountRequest, DispatchResponse, ForgotPasswordRequest,
    LoginRequest, MessageResponse, PublishUpdateRequest, RefreshTokenRequest, RegisterRequest,
    ResetPasswordRequest, TokenPairResponse, UpdateProfileRequest, UserEnvelope,
    UserListResponse, UserResponse, UserTokenResponse,
};
use crate::module::UsersState;
use crate::value_objects::UserRole;

pub use password::RESET_REQUESTED;

pub(crate) const TAG: &str = "account";
pub(crate) const ADMIN_TAG: &str = "admin";

/// Client families sharing the account routes.
const SCOPES: [&str; 2] = ["app", "web"];

#[derive(OpenApi)]
#[openapi(
    paths(
        home::home,
        auth::register_app,
        auth::register_web,
        auth::login_app,
        auth::login_check,
        auth::refresh_token,
        auth::logout_token,
        auth::sign_out,
        auth::web_logout,
        account::update_profile,
        account::change_password,
        account::delete_account,
        account::dashboard,
        account::publish_update,
        password::forgot_password,
        password::reset_password,
        admin::list_users,
        admin::create_user,
        admin::update_user,
        admin::force_delete_user,
        admin::soft_delete_user,
        admin::restore_user,
    ),
    components(
        schemas(
            UserResponse, AuthTokenResponse, UserEnvelope, UserTokenResponse, TokenPairResponse,
            MessageResponse, DashboardResponse, DispatchResponse, UserListResponse, UserRole,
            RegisterRequest, LoginRequest, RefreshTokenRequest, UpdateProfileRequest,
            ChangePasswordRequest, DeleteAccountRequest, ForgotPasswordRequest,
            ResetPasswordRequest, AdminCreateUserRequest, AdminUpdateUserRequest,
            PublishUpdateRequest, ErrorResponse, FieldError
        ),
        responses(
            BadRequestResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            NotFoundResponse,
            ConflictResponse,
            ValidationFailedResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "home", description = "Landing endpoint"),
        (name = TAG, description = "Registration, login and account management"),
        (name = ADMIN_TAG, description = "User administration")
    )
)]
pub struct ApiDoc;

fn scoped_routes(scope: &str) -> Router<UsersState> {
    Router::new()
        .route(
            &format!("/{scope}/account/logout/{{tokenId}}"),
            delete(auth::logout_token),
        )
        .route(&format!("/{scope}/account/me/sign-out"), post(auth::sign_out))
        .route(
            &format!("/{scope}/account/me/update"),
            patch(account::update_profile),
        )
        .route(
            &format!("/{scope}/account/me/change-password"),
            patch(account::change_password),
        )
        .route(
            &format!("/{scope}/account/me/delete-account"),
            post(account::delete_account),
        )
        .route(&format!("/{scope}/dashboard"), get(account::dashboard))
        .route(
            &format!("/{scope}/test-mercure"),
            post(account::publish_update),
        )
}

/// Routes to nest under `/api`.
pub fn api_router(state: UsersState) -> Router {
    let router = SCOPES
        .iter()
        .fold(Router::new(), |router, scope| router.merge(scoped_routes(scope)));

    router
        .route("/app/register", post(auth::register_app))
        .route("/app/login", post(auth::login_app))
        .route("/web/register", post(auth::register_web))
        .route("/web/login_check", post(auth::login_check))
        .route("/web/token/refresh", post(auth::refresh_token))
        .route("/web/account/me/logout", post(auth::web_logout))
        .route("/forgot-password", post(password::forgot_password))
        .route("/reset-password", post(password::reset_password))
        .route(
            "/admin/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route(
            "/admin/user/{id}",
            patch(admin::update_user).delete(admin::force_delete_user),
        )
        .route("/admin/user/delete/{id}", patch(admin::soft_delete_user))
        .route("/admin/user/restore/{id}", patch(admin::restore_user))
        .with_state(state)
}

/// Routes mounted at the root.
pub fn home_router() -> Router {
    Router::new().route("/", get(home::home))
}

