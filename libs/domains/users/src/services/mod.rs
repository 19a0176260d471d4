//! Domain services. Each one owns a slice of the use cases and talks to
//! storage only through the repository traits.

mod auth_token_service;
mod auth_user_service;
mod reset_password_service;
mod user_command_service;
mod user_query_service;
mod web_auth_service;

pub use auth_token_service::AuthTokenService;
pub use auth_user_service::{AuthUserService, DEFAULT_DEVICE};
pub use reset_password_service::ResetPasswordService;
pub use user_command_service::UserCommandService;
pub use user_query_service::UserQueryService;
pub use web_auth_service::{LOGGED_OUT, WebAuthService};
