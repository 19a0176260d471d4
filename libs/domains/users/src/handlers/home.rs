use axum::Json;

use crate::models::MessageResponse;

#[utoipa::path(
    get,
    path = "/",
    tag = "home",
    responses((status = 200, description = "Welcome message", body = MessageResponse))
)]
pub(super) async fn home() -> Json<MessageResponse> {
    Json(MessageResponse::new("Welcome to the home page."))
}
