use utoipa::openapi::OpenApi as OpenApiSpec;
use utoipa::{Modify, OpenApi};

/// Pulls the users domain paths, schemas and tags into the app document.
struct UsersDocs;

impl Modify for UsersDocs {
    fn modify(&self, openapi: &mut OpenApiSpec) {
        openapi.merge(domain_users::ApiDoc::openapi());
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(crate::api::health::ready_handler),
    modifiers(&UsersDocs),
    info(
        title = "Accounts API",
        version = "0.1.0",
        description = "Registration, device-token and JWT authentication, password reset and user administration"
    ),
    tags((name = "health", description = "Liveness and readiness"))
)]
pub struct ApiDoc;
