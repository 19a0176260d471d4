//! Reusable OpenAPI response types for consistent API documentation.

use super::ErrorResponse;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Bad Request - empty body or missing mandatory key",
    content_type = "application/json",
    example = json!({
        "message": "Mandatory key email is missing payload",
        "code": 400
    })
)]
pub struct BadRequestResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Unauthorized - missing or invalid credentials",
    content_type = "application/json",
    example = json!({
        "message": "Invalid credentials",
        "code": 401
    })
)]
pub struct UnauthorizedResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Forbidden - insufficient role",
    content_type = "application/json",
    example = json!({
        "message": "Access Denied.",
        "code": 403
    })
)]
pub struct ForbiddenResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Resource not found",
    content_type = "application/json",
    example = json!({
        "message": "User not found",
        "code": 404
    })
)]
pub struct NotFoundResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Conflict - uniqueness violation",
    content_type = "application/json",
    example = json!({
        "message": "Validation failed.",
        "code": 409,
        "errors": [{
            "property": "email",
            "errors": ["There is already an account with this email"],
            "context": "User"
        }]
    })
)]
pub struct ConflictResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Unprocessable Entity - field validation failed",
    content_type = "application/json",
    example = json!({
        "message": "Validation failed.",
        "code": 422,
        "errors": [{
            "property": "passwordConfirmation",
            "errors": ["Passwords do not match."],
            "context": "User"
        }]
    })
)]
pub struct ValidationFailedResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Internal Server Error",
    content_type = "application/json",
    example = json!({
        "message": "An internal server error occurred",
        "code": 500
    })
)]
pub struct InternalServerErrorResponse(pub ErrorResponse);
