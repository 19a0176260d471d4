//! Messages shared by the extractors and fallback handlers.

pub const INTERNAL_ERROR: &str = "An internal server error occurred";
pub const EMPTY_PAYLOAD: &str = "Request content is empty or not valid";
pub const VALIDATION_FAILED: &str = "Validation failed.";
pub const NOT_FOUND_ROUTE: &str = "No route found for the requested path";
pub const METHOD_NOT_ALLOWED: &str = "The HTTP method is not allowed for this resource";
pub const AUTHENTICATION_REQUIRED: &str = "You must be logged in.";

/// "Mandatory key {key} is missing payload"
pub fn missing_key(key: &str) -> String {
    format!("Mandatory key {key} is missing payload")
}
