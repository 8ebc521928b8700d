// handlers/auth.rs - POST /api/auth/register and POST /api/auth/login
//
// Account creation and sign-in are planned around passkeys, with an
// admin-issued one-time password as the fallback. Neither flow exists yet;
// both endpoints describe the contract they will implement.

use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};

/**
 * POST /api/auth/register - Register a new user
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "string",       // Required: display name
 *   "email": "string",      // Required: unique per user
 *   "passkeyId": "string"   // Required: WebAuthn credential id
 * }
 * ```
 */
pub async fn register_post() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({
            "error": "Register endpoint not yet implemented",
            "message": "This will create a user account bound to a passkey",
            "expected_input": {
                "name": "string (required)",
                "email": "string (required, unique)",
                "passkeyId": "string (required)"
            }
        }))
    )
}

/**
 * POST /api/auth/login - Sign in with a passkey or a one-time password
 *
 * Expected Input:
 * ```json
 * {
 *   "email": "string",       // Required
 *   "passkeyId": "string",   // Passkey sign-in
 *   "password": "string"     // OTP fallback issued by an admin
 * }
 * ```
 */
pub async fn login_post() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({
            "error": "Login endpoint not yet implemented",
            "message": "This will authenticate a passkey (or OTP fallback) and start a session",
            "expected_input": {
                "email": "string (required)",
                "passkeyId": "string (passkey sign-in)",
                "password": "string (OTP fallback)"
            },
            "planned_response": {
                "success": true,
                "data": {
                    "token": "eyJhbGciOiJIUzI1NiI...",
                    "user": {
                        "id": "user_uuid",
                        "name": "Jane",
                        "role": "standard"
                    }
                }
            }
        }))
    )
}
