use axum::extract::{Json, State};
use axum::response::Json as JsonResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::email::DeliveryGateway;
use crate::error::ApiError;
use crate::otp::{generate_otp, OtpPurpose, OtpRecord, OtpStore, VerifyOutcome};

/// Shared application state.
pub struct AppState {
    pub store: OtpStore,
    pub mailer: Arc<dyn DeliveryGateway>,
    pub config: ServiceConfig,
}

impl AppState {
    pub fn new(store: OtpStore, mailer: Arc<dyn DeliveryGateway>, config: ServiceConfig) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }
}

// Request/Response structures
#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    email: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    email: Option<String>,
    otp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    email: Option<String>,
    otp: Option<String>,
    #[serde(rename = "newPassword")]
    new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    success: bool,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct VerifiedUser {
    email: String,
    name: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpResponse {
    success: bool,
    message: String,
    user: VerifiedUser,
}

#[derive(Debug, Serialize)]
pub struct ResetVerifiedResponse {
    success: bool,
    message: String,
    email: String,
}

/// Build the full application router, CORS included (permissive, with the
/// 200-empty-body pre-flight).
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/health", get(health))
        .route("/test-smtp", get(test_smtp));

    Router::new().nest("/api", api).with_state(state).layer(cors)
}

// POST /api/send-otp
pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<JsonResponse<MessageResponse>, ApiError> {
    let email = required(payload.email, "Email is required")?;
    let name = payload.name.unwrap_or_default();

    issue(&state, &email, &name, OtpPurpose::EmailVerification).await?;

    Ok(JsonResponse(MessageResponse {
        success: true,
        message: "OTP sent successfully".to_string(),
    }))
}

// POST /api/verify-otp
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<JsonResponse<VerifyOtpResponse>, ApiError> {
    let (Some(email), Some(otp)) = (
        payload.email.filter(|v| !v.is_empty()),
        payload.otp.filter(|v| !v.is_empty()),
    ) else {
        return Err(ApiError::Validation("Email and OTP are required"));
    };

    match state
        .store
        .verify(&email, &otp, Some(OtpPurpose::EmailVerification))
    {
        VerifyOutcome::Success { email, name } => {
            info!("OTP verified for {}", email);
            Ok(JsonResponse(VerifyOtpResponse {
                success: true,
                message: "OTP verified successfully".to_string(),
                user: VerifiedUser { email, name },
            }))
        }
        outcome => Err(outcome_error(outcome)),
    }
}

// POST /api/forgot-password
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<JsonResponse<MessageResponse>, ApiError> {
    let email = required(payload.email, "Email is required")?;
    let name = payload.name.unwrap_or_else(|| "User".to_string());

    issue(&state, &email, &name, OtpPurpose::PasswordReset).await?;

    Ok(JsonResponse(MessageResponse {
        success: true,
        message: "Password reset OTP sent successfully".to_string(),
    }))
}

// POST /api/reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<JsonResponse<ResetVerifiedResponse>, ApiError> {
    let (Some(email), Some(otp), Some(new_password)) = (
        payload.email.filter(|v| !v.is_empty()),
        payload.otp.filter(|v| !v.is_empty()),
        payload.new_password.filter(|v| !v.is_empty()),
    ) else {
        return Err(ApiError::Validation(
            "Email, OTP, and new password are required",
        ));
    };

    // Password policy is checked before the store is consulted, so a weak
    // password does not burn a verification attempt.
    if new_password.len() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters long",
        ));
    }

    match state
        .store
        .verify(&email, &otp, Some(OtpPurpose::PasswordReset))
    {
        VerifyOutcome::Success { email, .. } => {
            info!("Password reset OTP verified for {}", email);
            Ok(JsonResponse(ResetVerifiedResponse {
                success: true,
                message: "OTP verified successfully. You can now reset your password."
                    .to_string(),
                email,
            }))
        }
        outcome => Err(outcome_error(outcome)),
    }
}

// GET /api/health
pub async fn health() -> JsonResponse<Value> {
    JsonResponse(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

// GET /api/test-smtp
pub async fn test_smtp(State(state): State<Arc<AppState>>) -> JsonResponse<Value> {
    let connected = state.mailer.verify_connection().await;
    let message = if connected {
        "SMTP connection successful"
    } else {
        "SMTP connection failed"
    };
    JsonResponse(json!({
        "success": connected,
        "message": message,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Issue a fresh code for `email`: store first (superseding any pending
/// code), then hand off to the delivery gateway. A delivery failure is
/// surfaced to the caller but the stored record is kept; the gateway
/// reporting failure does not prove the email never went out, and the
/// record expires on its own.
async fn issue(
    state: &AppState,
    email: &str,
    name: &str,
    purpose: OtpPurpose,
) -> Result<(), ApiError> {
    let code = generate_otp();
    let record = OtpRecord::new(
        code.clone(),
        name.to_string(),
        purpose,
        state.config.otp_ttl,
    );
    state.store.put(email, record);

    let sent = match purpose {
        OtpPurpose::EmailVerification => state.mailer.send_otp(email, &code, name).await,
        OtpPurpose::PasswordReset => state.mailer.send_password_reset(email, &code, name).await,
    };

    if !sent {
        return Err(match purpose {
            OtpPurpose::EmailVerification => ApiError::Delivery("Failed to send OTP"),
            OtpPurpose::PasswordReset => ApiError::Delivery("Failed to send password reset email"),
        });
    }

    info!("OTP issued for {} ({})", email, purpose.as_str());
    debug!("OTP for {}: {}", email, code);
    Ok(())
}

fn required(field: Option<String>, message: &'static str) -> Result<String, ApiError> {
    field
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::Validation(message))
}

fn outcome_error(outcome: VerifyOutcome) -> ApiError {
    match outcome {
        VerifyOutcome::WrongPurpose => ApiError::WrongPurpose,
        VerifyOutcome::TooManyAttempts => ApiError::TooManyAttempts,
        VerifyOutcome::InvalidCode { attempts_left } => ApiError::InvalidCode { attempts_left },
        _ => ApiError::NotFoundOrExpired,
    }
}
