use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mentor::errors::RunError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Invalid path for {field}: {reason}")]
    InvalidPath { field: String, reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a dotted configuration key to the environment variable that sets it
pub fn to_env_var(field: &str) -> String {
    format!("MENTOR_{}", field.replace('.', "__").to_uppercase())
}

/// Request failures rendered as `{ "error": ... }` with a matching status
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("The model endpoint failed to respond")]
    BadGateway(#[source] anyhow::Error),

    #[error("The request took too long to complete")]
    Timeout,

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RunError> for ApiError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::InvalidInput(msg) => ApiError::BadRequest(msg),
            RunError::ModelInvocation(e) => ApiError::BadGateway(e),
            RunError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::BadGateway(e) => tracing::error!("model invocation failed: {:#}", e),
            ApiError::Internal(msg) => tracing::error!("internal error: {}", msg),
            _ => tracing::warn!("request rejected: {}", self),
        }

        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
