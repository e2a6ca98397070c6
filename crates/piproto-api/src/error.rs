use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use piproto_core::error::PiprotoError;
use tracing::error;

use crate::types::ErrorBody;

/// Anything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Domain(PiprotoError),
    /// Body was not a JSON object of the expected shape.
    Body { status: StatusCode, message: String },
}

impl From<PiprotoError> for ApiError {
    fn from(e: PiprotoError) -> Self {
        ApiError::Domain(e)
    }
}

/// A body that is not JSON at all keeps 415; every other rejection (bad
/// syntax, wrong field types) is a plain 400 like any other bad input.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection {
            JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError::Body { status, message: rejection.body_text() }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Body { status, .. } => *status,
            ApiError::Domain(e) => match e {
                PiprotoError::ReferralNotFound(_) | PiprotoError::UnknownAccount(_) => {
                    StatusCode::NOT_FOUND
                }
                e if e.is_client_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Body { message, .. } => ErrorBody::new(message.clone()),
            ApiError::Domain(PiprotoError::CooldownActive { remaining_ms }) => ErrorBody {
                remaining_cooldown: Some(*remaining_ms),
                ..ErrorBody::new("Cooldown active")
            },
            ApiError::Domain(e) if e.is_client_error() => ErrorBody::new(e.to_string()),
            ApiError::Domain(_) => ErrorBody::new("internal server error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::Domain(e) = &self {
            if status.is_server_error() {
                error!(error = %e, "request failed");
            }
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use piproto_core::types::{Amount, Asset};

    #[test]
    fn status_mapping() {
        let cases = [
            (PiprotoError::MissingField("userId"), StatusCode::BAD_REQUEST),
            (PiprotoError::InvalidAmount("x".into()), StatusCode::BAD_REQUEST),
            (
                PiprotoError::InsufficientBalance {
                    asset: Asset::Coins,
                    need: Amount::units(2),
                    have: Amount::ZERO,
                },
                StatusCode::BAD_REQUEST,
            ),
            (PiprotoError::SelfReferral, StatusCode::BAD_REQUEST),
            (PiprotoError::InviterNotFound("a".into()), StatusCode::BAD_REQUEST),
            (PiprotoError::ReferralNotFound("a".into()), StatusCode::NOT_FOUND),
            (PiprotoError::UnknownAccount("a".into()), StatusCode::NOT_FOUND),
            (PiprotoError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn cooldown_carries_remaining() {
        let body = ApiError::from(PiprotoError::CooldownActive { remaining_ms: 6_000 }).body();
        assert_eq!(body.error, "Cooldown active");
        assert_eq!(body.remaining_cooldown, Some(6_000));
        assert!(!body.success);
    }

    #[test]
    fn storage_details_are_not_leaked() {
        let body = ApiError::from(PiprotoError::Storage("/var/lib/secret".into())).body();
        assert!(!body.error.contains("secret"));
    }
}
