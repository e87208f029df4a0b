//! HTTP mapping for proxy failures.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Upstream unreachable and nothing cached for the request.
    #[error("{0}")]
    Upstream(rutas_core::Error),

    #[error("{0}")]
    BadRequest(rutas_core::Error),

    #[error("{0}")]
    Internal(rutas_core::Error),
}

impl From<rutas_core::Error> for ProxyError {
    fn from(err: rutas_core::Error) -> Self {
        use rutas_core::Error;
        match err {
            e if e.is_network_failure() => ProxyError::Upstream(e),
            e @ (Error::InvalidUrl(_) | Error::InvalidInput(_)) => ProxyError::BadRequest(e),
            e => ProxyError::Internal(e),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ProxyError {
    fn status(&self) -> StatusCode {
        match self {
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn inner(&self) -> &rutas_core::Error {
        match self {
            ProxyError::Upstream(e) | ProxyError::BadRequest(e) | ProxyError::Internal(e) => e,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody { error: self.inner().code(), message: self.to_string() };
        (status, Json(body)).into_response()
    }
}
