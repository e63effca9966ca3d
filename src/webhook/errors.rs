use crate::api::raffle::CounterError;
use derive_more::{Display, Error};
use ntex::{http, web};

/// Every way a webhook delivery can fail, rendered as plain text
#[derive(Debug, Display, Error)]
pub enum WebhookError {
    #[display("Invalid key")]
    InvalidKey,
    #[display("Method Not Allowed")]
    MethodNotAllowed,
    #[display("Invalid HMAC")]
    InvalidSignature,
    #[display("Error: {_0}")]
    MalformedPayload(#[error(not(source))] String),
    #[display("Counter product not found")]
    CounterProductNotFound,
    /// JSON array of the field errors, sent back untouched
    #[display("{_0}")]
    RemoteFieldErrors(#[error(not(source))] String),
    #[display("Error: {_0}")]
    ExternalServiceError(#[error(not(source))] String),
}

impl From<CounterError> for WebhookError {
    fn from(err: CounterError) -> Self {
        match err {
            CounterError::ProductNotFound(_) => WebhookError::CounterProductNotFound,
            CounterError::FieldErrors(errors) => WebhookError::RemoteFieldErrors(errors),
            CounterError::Store(err) => WebhookError::ExternalServiceError(err.to_string()),
        }
    }
}

impl WebhookError {
    pub fn label(&self) -> &'static str {
        match self {
            WebhookError::InvalidKey => "invalid_key",
            WebhookError::MethodNotAllowed => "method_not_allowed",
            WebhookError::InvalidSignature => "invalid_signature",
            WebhookError::MalformedPayload(_) => "malformed_payload",
            WebhookError::CounterProductNotFound => "product_not_found",
            WebhookError::RemoteFieldErrors(_) => "remote_field_errors",
            WebhookError::ExternalServiceError(_) => "external_service_error",
        }
    }
}

impl web::error::WebResponseError for WebhookError {
    fn error_response(&self, _: &web::HttpRequest) -> web::HttpResponse {
        logfire::error!(
            "[{label}] {msg}",
            label = self.label(),
            msg = self.to_string()
        );

        web::HttpResponse::build(self.status_code())
            .set_header("content-type", "text/plain; charset=utf-8")
            .body(self.to_string())
    }

    fn status_code(&self) -> http::StatusCode {
        match *self {
            WebhookError::InvalidKey | WebhookError::InvalidSignature => {
                http::StatusCode::UNAUTHORIZED
            }
            WebhookError::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            _ => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
