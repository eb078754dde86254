use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::application::catalog::CatalogError;
use crate::application::repos::RepoError;
use crate::infra::error::InfraError;

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<CatalogError> for HttpError {
    fn from(error: CatalogError) -> Self {
        const SOURCE: &str = "application::error::catalog_error_to_http_error";
        match error {
            CatalogError::ProductNotFound(_)
            | CatalogError::CategoryNotFound(_)
            | CatalogError::PageNotFound(_) => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Resource not found",
                &error,
            ),
            CatalogError::Repo(RepoError::Timeout | RepoError::Unavailable(_)) => {
                HttpError::from_error(
                    SOURCE,
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Catalog temporarily unavailable",
                    &error,
                )
            }
            CatalogError::Repo(_) => HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                "Catalog request failed",
                &error,
            ),
        }
    }
}

/// Failures that end the process; reported once by the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
