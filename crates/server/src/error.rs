use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serverstat_common::StoreError;
use std::error::Error as _;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Only GET method is allowed")]
    MethodNotAllowed,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Template(#[from] tera::Error),
}

impl AppError {
    // Tera keeps the useful part of a render failure in the source chain.
    fn full_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Store(_) | AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.full_message()).into_response()
    }
}
