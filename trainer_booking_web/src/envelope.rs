use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use trainer_booking::domain::DataAccessError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Fail,
    Error,
}

/// `{status, data}` 形式のレスポンス
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub status: Status,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            status: Status::Success,
            data,
        })
    }
}

/// `{status, message}` 形式のレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: Status,
    pub message: String,
}

impl ErrorResponse {
    pub fn error(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: Status::Error,
            message: message.into(),
        })
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// 入力不備。400 / error
    #[error("{0}")]
    BadRequest(String),
    /// 形は正しいが受け付けられない。400 / fail
    #[error("{0}")]
    Fail(String),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] DataAccessError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        ApiError::Fail(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::error(message)).into_response()
            }
            ApiError::Fail(message) => (
                StatusCode::BAD_REQUEST,
                Json(DataResponse {
                    status: Status::Fail,
                    data: json!({ "message": message }),
                }),
            )
                .into_response(),
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, ErrorResponse::error("not found")).into_response()
            }
            ApiError::Internal(e) => {
                error!("ストレージエラー: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::error("internal server error"),
                )
                    .into_response()
            }
        }
    }
}
