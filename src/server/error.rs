use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;

use super::types::MessageResponse;
use crate::error::{IngestError, StoreError};

/// API错误类型
#[derive(Debug)]
pub enum AppError {
    /// 请求参数错误
    BadRequest(String),
    NotFound(String),
    Ingest(IngestError),
    Internal(anyhow::Error),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Ingest(e) => match e {
                IngestError::Decode(_) => StatusCode::BAD_REQUEST,
                IngestError::Extract(_) => StatusCode::UNPROCESSABLE_ENTITY,
                IngestError::Store(StoreError::InvalidK(_)) => StatusCode::BAD_REQUEST,
                IngestError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
                IngestError::Storage(_) | IngestError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) | Self::NotFound(msg) => write!(f, "{}", msg),
            Self::Ingest(e) => write!(f, "{}", e),
            Self::Internal(e) => write!(f, "{}", e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("请求处理失败: {}", self);
        }
        (status, Json(MessageResponse::error(self.to_string()))).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        Self::Ingest(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeError, ExtractError};

    #[test]
    fn test_status_mapping() {
        let decode = AppError::from(IngestError::from(DecodeError::Unsupported("a.gif".into())));
        assert_eq!(decode.status(), StatusCode::BAD_REQUEST);

        let extract = AppError::from(IngestError::from(ExtractError::ZeroArea { width: 0, height: 3 }));
        assert_eq!(extract.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let store = AppError::from(IngestError::from(StoreError::Backend(sqlx::Error::PoolClosed)));
        assert_eq!(store.status(), StatusCode::SERVICE_UNAVAILABLE);

        let k = AppError::from(IngestError::from(StoreError::InvalidK(0)));
        assert_eq!(k.status(), StatusCode::BAD_REQUEST);

        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    }
}
