use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum_typed_multipart::TypedMultipart;
use log::info;

use super::error::{AppError, Result};
use super::state::AppState;
use super::types::*;
use crate::error::IngestError;
use crate::metrics;
use crate::utils::{check_format, unix_timestamp};

/// 上传一张图片并加入向量库
#[utoipa::path(
    post,
    path = "/api/v1/images/upload",
    request_body(content = ImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = UploadResponse),
        (status = 400, body = MessageResponse),
        (status = 503, body = MessageResponse),
    )
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    TypedMultipart(data): TypedMultipart<ImageRequest>,
) -> Result<Json<UploadResponse>> {
    let original_name = data
        .image
        .metadata
        .file_name
        .ok_or_else(|| AppError::BadRequest("文件名不能为空".to_string()))?;

    let record = state.db.upload(&original_name, &data.image.contents).await?;

    Ok(Json(UploadResponse {
        success: true,
        message: "图像上传成功".to_string(),
        image_id: record.id,
        image_path: file_name(&record.stored_path).unwrap_or_default(),
    }))
}

/// 搜索相似图片
#[utoipa::path(
    post,
    path = "/api/v1/images/search",
    params(SearchQuery),
    request_body(content = ImageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = SearchResponse),
        (status = 400, body = MessageResponse),
        (status = 503, body = MessageResponse),
    )
)]
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
    TypedMultipart(data): TypedMultipart<ImageRequest>,
) -> Result<Json<SearchResponse>> {
    let top_k = match query.top_k {
        None => state.top_k,
        Some(k @ 1..=100) => k as usize,
        Some(_) => return Err(AppError::BadRequest("无效的top_k参数 (1-100)".to_string())),
    };
    if let Some(file_name) = &data.image.metadata.file_name {
        check_format(file_name).map_err(IngestError::from)?;
        info!("正在搜索上传图片: {}", file_name);
    }

    let results = state.db.search(&data.image.contents, top_k).await?;
    let results = results.into_iter().map(SearchResult::from).collect::<Vec<_>>();

    Ok(Json(SearchResponse {
        success: true,
        message: "搜索完成".to_string(),
        total: results.len(),
        results,
    }))
}

/// 删除图片
#[utoipa::path(
    delete,
    path = "/api/v1/images/{id}",
    params(("id" = String, Path, description = "图片 ID")),
    responses(
        (status = 200, body = MessageResponse),
        (status = 404, body = MessageResponse),
    )
)]
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    if state.db.delete(&id).await? {
        Ok(Json(MessageResponse::ok("图像删除成功")))
    } else {
        Err(AppError::NotFound(format!("图片不存在: {}", id)))
    }
}

/// 获取统计信息
#[utoipa::path(
    get,
    path = "/api/v1/system/stats",
    responses(
        (status = 200, body = StatsResponse),
    )
)]
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>> {
    let stats = state.db.stats().await?;
    Ok(Json(StatsResponse::new(stats, state.max_file_size, unix_timestamp())))
}

/// 健康检查
#[utoipa::path(
    get,
    path = "/api/v1/system/health",
    responses(
        (status = 200, body = MessageResponse),
        (status = 503, body = MessageResponse),
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Result<Json<MessageResponse>> {
    state.db.health().await?;
    Ok(Json(MessageResponse::ok("服务正常")))
}

/// 导出 prometheus 指标
pub async fn metrics_handler() -> Result<impl IntoResponse> {
    let body = metrics::render().map_err(anyhow::Error::from)?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use axum::body::Bytes;
    use axum_typed_multipart::{FieldData, FieldMetadata};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    use super::*;
    use crate::IMDBBuilder;
    use crate::config::{ConfDir, ExtractorOptions};
    use crate::server::create_app;

    fn png(color: [u8; 3]) -> Bytes {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(40, 30, |x, y| {
            if (x / 5 + y / 5) % 2 == 0 { Rgb(color) } else { Rgb([color[2], color[0], 90]) }
        }));
        let mut buf = Cursor::new(vec![]);
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        Bytes::from(buf.into_inner())
    }

    fn form(file_name: Option<&str>, contents: Bytes) -> TypedMultipart<ImageRequest> {
        let metadata = FieldMetadata { file_name: file_name.map(str::to_string), ..Default::default() };
        TypedMultipart(ImageRequest { image: FieldData { metadata, contents } })
    }

    async fn state(dir: &std::path::Path) -> Arc<AppState> {
        let opts = ExtractorOptions { dimension: 64, image_size: 32, margin: 8 };
        let db = IMDBBuilder::new(ConfDir::new(dir)).extractor(opts).open().await.unwrap();
        Arc::new(AppState { db, top_k: 10, max_file_size: 1 << 20 })
    }

    #[tokio::test]
    async fn test_upload_search_delete() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path()).await;
        let _app = create_app(state.clone());

        let Json(uploaded) =
            upload_handler(State(state.clone()), form(Some("cat.PNG"), png([200, 30, 30]))).await.unwrap();
        assert!(uploaded.success);
        assert_eq!(uploaded.image_path, format!("{}.png", uploaded.image_id));

        let query = Query(SearchQuery { top_k: Some(1) });
        let Json(found) =
            search_handler(State(state.clone()), query, form(None, png([200, 30, 30]))).await.unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.results[0].image_id, uploaded.image_id);
        assert_eq!(found.results[0].image_path.as_deref(), Some(uploaded.image_path.as_str()));

        let Json(stats) = stats_handler(State(state.clone())).await.unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.dimension, 64);

        let id = uploaded.image_id;
        assert!(delete_handler(State(state.clone()), Path(id.clone())).await.unwrap().success);
        let err = delete_handler(State(state.clone()), Path(id)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_bad_requests() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path()).await;

        let err = upload_handler(State(state.clone()), form(None, png([1, 2, 3]))).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = upload_handler(State(state.clone()), form(Some("a.gif"), png([1, 2, 3]))).await.unwrap_err();
        assert!(matches!(err, AppError::Ingest(IngestError::Decode(_))));

        let query = Query(SearchQuery { top_k: Some(101) });
        let err = search_handler(State(state.clone()), query, form(None, png([1, 2, 3]))).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        assert_eq!(state.db.stats().await.unwrap().store.count, 0);
    }
}
