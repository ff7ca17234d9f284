use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path as UrlPath, Query, State};
use axum_auth::AuthBearer;
use axum_typed_multipart::TypedMultipart;
use log::info;
use serde_json::{Value, json};
use tokio::task::block_in_place;
use uuid::Uuid;

use super::error::Result;
use super::state::AppState;
use super::types::*;
use crate::metrics;
use crate::store::{ReloadReport, SaveOutcome};
use crate::value::FieldValue;

/// 获取字段定义
#[utoipa::path(get, path = "/schema", responses((status = 200, description = "字段定义列表")))]
pub async fn list_fields_handler(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    let session = state.session.lock().await;
    Ok(Json(serde_json::to_value(session.store().schema())?))
}

/// 添加字段
#[utoipa::path(post, path = "/schema", request_body = FieldForm)]
pub async fn define_field_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    Json(form): Json<FieldForm>,
) -> Result<Json<Value>> {
    state.authorize(&token)?;
    let mut session = state.session.lock().await;
    block_in_place(|| -> anyhow::Result<()> {
        session.store_mut().define_field(&form.name, form.field_type, form.required)?;
        session.persist()?;
        Ok(())
    })?;
    Ok(Json(serde_json::to_value(session.store().schema())?))
}

/// 删除字段，同时重写所有标注文件
#[utoipa::path(
    delete,
    path = "/schema/{name}",
    params(("name" = String, Path, description = "字段名"))
)]
pub async fn remove_field_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    UrlPath(name): UrlPath<String>,
) -> Result<Json<Value>> {
    state.authorize(&token)?;
    let mut session = state.session.lock().await;
    let rewritten = block_in_place(|| -> anyhow::Result<usize> {
        let rewritten = session.store_mut().remove_field(&name)?;
        session.persist()?;
        Ok(rewritten)
    })?;
    Ok(Json(json!({ "rewritten": rewritten })))
}

/// 获取所有标注记录
#[utoipa::path(get, path = "/records", responses((status = 200, body = [RecordView])))]
pub async fn list_records_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RecordView>>> {
    let session = state.session.lock().await;
    let store = session.store();
    let records = store
        .records()
        .iter()
        .map(|record| RecordView {
            id: record.id,
            frame_path: record.frame_path.display().to_string(),
            annotation: store.annotation_json(record),
        })
        .collect();
    Ok(Json(records))
}

/// 删除标注记录
#[utoipa::path(
    delete,
    path = "/records/{id}",
    params(("id" = Uuid, Path, description = "记录 ID"))
)]
pub async fn delete_record_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    UrlPath(id): UrlPath<Uuid>,
) -> Result<Json<Value>> {
    state.authorize(&token)?;
    let mut session = state.session.lock().await;
    let record = block_in_place(|| session.store_mut().delete(id))?;
    Ok(Json(json!({ "id": record.id, "frame_path": record.frame_path })))
}

/// 获取一张图片的标注，数组字段以逗号分隔的字符串返回
#[utoipa::path(get, path = "/annotation", params(AnnotationQuery))]
pub async fn load_annotation_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnnotationQuery>,
) -> Result<Json<Value>> {
    let session = state.session.lock().await;
    let frame_path = session.resolve_image(&query.frame_path);
    let values = session.store().load_for(&frame_path);
    Ok(Json(json!({ "frame_path": frame_path, "values": values })))
}

/// 保存一张图片的标注
///
/// 值为 null 的字段视为未填写，没有填写任何字段时不会创建记录，返回 null
#[utoipa::path(post, path = "/annotation", request_body = SaveForm)]
pub async fn save_annotation_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    Json(form): Json<SaveForm>,
) -> Result<Json<Option<SaveOutcome>>> {
    state.authorize(&token)?;
    let values = form
        .values
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k, FieldValue::from(v)))
        .collect::<Vec<_>>();
    if values.is_empty() {
        return Ok(Json(None));
    }
    let mut session = state.session.lock().await;
    let frame_path = session.resolve_image(&form.frame_path);
    let outcome = block_in_place(|| session.store_mut().upsert(&frame_path, values))?;
    session.seek(&frame_path);
    Ok(Json(Some(outcome)))
}

/// 从导出目录重新加载所有标注
#[utoipa::path(post, path = "/reload")]
pub async fn reload_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
) -> Result<Json<ReloadReport>> {
    state.authorize(&token)?;
    let mut session = state.session.lock().await;
    let report = block_in_place(|| -> anyhow::Result<ReloadReport> {
        let report = session.store_mut().reload_from_disk()?;
        session.persist()?;
        Ok(report)
    })?;
    info!("重新加载了 {} 条标注", report.loaded);
    Ok(Json(report))
}

/// 删除所有标注
#[utoipa::path(post, path = "/clear")]
pub async fn clear_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
) -> Result<Json<Value>> {
    state.authorize(&token)?;
    let mut session = state.session.lock().await;
    let removed = block_in_place(|| session.store_mut().clear_all())?;
    Ok(Json(json!({ "removed": removed })))
}

/// 获取原始图片列表
#[utoipa::path(get, path = "/images", responses((status = 200, body = [ImageView])))]
pub async fn list_images_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ImageView>>> {
    let session = state.session.lock().await;
    let images = session
        .navigator()
        .images()
        .iter()
        .map(|path| ImageView {
            path: path.display().to_string(),
            annotated: session.store().find(path).is_some(),
        })
        .collect();
    Ok(Json(images))
}

/// 上传图片到原始图片目录
#[utoipa::path(
    post,
    path = "/images",
    request_body(content = UploadForm, content_type = "multipart/form-data")
)]
pub async fn upload_images_handler(
    State(state): State<Arc<AppState>>,
    AuthBearer(token): AuthBearer,
    data: TypedMultipart<UploadRequest>,
) -> Result<Json<Value>> {
    state.authorize(&token)?;
    let mut session = state.session.lock().await;

    let mut added = 0;
    for file in &data.file {
        let file_name = match &file.metadata.file_name {
            Some(file_name) => file_name,
            None => {
                return Err(anyhow::anyhow!("文件名不能为空").into());
            }
        };
        // 只保留文件名，避免写到图片目录之外
        let Some(name) = Path::new(file_name).file_name() else {
            continue;
        };
        let target = session.image_dir().join(name);
        if !session.scanner().is_image(&target) || target.exists() {
            info!("跳过上传文件: {}", file_name);
            continue;
        }
        block_in_place(|| std::fs::write(&target, &file.contents))?;
        added += 1;
    }

    let total = block_in_place(|| session.load_images(None))?;
    session.persist()?;
    Ok(Json(json!({ "added": added, "total": total })))
}

/// 导出 prometheus 指标
#[utoipa::path(get, path = "/metrics")]
pub async fn metrics_handler() -> Result<String> {
    Ok(metrics::encode_text()?)
}
