mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::error::{AppError, Unauthorized};
pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::list_fields_handler,
        api::define_field_handler,
        api::remove_field_handler,
        api::list_records_handler,
        api::delete_record_handler,
        api::load_annotation_handler,
        api::save_annotation_handler,
        api::reload_handler,
        api::clear_handler,
        api::list_images_handler,
        api::upload_images_handler,
        api::metrics_handler,
    ),
    components(schemas(
        types::FieldForm,
        types::SaveForm,
        types::RecordView,
        types::ImageView,
        types::UploadForm,
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/schema", get(api::list_fields_handler).post(api::define_field_handler))
        .route("/schema/{name}", delete(api::remove_field_handler))
        .route("/records", get(api::list_records_handler))
        .route("/records/{id}", delete(api::delete_record_handler))
        .route(
            "/annotation",
            get(api::load_annotation_handler).post(api::save_annotation_handler),
        )
        .route("/reload", post(api::reload_handler))
        .route("/clear", post(api::clear_handler))
        .route("/images", get(api::list_images_handler).post(api::upload_images_handler))
        .route("/metrics", get(api::metrics_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        // 上传限制：50M
        .layer(RequestBodyLimitLayer::new(1024 * 1024 * 50))
        .with_state(state)
}
