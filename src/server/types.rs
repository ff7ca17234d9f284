use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::schema::FieldType;

/// 添加字段请求
#[derive(Debug, Deserialize, ToSchema)]
pub struct FieldForm {
    /// 字段名
    pub name: String,
    /// 字段类型：string、float、integer、boolean、array
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "integer")]
    pub field_type: FieldType,
    /// 新建记录时是否必填
    #[serde(default)]
    pub required: bool,
}

/// 保存标注请求
#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveForm {
    /// 图片路径或文件名
    pub frame_path: String,
    /// 字段值，数组字段也可以使用逗号分隔的字符串
    #[schema(value_type = Object)]
    pub values: Map<String, Value>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnnotationQuery {
    /// 图片路径或文件名
    pub frame_path: String,
}

/// 标注记录
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordView {
    pub id: Uuid,
    pub frame_path: String,
    /// 标注文件内容
    #[schema(value_type = Object)]
    pub annotation: Value,
}

/// 原始图片
#[derive(Debug, Serialize, ToSchema)]
pub struct ImageView {
    pub path: String,
    /// 是否已有标注
    pub annotated: bool,
}

/// 上传图片请求
#[derive(TryFromMultipart)]
pub struct UploadRequest {
    #[form_data(limit = "unlimited")]
    pub file: Vec<FieldData<Bytes>>,
}

/// 上传图片表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct UploadForm {
    /// 上传的图片文件，可以是多张图片
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}
