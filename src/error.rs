use std::io;
use std::path::PathBuf;

use crate::schema::FieldType;

/// 修改字段定义时的错误
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("字段 `{0}` 已存在")]
    DuplicateField(String),

    #[error("字段名不能为空")]
    EmptyName,

    #[error("字段 `{0}` 受保护，不能删除")]
    ProtectedField(String),

    #[error("`{0}` 是保留字段名")]
    ReservedName(String),
}

/// 标注存储的错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("缺少必填字段: {0}")]
    MissingRequiredField(String),

    #[error("未定义的字段: {0}")]
    UnknownField(String),

    #[error("字段 `{field}` 的类型应为 {expected}，实际为 {found}")]
    TypeMismatch { field: String, expected: FieldType, found: FieldType },

    #[error("字段 `{field}` 的值 `{value}` 无法解析为 {expected}")]
    InvalidValue { field: String, value: String, expected: FieldType },

    #[error("无效的图片路径: {}", .0.display())]
    InvalidFramePath(PathBuf),

    #[error("记录不存在: {0}")]
    RecordNotFound(String),

    #[error("复制图片 {} 失败: {source}", .path.display())]
    ImageCopy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
