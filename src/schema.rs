use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::SchemaError;
use crate::value::FieldValue;

/// 图片路径字段，记录与图片之间的关联键
pub const FRAME_PATH: &str = "frame_path";
/// 记录 ID，只存在于内存中
pub const RECORD_ID: &str = "id";

/// 字段类型，序列化名称与导出格式保持一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[serde(rename = "string")]
    Text,
    Float,
    Integer,
    Boolean,
    Array,
}

impl FieldType {
    pub const ALL: [FieldType; 5] =
        [Self::Text, Self::Float, Self::Integer, Self::Boolean, Self::Array];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Float => "float",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
        }
    }

    /// 根据样例值推断字段类型
    pub fn infer(sample: &FieldValue) -> Self {
        match sample {
            FieldValue::List(_) => Self::Array,
            FieldValue::Boolean(_) => Self::Boolean,
            FieldValue::Integer(_) => Self::Integer,
            FieldValue::Float(_) => Self::Float,
            FieldValue::Text(_) => Self::Text,
        }
    }

    /// 示例 JSON 中使用的样例值
    fn example(&self) -> Value {
        match self {
            Self::Text => json!("example text"),
            Self::Float => json!(42.5),
            Self::Integer => json!(42),
            Self::Boolean => json!(true),
            Self::Array => json!(["item1", "item2"]),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "text" => Ok(Self::Text),
            "float" => Ok(Self::Float),
            "integer" | "int" => Ok(Self::Integer),
            "boolean" | "bool" => Ok(Self::Boolean),
            "array" | "list" => Ok(Self::Array),
            _ => Err(format!("无效的字段类型: {}", s)),
        }
    }
}

/// 字段定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

impl FieldDef {
    pub fn is_synthetic(&self) -> bool {
        self.name == FRAME_PATH
    }
}

/// 字段注册表
///
/// 字段按定义顺序保存，`frame_path` 始终位于第一位且不能删除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<FieldDef>", into = "Vec<FieldDef>")]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            fields: vec![FieldDef {
                name: FRAME_PATH.to_string(),
                field_type: FieldType::Text,
                required: true,
            }],
        }
    }
}

impl From<Vec<FieldDef>> for Schema {
    fn from(fields: Vec<FieldDef>) -> Self {
        let mut schema = Self::default();
        for field in fields {
            let name = field.name.trim();
            if name.is_empty() || name == RECORD_ID || schema.contains(name) {
                continue;
            }
            schema.fields.push(FieldDef { name: name.to_string(), ..field });
        }
        schema
    }
}

impl From<Schema> for Vec<FieldDef> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有字段，包括 `frame_path`
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// 会写入标注文件的字段
    pub fn annotation_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| !f.is_synthetic())
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// 查找可写入标注文件的字段
    pub fn annotation_field(&self, name: &str) -> Option<&FieldDef> {
        self.get(name).filter(|f| !f.is_synthetic())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 定义一个新字段
    ///
    /// # Arguments
    ///
    /// * `name` - 字段名，首尾空白会被去掉
    /// * `field_type` - 字段类型
    /// * `required` - 新建记录时是否必填
    pub fn define(
        &mut self,
        name: &str,
        field_type: FieldType,
        required: bool,
    ) -> Result<&FieldDef, SchemaError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if name == RECORD_ID {
            return Err(SchemaError::ReservedName(name.to_string()));
        }
        if self.contains(name) {
            return Err(SchemaError::DuplicateField(name.to_string()));
        }
        self.fields.push(FieldDef { name: name.to_string(), field_type, required });
        Ok(&self.fields[self.fields.len() - 1])
    }

    /// 删除字段定义，返回被删除的定义
    ///
    /// 注意这里只修改注册表，记录和标注文件由 `AnnotationStore::remove_field` 处理
    pub fn remove(&mut self, name: &str) -> Result<Option<FieldDef>, SchemaError> {
        if name == FRAME_PATH {
            return Err(SchemaError::ProtectedField(name.to_string()));
        }
        Ok(self.fields.iter().position(|f| f.name == name).map(|i| self.fields.remove(i)))
    }

    /// 若字段不存在，则根据样例值推断类型并注册为非必填字段
    ///
    /// 返回是否新注册了字段
    pub fn infer_and_register(&mut self, name: &str, sample: &FieldValue) -> bool {
        if self.contains(name) || name.trim().is_empty() || name == RECORD_ID {
            return false;
        }
        self.fields.push(FieldDef {
            name: name.to_string(),
            field_type: FieldType::infer(sample),
            required: false,
        });
        true
    }

    /// 生成当前字段结构的示例 JSON
    pub fn example(&self) -> Value {
        let map = self
            .annotation_fields()
            .map(|f| (f.name.clone(), f.field_type.example()))
            .collect::<Map<_, _>>();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_has_frame_path() {
        let schema = Schema::new();
        let field = schema.get(FRAME_PATH).unwrap();
        assert!(field.required);
        assert_eq!(schema.annotation_fields().count(), 0);
    }

    #[test]
    fn test_define_rejects_blank_and_duplicate() {
        let mut schema = Schema::new();
        assert!(matches!(schema.define("   ", FieldType::Text, false), Err(SchemaError::EmptyName)));
        schema.define(" count ", FieldType::Integer, false).unwrap();
        assert!(schema.contains("count"));
        assert!(matches!(
            schema.define("count", FieldType::Float, false),
            Err(SchemaError::DuplicateField(name)) if name == "count"
        ));
        assert!(matches!(
            schema.define(FRAME_PATH, FieldType::Text, false),
            Err(SchemaError::DuplicateField(_))
        ));
        assert!(matches!(
            schema.define("id", FieldType::Text, false),
            Err(SchemaError::ReservedName(_))
        ));
    }

    #[test]
    fn test_remove_frame_path_is_protected() {
        let mut schema = Schema::new();
        schema.define("tags", FieldType::Array, false).unwrap();
        let before = schema.clone();
        assert!(matches!(schema.remove(FRAME_PATH), Err(SchemaError::ProtectedField(_))));
        assert_eq!(schema, before);

        let removed = schema.remove("tags").unwrap().unwrap();
        assert_eq!(removed.field_type, FieldType::Array);
        assert!(schema.remove("tags").unwrap().is_none());
    }

    #[test]
    fn test_infer_and_register() {
        let mut schema = Schema::new();
        assert!(schema.infer_and_register("a", &FieldValue::List(vec!["x".into()])));
        assert!(schema.infer_and_register("b", &FieldValue::Boolean(true)));
        assert!(schema.infer_and_register("c", &FieldValue::Integer(1)));
        assert!(schema.infer_and_register("d", &FieldValue::Float(1.5)));
        assert!(schema.infer_and_register("e", &FieldValue::Text("x".into())));
        // 已存在的字段保持原类型
        assert!(!schema.infer_and_register("c", &FieldValue::Text("x".into())));

        let types = schema.annotation_fields().map(|f| f.field_type).collect::<Vec<_>>();
        assert_eq!(
            types,
            [FieldType::Array, FieldType::Boolean, FieldType::Integer, FieldType::Float, FieldType::Text]
        );
        assert!(schema.annotation_fields().all(|f| !f.required));
    }

    #[test]
    fn test_schema_serde_keeps_frame_path() {
        let schema: Schema =
            serde_json::from_str(r#"[{"name": "count", "type": "integer"}]"#).unwrap();
        assert_eq!(schema.fields()[0].name, FRAME_PATH);
        assert_eq!(schema.get("count").unwrap().field_type, FieldType::Integer);

        let text = serde_json::to_string(&schema).unwrap();
        assert!(text.contains(r#""type":"string""#));
        assert_eq!(serde_json::from_str::<Schema>(&text).unwrap(), schema);
    }

    #[test]
    fn test_example() {
        let mut schema = Schema::new();
        schema.define("caption", FieldType::Text, false).unwrap();
        schema.define("tags", FieldType::Array, false).unwrap();
        assert_eq!(
            schema.example(),
            json!({"caption": "example text", "tags": ["item1", "item2"]})
        );
    }
}
