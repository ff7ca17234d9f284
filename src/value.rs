use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::schema::FieldType;

/// 标注字段的值
///
/// 列表只以字符串序列保存，逗号分隔只是输入和展示时的形式。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<String>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        FieldType::infer(self)
    }

    /// 按逗号拆分并去掉首尾空白
    pub fn split_list(raw: &str) -> Vec<String> {
        if raw.trim().is_empty() {
            return vec![];
        }
        raw.split(',').map(|item| item.trim().to_string()).collect()
    }

    /// 将用户输入的文本按声明的类型解析
    pub fn parse(field_type: FieldType, raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        match field_type {
            FieldType::Text => Some(Self::Text(raw.to_string())),
            FieldType::Integer => trimmed.parse().ok().map(Self::Integer),
            FieldType::Float => {
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite()).map(Self::Float)
            }
            FieldType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Some(Self::Boolean(true)),
                "false" | "no" | "n" | "0" => Some(Self::Boolean(false)),
                _ => None,
            },
            FieldType::Array => Some(Self::List(Self::split_list(raw))),
        }
    }

    /// 将值转换为声明的类型，失败时返回原值
    ///
    /// 只允许两种转换：逗号分隔的文本转为列表，整数转为浮点数
    pub fn coerce(self, field_type: FieldType) -> Result<Self, Self> {
        match (self, field_type) {
            (value, ty) if value.field_type() == ty => Ok(value),
            (Self::Text(raw), FieldType::Array) => Ok(Self::List(Self::split_list(&raw))),
            (Self::Integer(n), FieldType::Float) => Ok(Self::Float(n as f64)),
            (value, _) => Err(value),
        }
    }

    /// JSON 无法表示 NaN 和无穷大
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(n) => n.is_finite(),
            _ => true,
        }
    }

    /// 表单展示形式，列表会被重新拼接为逗号分隔的文本
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::List(items) => items.join(", "),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Float(n) => Value::from(*n),
            Self::Boolean(b) => Value::Bool(*b),
            Self::List(items) => Value::from(items.clone()),
        }
    }
}

impl From<Value> for FieldValue {
    /// 根据 JSON 值的形状转换，无法归类的值以 JSON 文本保存
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => Self::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            other @ (Value::Null | Value::Object(_)) => Self::Text(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}
