mod clear;
mod delete;
mod list;
mod nav;
mod reload;
mod save;
mod scan;
mod schema;
pub mod server;
mod show;

use std::collections::BTreeMap;

pub use clear::*;
pub use delete::*;
pub use list::*;
pub use nav::*;
pub use reload::*;
pub use save::*;
pub use scan::*;
pub use schema::*;
pub use server::*;
pub use show::*;

use anyhow::{Context, Result};
use log::warn;

use crate::config::Opts;
use crate::error::StoreError;
use crate::schema::Schema;
use crate::session::Session;
use crate::store::ReloadReport;
use crate::value::FieldValue;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// 打开会话，启动时从导出目录加载已有标注
pub fn open_session(opts: &Opts) -> Result<Session> {
    let (session, report) =
        Session::open(opts.conf_dir.session(), opts.export_dir.clone(), opts.image_dir.clone())
            .context("打开会话失败")?;
    if let Some(report) = report {
        warn_issues(&report);
    }
    Ok(session)
}

pub(crate) fn warn_issues(report: &ReloadReport) {
    for issue in &report.issues {
        warn!("{:?}", issue);
    }
}

/// 解析 `key=value` 形式的输入，按字段类型转换
pub fn parse_values(schema: &Schema, inputs: &[String]) -> Result<BTreeMap<String, FieldValue>> {
    let mut values = BTreeMap::new();
    for input in inputs {
        let (name, raw) = input
            .split_once('=')
            .with_context(|| format!("无效的输入 `{}`，应为 key=value", input))?;
        let name = name.trim();
        let field =
            schema.annotation_field(name).ok_or_else(|| StoreError::UnknownField(name.into()))?;
        let value = FieldValue::parse(field.field_type, raw).ok_or_else(|| {
            StoreError::InvalidValue {
                field: name.to_string(),
                value: raw.to_string(),
                expected: field.field_type,
            }
        })?;
        values.insert(name.to_string(), value);
    }
    Ok(values)
}

/// 以 `key: value` 形式打印字段值
pub(crate) fn print_values(values: &BTreeMap<String, FieldValue>) {
    for (name, value) in values {
        println!("{}: {}", name, value.display());
    }
}
