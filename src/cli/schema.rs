use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use crate::cli::{SubCommandExtend, open_session};
use crate::config::Opts;
use crate::schema::FieldType;

#[derive(Subcommand, Debug, Clone)]
pub enum SchemaCommand {
    /// 列出所有字段
    List,
    /// 添加字段
    Add(AddFieldCommand),
    /// 删除字段，同时从所有标注文件中移除
    Remove(RemoveFieldCommand),
    /// 输出示例 JSON 结构
    Example,
}

#[derive(Parser, Debug, Clone)]
pub struct AddFieldCommand {
    /// 字段名
    pub name: String,
    /// 字段类型：string、float、integer、boolean、array
    #[arg(default_value = "string")]
    pub field_type: FieldType,
    /// 新建记录时是否必填
    #[arg(long)]
    pub required: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RemoveFieldCommand {
    /// 字段名
    pub name: String,
}

impl SubCommandExtend for SchemaCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let mut session = open_session(opts)?;
        match self {
            Self::List => {
                for field in session.store().schema().fields() {
                    let required = if field.required { " (required)" } else { "" };
                    println!("{}\t{}{}", field.name, field.field_type, required);
                }
            }
            Self::Add(cmd) => {
                session.store_mut().define_field(&cmd.name, cmd.field_type, cmd.required)?;
                session.persist()?;
            }
            Self::Remove(cmd) => {
                let rewritten = session.store_mut().remove_field(&cmd.name)?;
                session.persist()?;
                info!("已更新 {} 个标注文件", rewritten);
            }
            Self::Example => {
                println!("{}", serde_json::to_string_pretty(&session.store().schema().example())?);
                println!("对于图片 'a.jpg'，标注会保存为 'a.json'");
            }
        }
        Ok(())
    }
}
