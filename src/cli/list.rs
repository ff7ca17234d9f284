use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde_json::json;

use crate::cli::{SubCommandExtend, open_session};
use crate::config::Opts;
use crate::session::Session;

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for ListCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let session = open_session(opts)?;
        print_records(&session, self)
    }
}

fn print_records(session: &Session, opts: &ListCommand) -> Result<()> {
    let store = session.store();
    match opts.output_format {
        OutputFormat::Json => {
            let records = store
                .records()
                .iter()
                .map(|record| {
                    json!({
                        "id": record.id,
                        "frame_path": record.frame_path,
                        "annotation": store.annotation_json(record),
                    })
                })
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&records)?)
        }
        OutputFormat::Table => {
            for record in store.records() {
                println!(
                    "{}\t{}\t{}",
                    record.id,
                    record.frame_path.display(),
                    serde_json::to_string(&store.annotation_json(record))?
                );
            }
            let summary = store.summary()?;
            println!(
                "共 {} 条标注，{} 张原始图片，导出目录: {}",
                store.len(),
                session.navigator().len(),
                store.layout().root().display()
            );
            println!(
                "  images/ {} 个文件，annotations/ {} 个文件，index.json {} 项",
                summary.images, summary.annotations, summary.index_entries
            );
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone)]
pub enum OutputFormat {
    Json,
    Table,
}

