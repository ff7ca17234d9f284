use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::{SubCommandExtend, open_session, parse_values};
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct SaveCommand {
    /// 图片路径或文件名
    pub image: PathBuf,
    /// 字段值，格式为 key=value，数组用逗号分隔，可重复
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    pub values: Vec<String>,
}

impl SubCommandExtend for SaveCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let mut session = open_session(opts)?;
        let values = parse_values(session.store().schema(), &self.values)?;
        let image = session.resolve_image(&self.image);

        if values.is_empty() {
            println!("[SKIP] 没有填写任何字段: {}", image.display());
            return Ok(());
        }

        let outcome = session.store_mut().upsert(&image, values)?;
        session.seek(&image);
        session.persist()?;

        match outcome.created {
            true => println!("[OK] Add {} ({})", image.display(), outcome.id),
            false => println!("[OK] Update {} ({})", image.display(), outcome.id),
        }
        Ok(())
    }
}
