use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::{SubCommandExtend, open_session};
use crate::config::Opts;
use crate::utils::read_line;

#[derive(Parser, Debug, Clone)]
pub struct ClearCommand {
    /// 不再确认，直接删除
    #[arg(short, long)]
    pub yes: bool,
}

impl SubCommandExtend for ClearCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let mut session = open_session(opts)?;
        if !self.yes {
            let answer = read_line("确认删除所有标注？[y/N] ")?;
            if !answer.eq_ignore_ascii_case("y") {
                info!("已取消");
                return Ok(());
            }
        }
        let removed = session.store_mut().clear_all()?;
        println!("[OK] 删除了 {} 个标注文件", removed);
        Ok(())
    }
}
