use anyhow::Result;
use clap::Parser;
use uuid::Uuid;

use crate::cli::{SubCommandExtend, open_session};
use crate::config::Opts;
use crate::error::StoreError;

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// 记录 ID，或图片路径、文件名
    pub target: String,
}

impl SubCommandExtend for DeleteCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let mut session = open_session(opts)?;
        let record = match Uuid::parse_str(&self.target) {
            Ok(id) => session.store_mut().delete(id)?,
            Err(_) => {
                let image = session.resolve_image(&self.target);
                session
                    .store_mut()
                    .delete_by_path(&image)?
                    .ok_or_else(|| StoreError::RecordNotFound(self.target.clone()))?
            }
        };
        println!("[OK] Delete {} ({})", record.frame_path.display(), record.id);
        Ok(())
    }
}
