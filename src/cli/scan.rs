use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::{SubCommandExtend, open_session};
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct ScanCommand {
    /// 图片所在目录，不填则使用当前会话的目录
    pub dir: Option<PathBuf>,
}

impl SubCommandExtend for ScanCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let mut session = open_session(opts)?;
        let count = session.load_images(self.dir.clone())?;
        session.persist()?;

        println!("在 {} 中找到 {} 张图片", session.image_dir().display(), count);
        for image in session.navigator().images() {
            let mark = if session.store().find(image).is_some() { "*" } else { " " };
            println!("{} {}", mark, image.display());
        }
        Ok(())
    }
}
