use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::{SubCommandExtend, open_session, print_values};
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// 图片路径或文件名，不填则显示当前图片
    pub image: Option<PathBuf>,
    /// 输出标注文件的 JSON 内容
    #[arg(long)]
    pub json: bool,
}

impl SubCommandExtend for ShowCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let session = open_session(opts)?;
        let image = match &self.image {
            Some(image) => session.resolve_image(image),
            None => match session.current_image() {
                Some(image) => image.to_path_buf(),
                None => {
                    println!("没有加载任何图片");
                    return Ok(());
                }
            },
        };

        let store = session.store();
        match (self.json, store.find(&image)) {
            (true, Some(record)) => {
                println!("{}", serde_json::to_string_pretty(&store.annotation_json(record))?)
            }
            (true, None) => println!("{{}}"),
            (false, _) => {
                println!("{}", image.display());
                print_values(&store.load_for(&image));
            }
        }
        Ok(())
    }
}
