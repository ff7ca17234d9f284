use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "aloxaf", "imlabel").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().expect("config dir is not valid utf-8")
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imlabel", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// imlabel 配置文件目录
    #[arg(short, long, global = true, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
    /// 导出目录，覆盖上次会话的设置
    #[arg(short, long, global = true, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
    /// 原始图片目录，覆盖上次会话的设置
    #[arg(short, long, global = true, value_name = "DIR")]
    pub image_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 查看或修改标注字段
    #[command(subcommand)]
    Schema(SchemaCommand),
    /// 扫描原始图片目录
    Scan(ScanCommand),
    /// 保存一张图片的标注
    Save(SaveCommand),
    /// 显示一张图片的标注
    Show(ShowCommand),
    /// 删除一张图片的标注
    Delete(DeleteCommand),
    /// 列出所有标注
    List(ListCommand),
    /// 保存当前图片并切换到下一张
    Next(NextCommand),
    /// 保存当前图片并切换到上一张
    Prev(PrevCommand),
    /// 从导出目录重新加载所有标注
    Reload(ReloadCommand),
    /// 删除所有标注
    Clear(ClearCommand),
    /// 启动 HTTP 标注服务
    Server(ServerCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回会话状态文件的路径
    pub fn session(&self) -> PathBuf {
        self.path.join("session.json")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}
