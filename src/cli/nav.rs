use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::{SubCommandExtend, open_session, parse_values, print_values};
use crate::config::Opts;
use crate::error::StoreError;
use crate::session::Session;
use crate::value::FieldValue;

#[derive(Parser, Debug, Clone)]
pub struct NavArgs {
    /// 切换前保存到当前图片的字段值，格式为 key=value，可重复
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    pub values: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct NextCommand {
    #[command(flatten)]
    pub nav: NavArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct PrevCommand {
    #[command(flatten)]
    pub nav: NavArgs,
}

impl SubCommandExtend for NextCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        navigate(opts, &self.nav, Session::next)
    }
}

impl SubCommandExtend for PrevCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        navigate(opts, &self.nav, Session::previous)
    }
}

fn navigate<F>(opts: &Opts, args: &NavArgs, step: F) -> Result<()>
where
    F: FnOnce(&mut Session, BTreeMap<String, FieldValue>) -> Result<Option<PathBuf>, StoreError>,
{
    let mut session = open_session(opts)?;
    let values = parse_values(session.store().schema(), &args.values)?;
    let Some(image) = step(&mut session, values)? else {
        println!("没有加载任何图片");
        return Ok(());
    };
    session.persist()?;

    let navigator = session.navigator();
    println!("[{}/{}] {}", navigator.cursor() + 1, navigator.len(), image.display());
    print_values(&session.current_values());
    Ok(())
}
