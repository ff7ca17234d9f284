use anyhow::Result;
use clap::Parser;
use env_logger::Env;

use imlabel::cli::SubCommandExtend;
use imlabel::config::{Opts, SubCommand};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Schema(cmd) => cmd.run(&opts).await,
        SubCommand::Scan(cmd) => cmd.run(&opts).await,
        SubCommand::Save(cmd) => cmd.run(&opts).await,
        SubCommand::Show(cmd) => cmd.run(&opts).await,
        SubCommand::Delete(cmd) => cmd.run(&opts).await,
        SubCommand::List(cmd) => cmd.run(&opts).await,
        SubCommand::Next(cmd) => cmd.run(&opts).await,
        SubCommand::Prev(cmd) => cmd.run(&opts).await,
        SubCommand::Reload(cmd) => cmd.run(&opts).await,
        SubCommand::Clear(cmd) => cmd.run(&opts).await,
        SubCommand::Server(cmd) => cmd.run(&opts).await,
    }
}
