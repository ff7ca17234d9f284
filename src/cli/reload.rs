use anyhow::Result;
use clap::Parser;
use indicatif::ProgressBar;

use crate::cli::{SubCommandExtend, open_session, warn_issues};
use crate::config::Opts;
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct ReloadCommand {}

impl SubCommandExtend for ReloadCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let mut session = open_session(opts)?;

        let pb = ProgressBar::no_length().with_style(pb_style());
        let report = session.store_mut().reload_from_disk_with(|done, total| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        })?;
        pb.finish_and_clear();

        warn_issues(&report);
        session.persist()?;

        println!("加载了 {} 条标注，跳过 {} 项", report.loaded, report.issues.len());
        if !report.inferred_fields.is_empty() {
            println!("新增字段: {}", report.inferred_fields.join(", "));
        }
        Ok(())
    }
}
