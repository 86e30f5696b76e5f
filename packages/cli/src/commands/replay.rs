use super::inspect::format_ms;
use super::load_log;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use elicast_ot::{pos_to_line_ch, AreaKind, MemoryBuffer, OwnerTable, RunOutput, Scrubber};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Serialized log (JSON array of operations)
    pub log: PathBuf,

    /// Timestamp to replay to, in ms. Defaults to the end of the playable part.
    #[arg(short, long)]
    pub ts: Option<i64>,

    /// Print only the document
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn replay(args: ReplayArgs, config: &Config, cwd: &str) -> Result<()> {
    let log = load_log(config, cwd, &args.log)?;
    let owners = OwnerTable::from_ops(log.as_slice());
    let ts = args.ts.unwrap_or_else(|| log.max_ts());

    let mut scrubber = Scrubber::new(&config.engine);
    let mut buffer = MemoryBuffer::new();
    // Rebuild so the report carries regions and run output
    scrubber.mark_dirty();
    let report = scrubber.seek(&log, &owners, &mut buffer, ts)?;

    if args.quiet {
        print!("{}", buffer.as_str());
        return Ok(());
    }

    let (anchor, head) = buffer.selection();
    let text = buffer.as_str();

    println!("▶️  {} {} at {}", "Replaying".green().bold(), args.log.display(), format_ms(ts));
    println!("   Operations applied: {}/{}", report.index, log.len());
    println!(
        "   Cursor: {} → {}",
        pos_to_line_ch(text, anchor),
        pos_to_line_ch(text, head)
    );

    if let Some(regions) = &report.regions {
        for region in regions.iter().filter(|r| r.kind.name() != "text") {
            let from = pos_to_line_ch(text, region.from_pos);
            let to = pos_to_line_ch(text, region.to_pos);
            println!("   {} {} {} → {}", "Region".yellow(), region.kind.name(), from, to);
        }
    }

    match report.run_output {
        Some(RunOutput::Running) => println!("   Run: {}", "running".yellow()),
        Some(RunOutput::Finished { exit_code, ref output }) => {
            println!("   Run: exit code {}", exit_code);
            for line in output.lines() {
                println!("     {}", line.dimmed());
            }
        }
        Some(RunOutput::Empty) | None => {}
    }

    println!();
    println!("{}", "─".repeat(40).dimmed());
    print!("{}", text);
    if !text.ends_with('\n') {
        println!();
    }
    println!("{}", "─".repeat(40).dimmed());

    Ok(())
}
