use super::load_log;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use elicast_ot::{AreaKind, OperationLog, OwnerTable, Region, RegionBuilder, Segment, SegmentKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Serialized log (JSON array of operations)
    pub log: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Everything `inspect` reports about a log
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    operations: usize,
    kinds: BTreeMap<&'static str, usize>,
    last_ts: i64,
    max_ts: i64,
    exercises: usize,
    regions: Vec<Region>,
    segments: Vec<Segment>,
}

impl Summary {
    fn collect(log: &OperationLog, builder: &RegionBuilder) -> Result<Self> {
        let mut kinds = BTreeMap::new();
        for op in log {
            *kinds.entry(op.kind_name()).or_insert(0) += 1;
        }

        let owners = OwnerTable::from_ops(log.as_slice());
        let segments = owners.segments(log.as_slice());

        Ok(Self {
            operations: log.len(),
            exercises: kinds.get("exPlaceholder").copied().unwrap_or(0) / 2,
            kinds,
            last_ts: log.last_ts(),
            max_ts: log.max_ts(),
            regions: builder.build(log.as_slice())?,
            segments,
        })
    }
}

pub fn inspect(args: InspectArgs, config: &Config, cwd: &str) -> Result<()> {
    let log = load_log(config, cwd, &args.log)?;
    let summary = Summary::collect(&log, &RegionBuilder::new(&config.engine))?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("🔍 {} {}", "Inspecting".green().bold(), args.log.display());
    println!();
    println!("   Operations: {}", summary.operations);
    for (kind, count) in &summary.kinds {
        println!("     {:<14} {}", kind, count);
    }
    println!("   Exercises:  {}", summary.exercises);
    println!("   Duration:   {} (playable {})", format_ms(summary.last_ts), format_ms(summary.max_ts));

    println!();
    println!("   {}", "Regions".bold());
    for region in summary.regions.iter().filter(|r| r.kind.name() != "text") {
        println!("     {:<10} [{}, {})", region.kind.name(), region.from_pos, region.to_pos);
    }

    println!();
    println!("   {}", "Segments".bold());
    for segment in &summary.segments {
        let label = match segment.kind {
            SegmentKind::Text => "text".normal(),
            SegmentKind::Exercise(ex_id) => format!("exercise {}", ex_id).yellow(),
            SegmentKind::Assert => "assert".cyan(),
        };
        println!(
            "     {:<12} ops {}..{}  {} → {}  ({})",
            label,
            segment.start_index,
            segment.end_index,
            format_ms(segment.start_ts),
            format_ms(segment.end_ts),
            format_ms(segment.duration())
        );
    }

    Ok(())
}

/// `m:ss.mmm`
pub fn format_ms(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let ms = ms.unsigned_abs();
    format!("{}{}:{:02}.{:03}", sign, ms / 60_000, ms / 1000 % 60, ms % 1000)
}
