use super::load_log;
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use elicast_ot::{
    apply, build_text, revert, ElicastError, EngineConfig, MemoryBuffer, OperationLog, OwnerTable, RegionBuilder,
    Scrubber,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Serialized log (JSON array of operations)
    pub log: PathBuf,
}

#[derive(Debug, Default)]
struct Findings {
    seeks: usize,
    /// Timestamps where incremental seeking disagreed with a rebuild
    seek_mismatches: Vec<i64>,
    round_trip: Option<String>,
    regions: Option<String>,
}

impl Findings {
    fn is_clean(&self) -> bool {
        self.seek_mismatches.is_empty() && self.round_trip.is_none() && self.regions.is_none()
    }
}

fn check(log: &OperationLog, config: &EngineConfig) -> Result<Findings> {
    let mut findings = Findings::default();

    // Every distinct timestamp forward, then back down
    let mut stops: Vec<i64> = log.iter().map(|op| op.ts()).collect();
    stops.dedup();
    let backward: Vec<i64> = stops.iter().rev().skip(1).copied().collect();
    stops.extend(backward);

    let owners = OwnerTable::from_ops(log.as_slice());
    let mut scrubber = Scrubber::new(config);
    let mut buffer = MemoryBuffer::new();

    for ts in stops {
        match scrubber.seek(log, &owners, &mut buffer, ts) {
            Ok(_) => {}
            // The text is already in place when regions are resolved
            Err(ElicastError::Region(err)) => {
                findings.regions.get_or_insert_with(|| err.to_string());
                scrubber.mark_dirty();
            }
            Err(err) => return Err(err.into()),
        }
        let expected = build_text(&log.as_slice()[..log.index_at_ts(ts)])?;
        if buffer.as_str() != expected {
            findings.seek_mismatches.push(ts);
            scrubber.mark_dirty();
        }
        findings.seeks += 1;
    }

    let mut buffer = MemoryBuffer::new();
    let round_trip = log
        .iter()
        .try_for_each(|op| apply(&mut buffer, op))
        .and_then(|_| log.iter().rev().try_for_each(|op| revert(&mut buffer, op)));
    findings.round_trip = match round_trip {
        Err(err) => Some(err.to_string()),
        Ok(()) if !buffer.as_str().is_empty() => Some(format!("{} chars left after reverting", buffer.as_str().chars().count())),
        Ok(()) => None,
    };

    if findings.regions.is_none() {
        findings.regions = RegionBuilder::new(config)
            .build(log.as_slice())
            .err()
            .map(|err| err.to_string());
    }

    Ok(findings)
}

pub fn verify(args: VerifyArgs, config: &Config, cwd: &str) -> Result<()> {
    println!("🔍 {} {}", "Verifying".green().bold(), args.log.display());

    let log = load_log(config, cwd, &args.log)?;
    let findings = check(&log, &config.engine)?;

    println!("   Seeks checked: {}", findings.seeks);
    for ts in &findings.seek_mismatches {
        println!("   {} Incremental seek to {} differs from rebuild", "✗".red(), ts);
    }
    match &findings.round_trip {
        Some(err) => println!("   {} Apply/revert round trip: {}", "✗".red(), err),
        None => println!("   {} Apply/revert round trip", "✓".green()),
    }
    match &findings.regions {
        Some(err) => println!("   {} Regions: {}", "✗".red(), err),
        None => println!("   {} Regions", "✓".green()),
    }

    println!();
    if findings.is_clean() {
        println!("✨ {} No issues found!", "Done".green().bold());
        Ok(())
    } else {
        Err(anyhow::anyhow!("Log {} failed verification", args.log.display()))
    }
}
