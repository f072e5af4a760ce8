//! Frame firewall replay tool
//!
//! Classifies hex-encoded frames (one per line) against a rule set and
//! prints a traffic report. Optionally writes the raw 68-byte audit stream
//! and feeds admitted traffic through a threat-intel indicator list, so
//! later frames from a flagged source are discarded.

use anyhow::{Context, Result};
use bytes::BytesMut;
use clap::Parser;
use fw_common::{AuditRecord, AUDIT_RECORD_LEN};
use fw_dataplane::{AuditCollector, Classifier, ClassifierConfig, IntelAction, ThreatIntel, Verdict, BATCH_SIZE};
use fw_rules::{BlockRule, BlockSource, Blocklist};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fw-replay")]
#[command(version)]
#[command(about = "Replay captured frames through the frame firewall", long_about = None)]
struct Cli {
    /// Hex-encoded frames, one per line
    frames: PathBuf,

    /// Classifier config (JSON)
    #[arg(long, short, env = "FW_CONFIG")]
    config: Option<PathBuf>,

    /// Rules file, one address, CIDR block or MAC per line
    #[arg(long, short)]
    rules: Option<PathBuf>,

    /// Override the number of lanes
    #[arg(long)]
    lanes: Option<usize>,

    /// Threat-intel indicators, one address or CIDR block per line
    #[arg(long)]
    intel: Option<PathBuf>,

    /// Write the binary audit stream here
    #[arg(long)]
    audit_out: Option<PathBuf>,

    /// Entries per dimension in the report
    #[arg(long, default_value_t = 10)]
    top: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::info!("fw-replay v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => ClassifierConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ClassifierConfig::default(),
    };
    if let Some(lanes) = cli.lanes {
        config.lanes = lanes;
    }

    let intel_config = config.intel.clone();
    let mut classifier = Classifier::new(config).context("building classifier")?;
    let blocklist = Arc::new(Blocklist::new(classifier.store().clone()));
    if let Some(path) = &cli.rules {
        let loaded = load_rules(&blocklist, path)?;
        tracing::info!(rules = loaded, file = %path.display(), "rules loaded");
    }

    let intel = match &cli.intel {
        Some(path) => {
            let intel = ThreatIntel::new(intel_config, blocklist.clone()).context("building threat intel")?;
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading indicators {}", path.display()))?;
            intel
                .load_indicators(&text)
                .with_context(|| format!("loading indicators {}", path.display()))?;
            Some(intel)
        }
        None => None,
    };

    let frames = read_frames(&cli.frames)?;
    tracing::info!(frames = frames.len(), "replaying");

    let ring = classifier
        .audit_ring()
        .cloned()
        .context("classifier has no audit ring")?;
    let collector = AuditCollector::new();
    let mut audit_stream = BytesMut::with_capacity(frames.len() * AUDIT_RECORD_LEN);
    let mut pending: Vec<AuditRecord> = Vec::with_capacity(BATCH_SIZE);
    let mut discarded = 0usize;
    let mut intel_blocks = 0usize;

    for batch in frames.chunks(BATCH_SIZE) {
        let verdicts = classifier.classify_batch(batch);
        discarded += verdicts
            .iter()
            .filter(|c| c.verdict == Verdict::Discard)
            .count();

        pending.clear();
        ring.drain_into(&mut pending, usize::MAX);
        for record in &pending {
            collector.collect(record);
            if let Some(intel) = &intel {
                if matches!(intel.inspect(record), IntelAction::Blocked(_)) {
                    intel_blocks += 1;
                }
            }
            if cli.audit_out.is_some() {
                record.encode(&mut audit_stream);
            }
        }
    }

    if let Some(intel) = &intel {
        intel.cleanup_windows();
        tracing::info!(
            hits = intel.hits(),
            rules = intel.rules_created(),
            blocked = intel_blocks,
            "threat intel summary"
        );
    }

    if let Some(path) = &cli.audit_out {
        fs::write(path, &audit_stream)
            .with_context(|| format!("writing audit stream {}", path.display()))?;
        tracing::info!(
            records = audit_stream.len() / AUDIT_RECORD_LEN,
            file = %path.display(),
            "audit stream written"
        );
    }

    let stats = classifier.stats();
    tracing::info!(
        rx = stats.rx_packets,
        admitted = stats.admitted,
        discarded,
        truncated = stats.truncated,
        audit_dropped = classifier.audit_dropped(),
        "replay finished"
    );

    let report = collector.report(cli.top);
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serializing report")?
    );
    Ok(())
}

/// Install every non-comment line of `path` as a user block rule
fn load_rules(blocklist: &Blocklist, path: &Path) -> Result<usize> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading rules {}", path.display()))?;

    let mut loaded = 0;
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (value, note) = match line.split_once(char::is_whitespace) {
            Some((value, note)) => (value, note.trim()),
            None => (line, ""),
        };
        blocklist
            .add(BlockRule::new(value, BlockSource::User).with_note(note))
            .with_context(|| format!("{}:{}", path.display(), lineno + 1))?;
        loaded += 1;
    }
    Ok(loaded)
}

fn read_frames(path: &Path) -> Result<Vec<Vec<u8>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading frames {}", path.display()))?;

    text.lines()
        .enumerate()
        .map(|(i, line)| (i, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(i, line)| {
            let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
            hex::decode(&compact).with_context(|| format!("{}:{}: bad hex", path.display(), i + 1))
        })
        .collect()
}
