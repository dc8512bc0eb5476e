use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use liveness_core::{trace, AxisConvention, LivenessConfig};
use liveness_runtime::spawn_session;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "liveness", about = "Selfie liveness diagnostics")]
struct Cli {
    /// TOML config file (defaults apply when omitted; LIVENESS_* env vars override)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded JSONL observation trace through a session
    Replay {
        /// Trace file, one JSON observation per line
        trace: PathBuf,
        /// Treat tracker yaw and eye channels as mirrored
        #[arg(long)]
        mirrored: bool,
        /// Evaluate challenges even when the face is off-center or too close
        #[arg(long)]
        lenient: bool,
        /// Fail if the trace ends before verification
        #[arg(long)]
        require_verified: bool,
    },
    /// Print the resolved challenge catalog
    Catalog,
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay {
            trace,
            mirrored,
            lenient,
            require_verified,
        } => {
            let mut config = config;
            if mirrored {
                config.axis_convention = AxisConvention::Mirrored;
            }
            if lenient {
                config.strict_framing = false;
            }
            replay(&config, &trace, require_verified).await?;
        }
        Commands::Catalog => {
            let resolved = config.resolve()?;
            for (i, spec) in resolved.catalog.iter().enumerate() {
                println!(
                    "{i}  {:<22} threshold={:<6} {}",
                    spec.kind.to_string(),
                    spec.threshold,
                    spec.instruction_text
                );
            }
        }
        Commands::Config => {
            // Validate before printing so bad values surface here too.
            config.resolve()?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<LivenessConfig> {
    match path {
        Some(path) => Ok(LivenessConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?
            .with_env_overrides()),
        None => Ok(LivenessConfig::from_env()),
    }
}

async fn replay(config: &LivenessConfig, trace_path: &Path, require_verified: bool) -> Result<()> {
    let file = File::open(trace_path)
        .with_context(|| format!("opening trace {}", trace_path.display()))?;
    let frames = trace::read_trace(BufReader::new(file))
        .with_context(|| format!("reading trace {}", trace_path.display()))?;

    let resolved = Arc::new(config.resolve()?);
    println!(
        "replaying {} frames ({} challenges, convention={}, strict_framing={})",
        frames.len(),
        resolved.catalog.len(),
        resolved.convention,
        resolved.strict_framing
    );

    let captured = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&captured);
    let trigger = move || {
        tracing::info!("capture trigger fired");
        flag.store(true, Ordering::SeqCst);
    };
    let handle = spawn_session(resolved, trigger)?;

    let mut last_instruction = None;
    let mut verified_at = None;
    for (i, frame) in frames.into_iter().enumerate() {
        let step = handle.observe(frame).await?;
        if step.reset {
            println!("frame {i:>5}  progress reset");
        }
        if step.advanced {
            println!("frame {i:>5}  challenge passed ({} done)", step.index);
        }
        if last_instruction != Some(step.instruction) {
            println!("frame {i:>5}  [{}] {}", step.framing, step.instruction);
            last_instruction = Some(step.instruction);
        }
        if step.verified_now {
            verified_at = Some(i);
        }
    }

    let status = handle.status().await?;
    match verified_at {
        Some(frame) => println!("verified at frame {frame}"),
        None => println!("not verified: {}/{} challenges passed", status.index, status.total),
    }
    println!(
        "capture fired: {}",
        if captured.load(Ordering::SeqCst) { "yes" } else { "no" }
    );

    if require_verified && !status.verified {
        anyhow::bail!("trace ended before verification");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_without_file_reads_env() {
        std::env::set_var("LIVENESS_SMILE_THRESHOLD", "0.75");
        let config = load_config(None).unwrap();
        std::env::remove_var("LIVENESS_SMILE_THRESHOLD");
        assert_eq!(config.thresholds.smile, 0.75);
    }
}
