use crate::{
    batch::{self, Job},
    cancel::CancelToken,
    config::Config,
    engine::ghostscript::GhostscriptEngine,
    orchestrator::Orchestrator,
    report::CompressionReport,
    request::{CompressionRequest, Mode},
    tier::{Strategy, Tier, TierPlanner, escalation_steps, preset_for},
    util::{ensure_dir, hash_file, now_rfc3339, sha256_file, sha256_hex},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pdf-squeeze")]
#[command(about = "Size-targeted adaptive PDF compression (Ghostscript tiers + escalation)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./pdf-squeeze.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// reduce | increase
    #[arg(long, default_value = "reduce")]
    pub mode: String,

    /// Byte budget (reduce) or exact size (increase).
    #[arg(long, conflicts_with = "target_kb")]
    pub target_bytes: Option<u64>,

    /// Same as --target-bytes, in KiB.
    #[arg(long)]
    pub target_kb: Option<u64>,

    /// Tier for reduce without a target: low | medium | high.
    #[arg(long)]
    pub level: Option<String>,
}

impl TargetArgs {
    fn target(&self) -> Result<Option<u64>> {
        match (self.target_bytes, self.target_kb) {
            (Some(b), _) => Ok(Some(b)),
            (None, Some(kb)) => kb
                .checked_mul(1024)
                .map(Some)
                .ok_or_else(|| anyhow!("--target-kb overflows: {kb}")),
            (None, None) => Ok(None),
        }
    }

    fn level(&self) -> Result<Option<Tier>> {
        self.level
            .as_deref()
            .map(|raw| Tier::parse(raw).ok_or_else(|| anyhow!("unknown level: {raw}")))
            .transpose()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check the Ghostscript install.
    Doctor {},
    /// Show the strategies a request would try, without running them.
    Plan {
        #[command(flatten)]
        target: TargetArgs,
    },
    Compress {
        /// Input PDF; repeat for a batch.
        #[arg(long = "input", required = true)]
        inputs: Vec<PathBuf>,
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let mut cfg = match &cfg_path {
        Some(p) => Config::load(p)?,
        None => Config::default(),
    };

    match &args.cmd {
        Command::Doctor {} => {
            let _guard = init_logging(&args, &cfg, None)?;
            doctor(&cfg)
        }
        Command::Plan { target } => {
            let _guard = init_logging(&args, &cfg, None)?;
            plan(&cfg, target)
        }
        Command::Compress {
            inputs,
            target,
            out_dir,
        } => {
            if let Some(dir) = out_dir {
                cfg.paths.out_dir = dir.display().to_string();
            }
            let log_path = resolve_log_path(&cfg);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            compress(&cfg, inputs, target)
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    ["pdf-squeeze.toml", "pdf-squeeze.example.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the JSON summary, so logs go to stderr.
    let console_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let engine = GhostscriptEngine::new(cfg);
    let diag = engine.doctor();
    println!("{}", serde_json::to_string_pretty(&diag)?);
    if !diag.ok {
        return Err(anyhow!("ghostscript unavailable: {}", engine.exe().display()));
    }
    Ok(())
}

fn plan(cfg: &Config, target: &TargetArgs) -> Result<()> {
    let mode = Mode::parse(&target.mode)?;
    let target_bytes = target.target()?;
    let planner = match target.level()? {
        Some(level) => TierPlanner::new(level),
        None => TierPlanner::from_config(cfg),
    };

    let mut strategies: Vec<Strategy> = planner
        .plan(mode, target_bytes.is_some())
        .into_iter()
        .map(Strategy::Standard)
        .collect();
    let escalation = if mode == Mode::Reduce && target_bytes.is_some() {
        escalation_steps(cfg)
    } else {
        Vec::new()
    };
    strategies.extend(escalation.iter().copied());

    let steps: Vec<_> = strategies
        .iter()
        .map(|s| {
            serde_json::json!({
                "strategy": s,
                "preset": preset_for(cfg, *s),
                "escalation": escalation.contains(s),
            })
        })
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "mode": mode,
            "target_bytes": target_bytes,
            "steps": steps,
        }))?
    );
    Ok(())
}

fn compress(cfg: &Config, inputs: &[PathBuf], target: &TargetArgs) -> Result<()> {
    let mode = Mode::parse(&target.mode)?;
    let target_bytes = target.target()?;
    let level = target.level()?;

    let out_dir = PathBuf::from(&cfg.paths.out_dir);
    ensure_dir(&out_dir)?;
    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(out_dir.join("effective-config.toml"), raw)?;
    }

    let (jobs, rejected) = prepare_jobs(cfg, inputs, mode, target_bytes, level);
    for (input, e) in &rejected {
        error!("skipping {}: {e:#}", input.display());
    }

    let engine = GhostscriptEngine::new(cfg);
    let orch = Orchestrator::new(cfg, engine);
    let cancel = CancelToken::new();
    let ids: Vec<(String, PathBuf)> = jobs
        .iter()
        .map(|j| (j.id.clone(), j.request.source.clone()))
        .collect();

    let started = now_rfc3339();
    let results = batch::run_all(
        &orch,
        jobs,
        cfg.global.max_parallel_jobs,
        &cancel,
        cfg.limits.job_timeout_seconds,
    );

    let mut summaries = Vec::new();
    let mut failed = rejected.len();
    for ((id, source), res) in ids.iter().zip(results) {
        let result = match res {
            Ok(r) => r,
            Err(e) => {
                error!("request {id} ({}) failed: {e}", source.display());
                failed += 1;
                continue;
            }
        };
        if !result.target_met {
            warn!(
                "request {id}: target not met ({} bytes, target {:?})",
                result.final_size_bytes, result.target_bytes
            );
        }
        let sha = sha256_file(&result.final_artifact)?;
        let report = CompressionReport::new(
            id,
            &source.display().to_string(),
            mode,
            &result,
            sha,
            started.clone(),
            now_rfc3339(),
        );
        if cfg.output.write_report_json {
            let path = out_dir.join(format!("{id}{}", cfg.output.report_suffix));
            std::fs::write(&path, serde_json::to_string_pretty(&report)?)
                .with_context(|| format!("writing report: {}", path.display()))?;
        }
        summaries.push(report.summary());
    }

    if cfg.global.print_summary {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }

    if failed > 0 {
        return Err(anyhow!("{failed} of {} requests failed", inputs.len()));
    }
    Ok(())
}

/// Turn each input into a job. A bad input is returned alongside its error
/// and does not stop the others.
pub fn prepare_jobs(
    cfg: &Config,
    inputs: &[PathBuf],
    mode: Mode,
    target_bytes: Option<u64>,
    level: Option<Tier>,
) -> (Vec<Job>, Vec<(PathBuf, anyhow::Error)>) {
    let cfg_hash = sha256_hex(cfg.normalized_for_hash().as_bytes());
    let mut jobs = Vec::with_capacity(inputs.len());
    let mut rejected = Vec::new();
    for (idx, input) in inputs.iter().enumerate() {
        let job = validate_input(cfg, input).and_then(|_| {
            let request = CompressionRequest::from_raw(input, mode, target_bytes, level)?;
            let input_hash = hash_file(cfg, input)
                .with_context(|| format!("hashing input: {}", input.display()))?;
            let key = format!("{cfg_hash}:{input_hash}:{mode:?}:{target_bytes:?}:{level:?}:{idx}");
            let id = sha256_hex(key.as_bytes())[..16].to_string();
            info!("request {id} <- {}", input.display());
            Ok(Job { id, request })
        });
        match job {
            Ok(job) => jobs.push(job),
            Err(e) => rejected.push((input.clone(), e)),
        }
    }
    (jobs, rejected)
}

fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    if let Some(ext) = input.extension().and_then(|s| s.to_str()) {
        if !ext.eq_ignore_ascii_case("pdf") {
            return Err(anyhow!("input is not a PDF: {}", input.display()));
        }
    } else {
        warn!("input has no extension; assuming PDF: {}", input.display());
    }

    Ok(())
}

fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(PathBuf::from(&cfg.paths.out_dir).join("pdf-squeeze.log"))
}
