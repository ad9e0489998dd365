//! palocheck CLI: command-line interface for test-sheet rhythm analysis.

use clap::{Args, Parser, Subcommand};
use palocheck::{
    ensure_finalizable, AnalysisConfig, Analyzer, DetectionSet, MetricsResult, SheetAnalysis,
};
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "palocheck")]
#[command(about = "Count strokes and score writing rhythm on scanned palographic test sheets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a scanned test sheet.
    Analyze(CliAnalyzeArgs),

    /// Recompute metrics from an edited detection set.
    Recompute(CliRecomputeArgs),

    /// Check whether a metrics record may be finalized into a report.
    FinalizeCheck {
        /// Metrics JSON (a metrics record or a full analysis).
        #[arg(long)]
        metrics: PathBuf,

        /// The results were confirmed by a reviewer.
        #[arg(long)]
        reviewed: bool,
    },

    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct CliAnalyzeArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the analysis (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Configuration JSON; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Accept stubbier strokes on degraded scans.
    #[arg(long)]
    relaxed: bool,

    /// Physical scale of the scan in millimetres per pixel.
    #[arg(long)]
    scale_mm_per_px: Option<f64>,

    /// Path to write the editable detection set (JSON).
    #[arg(long)]
    detections_out: Option<PathBuf>,

    /// Skip the diagnostic region validation report.
    #[arg(long)]
    no_validate: bool,
}

#[derive(Debug, Clone, Args)]
struct CliRecomputeArgs {
    /// Edited detection set (JSON).
    #[arg(long)]
    detections: PathBuf,

    /// Path to write the recomputed analysis (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Configuration JSON; missing fields keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> CliResult<AnalysisConfig> {
    match path {
        Some(p) => {
            tracing::info!("Loading config: {}", p.display());
            Ok(AnalysisConfig::from_json_file(p)?)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::Recompute(args) => run_recompute(&args),
        Commands::FinalizeCheck { metrics, reviewed } => run_finalize_check(&metrics, reviewed),
        Commands::DefaultConfig => run_default_config(),
    }
}

fn log_summary(analysis: &SheetAnalysis) {
    let m = &analysis.metrics;
    tracing::info!(
        "Region {}x{} at ({}, {}), confidence {:.2} ({:?})",
        analysis.region.width,
        analysis.region.height,
        analysis.region.x,
        analysis.region.y,
        analysis.region.confidence,
        analysis.region.source,
    );
    tracing::info!(
        "{} strokes, {} marks, {} lines",
        analysis.strokes.len(),
        analysis.marks.len(),
        analysis.line_count,
    );
    match m.reason_code {
        Some(reason) => tracing::warn!("Needs review: {}", reason.code()),
        None => tracing::info!(
            "Total {:?}, intervals {:?}, NOR {:?}, CV {:?}, trend {:?}",
            m.total,
            m.interval_counts,
            m.nor,
            m.cv,
            m.trend,
        ),
    }
}

// ── analyze ───────────────────────────────────────────────────────────

fn run_analyze(args: &CliAnalyzeArgs) -> CliResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    if args.relaxed {
        config.relaxed = true;
    }
    config.run_validator = !args.no_validate;

    tracing::info!("Loading image: {}", args.image.display());
    let img = image::open(&args.image).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", args.image.display(), e).into()
    })?;
    tracing::info!("Image size: {}x{}", img.width(), img.height());

    let analyzer = Analyzer::with_config(config);
    let analysis = analyzer.analyze_image(&img, args.scale_mm_per_px)?;
    log_summary(&analysis);

    let json = serde_json::to_string_pretty(&analysis)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Results written to {}", args.out.display());

    if let Some(path) = &args.detections_out {
        let json = serde_json::to_string_pretty(&analysis.detection_set())?;
        std::fs::write(path, &json)?;
        tracing::info!("Detections written to {}", path.display());
    }

    Ok(())
}

// ── recompute ─────────────────────────────────────────────────────────

fn run_recompute(args: &CliRecomputeArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let data = std::fs::read_to_string(&args.detections)?;
    let detections: DetectionSet = serde_json::from_str(&data)?;

    let analysis = Analyzer::with_config(config).recompute(&detections);
    log_summary(&analysis);

    let json = serde_json::to_string_pretty(&analysis)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Results written to {}", args.out.display());
    Ok(())
}

// ── finalize-check ────────────────────────────────────────────────────

fn read_metrics(path: &Path) -> CliResult<MetricsResult> {
    let data = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&data)?;
    // Accept a full analysis as well as a bare metrics record.
    let metrics = match value.get("metrics") {
        Some(inner) => inner.clone(),
        None => value,
    };
    Ok(serde_json::from_value(metrics)?)
}

fn run_finalize_check(path: &Path, reviewed: bool) -> CliResult<()> {
    let metrics = read_metrics(path)?;
    ensure_finalizable(&metrics, reviewed)?;
    println!("ready to finalize");
    Ok(())
}

// ── default-config ────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    println!("{}", AnalysisConfig::default().to_json_string()?);
    Ok(())
}
