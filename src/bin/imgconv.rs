//! CLI binary for edgequake-imgconv.
//!
//! `imgconv serve` runs the HTTP service; `imgconv convert` pushes one local
//! file through the same pipeline.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_imgconv::server;
use edgequake_imgconv::{
    convert_file, ConversionConfig, ConversionObserver, ConversionService, ConvertError,
    OutputArtifact, RequestStage, ServerConfig, TargetFormat, DEFAULT_MAX_UPLOAD_BYTES,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Spinner that follows one request through the pipeline.
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.set_message("reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionObserver for SpinnerObserver {
    fn on_stage(&self, _id: Uuid, stage: RequestStage) {
        let msg = match stage {
            RequestStage::Received => "validating…",
            RequestStage::Stored => "decoding…",
            RequestStage::Converted => "publishing…",
            RequestStage::Published => "cleaning up…",
            RequestStage::Rejected | RequestStage::Failed | RequestStage::Done => return,
        };
        self.bar.set_message(msg);
    }

    fn on_complete(&self, _id: Uuid, outcome: Result<&OutputArtifact, &ConvertError>) {
        self.bar.finish_and_clear();
        match outcome {
            Ok(a) => eprintln!(
                "{} {}  {}",
                green("✔"),
                bold(&a.path.display().to_string()),
                dim(&format!("{} bytes", a.size_bytes))
            ),
            Err(e) => eprintln!("{} {}", red("✘"), red(&e.to_string())),
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default port (5000)
  imgconv serve

  # Serve with a 10 MiB upload ceiling and custom directories
  imgconv serve --max-upload-bytes 10485760 --intake-dir /tmp/uploads --output-dir /srv/converted

  # Convert a local file
  imgconv convert photo.webp --format jpeg

  # Machine-readable result
  imgconv convert photo.jpg --format png --json

HTTP API:
  POST /api/convert    multipart: image=<file>, format=jpeg|png  →  {"url": "/converted/<token>.<ext>"}
  POST /convert        same as above
  GET  /converted/...  published files
  GET  /api/health     "ok"

ENVIRONMENT VARIABLES:
  RUST_LOG                 Log filter (overrides --verbose / --quiet)
  IMGCONV_HOST             Listen host
  IMGCONV_PORT             Listen port
  IMGCONV_INTAKE_DIR       Where raw uploads are staged
  IMGCONV_OUTPUT_DIR       Where converted files are published
  IMGCONV_MAX_UPLOAD_BYTES Per-file size ceiling
"#;

/// Convert WebP, PNG and JPEG images to JPEG or PNG, over HTTP or from the command line.
#[derive(Parser, Debug)]
#[command(
    name = "imgconv",
    version,
    about = "Convert WebP, PNG and JPEG images to JPEG or PNG, over HTTP or locally",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "IMGCONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "IMGCONV_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP conversion service.
    Serve(ServeArgs),
    /// Convert a single local file.
    Convert(ConvertArgs),
}

/// Storage and limit flags shared by both subcommands.
#[derive(Args, Debug)]
struct PipelineArgs {
    /// Directory where converted files are published.
    #[arg(long, env = "IMGCONV_OUTPUT_DIR", default_value = "converted")]
    output_dir: PathBuf,

    /// Per-file upload ceiling in bytes.
    #[arg(long, env = "IMGCONV_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: u64,

    /// Largest accepted image width or height, in pixels.
    #[arg(long, env = "IMGCONV_MAX_DIMENSION", default_value_t = 16_384)]
    max_dimension: u32,

    /// Decode + encode time limit in seconds (0 disables it).
    #[arg(long, env = "IMGCONV_TRANSCODE_TIMEOUT", default_value_t = 30)]
    transcode_timeout: u64,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Listen host.
    #[arg(long, env = "IMGCONV_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listen port.
    #[arg(short, long, env = "IMGCONV_PORT", default_value_t = 5000)]
    port: u16,

    /// Directory where raw uploads are staged during conversion.
    #[arg(long, env = "IMGCONV_INTAKE_DIR", default_value = "uploads")]
    intake_dir: PathBuf,

    /// URL prefix under which converted files are served.
    #[arg(long, env = "IMGCONV_PUBLIC_PREFIX", default_value = "/converted")]
    public_prefix: String,

    /// Whole-request body ceiling in bytes. Default: 4 × --max-upload-bytes.
    #[arg(long, env = "IMGCONV_MAX_REQUEST_BYTES")]
    max_request_bytes: Option<u64>,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Image to convert (WebP, PNG or JPEG).
    input: PathBuf,

    /// Target format: jpeg (alias jpg) or png.
    #[arg(short, long, env = "IMGCONV_FORMAT")]
    format: TargetFormat,

    /// Print the resulting artifact as JSON.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // A one-shot convert shows a spinner instead of INFO logs.
    let show_progress = matches!(&cli.command, Command::Convert(a) if !a.json) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Convert(args) => run_convert(args, show_progress).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut builder = pipeline_builder(&args.pipeline)
        .intake_dir(&args.intake_dir)
        .public_prefix(args.public_prefix.clone());
    if let Some(n) = args.max_request_bytes {
        builder = builder.max_request_bytes(n);
    }
    let config = builder.build().context("Invalid configuration")?;

    let service = ConversionService::new(config)
        .await
        .context("Failed to prepare storage directories")?;
    let server_config = ServerConfig {
        host: args.host,
        port: args.port,
    };

    server::serve(&server_config, service)
        .await
        .with_context(|| format!("Server on {} failed", server_config.bind_addr()))
}

async fn run_convert(args: ConvertArgs, show_progress: bool) -> Result<()> {
    // One-shot runs stage the input in a private directory that is removed
    // on exit.
    let staging = tempfile::TempDir::new().context("Failed to create staging directory")?;
    let config = pipeline_builder(&args.pipeline)
        .intake_dir(staging.path())
        .build()
        .context("Invalid configuration")?;

    let mut service = ConversionService::new(config)
        .await
        .context("Failed to prepare storage directories")?;
    if show_progress {
        service = service.with_observer(SpinnerObserver::new());
    }

    let artifact = convert_file(&service, &args.input, args.format)
        .await
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&artifact).context("Failed to serialise result")?
        );
    } else if !show_progress {
        println!("{}", artifact.path.display());
    }
    Ok(())
}

/// Map the shared flags onto a config builder.
fn pipeline_builder(args: &PipelineArgs) -> edgequake_imgconv::ConversionConfigBuilder {
    let timeout = (args.transcode_timeout > 0).then(|| Duration::from_secs(args.transcode_timeout));
    ConversionConfig::builder()
        .output_dir(&args.output_dir)
        .max_upload_bytes(args.max_upload_bytes)
        .max_image_dimension(args.max_dimension)
        .transcode_timeout(timeout)
}
