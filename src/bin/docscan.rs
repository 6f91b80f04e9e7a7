//! CLI binary for edgequake-docscan.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ScanConfig` and writes the scanned image.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_docscan::pipeline::normalize::is_heic_file;
use edgequake_docscan::{
    scan_document, write_output, ImageFile, OriginPolicy, OutputType, ProgressCallback,
    ScanConfig, ScanProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that follows the scan through decode and encode.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Scanning");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ScanProgressCallback for CliProgressCallback {
    fn on_scan_start(&self, name: &str) {
        self.bar.set_message(format!("decoding {name}…"));
    }

    fn on_decoded(&self, width: u32, height: u32) {
        self.bar
            .set_message(format!("binarized {width}×{height} px, encoding…"));
    }

    fn on_encoded(&self, bytes: usize) {
        self.bar
            .set_message(format!("encoded {bytes} bytes, building data reference…"));
    }

    fn on_scan_complete(&self, _output_name: &str) {
        // The summary line in `main` reports the result.
        self.bar.finish_and_clear();
    }

    fn on_scan_error(&self, error: &str) {
        self.bar.finish_and_clear();
        let first_line = error.lines().next().unwrap_or_default();
        eprintln!("{} {}", red("✘"), red(first_line));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Scan a photo; writes scanned_receipt.png next to it
  docscan receipt.jpg

  # Choose the output path
  docscan receipt.jpg -o out/receipt-bw.png

  # JPEG output at quality 0.8, named .jpg instead of .png
  docscan --format jpeg --quality 0.8 --match-extension receipt.jpg

  # Print the data reference (for pasting into HTML) instead of writing a file
  docscan --print-url --no-write receipt.jpg

  # JSON summary
  docscan --json receipt.jpg

  # Treat the file as cross-origin and allow that origin
  docscan --origin https://cdn.example.com --allow-origin https://cdn.example.com scan.png

HEIC/HEIF:
  Not supported by the CLI. Convert to JPEG or PNG first; library users can
  plug in a decoder through `HeicNormalizer`.

ALGORITHM:
  L = 0.299·R + 0.587·G + 0.114·B
  L > 150 → white (255), otherwise black (0). Alpha is kept.

ENVIRONMENT VARIABLES:
  RUST_LOG                Override log filter (e.g. edgequake_docscan=debug)
  DOCSCAN_OUTPUT          Same as --output
  DOCSCAN_FORMAT          Same as --format
"#;

/// Turn document photos into black-and-white scans.
#[derive(Parser, Debug)]
#[command(
    name = "docscan",
    version,
    about = "Turn document photos into black-and-white scans",
    long_about = "Convert an image (PNG, JPEG, GIF, WebP, BMP) into a binarized \
\"scanned document\": grayscale by perceptual luminosity, then a fixed threshold \
to pure black and white. HEIC/HEIF input is not supported by the CLI.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image file.
    input: PathBuf,

    /// Write the scan here instead of `scanned_<name>.png` next to the input.
    #[arg(short, long, env = "DOCSCAN_OUTPUT")]
    output: Option<PathBuf>,

    /// Output encoding.
    #[arg(long, env = "DOCSCAN_FORMAT", value_enum, default_value = "png")]
    format: FormatArg,

    /// JPEG quality in (0, 1]. Ignored for PNG.
    #[arg(long, env = "DOCSCAN_QUALITY")]
    quality: Option<f32>,

    /// Name JPEG output `.jpg` instead of `.png`.
    #[arg(long, env = "DOCSCAN_MATCH_EXTENSION")]
    match_extension: bool,

    /// Declare the input as loaded from this origin.
    #[arg(long)]
    origin: Option<String>,

    /// Origins whose pixels may be read (repeatable; `*` allows all).
    #[arg(long = "allow-origin", env = "DOCSCAN_ALLOW_ORIGIN", value_delimiter = ',')]
    allow_origins: Vec<String>,

    /// Reject inputs larger than this many bytes.
    #[arg(long, env = "DOCSCAN_MAX_INPUT_BYTES", default_value_t = edgequake_docscan::config::DEFAULT_MAX_INPUT_BYTES)]
    max_input_bytes: u64,

    /// Print the `data:` reference to stdout.
    #[arg(long, conflicts_with = "json")]
    print_url: bool,

    /// Do not write the output file.
    #[arg(long)]
    no_write: bool,

    /// Output a JSON summary (file, stats, url) instead of plain text.
    /// The summary already contains the data reference.
    #[arg(long, env = "DOCSCAN_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "DOCSCAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCSCAN_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpeg,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers progress; INFO logs would fight with it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Read input ───────────────────────────────────────────────────────
    let mut file = ImageFile::from_path(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    if let Some(ref origin) = cli.origin {
        file = file.with_origin(origin.clone());
    }
    ensure_decodable(&file)?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ScanProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run scan ─────────────────────────────────────────────────────────
    let result = scan_document(file, &config)
        .await
        .context("Scan failed")?;

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input, result.file.name()));

    if !cli.no_write {
        write_output(&result.file, &output_path)
            .await
            .context("Failed to write scanned image")?;
    }

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
        return Ok(());
    }

    if cli.print_url {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(result.url.as_str().as_bytes())
            .context("Failed to write to stdout")?;
        handle.write_all(b"\n").ok();
    }

    if !cli.quiet {
        let s = &result.stats;
        let dest = if cli.no_write {
            dim("(not written)")
        } else {
            bold(&output_path.display().to_string())
        };
        eprintln!(
            "{}  {}×{} px  {:.1}% ink  {} bytes  {}ms  →  {}",
            green("✔"),
            s.width,
            s.height,
            s.ink_ratio() * 100.0,
            s.output_bytes,
            s.total_ms,
            dest,
        );
    }

    Ok(())
}

/// Map CLI args to `ScanConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ScanConfig> {
    let output = match cli.format {
        FormatArg::Png => OutputType::Png,
        FormatArg::Jpeg => OutputType::Jpeg {
            quality: cli.quality,
        },
    };

    let policy = cli
        .allow_origins
        .iter()
        .fold(OriginPolicy::same_origin(), |p, o| p.allow(o.as_str()));

    let mut builder = ScanConfig::builder()
        .output(output)
        .origin_policy(policy)
        .match_extension(cli.match_extension)
        .max_input_bytes(cli.max_input_bytes);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `<input dir>/<output name>`.
fn default_output_path(input: &Path, output_name: &str) -> PathBuf {
    input
        .parent()
        .map(|dir| dir.join(output_name))
        .unwrap_or_else(|| PathBuf::from(output_name))
}

/// The CLI has no HEIC frame decoder, so fail early with a clear message.
fn ensure_decodable(file: &ImageFile) -> Result<()> {
    if is_heic_file(file) {
        bail!(
            "'{}' is HEIC/HEIF, which docscan cannot decode.\n\
Convert it to JPEG or PNG first (e.g. `heif-convert {} out.jpg`).",
            file.name(),
            file.name()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_and_print_url_conflict() {
        let err = Cli::try_parse_from(["docscan", "--json", "--print-url", "a.png"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        assert!(Cli::try_parse_from(["docscan", "--print-url", "a.png"]).is_ok());
    }

    #[test]
    fn heic_input_is_rejected_up_front() {
        let heic = ImageFile::new("IMG_1.HEIC", "image/heic", b"....".to_vec());
        let msg = ensure_decodable(&heic).unwrap_err().to_string();
        assert!(msg.contains("IMG_1.HEIC"), "got: {msg}");
        assert!(msg.contains("JPEG or PNG"), "got: {msg}");

        let png = ImageFile::new("a.png", "image/png", b"....".to_vec());
        assert!(ensure_decodable(&png).is_ok());
    }

    #[test]
    fn completion_only_clears_the_spinner() {
        let cb = CliProgressCallback {
            bar: ProgressBar::hidden(),
        };
        cb.on_scan_complete("scanned_a.png");
        assert!(cb.bar.is_finished());
    }

    #[test]
    fn allow_origin_flags_build_the_policy() {
        let cli = Cli::try_parse_from([
            "docscan",
            "--allow-origin",
            "https://a.test,https://b.test",
            "a.png",
        ])
        .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert!(config.origin_policy.permits(Some("https://b.test")));
        assert!(!config.origin_policy.permits(Some("https://c.test")));
    }
}
