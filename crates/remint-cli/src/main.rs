//! remint: write hash-distinct, visually identical copies of an image.
//!
//! Reads one image file, runs the remint pipeline on it, and writes each
//! accepted version next to the input (or into `--output`) as
//! `<stem>_vNN<ext>`. Progress goes to stderr; the final listing (or the
//! JSON report with `--json`) goes to stdout. Listing lines follow the
//! `md5sum` layout, so `md5sum -c` can check them.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin remint -- [OPTIONS] <INPUT>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use remint_pipeline::{GenerationConfig, GenerationEvent, GenerationReport, Generator};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Most versions one invocation may request.
const MAX_VERSIONS: u64 = 100;

/// Extension used when the input file has none.
const FALLBACK_EXTENSION: &str = ".jpg";

/// Generate visually identical image variants with distinct content hashes.
///
/// Every written file decodes to the same dimensions as the input and
/// looks the same, but its bytes hash differently from the input and
/// from every other output.
#[derive(Parser)]
#[command(name = "remint", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, GIF, WebP).
    input: PathBuf,

    /// Directory to write the variants into. Defaults to the input's
    /// directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of versions to generate.
    #[arg(short, long, default_value_t = 3, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..=MAX_VERSIONS))]
    num: usize,

    /// Run seed, for reproducible output.
    #[arg(long)]
    seed: Option<u64>,

    /// Attempts per version before giving up on a unique hash.
    #[arg(long, default_value_t = GenerationConfig::DEFAULT_MAX_ATTEMPTS, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    max_attempts: u32,

    /// Skip versions whose uniqueness cannot be verified instead of
    /// writing them flagged as degraded.
    #[arg(long)]
    strict: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Full generation config as a JSON string.
    ///
    /// When provided, `--seed`, `--max-attempts` and `--strict` are
    /// ignored. Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Report printed by `--json`: the pipeline report plus where each
/// accepted version was written.
#[derive(Serialize)]
struct CliReport<'a> {
    #[serde(flatten)]
    report: &'a GenerationReport,
    outputs: Vec<PathBuf>,
}

/// Build a [`GenerationConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual config flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<GenerationConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(GenerationConfig {
        max_attempts: cli.max_attempts,
        seed: cli.seed,
        accept_degraded: !cli.strict,
        ..GenerationConfig::default()
    })
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The output extension, dot included, taken from the input's name.
fn output_extension(input: &Path) -> String {
    input
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map_or_else(|| FALLBACK_EXTENSION.to_string(), |e| format!(".{e}"))
}

/// File name of version `index`: `<stem>_vNN<ext>`.
fn output_name(stem: &str, index: usize, extension: &str) -> String {
    format!("{stem}_v{index:02}{extension}")
}

/// One stdout line per written file: `<md5>  <path>`.
fn listing_line(md5: &str, path: &Path) -> String {
    format!("{md5}  {}", path.display())
}

fn print_event(event: &GenerationEvent) {
    match event {
        GenerationEvent::VersionAccepted {
            index,
            hash,
            size,
            attempts,
        } => eprintln!("v{index:02}: {hash} ({size} bytes, {attempts} attempt(s))"),
        GenerationEvent::VersionDegraded {
            index,
            hash,
            attempts,
            ..
        } => eprintln!("v{index:02}: {hash} DEGRADED, no unique hash after {attempts} attempts"),
        GenerationEvent::VersionFailed { index, reason, .. } => {
            eprintln!("v{index:02}: skipped: {reason}");
        }
        GenerationEvent::AttemptCollided { .. } | GenerationEvent::AttemptFailed { .. } => {}
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?config, "resolved configuration");

    let image_bytes = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    let extension = output_extension(&cli.input);
    let stem = cli
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let out_dir = cli.output.clone().unwrap_or_else(|| {
        cli.input
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    });

    eprintln!(
        "Input: {} ({} bytes), generating {} version(s)",
        cli.input.display(),
        image_bytes.len(),
        cli.num,
    );

    let report = match Generator::new(config).run_with_observer(
        &image_bytes,
        &extension,
        cli.num,
        &mut print_event,
    ) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        eprintln!("Error creating {}: {e}", out_dir.display());
        return ExitCode::FAILURE;
    }

    let mut outputs = Vec::with_capacity(report.versions.len());
    let mut listing = Vec::with_capacity(report.versions.len());
    for version in &report.versions {
        let path = out_dir.join(output_name(stem, version.index, &extension));
        match std::fs::write(&path, &version.bytes) {
            Ok(()) => {
                listing.push(listing_line(&version.md5, &path));
                outputs.push(path);
            }
            Err(e) => eprintln!("Error writing {}: {e}", path.display()),
        }
    }

    if cli.json {
        let cli_report = CliReport {
            report: &report,
            outputs,
        };
        match serde_json::to_string_pretty(&cli_report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                return ExitCode::FAILURE;
            }
        }
        return exit_code(cli_report.outputs.len());
    }

    for line in &listing {
        println!("{line}");
    }
    eprintln!(
        "{} of {} written ({} verified, {} degraded, {} skipped), seed {}, source md5 {}",
        outputs.len(),
        report.requested,
        report.verified_count(),
        report.degraded_count(),
        report.failures.len(),
        report.seed,
        report.source_md5,
    );
    exit_code(outputs.len())
}

/// Success when at least one version reached disk.
fn exit_code(written: usize) -> ExitCode {
    if written > 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("remint").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn output_names_are_zero_padded() {
        assert_eq!(output_name("photo", 1, ".jpg"), "photo_v01.jpg");
        assert_eq!(output_name("photo", 12, ".png"), "photo_v12.png");
        assert_eq!(output_name("photo", 100, ".png"), "photo_v100.png");
    }

    #[test]
    fn listing_matches_md5sum_layout() {
        assert_eq!(
            listing_line("d41d8cd98f00b204e9800998ecf8427e", Path::new("out/a_v01.png")),
            "d41d8cd98f00b204e9800998ecf8427e  out/a_v01.png"
        );
    }

    #[test]
    fn extension_falls_back_to_jpg() {
        assert_eq!(output_extension(Path::new("a/b.PNG")), ".PNG");
        assert_eq!(output_extension(Path::new("noext")), ".jpg");
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = parse(&["in.png", "--seed", "5", "--max-attempts", "3", "--strict"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.max_attempts, 3);
        assert!(!config.accept_degraded);
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&["in.png", "--seed", "5", "--config-json", r#"{"seed": 9}"#]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.seed, Some(9));
        assert!(config.accept_degraded);
    }

    #[test]
    fn bad_config_json_is_reported() {
        let cli = parse(&["in.png", "--config-json", "{"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("--config-json"));
    }

    #[test]
    fn num_is_bounded() {
        let args = |n: &str| ["remint", "in.png", "-n", n].map(str::to_string);
        assert!(Cli::try_parse_from(args("0")).is_err());
        assert!(Cli::try_parse_from(args("101")).is_err());
        assert_eq!(Cli::try_parse_from(args("100")).unwrap().num, 100);
    }
}
