use std::fmt::Display;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Lambda functions shipped from `workbook_sync_lambda`, one binary each.
const LAMBDA_BINARIES: [&str; 4] = [
    "stream_import_lambda",
    "csv_import_lambda",
    "import_job_lambda",
    "export_lambda",
];

#[derive(Parser)]
#[command(name = "xtask", about = "CI and Lambda packaging for the workbook sync workspace")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks
    Ci {
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build the Lambda binaries and zip each one as `bootstrap`
    LambdaPackage {
        /// Target triple the Lambda runtime executes
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build without `--release`
        #[arg(long)]
        debug: bool,
        /// Output directory for `<function>.zip`
        #[arg(long, env = "LAMBDA_DIST_DIR", default_value = "dist")]
        dist_dir: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// fmt, clippy and tests
    Check,
    /// Tests only
    Test,
}

fn cargo(args: &[&str]) -> Result<(), String> {
    eprintln!("+ cargo {}", args.join(" "));
    let status = Command::new("cargo")
        .args(args)
        .status()
        .map_err(|error| format!("could not start cargo: {error}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("cargo {} exited with {status}", args[0]))
    }
}

fn ci(job: CiJob) -> Result<(), String> {
    if matches!(job, CiJob::Check) {
        cargo(&["fmt", "--all", "--", "--check"])?;
        cargo(&["clippy", "--all-targets", "--all-features", "--", "-D", "warnings"])?;
    }
    for package in ["workbook_sync_core", "workbook_sync_lambda"] {
        cargo(&["test", "-p", package])?;
    }
    Ok(())
}

/// Fails early with the `rustup` command to run when `target` is missing.
/// A machine without rustup is left to cargo's own error.
fn check_target(target: &str) -> Result<(), String> {
    let Ok(output) = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    else {
        return Ok(());
    };
    let installed = String::from_utf8_lossy(&output.stdout);
    if installed.lines().any(|line| line.trim() == target) {
        Ok(())
    } else {
        Err(format!(
            "rust target {target} is not installed; run `rustup target add {target}`"
        ))
    }
}

fn io_error(path: &Path, error: impl Display) -> String {
    format!("{}: {error}", path.display())
}

fn zip_bootstrap(binary: &Path, archive: &Path) -> Result<(), String> {
    let bytes = fs::read(binary).map_err(|error| io_error(binary, error))?;
    let file = File::create(archive).map_err(|error| io_error(archive, error))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .map_err(|error| io_error(archive, error))?;
    zip.write_all(&bytes)
        .map_err(|error| io_error(archive, error))?;
    zip.finish().map_err(|error| io_error(archive, error))?;
    Ok(())
}

fn package_lambdas(target: &str, debug: bool, dist_dir: &Path) -> Result<(), String> {
    check_target(target)?;

    let mut args = vec!["build", "-p", "workbook_sync_lambda", "--target", target];
    for bin in LAMBDA_BINARIES {
        args.extend(["--bin", bin]);
    }
    if !debug {
        args.push("--release");
    }
    cargo(&args)?;

    let profile = if debug { "debug" } else { "release" };
    let build_dir = Path::new("target").join(target).join(profile);
    fs::create_dir_all(dist_dir).map_err(|error| io_error(dist_dir, error))?;
    for bin in LAMBDA_BINARIES {
        let archive = dist_dir.join(format!("{bin}.zip"));
        zip_bootstrap(&build_dir.join(bin), &archive)?;
        eprintln!("packaged {}", archive.display());
    }
    Ok(())
}

fn main() {
    let result = match Cli::parse().command {
        Commands::Ci { job } => ci(job),
        Commands::LambdaPackage {
            target,
            debug,
            dist_dir,
        } => package_lambdas(&target, debug, &dist_dir),
    };
    if let Err(message) = result {
        eprintln!("error: {message}");
        exit(1);
    }
}
