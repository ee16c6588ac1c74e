//! Command-line entry point
//!
//! ```bash
//! courier                      # publish once
//! courier --watch              # publish, then re-copy on change
//! courier --no-build --watch   # watch only
//! courier --dry-run            # show what would be copied
//! courier --check              # compare the output with the sources
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use courier_common::LogFormat;
use courier_config::{Bundle, Manifest, Overrides, Settings};
use tracing::{info, warn};

use crate::publish::{plan, publish};
use crate::status::PublishStatus;
use crate::watch::watch;

#[derive(Debug, Parser)]
#[command(
    name = "courier",
    version,
    about = "Copy static assets into the build directory and keep them in sync"
)]
pub struct Cli {
    /// Skip the initial copy pass
    #[arg(long)]
    pub no_build: bool,

    /// Re-copy files when their sources change
    #[arg(long)]
    pub watch: bool,

    /// Manifest file (defaults to ./courier.toml, or the built-in manifest
    /// when that does not exist)
    #[arg(long, env = "COURIER_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Output directory, overriding the manifest
    #[arg(long, env = "COURIER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Watch cooldown in milliseconds, overriding the manifest
    #[arg(long, env = "COURIER_COOLDOWN_MS")]
    pub cooldown_ms: Option<u64>,

    /// Print the copies a publish pass would perform and exit
    #[arg(long, conflicts_with_all = ["watch", "check"])]
    pub dry_run: bool,

    /// Report which outputs are missing or stale and exit
    #[arg(long, conflicts_with = "watch")]
    pub check: bool,

    /// Log output format (pretty or json)
    #[arg(long, env = "COURIER_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            output: self.output.clone(),
            cooldown_ms: self.cooldown_ms,
        }
    }
}

/// Load and validate the manifest, returning resolved bundles and settings
pub fn load(cli: &Cli) -> Result<(Vec<Bundle>, Settings)> {
    let manifest = Manifest::load(cli.manifest.as_deref()).context("Failed to load manifest")?;

    let validation = manifest.validate();
    for warning in &validation.warnings {
        warn!(category = %warning.category, "{}", warning.message);
    }
    if !validation.is_valid() {
        bail!("Invalid manifest:\n{}", validation.error_summary());
    }

    let settings = Settings::resolve(&manifest, &cli.overrides());
    if let Err(e) = settings.validate() {
        bail!("Invalid settings: {}", e);
    }

    let bundles = manifest.resolve().context("Failed to resolve manifest")?;
    info!(
        bundles = bundles.len(),
        files = bundles.iter().map(|b| b.entries.len()).sum::<usize>(),
        output = %settings.output.display(),
        "Manifest loaded"
    );

    Ok((bundles, settings))
}

/// Run the command
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let (bundles, settings) = load(&cli)?;

    if cli.dry_run {
        for copy in plan(&bundles, &settings.output) {
            println!(
                "[{}] {} -> {}",
                copy.bundle,
                copy.source.display(),
                copy.destination.display()
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    if cli.check {
        let status = PublishStatus::check(&bundles, &settings.output);
        print!("{}", status.display());
        return Ok(if status.is_complete() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    if !cli.no_build {
        let report = publish(&bundles, &settings.output);
        println!("{}", report.display());
        if !report.is_success() {
            return Ok(ExitCode::FAILURE);
        }
    }

    if cli.watch {
        let handle = watch(
            &bundles,
            &settings.output,
            settings.cooldown,
            |target, outcome| match outcome {
                Ok(_) => println!("{} updated.", target.source.display()),
                Err(e) => eprintln!(
                    "✗ [{}] {} not updated: {}",
                    target.bundle,
                    target.source.display(),
                    e
                ),
            },
        )
        .context("Failed to start watching")?;

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        info!("Stopping watch");
        handle.stop().await;
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn exited_with(code: ExitCode, expected: ExitCode) -> bool {
        format!("{:?}", code) == format!("{:?}", expected)
    }

    /// A manifest with one bundle over `assets/js` holding `files`
    fn project(files: &[&str]) -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("assets/js");
        fs::create_dir_all(&assets).unwrap();
        fs::write(assets.join("ui.js"), "ui").unwrap();

        let entries: Vec<String> = files
            .iter()
            .map(|name| format!("{{ src = {:?}, dst = \"js/{}\" }}", name, name))
            .collect();
        let manifest = dir.path().join("courier.toml");
        fs::write(
            &manifest,
            format!(
                "[[bundles]]\nname = \"js\"\nbase = {:?}\nfiles = [{}]\n",
                assets.display().to_string(),
                entries.join(", ")
            ),
        )
        .unwrap();

        let output = dir.path().join("build");
        (dir, manifest, output)
    }

    fn cli(manifest: &Path, output: &Path, flags: &[&str]) -> Cli {
        let mut args = vec![
            "courier".to_string(),
            "--manifest".to_string(),
            manifest.display().to_string(),
            "--output".to_string(),
            output.display().to_string(),
        ];
        args.extend(flags.iter().map(|flag| flag.to_string()));
        Cli::try_parse_from(args).unwrap()
    }

    #[tokio::test]
    async fn test_run_publishes() {
        let (_dir, manifest, output) = project(&["ui.js"]);
        let code = run(cli(&manifest, &output, &[])).await.unwrap();

        assert!(exited_with(code, ExitCode::SUCCESS));
        assert_eq!(fs::read_to_string(output.join("js/ui.js")).unwrap(), "ui");
    }

    #[tokio::test]
    async fn test_run_no_build_writes_nothing() {
        let (_dir, manifest, output) = project(&["ui.js"]);
        let code = run(cli(&manifest, &output, &["--no-build"])).await.unwrap();

        assert!(exited_with(code, ExitCode::SUCCESS));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_run_dry_run_writes_nothing() {
        let (_dir, manifest, output) = project(&["ui.js"]);
        let code = run(cli(&manifest, &output, &["--dry-run"])).await.unwrap();

        assert!(exited_with(code, ExitCode::SUCCESS));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_run_missing_source_fails() {
        let (_dir, manifest, output) = project(&["ui.js", "missing.js"]);
        let code = run(cli(&manifest, &output, &[])).await.unwrap();

        assert!(exited_with(code, ExitCode::FAILURE));
        // Entries that could be copied still are
        assert_eq!(fs::read_to_string(output.join("js/ui.js")).unwrap(), "ui");
    }

    #[tokio::test]
    async fn test_run_failed_pass_does_not_start_watching() {
        let (_dir, manifest, output) = project(&["missing.js"]);
        let pending = run(cli(&manifest, &output, &["--watch"]));

        let code = tokio::time::timeout(Duration::from_secs(10), pending)
            .await
            .expect("a failed initial pass should not wait for Ctrl-C")
            .unwrap();
        assert!(exited_with(code, ExitCode::FAILURE));
    }

    #[tokio::test]
    async fn test_run_check_reflects_output() {
        let (_dir, manifest, output) = project(&["ui.js"]);

        let code = run(cli(&manifest, &output, &["--check"])).await.unwrap();
        assert!(exited_with(code, ExitCode::FAILURE));

        run(cli(&manifest, &output, &[])).await.unwrap();
        let code = run(cli(&manifest, &output, &["--check"])).await.unwrap();
        assert!(exited_with(code, ExitCode::SUCCESS));
    }

    #[tokio::test]
    async fn test_run_invalid_manifest_is_an_error() {
        let (dir, _, output) = project(&[]);
        let manifest = dir.path().join("broken.toml");
        fs::write(&manifest, "[[bundles]]\nname = \"\"\nbase = \"assets\"\n").unwrap();

        let err = run(cli(&manifest, &output, &[])).await.unwrap_err();
        assert!(err.to_string().contains("Invalid manifest"));
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from(["courier", "--no-build", "--watch"]).unwrap();
        assert!(cli.no_build);
        assert!(cli.watch);
        assert!(!cli.dry_run);
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from([
            "courier",
            "--manifest",
            "site.toml",
            "--output",
            "dist",
            "--cooldown-ms",
            "250",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.manifest, Some(PathBuf::from("site.toml")));
        assert_eq!(cli.log_format, LogFormat::Json);
        let overrides = cli.overrides();
        assert_eq!(overrides.output, Some(PathBuf::from("dist")));
        assert_eq!(overrides.cooldown_ms, Some(250));
    }

    #[test]
    fn test_dry_run_conflicts_with_watch() {
        assert!(Cli::try_parse_from(["courier", "--dry-run", "--watch"]).is_err());
        assert!(Cli::try_parse_from(["courier", "--check", "--watch"]).is_err());
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["courier", "--minify"]).is_err());
    }

    #[test]
    fn test_invalid_log_format_rejected() {
        assert!(Cli::try_parse_from(["courier", "--log-format", "xml"]).is_err());
    }
}
