use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use matter_ctl::{
    artifacts_enabled, build_report, discover_anchors, doctor_failures, find_repo_root,
    gc_artifacts, latest_run_dir, pillars, registry_verify, resolve_seed, run_matter_test,
    run_summary_lines, snapshot_run_dirs, GcPolicy, Pillar,
};

const EXIT_VERIFY_FAILED: i32 = 2;

#[derive(Parser)]
#[command(
    name = "tessarisctl",
    version,
    about = "Programmable-matter control benchmark CLI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered anchors (pillar:TESTID).
    List,
    /// Repo, version, git and per-pillar layout summary.
    Status,
    /// Repository health checks.
    Doctor {
        #[arg(long)]
        quick: bool,
    },
    /// Markdown report (summary or per-anchor).
    Report {
        /// Optional pillar or pillar:TESTID filter.
        target: Option<String>,
        /// Emit markdown (the default; kept for symmetry).
        #[arg(long)]
        md: bool,
        /// Output path (default: stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Execute a benchmark anchor (pillar or pillar:TESTID).
    Run {
        target: String,
        #[arg(long)]
        seed: Option<u64>,
        /// Remove any run directories the execution creates.
        #[arg(long)]
        no_artifacts: bool,
    },
    /// Artifact utilities.
    Artifacts {
        #[command(subcommand)]
        command: ArtifactsCommand,
    },
    /// Registry utilities.
    Registry {
        #[command(subcommand)]
        command: RegistryCommand,
    },
}

#[derive(Subcommand)]
enum ArtifactsCommand {
    /// Open the latest artifact folder for an anchor.
    Open { target: String },
    /// Garbage-collect old run directories (dry-run unless --apply).
    Gc {
        #[arg(long)]
        pillar: Option<String>,
        /// Only delete run directories older than this many days.
        #[arg(long, default_value_t = 14)]
        days: u64,
        #[arg(long)]
        apply: bool,
        /// Keep this many newest runs per anchor.
        #[arg(long, default_value_t = 2)]
        keep_latest: usize,
        /// Do not protect runs pinned in AUDIT_REGISTRY.md.
        #[arg(long)]
        no_keep_pinned: bool,
    },
}

#[derive(Subcommand)]
enum RegistryCommand {
    /// Verify pinned hashes exist on disk and are cited in prose.
    Verify,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run_command(Cli::parse().command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            println!("FAIL {:#}", err);
            std::process::exit(1);
        }
    }
}

fn run_command(command: Commands) -> Result<i32> {
    let repo = find_repo_root();
    match command {
        Commands::List => {
            for (pillar, test_id) in discover_anchors(&repo) {
                println!("{}:{}", pillar, test_id);
            }
            Ok(0)
        }
        Commands::Status => {
            println!("repo: {}", repo.display());
            println!("tessarisctl: {}", env!("CARGO_PKG_VERSION"));
            println!(
                "git: {} ({})",
                matter_ctl::report::git_branch(&repo),
                if matter_ctl::report::git_is_dirty(&repo) {
                    "dirty"
                } else {
                    "clean"
                }
            );
            for status in matter_ctl::pillar_status(&repo) {
                println!(
                    "{}: src={} tests={} audit={} artifacts={}",
                    status.key,
                    status.has_src,
                    status.has_tests,
                    status.has_audit,
                    status.has_artifacts
                );
            }
            Ok(0)
        }
        Commands::Doctor { quick } => {
            let failures = doctor_failures(&repo, quick);
            for line in &failures {
                println!("{}", line);
            }
            if failures.is_empty() {
                println!("OK doctor");
                Ok(0)
            } else {
                Ok(EXIT_VERIFY_FAILED)
            }
        }
        Commands::Report { target, md: _, out } => {
            let text = build_report(&repo, target.as_deref())?;
            match out {
                Some(path) => {
                    std::fs::write(&path, format!("{}\n", text))?;
                    println!("{}", path.display());
                }
                None => println!("{}", text),
            }
            Ok(0)
        }
        Commands::Run {
            target,
            seed,
            no_artifacts,
        } => cmd_run(&repo, &target, seed, no_artifacts),
        Commands::Artifacts { command } => match command {
            ArtifactsCommand::Open { target } => cmd_artifacts_open(&repo, &target),
            ArtifactsCommand::Gc {
                pillar,
                days,
                apply,
                keep_latest,
                no_keep_pinned,
            } => {
                let policy = GcPolicy {
                    keep_latest,
                    keep_pinned: !no_keep_pinned,
                    days,
                    apply,
                };
                let report = gc_artifacts(&repo, pillar.as_deref(), &policy)?;
                if apply {
                    for dir in &report.deleted {
                        println!("deleted: {}", dir.display());
                    }
                } else {
                    for dir in &report.candidates {
                        println!("candidate: {}", dir.display());
                    }
                }
                println!(
                    "OK gc: {} kept, {} candidate(s), {} deleted",
                    report.kept,
                    report.candidates.len(),
                    report.deleted.len()
                );
                Ok(0)
            }
        },
        Commands::Registry { command } => match command {
            RegistryCommand::Verify => {
                let failures = registry_verify(&repo);
                for line in &failures {
                    println!("{}", line);
                }
                if failures.is_empty() {
                    println!("OK registry verify");
                    Ok(0)
                } else {
                    Ok(EXIT_VERIFY_FAILED)
                }
            }
        },
    }
}

fn resolve_anchor_target<'a>(
    repo: &Path,
    target: &'a str,
) -> Result<(Pillar, Option<&'a str>)> {
    let (pillar_key, test_id) = match target.split_once(':') {
        Some((pillar, test)) => (pillar.trim().to_lowercase(), Some(test.trim())),
        None => (target.trim().to_lowercase(), None),
    };
    let pillar = pillars(repo)
        .remove(&pillar_key)
        .ok_or_else(|| anyhow!("unknown pillar: {}", pillar_key))?;
    Ok((pillar, test_id.filter(|t| !t.is_empty())))
}

fn cmd_run(repo: &Path, target: &str, seed: Option<u64>, no_artifacts: bool) -> Result<i32> {
    let (pillar, test_id) = resolve_anchor_target(repo, target)?;
    let seed = resolve_seed(seed);
    let write = artifacts_enabled(no_artifacts);

    let tests: Vec<&str> = match test_id {
        Some(test) => vec![test],
        None => matter_ctl::harness::known_tests(&pillar).to_vec(),
    };
    if tests.is_empty() {
        return Err(anyhow!("no benchmark tests known for pillar: {}", pillar.name));
    }

    let before = if no_artifacts {
        snapshot_run_dirs(&pillar)
    } else {
        Default::default()
    };

    for test in &tests {
        let outcome = run_matter_test(&pillar, test, seed, write)?;
        for score in &outcome.scores {
            println!(
                "{} {} controller={} peak_retention={:.4}",
                outcome.test_id, score.run_hash, score.controller, score.peak_retention
            );
        }
        if !outcome.separation_ok {
            println!(
                "FAIL baseline separation violated: {} seed={}",
                outcome.test_id, seed
            );
            return Ok(1);
        }
        println!("OK {} seed={}", outcome.test_id, seed);
    }

    if no_artifacts {
        let after = snapshot_run_dirs(&pillar);
        let created: Vec<_> = after.difference(&before).cloned().collect();
        for dir in &created {
            let _ = std::fs::remove_dir_all(dir);
        }
        println!("no-artifacts: removed {} new run dir(s)", created.len());
        return Ok(0);
    }

    if let [single] = tests.as_slice() {
        if let Some(latest) = latest_run_dir(&pillar, single) {
            for line in run_summary_lines(&latest)? {
                println!("{}", line);
            }
            println!("latest artifacts: {}", latest.display());
        }
    }
    Ok(0)
}

fn cmd_artifacts_open(repo: &Path, target: &str) -> Result<i32> {
    let (pillar, test_id) = resolve_anchor_target(repo, target)?;
    let test_id = test_id.ok_or_else(|| anyhow!("use: pillar:TESTID (e.g. matter:MT01)"))?;
    let latest = latest_run_dir(&pillar, test_id)
        .ok_or_else(|| anyhow!("no run found for {}:{}", pillar.name, test_id))?;
    println!("{}", latest.display());
    open_path(&latest);
    Ok(0)
}

/// Hand the directory to the platform file explorer; printing the path above
/// is the portable fallback.
fn open_path(path: &Path) {
    let opener = match std::env::consts::OS {
        "macos" => "open",
        "windows" => "explorer",
        _ => "xdg-open",
    };
    let _ = Command::new(opener).arg(path).spawn();
}
