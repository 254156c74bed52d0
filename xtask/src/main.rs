use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for the relativity crates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests (serial and parallel) and the demo scenes
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates, with and without the parallel feature
    Clippy,
    /// Run all tests; `--parallel` enables rayon in the kernel
    Test {
        #[arg(long)]
        parallel: bool,
    },
    /// Run every scene under demos/ through relativity-cli
    Demos,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests(false)?;
            run_tests(true)?;
            run_demos()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test { parallel } => run_tests(parallel)?,
        Commands::Demos => run_demos()?,
    }

    Ok(())
}

fn cargo(label: &str, args: &[&str]) -> Result<()> {
    println!("==> cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{label} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo("cargo fmt check", &["fmt", "--all", "--", "--check"])
}

fn run_clippy() -> Result<()> {
    let deny = ["--", "-D", "warnings"];
    let mut serial = vec!["clippy", "--workspace", "--all-targets"];
    serial.extend(deny);
    cargo("cargo clippy", &serial)?;
    let mut parallel = vec![
        "clippy",
        "-p",
        "relativity-kernel",
        "--all-targets",
        "--features",
        "parallel",
    ];
    parallel.extend(deny);
    cargo("cargo clippy (parallel)", &parallel)
}

fn run_tests(parallel: bool) -> Result<()> {
    if parallel {
        cargo(
            "cargo test (parallel)",
            &["test", "-p", "relativity-kernel", "--features", "parallel"],
        )
    } else {
        cargo("cargo test", &["test", "--workspace"])
    }
}

fn demo_scenes() -> Result<Vec<PathBuf>> {
    let mut scenes = Vec::new();
    for entry in std::fs::read_dir("demos")? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml") {
            scenes.push(path);
        }
    }
    scenes.sort();
    Ok(scenes)
}

fn run_demos() -> Result<()> {
    let scenes = demo_scenes()?;
    if scenes.is_empty() {
        anyhow::bail!("no scenes found under demos/");
    }
    for scene in &scenes {
        let scene = scene.to_string_lossy();
        cargo(
            &format!("scene {scene}"),
            &["run", "-q", "-p", "relativity-cli", "--", "run", &scene],
        )?;
    }
    Ok(())
}
