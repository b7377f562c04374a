//! Bazel driver - run Bazel on behalf of an IDE.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bazel_driver::bazel::{BazelCommand, BazelInstance};
use bazel_driver::command::StdioConsoleFactory;
use bazel_driver::config::ConfigLoader;

#[derive(Parser)]
#[command(name = "bazel-driver", about = "Run Bazel on behalf of an IDE", version)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the Bazel binary. Overrides the configuration file.
    #[arg(long, global = true)]
    bazel: Option<PathBuf>,

    /// Configuration file to use instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the configured Bazel binary is usable.
    CheckVersion,
    /// Print the workspace and execution roots enclosing a directory.
    Workspace {
        /// Directory inside the workspace.
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Build targets.
    Build {
        /// Directory inside the workspace.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Extra argument passed to Bazel before the targets (repeatable).
        #[arg(long = "arg", allow_hyphen_values = true)]
        extra_args: Vec<String>,
        /// Targets to build.
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Test targets.
    Test {
        /// Directory inside the workspace.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Extra argument passed to Bazel before the targets (repeatable).
        #[arg(long = "arg", allow_hyphen_values = true)]
        extra_args: Vec<String>,
        /// Targets to test.
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Complete a target pattern.
    Complete {
        /// Directory inside the workspace.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Pattern prefix to complete.
        #[arg(default_value = "")]
        prefix: String,
    },
    /// Print the IDE build metadata of targets as JSON.
    Info {
        /// Directory inside the workspace.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Targets to analyze.
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// List the targets below directories.
    Targets {
        /// Directory inside the workspace.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Directories to list.
        #[arg(required = true)]
        dirs: Vec<PathBuf>,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let loader = cli.config.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let config = loader.load()?;

    let bazel = BazelCommand::new(
        config.aspect.location(),
        Some(Arc::new(StdioConsoleFactory)),
    );
    if let Some(path) = cli.bazel.or(config.bazel_path) {
        bazel.set_bazel_path(path);
    }

    match cli.command {
        Commands::CheckVersion => {
            let Some(path) = bazel.bazel_path() else {
                return Err("No Bazel binary configured".into());
            };
            let version = bazel.check_version(&path).await?;
            println!("{}", version.label());
            Ok(0)
        }
        Commands::Workspace { dir } => {
            let instance = open(&bazel, &dir).await?;
            println!("{}", instance.workspace_root().display());
            println!("{}", instance.execution_root().display());
            Ok(0)
        }
        Commands::Build {
            dir,
            extra_args,
            targets,
        } => {
            let instance = open(&bazel, &dir).await?;
            Ok(instance.build(&targets, &extra_args).await?)
        }
        Commands::Test {
            dir,
            extra_args,
            targets,
        } => {
            let instance = open(&bazel, &dir).await?;
            Ok(instance.test(&targets, &extra_args).await?)
        }
        Commands::Complete { dir, prefix } => {
            let instance = open(&bazel, &dir).await?;
            for completion in instance.complete(&prefix).await? {
                println!("{completion}");
            }
            Ok(0)
        }
        Commands::Info { dir, targets } => {
            let instance = open(&bazel, &dir).await?;
            let infos = instance.get_build_info(&targets).await?;
            println!("{}", serde_json::to_string_pretty(&*infos)?);
            Ok(0)
        }
        Commands::Targets { dir, dirs } => {
            let instance = open(&bazel, &dir).await?;
            let dirs: Vec<PathBuf> = dirs
                .iter()
                .map(|d| std::path::absolute(d).unwrap_or_else(|_| d.clone()))
                .collect();
            for target in instance.list_targets(&dirs).await? {
                println!("{target}");
            }
            Ok(0)
        }
    }
}

async fn open(
    bazel: &BazelCommand,
    dir: &Path,
) -> Result<Arc<BazelInstance>, Box<dyn std::error::Error>> {
    let dir = std::path::absolute(dir)?;
    bazel
        .get_instance(&dir)
        .await?
        .ok_or_else(|| format!("{} is not inside a Bazel workspace", dir.display()).into())
}
