mod applier;
mod config;
mod registry;
mod runner;

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use config::{Config, Overrides};
use runner::ApplyOptions;

#[derive(Parser, Debug)]
#[command(
    name = "espidf-patchsmith",
    version,
    about = "Applies the pinned ESP-IDF patch set atop a vendored framework tree"
)]
struct Cli {
    /// Project root (directory containing patches/ and patchsmith.toml)
    #[arg(long, global = true, default_value = ".")]
    project_dir: Utf8PathBuf,

    /// Config file to read instead of <project-dir>/patchsmith.toml
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Vendored framework checkout the patches land in
    #[arg(long, global = true)]
    framework_dir: Option<Utf8PathBuf>,

    /// Directory holding the patch files (defaults to <project-dir>/patches)
    #[arg(long, global = true)]
    patches_dir: Option<Utf8PathBuf>,

    /// Host OS identifier as reported by the build system (win32, linux, darwin, ...)
    #[arg(long, global = true)]
    host_os: Option<String>,

    /// Explicit patch command, bypassing platform resolution
    #[arg(long, global = true)]
    patch_tool: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply every registered patch that has no marker yet, in order
    Apply(ApplyArgs),
    /// Check tool resolution, directories, and marker state
    Doctor,
    /// Inspect the built-in patch registry
    #[command(subcommand)]
    Registry(RegistryCmd),
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Report what would be applied without invoking the patch tool
    #[arg(long)]
    dry_run: bool,
    /// Emit a machine-readable JSON summary
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum RegistryCmd {
    /// List registered patches in application order
    List,
    /// Show details for one registered patch
    Explain {
        /// Logical patch name (e.g. ds_mbedtls)
        name: String,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let overrides = Overrides {
        config_file: cli.config,
        framework_dir: cli.framework_dir,
        patches_dir: cli.patches_dir,
        host_os: cli.host_os,
        patch_tool: cli.patch_tool,
    };

    match cli.command {
        Command::Apply(args) => {
            let cfg = Config::resolve(&cli.project_dir, overrides)?;
            runner::run_apply(
                &cfg,
                ApplyOptions {
                    dry_run: args.dry_run,
                    emit_json: args.json,
                },
            )
        }
        Command::Doctor => {
            let cfg = Config::resolve(&cli.project_dir, overrides)?;
            runner::run_doctor(&cfg)
        }
        Command::Registry(RegistryCmd::List) => runner::run_list_patches(),
        Command::Registry(RegistryCmd::Explain { name }) => runner::run_explain_patch(&name),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
