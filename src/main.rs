use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

mod commands;

/// GPM - Game tech package manager for Unreal Engine and Unity projects
#[derive(Parser)]
#[command(name = "gpm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan installed packages in a project
    Scan {
        /// Project root (defaults to current directory)
        path: Option<String>,

        /// Print the package list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Install a package to the project
    Install {
        /// Package name (e.g., @ue-plugins/inventory@1.2.0 or com.unity.textmeshpro)
        package: String,

        /// Version to install (defaults to the one in the package string, or "latest")
        version: Option<String>,

        /// Path to project root (defaults to current directory)
        #[arg(short, long)]
        path: Option<String>,

        /// Show what would be installed without actually installing
        #[arg(long)]
        dry_run: bool,
    },

    /// Copy installed Unreal plugins from node_modules into Plugins/
    Sync {
        /// Path to project root (defaults to current directory)
        #[arg(short, long)]
        path: Option<String>,

        /// Remove each plugin folder before copying it
        #[arg(long)]
        clean: bool,

        /// npm scope to sync (defaults to sync.scope from the configuration)
        #[arg(long)]
        scope: Option<String>,

        /// Print the sync report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Publish a plugin or package folder to the configured registry
    Publish {
        /// Path to plugin/package directory (defaults to current directory)
        path: Option<String>,

        /// Target engine (unreal or unity); detected from the folder if omitted
        #[arg(short, long)]
        engine: Option<String>,

        /// Override the package name
        #[arg(long)]
        name: Option<String>,

        /// Override the package version
        #[arg(long = "package-version")]
        package_version: Option<String>,

        /// Override the package description
        #[arg(long)]
        description: Option<String>,

        /// Show what would be published without actually publishing
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., unreal.snapshot)
        key: String,
        /// Configuration value (empty string clears a registry URL)
        value: String,
    },

    /// Print the configuration file path
    Path,
}

fn main() {
    let cli = Cli::parse();
    gpm::logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Scan { path, json } => commands::scan::run(path, json),
        Commands::Install {
            package,
            version,
            path,
            dry_run,
        } => commands::install::run(package, version, path, dry_run),
        Commands::Sync {
            path,
            clean,
            scope,
            json,
        } => commands::sync::run(path, clean, scope, json),
        Commands::Publish {
            path,
            engine,
            name,
            package_version,
            description,
            dry_run,
        } => commands::publish::run(path, engine, name, package_version, description, dry_run),
        Commands::Config { action } => commands::config::run(&action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "gpm", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
