use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use vaultprof::{
    commands::{self, AddOptions, EditOptions},
    logging,
    paths::Paths,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "vaultprof")]
#[command(about = "Vault Profile Switcher - keep several sets of vault settings and swap between them")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// The vault configuration directory profiles are applied to
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        env = "VAULTPROF_LIVE_ROOT",
        default_value = ".obsidian"
    )]
    live_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all profiles
    List,

    /// Show the active profile and configured locations
    Current,

    /// Show a profile's toggles and stored files
    Inspect {
        /// Name of the profile to inspect
        name: String,
    },

    /// Create a profile from the live configuration
    Add {
        /// Name of the profile to create
        name: String,

        /// Inherit toggles from this profile instead of the active one
        #[arg(long, value_name = "PROFILE", conflicts_with = "toggles")]
        from: Option<String>,

        /// Toggles to enable (comma-separated, e.g. hotkeys,appearance)
        #[arg(long, value_delimiter = ',', conflicts_with = "select")]
        toggles: Option<Vec<String>>,

        /// Pick toggles interactively
        #[arg(long)]
        select: bool,

        /// Enable automatic newest-wins sync for the new profile
        #[arg(long)]
        auto_sync: bool,
    },

    /// Switch to a profile (copies its stored files over the live ones)
    Use {
        /// Name of the profile to activate
        name: String,
    },

    /// Change which settings a profile manages
    ///
    /// Without flags an interactive selection is shown.
    Edit {
        /// Name of the profile to edit
        name: String,

        /// Toggles to turn on (comma-separated)
        #[arg(long, value_delimiter = ',')]
        enable: Vec<String>,

        /// Toggles to turn off (comma-separated)
        #[arg(long, value_delimiter = ',')]
        disable: Vec<String>,

        /// Turn automatic sync on or off
        #[arg(long, value_name = "BOOL")]
        auto_sync: Option<bool>,
    },

    /// Remove a profile and its stored files
    Remove {
        /// Name of the profile to remove
        name: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Copy live settings into a profile (default: the active one)
    Save {
        name: Option<String>,
    },

    /// Copy a profile's stored settings over the live ones without activating it
    Load {
        name: Option<String>,
    },

    /// Reconcile the active profile with the live settings, newest file wins
    Sync,

    /// Move profile storage to another directory
    Relocate {
        /// New profiles directory
        path: PathBuf,
    },

    /// Rebuild the profile list from the profiles directory
    Rescan,

    /// Run diagnostics on the vaultprof setup
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let ui = Ui::new(cli.color, cli.no_color);

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "vaultprof", &mut std::io::stdout());
        return Ok(());
    }

    let paths = Paths::new(&cli.live_root)?;
    if let Commands::Doctor = cli.command {
        return commands::doctor(&paths, &ui);
    }

    let mut switcher = commands::open_switcher(&paths)?;

    match cli.command {
        Commands::List => commands::list(&switcher, &ui),
        Commands::Current => commands::current(&switcher, &ui),
        Commands::Inspect { name } => commands::inspect(&switcher, &name, &ui),
        Commands::Add {
            name,
            from,
            toggles,
            select,
            auto_sync,
        } => {
            let opts = AddOptions {
                from,
                toggles,
                select,
                auto_sync,
            };
            commands::add(&mut switcher, &name, opts, &ui)
        }
        Commands::Use { name } => commands::use_profile(&mut switcher, &name, &ui),
        Commands::Edit {
            name,
            enable,
            disable,
            auto_sync,
        } => {
            let opts = EditOptions {
                enable,
                disable,
                auto_sync,
            };
            commands::edit(&mut switcher, &name, opts, &ui)
        }
        Commands::Remove { name, yes } => commands::remove(&mut switcher, &name, yes, &ui),
        Commands::Save { name } => commands::save(&mut switcher, name, &ui),
        Commands::Load { name } => commands::load(&mut switcher, name, &ui),
        Commands::Sync => commands::sync(&mut switcher, &ui),
        Commands::Relocate { path } => commands::relocate(&mut switcher, &path, &ui),
        Commands::Rescan => commands::rescan(&mut switcher, &ui),
        Commands::Doctor | Commands::Completions { .. } => Ok(()),
    }
}
