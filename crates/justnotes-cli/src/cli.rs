use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "justnotes")]
#[command(about = "Just simple, just notes - from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name (falls back to JUSTNOTES_PROFILE, then the active profile)
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List notes in server order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a note, optionally with initial content
    #[command(alias = "add")]
    New {
        /// Note content (read from piped stdin when omitted)
        content: Vec<String>,
    },
    /// Replace the content of a note
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        /// New content (piped stdin or $EDITOR when omitted)
        content: Vec<String>,
    },
    /// Delete a note after confirmation
    Delete {
        /// Note ID or unique ID prefix
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Interactive notes workspace
    Shell {
        /// Use an in-memory note service instead of the configured API
        #[arg(long)]
        demo: bool,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Sign in, sign up or sign out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update a profile
    Init {
        /// Note API base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Autosave quiet period in milliseconds
        #[arg(long, value_name = "MS")]
        autosave_ms: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the effective configuration of a profile
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email/password and store the session in the keychain
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
        /// Defaults to the password when omitted
        #[arg(long, value_name = "PASSWORD")]
        confirm_password: Option<String>,
    },
    /// Show auth status for the profile
    Status,
    /// Sign out and clear the stored session
    Logout,
}
