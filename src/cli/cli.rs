use clap::{Parser, Subcommand};
use std::path::PathBuf;

const KEYSHELF_LONG_VERSION: &str = concat!(
    "version: ", env!("CARGO_PKG_VERSION"), "\n",
    "git sha: ", env!("KEYSHELF_GIT_SHA"), "\n",
    "build time (UTC): ", env!("KEYSHELF_BUILD_TIME"), "\n",
    "target: ", env!("KEYSHELF_TARGET"), "\n",
    "profile: ", env!("KEYSHELF_BUILD_PROFILE")
);

// Imported-field edits rebuild the payload and cannot be combined with these.
const CUSTOM_FIELD_ARGS: [&str; 4] = ["fields", "clear_fields", "mark", "unmark"];

#[derive(Parser)]
#[command(
    name = "keyshelf",
    version = env!("CARGO_PKG_VERSION"),
    long_version = KEYSHELF_LONG_VERSION,
    about = " 🗝️ keyshelf: local shelf for API credentials"
)]
pub struct Cli {
    /// Named store from config.toml
    #[arg(long, global = true)]
    pub profile: Option<String>,
    /// Storage file path override
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a credential (prompts for anything not given)
    Add {
        #[arg(long)]
        vendor: Option<String>,
        #[arg(long)]
        account: Option<String>,
        /// Prefer the prompt; flags end up in shell history
        #[arg(long)]
        api_key: Option<String>,
        /// Comma separated tags
        #[arg(long)]
        tag: Option<String>,
        /// Custom field, NAME=VALUE (repeatable)
        #[arg(long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,
        /// Custom field to display and copy instead of the API key
        #[arg(long)]
        mark: Option<String>,
    },
    /// Edit a credential
    Edit {
        id: String,
        #[arg(long)]
        vendor: Option<String>,
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        /// Replaces all custom fields (repeatable)
        #[arg(long = "field", value_name = "NAME=VALUE", conflicts_with = "clear_fields")]
        fields: Vec<String>,
        /// Remove all custom fields
        #[arg(long)]
        clear_fields: bool,
        #[arg(long, conflicts_with = "unmark")]
        mark: Option<String>,
        #[arg(long)]
        unmark: bool,
        /// Set an imported field, PATH=VALUE (repeatable)
        #[arg(long, value_name = "PATH=VALUE", conflicts_with_all = CUSTOM_FIELD_ARGS)]
        set: Vec<String>,
        /// Pin an imported field as the displayed credential
        #[arg(
            long,
            value_name = "PATH",
            conflicts_with = "unpin",
            conflicts_with_all = CUSTOM_FIELD_ARGS
        )]
        pin: Option<String>,
        #[arg(long, conflicts_with_all = CUSTOM_FIELD_ARGS)]
        unpin: bool,
    },
    /// List credentials with masked values
    List {
        /// Case-insensitive substring over all fields
        #[arg(long)]
        search: Option<String>,
        /// vendor-asc, vendor-desc, tag, date-asc, date-desc or tag:<name>
        #[arg(long)]
        sort: Option<String>,
        /// Only records carrying this exact tag
        #[arg(long)]
        tag: Option<String>,
        /// Machine-readable output (still masked)
        #[arg(long)]
        json: bool,
    },
    /// Show one credential in full
    Show {
        id: String,
        /// Print secrets unmasked
        #[arg(long)]
        reveal: bool,
    },
    /// Copy the displayed credential to the clipboard
    Get {
        id: String,
        /// Do not copy to clipboard
        #[arg(long)]
        no_copy: bool,
        /// Print the value to stdout (use with --no-copy for safe piping)
        #[arg(long)]
        echo: bool,
        /// Clipboard TTL in seconds (overrides KEYSHELF_CLIP_TTL)
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Remove credentials by id
    Rm {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Merge a JSON array of credentials into the shelf
    Import { file: PathBuf },
    /// Write selected credentials as a JSON array
    Export {
        ids: Vec<String>,
        #[arg(long, conflicts_with = "ids")]
        all: bool,
        /// Output file (default api-keys-export.json)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import one arbitrary JSON object as a credential
    ImportRecord {
        file: PathBuf,
        /// Print the flattened field paths and stop
        #[arg(long)]
        list_fields: bool,
        /// Override a field, PATH=VALUE (repeatable)
        #[arg(long, value_name = "PATH=VALUE")]
        set: Vec<String>,
        /// Field whose value is displayed and copied
        #[arg(long, value_name = "PATH")]
        pin: Option<String>,
        #[arg(long)]
        vendor: Option<String>,
        #[arg(long)]
        account: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        tag: Option<String>,
    },
    /// List distinct tags
    Tags,
    /// Launch the interactive Terminal UI
    Tui,
    /// Manage named stores
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    List,
    Show {
        name: String,
    },
    Add {
        name: String,
        /// Storage file for this profile
        #[arg(long)]
        store: String,
        /// Replace an existing profile of the same name
        #[arg(long)]
        on_duplicate_override: bool,
    },
    Rm {
        name: String,
    },
    /// Show, set or clear the default profile
    Default {
        name: Option<String>,
        #[arg(long, conflicts_with = "name")]
        clear: bool,
    },
}
