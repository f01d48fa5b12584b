//! CLI subcommand definitions

use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List final and draft invoice references, newest first
    List,
    /// Fetch an invoice and show per-family summaries
    Show {
        /// Invoice reference, e.g. PPMS2-NICatKings-20191101
        reference: String,
    },
    /// Render one account's invoice as HTML
    Preview {
        reference: String,
        account: String,
        /// Also save the HTML under the invoice folder
        #[arg(long)]
        save: bool,
    },
    /// Render, save and email invoices, then export the ledger
    Send {
        reference: String,
        /// Account code to send (repeatable)
        #[arg(long = "account", value_name = "CODE", required_unless_present = "all")]
        accounts: Vec<String>,
        /// Send every account in the invoice
        #[arg(long, conflicts_with = "accounts")]
        all: bool,
        /// Deliver to group admins only
        #[arg(long)]
        admin_only: bool,
        /// Copy the facility manager on every email
        #[arg(long)]
        copy_manager: bool,
        /// Skip the ledger spreadsheet
        #[arg(long)]
        no_export: bool,
        #[command(flatten)]
        recipients: Recipients,
    },
    /// Write the ledger spreadsheet without sending anything
    Export { reference: String },
    /// Show the operator message as it will appear in invoices
    Message { reference: String },
    /// Inspect or edit the settings file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Address overrides for a single-account send
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub(crate) struct Recipients {
    /// Replace the To list (repeatable)
    #[arg(long, value_name = "ADDRESS", conflicts_with = "all")]
    pub(crate) to: Vec<String>,
    /// Replace the Cc list (repeatable)
    #[arg(long, value_name = "ADDRESS", conflicts_with = "all")]
    pub(crate) cc: Vec<String>,
}

impl Recipients {
    pub(crate) fn is_empty(&self) -> bool {
        self.to.is_empty() && self.cc.is_empty()
    }
}

#[derive(Subcommand)]
pub(crate) enum ConfigCommands {
    /// Write a settings file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the current settings (secrets masked)
    Show,
    /// Print the settings file location
    Path,
    /// Set one value by dotted key, e.g. `mail.test_mode true`
    Set { key: String, value: String },
}
