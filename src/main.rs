mod api;
mod app;
mod cli;
mod config;
mod consts;
mod core;
mod error;
mod export;
mod mail;
mod output;
mod render;
mod tasks;

use std::sync::Arc;

use clap::Parser;

use api::PumapiClient;
use app::{CommandContext, SendRequest};
use cli::{Cli, Commands};
use config::Settings;
use error::Result;
use mail::SmtpMailer;
use tasks::WorkerPool;

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let path = Settings::resolve_path(cli.config.as_deref())?;

    // These never touch the network
    match &cli.command {
        Commands::Config { command } => return app::handle_config(command, &path, cli.json),
        Commands::Message { reference } => {
            let settings = Settings::load(&path)?;
            return app::handle_message(&settings, reference, cli.json);
        }
        _ => {}
    }

    let settings = Arc::new(Settings::load(&path)?);
    let pool = WorkerPool::new(settings.general.workers)?;
    log::debug!("using {} worker threads", pool.threads());

    let ctx = CommandContext {
        json: cli.json,
        use_color: cli.use_color(),
        api: Arc::new(PumapiClient::new(&settings.api)),
        settings: Arc::clone(&settings),
        pool,
    };

    match cli.command {
        Commands::List => app::handle_list(&ctx),
        Commands::Show { reference } => app::handle_show(&ctx, &reference),
        Commands::Preview {
            reference,
            account,
            save,
        } => app::handle_preview(&ctx, &reference, &account, save),
        Commands::Send {
            reference,
            accounts,
            all,
            admin_only,
            copy_manager,
            no_export,
            recipients,
        } => {
            let mailer = Arc::new(SmtpMailer::new(&settings.mail)?);
            let request = SendRequest {
                reference,
                accounts,
                all,
                admin_only,
                copy_manager,
                no_export,
                recipients,
            };
            app::handle_send(&ctx, mailer, request)
        }
        Commands::Export { reference } => app::handle_export(&ctx, &reference),
        Commands::Config { .. } | Commands::Message { .. } => Ok(()),
    }
}
