//! ml - machine learning model packages from mlhub

use clap::Parser;
use mlhub_core::{HubError, Reporter};
use tracing_subscriber::EnvFilter;

use mlhub_cli::ops::Context;
use mlhub_cli::ui::Output;
use mlhub_cli::{Cli, Commands, cmd};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let quiet = cli.quiet;

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => report(&err, quiet),
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let ctx = Context::from_env(&cli.mlhub, cli.quiet)?;

    let result = match cli.command {
        Commands::Available { name_only } => cmd::available::available(&ctx, name_only).await,
        Commands::Installed { name_only } => cmd::installed::installed(&ctx, name_only).await,
        Commands::Install { model } => cmd::install::install(&ctx, &model).await,
        Commands::Download { model } => cmd::download::download(&ctx, &model),
        Commands::Readme { model } => cmd::readme::readme(&ctx, &model),
        Commands::Commands { model, name_only } => {
            cmd::commands::commands(&ctx, &model, name_only).await
        }
        Commands::Configure { model } => cmd::configure::configure(&ctx, &model).await,
        Commands::Remove { model } => cmd::remove::remove(&ctx, model.as_deref()),
        Commands::Clean => cmd::clean::clean(&ctx),
        Commands::Dispatch(args) => {
            let code = cmd::dispatch::dispatch(&ctx, &args).await;
            flush(&ctx).await;
            return code;
        }
    };

    flush(&ctx).await;
    result.map(|()| 0)
}

async fn flush(ctx: &Context) {
    if let Err(e) = ctx.flush().await {
        tracing::warn!(error = %e, "could not save completion lists");
    }
}

/// Print `err` and its suggested next step; returns the exit code.
fn report(err: &anyhow::Error, quiet: bool) -> i32 {
    let output = Output::new(quiet);
    match err.downcast_ref::<HubError>() {
        Some(hub) => {
            let code = hub.exit_code();
            if code == 0 {
                output.info(&hub.to_string());
            } else {
                output.error(&hub.to_string());
            }
            if let Some(hint) = hub.hint().filter(|_| !quiet) {
                eprintln!("\n{hint}");
            }
            code
        }
        None => {
            output.error(&format!("{err:#}"));
            1
        }
    }
}
