mod config;
mod render;
mod shell;

use anyhow::anyhow;
use clap::Parser;

use hacks_app::layout::Header;
use hacks_app::{Route, navigate};

use crate::config::{Cli, Command};
use crate::shell::Shell;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so pages stay readable on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "parent_hacks=info,hacks_db=info,hacks_auth=info,hacks_app=info".into()
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = cli.connect().await?;

    match cli.command {
        Some(Command::Open { path }) => {
            let route = Route::parse(&path).ok_or_else(|| anyhow!("no page at {}", path))?;
            let page = navigate(&ctx, &route).await?;
            let state = ctx.auth.snapshot().await;
            print!("{}", render::header(&Header::for_state(&state)));
            print!("{}", render::page(&page));
            print!("{}", render::footer());
        }
        None => {
            println!("Type `help` for commands.");
            let mut shell = Shell::open(ctx, tokio::io::stdin()).await?;
            shell.run().await?;
        }
    }

    Ok(())
}
