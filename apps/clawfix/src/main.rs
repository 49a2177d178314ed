mod cli;

use clap::Parser;

use clawfix_lib::{logging, App, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args = cli::Cli::parse();
    let config = AppConfig::from_env()?;
    let app = App::init(config)?;

    let code = cli::run(&app, args.command).await;
    app.shutdown().await?;

    let code = code?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
