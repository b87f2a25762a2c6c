mod app;
mod args;
mod sim;

use app::App;
use args::Args;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let app = App::new(args)?;
    app.run()?;

    Ok(())
}
