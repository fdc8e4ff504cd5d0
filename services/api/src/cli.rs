use crate::demo::{run_demo, run_status_lookup, DemoArgs, StatusArgs};
use crate::server;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use roads_portal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Roads Portal",
    about = "Serve and demonstrate the Roads Portal status engine from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run a document scenario and an offline/online sync cycle on live timers
    Demo(DemoArgs),
    /// Print the display entry for a status value
    Status(StatusArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Date mock records are seeded against (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) seed_date: Option<NaiveDate>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Status(args) => run_status_lookup(args),
    }
}
