pub mod app;
pub mod export;
pub mod init;
pub mod log;
pub mod report;
pub mod session;
pub mod stats;
pub mod status;
pub mod sync;
pub mod task;
pub mod watch;

use app::App;
use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Configuration initialization")]
    Init(init::InitArgs),
    #[command(about = "Clock in and start the work session")]
    In(session::InArgs),
    #[command(about = "Start a break")]
    Break,
    #[command(about = "End the current break")]
    Resume,
    #[command(about = "Clock out and log the session")]
    Out,
    #[command(about = "Show the open session, active tasks and the week total")]
    Status,
    #[command(about = "Show a live timer until Ctrl+C")]
    Watch,
    #[command(about = "Track named tasks side by side")]
    Task(task::TaskArgs),
    #[command(about = "List and edit time logs")]
    Log(log::LogArgs),
    #[command(about = "Weekly totals")]
    Stats(stats::StatsArgs),
    #[command(about = "Time, invoice and profit report")]
    Report(report::ReportArgs),
    #[command(about = "Export records to CSV or JSON")]
    Export(export::ExportArgs),
    #[command(about = "Replay clock-outs saved offline")]
    Sync,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub async fn menu() -> anyhow::Result<()> {
        let cli = Self::parse();
        match cli.command {
            Commands::Init(args) => init::cmd(args),
            command => {
                let app = App::open().await?;
                let result = run(&app, command).await;
                app.sessions.shutdown();
                result
            }
        }
    }
}

async fn run(app: &App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init(args) => init::cmd(args),
        Commands::In(args) => session::clock_in(app, args).await,
        Commands::Break => session::start_break(app).await,
        Commands::Resume => session::end_break(app).await,
        Commands::Out => session::clock_out(app).await,
        Commands::Status => status::cmd(app).await,
        Commands::Watch => watch::cmd(app).await,
        Commands::Task(args) => task::cmd(app, args).await,
        Commands::Log(args) => log::cmd(app, args).await,
        Commands::Stats(args) => stats::cmd(app, args).await,
        Commands::Report(args) => report::cmd(app, args).await,
        Commands::Export(args) => export::cmd(app, args).await,
        Commands::Sync => sync::cmd(app).await,
    }
}
