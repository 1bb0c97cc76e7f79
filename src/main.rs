use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

mod app;
mod config;
mod detect;
mod handler;
mod logging;
mod navigator;
mod session;
mod tui;
mod ui;

use app::App;
use config::Config;
use detect::DetectClient;
use session::{ChatSession, Sender};

#[derive(Parser)]
#[command(name = "topic-chat")]
#[command(about = "Chat with the topic detection service from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Route to open the chat interface at
    #[arg(long, default_value = "/")]
    route: String,

    /// Detect endpoint, overriding the config file
    #[arg(long)]
    endpoint: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the topic of a single question and print the exchange
    Detect {
        /// Your question
        question: String,
        /// API key for the detect service
        #[arg(short = 'k', long)]
        api_key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let endpoint = cli.endpoint.as_deref().unwrap_or_else(|| config.endpoint());
    let client = DetectClient::new(endpoint);

    match cli.command {
        Some(Commands::Detect { question, api_key }) => {
            logging::init_stderr(config.log_filter())?;
            detect_once(&client, &question, &api_key).await
        }
        None => {
            let log_path = logging::init_file(Config::get_log_dir()?, config.log_filter())?;
            info!(endpoint = client.endpoint(), log = %log_path.display(), "starting topic-chat");
            run_tui(client, &cli.route).await
        }
    }
}

async fn run_tui(client: DetectClient, route: &str) -> Result<()> {
    // Resolve the route before touching the terminal so errors print normally
    let screen = navigator::navigate(route)?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(screen, client, events.sender());

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event)?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    info!(messages = app.session.messages().len(), "chat closed");
    result
}

async fn detect_once(client: &DetectClient, question: &str, api_key: &str) -> Result<()> {
    let mut session = ChatSession::new(());
    session.set_api_key(api_key);
    session.set_draft(question);

    session.submit_with(client).await;

    for message in session.messages() {
        let label = match message.sender {
            Sender::User => "You",
            Sender::Bot => "Bot",
            Sender::System => "System",
        };
        println!("{}: {}", label, message.text);
    }

    Ok(())
}
