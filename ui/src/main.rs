use anyhow::bail;
use busview::config::{self, ConfigLoadResult};
use busview::console::{Console, Flow};
use busview::{demo, logger};
use busview_server::broker::BrokerConnector;
use busview_server::broker::azure::AzureConnector;
use busview_server::connection_session::ConnectionSession;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

const PROMPT: &str = "busview> ";

#[derive(Parser, Debug)]
#[command(name = "busview", version, about)]
struct Args {
    /// Configuration file, defaults to ./config.toml when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run against a seeded in-memory namespace
    #[arg(long)]
    demo: bool,

    /// Override the configured page size
    #[arg(long)]
    page_size: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut app_config = match config::load_config(args.config.as_deref()) {
        ConfigLoadResult::Success(config) => *config,
        ConfigLoadResult::LoadError(e) => bail!("Failed to load configuration: {e}"),
        ConfigLoadResult::DeserializeError(e) => bail!("Failed to parse configuration: {e}"),
    };
    if let Some(page_size) = args.page_size {
        app_config.set_page_size(page_size);
    }
    if let Err(errors) = app_config.validate() {
        for error in &errors {
            eprintln!("{}\n", error.user_message());
        }
        bail!("Configuration has {} invalid value(s)", errors.len());
    }

    logger::setup_logger(app_config.logging())?;
    log::info!("Starting busview (demo: {})", args.demo);

    let (connector, defaults) = if args.demo {
        let broker: Arc<dyn BrokerConnector> = Arc::new(demo::seeded_broker().await?);
        println!("Demo mode: type 'connect' to open the seeded namespace.");
        (broker, demo::connect_request())
    } else {
        let azure: Arc<dyn BrokerConnector> = Arc::new(AzureConnector::new());
        (azure, app_config.servicebus().default_connect_request())
    };

    let session = ConnectionSession::with_options(connector, app_config.session_options());
    let console = Console::new(session, defaults);
    run(&console).await?;

    if console.session().is_connected().await {
        if let Err(e) = console.session().disconnect().await {
            log::warn!("Disconnect on exit failed: {e}");
        }
    }
    log::info!("busview stopped");
    Ok(())
}

/// Read commands until `quit`, end of input or Ctrl-C. Ctrl-C during a
/// command cancels its broker calls before exiting.
async fn run(console: &Console) -> anyhow::Result<()> {
    println!("Type 'help' for a list of commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let execution = console.handle_line(&line);
        tokio::pin!(execution);
        let (flow, interrupted) = tokio::select! {
            flow = &mut execution => (flow, false),
            _ = signal::ctrl_c() => {
                console.session().cancellation_token().cancel();
                (execution.await, true)
            }
        };

        match flow {
            Flow::Continue(output) if output.is_empty() => {}
            Flow::Continue(output) => println!("{output}"),
            Flow::Quit => break,
        }
        if interrupted {
            break;
        }
    }

    Ok(())
}
