use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Personal budget tracker API (salaries, expenses, savings planning, stock watchlist)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        bind: IpAddr,
        #[arg(
            long,
            help = "Alpha Vantage API key; falls back to ALPHA_VANTAGE_API_KEY"
        )]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nestegg=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            port,
            bind,
            api_key,
        } => {
            let api_key = api_key.or_else(|| std::env::var("ALPHA_VANTAGE_API_KEY").ok());
            if api_key.is_none() {
                tracing::warn!("no Alpha Vantage API key configured; stock quotes are disabled");
            }
            let addr = SocketAddr::new(bind, port);
            if let Err(err) = nestegg::api::run_http_server(addr, api_key).await {
                eprintln!("Server error: {err}");
                std::process::exit(1);
            }
        }
    }
}
