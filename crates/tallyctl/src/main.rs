//! tallyctl - query a running tally daemon
//!
//! Prints the JSON reply on stdout and exits non-zero when `ok` is false.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tallyproto::{Request, Response, StatsClient, DEFAULT_ENDPOINT, HANDLE_ALL};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tallyctl")]
#[command(about = "Query a tally statistics daemon")]
#[command(version)]
struct Cli {
    /// Daemon endpoint
    #[arg(long, global = true, env = "TALLY_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// How long to wait for a reply
    #[arg(long, global = true, default_value_t = 5000)]
    timeout_ms: u64,

    /// Print the reply on one line
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Info of every registered provider
    AllServices,

    /// Info of one provider, or of all of them
    Info {
        #[arg(long, default_value = HANDLE_ALL)]
        handle: String,
    },

    /// Cache counters of providers that have a cache
    CacheStats {
        #[arg(long)]
        handle: Option<String>,
    },

    /// The daemon's effective configuration
    Config,

    /// Send a hand-written JSON request as-is
    Raw { json: String },
}

enum Outgoing {
    Request(Request),
    Raw(Vec<u8>),
}

impl Command {
    fn outgoing(self) -> Outgoing {
        match self {
            Command::AllServices => Outgoing::Request(Request::all_services()),
            Command::Info { handle } => Outgoing::Request(Request::info(handle)),
            Command::CacheStats { handle } => {
                let request = Request::cache_stats();
                Outgoing::Request(match handle {
                    Some(handle) => request.with_handle(handle),
                    None => request,
                })
            }
            Command::Config => Outgoing::Request(Request::config()),
            Command::Raw { json } => Outgoing::Raw(json.into_bytes()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_millis(cli.timeout_ms);

    let response = tokio::time::timeout(timeout, send(&cli.endpoint, timeout, cli.command))
        .await
        .with_context(|| format!("no reply from {} within {:?}", cli.endpoint, timeout))??;

    println!("{}", render(&response, cli.compact)?);

    if !response.ok {
        if let Some(code) = response.error_code() {
            eprintln!("{}", code.red());
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn send(endpoint: &str, timeout: Duration, command: Command) -> Result<Response> {
    debug!("connecting to {}", endpoint);
    let mut client = StatsClient::connect(endpoint).await?.with_timeout(timeout);

    match command.outgoing() {
        Outgoing::Request(request) => client.query(&request).await,
        Outgoing::Raw(frame) => client.send_raw(frame).await,
    }
}

fn render(response: &Response, compact: bool) -> Result<String> {
    let text = if compact {
        serde_json::to_string(response)?
    } else {
        serde_json::to_string_pretty(response)?
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallyproto::Action;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tallyctl").chain(args.iter().copied())).unwrap()
    }

    fn request_for(args: &[&str]) -> Request {
        match parse(args).command.outgoing() {
            Outgoing::Request(request) => request,
            Outgoing::Raw(_) => panic!("expected a typed request"),
        }
    }

    #[test]
    fn test_info_defaults_to_all() {
        let request = request_for(&["info"]);
        assert_eq!(request.action, Action::Info);
        assert_eq!(request.handle.as_deref(), Some(HANDLE_ALL));
    }

    #[test]
    fn test_cache_stats_handle_is_optional() {
        assert_eq!(request_for(&["cache-stats"]).handle, None);
        assert_eq!(
            request_for(&["cache-stats", "--handle", "svc-a"]).handle.as_deref(),
            Some("svc-a")
        );
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = parse(&["config", "--endpoint", "tcp://10.0.0.1:3333", "--compact"]);
        assert_eq!(cli.endpoint, "tcp://10.0.0.1:3333");
        assert!(cli.compact);
        assert_eq!(cli.command, Command::Config);
    }

    #[test]
    fn test_raw_is_sent_verbatim() {
        match parse(&["raw", r#"{"action":"x"}"#]).command.outgoing() {
            Outgoing::Raw(frame) => assert_eq!(frame, br#"{"action":"x"}"#.to_vec()),
            Outgoing::Request(_) => panic!("expected a raw frame"),
        }
    }

    #[test]
    fn test_render_compact() {
        let response = Response::failure("UnknownAction", "unknown action 'x'");
        assert_eq!(
            render(&response, true).unwrap(),
            r#"{"ok":false,"error":"UnknownAction","detail":"unknown action 'x'"}"#
        );
    }
}
