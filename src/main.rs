//! `consul-announcer` binary.
//!
//! ```text
//! consul-announcer --config '@services.json' -- uwsgi --ini=uwsgi.ini
//! consul-announcer --agent 10.0.0.5:8501 --config '{"service": {...}}' -v -- sleep 600
//! ```
//!
//! Exit codes: 0 for a clean run (whatever the child exited with), 1 for a runtime
//! failure (bad configuration, unreachable agent), 2 for a usage error.

use clap::{ArgAction, Parser};

use announcer::connectors::ConsulClient;
use announcer::service::Service;
use announcer::telemetry::{get_subscriber, init_subscriber, verbosity_filter};

#[derive(Parser, Debug)]
#[command(
    name = "consul-announcer",
    version,
    about = "Service announcer for Consul.",
    long_about = "Service announcer for Consul.\n\n\
        Registers the configured services and health checks with a Consul agent,\n\
        spawns the given command, keeps all TTL checks passing while it runs, and\n\
        deregisters everything when it exits."
)]
struct Cli {
    /// Consul agent address: hostname[:port] (default port is 8500)
    #[arg(
        long,
        value_name = "hostname[:port]",
        env = "CONSUL_ANNOUNCER_AGENT",
        default_value = "localhost"
    )]
    agent: String,

    /// Consul configuration JSON (required). If it starts with @ it is read as a file path
    #[arg(
        long,
        value_name = "JSON or @path",
        env = "CONSUL_ANNOUNCER_CONFIG",
        required = true
    )]
    config: String,

    /// Consul ACL token
    #[arg(long, value_name = "acl-token", env = "CONSUL_ANNOUNCER_TOKEN")]
    token: Option<String>,

    /// Interval for periodically marking all TTL checks as passed, in seconds.
    /// Should be less than the min TTL; auto-calculated as min TTL / 10 when omitted
    #[arg(long, value_name = "seconds", env = "CONSUL_ANNOUNCER_INTERVAL")]
    interval: Option<f64>,

    /// Verbose output: -v for info, -vv for debug
    #[arg(long, short, action = ArgAction::Count)]
    verbose: u8,

    /// Command to invoke and supervise (after the -- separator)
    #[arg(last = true, required = true, value_name = "command [arguments]")]
    command: Vec<String>,
}

// One logical thread of control: the keepalive loop and the signal forwarders
// share a current-thread runtime.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_subscriber(get_subscriber(verbosity_filter(cli.verbose)));

    if let Err(err) = run(cli).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), announcer::Error> {
    let agent = ConsulClient::new(&cli.agent, cli.token)?;
    let mut service = Service::builder(Box::new(agent), cli.config, cli.command)
        .interval(cli.interval)
        .build()?;
    let status = service.run().await?;
    tracing::info!("Command finished with {}", status);
    Ok(())
}
