//! rackspace-bootstrap - bootstrap Rackspace servers
//!
//! Creates a server with a generated cloud-config, waits for it to come
//! online and, when asked, for RackConnect automation to finish.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser};
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rackspace_bootstrap::config::{self, BootstrapOptions, Credentials, Nameservers, Region};
use rackspace_bootstrap::provider::rackspace::DEFAULT_IDENTITY_URL;
use rackspace_bootstrap::provision::PollPolicy;
use rackspace_bootstrap::{BootstrapError, RunSettings};

const BANNER_WIDTH: usize = 78;

#[derive(Parser)]
#[command(name = "rackspace-bootstrap")]
#[command(
    author,
    version,
    about = "Bootstrap Rackspace servers and connect them to RackConnect and Puppet",
    long_about = None
)]
struct Cli {
    /// Fully qualified domain name of the new server
    hostname: String,

    /// Rackspace region to use
    #[arg(long, value_enum)]
    region: Option<Region>,

    /// The UUID of the image to use
    #[arg(long, value_name = "UUID")]
    image: Option<String>,

    /// The server flavor to use
    #[arg(long, value_name = "FLAVOR")]
    flavor: Option<String>,

    /// Show the generated cloud-init and progress (repeat for more detail)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Wait for RackConnect automation after the server boots
    #[arg(long)]
    rackconnect: bool,

    /// A RackConnect load balancer pool to use
    #[arg(long, value_name = "POOL")]
    load_balancer: Option<String>,

    /// A private network to attach
    #[arg(long, value_name = "UUID")]
    private_lan: Option<String>,

    /// Path of the ssh authorized_keys to install
    #[arg(long, value_name = "FILENAME")]
    ssh_authorized_keys: Option<PathBuf>,

    /// Hostname of the puppet master
    #[arg(long, value_name = "HOSTNAME")]
    puppet_host: Option<String>,

    /// IP address of the puppet master
    #[arg(long, value_name = "IP", requires = "puppet_host")]
    puppet_ip: Option<String>,

    /// A pair of nameservers to use
    #[arg(long, num_args = 2, value_names = ["PRIMARY", "SECONDARY"])]
    nameservers: Option<Vec<String>>,

    /// Seconds to wait for the server to become ACTIVE
    #[arg(long, value_name = "SECS", default_value_t = 600)]
    running_timeout: u64,

    /// Seconds to wait for RackConnect automation
    #[arg(long, value_name = "SECS", default_value_t = 1800)]
    automation_timeout: u64,

    /// Rackspace identity endpoint
    #[arg(long, env = "RACKSPACE_IDENTITY_URL", default_value = DEFAULT_IDENTITY_URL, hide = true)]
    identity_url: String,
}

impl Cli {
    fn options(&self) -> BootstrapOptions {
        BootstrapOptions {
            fqdn: self.hostname.clone(),
            region: self.region,
            image: self.image.clone(),
            flavor: self.flavor.clone(),
            rackconnect: self.rackconnect,
            load_balancer: self.load_balancer.clone(),
            private_lan: self.private_lan.clone(),
            ssh_authorized_keys: self.ssh_authorized_keys.clone(),
            puppet_host: self.puppet_host.clone(),
            puppet_ip: self.puppet_ip.clone(),
            nameservers: self
                .nameservers
                .as_deref()
                .and_then(|ns| match ns {
                    [primary, secondary] => Some(Nameservers::new(primary, secondary)),
                    _ => None,
                }),
        }
    }

    fn settings(&self) -> RunSettings {
        let running = PollPolicy::running();
        let automation = PollPolicy::automation();
        RunSettings {
            identity_url: self.identity_url.clone(),
            running: PollPolicy::from_timeout(
                running.interval,
                Duration::from_secs(self.running_timeout),
            ),
            automation: PollPolicy::from_timeout(
                automation.interval,
                Duration::from_secs(self.automation_timeout),
            ),
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rackspace_bootstrap={},warn", level)));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

async fn bootstrap(cli: &Cli) -> Result<(), BootstrapError> {
    // Credentials are checked before any file is read.
    let credentials = Credentials::from_env()?;
    debug!("Using credentials {:?}", credentials);

    let config = config::build_config(&cli.options()).await?;

    if cli.verbose > 0 {
        let title = " Generated user-data ";
        let pad = BANNER_WIDTH.saturating_sub(title.len());
        println!("{}{}{}", "=".repeat(pad / 2), title, "=".repeat(pad - pad / 2));
        println!("{}", config.user_data);
        println!("{}", "=".repeat(BANNER_WIDTH));
    }

    let report = rackspace_bootstrap::run(&credentials, &config, &cli.settings()).await?;
    println!("{}", report);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match bootstrap(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("ERROR: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_minimal_invocation() {
        let cli = Cli::try_parse_from(["rackspace-bootstrap", "web1.example.com"]).unwrap();
        let options = cli.options();

        assert_eq!(options.fqdn, "web1.example.com");
        assert!(options.region.is_none());
        assert!(!options.rackconnect);
        assert!(options.nameservers.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_full_invocation() {
        let cli = Cli::try_parse_from([
            "rackspace-bootstrap",
            "app1.example.com",
            "--region",
            "iad",
            "--rackconnect",
            "--load-balancer",
            "web:pool",
            "--private-lan",
            "lan-1",
            "--puppet-host",
            "pm.x",
            "--puppet-ip",
            "10.0.0.5",
            "--nameservers",
            "10.0.0.2",
            "10.0.0.3",
            "-vv",
        ])
        .unwrap();
        let options = cli.options();

        assert_eq!(options.region, Some(Region::Iad));
        assert!(options.rackconnect);
        assert_eq!(options.load_balancer.as_deref(), Some("web:pool"));
        assert_eq!(
            options.nameservers,
            Some(Nameservers::new("10.0.0.2", "10.0.0.3"))
        );
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_puppet_ip_requires_host() {
        let result =
            Cli::try_parse_from(["rackspace-bootstrap", "web1", "--puppet-ip", "10.0.0.5"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_nameservers_need_two_values() {
        let result = Cli::try_parse_from(["rackspace-bootstrap", "web1", "--nameservers", "1.1.1.1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_timeouts_become_attempts() {
        let cli = Cli::try_parse_from([
            "rackspace-bootstrap",
            "web1",
            "--automation-timeout",
            "60",
        ])
        .unwrap();
        let settings = cli.settings();

        assert_eq!(settings.automation.interval, Duration::from_secs(5));
        assert_eq!(settings.automation.max_attempts, 12);
        assert_eq!(settings.running.max_attempts, 200);
    }
}
