use std::path::PathBuf;
use std::time::Duration;

use carlink_interface::AckPolicy;
use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod autopilot;
pub mod config;
pub mod link;
pub mod listen;
pub mod pos;
pub mod rc;
pub mod route;
pub mod servo;
pub mod state;
pub mod terminal;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Request and print the vehicle state.
    State(StateArgs),
    /// Read or write the vehicle main configuration.
    Config(ConfigArgs),
    /// Edit the autopilot route.
    Route(RouteArgs),
    /// Turn the autopilot on or off.
    Autopilot(AutopilotArgs),
    /// Send one RC control command.
    Rc(RcArgs),
    /// Override the vehicle position estimate.
    Pos(PosArgs),
    /// Set the steering servo position directly.
    Servo(ServoArgs),
    /// Run a console command on the vehicle.
    Terminal(TerminalArgs),
    /// Print every message received from the vehicle.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::State(args) => state::run(args, format),
        Command::Config(args) => config::run(args, format),
        Command::Route(args) => route::run(args, format),
        Command::Autopilot(args) => autopilot::run(args, format),
        Command::Rc(args) => rc::run(args, format),
        Command::Pos(args) => pos::run(args, format),
        Command::Servo(args) => servo::run(args, format),
        Command::Terminal(args) => terminal::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// How to reach the vehicle.
#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,
    /// Vehicle id to address.
    #[arg(long, env = "CARLINK_ID", default_value = "0")]
    pub id: u8,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct EndpointArgs {
    /// Talk to the vehicle directly over UDP (unframed datagrams).
    #[arg(long, value_name = "HOST:PORT", env = "CARLINK_UDP")]
    pub udp: Option<String>,
    /// Talk framed over a TCP serial bridge.
    #[arg(long, value_name = "HOST:PORT", env = "CARLINK_TCP")]
    pub tcp: Option<String>,
}

/// Retry budget for acknowledged commands.
#[derive(Args, Debug, Clone)]
pub struct AckArgs {
    /// Total number of transmissions before giving up.
    #[arg(long, default_value_t = AckPolicy::DEFAULT_RETRIES)]
    pub retries: u32,
    /// Wait for an acknowledgment after each transmission (e.g. 200ms, 2s).
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,
}

impl AckArgs {
    /// Resolve the policy, falling back to `default_timeout`.
    pub fn policy(&self, default_timeout: Duration) -> CliResult<AckPolicy> {
        let timeout = match &self.timeout {
            Some(input) => parse_duration(input)?,
            None => default_timeout,
        };
        Ok(AckPolicy::new(self.retries, timeout))
    }
}

#[derive(Args, Debug)]
pub struct StateArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// How long to wait for the state report.
    #[arg(long, default_value = "2s", value_name = "DURATION")]
    pub wait: String,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the current configuration.
    Get {
        /// How long to wait for the report.
        #[arg(long, default_value = "2s", value_name = "DURATION")]
        wait: String,
    },
    /// Print the firmware default configuration.
    GetDefault {
        /// How long to wait for the report.
        #[arg(long, default_value = "2s", value_name = "DURATION")]
        wait: String,
    },
    /// Write the configuration from a JSON file.
    Set {
        /// JSON file; missing fields take their defaults.
        file: PathBuf,
        #[command(flatten)]
        ack: AckArgs,
    },
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(subcommand)]
    pub action: RouteAction,
}

#[derive(Subcommand, Debug)]
pub enum RouteAction {
    /// Append points from a JSON array of {"x","y","speed"} objects.
    Add {
        file: PathBuf,
        #[command(flatten)]
        ack: AckArgs,
    },
    /// Remove the last route point.
    RemoveLast {
        #[command(flatten)]
        ack: AckArgs,
    },
    /// Clear the route.
    Clear {
        #[command(flatten)]
        ack: AckArgs,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Args, Debug)]
pub struct AutopilotArgs {
    pub state: Toggle,
    #[command(flatten)]
    pub link: LinkArgs,
    #[command(flatten)]
    pub ack: AckArgs,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RcModeArg {
    /// Duty cycle, -1.0 to 1.0.
    Duty,
    /// Motor current in amperes.
    Current,
}

#[derive(Args, Debug)]
pub struct RcArgs {
    pub mode: RcModeArg,
    #[arg(allow_negative_numbers = true)]
    pub value: f64,
    /// Steering, -1.0 (left) to 1.0 (right).
    #[arg(allow_negative_numbers = true)]
    pub steering: f64,
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct PosArgs {
    /// Meters.
    #[arg(allow_negative_numbers = true)]
    pub x: f64,
    #[arg(allow_negative_numbers = true)]
    pub y: f64,
    /// Heading in degrees.
    #[arg(allow_negative_numbers = true)]
    pub angle: f64,
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct ServoArgs {
    /// Servo position, 0.0 to 1.0.
    pub value: f64,
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct TerminalArgs {
    /// Command line to run on the vehicle.
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
    #[command(flatten)]
    pub link: LinkArgs,
    /// How long to collect printed output.
    #[arg(long, default_value = "1s", value_name = "DURATION")]
    pub wait: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Also request the vehicle state at this interval (e.g. 100ms).
    #[arg(long, value_name = "DURATION")]
    pub poll: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        for input in ["", "0", "0ms", "fast", "1.5s", "-2s"] {
            let err = parse_duration(input).unwrap_err();
            assert_eq!(err.code, USAGE, "{input:?} should be a usage error");
        }
    }

    #[test]
    fn ack_policy_falls_back_to_default_timeout() {
        let args = AckArgs {
            retries: 4,
            timeout: None,
        };
        let policy = args.policy(AckPolicy::CONFIG_TIMEOUT).unwrap();
        assert_eq!(policy, AckPolicy::new(4, Duration::from_secs(2)));

        let args = AckArgs {
            retries: 1,
            timeout: Some("50ms".into()),
        };
        assert_eq!(
            args.policy(AckPolicy::DEFAULT_TIMEOUT).unwrap().timeout,
            Duration::from_millis(50)
        );
    }
}
