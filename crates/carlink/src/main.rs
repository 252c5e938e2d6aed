mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "carlink", version, about = "Ground-station link for RC cars and multirotors")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        global = true,
        env = "CARLINK_LOG_LEVEL"
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{ConfigAction, RcModeArg, RouteAction, Toggle};

    #[test]
    fn parses_state_over_udp() {
        let cli = Cli::try_parse_from([
            "carlink",
            "state",
            "--udp",
            "10.0.0.5:8300",
            "--id",
            "2",
        ])
        .expect("state args should parse");
        let Command::State(args) = cli.command else {
            panic!("expected state command");
        };
        assert_eq!(args.link.endpoint.udp.as_deref(), Some("10.0.0.5:8300"));
        assert_eq!(args.link.id, 2);
    }

    #[test]
    fn rejects_both_endpoints() {
        let err = Cli::try_parse_from([
            "carlink",
            "state",
            "--udp",
            "10.0.0.5:8300",
            "--tcp",
            "localhost:65102",
        ])
        .expect_err("conflicting endpoints should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn requires_an_endpoint() {
        let err = Cli::try_parse_from(["carlink", "pos", "1", "2", "90"])
            .expect_err("missing endpoint should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rc_accepts_negative_values() {
        let cli = Cli::try_parse_from([
            "carlink", "rc", "duty", "-0.25", "-1", "--tcp", "localhost:65102",
        ])
        .expect("rc args should parse");
        let Command::Rc(args) = cli.command else {
            panic!("expected rc command");
        };
        assert_eq!(args.mode, RcModeArg::Duty);
        assert_eq!(args.value, -0.25);
        assert_eq!(args.steering, -1.0);
    }

    #[test]
    fn parses_config_set_with_ack_options() {
        let cli = Cli::try_parse_from([
            "carlink",
            "config",
            "--udp",
            "10.0.0.5:8300",
            "set",
            "conf.json",
            "--retries",
            "3",
            "--timeout",
            "500ms",
        ])
        .expect("config set args should parse");
        let Command::Config(args) = cli.command else {
            panic!("expected config command");
        };
        let ConfigAction::Set { file, ack } = args.action else {
            panic!("expected set action");
        };
        assert_eq!(file, std::path::PathBuf::from("conf.json"));
        assert_eq!(ack.retries, 3);
        assert_eq!(ack.timeout.as_deref(), Some("500ms"));
    }

    #[test]
    fn parses_route_and_autopilot() {
        let cli = Cli::try_parse_from(["carlink", "route", "--udp", "h:1", "remove-last"])
            .expect("route args should parse");
        assert!(matches!(
            cli.command,
            Command::Route(ref args) if matches!(args.action, RouteAction::RemoveLast { .. })
        ));

        let cli = Cli::try_parse_from(["carlink", "autopilot", "off", "--udp", "h:1"])
            .expect("autopilot args should parse");
        let Command::Autopilot(args) = cli.command else {
            panic!("expected autopilot command");
        };
        assert_eq!(args.state, Toggle::Off);
        assert_eq!(args.ack.retries, 10);
    }

    #[test]
    fn terminal_joins_words() {
        let cli = Cli::try_parse_from([
            "carlink", "terminal", "--udp", "h:1", "ping", "twice",
        ])
        .expect("terminal args should parse");
        let Command::Terminal(args) = cli.command else {
            panic!("expected terminal command");
        };
        assert_eq!(args.text.join(" "), "ping twice");
    }

    #[test]
    fn version_needs_no_link() {
        let cli = Cli::try_parse_from([
            "carlink",
            "--format",
            "json",
            "version",
            "--extended",
        ])
        .expect("version args should parse");
        assert!(matches!(cli.command, Command::Version(ref args) if args.extended));
        assert_eq!(cli.format, Some(OutputFormat::Json));
    }
}
