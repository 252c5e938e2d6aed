use std::fs;
use std::path::Path;

use carlink_command::MainConfig;
use carlink_interface::{AckPolicy, Event};

use crate::cmd::link::Link;
use crate::cmd::{parse_duration, ConfigAction, ConfigArgs, LinkArgs};
use crate::exit::{interface_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_config, print_outcome, OutputFormat};

pub fn run(args: ConfigArgs, format: OutputFormat) -> CliResult<i32> {
    match args.action {
        ConfigAction::Get { wait } => fetch(&args.link, &wait, false, format),
        ConfigAction::GetDefault { wait } => fetch(&args.link, &wait, true, format),
        ConfigAction::Set { file, ack } => {
            let config = load_config(&file)?;
            let policy = ack.policy(AckPolicy::CONFIG_TIMEOUT)?;
            let link = Link::open(&args.link)?;
            let outcome = link
                .iface
                .set_configuration(link.id, &config, policy)
                .map_err(|err| interface_error("config write failed", err))?;
            print_outcome(&outcome, format);
            Ok(SUCCESS)
        }
    }
}

fn fetch(link_args: &LinkArgs, wait: &str, default: bool, format: OutputFormat) -> CliResult<i32> {
    let wait = parse_duration(wait)?;
    let link = Link::open(link_args)?;

    let sent = if default {
        link.iface.get_default_configuration(link.id)
    } else {
        link.iface.get_configuration(link.id)
    };
    sent.map_err(|err| interface_error("config request failed", err))?;

    let config = link.wait_for(wait, "configuration report", |event| match event {
        Event::Config {
            id,
            config,
            default: is_default,
        } if id == link.id && is_default == default => Some(config),
        _ => None,
    })?;
    print_config(link.id, &config, default, format);

    Ok(SUCCESS)
}

pub fn load_config(path: &Path) -> CliResult<MainConfig> {
    let text = fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    serde_json::from_str(&text).map_err(|err| {
        CliError::new(
            DATA_INVALID,
            format!("{} is not a valid configuration: {err}", path.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn temp_file(tag: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "carlink-config-{tag}-{}.json",
            std::process::id()
        ));
        fs::write(&path, contents).expect("temp file should be writable");
        path
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let path = temp_file("partial", r#"{ "wheel_diam": 0.11, "motor_poles": 4 }"#);
        let config = load_config(&path).expect("config should load");
        let _ = fs::remove_file(&path);

        assert_eq!(config.wheel_diam, 0.11);
        assert_eq!(config.motor_poles, 4.0);
        assert_eq!(config.steering_center, MainConfig::default().steering_center);
    }

    #[test]
    fn malformed_config_is_data_invalid() {
        let path = temp_file("broken", "{ wheel_diam: }");
        let err = load_config(&path).expect_err("config should not load");
        let _ = fs::remove_file(&path);
        assert_eq!(err.code, DATA_INVALID);
    }
}
