use carlink_command::CommandId;

use crate::cmd::link::Link;
use crate::cmd::{RcArgs, RcModeArg};
use crate::exit::{interface_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: RcArgs, format: OutputFormat) -> CliResult<i32> {
    if !(-1.0..=1.0).contains(&args.steering) {
        return Err(CliError::new(USAGE, "steering must be within -1.0..=1.0"));
    }
    if args.mode == RcModeArg::Duty && !(-1.0..=1.0).contains(&args.value) {
        return Err(CliError::new(USAGE, "duty must be within -1.0..=1.0"));
    }

    let link = Link::open(&args.link)?;
    let sent = match args.mode {
        RcModeArg::Duty => link.iface.set_rc_control_duty(link.id, args.value, args.steering),
        RcModeArg::Current => link
            .iface
            .set_rc_control_current(link.id, args.value, args.steering),
    };
    sent.map_err(|err| interface_error("rc control failed", err))?;
    print_sent(link.id, CommandId::RcControl, format);
    Ok(SUCCESS)
}
