use carlink_command::CommandId;

use crate::cmd::link::Link;
use crate::cmd::ServoArgs;
use crate::exit::{interface_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: ServoArgs, format: OutputFormat) -> CliResult<i32> {
    if !(0.0..=1.0).contains(&args.value) {
        return Err(CliError::new(USAGE, "servo position must be within 0.0..=1.0"));
    }
    let link = Link::open(&args.link)?;
    link.iface
        .set_servo_direct(link.id, args.value)
        .map_err(|err| interface_error("servo command failed", err))?;
    print_sent(link.id, CommandId::SetServoDirect, format);
    Ok(SUCCESS)
}
