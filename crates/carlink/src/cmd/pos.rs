use carlink_command::CommandId;

use crate::cmd::link::Link;
use crate::cmd::PosArgs;
use crate::exit::{interface_error, CliResult, SUCCESS};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: PosArgs, format: OutputFormat) -> CliResult<i32> {
    let link = Link::open(&args.link)?;
    link.iface
        .set_pos(link.id, args.x, args.y, args.angle)
        .map_err(|err| interface_error("set position failed", err))?;
    print_sent(link.id, CommandId::SetPos, format);
    Ok(SUCCESS)
}
