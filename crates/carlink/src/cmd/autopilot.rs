use carlink_interface::AckPolicy;

use crate::cmd::link::Link;
use crate::cmd::{AutopilotArgs, Toggle};
use crate::exit::{interface_error, CliResult, SUCCESS};
use crate::output::{print_outcome, OutputFormat};

pub fn run(args: AutopilotArgs, format: OutputFormat) -> CliResult<i32> {
    let policy = args.ack.policy(AckPolicy::DEFAULT_TIMEOUT)?;
    let link = Link::open(&args.link)?;
    let outcome = link
        .iface
        .set_ap_active(link.id, args.state == Toggle::On, policy)
        .map_err(|err| interface_error("autopilot toggle failed", err))?;
    print_outcome(&outcome, format);
    Ok(SUCCESS)
}
