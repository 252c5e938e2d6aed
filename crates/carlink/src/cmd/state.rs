use carlink_interface::Event;

use crate::cmd::link::Link;
use crate::cmd::{parse_duration, StateArgs};
use crate::exit::{interface_error, CliResult, SUCCESS};
use crate::output::{print_state, OutputFormat};

pub fn run(args: StateArgs, format: OutputFormat) -> CliResult<i32> {
    let wait = parse_duration(&args.wait)?;
    let link = Link::open(&args.link)?;

    link.iface
        .get_state(link.id)
        .map_err(|err| interface_error("state request failed", err))?;

    let state = link.wait_for(wait, "state report", |event| match event {
        Event::State { id, state } if id == link.id => Some(state),
        _ => None,
    })?;
    print_state(link.id, &state, format);

    Ok(SUCCESS)
}
