use std::time::Instant;

use carlink_interface::Event;

use crate::cmd::link::Link;
use crate::cmd::{parse_duration, TerminalArgs};
use crate::exit::{interface_error, CliResult, SUCCESS};
use crate::output::{print_event, OutputFormat};

/// Sends the command line, then prints whatever the vehicle prints until
/// the wait expires.
pub fn run(args: TerminalArgs, format: OutputFormat) -> CliResult<i32> {
    let wait = parse_duration(&args.wait)?;
    let text = args.text.join(" ");
    let link = Link::open(&args.link)?;

    link.iface
        .send_terminal_cmd(link.id, &text)
        .map_err(|err| interface_error("terminal command failed", err))?;

    let deadline = Instant::now() + wait;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match link.next_event(remaining) {
            Some(event @ Event::Print { .. }) if event.id() == link.id => {
                print_event(&event, format)
            }
            Some(_) => {}
            None => break,
        }
    }
    Ok(SUCCESS)
}
