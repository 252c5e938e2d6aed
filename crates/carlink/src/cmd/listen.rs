use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cmd::link::Link;
use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{interface_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_event, OutputFormat};

const IDLE_WAIT: Duration = Duration::from_millis(100);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let poll = args.poll.as_deref().map(parse_duration).transpose()?;
    let link = Link::open(&args.link)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    let mut next_poll = Instant::now();

    while running.load(Ordering::SeqCst) {
        if let Some(interval) = poll {
            if Instant::now() >= next_poll {
                link.iface
                    .get_state(link.id)
                    .map_err(|err| interface_error("state poll failed", err))?;
                next_poll += interval;
            }
        }

        let wait = match poll {
            Some(_) => next_poll
                .saturating_duration_since(Instant::now())
                .min(IDLE_WAIT),
            None => IDLE_WAIT,
        };
        let Some(event) = link.next_event(wait) else {
            continue;
        };

        print_event(&event, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                return Ok(SUCCESS);
            }
        }
    }

    debug!(printed, "listen interrupted");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
