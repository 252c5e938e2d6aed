use std::fs;
use std::path::Path;

use carlink_command::RoutePoint;
use carlink_interface::AckPolicy;

use crate::cmd::link::Link;
use crate::cmd::{RouteAction, RouteArgs};
use crate::exit::{interface_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_outcome, OutputFormat};

/// Points per packet; keeps one frame well under the payload limit.
const POINTS_PER_PACKET: usize = 64;

pub fn run(args: RouteArgs, format: OutputFormat) -> CliResult<i32> {
    match args.action {
        RouteAction::Add { file, ack } => {
            let points = load_points(&file)?;
            let policy = ack.policy(AckPolicy::DEFAULT_TIMEOUT)?;
            let link = Link::open(&args.link)?;
            for chunk in points.chunks(POINTS_PER_PACKET) {
                let outcome = link
                    .iface
                    .set_route_points(link.id, chunk, policy)
                    .map_err(|err| interface_error("adding route points failed", err))?;
                print_outcome(&outcome, format);
            }
        }
        RouteAction::RemoveLast { ack } => {
            let policy = ack.policy(AckPolicy::DEFAULT_TIMEOUT)?;
            let link = Link::open(&args.link)?;
            let outcome = link
                .iface
                .remove_last_route_point(link.id, policy)
                .map_err(|err| interface_error("removing route point failed", err))?;
            print_outcome(&outcome, format);
        }
        RouteAction::Clear { ack } => {
            let policy = ack.policy(AckPolicy::DEFAULT_TIMEOUT)?;
            let link = Link::open(&args.link)?;
            let outcome = link
                .iface
                .clear_route(link.id, policy)
                .map_err(|err| interface_error("clearing route failed", err))?;
            print_outcome(&outcome, format);
        }
    }
    Ok(SUCCESS)
}

fn load_points(path: &Path) -> CliResult<Vec<RoutePoint>> {
    let text = fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    let points: Vec<RoutePoint> = serde_json::from_str(&text).map_err(|err| {
        CliError::new(
            DATA_INVALID,
            format!("{} is not a list of route points: {err}", path.display()),
        )
    })?;
    if points.is_empty() {
        return Err(CliError::new(
            USAGE,
            format!("{} has no route points", path.display()),
        ));
    }
    Ok(points)
}
