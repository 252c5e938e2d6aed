use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use carlink_command::{CommandId, MainConfig, StateReport};
use carlink_interface::{AckOutcome, Event};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum EventOutput<'a> {
    Print {
        id: u8,
        text: &'a str,
    },
    State {
        id: u8,
        state: &'a StateReport,
    },
    Config {
        id: u8,
        default: bool,
        config: &'a MainConfig,
    },
    Forward {
        id: u8,
        stream: &'static str,
        size: usize,
    },
    Ack {
        id: u8,
        command: CommandId,
    },
    Command {
        id: u8,
        command: CommandId,
    },
    Sent {
        id: u8,
        command: CommandId,
    },
    Acknowledged {
        command: CommandId,
        attempts: u32,
        elapsed_ms: u64,
    },
}

#[derive(Serialize)]
struct Stamped<'a> {
    #[serde(flatten)]
    event: EventOutput<'a>,
    timestamp: String,
}

fn print_json(event: EventOutput<'_>) {
    let out = Stamped {
        event,
        timestamp: now_unix_seconds(),
    };
    println!(
        "{}",
        serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: [&str; 2], rows: Vec<(String, String)>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for (key, value) in rows {
        table.add_row(vec![key, value]);
    }
    println!("{table}");
}

pub fn print_state(id: u8, state: &StateReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(EventOutput::State { id, state }),
        OutputFormat::Table => print_table(["FIELD", "VALUE"], state_rows(id, state)),
        OutputFormat::Pretty => {
            println!(
                "id={} fw={}.{} pos=({:.3}, {:.3}) speed={:.2} yaw={:.1} \
                 vin={:.2} temp_fet={:.1} fault={:?}",
                id,
                state.fw_major,
                state.fw_minor,
                state.px,
                state.py,
                state.speed,
                state.yaw,
                state.vin,
                state.temp_fet,
                state.fault
            );
        }
    }
}

pub fn print_config(id: u8, config: &MainConfig, default: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(EventOutput::Config {
            id,
            default,
            config,
        }),
        OutputFormat::Table => print_table(["FIELD", "VALUE"], config_rows(config)),
        OutputFormat::Pretty => {
            let kind = if default { "default config" } else { "config" };
            println!("id={id} {kind}:");
            for (key, value) in config_rows(config) {
                println!("  {key} = {value}");
            }
        }
    }
}

pub fn print_outcome(outcome: &AckOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(EventOutput::Acknowledged {
            command: outcome.command,
            attempts: outcome.attempts,
            elapsed_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
        }),
        OutputFormat::Table => print_table(
            ["COMMAND", "RESULT"],
            vec![(
                outcome.command.to_string(),
                format!(
                    "acknowledged after {} attempt(s), {} ms",
                    outcome.attempts,
                    outcome.elapsed.as_millis()
                ),
            )],
        ),
        OutputFormat::Pretty => println!(
            "{} acknowledged attempts={} elapsed={:?}",
            outcome.command, outcome.attempts, outcome.elapsed
        ),
    }
}

pub fn print_sent(id: u8, command: CommandId, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(EventOutput::Sent { id, command }),
        OutputFormat::Table | OutputFormat::Pretty => println!("sent {command} to id={id}"),
    }
}

pub fn print_event(event: &Event, format: OutputFormat) {
    match event {
        Event::State { id, state } => return print_state(*id, state, format),
        Event::Config {
            id,
            config,
            default,
        } => return print_config(*id, config, *default, format),
        _ => {}
    }

    let out = match event {
        Event::Print { id, text } => EventOutput::Print { id: *id, text },
        Event::VescForward { id, data } => forward(*id, "vesc", data.len()),
        Event::Rtcm { id, data } => forward(*id, "rtcm", data.len()),
        Event::Nmea { id, data } => forward(*id, "nmea", data.len()),
        Event::Ack { id, command } => EventOutput::Ack {
            id: *id,
            command: *command,
        },
        Event::Command(packet) => EventOutput::Command {
            id: packet.id,
            command: packet.command.id(),
        },
        Event::State { .. } | Event::Config { .. } => return,
    };

    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", describe(&out)),
    }
}

fn forward(id: u8, stream: &'static str, size: usize) -> EventOutput<'static> {
    EventOutput::Forward { id, stream, size }
}

fn describe(out: &EventOutput<'_>) -> String {
    match out {
        EventOutput::Print { id, text } => format!("[{id}] {}", text.trim_end()),
        EventOutput::Forward { id, stream, size } => format!("[{id}] {stream} {size} bytes"),
        EventOutput::Ack { id, command } => format!("[{id}] ack {command}"),
        EventOutput::Command { id, command } => format!("[{id}] {command}"),
        EventOutput::Sent { id, command } => format!("[{id}] sent {command}"),
        EventOutput::State { id, .. } => format!("[{id}] state"),
        EventOutput::Config { id, .. } => format!("[{id}] config"),
        EventOutput::Acknowledged { command, .. } => format!("{command} acknowledged"),
    }
}

fn state_rows(id: u8, s: &StateReport) -> Vec<(String, String)> {
    vec![
        ("id".into(), id.to_string()),
        ("firmware".into(), format!("{}.{}", s.fw_major, s.fw_minor)),
        ("roll / pitch / yaw".into(), triple([s.roll, s.pitch, s.yaw])),
        ("accel".into(), triple(s.accel)),
        ("gyro".into(), triple(s.gyro)),
        ("mag".into(), triple(s.mag)),
        (
            "q".into(),
            format!("{:.4}, {:.4}, {:.4}, {:.4}", s.q[0], s.q[1], s.q[2], s.q[3]),
        ),
        ("position".into(), format!("{:.3}, {:.3}", s.px, s.py)),
        ("speed".into(), format!("{:.2}", s.speed)),
        ("vin".into(), format!("{:.2}", s.vin)),
        ("temp_fet".into(), format!("{:.1}", s.temp_fet)),
        ("fault".into(), format!("{:?}", s.fault)),
    ]
}

fn config_rows(c: &MainConfig) -> Vec<(String, String)> {
    let m = &c.mag_cal_matrix;
    vec![
        ("mag_comp".into(), c.mag_comp.to_string()),
        ("yaw_imu_gain".into(), c.yaw_imu_gain.to_string()),
        ("mag_cal_center".into(), triple(c.mag_cal_center)),
        (
            "mag_cal_matrix".into(),
            format!("[{}] [{}] [{}]", triple(m[0]), triple(m[1]), triple(m[2])),
        ),
        ("gear_ratio".into(), c.gear_ratio.to_string()),
        ("wheel_diam".into(), c.wheel_diam.to_string()),
        ("motor_poles".into(), c.motor_poles.to_string()),
        (
            "steering_max_angle_rad".into(),
            c.steering_max_angle_rad.to_string(),
        ),
        ("steering_center".into(), c.steering_center.to_string()),
        ("steering_left".into(), c.steering_left.to_string()),
        ("steering_right".into(), c.steering_right.to_string()),
        ("steering_ramp_time".into(), c.steering_ramp_time.to_string()),
        ("axis_distance".into(), c.axis_distance.to_string()),
    ]
}

fn triple(v: [f64; 3]) -> String {
    format!("{:.3}, {:.3}, {:.3}", v[0], v[1], v[2])
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
