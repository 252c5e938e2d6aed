use serde::{Deserialize, Serialize};

/// Motor controller fault reported in the vehicle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultCode {
    #[default]
    None,
    OverVoltage,
    UnderVoltage,
    Drv,
    AbsOverCurrent,
    OverTempFet,
    OverTempMotor,
    /// A code newer than this crate; kept verbatim.
    Unknown(u8),
}

impl FaultCode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::None,
            1 => Self::OverVoltage,
            2 => Self::UnderVoltage,
            3 => Self::Drv,
            4 => Self::AbsOverCurrent,
            5 => Self::OverTempFet,
            6 => Self::OverTempMotor,
            other => Self::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::OverVoltage => 1,
            Self::UnderVoltage => 2,
            Self::Drv => 3,
            Self::AbsOverCurrent => 4,
            Self::OverTempFet => 5,
            Self::OverTempMotor => 6,
            Self::Unknown(other) => other,
        }
    }
}

/// How the RC control value is interpreted by the motor controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RcMode {
    /// Value is a motor current in amperes.
    Current = 0,
    /// Value is a duty cycle in -1.0..=1.0.
    Duty = 1,
}

impl RcMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Current),
            1 => Some(Self::Duty),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Full vehicle state, as reported in response to a state request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateReport {
    pub fw_major: u8,
    pub fw_minor: u8,
    /// Attitude in degrees.
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub accel: [f64; 3],
    pub gyro: [f64; 3],
    pub mag: [f64; 3],
    /// Orientation quaternion (w, x, y, z).
    pub q: [f64; 4],
    /// Position in meters.
    pub px: f64,
    pub py: f64,
    /// Speed in m/s.
    pub speed: f64,
    /// Motor controller input voltage.
    pub vin: f64,
    /// Motor controller FET temperature in °C.
    pub temp_fet: f64,
    pub fault: FaultCode,
}

/// Vehicle main configuration.
///
/// Magnetometer calibration, drivetrain and steering geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MainConfig {
    /// Use magnetometer compensation for yaw.
    pub mag_comp: bool,
    pub yaw_imu_gain: f64,
    /// Hard-iron offset (x, y, z).
    pub mag_cal_center: [f64; 3],
    /// Soft-iron correction matrix, row major.
    pub mag_cal_matrix: [[f64; 3]; 3],
    pub gear_ratio: f64,
    /// Wheel diameter in meters.
    pub wheel_diam: f64,
    pub motor_poles: f64,
    pub steering_max_angle_rad: f64,
    /// Servo positions (0.0..=1.0).
    pub steering_center: f64,
    pub steering_left: f64,
    pub steering_right: f64,
    /// Seconds from center to full lock.
    pub steering_ramp_time: f64,
    /// Distance between front and rear axle in meters.
    pub axis_distance: f64,
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            mag_comp: false,
            yaw_imu_gain: 0.0,
            mag_cal_center: [0.0; 3],
            mag_cal_matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            gear_ratio: 0.0,
            wheel_diam: 0.0,
            motor_poles: 0.0,
            steering_max_angle_rad: 0.0,
            steering_center: 0.5,
            steering_left: 0.0,
            steering_right: 1.0,
            steering_ramp_time: 0.0,
            axis_distance: 0.0,
        }
    }
}

/// One autopilot route point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    /// Position in meters.
    pub x: f64,
    pub y: f64,
    /// Target speed in m/s.
    pub speed: f64,
    /// Caller-side time tag. Not carried on the wire, so decoded points
    /// always have `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

impl RoutePoint {
    pub fn new(x: f64, y: f64, speed: f64) -> Self {
        Self {
            x,
            y,
            speed,
            time: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_code_preserves_unknown_values() {
        for raw in 0..=u8::MAX {
            assert_eq!(FaultCode::from_u8(raw).as_u8(), raw);
        }
        assert_eq!(FaultCode::from_u8(9), FaultCode::Unknown(9));
    }

    #[test]
    fn rc_mode_values() {
        assert_eq!(RcMode::from_u8(0), Some(RcMode::Current));
        assert_eq!(RcMode::from_u8(1), Some(RcMode::Duty));
        assert_eq!(RcMode::from_u8(2), None);
    }

    #[test]
    fn main_config_accepts_partial_json() {
        let conf: MainConfig =
            serde_json::from_str(r#"{ "gear_ratio": 0.1, "mag_comp": true }"#).unwrap();
        assert!(conf.mag_comp);
        assert_eq!(conf.gear_ratio, 0.1);
        assert_eq!(conf.mag_cal_matrix, MainConfig::default().mag_cal_matrix);
    }

    #[test]
    fn route_point_time_is_optional_in_json() {
        let point: RoutePoint = serde_json::from_str(r#"{"x":1.5,"y":-2.0,"speed":3.0}"#).unwrap();
        assert_eq!(point, RoutePoint::new(1.5, -2.0, 3.0));
        assert_eq!(
            serde_json::to_string(&point).unwrap(),
            r#"{"x":1.5,"y":-2.0,"speed":3.0}"#
        );
    }
}
