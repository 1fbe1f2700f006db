//! Typed values found in status data
//!
//! Nagios writes these as integer codes. Each type also parses from its
//! canonical name, so the same types can be used for values that arrive from
//! users.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::schema::{CoerceError, FieldKind, FieldValue};

/// A value did not match any known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value '{0}'")]
pub struct UnknownValue(pub String);

/// Current state of a service check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceState {
    #[default]
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl ServiceState {
    pub fn code(&self) -> i64 {
        *self as i64
    }
}

impl FromStr for ServiceState {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ok" | "0" => Ok(ServiceState::Ok),
            "warning" | "1" => Ok(ServiceState::Warning),
            "critical" | "2" => Ok(ServiceState::Critical),
            "unknown" | "3" => Ok(ServiceState::Unknown),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Ok => write!(f, "OK"),
            ServiceState::Warning => write!(f, "WARNING"),
            ServiceState::Critical => write!(f, "CRITICAL"),
            ServiceState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Current state of a host check
///
/// Depending on the type of host check, `DOWN` may also cover hosts that are
/// unreachable (raw state) or only hosts that are down (processed state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HostState {
    #[default]
    Up,
    Down,
    Unreachable,
}

impl HostState {
    pub fn code(&self) -> i64 {
        *self as i64
    }
}

impl FromStr for HostState {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" | "0" => Ok(HostState::Up),
            "down" | "1" => Ok(HostState::Down),
            "unreachable" | "2" => Ok(HostState::Unreachable),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostState::Up => write!(f, "UP"),
            HostState::Down => write!(f, "DOWN"),
            HostState::Unreachable => write!(f, "UNREACHABLE"),
        }
    }
}

/// Whether a check is scheduled by Nagios (active) or fed by an external system (passive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum CheckType {
    #[default]
    Active,
    Passive,
}

impl FromStr for CheckType {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" | "0" => Ok(CheckType::Active),
            "passive" | "1" => Ok(CheckType::Passive),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckType::Active => write!(f, "Active"),
            CheckType::Passive => write!(f, "Passive"),
        }
    }
}

/// Whether a check result is in the SOFT or HARD state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StateType {
    #[default]
    Soft,
    Hard,
}

impl FromStr for StateType {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SOFT" | "0" => Ok(StateType::Soft),
            "HARD" | "1" => Ok(StateType::Hard),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateType::Soft => write!(f, "SOFT"),
            StateType::Hard => write!(f, "HARD"),
        }
    }
}

/// Acknowledgement of a problem
///
/// A sticky acknowledgement stays until the check returns to OK; a normal
/// one is cleared on the next state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum AcknowledgementType {
    #[default]
    None,
    Normal,
    Sticky,
}

impl FromStr for AcknowledgementType {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "0" => Ok(AcknowledgementType::None),
            "normal" | "1" => Ok(AcknowledgementType::Normal),
            "sticky" | "2" => Ok(AcknowledgementType::Sticky),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

impl fmt::Display for AcknowledgementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcknowledgementType::None => write!(f, "None"),
            AcknowledgementType::Normal => write!(f, "Normal"),
            AcknowledgementType::Sticky => write!(f, "Sticky"),
        }
    }
}

/// Bitmask of attributes changed at runtime through external commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct ModifiedAttributes(pub u64);

impl ModifiedAttributes {
    pub const NOTIFICATIONS_ENABLED: Self = Self(1 << 0);
    pub const ACTIVE_CHECKS_ENABLED: Self = Self(1 << 1);
    pub const PASSIVE_CHECKS_ENABLED: Self = Self(1 << 2);
    pub const EVENT_HANDLER_ENABLED: Self = Self(1 << 3);
    pub const FLAP_DETECTION_ENABLED: Self = Self(1 << 4);
    pub const FAILURE_PREDICTION_ENABLED: Self = Self(1 << 5);
    pub const PERFORMANCE_DATA_ENABLED: Self = Self(1 << 6);
    pub const OBSESSIVE_HANDLER_ENABLED: Self = Self(1 << 7);
    pub const EVENT_HANDLER_COMMAND: Self = Self(1 << 8);
    pub const CHECK_COMMAND: Self = Self(1 << 9);
    pub const NORMAL_CHECK_INTERVAL: Self = Self(1 << 10);
    pub const RETRY_CHECK_INTERVAL: Self = Self(1 << 11);
    pub const MAX_CHECK_ATTEMPTS: Self = Self(1 << 12);
    pub const FRESHNESS_CHECKS_ENABLED: Self = Self(1 << 13);
    pub const CHECK_TIMEPERIOD: Self = Self(1 << 14);
    pub const CUSTOM_VARIABLE: Self = Self(1 << 15);
    pub const NOTIFICATION_TIMEPERIOD: Self = Self(1 << 16);

    const NAMES: [(Self, &'static str); 17] = [
        (Self::NOTIFICATIONS_ENABLED, "Notifications Enabled"),
        (Self::ACTIVE_CHECKS_ENABLED, "Active Checks Enabled"),
        (Self::PASSIVE_CHECKS_ENABLED, "Passive Checks Enabled"),
        (Self::EVENT_HANDLER_ENABLED, "Event Handler Enabled"),
        (Self::FLAP_DETECTION_ENABLED, "Flap Detection Enabled"),
        (Self::FAILURE_PREDICTION_ENABLED, "Failure Prediction Enabled"),
        (Self::PERFORMANCE_DATA_ENABLED, "Performance Data Enabled"),
        (Self::OBSESSIVE_HANDLER_ENABLED, "Obsessive Handler Enabled"),
        (Self::EVENT_HANDLER_COMMAND, "Event Handler Command"),
        (Self::CHECK_COMMAND, "Check Command"),
        (Self::NORMAL_CHECK_INTERVAL, "Normal Check Interval"),
        (Self::RETRY_CHECK_INTERVAL, "Retry Check Interval"),
        (Self::MAX_CHECK_ATTEMPTS, "Max Check Attempts"),
        (Self::FRESHNESS_CHECKS_ENABLED, "Freshness Checks Enabled"),
        (Self::CHECK_TIMEPERIOD, "Check Timeperiod"),
        (Self::CUSTOM_VARIABLE, "Custom Variable"),
        (Self::NOTIFICATION_TIMEPERIOD, "Notification Timeperiod"),
    ];

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ModifiedAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join(", "))
    }
}

impl FromStr for ModifiedAttributes {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(Self)
            .map_err(|_| UnknownValue(s.to_string()))
    }
}

macro_rules! integer_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                const KIND: FieldKind = FieldKind::Integer;

                fn parse_field(raw: &str) -> Result<Self, CoerceError> {
                    raw.parse().map_err(|_| CoerceError::new(Self::KIND, raw))
                }
            }
        )*
    };
}

integer_field!(
    ServiceState,
    HostState,
    CheckType,
    StateType,
    AcknowledgementType,
    ModifiedAttributes,
);
