//! Shared types for the conveyor simulation

use serde::{Deserialize, Serialize};

/// Newtype wrapper for object IDs to provide type safety
///
/// IDs are allocated monotonically by the registry and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ObjectId(pub u64);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operating regime of the conveyor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    #[default]
    Normal,
    Wear,
    Jam,
}

impl std::str::FromStr for Regime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Regime::Normal),
            "wear" => Ok(Regime::Wear),
            "jam" => Ok(Regime::Jam),
            other => Err(anyhow::anyhow!("unknown regime '{}'", other)),
        }
    }
}

impl Regime {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Normal => "normal",
            Regime::Wear => "wear",
            Regime::Jam => "jam",
        }
    }

    /// Operator-facing status line for this regime
    pub fn status_label(&self) -> &'static str {
        match self {
            Regime::Normal => "STATUS: NORMAL",
            Regime::Wear => "WARNING: BEARING WEAR",
            Regime::Jam => "CRITICAL: JAM DETECTED",
        }
    }

    pub fn alert_level(&self) -> AlertLevel {
        match self {
            Regime::Normal => AlertLevel::Ok,
            Regime::Wear => AlertLevel::Warning,
            Regime::Jam => AlertLevel::Critical,
        }
    }
}

/// Severity shown alongside the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Ok,
    Warning,
    Critical,
}

/// Discrete operator commands accepted between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetRegime(Regime),
    Quit,
}

impl std::str::FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("quit") {
            return Ok(Command::Quit);
        }
        s.parse::<Regime>().map(Command::SetRegime)
    }
}

/// Visual state of the optical sensor gate for the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Active,
    #[default]
    Clear,
}

impl GateState {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::Active => "active",
            GateState::Clear => "clear",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regime_from_str() {
        assert_eq!("normal".parse::<Regime>().unwrap(), Regime::Normal);
        assert_eq!("WEAR".parse::<Regime>().unwrap(), Regime::Wear);
        assert_eq!(" jam ".parse::<Regime>().unwrap(), Regime::Jam);
        assert!("stalled".parse::<Regime>().is_err());
    }

    #[test]
    fn test_command_from_str() {
        assert_eq!("quit".parse::<Command>().unwrap(), Command::Quit);
        assert_eq!("jam".parse::<Command>().unwrap(), Command::SetRegime(Regime::Jam));
        assert!("reset".parse::<Command>().is_err());
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(Regime::default(), Regime::Normal);
        assert_eq!(Regime::Wear.status_label(), "WARNING: BEARING WEAR");
        assert_eq!(Regime::Jam.alert_level(), AlertLevel::Critical);
        assert_eq!(Regime::Normal.alert_level(), AlertLevel::Ok);
    }

    #[test]
    fn test_gate_state_as_str_matches_wire_name() {
        for gate in [GateState::Active, GateState::Clear] {
            let wire = serde_json::to_string(&gate).unwrap();
            assert_eq!(wire, format!("\"{}\"", gate.as_str()));
        }
        assert_eq!(GateState::default().as_str(), "clear");
    }
}
