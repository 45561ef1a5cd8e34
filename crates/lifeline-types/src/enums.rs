//! Enumeration types for the Lifeline dispatch backend.
//!
//! The wire and storage representation of every enum is its lowercase
//! name (`"emergency"`, `"enroute"`, ...). `as_str` and [`FromStr`] give the
//! same spelling for the `TEXT` columns in `PostgreSQL`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A stored or submitted enum string that matches no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    /// Name of the enum that failed to parse.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Implements `as_str`, [`Display`](core::fmt::Display) and [`FromStr`](core::str::FromStr)
/// for a fieldless enum using its lowercase wire names.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Lowercase wire/storage spelling of this variant.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl core::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// How urgent a detected incident is.
///
/// Only [`Severity::Emergency`] events trigger automatic dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Severity {
    /// Logged for operators, no unit is sent.
    Informational,
    /// Requires an ambulance.
    Emergency,
}

string_enum!(Severity {
    Informational => "informational",
    Emergency => "emergency",
});

/// Lifecycle of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum EventStatus {
    /// Created and not yet served by any unit.
    Open,
    /// A unit has been claimed for the incident and is on its way.
    Enroute,
    /// Closed, either by the arriving unit or by an operator.
    Resolved,
}

string_enum!(EventStatus {
    Open => "open",
    Enroute => "enroute",
    Resolved => "resolved",
});

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Stored availability of an ambulance.
///
/// Deliberately three-valued: which half of a round trip an enroute unit
/// is on lives in [`Leg`], and [`UnitPhase`] combines both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum UnitStatus {
    /// Parked and available for dispatch.
    Idle,
    /// Claimed and moving (outbound or returning).
    Enroute,
    /// Out of service; never selected by the matcher.
    Unavailable,
}

string_enum!(UnitStatus {
    Idle => "idle",
    Enroute => "enroute",
    Unavailable => "unavailable",
});

/// Which half of a round trip an enroute unit is walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Leg {
    /// From the unit's base towards the incident.
    Outbound,
    /// From the incident back to the base.
    Return,
}

string_enum!(Leg {
    Outbound => "outbound",
    Return => "return",
});

/// Explicit state-machine position of a unit.
///
/// `Idle -> EnrouteOutbound -> EnrouteReturn -> Idle`, with `Unavailable`
/// outside the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum UnitPhase {
    /// Available for dispatch.
    Idle,
    /// Driving to the incident.
    EnrouteOutbound,
    /// Driving back to base.
    EnrouteReturn,
    /// Out of service.
    Unavailable,
}

// ---------------------------------------------------------------------------
// Live channel
// ---------------------------------------------------------------------------

/// A collection that can be pushed to live observers as a full snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum EntityKind {
    /// The `ambulances` collection. Serialized as `"ambulances"` to match
    /// the dashboard's message type.
    #[serde(rename = "ambulances")]
    Units,
    /// The `events` collection.
    Events,
    /// The `cameras` collection.
    Cameras,
}

string_enum!(EntityKind {
    Units => "ambulances",
    Events => "events",
    Cameras => "cameras",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn storage_spelling_matches_serde() {
        for status in [UnitStatus::Idle, UnitStatus::Enroute, UnitStatus::Unavailable] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::Value::String(status.as_str().to_owned()));
            assert_eq!(status.as_str().parse::<UnitStatus>().unwrap(), status);
        }
    }

    #[test]
    fn entity_kind_uses_dashboard_names() {
        assert_eq!(
            serde_json::to_value(EntityKind::Units).unwrap(),
            serde_json::json!("ambulances")
        );
        assert_eq!(EntityKind::Events.to_string(), "events");
    }

    #[test]
    fn unknown_variant_is_reported() {
        let err = "returning".parse::<UnitStatus>().unwrap_err();
        assert_eq!(err.kind, "UnitStatus");
        assert_eq!(err.value, "returning");
    }
}
