//! Discrete lifecycle notifications handed to logging and statistics consumers.

use eco_core::{
    BiomeType, EnvironmentalEventType, EventId, GeologicalEventType, Position,
    TransitionTrigger,
};
use serde::{Deserialize, Serialize};

/// Why an environmental event left the active set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Duration ran out
    Expired,
    /// Intensity fell to the termination threshold
    Extinguished,
}

/// What drove a biome change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    Rule(TransitionTrigger),
    Event(EnvironmentalEventType),
    /// Reclassified after a geological event reshaped the terrain
    Terrain(GeologicalEventType),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventStartDetails {
    pub radius: f64,
    pub max_radius: f64,
    pub intensity: f64,
    pub duration: i64,
    pub wind_sensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventEndDetails {
    pub reason: EndReason,
    pub final_intensity: f64,
    pub final_radius: f64,
    pub affected_cells: usize,
    pub ticks_active: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionDetails {
    pub from: BiomeType,
    pub to: BiomeType,
    pub cause: TransitionCause,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeologicalDetails {
    pub radius: f64,
    pub intensity: f64,
    pub duration: i64,
}

/// A lifecycle record emitted during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Notification {
    EventStart {
        tick: u64,
        event_id: EventId,
        event_type: EnvironmentalEventType,
        position: Position,
        details: EventStartDetails,
    },
    EventEnd {
        tick: u64,
        event_id: EventId,
        event_type: EnvironmentalEventType,
        position: Position,
        details: EventEndDetails,
    },
    BiomeTransition {
        tick: u64,
        position: Position,
        details: TransitionDetails,
    },
    GeologicalEvent {
        tick: u64,
        event_type: GeologicalEventType,
        position: Position,
        details: GeologicalDetails,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::EventStart { .. } => "event-start",
            Notification::EventEnd { .. } => "event-end",
            Notification::BiomeTransition { .. } => "biome-transition",
            Notification::GeologicalEvent { .. } => "geological-event",
        }
    }

    pub fn tick(&self) -> u64 {
        match self {
            Notification::EventStart { tick, .. }
            | Notification::EventEnd { tick, .. }
            | Notification::BiomeTransition { tick, .. }
            | Notification::GeologicalEvent { tick, .. } => *tick,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Notification::EventStart { position, .. }
            | Notification::EventEnd { position, .. }
            | Notification::BiomeTransition { position, .. }
            | Notification::GeologicalEvent { position, .. } => *position,
        }
    }
}

/// Running totals of notifications by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCounts {
    pub event_start: u64,
    pub event_end: u64,
    pub biome_transition: u64,
    pub geological_event: u64,
}

impl NotificationCounts {
    pub fn record(&mut self, notification: &Notification) {
        match notification {
            Notification::EventStart { .. } => self.event_start += 1,
            Notification::EventEnd { .. } => self.event_end += 1,
            Notification::BiomeTransition { .. } => self.biome_transition += 1,
            Notification::GeologicalEvent { .. } => self.geological_event += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.event_start + self.event_end + self.biome_transition + self.geological_event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let n = Notification::BiomeTransition {
            tick: 7,
            position: Position::new(1.0, 2.0),
            details: TransitionDetails {
                from: BiomeType::Forest,
                to: BiomeType::Wasteland,
                cause: TransitionCause::Event(EnvironmentalEventType::Wildfire),
            },
        };
        assert_eq!(n.kind(), "biome-transition");
        assert_eq!(n.tick(), 7);
        assert_eq!(n.position(), Position::new(1.0, 2.0));
    }

    #[test]
    fn test_serialized_tag() {
        let n = Notification::GeologicalEvent {
            tick: 3,
            event_type: GeologicalEventType::Rift,
            position: Position::new(0.0, 0.0),
            details: GeologicalDetails {
                radius: 3.0,
                intensity: 0.5,
                duration: 10,
            },
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "geological-event");
        assert_eq!(json["tick"], 3);
    }

    #[test]
    fn test_counts() {
        let mut counts = NotificationCounts::default();
        counts.record(&Notification::GeologicalEvent {
            tick: 0,
            event_type: GeologicalEventType::Earthquake,
            position: Position::default(),
            details: GeologicalDetails {
                radius: 1.0,
                intensity: 0.1,
                duration: 1,
            },
        });
        assert_eq!(counts.geological_event, 1);
        assert_eq!(counts.total(), 1);
    }
}
