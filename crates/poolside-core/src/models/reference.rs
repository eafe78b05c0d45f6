//! Reference snapshot: events, heats and swimmers loaded once per session

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A meet event (e.g. "Girls 8&U 100 Medley Relay")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub number: i64,
    pub name: String,
}

/// A heat within an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heat {
    pub id: i64,
    pub event_id: i64,
    pub number: i64,
}

/// A swimmer seeded into a lane of a heat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swimmer {
    pub id: i64,
    pub heat_id: i64,
    pub lane: i64,
    pub name: String,
    pub team: String,
}

/// Immutable dataset supplied by the reference-data loader
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceSnapshot {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub heats: Vec<Heat>,
    #[serde(default)]
    pub swimmers: Vec<Swimmer>,
}

impl ReferenceSnapshot {
    /// Parse a snapshot from its JSON form and check internal references
    pub fn from_json(payload: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(payload)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Read and parse a snapshot file
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Every heat must point at a known event, every swimmer at a known heat.
    pub fn validate(&self) -> Result<()> {
        for heat in &self.heats {
            if !self.events.iter().any(|event| event.id == heat.event_id) {
                return Err(Error::InvalidInput(format!(
                    "heat {} references unknown event {}",
                    heat.id, heat.event_id
                )));
            }
        }
        for swimmer in &self.swimmers {
            if !self.heats.iter().any(|heat| heat.id == swimmer.heat_id) {
                return Err(Error::InvalidInput(format!(
                    "swimmer {} references unknown heat {}",
                    swimmer.id, swimmer.heat_id
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.heats.is_empty() && self.swimmers.is_empty()
    }

    /// Small built-in meet used for demos and first-run seeding
    #[must_use]
    pub fn demo() -> Self {
        let event = |id: i64, name: &str| Event {
            id,
            number: id,
            name: name.to_string(),
        };
        let swimmer = |id: i64, lane: i64, name: &str, team: &str| Swimmer {
            id,
            heat_id: 1,
            lane,
            name: name.to_string(),
            team: team.to_string(),
        };

        Self {
            events: vec![
                event(1, "Girls 8&U 100 Medley Relay"),
                event(2, "Boys 8&U 100 Medley Relay"),
                event(3, "Girls 9-10 200 Medley Relay"),
            ],
            heats: vec![
                Heat {
                    id: 1,
                    event_id: 1,
                    number: 1,
                },
                Heat {
                    id: 2,
                    event_id: 1,
                    number: 2,
                },
            ],
            swimmers: vec![
                swimmer(1, 1, "Alice Smith", "FAST"),
                swimmer(2, 2, "Bob Jones", "FAST"),
                swimmer(3, 3, "Charlie Brown", "SLOW"),
                swimmer(4, 4, "Daisy Miller", "SLOW"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_snapshot_is_consistent() {
        let demo = ReferenceSnapshot::demo();
        demo.validate().unwrap();
        assert_eq!(demo.events.len(), 3);
        assert_eq!(demo.swimmers.len(), 4);
    }

    #[test]
    fn from_json_rejects_dangling_heat() {
        let payload = r#"{
            "events": [{ "id": 1, "number": 1, "name": "Event 1" }],
            "heats": [{ "id": 10, "event_id": 2, "number": 1 }]
        }"#;
        let error = ReferenceSnapshot::from_json(payload).unwrap_err();
        assert!(error.to_string().contains("unknown event 2"));
    }

    #[test]
    fn from_json_rejects_unknown_fields() {
        let payload = r#"{ "events": [], "relays": [] }"#;
        assert!(ReferenceSnapshot::from_json(payload).is_err());
    }

    #[test]
    fn from_json_parses_full_snapshot() {
        let payload = r#"{
            "events": [{ "id": 101, "number": 1, "name": "Event 1" }],
            "heats": [{ "id": 10, "event_id": 101, "number": 1 }],
            "swimmers": [{ "id": 505, "heat_id": 10, "lane": 4, "name": "John Doe", "team": "T1" }]
        }"#;
        let snapshot = ReferenceSnapshot::from_json(payload).unwrap();
        assert_eq!(snapshot.swimmers[0].id, 505);
        assert!(!snapshot.is_empty());
    }
}
