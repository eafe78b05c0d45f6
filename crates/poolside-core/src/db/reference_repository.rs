//! Reference snapshot repository implementation

use crate::error::Result;
use crate::models::{Event, Heat, ReferenceSnapshot, Swimmer};
use rusqlite::{params, Connection};

/// Read access to the event/heat/swimmer snapshot
pub trait ReferenceRepository {
    /// Events ordered by event number
    fn list_events(&self) -> Result<Vec<Event>>;

    /// Heats of an event ordered by heat number
    fn list_heats_by_event(&self, event_id: i64) -> Result<Vec<Heat>>;

    /// Swimmers of a heat ordered by lane
    fn list_swimmers_by_heat(&self, heat_id: i64) -> Result<Vec<Swimmer>>;

    fn event_exists(&self, event_id: i64) -> Result<bool>;

    fn swimmer_exists(&self, swimmer_id: i64) -> Result<bool>;

    /// Replace the whole snapshot in one transaction
    fn replace_snapshot(&self, snapshot: &ReferenceSnapshot) -> Result<()>;
}

/// `SQLite` implementation of `ReferenceRepository`
pub struct SqliteReferenceRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteReferenceRepository<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn exists(&self, sql: &str, id: i64) -> Result<bool> {
        let exists = self.conn.query_row(sql, params![id], |row| row.get(0))?;
        Ok(exists)
    }
}

impl ReferenceRepository for SqliteReferenceRepository<'_> {
    fn list_events(&self) -> Result<Vec<Event>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, number, name FROM events ORDER BY number ASC, id ASC")?;

        let events = stmt
            .query_map([], |row| {
                Ok(Event {
                    id: row.get(0)?,
                    number: row.get(1)?,
                    name: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(events)
    }

    fn list_heats_by_event(&self, event_id: i64) -> Result<Vec<Heat>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_id, number FROM heats WHERE event_id = ?1 ORDER BY number ASC",
        )?;

        let heats = stmt
            .query_map(params![event_id], |row| {
                Ok(Heat {
                    id: row.get(0)?,
                    event_id: row.get(1)?,
                    number: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(heats)
    }

    fn list_swimmers_by_heat(&self, heat_id: i64) -> Result<Vec<Swimmer>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, heat_id, lane, name, team FROM swimmers WHERE heat_id = ?1 ORDER BY lane ASC",
        )?;

        let swimmers = stmt
            .query_map(params![heat_id], |row| {
                Ok(Swimmer {
                    id: row.get(0)?,
                    heat_id: row.get(1)?,
                    lane: row.get(2)?,
                    name: row.get(3)?,
                    team: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(swimmers)
    }

    fn event_exists(&self, event_id: i64) -> Result<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1)", event_id)
    }

    fn swimmer_exists(&self, swimmer_id: i64) -> Result<bool> {
        self.exists("SELECT EXISTS(SELECT 1 FROM swimmers WHERE id = ?1)", swimmer_id)
    }

    fn replace_snapshot(&self, snapshot: &ReferenceSnapshot) -> Result<()> {
        snapshot.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM swimmers;
             DELETE FROM heats;
             DELETE FROM events;",
        )?;

        for event in &snapshot.events {
            tx.execute(
                "INSERT INTO events (id, number, name) VALUES (?1, ?2, ?3)",
                params![event.id, event.number, event.name],
            )?;
        }
        for heat in &snapshot.heats {
            tx.execute(
                "INSERT INTO heats (id, event_id, number) VALUES (?1, ?2, ?3)",
                params![heat.id, heat.event_id, heat.number],
            )?;
        }
        for swimmer in &snapshot.swimmers {
            tx.execute(
                "INSERT INTO swimmers (id, heat_id, lane, name, team) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    swimmer.id,
                    swimmer.heat_id,
                    swimmer.lane,
                    swimmer.name,
                    swimmer.team
                ],
            )?;
        }

        tx.commit()?;
        tracing::info!(
            "Loaded reference snapshot: {} events, {} heats, {} swimmers",
            snapshot.events.len(),
            snapshot.heats.len(),
            snapshot.swimmers.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        SqliteReferenceRepository::new(db.connection())
            .replace_snapshot(&ReferenceSnapshot::demo())
            .unwrap();
        db
    }

    #[test]
    fn test_list_events_ordered_by_number() {
        let db = setup();
        let repo = SqliteReferenceRepository::new(db.connection());

        let numbers: Vec<i64> = repo.list_events().unwrap().iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_heats_and_swimmers_navigation() {
        let db = setup();
        let repo = SqliteReferenceRepository::new(db.connection());

        let heats = repo.list_heats_by_event(1).unwrap();
        assert_eq!(heats.len(), 2);
        assert!(repo.list_heats_by_event(3).unwrap().is_empty());

        let lanes: Vec<i64> = repo
            .list_swimmers_by_heat(heats[0].id)
            .unwrap()
            .iter()
            .map(|s| s.lane)
            .collect();
        assert_eq!(lanes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_existence_checks() {
        let db = setup();
        let repo = SqliteReferenceRepository::new(db.connection());

        assert!(repo.event_exists(1).unwrap());
        assert!(!repo.event_exists(101).unwrap());
        assert!(repo.swimmer_exists(4).unwrap());
        assert!(!repo.swimmer_exists(505).unwrap());
    }

    #[test]
    fn test_replace_snapshot_drops_previous_rows() {
        let db = setup();
        let repo = SqliteReferenceRepository::new(db.connection());

        let replacement = ReferenceSnapshot {
            events: vec![Event {
                id: 101,
                number: 7,
                name: "Mixed 200 Free Relay".into(),
            }],
            ..ReferenceSnapshot::default()
        };
        repo.replace_snapshot(&replacement).unwrap();

        assert_eq!(repo.list_events().unwrap(), replacement.events);
        assert!(!repo.swimmer_exists(1).unwrap());
    }
}
