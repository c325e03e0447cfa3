//! SQLite storage backend for Scholia

use super::traits::{BatchSummary, OpenStore, SnapshotStore, StorageError, StorageResult};
use crate::graph::{
    BatchId, Concept, ConceptId, ConceptRelationship, GraphSnapshot, QualityReport, RelationshipKind,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed snapshot store
///
/// Uses a single SQLite database file with tables for batches, concepts and
/// relationships. Thread-safe via internal mutex on the connection.
///
/// Saving a batch replaces every row it owned inside one transaction, so a
/// reader opening the same file never sees half of a rebuilt batch.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- One row per published batch
            CREATE TABLE IF NOT EXISTS batches (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                report_json TEXT NOT NULL
            );

            -- Concepts keep their hierarchy insertion order in `position`
            CREATE TABLE IF NOT EXISTS concepts (
                batch_id TEXT NOT NULL,
                id TEXT NOT NULL,
                position INTEGER NOT NULL,
                canonical_name TEXT NOT NULL,
                category TEXT NOT NULL,
                confidence REAL NOT NULL,
                parent_id TEXT,
                concept_json TEXT NOT NULL,
                PRIMARY KEY (batch_id, id),
                FOREIGN KEY (batch_id) REFERENCES batches(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_concepts_name
                ON concepts(batch_id, canonical_name);
            CREATE INDEX IF NOT EXISTS idx_concepts_parent
                ON concepts(batch_id, parent_id);

            CREATE TABLE IF NOT EXISTS relationships (
                batch_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                from_id TEXT NOT NULL,
                to_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                strength REAL NOT NULL,
                evidence_count INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                last_reinforced TEXT NOT NULL,
                PRIMARY KEY (batch_id, from_id, to_id, kind),
                FOREIGN KEY (batch_id) REFERENCES batches(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_relationships_from
                ON relationships(batch_id, from_id);
            CREATE INDEX IF NOT EXISTS idx_relationships_to
                ON relationships(batch_id, to_id);

            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- Concurrent reads while a batch is being written
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn parse_time(value: &str) -> StorageResult<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(value)
            .map_err(|e| StorageError::DateParse(e.to_string()))?
            .with_timezone(&Utc))
    }

    fn parse_concept_id(batch: &BatchId, value: &str) -> StorageResult<ConceptId> {
        ConceptId::parse(value).ok_or_else(|| StorageError::Corrupt {
            batch: batch.to_string(),
            reason: format!("invalid concept id '{value}'"),
        })
    }

    /// Serialize a relationship to database columns
    #[allow(clippy::type_complexity)]
    fn relationship_to_row(
        rel: &ConceptRelationship,
    ) -> (String, String, &'static str, f64, i64, String, String) {
        (
            rel.from.to_string(),
            rel.to.to_string(),
            rel.kind.as_str(),
            rel.strength,
            i64::from(rel.evidence_count),
            rel.created_at.to_rfc3339(),
            rel.last_reinforced.to_rfc3339(),
        )
    }

    /// Deserialize a relationship from database columns
    #[allow(clippy::too_many_arguments)]
    fn row_to_relationship(
        batch: &BatchId,
        from_id: String,
        to_id: String,
        kind: String,
        strength: f64,
        evidence_count: i64,
        created_at: String,
        last_reinforced: String,
    ) -> StorageResult<ConceptRelationship> {
        let kind = RelationshipKind::parse(&kind).ok_or_else(|| StorageError::Corrupt {
            batch: batch.to_string(),
            reason: format!("unknown relationship kind '{kind}'"),
        })?;
        Ok(ConceptRelationship {
            from: Self::parse_concept_id(batch, &from_id)?,
            to: Self::parse_concept_id(batch, &to_id)?,
            kind,
            strength,
            evidence_count: u32::try_from(evidence_count).unwrap_or(u32::MAX),
            created_at: Self::parse_time(&created_at)?,
            last_reinforced: Self::parse_time(&last_reinforced)?,
        })
    }

    /// Canonical names stored for a batch, in insertion order
    pub fn concept_names(&self, id: &BatchId) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT canonical_name FROM concepts WHERE batch_id = ?1 ORDER BY position")?;
        let names = stmt
            .query_map(params![id.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl SnapshotStore for SqliteStore {
    fn save_snapshot(&self, snapshot: &GraphSnapshot) -> StorageResult<()> {
        let batch = snapshot.batch_id().as_str();
        let report_json = serde_json::to_string(snapshot.report())?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // Replace the whole batch: cascade removes the old concept and
        // relationship rows.
        tx.execute("DELETE FROM batches WHERE id = ?1", params![batch])?;
        tx.execute(
            "INSERT INTO batches (id, created_at, report_json) VALUES (?1, ?2, ?3)",
            params![batch, snapshot.created_at().to_rfc3339(), report_json],
        )?;

        {
            let mut insert = tx.prepare(
                r#"
                INSERT INTO concepts (batch_id, id, position, canonical_name, category, confidence, parent_id, concept_json)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;
            for (position, concept) in snapshot.hierarchy().concepts().enumerate() {
                insert.execute(params![
                    batch,
                    concept.id.to_string(),
                    position as i64,
                    concept.canonical_name,
                    concept.category,
                    concept.confidence,
                    concept.parent.map(|p| p.to_string()),
                    serde_json::to_string(concept)?,
                ])?;
            }
        }

        {
            let mut insert = tx.prepare(
                r#"
                INSERT INTO relationships (batch_id, position, from_id, to_id, kind, strength,
                                           evidence_count, created_at, last_reinforced)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;
            for (position, rel) in snapshot.graph().relationships().enumerate() {
                let (from, to, kind, strength, evidence_count, created, reinforced) =
                    Self::relationship_to_row(rel);
                insert.execute(params![
                    batch,
                    position as i64,
                    from,
                    to,
                    kind,
                    strength,
                    evidence_count,
                    created,
                    reinforced
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(
            batch,
            concepts = snapshot.hierarchy().len(),
            "saved snapshot"
        );
        Ok(())
    }

    fn load_snapshot(&self, id: &BatchId) -> StorageResult<Option<GraphSnapshot>> {
        let conn = self.conn.lock().unwrap();

        let batch_row: Option<(String, String)> = conn
            .query_row(
                "SELECT created_at, report_json FROM batches WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((created_at, report_json)) = batch_row else {
            return Ok(None);
        };
        let created_at = Self::parse_time(&created_at)?;
        let report: QualityReport = serde_json::from_str(&report_json)?;

        let mut stmt =
            conn.prepare("SELECT concept_json FROM concepts WHERE batch_id = ?1 ORDER BY position")?;
        let concepts = stmt
            .query_map(params![id.as_str()], |row| row.get::<_, String>(0))?
            .map(|json| Ok(serde_json::from_str::<Concept>(&json?)?))
            .collect::<StorageResult<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT from_id, to_id, kind, strength, evidence_count, created_at, last_reinforced
            FROM relationships WHERE batch_id = ?1 ORDER BY position
            "#,
        )?;
        let rows = stmt.query_map(params![id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;
        let mut relationships = Vec::new();
        for row in rows {
            let (from, to, kind, strength, evidence_count, created, reinforced) = row?;
            relationships.push(Self::row_to_relationship(
                id,
                from,
                to,
                kind,
                strength,
                evidence_count,
                created,
                reinforced,
            )?);
        }

        let snapshot = GraphSnapshot::restore(id.clone(), created_at, concepts, relationships, report)
            .map_err(|e| StorageError::Corrupt {
                batch: id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(snapshot))
    }

    fn delete_snapshot(&self, id: &BatchId) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute("DELETE FROM batches WHERE id = ?1", params![id.as_str()])?;
        Ok(rows > 0)
    }

    fn list_batches(&self) -> StorageResult<Vec<BatchId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM batches ORDER BY created_at, id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|r| r.map(BatchId::from_string))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn batch_summaries(&self) -> StorageResult<Vec<BatchSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT b.id, b.created_at,
                   (SELECT COUNT(*) FROM concepts c WHERE c.batch_id = b.id),
                   (SELECT COUNT(*) FROM relationships r WHERE r.batch_id = b.id)
            FROM batches b ORDER BY b.created_at, b.id
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;
        let mut summaries = Vec::new();
        for row in rows {
            let (id, created_at, concepts, relationships) = row?;
            summaries.push(BatchSummary {
                batch_id: BatchId::from_string(id),
                created_at: Self::parse_time(&created_at)?,
                concept_count: concepts as usize,
                relationship_count: relationships as usize,
            });
        }
        Ok(summaries)
    }
}
