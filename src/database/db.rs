//! SQLite storage for the word catalog and scheduling records
//!
//! Handles database initialization, catalog CRUD (word lists and words with
//! soft-delete), scheduling record persistence with optimistic versioning,
//! and the simulated current date used by the review desk.

use crate::error::StorageError;
use crate::models::{Catalog, Grade, RecordId, SchedulingRecord, Subject, Word, WordList};
use crate::scheduler::store::{RecordStore, Result, SubjectCatalog};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const RECORD_COLUMNS: &str = "id, learner_id, subject_kind, subject_id, repetition_count, \
     easiness_factor, interval_days, last_reviewed, next_review, last_grade, version";

/// Catalog and scheduling record store backed by one SQLite connection.
///
/// All methods take `&self`; the connection sits behind a mutex so the store
/// can be shared through an `Arc`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path` and its schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        info!(path = %path.display(), "Opened review database");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Simulated current date of the review desk
    pub fn current_date(&self) -> Result<DateTime<Utc>> {
        let conn = self.conn()?;
        let value: String = conn.query_row(
            "SELECT value FROM app_state WHERE key = 'current_date'",
            [],
            |row| row.get(0),
        )?;
        let secs = value
            .parse::<i64>()
            .map_err(|_| StorageError::InvalidValue(format!("current_date '{value}'")))?;
        from_timestamp(secs)
    }

    /// Advances the simulated date by 24 hours
    pub fn advance_day(&self) -> Result<DateTime<Utc>> {
        let next_day = self.current_date()? + Duration::days(1);
        self.conn()?.execute(
            "UPDATE app_state SET value = ?1 WHERE key = 'current_date'",
            params![next_day.timestamp().to_string()],
        )?;
        debug!(date = %next_day, "Advanced simulated date");
        Ok(next_day)
    }

    /// Creates a word list and returns its ID
    pub fn new_word_list(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO word_lists (name) VALUES (?1)", params![name])?;
        let id = conn.last_insert_rowid();
        info!(list_id = id, name, "Word list created");
        Ok(id)
    }

    /// Adds a word to a list and returns its ID
    ///
    /// If the list already contains the term, the existing ID is returned and
    /// the definition is left untouched.
    pub fn add_word(&self, list_name: &str, term: &str, definition: &str) -> Result<i64> {
        let conn = self.conn()?;
        insert_word(&conn, list_name, term, definition)
    }

    /// Creates a list together with its words in one transaction
    pub fn add_word_list(&self, list: &WordList) -> Result<i64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("INSERT INTO word_lists (name) VALUES (?1)", params![list.name])?;
        let list_id = tx.last_insert_rowid();
        for word in &list.words {
            insert_word(&tx, &list.name, &word.term, &word.definition)?;
        }
        tx.commit()?;
        info!(list_id, name = %list.name, words = list.words.len(), "Word list imported");
        Ok(list_id)
    }

    /// Soft-deletes a word; its scheduling records are kept
    pub fn deactivate_word(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn()?
            .execute("UPDATE words SET is_active = 0 WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Soft-deletes a word list, which also retires its words
    pub fn deactivate_word_list(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn()?
            .execute("UPDATE word_lists SET is_active = 0 WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Loads all word lists with their words, including inactive ones
    pub fn load_catalog(&self) -> Result<Catalog> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, is_active FROM word_lists ORDER BY id")?;
        let mut lists = stmt
            .query_map([], |row| {
                Ok(WordList {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    words: Vec::new(),
                    is_active: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<WordList>>>()?;

        let mut stmt = conn.prepare(
            "SELECT id, list_id, term, definition, is_active FROM words WHERE list_id = ?1 ORDER BY id",
        )?;
        for list in &mut lists {
            list.words = stmt
                .query_map(params![list.id], |row| {
                    Ok(Word {
                        id: row.get(0)?,
                        list_id: row.get(1)?,
                        term: row.get(2)?,
                        definition: row.get(3)?,
                        is_active: row.get(4)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<Word>>>()?;
        }

        Ok(Catalog { lists })
    }

    fn query_records(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<SchedulingRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, RecordRow::from_row)?
            .collect::<rusqlite::Result<Vec<RecordRow>>>()?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS word_lists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS words (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            list_id INTEGER NOT NULL,
            term TEXT NOT NULL,
            definition TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY (list_id) REFERENCES word_lists(id),
            UNIQUE(list_id, term)
        );

        CREATE TABLE IF NOT EXISTS scheduling_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            learner_id TEXT NOT NULL,
            subject_kind TEXT NOT NULL,
            subject_id INTEGER NOT NULL,
            repetition_count INTEGER NOT NULL DEFAULT 0,
            easiness_factor REAL NOT NULL DEFAULT 2.5,
            interval_days INTEGER NOT NULL DEFAULT 0,
            last_reviewed INTEGER,
            next_review INTEGER,
            last_grade TEXT,
            version INTEGER NOT NULL DEFAULT 0,
            UNIQUE(learner_id, subject_kind, subject_id)
        );

        CREATE INDEX IF NOT EXISTS idx_records_learner_next_review
            ON scheduling_records(learner_id, next_review);

        CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![Utc::now().timestamp().to_string()],
    )?;

    Ok(())
}

fn insert_word(conn: &Connection, list_name: &str, term: &str, definition: &str) -> Result<i64> {
    let list_id: i64 = conn
        .query_row(
            "SELECT id FROM word_lists WHERE name = ?1",
            params![list_name],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StorageError::InvalidValue(format!("no word list named '{list_name}'")))?;

    conn.execute(
        "INSERT OR IGNORE INTO words (list_id, term, definition) VALUES (?1, ?2, ?3)",
        params![list_id, term, definition],
    )?;

    let word_id = conn.query_row(
        "SELECT id FROM words WHERE list_id = ?1 AND term = ?2",
        params![list_id, term],
        |row| row.get(0),
    )?;
    Ok(word_id)
}

fn from_timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(StorageError::InvalidTimestamp(secs))
}

/// Raw column values of a `scheduling_records` row
struct RecordRow {
    id: i64,
    learner_id: String,
    subject_kind: String,
    subject_id: i64,
    repetition_count: i64,
    easiness_factor: f64,
    interval_days: i64,
    last_reviewed: Option<i64>,
    next_review: Option<i64>,
    last_grade: Option<String>,
    version: i64,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            learner_id: row.get(1)?,
            subject_kind: row.get(2)?,
            subject_id: row.get(3)?,
            repetition_count: row.get(4)?,
            easiness_factor: row.get(5)?,
            interval_days: row.get(6)?,
            last_reviewed: row.get(7)?,
            next_review: row.get(8)?,
            last_grade: row.get(9)?,
            version: row.get(10)?,
        })
    }

    fn into_record(self) -> Result<SchedulingRecord> {
        let subject = Subject::from_parts(&self.subject_kind, self.subject_id).ok_or_else(|| {
            StorageError::InvalidValue(format!("subject kind '{}'", self.subject_kind))
        })?;
        let last_grade = self
            .last_grade
            .map(|g| {
                g.parse::<Grade>()
                    .map_err(|e| StorageError::InvalidValue(e.to_string()))
            })
            .transpose()?;

        Ok(SchedulingRecord {
            id: self.id,
            learner_id: self.learner_id,
            subject,
            repetition_count: u32::try_from(self.repetition_count).map_err(|_| {
                StorageError::InvalidValue(format!("repetition_count {}", self.repetition_count))
            })?,
            easiness_factor: self.easiness_factor,
            interval_days: self.interval_days,
            last_reviewed: self.last_reviewed.map(from_timestamp).transpose()?,
            next_review: self.next_review.map(from_timestamp).transpose()?,
            last_grade,
            version: u64::try_from(self.version)
                .map_err(|_| StorageError::InvalidValue(format!("version {}", self.version)))?,
        })
    }
}

impl SubjectCatalog for SqliteStore {
    fn exists(&self, subject: Subject) -> Result<bool> {
        let sql = match subject {
            Subject::Word(_) => "SELECT EXISTS(SELECT 1 FROM words WHERE id = ?1)",
            Subject::WordList(_) => "SELECT EXISTS(SELECT 1 FROM word_lists WHERE id = ?1)",
        };
        let found = self
            .conn()?
            .query_row(sql, params![subject.id()], |row| row.get(0))?;
        Ok(found)
    }

    fn is_active(&self, subject: Subject) -> Result<bool> {
        let sql = match subject {
            Subject::Word(_) => {
                "SELECT w.is_active AND l.is_active
                 FROM words w JOIN word_lists l ON l.id = w.list_id
                 WHERE w.id = ?1"
            }
            Subject::WordList(_) => "SELECT is_active FROM word_lists WHERE id = ?1",
        };
        let active: Option<bool> = self
            .conn()?
            .query_row(sql, params![subject.id()], |row| row.get(0))
            .optional()?;
        Ok(active.unwrap_or(false))
    }
}

impl RecordStore for SqliteStore {
    fn load(&self, learner_id: &str, subject: Subject) -> Result<Option<SchedulingRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM scheduling_records
             WHERE learner_id = ?1 AND subject_kind = ?2 AND subject_id = ?3"
        );
        let records = self.query_records(&sql, params![learner_id, subject.kind(), subject.id()])?;
        Ok(records.into_iter().next())
    }

    fn load_by_id(&self, id: RecordId) -> Result<Option<SchedulingRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM scheduling_records WHERE id = ?1");
        let records = self.query_records(&sql, params![id])?;
        Ok(records.into_iter().next())
    }

    fn insert(&self, learner_id: &str, subject: Subject) -> Result<SchedulingRecord> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO scheduling_records (learner_id, subject_kind, subject_id) VALUES (?1, ?2, ?3)",
            params![learner_id, subject.kind(), subject.id()],
        );
        match inserted {
            Ok(_) => Ok(SchedulingRecord::started(
                conn.last_insert_rowid(),
                learner_id,
                subject,
            )),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StorageError::Duplicate {
                    learner_id: learner_id.to_string(),
                    subject,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, record: &SchedulingRecord) -> Result<SchedulingRecord> {
        let expected_version = i64::try_from(record.version)
            .map_err(|_| StorageError::InvalidValue(format!("version {}", record.version)))?;

        let changed = self.conn()?.execute(
            "UPDATE scheduling_records
             SET repetition_count = ?1, easiness_factor = ?2, interval_days = ?3,
                 last_reviewed = ?4, next_review = ?5, last_grade = ?6,
                 version = version + 1
             WHERE id = ?7 AND version = ?8",
            params![
                i64::from(record.repetition_count),
                record.easiness_factor,
                record.interval_days,
                record.last_reviewed.map(|t| t.timestamp()),
                record.next_review.map(|t| t.timestamp()),
                record.last_grade.map(Grade::as_str),
                record.id,
                expected_version,
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::StaleWrite {
                id: record.id,
                expected_version: record.version,
            });
        }

        Ok(SchedulingRecord {
            version: record.version + 1,
            ..record.clone()
        })
    }

    fn query_due(&self, learner_id: &str, now: DateTime<Utc>) -> Result<Vec<SchedulingRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM scheduling_records
             WHERE learner_id = ?1 AND next_review IS NOT NULL AND next_review <= ?2
             ORDER BY next_review ASC, id ASC"
        );
        self.query_records(&sql, params![learner_id, now.timestamp()])
    }

    fn query_not_started(&self, learner_id: &str) -> Result<Vec<SchedulingRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM scheduling_records
             WHERE learner_id = ?1 AND next_review IS NULL
             ORDER BY id ASC"
        );
        self.query_records(&sql, params![learner_id])
    }

    fn records_for(&self, learner_id: &str) -> Result<Vec<SchedulingRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM scheduling_records WHERE learner_id = ?1 ORDER BY id ASC"
        );
        self.query_records(&sql, params![learner_id])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn store_with_word() -> (SqliteStore, i64) {
        let store = SqliteStore::open_in_memory().unwrap();
        store.new_word_list("Polish").unwrap();
        let word = store.add_word("Polish", "cześć", "hello").unwrap();
        (store, word)
    }

    #[test]
    fn test_add_word_is_idempotent_per_term() {
        let (store, word) = store_with_word();
        let again = store.add_word("Polish", "cześć", "hi").unwrap();
        assert_eq!(word, again);

        let catalog = store.load_catalog().unwrap();
        assert_eq!(catalog.lists.len(), 1);
        assert_eq!(catalog.lists[0].words.len(), 1);
        assert_eq!(catalog.lists[0].words[0].definition, "hello");
    }

    #[test]
    fn test_add_word_to_missing_list() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.add_word("Nope", "a", "b"),
            Err(StorageError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_add_word_list_imports_words() {
        let store = SqliteStore::open_in_memory().unwrap();
        let list = WordList {
            name: "Greetings".to_string(),
            words: vec![Word::new("hola", "hello"), Word::new("adiós", "goodbye")],
            ..WordList::default()
        };
        let id = store.add_word_list(&list).unwrap();

        let catalog = store.load_catalog().unwrap();
        let loaded = catalog.list(id).unwrap();
        assert_eq!(loaded.name, "Greetings");
        assert_eq!(loaded.words.len(), 2);
        assert!(loaded.words.iter().all(|w| w.list_id == id && w.is_active));
    }

    #[test]
    fn test_duplicate_list_name_rolls_back() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.new_word_list("Greetings").unwrap();
        let list = WordList {
            name: "Greetings".to_string(),
            words: vec![Word::new("hola", "hello")],
            ..WordList::default()
        };
        assert!(store.add_word_list(&list).is_err());
        assert!(store.load_catalog().unwrap().lists[0].words.is_empty());
    }

    #[test]
    fn test_subject_existence_and_activity() {
        let (store, word) = store_with_word();
        let list = store.load_catalog().unwrap().lists[0].id;

        assert!(store.exists(Subject::Word(word)).unwrap());
        assert!(store.exists(Subject::WordList(list)).unwrap());
        assert!(!store.exists(Subject::Word(word + 100)).unwrap());
        assert!(!store.is_active(Subject::Word(word + 100)).unwrap());

        assert!(store.deactivate_word_list(list).unwrap());
        assert!(store.exists(Subject::Word(word)).unwrap());
        assert!(!store.is_active(Subject::Word(word)).unwrap());
        assert!(!store.is_active(Subject::WordList(list)).unwrap());
    }

    #[test]
    fn test_insert_rejects_duplicate_pair() {
        let (store, word) = store_with_word();
        store.insert("ala", Subject::Word(word)).unwrap();
        let err = store.insert("ala", Subject::Word(word)).unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { .. }));
        // Same id for a list is a different subject
        assert!(store.insert("ala", Subject::WordList(word)).is_ok());
    }

    #[test]
    fn test_save_checks_version() {
        let (store, word) = store_with_word();
        let record = store.insert("ala", Subject::Word(word)).unwrap();

        let reviewed = record.reviewed(Grade::Good, t0());
        let saved = store.save(&reviewed).unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(store.load_by_id(record.id).unwrap(), Some(saved.clone()));

        // Writing from the stale copy is rejected and leaves the row alone
        let stale = record.reviewed(Grade::Hard, t0());
        let err = store.save(&stale).unwrap_err();
        assert!(matches!(err, StorageError::StaleWrite { expected_version: 0, .. }));
        assert_eq!(store.load_by_id(record.id).unwrap(), Some(saved));
    }

    #[test]
    fn test_load_by_pair() {
        let (store, word) = store_with_word();
        let record = store.insert("ala", Subject::Word(word)).unwrap();
        assert_eq!(store.load("ala", Subject::Word(word)).unwrap(), Some(record));
        assert_eq!(store.load("ola", Subject::Word(word)).unwrap(), None);
    }

    #[test]
    fn test_query_due_excludes_future_and_unreviewed() {
        let (store, word) = store_with_word();
        let second = store.add_word("Polish", "proszę", "please").unwrap();
        let due = store.insert("ala", Subject::Word(word)).unwrap();
        store.insert("ala", Subject::Word(second)).unwrap();

        store.save(&due.reviewed(Grade::Good, t0())).unwrap();

        assert!(store.query_due("ala", t0()).unwrap().is_empty());
        let found = store.query_due("ala", t0() + Duration::days(1)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, due.id);
        assert_eq!(store.query_not_started("ala").unwrap().len(), 1);
        assert_eq!(store.records_for("ala").unwrap().len(), 2);
    }

    #[test]
    fn test_advance_day() {
        let store = SqliteStore::open_in_memory().unwrap();
        let before = store.current_date().unwrap();
        let after = store.advance_day().unwrap();
        assert_eq!(after - before, Duration::days(1));
        assert_eq!(store.current_date().unwrap(), after);
    }

    #[test]
    fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("review.sqlite3");
        let word = {
            let store = SqliteStore::open(&path).unwrap();
            store.new_word_list("Polish").unwrap();
            store.add_word("Polish", "cześć", "hello").unwrap()
        };

        let reopened = SqliteStore::open(&path).unwrap();
        assert!(reopened.exists(Subject::Word(word)).unwrap());
    }
}
