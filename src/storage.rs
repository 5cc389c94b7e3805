use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::{
    document::Document,
    error::Result,
    session::{ResultSink, TestResult},
};

const DOCUMENTS_KEY: &str = "documents";
const RESULTS_KEY: &str = "results";

/// Key-value store backed by a single SQLite table. Values are JSON.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database file and its table.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        Ok(Store { conn })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM entries WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.conn.execute(
            r#"
            INSERT INTO entries (key, value, updated_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, json],
        )?;
        Ok(())
    }

    /// Returns whether anything was removed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM entries WHERE key = ?1", [key])?;
        Ok(n > 0)
    }

    /// All documents in the order they were first saved.
    pub fn documents(&self) -> Result<Vec<Document>> {
        Ok(self.get(DOCUMENTS_KEY)?.unwrap_or_default())
    }

    pub fn document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents()?.into_iter().find(|d| d.id == id))
    }

    /// Inserts, or replaces the document with the same id in place.
    pub fn save_document(&self, doc: &Document) -> Result<()> {
        let mut docs = self.documents()?;
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }
        debug!(document = %doc.id, total = docs.len(), "saving document");
        self.set(DOCUMENTS_KEY, &docs)
    }

    /// Returns whether a document with that id existed.
    pub fn delete_document(&self, id: &str) -> Result<bool> {
        let mut docs = self.documents()?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            return Ok(false);
        }
        self.set(DOCUMENTS_KEY, &docs)?;
        Ok(true)
    }

    /// Result history, oldest first.
    pub fn history(&self) -> Result<Vec<TestResult>> {
        Ok(self.get(RESULTS_KEY)?.unwrap_or_default())
    }

    pub fn save_result(&self, result: &TestResult) -> Result<()> {
        let mut results = self.history()?;
        results.push(result.clone());
        self.set(RESULTS_KEY, &results)
    }
}

impl ResultSink for Store {
    fn persist(&mut self, result: &TestResult) -> Result<()> {
        self.save_result(result)
    }
}
