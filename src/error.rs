use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudyTypeError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage Error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP Error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to extract text from PDF: {0}")]
    Pdf(String),

    #[error("Unsupported file type: {} (expected .pdf, .txt or .md)", .0.display())]
    UnsupportedFile(PathBuf),

    #[error("Could not extract enough text: got {chars} characters, need at least {min}")]
    ContentTooShort { chars: usize, min: usize },

    #[error("No document with id {0}")]
    DocumentNotFound(String),

    #[error("Invalid mode {0}s (expected 30, 60 or 120)")]
    InvalidMode(u64),

    #[error("Text optimization failed: {0}")]
    Optimizer(String),

    #[error("No OpenAI API key configured")]
    MissingApiKey,
}

pub type Result<T> = std::result::Result<T, StudyTypeError>;
