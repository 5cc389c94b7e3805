// Library surface shared by the binary and the integration tests.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod document;
pub mod error;
pub mod history;
pub mod logging;
pub mod optimize;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod text;
pub mod timer;
pub mod typing;
pub mod ui;
pub mod util;

pub use error::{Result, StudyTypeError};
