//! Download job orchestration
//!
//! One job per session: download the chosen rendition to a session-named
//! file, publish progress, upload, then always clean up.

pub mod files;
pub mod orchestrator;
pub mod progress;

pub use files::{purge_session_files, sanitize_title, session_file_name, sweep_directory};
pub use orchestrator::{DownloadOrchestrator, StartJobError, StartedJob};
pub use progress::ProgressTracker;
