//! # Database hot-reloading
//!
//! While `racelab serve` runs, a [`notify`] watcher monitors the directory
//! holding the scenario database. When the file is rewritten (the compiler
//! renames a finished `.partial` file over it) the new database is loaded
//! and swapped into the [`LookupService`]. Queries already in flight finish
//! on the index they started with; a database that fails to load is logged
//! and the current index stays in place.
//!
//! The caller keeps the returned [`RecommendedWatcher`] alive. Dropping it
//! stops the reloads.

use anyhow::{anyhow, Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use scenario::LookupService;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Reloads one database file into one service.
struct DatabaseReloader {
    service: Arc<LookupService>,
    path: PathBuf,
}

impl DatabaseReloader {
    fn handle_event(&self, result: notify::Result<Event>) {
        match result {
            Ok(event) => {
                if (event.kind.is_modify() || event.kind.is_create()) && event.paths.iter().any(|p| self.is_database(p))
                {
                    self.reload();
                }
            }
            Err(e) => error!(error = ?e, "database watcher error"),
        }
    }

    fn is_database(&self, path: &Path) -> bool {
        path.file_name().is_some() && path.file_name() == self.path.file_name()
    }

    fn reload(&self) {
        match self.service.reload(&self.path) {
            Ok(()) => {
                let stats = self.service.stats();
                info!(path = %self.path.display(), records = stats.total_scenarios, "database reloaded");
            }
            Err(e) => warn!(path = %self.path.display(), error = %e, "database reload failed; keeping current index"),
        }
    }
}

/// Watch `path` and swap every successfully loaded rewrite into `service`.
///
/// # Errors
///
/// The watcher cannot be created, or the database's directory does not
/// exist.
pub fn start(service: Arc<LookupService>, path: &Path) -> Result<RecommendedWatcher> {
    let directory = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !directory.is_dir() {
        return Err(anyhow!("database directory {} not found", directory.display()));
    }
    let reloader = DatabaseReloader { service, path: path.to_path_buf() };
    let mut watcher =
        notify::recommended_watcher(move |event| reloader.handle_event(event)).context("creating database watcher")?;
    watcher
        .watch(&directory, RecursiveMode::NonRecursive)
        .with_context(|| format!("watching {}", directory.display()))?;
    info!(path = %path.display(), "database watcher active");
    Ok(watcher)
}
