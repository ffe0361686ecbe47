//! File watching for rebuilds.

use std::path::{Path, PathBuf};

use bootstrapy_pipeline::glob::{compile_globs, glob_base, to_slash};
use globset::GlobSet;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::server::ServerError;

/// A change to a watched file, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(p) | WatchEvent::Modified(p) | WatchEvent::Removed(p) => p,
        }
    }
}

/// Watches the bases of a set of globs and forwards matching changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    watched: Vec<PathBuf>,
}

impl FileWatcher {
    /// Start watching `globs` (relative to `root`).
    ///
    /// Returns the watcher, which must be kept alive, and the event channel.
    pub fn new<S: AsRef<str>>(
        root: &Path,
        globs: &[S],
    ) -> Result<(Self, mpsc::Receiver<WatchEvent>), ServerError> {
        let root = root.canonicalize().map_err(notify::Error::io)?;
        let matcher = compile_globs(globs)?;
        let (tx, rx) = mpsc::channel(256);

        let event_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for change in classify(&event_root, &matcher, &event) {
                        if tx.blocking_send(change).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => tracing::warn!("watch error: {}", e),
            }
        })?;

        let watched = watch_dirs(&root, globs);
        for dir in &watched {
            watcher.watch(dir, RecursiveMode::Recursive)?;
            tracing::debug!("watching {}", dir.display());
        }

        Ok((
            Self {
                _watcher: watcher,
                watched,
            },
            rx,
        ))
    }

    /// Directories handed to the OS watcher.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

/// Existing directories covering every glob base, without nested duplicates.
///
/// A base that does not exist yet is covered by its closest existing
/// ancestor inside `root`, so files created there later are still seen.
fn watch_dirs<S: AsRef<str>>(root: &Path, globs: &[S]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    for glob in globs {
        let mut dir = root.join(glob_base(glob.as_ref()));
        while !dir.is_dir() && dir != root {
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => break,
            }
        }
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }

    dirs.sort();
    let mut covered: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        if !covered.iter().any(|c| dir.starts_with(c)) {
            covered.push(dir);
        }
    }
    covered
}

fn classify(root: &Path, matcher: &GlobSet, event: &notify::Event) -> Vec<WatchEvent> {
    let kind = |index: usize| -> Option<fn(PathBuf) -> WatchEvent> {
        match event.kind {
            EventKind::Create(_) => Some(WatchEvent::Created),
            EventKind::Remove(_) => Some(WatchEvent::Removed),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(WatchEvent::Removed),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(WatchEvent::Created),
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if index == 0 => {
                Some(WatchEvent::Removed)
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => Some(WatchEvent::Created),
            EventKind::Modify(_) => Some(WatchEvent::Modified),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    };

    event
        .paths
        .iter()
        .enumerate()
        .filter_map(|(index, path)| {
            let relative = path.strip_prefix(root).ok()?;
            if !matcher.is_match(to_slash(relative)) {
                return None;
            }
            kind(index).map(|make| make(relative.to_path_buf()))
        })
        .collect()
}
