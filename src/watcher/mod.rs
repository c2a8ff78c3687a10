//! File watching for documents backed by files.
//!
//! Uses notify crate for cross-platform file system events. Parent
//! directories are watched non-recursively and shared between files.
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace};

#[derive(Debug)]
struct Target {
    root: PathBuf,
    name: Option<OsString>,
    pending_since: Option<Instant>,
}

/// Watches a set of files and emits debounced change notifications.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    roots: HashMap<PathBuf, usize>,
    targets: HashMap<PathBuf, Target>,
    debounce: Duration,
}

impl FileWatcher {
    /// Create a watcher with nothing watched yet.
    ///
    /// # Errors
    /// Returns an error if the platform watcher cannot be created.
    pub fn new(debounce: Duration) -> notify::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        Ok(Self {
            watcher,
            rx,
            roots: HashMap::new(),
            targets: HashMap::new(),
            debounce,
        })
    }

    /// Start watching `path`, returning the canonical path events will use.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be watched.
    pub fn watch(&mut self, path: impl AsRef<Path>) -> notify::Result<PathBuf> {
        // Event paths from the OS are absolute and canonical.
        let target_path = canonical_target(path.as_ref());
        if self.targets.contains_key(&target_path) {
            return Ok(target_path);
        }
        let root = watch_root_for(&target_path);
        if !self.roots.contains_key(&root) {
            self.watcher.watch(&root, RecursiveMode::NonRecursive)?;
        }
        *self.roots.entry(root.clone()).or_default() += 1;
        self.targets.insert(
            target_path.clone(),
            Target {
                root,
                name: target_path.file_name().map(std::ffi::OsStr::to_os_string),
                pending_since: None,
            },
        );
        Ok(target_path)
    }

    /// Stop watching `path`. The parent directory is released with its last file.
    pub fn unwatch(&mut self, path: &Path) {
        let Some(target) = self.targets.remove(path) else {
            return;
        };
        let Some(count) = self.roots.get_mut(&target.root) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.roots.remove(&target.root);
            if let Err(err) = self.watcher.unwatch(&target.root) {
                debug!(root = %target.root.display(), %err, "unwatch failed");
            }
        }
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.targets.contains_key(path)
    }

    /// Files whose changes have been quiet for the debounce window.
    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        while let Ok(event) = self.rx.try_recv() {
            match event {
                Ok(ev) => {
                    let relevant = self.relevant_targets(&ev);
                    if relevant.is_empty() {
                        trace!(kind = ?ev.kind, paths = ?ev.paths, "irrelevant watcher event");
                    }
                    for path in relevant {
                        if let Some(target) = self.targets.get_mut(&path) {
                            target.pending_since = Some(now);
                        }
                    }
                }
                Err(err) => debug!(%err, "watcher error"),
            }
        }

        let mut ready = Vec::new();
        for (path, target) in &mut self.targets {
            if target
                .pending_since
                .is_some_and(|since| since.elapsed() >= self.debounce)
            {
                target.pending_since = None;
                ready.push(path.clone());
            }
        }
        ready.sort();
        ready
    }

    fn relevant_targets(&self, event: &Event) -> Vec<PathBuf> {
        self.targets
            .iter()
            .filter(|(target_path, target)| {
                event.paths.iter().any(|path| {
                    path == &target.root
                        || path == *target_path
                        || target
                            .name
                            .as_ref()
                            .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
                })
            })
            .map(|(path, _)| path.clone())
            .collect()
    }
}

fn canonical_target(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    // Not created yet: canonicalize the directory it will live in.
    let Some(name) = path.file_name() else {
        return path.to_path_buf();
    };
    watch_root_for(path)
        .canonicalize()
        .map_or_else(|_| path.to_path_buf(), |dir| dir.join(name))
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
