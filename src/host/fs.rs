use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempPath;
use tracing::{debug, error, info, warn};

use crate::editor::EditorBuffer;
use crate::language;
use crate::text::TextRange;
use crate::text::diff::single_edit;
use crate::watcher::FileWatcher;

use super::{DocId, Event, Host, HostError, MirrorSeed, NoticeLevel, TempResource};

#[derive(Debug)]
struct FileDoc {
    path: PathBuf,
    buffer: EditorBuffer,
    language: Option<String>,
}

/// Documents backed by files on disk.
///
/// Each file is cached in an [`EditorBuffer`]. Changes made by other programs
/// are picked up through the file watcher and reported as single edits.
pub struct FsHost {
    watcher: FileWatcher,
    docs: BTreeMap<DocId, FileDoc>,
    by_path: HashMap<PathBuf, DocId>,
    next_doc: u64,
    temps: HashMap<u64, TempPath>,
    next_temp: u64,
    mirror_path: Option<PathBuf>,
    events: VecDeque<Event>,
}

impl FsHost {
    /// Create a host whose watcher waits `debounce` after the last change.
    ///
    /// # Errors
    /// Returns an error if the file watcher cannot be created.
    pub fn new(debounce: Duration) -> notify::Result<Self> {
        Ok(Self {
            watcher: FileWatcher::new(debounce)?,
            docs: BTreeMap::new(),
            by_path: HashMap::new(),
            next_doc: 0,
            temps: HashMap::new(),
            next_temp: 0,
            mirror_path: None,
            events: VecDeque::new(),
        })
    }

    /// Write mirrors to `path` instead of a temporary file.
    pub fn with_mirror_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mirror_path = Some(path.into());
        self
    }

    /// Open `path` as a source document.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or watched.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<DocId, HostError> {
        let text = fs::read_to_string(path.as_ref())?;
        let language = language::language_for_path(path.as_ref()).or_else(|| {
            text.lines()
                .next()
                .and_then(language::language_for_first_line)
        });
        self.track(path.as_ref(), &text, language)
    }

    pub fn path_of(&self, doc: DocId) -> Option<&Path> {
        self.docs.get(&doc).map(|d| d.path.as_path())
    }

    fn track(&mut self, path: &Path, text: &str, language: Option<String>) -> Result<DocId, HostError> {
        let path = self
            .watcher
            .watch(path)
            .map_err(|err| HostError::Rejected(format!("cannot watch {}: {err}", path.display())))?;
        if let Some(doc) = self.by_path.get(&path) {
            return Ok(*doc);
        }
        self.next_doc += 1;
        let doc = DocId::new(self.next_doc);
        debug!(%doc, path = %path.display(), "tracking file");
        self.by_path.insert(path.clone(), doc);
        self.docs.insert(
            doc,
            FileDoc {
                path,
                buffer: EditorBuffer::from_text(text),
                language,
            },
        );
        Ok(doc)
    }

    fn forget(&mut self, doc: DocId) -> Option<FileDoc> {
        let file = self.docs.remove(&doc)?;
        self.by_path.remove(&file.path);
        self.watcher.unwatch(&file.path);
        Some(file)
    }

    fn doc(&self, doc: DocId) -> Result<&FileDoc, HostError> {
        self.docs.get(&doc).ok_or(HostError::NotOpen(doc))
    }

    /// Turn settled watcher notifications into document events.
    fn poll_watcher(&mut self) {
        for path in self.watcher.take_ready() {
            let Some(doc) = self.by_path.get(&path).copied() else {
                continue;
            };
            match fs::read_to_string(&path) {
                Ok(text) => self.reload(doc, &text),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    info!(%doc, path = %path.display(), "file removed");
                    self.forget(doc);
                    self.events.push_back(Event::DocumentClosed(doc));
                    self.events.push_back(Event::VisibleSetChanged);
                }
                Err(err) => warn!(path = %path.display(), %err, "could not reload file"),
            }
        }
    }

    fn reload(&mut self, doc: DocId, text: &str) {
        let Some(file) = self.docs.get_mut(&doc) else {
            return;
        };
        let Some(edit) = single_edit(&file.buffer.text(), text) else {
            return;
        };
        if file.buffer.replace(edit.range, &edit.inserted).is_none() {
            warn!(%doc, "external change did not fit cached text; reloading");
            file.buffer = EditorBuffer::from_text(text);
            return;
        }
        self.events.push_back(Event::DocumentChanged {
            doc,
            edits: vec![edit],
        });
    }
}

impl Host for FsHost {
    fn open_mirror(&mut self, seed: MirrorSeed<'_>) -> Result<DocId, HostError> {
        let path = self
            .mirror_path
            .clone()
            .or_else(|| seed.resource.and_then(|r| r.path.clone()))
            .ok_or_else(|| HostError::Unsupported("scratch mirrors need a mirror path".into()))?;
        if self.by_path.contains_key(&path) {
            return Err(HostError::Rejected(format!("{} is already open", path.display())));
        }
        fs::write(&path, seed.content)?;
        self.track(&path, seed.content, seed.language_hint.map(str::to_string))
    }

    fn show_mirror(&mut self, mirror: DocId) -> Result<(), HostError> {
        let file = self.doc(mirror)?;
        info!(%mirror, path = %file.path.display(), "mirror ready");
        Ok(())
    }

    fn close_mirror(&mut self, mirror: DocId) -> Result<(), HostError> {
        self.forget(mirror).ok_or(HostError::NotOpen(mirror))?;
        self.events.push_back(Event::DocumentClosed(mirror));
        self.events.push_back(Event::VisibleSetChanged);
        Ok(())
    }

    fn read_full_text(&self, doc: DocId) -> Result<String, HostError> {
        Ok(self.doc(doc)?.buffer.text())
    }

    fn read_range(&self, doc: DocId, range: TextRange) -> Result<String, HostError> {
        self.doc(doc)?
            .buffer
            .read_range(range)
            .ok_or(HostError::InvalidRange { doc, range })
    }

    fn apply_replace(&mut self, doc: DocId, range: TextRange, text: &str) -> Result<(), HostError> {
        let file = self.docs.get_mut(&doc).ok_or(HostError::NotOpen(doc))?;
        let previous = file
            .buffer
            .read_range(range)
            .ok_or(HostError::InvalidRange { doc, range })?;
        let edit = file
            .buffer
            .replace(range, text)
            .ok_or(HostError::InvalidRange { doc, range })?;
        // The cache is updated first so the watcher sees no difference.
        if let Err(err) = fs::write(&file.path, file.buffer.text()) {
            file.buffer
                .replace(TextRange::spanning(range.start, text), &previous);
            return Err(err.into());
        }
        self.events.push_back(Event::DocumentChanged {
            doc,
            edits: vec![edit],
        });
        Ok(())
    }

    fn save_document(&mut self, doc: DocId) -> Result<(), HostError> {
        let file = self.docs.get_mut(&doc).ok_or(HostError::NotOpen(doc))?;
        fs::write(&file.path, file.buffer.text())?;
        self.events.push_back(Event::DocumentSaved(doc));
        Ok(())
    }

    fn is_open(&self, doc: DocId) -> bool {
        self.docs.contains_key(&doc)
    }

    fn is_visible(&self, doc: DocId) -> bool {
        self.docs.get(&doc).is_some_and(|file| file.path.exists())
    }

    fn language_hint(&self, doc: DocId) -> Option<String> {
        self.docs.get(&doc)?.language.clone()
    }

    fn write_temp_resource(
        &mut self,
        bytes: &[u8],
        language_hint: Option<&str>,
    ) -> Result<TempResource, HostError> {
        let suffix = language_hint
            .and_then(language::extension_for_language)
            .map_or_else(|| ".txt".to_string(), |ext| format!(".{ext}"));
        let mut file = tempfile::Builder::new()
            .prefix("carve-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        let path = file.into_temp_path();

        self.next_temp += 1;
        let resource = TempResource {
            id: self.next_temp,
            path: Some(path.to_path_buf()),
        };
        self.temps.insert(self.next_temp, path);
        Ok(resource)
    }

    fn delete_temp_resource(&mut self, resource: &TempResource) -> Result<(), HostError> {
        let path = self
            .temps
            .remove(&resource.id)
            .ok_or_else(|| HostError::Rejected(format!("unknown temp resource {}", resource.id)))?;
        path.close()?;
        Ok(())
    }

    fn notify_user(&mut self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => info!("{message}"),
            NoticeLevel::Warning => warn!("{message}"),
            NoticeLevel::Error => error!("{message}"),
        }
        eprintln!("[{level}] {message}");
    }

    fn take_events(&mut self) -> Vec<Event> {
        self.poll_watcher();
        self.events.drain(..).collect()
    }
}
