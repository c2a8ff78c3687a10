use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;

use crate::editor::EditorBuffer;
use crate::text::{EditOperation, TextPosition, TextRange};

use super::{DocId, Event, Host, HostError, MirrorSeed, NoticeLevel, TempResource};

/// Which host calls should fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailurePlan {
    pub open: bool,
    pub show: bool,
    pub apply: bool,
    pub save: bool,
    pub temp_write: bool,
    pub temp_delete: bool,
}

#[derive(Debug)]
struct Document {
    buffer: EditorBuffer,
    language: Option<String>,
    visible: bool,
    resource: Option<u64>,
}

/// Documents held in memory, with helpers that play the part of a user.
///
/// Engine calls go through [`Host`]; the `user_*` methods mutate documents
/// the way an editor user would and queue the matching notifications.
#[derive(Debug, Default)]
pub struct MemoryHost {
    docs: BTreeMap<DocId, Document>,
    next_doc: u64,
    temps: HashMap<u64, Vec<u8>>,
    next_temp: u64,
    events: VecDeque<Event>,
    notices: Vec<(NoticeLevel, String)>,
    highlights: HashMap<DocId, TextRange>,
    applies: usize,
    saves: usize,
    failures: FailurePlan,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a visible document, as if the user opened a file.
    pub fn open_document(&mut self, text: &str, language: Option<&str>) -> DocId {
        self.insert_document(text, language.map(str::to_string), true, None)
    }

    /// Make the listed host calls fail from now on.
    pub const fn fail_with(&mut self, plan: FailurePlan) {
        self.failures = plan;
    }

    pub fn text(&self, doc: DocId) -> Option<String> {
        self.docs.get(&doc).map(|d| d.buffer.text())
    }

    /// Replace `range` in `doc` and queue the change notification.
    pub fn user_edit(&mut self, doc: DocId, range: TextRange, text: &str) -> Option<EditOperation> {
        let edit = self.docs.get_mut(&doc)?.buffer.replace(range, text)?;
        self.events.push_back(Event::DocumentChanged {
            doc,
            edits: vec![edit.clone()],
        });
        Some(edit)
    }

    /// Apply several edits as one notification, like a multi-cursor edit.
    pub fn user_edits(&mut self, doc: DocId, edits: Vec<EditOperation>) -> bool {
        let Some(document) = self.docs.get_mut(&doc) else {
            return false;
        };
        if !document.buffer.apply(&edits) {
            return false;
        }
        self.events.push_back(Event::DocumentChanged { doc, edits });
        true
    }

    pub fn user_type_at(&mut self, doc: DocId, at: TextPosition, text: &str) -> Option<EditOperation> {
        self.user_edit(doc, TextRange::empty(at), text)
    }

    /// Save regardless of the failure plan.
    pub fn user_save(&mut self, doc: DocId) -> bool {
        self.write_out(doc).is_ok()
    }

    /// Take `doc` out of view without closing it.
    pub fn hide(&mut self, doc: DocId) {
        if let Some(document) = self.docs.get_mut(&doc) {
            document.visible = false;
            self.events.push_back(Event::VisibleSetChanged);
        }
    }

    pub fn user_close(&mut self, doc: DocId) -> bool {
        if self.docs.remove(&doc).is_none() {
            return false;
        }
        self.highlights.remove(&doc);
        self.events.push_back(Event::DocumentClosed(doc));
        self.events.push_back(Event::VisibleSetChanged);
        true
    }

    /// Number of successful engine replaces.
    pub const fn apply_count(&self) -> usize {
        self.applies
    }

    /// Number of successful saves, by the user or the engine.
    pub const fn save_count(&self) -> usize {
        self.saves
    }

    pub fn notices(&self) -> &[(NoticeLevel, String)] {
        &self.notices
    }

    pub fn highlight(&self, doc: DocId) -> Option<TextRange> {
        self.highlights.get(&doc).copied()
    }

    pub fn temp_contents(&self, resource: &TempResource) -> Option<String> {
        self.temps
            .get(&resource.id)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn temp_resource_count(&self) -> usize {
        self.temps.len()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn document_count(&self) -> usize {
        self.docs.len()
    }

    fn insert_document(
        &mut self,
        text: &str,
        language: Option<String>,
        visible: bool,
        resource: Option<u64>,
    ) -> DocId {
        self.next_doc += 1;
        let id = DocId::new(self.next_doc);
        self.docs.insert(
            id,
            Document {
                buffer: EditorBuffer::from_text(text),
                language,
                visible,
                resource,
            },
        );
        id
    }

    fn document(&self, doc: DocId) -> Result<&Document, HostError> {
        self.docs.get(&doc).ok_or(HostError::NotOpen(doc))
    }

    fn write_out(&mut self, doc: DocId) -> Result<(), HostError> {
        let document = self.docs.get(&doc).ok_or(HostError::NotOpen(doc))?;
        if let Some(bytes) = document.resource.and_then(|id| self.temps.get_mut(&id)) {
            *bytes = document.buffer.text().into_bytes();
        }
        self.saves += 1;
        self.events.push_back(Event::DocumentSaved(doc));
        Ok(())
    }
}

fn refuse(what: &str) -> HostError {
    HostError::Rejected(format!("{what} refused"))
}

impl Host for MemoryHost {
    fn open_mirror(&mut self, seed: MirrorSeed<'_>) -> Result<DocId, HostError> {
        if self.failures.open {
            return Err(refuse("open"));
        }
        let language = seed.language_hint.map(str::to_string);
        let resource = seed.resource.map(|r| r.id);
        Ok(self.insert_document(seed.content, language, false, resource))
    }

    fn show_mirror(&mut self, mirror: DocId) -> Result<(), HostError> {
        if self.failures.show {
            return Err(refuse("show"));
        }
        let document = self.docs.get_mut(&mirror).ok_or(HostError::NotOpen(mirror))?;
        document.visible = true;
        self.events.push_back(Event::VisibleSetChanged);
        Ok(())
    }

    fn close_mirror(&mut self, mirror: DocId) -> Result<(), HostError> {
        if self.user_close(mirror) {
            Ok(())
        } else {
            Err(HostError::NotOpen(mirror))
        }
    }

    fn read_full_text(&self, doc: DocId) -> Result<String, HostError> {
        Ok(self.document(doc)?.buffer.text())
    }

    fn read_range(&self, doc: DocId, range: TextRange) -> Result<String, HostError> {
        self.document(doc)?
            .buffer
            .read_range(range)
            .ok_or(HostError::InvalidRange { doc, range })
    }

    fn apply_replace(&mut self, doc: DocId, range: TextRange, text: &str) -> Result<(), HostError> {
        if self.failures.apply {
            return Err(refuse("edit"));
        }
        let document = self.docs.get_mut(&doc).ok_or(HostError::NotOpen(doc))?;
        let edit = document
            .buffer
            .replace(range, text)
            .ok_or(HostError::InvalidRange { doc, range })?;
        self.applies += 1;
        self.events.push_back(Event::DocumentChanged {
            doc,
            edits: vec![edit],
        });
        Ok(())
    }

    fn save_document(&mut self, doc: DocId) -> Result<(), HostError> {
        if self.failures.save {
            return Err(refuse("save"));
        }
        self.write_out(doc)
    }

    fn is_open(&self, doc: DocId) -> bool {
        self.docs.contains_key(&doc)
    }

    fn is_visible(&self, doc: DocId) -> bool {
        self.docs.get(&doc).is_some_and(|d| d.visible)
    }

    fn language_hint(&self, doc: DocId) -> Option<String> {
        self.docs.get(&doc)?.language.clone()
    }

    fn write_temp_resource(
        &mut self,
        bytes: &[u8],
        _language_hint: Option<&str>,
    ) -> Result<TempResource, HostError> {
        if self.failures.temp_write {
            return Err(HostError::Io(io::Error::other("no space left on device")));
        }
        self.next_temp += 1;
        self.temps.insert(self.next_temp, bytes.to_vec());
        Ok(TempResource {
            id: self.next_temp,
            path: None,
        })
    }

    fn delete_temp_resource(&mut self, resource: &TempResource) -> Result<(), HostError> {
        if self.failures.temp_delete {
            return Err(HostError::Io(io::Error::other("permission denied")));
        }
        self.temps
            .remove(&resource.id)
            .map(drop)
            .ok_or_else(|| HostError::Rejected(format!("unknown temp resource {}", resource.id)))
    }

    fn highlight_region(&mut self, doc: DocId, range: TextRange) {
        self.highlights.insert(doc, range);
    }

    fn clear_highlight(&mut self, doc: DocId) {
        self.highlights.remove(&doc);
    }

    fn notify_user(&mut self, level: NoticeLevel, message: &str) {
        self.notices.push((level, message.to_string()));
    }

    fn take_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }
}
