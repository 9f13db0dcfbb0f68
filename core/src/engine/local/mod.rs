/*
 * mod.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of nmsync, a notmuch binding and maildir sync daemon.
 *
 * nmsync is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * nmsync is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with nmsync.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Local engine: a file-backed stand-in for libnotmuch with the same status contract.
//!
//! State is one JSON file under `<path>/.notmuch/`, loaded on open and rewritten after every
//! committed change. Read-write sessions take a process-wide per-path lock; a second
//! read-write open fails the way a Xapian lock failure does. Read-only sessions see the
//! state as it was when they were opened.

mod headers;
mod state;

use crate::database::Mode;
use crate::engine::{MessageBox, MessageHandle, Session};
use crate::maildir::flags;
use crate::status::Status;
use headers::{parse_message_id, synthetic_message_id, Headers};
use once_cell::sync::OnceCell;
use state::{Document, IndexState, CURRENT_VERSION, DB_DIR};
use std::cell::{Cell, RefCell};
use std::collections::btree_map::Entry;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Mutex;

/// Canonical paths of databases currently open read-write in this process.
fn writers() -> &'static Mutex<HashSet<PathBuf>> {
    static WRITERS: OnceCell<Mutex<HashSet<PathBuf>>> = OnceCell::new();
    WRITERS.get_or_init(|| Mutex::new(HashSet::new()))
}

fn acquire_writer(root: &Path) -> Result<(), Status> {
    let mut w = writers().lock().unwrap_or_else(|e| e.into_inner());
    if w.insert(root.to_path_buf()) {
        Ok(())
    } else {
        log::debug!("database {} is already open read-write", root.display());
        Err(Status::XapianException)
    }
}

fn release_writer(root: &Path) {
    let mut w = writers().lock().unwrap_or_else(|e| e.into_inner());
    w.remove(root);
}

/// State shared by a session and the message handles it gave out.
struct Shared {
    root: PathBuf,
    mode: Mode,
    state: RefCell<IndexState>,
    open: Cell<bool>,
}

impl Shared {
    fn writable(&self) -> Result<(), Status> {
        match self.mode {
            Mode::ReadOnly => Err(Status::ReadOnlyDatabase),
            Mode::ReadWrite => Ok(()),
        }
    }

    fn commit(&self) -> Status {
        match self.state.borrow().save(&self.root) {
            Ok(()) => Status::Success,
            Err(e) => {
                log::warn!("failed to write index under {}: {}", self.root.display(), e);
                Status::FileError
            }
        }
    }

    /// Apply `f` to the state and write it out. A failed write rolls the state back.
    fn update<R>(&self, f: impl FnOnce(&mut IndexState) -> R) -> (Status, R) {
        let before = self.state.borrow().clone();
        let result = f(&mut self.state.borrow_mut());
        let status = self.commit();
        if !status.is_success() {
            *self.state.borrow_mut() = before;
        }
        (status, result)
    }

    /// Relative filenames are relative to the database path. The directory part is
    /// canonicalized so a file has one spelling however it was reached.
    fn resolve(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let canonical = match (joined.parent(), joined.file_name()) {
            (Some(dir), Some(name)) => fs::canonicalize(dir).ok().map(|d| d.join(name)),
            _ => None,
        };
        canonical.unwrap_or(joined)
    }

    fn message<'a>(self: &Rc<Self>, id: String) -> MessageBox<'a> {
        Box::new(LocalMessage {
            shared: Rc::clone(self),
            id,
            freeze_depth: 0,
            pending: None,
        })
    }
}

pub(crate) struct LocalSession {
    shared: Rc<Shared>,
}

impl LocalSession {
    fn with_state(root: PathBuf, mode: Mode, state: IndexState) -> Self {
        Self {
            shared: Rc::new(Shared {
                root,
                mode,
                state: RefCell::new(state),
                open: Cell::new(true),
            }),
        }
    }

    /// New empty database at `path` (an existing directory). The session is read-write.
    pub(crate) fn create(path: &Path) -> Result<Self, Status> {
        let root = fs::canonicalize(path).map_err(|_| Status::FileError)?;
        if !root.is_dir() {
            return Err(Status::FileError);
        }
        if root.join(DB_DIR).exists() {
            return Err(Status::DatabaseExists);
        }
        acquire_writer(&root)?;
        let state = IndexState::new();
        if let Err(e) = fs::create_dir(root.join(DB_DIR)).and_then(|_| state.save(&root)) {
            log::warn!("cannot create database at {}: {}", root.display(), e);
            release_writer(&root);
            return Err(Status::FileError);
        }
        Ok(Self::with_state(root, Mode::ReadWrite, state))
    }

    pub(crate) fn open(path: &Path, mode: Mode) -> Result<Self, Status> {
        let root = fs::canonicalize(path).map_err(|_| Status::NoDatabase)?;
        if !IndexState::exists(&root) {
            return Err(Status::NoDatabase);
        }
        if mode == Mode::ReadWrite {
            acquire_writer(&root)?;
        }
        let loaded = match IndexState::load(&root) {
            Ok(state) if state.version <= CURRENT_VERSION => Ok(state),
            Ok(state) => {
                log::warn!(
                    "database at {} has version {}, newer than supported {}",
                    root.display(),
                    state.version,
                    CURRENT_VERSION
                );
                Err(Status::FileError)
            }
            Err(e) => {
                log::warn!("cannot read database at {}: {}", root.display(), e);
                Err(Status::FileError)
            }
        };
        match loaded {
            Ok(state) => Ok(Self::with_state(root, mode, state)),
            Err(status) => {
                if mode == Mode::ReadWrite {
                    release_writer(&root);
                }
                Err(status)
            }
        }
    }
}

impl Session for LocalSession {
    fn path(&self) -> &Path {
        &self.shared.root
    }

    fn needs_upgrade(&self) -> bool {
        self.shared.mode == Mode::ReadWrite && self.shared.state.borrow().version < CURRENT_VERSION
    }

    fn upgrade(&self) -> Status {
        if let Err(s) = self.shared.writable() {
            return s;
        }
        let version = self.shared.state.borrow().version;
        if version >= CURRENT_VERSION {
            return Status::Success;
        }
        log::debug!("upgrading {} from version {}", self.shared.root.display(), version);
        self.shared.update(|state| state.version = CURRENT_VERSION).0
    }

    fn index_file(&self, path: &Path) -> (Status, Option<MessageBox<'_>>) {
        if let Err(s) = self.shared.writable() {
            return (s, None);
        }
        let filename = self.shared.resolve(path);
        let raw = match fs::read(&filename) {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("cannot read {}: {}", filename.display(), e);
                return (Status::FileError, None);
            }
        };
        let headers = match Headers::parse(&raw) {
            Some(h) => h,
            None => return (Status::FileNotEmail, None),
        };
        let id = headers
            .get("Message-Id")
            .and_then(parse_message_id)
            .unwrap_or_else(|| synthetic_message_id(&raw));
        let date = headers.date();
        let (committed, status) = self.shared.update(|state| match state.messages.entry(id.clone()) {
            Entry::Occupied(mut e) => {
                let doc = e.get_mut();
                if !doc.filenames.contains(&filename) {
                    doc.filenames.push(filename);
                }
                Status::DuplicateMessageId
            }
            Entry::Vacant(e) => {
                e.insert(Document {
                    filenames: vec![filename],
                    tags: BTreeSet::new(),
                    date,
                });
                Status::Success
            }
        });
        if !committed.is_success() {
            return (committed, None);
        }
        (status, Some(self.shared.message(id)))
    }

    fn remove_message(&self, path: &Path) -> Status {
        if let Err(s) = self.shared.writable() {
            return s;
        }
        let filename = self.shared.resolve(path);
        let id = match self.shared.state.borrow().id_for_filename(&filename) {
            Some(id) => id.to_string(),
            None => return Status::Success,
        };
        let (committed, still_referenced) = self.shared.update(|state| {
            let remaining = match state.messages.get_mut(&id) {
                Some(doc) => {
                    doc.filenames.retain(|f| f != &filename);
                    doc.filenames.len()
                }
                None => 0,
            };
            if remaining == 0 {
                state.messages.remove(&id);
            }
            remaining > 0
        });
        if !committed.is_success() {
            return committed;
        }
        if still_referenced {
            Status::DuplicateMessageId
        } else {
            Status::Success
        }
    }

    fn find_message(&self, id: &str) -> (Status, Option<MessageBox<'_>>) {
        let known = self.shared.state.borrow().messages.contains_key(id);
        (Status::Success, known.then(|| self.shared.message(id.to_string())))
    }

    fn find_message_by_filename(&self, path: &Path) -> (Status, Option<MessageBox<'_>>) {
        let filename = self.shared.resolve(path);
        let id = self.shared.state.borrow().id_for_filename(&filename).map(str::to_string);
        (Status::Success, id.map(|id| self.shared.message(id)))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.shared.resolve(path)
    }

    fn close(&mut self) -> Status {
        if !self.shared.open.replace(false) {
            return Status::Success;
        }
        log::debug!("closing database {}", self.shared.root.display());
        if self.shared.mode == Mode::ReadOnly {
            return Status::Success;
        }
        let status = self.shared.commit();
        release_writer(&self.shared.root);
        status
    }
}

impl Drop for LocalSession {
    fn drop(&mut self) {
        let status = self.close();
        if !status.is_success() {
            log::warn!("closing database {} on drop: {}", self.shared.root.display(), status);
        }
    }
}

/// Message handle. Tag changes made while frozen are kept in `pending` until the last thaw.
struct LocalMessage {
    shared: Rc<Shared>,
    id: String,
    freeze_depth: u32,
    pending: Option<BTreeSet<String>>,
}

impl LocalMessage {
    fn with_doc<R>(&self, f: impl FnOnce(&Document) -> R) -> Option<R> {
        self.shared.state.borrow().messages.get(&self.id).map(f)
    }

    fn committed_tags(&self) -> BTreeSet<String> {
        self.with_doc(|d| d.tags.clone()).unwrap_or_default()
    }

    fn filenames(&self) -> Vec<PathBuf> {
        self.with_doc(|d| d.filenames.clone()).unwrap_or_default()
    }

    /// Tags as they will be after the pending changes are committed.
    fn effective_tags(&self) -> BTreeSet<String> {
        match &self.pending {
            Some(p) => p.clone(),
            None => self.committed_tags(),
        }
    }

    fn mutate_tags(&mut self, f: impl FnOnce(&mut BTreeSet<String>)) -> Status {
        if let Err(s) = self.shared.writable() {
            return s;
        }
        if let Some(pending) = self.pending.as_mut() {
            f(pending);
            return Status::Success;
        }
        if !self.shared.state.borrow().messages.contains_key(&self.id) {
            return Status::XapianException;
        }
        let id = &self.id;
        self.shared
            .update(|state| {
                if let Some(doc) = state.messages.get_mut(id) {
                    f(&mut doc.tags);
                }
            })
            .0
    }
}

impl MessageHandle for LocalMessage {
    fn message_id(&self) -> String {
        self.id.clone()
    }

    fn file_name(&self) -> PathBuf {
        self.filenames().into_iter().next().unwrap_or_default()
    }

    fn file_names(&self) -> Vec<PathBuf> {
        self.filenames()
    }

    fn header(&self, name: &str) -> (Status, Option<String>) {
        let path = match self.filenames().into_iter().next() {
            Some(p) => p,
            None => return (Status::Success, None),
        };
        match fs::read(&path) {
            Ok(raw) => {
                let value = Headers::parse(&raw).and_then(|h| h.get(name).map(str::to_string));
                (Status::Success, value)
            }
            Err(e) => {
                log::debug!("cannot read {}: {}", path.display(), e);
                (Status::FileError, None)
            }
        }
    }

    fn date(&self) -> Option<i64> {
        self.with_doc(|d| d.date).flatten()
    }

    fn tags(&self) -> Vec<String> {
        self.committed_tags().into_iter().collect()
    }

    fn add_tag(&mut self, tag: &str) -> Status {
        self.mutate_tags(|tags| {
            tags.insert(tag.to_string());
        })
    }

    fn remove_tag(&mut self, tag: &str) -> Status {
        self.mutate_tags(|tags| {
            tags.remove(tag);
        })
    }

    fn remove_all_tags(&mut self) -> Status {
        self.mutate_tags(|tags| tags.clear())
    }

    fn freeze(&mut self) -> Status {
        self.freeze_depth += 1;
        if self.freeze_depth == 1 {
            self.pending = Some(self.committed_tags());
        }
        Status::Success
    }

    fn thaw(&mut self) -> Status {
        if self.freeze_depth == 0 {
            return Status::UnbalancedFreezeThaw;
        }
        self.freeze_depth -= 1;
        if self.freeze_depth > 0 {
            return Status::Success;
        }
        let pending = match self.pending.take() {
            Some(p) => p,
            None => return Status::Success,
        };
        let unchanged = match self.shared.state.borrow().messages.get(&self.id) {
            Some(doc) => doc.tags == pending,
            None => return Status::XapianException,
        };
        if unchanged {
            return Status::Success;
        }
        let id = &self.id;
        self.shared
            .update(|state| {
                if let Some(doc) = state.messages.get_mut(id) {
                    doc.tags = pending;
                }
            })
            .0
    }

    fn maildir_flags_to_tags(&mut self) -> Status {
        let combined = match flags::combined_flags(&self.filenames()) {
            Some(c) => c,
            None => return Status::Success,
        };
        let changes = flags::tag_changes(&combined);
        self.mutate_tags(|tags| {
            for (tag, present) in changes {
                if present {
                    tags.insert(tag.to_string());
                } else {
                    tags.remove(tag);
                }
            }
        })
    }

    fn tags_to_maildir_flags(&mut self) -> Status {
        if let Err(s) = self.shared.writable() {
            return s;
        }
        let tags: Vec<String> = self.effective_tags().into_iter().collect();
        let mut status = Status::Success;
        let mut renamed = Vec::new();
        for old in self.filenames() {
            let new = match flags::path_for_tags(&old, &tags) {
                Some(n) => n,
                None => continue,
            };
            if let Err(e) = fs::rename(&old, &new) {
                log::warn!("cannot rename {} to {}: {}", old.display(), new.display(), e);
                status = Status::FileError;
                break;
            }
            renamed.push((old, new));
        }
        if renamed.is_empty() {
            return status;
        }
        let id = &self.id;
        let (committed, ()) = self.shared.update(|state| {
            if let Some(doc) = state.messages.get_mut(id) {
                for (old, new) in &renamed {
                    if let Some(f) = doc.filenames.iter_mut().find(|f| **f == *old) {
                        *f = new.clone();
                    }
                }
            }
        });
        if !committed.is_success() {
            // the index still names the old files
            for (old, new) in &renamed {
                if let Err(e) = fs::rename(new, old) {
                    log::warn!("cannot rename {} back to {}: {}", new.display(), old.display(), e);
                }
            }
            return committed;
        }
        status
    }
}

impl Drop for LocalMessage {
    fn drop(&mut self) {
        if self.pending.is_some() {
            log::warn!("message {} released while frozen; buffered tag changes discarded", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "From: Sample Message <return@example.com>\n\
Subject: Some test message\n\
Date: Mon, 26 Feb 2018 00:00:00 +0200\n\
Message-Id: <local-test@example.com>\n\
\n\
Body.\n";

    #[test]
    fn second_writer_is_rejected_until_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = LocalSession::create(dir.path()).unwrap();
        assert_eq!(
            LocalSession::open(dir.path(), Mode::ReadWrite).err(),
            Some(Status::XapianException)
        );
        let reader = LocalSession::open(dir.path(), Mode::ReadOnly);
        assert!(reader.is_ok());
        assert_eq!(first.close(), Status::Success);
        assert_eq!(first.close(), Status::Success);
        assert!(LocalSession::open(dir.path(), Mode::ReadWrite).is_ok());
    }

    #[test]
    fn drop_releases_writer_lock() {
        let dir = tempfile::tempdir().unwrap();
        drop(LocalSession::create(dir.path()).unwrap());
        assert!(LocalSession::open(dir.path(), Mode::ReadWrite).is_ok());
    }

    #[test]
    fn newer_format_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        drop(LocalSession::create(dir.path()).unwrap());
        let mut state = IndexState::new();
        state.version = CURRENT_VERSION + 1;
        state.save(dir.path()).unwrap();
        assert_eq!(
            LocalSession::open(dir.path(), Mode::ReadWrite).err(),
            Some(Status::FileError)
        );
        // the failed open must not keep the lock
        state.version = CURRENT_VERSION;
        state.save(dir.path()).unwrap();
        assert!(LocalSession::open(dir.path(), Mode::ReadWrite).is_ok());
    }

    #[test]
    fn relative_filenames_resolve_against_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("msg"), MESSAGE).unwrap();
        let session = LocalSession::create(dir.path()).unwrap();
        let (status, msg) = session.index_file(Path::new("msg"));
        assert_eq!(status, Status::Success);
        let msg = msg.unwrap();
        assert_eq!(msg.file_name(), session.path().join("msg"));
        assert_eq!(msg.date(), Some(1519596000));
        let (_, by_name) = session.find_message_by_filename(&session.path().join("msg"));
        assert_eq!(by_name.unwrap().message_id(), "local-test@example.com");
    }

    #[test]
    fn nested_freeze_commits_on_outermost_thaw() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("msg"), MESSAGE).unwrap();
        let session = LocalSession::create(dir.path()).unwrap();
        let (_, msg) = session.index_file(Path::new("msg"));
        let mut msg = msg.unwrap();
        assert_eq!(msg.freeze(), Status::Success);
        assert_eq!(msg.freeze(), Status::Success);
        assert_eq!(msg.add_tag("x"), Status::Success);
        assert_eq!(msg.thaw(), Status::Success);
        assert!(msg.tags().is_empty());
        assert_eq!(msg.thaw(), Status::Success);
        assert_eq!(msg.tags(), vec!["x".to_string()]);
        assert_eq!(msg.thaw(), Status::UnbalancedFreezeThaw);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_root_gives_one_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        let link = dir.path().join("link");
        fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();
        fs::write(real.join("msg"), MESSAGE).unwrap();

        let session = LocalSession::create(&link).unwrap();
        let (status, _) = session.index_file(&link.join("msg"));
        assert_eq!(status, Status::Success);
        assert!(session.find_message_by_filename(Path::new("msg")).1.is_some());
        assert!(session.find_message_by_filename(&real.join("msg")).1.is_some());

        let (status, msg) = session.index_file(Path::new("msg"));
        assert_eq!(status, Status::DuplicateMessageId);
        assert_eq!(msg.unwrap().file_names().len(), 1);
    }

    #[test]
    fn failed_write_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("msg"), MESSAGE).unwrap();
        fs::write(
            dir.path().join("other"),
            MESSAGE.replace("local-test@example.com", "other@example.com"),
        )
        .unwrap();
        let session = LocalSession::create(dir.path()).unwrap();
        let (_, msg) = session.index_file(Path::new("msg"));
        let mut msg = msg.unwrap();

        // a directory where the temporary index file goes makes every save fail
        let tmp = IndexState::index_path(session.path()).with_extension("json.tmp");
        fs::create_dir(&tmp).unwrap();

        assert_eq!(msg.add_tag("x"), Status::FileError);
        assert!(msg.tags().is_empty());
        assert_eq!(msg.freeze(), Status::Success);
        assert_eq!(msg.add_tag("y"), Status::Success);
        assert_eq!(msg.thaw(), Status::FileError);
        assert!(msg.tags().is_empty());

        let (status, other) = session.index_file(Path::new("other"));
        assert_eq!(status, Status::FileError);
        assert!(other.is_none());
        assert!(session.find_message("other@example.com").1.is_none());

        assert_eq!(session.remove_message(Path::new("msg")), Status::FileError);
        assert!(session.find_message_by_filename(Path::new("msg")).1.is_some());

        fs::remove_dir(&tmp).unwrap();
        assert_eq!(msg.add_tag("x"), Status::Success);
        assert_eq!(msg.tags(), vec!["x".to_string()]);
        let reloaded = IndexState::load(session.path()).unwrap();
        assert_eq!(reloaded.messages.len(), 1);
    }
}
