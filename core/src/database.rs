/*
 * database.rs
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

//! Database handle: session lifecycle, indexing and lookup.
//!
//! A `Database` owns one engine session. Message handles borrow the database, so the
//! session cannot be closed while any of them is alive. Neither type is `Send` or `Sync`:
//! the engine gives no guarantee for concurrent use of one session.

use crate::engine::local::LocalSession;
use crate::engine::Session;
use crate::error::{check, Error, Result};
use crate::message::Message;
use crate::status::Status;
use std::fmt;
use std::path::{Path, PathBuf};

/// Access mode for an existing database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ReadOnly,
    ReadWrite,
}

/// Engine implementation behind a database handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// System libnotmuch.
    #[cfg(feature = "notmuch")]
    Notmuch,
    /// Built-in file-backed engine.
    Local,
}

impl Default for Backend {
    #[cfg(feature = "notmuch")]
    fn default() -> Self {
        Backend::Notmuch
    }

    #[cfg(not(feature = "notmuch"))]
    fn default() -> Self {
        Backend::Local
    }
}

/// How `index_file` resolved the file's message-id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// A new message was added.
    New,
    /// A message with the same id already existed; the file was merged into it.
    Duplicate,
}

/// What `remove_message` left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The message is gone from the index (or the filename was not known).
    Removed,
    /// The message is still reachable through other filenames.
    StillReferenced,
}

impl RemoveOutcome {
    pub fn has_more_filenames(self) -> bool {
        self == RemoveOutcome::StillReferenced
    }
}

/// Open engine session bound to one filesystem path.
pub struct Database {
    session: Box<dyn Session>,
    backend: Backend,
    mode: Mode,
}

impl Database {
    /// Create a new, empty database at `path` with the default backend.
    ///
    /// `path` should be the top-level directory of a collection of plain-text messages
    /// (one message per file). The engine keeps its data in a `.notmuch` directory inside it.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with(Backend::default(), path)
    }

    pub fn create_with(backend: Backend, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let session: Box<dyn Session> = match backend {
            #[cfg(feature = "notmuch")]
            Backend::Notmuch => Box::new(crate::engine::notmuch::NotmuchSession::create(path)?),
            Backend::Local => Box::new(LocalSession::create(path)?),
        };
        log::debug!("created {:?} database at {}", backend, session.path().display());
        Ok(Self {
            session,
            backend,
            mode: Mode::ReadWrite,
        })
    }

    /// Open an existing database at `path` with the default backend.
    pub fn open(path: impl AsRef<Path>, mode: Mode) -> Result<Self> {
        Self::open_with(Backend::default(), path, mode)
    }

    pub fn open_with(backend: Backend, path: impl AsRef<Path>, mode: Mode) -> Result<Self> {
        let path = path.as_ref();
        let session: Box<dyn Session> = match backend {
            #[cfg(feature = "notmuch")]
            Backend::Notmuch => Box::new(crate::engine::notmuch::NotmuchSession::open(path, mode)?),
            Backend::Local => Box::new(LocalSession::open(path, mode)?),
        };
        log::debug!("opened {:?} database at {} ({:?})", backend, session.path().display(), mode);
        Ok(Self { session, backend, mode })
    }

    /// Close the database, releasing all engine resources. Dropping a database closes it too,
    /// but only `close` reports a failure.
    pub fn close(mut self) -> Result<()> {
        check(self.session.close())
    }

    pub fn path(&self) -> &Path {
        self.session.path()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Does this database need to be upgraded before writing to it?
    pub fn needs_upgrade(&self) -> bool {
        self.session.needs_upgrade()
    }

    pub fn upgrade(&self) -> Result<()> {
        check(self.session.upgrade())
    }

    /// Add a message file, indexing it for retrieval by future searches. If a message with
    /// the same message-id already exists, the new filename is associated with it and the
    /// outcome is `Duplicate`.
    pub fn index_file(&self, path: impl AsRef<Path>) -> Result<(Message<'_>, IndexOutcome)> {
        let path = path.as_ref();
        let (status, handle) = self.session.index_file(path);
        let outcome = match status {
            Status::Success => IndexOutcome::New,
            Status::DuplicateMessageId => IndexOutcome::Duplicate,
            other => return Err(Error::Engine(other)),
        };
        let handle = handle.ok_or(Error::Engine(Status::NullPointer))?;
        log::trace!("indexed {} ({:?})", path.display(), outcome);
        Ok((Message::new(handle), outcome))
    }

    /// Remove a filename from the database. When the last filename of a message is removed,
    /// the message itself is removed.
    pub fn remove_message(&self, path: impl AsRef<Path>) -> Result<RemoveOutcome> {
        match self.session.remove_message(path.as_ref()) {
            Status::Success => Ok(RemoveOutcome::Removed),
            Status::DuplicateMessageId => Ok(RemoveOutcome::StillReferenced),
            other => Err(Error::Engine(other)),
        }
    }

    /// Find a message by message-id. `Ok(None)` if there is none.
    pub fn find_message(&self, id: &str) -> Result<Option<Message<'_>>> {
        let (status, handle) = self.session.find_message(id);
        check(status)?;
        Ok(handle.map(Message::new))
    }

    /// Find the message a filename belongs to. `Ok(None)` if the filename is not indexed.
    pub fn find_message_by_filename(&self, path: impl AsRef<Path>) -> Result<Option<Message<'_>>> {
        let (status, handle) = self.session.find_message_by_filename(path.as_ref());
        check(status)?;
        Ok(handle.map(Message::new))
    }

    /// Resolve a possibly relative filename the way the engine does.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.session.resolve(path.as_ref())
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path())
            .field("backend", &self.backend)
            .field("mode", &self.mode)
            .finish()
    }
}
