/*
 * message.rs
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

//! Message handle: identity, filenames, headers, tags and freeze/thaw.

use crate::engine::MessageBox;
use crate::error::{check, Error, Result};
use crate::status::Status;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// Maximum tag length in bytes.
pub const TAG_MAX: usize = 200;

/// Whether tag changes are being buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeState {
    Normal,
    Frozen,
}

/// One message in an open database. Released when dropped.
pub struct Message<'db> {
    handle: MessageBox<'db>,
    state: FreezeState,
}

fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() || tag.contains('\0') {
        return Err(Error::Engine(Status::IllegalArgument));
    }
    if tag.len() > TAG_MAX {
        return Err(Error::Engine(Status::TagTooLong));
    }
    Ok(())
}

impl<'db> Message<'db> {
    pub(crate) fn new(handle: MessageBox<'db>) -> Self {
        Self {
            handle,
            state: FreezeState::Normal,
        }
    }

    /// The message-id. Angle brackets are not part of it.
    pub fn id(&self) -> String {
        self.handle.message_id()
    }

    /// One filename of the message. A message may have several; see `file_names`.
    pub fn file_name(&self) -> PathBuf {
        self.handle.file_name()
    }

    pub fn file_names(&self) -> Vec<PathBuf> {
        self.handle.file_names()
    }

    /// Value of a header, read from the message file. `Ok(None)` if the header is absent.
    pub fn header(&self, name: &str) -> Result<Option<String>> {
        if name.contains('\0') {
            return Err(Error::Engine(Status::IllegalArgument));
        }
        let (status, value) = self.handle.header(name);
        check(status)?;
        Ok(value)
    }

    /// Date of the message, None when it has no usable Date header.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.handle
            .date()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Tags of the message in engine order (ascending). Changes made while frozen are not
    /// visible until `thaw`.
    pub fn tags(&self) -> Vec<String> {
        self.handle.tags()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().iter().any(|t| t == tag)
    }

    /// Add a tag. Adding a tag that is already present is not an error.
    pub fn add_tag(&mut self, tag: &str) -> Result<()> {
        validate_tag(tag)?;
        check(self.handle.add_tag(tag))
    }

    /// Remove a tag. Removing a tag that is absent is not an error.
    pub fn remove_tag(&mut self, tag: &str) -> Result<()> {
        validate_tag(tag)?;
        check(self.handle.remove_tag(tag))
    }

    pub fn remove_all_tags(&mut self) -> Result<()> {
        check(self.handle.remove_all_tags())
    }

    pub fn freeze_state(&self) -> FreezeState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.state == FreezeState::Frozen
    }

    /// Start buffering tag changes. They are committed together by `thaw`.
    /// Fails with UnbalancedFreezeThaw if the message is already frozen.
    pub fn freeze(&mut self) -> Result<()> {
        if self.state == FreezeState::Frozen {
            return Err(Error::Engine(Status::UnbalancedFreezeThaw));
        }
        check(self.handle.freeze())?;
        self.state = FreezeState::Frozen;
        Ok(())
    }

    /// Commit the tag changes buffered since `freeze`.
    /// Fails with UnbalancedFreezeThaw if the message is not frozen.
    pub fn thaw(&mut self) -> Result<()> {
        if self.state == FreezeState::Normal {
            return Err(Error::Engine(Status::UnbalancedFreezeThaw));
        }
        let status = self.handle.thaw();
        // the engine leaves the frozen state whatever the commit outcome
        self.state = FreezeState::Normal;
        check(status)
    }

    /// Set tags from the maildir flags of the message's files (S clears unread, F flagged,
    /// R replied, P passed, D draft). Files outside a maildir are ignored.
    pub fn maildir_flags_to_tags(&mut self) -> Result<()> {
        check(self.handle.maildir_flags_to_tags())
    }

    /// Rename the message's maildir files so their flags match the tags.
    pub fn tags_to_maildir_flags(&mut self) -> Result<()> {
        check(self.handle.tags_to_maildir_flags())
    }
}

impl fmt::Debug for Message<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id())
            .field("state", &self.state)
            .finish()
    }
}
