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

//! Engine seam: the raw session/message contract each backend implements.
//!
//! Methods mirror the C API shape: they return the engine's status unchanged (plus an
//! out-value where the C call has one). Translating statuses into results is left to
//! `Database` and `Message`, per operation.

pub(crate) mod local;
#[cfg(feature = "notmuch")]
pub(crate) mod notmuch;

use crate::status::Status;
use std::path::{Path, PathBuf};

/// Message handle borrowed from a session.
pub(crate) type MessageBox<'s> = Box<dyn MessageHandle + 's>;

/// An open engine session bound to one database path.
pub(crate) trait Session {
    fn path(&self) -> &Path;

    fn needs_upgrade(&self) -> bool;

    fn upgrade(&self) -> Status;

    /// Success or DuplicateMessageId come with a message; other statuses come without.
    fn index_file(&self, path: &Path) -> (Status, Option<MessageBox<'_>>);

    /// Success: removed (or unknown). DuplicateMessageId: other filenames remain.
    fn remove_message(&self, path: &Path) -> Status;

    /// Success with None when the id is unknown.
    fn find_message(&self, id: &str) -> (Status, Option<MessageBox<'_>>);

    fn find_message_by_filename(&self, path: &Path) -> (Status, Option<MessageBox<'_>>);

    /// Filename the engine stores for `path`. Relative paths are relative to the database path.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.path().join(path)
        }
    }

    /// Release the session. Later calls are no-ops returning Success.
    fn close(&mut self) -> Status;
}

/// One message within a session. Dropping the handle releases it.
pub(crate) trait MessageHandle {
    fn message_id(&self) -> String;

    fn file_name(&self) -> PathBuf;

    fn file_names(&self) -> Vec<PathBuf>;

    fn header(&self, name: &str) -> (Status, Option<String>);

    /// Seconds since the epoch, None when the message has no usable date.
    fn date(&self) -> Option<i64>;

    fn tags(&self) -> Vec<String>;

    fn add_tag(&mut self, tag: &str) -> Status;

    fn remove_tag(&mut self, tag: &str) -> Status;

    fn remove_all_tags(&mut self) -> Status;

    fn freeze(&mut self) -> Status;

    fn thaw(&mut self) -> Status;

    fn maildir_flags_to_tags(&mut self) -> Status;

    fn tags_to_maildir_flags(&mut self) -> Status;
}
