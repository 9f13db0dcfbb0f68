/*
 * error.rs
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

//! Binding, sync and configuration errors.

use crate::status::Status;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors from Database, Message, Syncer or config operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Engine reported a non-success status. The only kind returned by binding operations.
    #[error("notmuch: {0}")]
    Engine(Status),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Engine status, if this is an engine error.
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::Engine(s) => Some(*s),
            _ => None,
        }
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Error::Engine(status)
    }
}

/// Ok for Success, the status as an error otherwise. No status is treated as success-like here;
/// call sites that accept DuplicateMessageId match on it themselves.
pub(crate) fn check(status: Status) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Engine(status))
    }
}
