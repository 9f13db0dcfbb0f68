/*
 * lib.rs
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

//! Safe binding to the notmuch mail index: Database, Message, tags and freeze/thaw,
//! plus maildir helpers and a sync driver.
//!
//! The native libnotmuch engine is used when the `notmuch` feature is enabled; otherwise a
//! file-backed engine with the same semantics stores the index under `<path>/.notmuch`.

pub mod config;
pub mod database;
mod engine;
pub mod error;
pub mod maildir;
pub mod message;
pub mod status;
pub mod sync;

pub use config::SyncConfig;
pub use database::{Backend, Database, IndexOutcome, Mode, RemoveOutcome};
pub use error::{Error, Result};
pub use message::{FreezeState, Message, TAG_MAX};
pub use status::Status;
pub use sync::{SyncReport, Syncer};
