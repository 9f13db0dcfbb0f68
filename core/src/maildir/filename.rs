/*
 * filename.rs
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

//! Maildir filename parse/format.
//! Format: <base>[:2,<flags>]  e.g. 1733356800.M12345P678.host,S=4523:2,FS
//! The base is kept opaque; only the info part after ":2," is interpreted.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

const INFO_SEPARATOR: &str = ":2,";

/// Maildir subdirectory a message file lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subdir {
    Cur,
    New,
}

impl Subdir {
    pub fn as_str(self) -> &'static str {
        match self {
            Subdir::Cur => "cur",
            Subdir::New => "new",
        }
    }

    /// Subdirectory of `path` if its parent directory is named cur or new.
    pub fn of(path: &Path) -> Option<Subdir> {
        let parent = path.parent()?.file_name()?;
        if parent == OsStr::new("cur") {
            Some(Subdir::Cur)
        } else if parent == OsStr::new("new") {
            Some(Subdir::New)
        } else {
            None
        }
    }
}

/// Parsed Maildir filename (base and info flags).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaildirFilename {
    pub base: String,
    /// Flag characters from the info part; None when the name has no ":2," info.
    pub flags: Option<BTreeSet<char>>,
}

impl MaildirFilename {
    pub fn parse(filename: &str) -> Self {
        match filename.rfind(INFO_SEPARATOR) {
            Some(i) => Self {
                base: filename[..i].to_string(),
                flags: Some(filename[i + INFO_SEPARATOR.len()..].chars().collect()),
            },
            None => Self {
                base: filename.to_string(),
                flags: None,
            },
        }
    }

    /// Flags as a set (empty when there is no info part).
    pub fn flag_set(&self) -> BTreeSet<char> {
        self.flags.clone().unwrap_or_default()
    }

    /// Full filename; the info part is written only when flags are present.
    pub fn to_filename(&self) -> String {
        match &self.flags {
            Some(flags) => {
                let mut s = self.base.clone();
                s.push_str(INFO_SEPARATOR);
                s.extend(flags.iter());
                s
            }
            None => self.base.clone(),
        }
    }

    /// New filename with updated flags (for rename).
    pub fn with_flags(&self, flags: BTreeSet<char>) -> Self {
        Self {
            base: self.base.clone(),
            flags: Some(flags),
        }
    }
}

/// Target path of a message file after its flags change: always under cur/ of the same maildir.
pub fn renamed_path(path: &Path, flags: BTreeSet<char>) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let maildir = path.parent()?.parent()?;
    let renamed = MaildirFilename::parse(name).with_flags(flags);
    Some(maildir.join(Subdir::Cur.as_str()).join(renamed.to_filename()))
}
