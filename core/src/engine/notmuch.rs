/*
 * notmuch.rs
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

//! libnotmuch backend. Every call goes straight to the C library; statuses are returned
//! unchanged. Message handles borrow the session so they are destroyed before it.

use crate::database::Mode;
use crate::engine::{MessageBox, MessageHandle, Session};
use crate::status::Status;
use libc::c_char;
use nmsync_ffi as ffi;
use std::ffi::{CStr, CString, OsStr};
use std::marker::PhantomData;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr;

fn status(raw: ffi::notmuch_status_t) -> Status {
    Status::from_raw(raw)
}

/// Path bytes as a C string. Interior NUL is an illegal argument.
fn c_path(path: &Path) -> Result<CString, Status> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| Status::IllegalArgument)
}

fn c_str(s: &str) -> Result<CString, Status> {
    CString::new(s).map_err(|_| Status::IllegalArgument)
}

/// Copy a string owned by libnotmuch. NULL gives None.
unsafe fn owned_string(p: *const c_char) -> Option<String> {
    if p.is_null() {
        None
    } else {
        Some(CStr::from_ptr(p).to_string_lossy().into_owned())
    }
}

unsafe fn owned_path(p: *const c_char) -> Option<PathBuf> {
    if p.is_null() {
        None
    } else {
        Some(PathBuf::from(OsStr::from_bytes(CStr::from_ptr(p).to_bytes())))
    }
}

pub(crate) struct NotmuchSession {
    db: *mut ffi::notmuch_database_t,
    path: PathBuf,
}

impl NotmuchSession {
    fn from_raw(db: *mut ffi::notmuch_database_t, fallback: &Path) -> Self {
        let path = unsafe { owned_path(ffi::notmuch_database_get_path(db)) };
        Self {
            db,
            path: path.unwrap_or_else(|| fallback.to_path_buf()),
        }
    }

    pub(crate) fn create(path: &Path) -> Result<Self, Status> {
        let c = c_path(path)?;
        let mut db = ptr::null_mut();
        let st = status(unsafe { ffi::notmuch_database_create(c.as_ptr(), &mut db) });
        if !st.is_success() {
            return Err(st);
        }
        Ok(Self::from_raw(db, path))
    }

    pub(crate) fn open(path: &Path, mode: Mode) -> Result<Self, Status> {
        let c = c_path(path)?;
        let raw_mode = match mode {
            Mode::ReadOnly => ffi::NOTMUCH_DATABASE_MODE_READ_ONLY,
            Mode::ReadWrite => ffi::NOTMUCH_DATABASE_MODE_READ_WRITE,
        };
        let mut db = ptr::null_mut();
        let st = status(unsafe { ffi::notmuch_database_open(c.as_ptr(), raw_mode, &mut db) });
        if !st.is_success() {
            return Err(st);
        }
        Ok(Self::from_raw(db, path))
    }

    fn message<'a>(&'a self, msg: *mut ffi::notmuch_message_t) -> Option<MessageBox<'a>> {
        if msg.is_null() {
            None
        } else {
            Some(Box::new(NotmuchMessage {
                msg,
                _session: PhantomData,
            }))
        }
    }
}

impl Session for NotmuchSession {
    fn path(&self) -> &Path {
        &self.path
    }

    fn needs_upgrade(&self) -> bool {
        unsafe { ffi::notmuch_database_needs_upgrade(self.db) != 0 }
    }

    fn upgrade(&self) -> Status {
        status(unsafe { ffi::notmuch_database_upgrade(self.db, None, ptr::null_mut()) })
    }

    fn index_file(&self, path: &Path) -> (Status, Option<MessageBox<'_>>) {
        let c = match c_path(path) {
            Ok(c) => c,
            Err(s) => return (s, None),
        };
        let mut msg = ptr::null_mut();
        let st = status(unsafe {
            ffi::notmuch_database_index_file(self.db, c.as_ptr(), ptr::null_mut(), &mut msg)
        });
        match st {
            Status::Success | Status::DuplicateMessageId => (st, self.message(msg)),
            _ => (st, None),
        }
    }

    fn remove_message(&self, path: &Path) -> Status {
        match c_path(path) {
            Ok(c) => status(unsafe { ffi::notmuch_database_remove_message(self.db, c.as_ptr()) }),
            Err(s) => s,
        }
    }

    fn find_message(&self, id: &str) -> (Status, Option<MessageBox<'_>>) {
        let c = match c_str(id) {
            Ok(c) => c,
            Err(s) => return (s, None),
        };
        let mut msg = ptr::null_mut();
        let st = status(unsafe { ffi::notmuch_database_find_message(self.db, c.as_ptr(), &mut msg) });
        if !st.is_success() {
            return (st, None);
        }
        (st, self.message(msg))
    }

    fn find_message_by_filename(&self, path: &Path) -> (Status, Option<MessageBox<'_>>) {
        let c = match c_path(path) {
            Ok(c) => c,
            Err(s) => return (s, None),
        };
        let mut msg = ptr::null_mut();
        let st = status(unsafe {
            ffi::notmuch_database_find_message_by_filename(self.db, c.as_ptr(), &mut msg)
        });
        if !st.is_success() {
            return (st, None);
        }
        (st, self.message(msg))
    }

    fn close(&mut self) -> Status {
        if self.db.is_null() {
            return Status::Success;
        }
        let st = status(unsafe { ffi::notmuch_database_destroy(self.db) });
        self.db = ptr::null_mut();
        st
    }
}

impl Drop for NotmuchSession {
    fn drop(&mut self) {
        let st = self.close();
        if !st.is_success() {
            log::warn!("closing database {} on drop: {}", self.path.display(), st);
        }
    }
}

struct NotmuchMessage<'a> {
    msg: *mut ffi::notmuch_message_t,
    _session: PhantomData<&'a NotmuchSession>,
}

impl NotmuchMessage<'_> {
    fn tag_call(
        &mut self,
        tag: &str,
        f: unsafe extern "C" fn(*mut ffi::notmuch_message_t, *const c_char) -> ffi::notmuch_status_t,
    ) -> Status {
        match c_str(tag) {
            Ok(c) => status(unsafe { f(self.msg, c.as_ptr()) }),
            Err(s) => s,
        }
    }
}

impl MessageHandle for NotmuchMessage<'_> {
    fn message_id(&self) -> String {
        unsafe { owned_string(ffi::notmuch_message_get_message_id(self.msg)) }.unwrap_or_default()
    }

    fn file_name(&self) -> PathBuf {
        unsafe { owned_path(ffi::notmuch_message_get_filename(self.msg)) }.unwrap_or_default()
    }

    fn file_names(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        unsafe {
            let names = ffi::notmuch_message_get_filenames(self.msg);
            if names.is_null() {
                return out;
            }
            while ffi::notmuch_filenames_valid(names) != 0 {
                if let Some(p) = owned_path(ffi::notmuch_filenames_get(names)) {
                    out.push(p);
                }
                ffi::notmuch_filenames_move_to_next(names);
            }
            ffi::notmuch_filenames_destroy(names);
        }
        out
    }

    fn header(&self, name: &str) -> (Status, Option<String>) {
        let c = match c_str(name) {
            Ok(c) => c,
            Err(s) => return (s, None),
        };
        let value = unsafe { ffi::notmuch_message_get_header(self.msg, c.as_ptr()) };
        if value.is_null() {
            // NULL means the file could not be read; "" means the header is absent
            return (Status::FileError, None);
        }
        let value = unsafe { owned_string(value) }.filter(|v| !v.is_empty());
        (Status::Success, value)
    }

    fn date(&self) -> Option<i64> {
        let t = unsafe { ffi::notmuch_message_get_date(self.msg) };
        if t == 0 {
            None
        } else {
            Some(t as i64)
        }
    }

    fn tags(&self) -> Vec<String> {
        let mut out = Vec::new();
        unsafe {
            let tags = ffi::notmuch_message_get_tags(self.msg);
            if tags.is_null() {
                return out;
            }
            while ffi::notmuch_tags_valid(tags) != 0 {
                if let Some(t) = owned_string(ffi::notmuch_tags_get(tags)) {
                    out.push(t);
                }
                ffi::notmuch_tags_move_to_next(tags);
            }
            ffi::notmuch_tags_destroy(tags);
        }
        out
    }

    fn add_tag(&mut self, tag: &str) -> Status {
        self.tag_call(tag, ffi::notmuch_message_add_tag)
    }

    fn remove_tag(&mut self, tag: &str) -> Status {
        self.tag_call(tag, ffi::notmuch_message_remove_tag)
    }

    fn remove_all_tags(&mut self) -> Status {
        status(unsafe { ffi::notmuch_message_remove_all_tags(self.msg) })
    }

    fn freeze(&mut self) -> Status {
        status(unsafe { ffi::notmuch_message_freeze(self.msg) })
    }

    fn thaw(&mut self) -> Status {
        status(unsafe { ffi::notmuch_message_thaw(self.msg) })
    }

    fn maildir_flags_to_tags(&mut self) -> Status {
        status(unsafe { ffi::notmuch_message_maildir_flags_to_tags(self.msg) })
    }

    fn tags_to_maildir_flags(&mut self) -> Status {
        status(unsafe { ffi::notmuch_message_tags_to_maildir_flags(self.msg) })
    }
}

impl Drop for NotmuchMessage<'_> {
    fn drop(&mut self) {
        unsafe { ffi::notmuch_message_destroy(self.msg) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Backend, Database, IndexOutcome};
    use std::fs;

    const MESSAGE: &str = "From: Sample Message <return@example.com>
Subject: Some test message
Date: Mon, 26 Feb 2018 00:00:00 +0200
Message-Id: <00000000-0000-0000-0000-000000000000@example.com>
To: Test Account <test@example.com>

This is some very sample message.
";

    #[test]
    fn descriptions_match_the_library() {
        for raw in 0..25 {
            let s = Status::from_raw(raw);
            let d = unsafe { owned_string(ffi::notmuch_status_to_string(s.to_raw())) };
            assert_eq!(d.as_deref(), Some(s.description()), "description of {:?}", s);
        }
    }

    #[test]
    fn native_tag_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("message");
        fs::write(&file, MESSAGE).unwrap();

        Database::create_with(Backend::Notmuch, dir.path()).unwrap().close().unwrap();
        let db = Database::open_with(Backend::Notmuch, dir.path(), Mode::ReadWrite).unwrap();
        assert!(db.find_message("doesnt-exist").unwrap().is_none());

        let (msg, outcome) = db.index_file(&file).unwrap();
        assert_eq!(outcome, IndexOutcome::New);
        let id = msg.id();
        assert_eq!(id, "00000000-0000-0000-0000-000000000000@example.com");
        drop(msg);

        let mut msg = db.find_message(&id).unwrap().unwrap();
        assert!(msg.tags().is_empty());
        msg.add_tag("tag1").unwrap();
        msg.add_tag("tag2").unwrap();
        assert_eq!(msg.tags(), vec!["tag1", "tag2"]);
        msg.freeze().unwrap();
        msg.remove_tag("tag1").unwrap();
        msg.thaw().unwrap();
        assert_eq!(msg.tags(), vec!["tag2"]);
        msg.remove_all_tags().unwrap();
        assert!(msg.tags().is_empty());
        drop(msg);

        let (_, outcome) = db.index_file(&file).unwrap();
        assert_eq!(outcome, IndexOutcome::Duplicate);
        db.close().unwrap();
    }
}
