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

//! Raw C declarations for libnotmuch. Only the entry points nmsync calls are declared.
//! All strings are UTF-8 (or raw path bytes) NUL-terminated. Pointers returned by the
//! getters are owned by the talloc parent (database or message) and must not be freed.
//! Safe wrappers live in `nmsync_core`.

#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_uint, c_void, time_t};

/// notmuch_status_t. Values are stable across libnotmuch releases.
pub type notmuch_status_t = c_uint;

pub const NOTMUCH_STATUS_SUCCESS: notmuch_status_t = 0;
pub const NOTMUCH_STATUS_OUT_OF_MEMORY: notmuch_status_t = 1;
pub const NOTMUCH_STATUS_READ_ONLY_DATABASE: notmuch_status_t = 2;
pub const NOTMUCH_STATUS_XAPIAN_EXCEPTION: notmuch_status_t = 3;
pub const NOTMUCH_STATUS_FILE_ERROR: notmuch_status_t = 4;
pub const NOTMUCH_STATUS_FILE_NOT_EMAIL: notmuch_status_t = 5;
pub const NOTMUCH_STATUS_DUPLICATE_MESSAGE_ID: notmuch_status_t = 6;
pub const NOTMUCH_STATUS_NULL_POINTER: notmuch_status_t = 7;
pub const NOTMUCH_STATUS_TAG_TOO_LONG: notmuch_status_t = 8;
pub const NOTMUCH_STATUS_UNBALANCED_FREEZE_THAW: notmuch_status_t = 9;
pub const NOTMUCH_STATUS_UNBALANCED_ATOMIC: notmuch_status_t = 10;
pub const NOTMUCH_STATUS_UNSUPPORTED_OPERATION: notmuch_status_t = 11;
pub const NOTMUCH_STATUS_UPGRADE_REQUIRED: notmuch_status_t = 12;
pub const NOTMUCH_STATUS_PATH_ERROR: notmuch_status_t = 13;
pub const NOTMUCH_STATUS_IGNORED: notmuch_status_t = 14;
pub const NOTMUCH_STATUS_ILLEGAL_ARGUMENT: notmuch_status_t = 15;
pub const NOTMUCH_STATUS_MALFORMED_CRYPTO_PROTOCOL: notmuch_status_t = 16;
pub const NOTMUCH_STATUS_FAILED_CRYPTO_CONTEXT_CREATION: notmuch_status_t = 17;
pub const NOTMUCH_STATUS_UNKNOWN_CRYPTO_PROTOCOL: notmuch_status_t = 18;
pub const NOTMUCH_STATUS_NO_CONFIG: notmuch_status_t = 19;
pub const NOTMUCH_STATUS_NO_DATABASE: notmuch_status_t = 20;
pub const NOTMUCH_STATUS_DATABASE_EXISTS: notmuch_status_t = 21;
pub const NOTMUCH_STATUS_BAD_QUERY_SYNTAX: notmuch_status_t = 22;
pub const NOTMUCH_STATUS_NO_MAIL_ROOT: notmuch_status_t = 23;
pub const NOTMUCH_STATUS_CLOSED_DATABASE: notmuch_status_t = 24;

/// notmuch_database_mode_t.
pub type notmuch_database_mode_t = c_uint;

pub const NOTMUCH_DATABASE_MODE_READ_ONLY: notmuch_database_mode_t = 0;
pub const NOTMUCH_DATABASE_MODE_READ_WRITE: notmuch_database_mode_t = 1;

/// notmuch_bool_t (an int in the C API).
pub type notmuch_bool_t = c_int;

/// Maximum tag length in bytes (NOTMUCH_TAG_MAX).
pub const NOTMUCH_TAG_MAX: usize = 200;

/// Opaque handle types. Only ever used behind raw pointers.
#[repr(C)]
pub struct notmuch_database_t {
    _private: [u8; 0],
}

#[repr(C)]
pub struct notmuch_message_t {
    _private: [u8; 0],
}

#[repr(C)]
pub struct notmuch_tags_t {
    _private: [u8; 0],
}

#[repr(C)]
pub struct notmuch_filenames_t {
    _private: [u8; 0],
}

#[repr(C)]
pub struct notmuch_indexopts_t {
    _private: [u8; 0],
}

/// Progress callback for notmuch_database_upgrade (closure, fraction complete).
pub type notmuch_progress_notify_t = Option<extern "C" fn(*mut c_void, f64)>;

#[link(name = "notmuch")]
extern "C" {
    pub fn notmuch_status_to_string(status: notmuch_status_t) -> *const c_char;

    // --- Database ---

    pub fn notmuch_database_create(
        path: *const c_char,
        database: *mut *mut notmuch_database_t,
    ) -> notmuch_status_t;

    pub fn notmuch_database_open(
        path: *const c_char,
        mode: notmuch_database_mode_t,
        database: *mut *mut notmuch_database_t,
    ) -> notmuch_status_t;

    pub fn notmuch_database_destroy(database: *mut notmuch_database_t) -> notmuch_status_t;

    pub fn notmuch_database_get_path(database: *mut notmuch_database_t) -> *const c_char;

    pub fn notmuch_database_needs_upgrade(database: *mut notmuch_database_t) -> notmuch_bool_t;

    pub fn notmuch_database_upgrade(
        database: *mut notmuch_database_t,
        progress_notify: notmuch_progress_notify_t,
        closure: *mut c_void,
    ) -> notmuch_status_t;

    pub fn notmuch_database_index_file(
        database: *mut notmuch_database_t,
        filename: *const c_char,
        indexopts: *mut notmuch_indexopts_t,
        message: *mut *mut notmuch_message_t,
    ) -> notmuch_status_t;

    pub fn notmuch_database_remove_message(
        database: *mut notmuch_database_t,
        filename: *const c_char,
    ) -> notmuch_status_t;

    pub fn notmuch_database_find_message(
        database: *mut notmuch_database_t,
        message_id: *const c_char,
        message: *mut *mut notmuch_message_t,
    ) -> notmuch_status_t;

    pub fn notmuch_database_find_message_by_filename(
        database: *mut notmuch_database_t,
        filename: *const c_char,
        message: *mut *mut notmuch_message_t,
    ) -> notmuch_status_t;

    // --- Message ---

    pub fn notmuch_message_get_message_id(message: *mut notmuch_message_t) -> *const c_char;

    pub fn notmuch_message_get_filename(message: *mut notmuch_message_t) -> *const c_char;

    pub fn notmuch_message_get_filenames(message: *mut notmuch_message_t) -> *mut notmuch_filenames_t;

    pub fn notmuch_message_get_header(
        message: *mut notmuch_message_t,
        header: *const c_char,
    ) -> *const c_char;

    pub fn notmuch_message_get_date(message: *mut notmuch_message_t) -> time_t;

    pub fn notmuch_message_get_tags(message: *mut notmuch_message_t) -> *mut notmuch_tags_t;

    pub fn notmuch_message_add_tag(message: *mut notmuch_message_t, tag: *const c_char) -> notmuch_status_t;

    pub fn notmuch_message_remove_tag(message: *mut notmuch_message_t, tag: *const c_char) -> notmuch_status_t;

    pub fn notmuch_message_remove_all_tags(message: *mut notmuch_message_t) -> notmuch_status_t;

    pub fn notmuch_message_maildir_flags_to_tags(message: *mut notmuch_message_t) -> notmuch_status_t;

    pub fn notmuch_message_tags_to_maildir_flags(message: *mut notmuch_message_t) -> notmuch_status_t;

    pub fn notmuch_message_freeze(message: *mut notmuch_message_t) -> notmuch_status_t;

    pub fn notmuch_message_thaw(message: *mut notmuch_message_t) -> notmuch_status_t;

    pub fn notmuch_message_destroy(message: *mut notmuch_message_t);

    // --- Tag and filename cursors ---

    pub fn notmuch_tags_valid(tags: *mut notmuch_tags_t) -> notmuch_bool_t;

    pub fn notmuch_tags_get(tags: *mut notmuch_tags_t) -> *const c_char;

    pub fn notmuch_tags_move_to_next(tags: *mut notmuch_tags_t);

    pub fn notmuch_tags_destroy(tags: *mut notmuch_tags_t);

    pub fn notmuch_filenames_valid(filenames: *mut notmuch_filenames_t) -> notmuch_bool_t;

    pub fn notmuch_filenames_get(filenames: *mut notmuch_filenames_t) -> *const c_char;

    pub fn notmuch_filenames_move_to_next(filenames: *mut notmuch_filenames_t);

    pub fn notmuch_filenames_destroy(filenames: *mut notmuch_filenames_t);
}
