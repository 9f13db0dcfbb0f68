/*
 * status.rs
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

//! Engine status codes (notmuch_status_t) and their descriptions.

use std::fmt;

/// Result of every engine call. Numeric values match notmuch_status_t.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    OutOfMemory,
    ReadOnlyDatabase,
    XapianException,
    FileError,
    FileNotEmail,
    DuplicateMessageId,
    NullPointer,
    TagTooLong,
    UnbalancedFreezeThaw,
    UnbalancedAtomic,
    UnsupportedOperation,
    UpgradeRequired,
    PathError,
    Ignored,
    IllegalArgument,
    MalformedCryptoProtocol,
    FailedCryptoContextCreation,
    UnknownCryptoProtocol,
    NoConfig,
    NoDatabase,
    DatabaseExists,
    BadQuerySyntax,
    NoMailRoot,
    ClosedDatabase,
    /// A value this binding does not know (newer libnotmuch).
    Unknown(u32),
}

const KNOWN: [Status; 25] = [
    Status::Success,
    Status::OutOfMemory,
    Status::ReadOnlyDatabase,
    Status::XapianException,
    Status::FileError,
    Status::FileNotEmail,
    Status::DuplicateMessageId,
    Status::NullPointer,
    Status::TagTooLong,
    Status::UnbalancedFreezeThaw,
    Status::UnbalancedAtomic,
    Status::UnsupportedOperation,
    Status::UpgradeRequired,
    Status::PathError,
    Status::Ignored,
    Status::IllegalArgument,
    Status::MalformedCryptoProtocol,
    Status::FailedCryptoContextCreation,
    Status::UnknownCryptoProtocol,
    Status::NoConfig,
    Status::NoDatabase,
    Status::DatabaseExists,
    Status::BadQuerySyntax,
    Status::NoMailRoot,
    Status::ClosedDatabase,
];

impl Status {
    /// Map a raw notmuch_status_t value.
    pub fn from_raw(raw: u32) -> Self {
        KNOWN.get(raw as usize).copied().unwrap_or(Status::Unknown(raw))
    }

    pub fn to_raw(self) -> u32 {
        match self {
            Status::Unknown(raw) => raw,
            known => KNOWN.iter().position(|s| *s == known).unwrap_or(0) as u32,
        }
    }

    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Human-readable description, worded as notmuch_status_to_string words it.
    pub fn description(self) -> &'static str {
        match self {
            Status::Success => "No error occurred",
            Status::OutOfMemory => "Out of memory",
            Status::ReadOnlyDatabase => "Attempt to write to a read-only database",
            Status::XapianException => "A Xapian exception occurred",
            Status::FileError => "Something went wrong trying to read or write a file",
            Status::FileNotEmail => "File is not an email",
            Status::DuplicateMessageId => "Message ID is identical to a message in database",
            Status::NullPointer => "Erroneous NULL pointer",
            Status::TagTooLong => "Tag value is too long (exceeds NOTMUCH_TAG_MAX)",
            Status::UnbalancedFreezeThaw => {
                "Unbalanced number of calls to notmuch_message_freeze/thaw"
            }
            Status::UnbalancedAtomic => {
                "Unbalanced number of calls to notmuch_database_begin_atomic/end_atomic"
            }
            Status::UnsupportedOperation => "Unsupported operation",
            Status::UpgradeRequired => "Operation requires a database upgrade",
            Status::PathError => "Path supplied is illegal for this function",
            Status::Ignored => "Argument was ignored",
            Status::IllegalArgument => "Illegal argument for function",
            Status::MalformedCryptoProtocol => "Crypto protocol missing, malformed, or unintelligible",
            Status::FailedCryptoContextCreation => "Failed to create crypto context",
            Status::UnknownCryptoProtocol => "Unknown crypto protocol",
            Status::NoConfig => "No configuration file found",
            Status::NoDatabase => "No database found",
            Status::DatabaseExists => "Database exists, not recreated",
            Status::BadQuerySyntax => "Syntax error in query",
            Status::NoMailRoot => "No mail root found",
            Status::ClosedDatabase => "Operation on closed database",
            Status::Unknown(_) => "Unknown error status value",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
