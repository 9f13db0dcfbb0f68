/*
 * headers.rs
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

//! RFC 5322 header block reader: unfolds continuation lines, stops at the first empty line.

use sha1::{Digest, Sha1};

/// Header fields in file order (name as written, unfolded value).
#[derive(Debug, Default)]
pub(crate) struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Parse the header block. None when the content does not start with a header field.
    pub(crate) fn parse(raw: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(raw);
        let mut fields: Vec<(String, String)> = Vec::new();
        let mut lines = text.split('\n').peekable();
        // mbox separator left at the top of a single-message file
        if lines.peek().map_or(false, |l| l.starts_with("From ")) {
            lines.next();
        }
        for line in lines {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                break;
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                match fields.last_mut() {
                    Some((_, value)) => {
                        value.push(' ');
                        value.push_str(line.trim());
                    }
                    None => return None,
                }
                continue;
            }
            let colon = line.find(':')?;
            let name = &line[..colon];
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic()) {
                return None;
            }
            fields.push((name.to_string(), line[colon + 1..].trim().to_string()));
        }
        if fields.is_empty() {
            None
        } else {
            Some(Self { fields })
        }
    }

    /// First value of a header, case-insensitive.
    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Seconds since the epoch from the Date header.
    pub(crate) fn date(&self) -> Option<i64> {
        let raw = self.get("Date")?;
        let without_comment = match raw.find('(') {
            Some(i) => raw[..i].trim(),
            None => raw,
        };
        chrono::DateTime::parse_from_rfc2822(without_comment)
            .ok()
            .map(|d| d.timestamp())
    }
}

/// Message-id from a Message-Id header value: angle brackets and surrounding space removed.
pub(crate) fn parse_message_id(value: &str) -> Option<String> {
    let v = value.trim();
    let inner = match (v.find('<'), v.find('>')) {
        (Some(start), Some(end)) if start < end => &v[start + 1..end],
        _ => v,
    };
    let inner = inner.trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

/// Id assigned to a message without a usable Message-Id: digest of the file content.
pub(crate) fn synthetic_message_id(raw: &[u8]) -> String {
    format!("notmuch-sha1-{:x}", Sha1::digest(raw))
}
