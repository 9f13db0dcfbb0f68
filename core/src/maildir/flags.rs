/*
 * flags.rs
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

//! Maildir flag <-> tag mapping (same table notmuch uses).

use super::filename::{MaildirFilename, Subdir};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Maildir flag, tag, and whether the tag is set when the flag is absent.
pub const FLAG_TAGS: [(char, &str, bool); 5] = [
    ('D', "draft", false),
    ('F', "flagged", false),
    ('P', "passed", false),
    ('R', "replied", false),
    ('S', "unread", true),
];

/// Union of the flags of all filenames that live in a maildir (cur/ or new/).
/// None when no filename is in a maildir, in which case tags are left alone.
pub fn combined_flags(filenames: &[PathBuf]) -> Option<BTreeSet<char>> {
    let mut in_maildir = false;
    let mut combined = BTreeSet::new();
    for path in filenames {
        if Subdir::of(path).is_none() {
            continue;
        }
        in_maildir = true;
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            combined.extend(MaildirFilename::parse(name).flag_set());
        }
    }
    in_maildir.then_some(combined)
}

/// Tag changes implied by a flag set: (tag, should_be_present).
pub fn tag_changes(flags: &BTreeSet<char>) -> Vec<(&'static str, bool)> {
    FLAG_TAGS
        .iter()
        .map(|(flag, tag, inverse)| (*tag, flags.contains(flag) != *inverse))
        .collect()
}

/// Flags for a file given the message tags. Flags outside the table are preserved.
pub fn flags_for_tags<S: AsRef<str>>(existing: &BTreeSet<char>, tags: &[S]) -> BTreeSet<char> {
    let mut flags: BTreeSet<char> = existing
        .iter()
        .copied()
        .filter(|c| !FLAG_TAGS.iter().any(|(flag, _, _)| flag == c))
        .collect();
    for (flag, tag, inverse) in FLAG_TAGS {
        let tagged = tags.iter().any(|t| t.as_ref() == tag);
        if tagged != inverse {
            flags.insert(flag);
        }
    }
    flags
}

/// New path for a message file so its info part reflects `tags`. None when nothing changes:
/// file not in a maildir, same flags, or a file in new/ that would gain no flags.
pub fn path_for_tags<S: AsRef<str>>(path: &Path, tags: &[S]) -> Option<PathBuf> {
    let subdir = Subdir::of(path)?;
    let name = path.file_name()?.to_str()?;
    let parsed = MaildirFilename::parse(name);
    let flags = flags_for_tags(&parsed.flag_set(), tags);
    match subdir {
        Subdir::New if flags.is_empty() => None,
        Subdir::Cur if parsed.flags.as_ref() == Some(&flags) => None,
        _ => super::filename::renamed_path(path, flags),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seen_flag_clears_unread() {
        let flags = BTreeSet::from(['S', 'F']);
        let changes = tag_changes(&flags);
        assert!(changes.contains(&("unread", false)));
        assert!(changes.contains(&("flagged", true)));
        assert!(changes.contains(&("draft", false)));
    }

    #[test]
    fn no_flags_means_unread() {
        let changes = tag_changes(&BTreeSet::new());
        assert!(changes.contains(&("unread", true)));
    }

    #[test]
    fn combined_flags_ignore_non_maildir_files() {
        let files = vec![PathBuf::from("/tmp/msg"), PathBuf::from("/m/cur/a:2,R")];
        assert_eq!(combined_flags(&files), Some(BTreeSet::from(['R'])));
        assert_eq!(combined_flags(&[PathBuf::from("/tmp/msg")]), None);
    }

    #[test]
    fn flags_for_tags_keeps_unknown_flags() {
        let existing = BTreeSet::from(['a', 'F']);
        let flags = flags_for_tags(&existing, &["replied"]);
        assert_eq!(flags, BTreeSet::from(['a', 'R', 'S']));
    }

    #[test]
    fn path_for_tags_renames_only_on_change() {
        let cur = Path::new("/m/cur/x:2,S");
        assert_eq!(path_for_tags::<&str>(cur, &[]), None);
        assert_eq!(path_for_tags(cur, &["unread"]), Some(PathBuf::from("/m/cur/x:2,")));
        let new = Path::new("/m/new/y");
        assert_eq!(path_for_tags(new, &["unread"]), None);
        assert_eq!(path_for_tags::<&str>(new, &[]), Some(PathBuf::from("/m/cur/y:2,S")));
    }
}
