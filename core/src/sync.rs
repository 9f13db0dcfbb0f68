/*
 * sync.rs
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

//! Maildir to database sync: index new files, tag them, drop vanished filenames.

use crate::config::SyncConfig;
use crate::database::{Database, IndexOutcome, RemoveOutcome};
use crate::error::{Error, Result};
use crate::maildir::Maildir;
use crate::message::Message;
use crate::status::Status;
use std::path::{Path, PathBuf};

/// Counters for one sync pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub indexed: usize,
    pub duplicates: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub removed: usize,
    pub failed: Vec<(PathBuf, Error)>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives one database from a maildir tree.
pub struct Syncer<'a> {
    db: &'a Database,
    config: &'a SyncConfig,
}

impl<'a> Syncer<'a> {
    pub fn new(db: &'a Database, config: &'a SyncConfig) -> Self {
        Self { db, config }
    }

    fn ignored(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| self.config.is_ignored(n))
    }

    /// Walk the Maildir++ tree at `root` and index every message file not yet known.
    pub fn sync_maildir(&self, root: impl AsRef<Path>) -> Result<SyncReport> {
        let maildir = Maildir::new(root);
        let mut report = SyncReport::default();
        for folder in maildir.folders()? {
            if folder != maildir.root() && self.ignored(&folder) {
                log::debug!("ignoring folder {}", folder.display());
                continue;
            }
            for file in Maildir::message_files(&folder)? {
                if self.ignored(&file) {
                    continue;
                }
                if let Err(e) = self.sync_file(&file, &mut report) {
                    log::warn!("{}: {}", file.display(), e);
                    report.failed.push((file, e));
                }
            }
        }
        log::info!(
            "sync {}: {} indexed, {} duplicate, {} unchanged, {} skipped, {} failed",
            maildir.root().display(),
            report.indexed,
            report.duplicates,
            report.unchanged,
            report.skipped,
            report.failed.len()
        );
        Ok(report)
    }

    fn sync_file(&self, file: &Path, report: &mut SyncReport) -> Result<()> {
        if self.db.find_message_by_filename(file)?.is_some() {
            report.unchanged += 1;
            return Ok(());
        }
        let (mut msg, outcome) = match self.db.index_file(file) {
            Ok(r) => r,
            Err(e) if e.status() == Some(Status::FileNotEmail) => {
                log::debug!("not an email: {}", file.display());
                report.skipped += 1;
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        match outcome {
            IndexOutcome::New => {
                self.tag_new(&mut msg)?;
                report.indexed += 1;
            }
            IndexOutcome::Duplicate => {
                if self.config.synchronize_flags {
                    msg.maildir_flags_to_tags()?;
                }
                report.duplicates += 1;
            }
        }
        Ok(())
    }

    fn tag_new(&self, msg: &mut Message<'_>) -> Result<()> {
        msg.freeze()?;
        // on failure the caller drops the still frozen handle, discarding the partial batch
        self.apply_new_tags(msg)?;
        msg.thaw()
    }

    fn apply_new_tags(&self, msg: &mut Message<'_>) -> Result<()> {
        for tag in &self.config.new_tags {
            msg.add_tag(tag)?;
        }
        if self.config.synchronize_flags {
            msg.maildir_flags_to_tags()?;
        }
        Ok(())
    }

    /// Remove the given filenames from the database if they no longer exist on disk.
    pub fn remove_missing<P: AsRef<Path>>(&self, paths: &[P]) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for path in paths {
            let path = self.db.resolve(path);
            if path.exists() {
                report.unchanged += 1;
                continue;
            }
            match self.db.remove_message(&path) {
                Ok(RemoveOutcome::Removed) => {
                    log::debug!("removed {}", path.display());
                    report.removed += 1;
                }
                Ok(RemoveOutcome::StillReferenced) => {
                    log::debug!("removed {} (message has other files)", path.display());
                    report.removed += 1;
                }
                Err(e) => {
                    log::warn!("{}: {}", path.display(), e);
                    report.failed.push((path, e));
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Backend;
    use std::fs;

    fn message(id: &str) -> String {
        format!(
            "From: someone@example.com\nSubject: test\nDate: Mon, 26 Feb 2018 00:00:00 +0200\nMessage-Id: <{}>\n\nBody.\n",
            id
        )
    }

    fn make_maildir(p: &Path) {
        for sub in ["cur", "new", "tmp"] {
            fs::create_dir_all(p.join(sub)).unwrap();
        }
    }

    #[test]
    fn indexes_new_files_with_tags_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        make_maildir(root);
        make_maildir(&root.join(".Sent"));
        fs::write(root.join("new/1.host"), message("one@example.com")).unwrap();
        fs::write(root.join("cur/2.host:2,FS"), message("two@example.com")).unwrap();
        fs::write(root.join(".Sent/cur/3.host:2,S"), message("three@example.com")).unwrap();
        fs::write(root.join("cur/4.host:2,"), "not a mail message\n").unwrap();

        let db = Database::create_with(Backend::Local, root).unwrap();
        let config = SyncConfig::default();
        let report = Syncer::new(&db, &config).sync_maildir(root).unwrap();
        assert_eq!(report.indexed, 3);
        assert_eq!(report.skipped, 1);
        assert!(report.is_clean());

        let one = db.find_message("one@example.com").unwrap().unwrap();
        assert_eq!(one.tags(), vec!["inbox", "unread"]);
        let two = db.find_message("two@example.com").unwrap().unwrap();
        assert_eq!(two.tags(), vec!["flagged", "inbox"]);
        let three = db.find_message("three@example.com").unwrap().unwrap();
        assert_eq!(three.tags(), vec!["inbox"]);
    }

    #[test]
    fn second_pass_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        make_maildir(root);
        fs::write(root.join("new/1.host"), message("one@example.com")).unwrap();
        let db = Database::create_with(Backend::Local, root).unwrap();
        let config = SyncConfig::default();
        let syncer = Syncer::new(&db, &config);
        assert_eq!(syncer.sync_maildir(root).unwrap().indexed, 1);
        let report = syncer.sync_maildir(root).unwrap();
        assert_eq!(report.indexed, 0);
        assert_eq!(report.unchanged, 1);
    }

    #[test]
    fn duplicates_and_ignored_names() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        make_maildir(root);
        make_maildir(&root.join(".Trash"));
        fs::write(root.join("cur/1.host:2,S"), message("dup@example.com")).unwrap();
        fs::write(root.join("cur/2.host:2,SR"), message("dup@example.com")).unwrap();
        fs::write(root.join("cur/skip-me"), message("skip@example.com")).unwrap();
        fs::write(root.join(".Trash/cur/3.host:2,S"), message("trash@example.com")).unwrap();

        let db = Database::create_with(Backend::Local, root).unwrap();
        let config = SyncConfig {
            new_tags: vec!["new".into()],
            ignore: vec!["skip-me".into(), ".Trash".into()],
            ..SyncConfig::default()
        };
        let report = Syncer::new(&db, &config).sync_maildir(root).unwrap();
        assert_eq!(report.indexed, 1);
        assert_eq!(report.duplicates, 1);
        assert!(db.find_message("skip@example.com").unwrap().is_none());
        assert!(db.find_message("trash@example.com").unwrap().is_none());

        let dup = db.find_message("dup@example.com").unwrap().unwrap();
        assert_eq!(dup.file_names().len(), 2);
        assert_eq!(dup.tags(), vec!["new", "replied"]);
    }

    #[test]
    fn flags_left_alone_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        make_maildir(root);
        fs::write(root.join("cur/1.host:2,FS"), message("one@example.com")).unwrap();
        let db = Database::create_with(Backend::Local, root).unwrap();
        let config = SyncConfig {
            synchronize_flags: false,
            ..SyncConfig::default()
        };
        Syncer::new(&db, &config).sync_maildir(root).unwrap();
        let one = db.find_message("one@example.com").unwrap().unwrap();
        assert_eq!(one.tags(), vec!["inbox", "unread"]);
    }

    #[test]
    fn remove_missing_drops_vanished_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        make_maildir(root);
        let a = root.join("cur/1.host:2,S");
        let b = root.join("cur/2.host:2,S");
        fs::write(&a, message("gone@example.com")).unwrap();
        fs::write(&b, message("kept@example.com")).unwrap();
        let db = Database::create_with(Backend::Local, root).unwrap();
        let config = SyncConfig::default();
        let syncer = Syncer::new(&db, &config);
        syncer.sync_maildir(root).unwrap();

        fs::remove_file(&a).unwrap();
        let report = syncer.remove_missing(&[&a, &b]).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(report.unchanged, 1);
        assert!(db.find_message("gone@example.com").unwrap().is_none());
        assert!(db.find_message("kept@example.com").unwrap().is_some());
    }

    #[test]
    fn failed_new_tags_leave_no_partial_batch() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        make_maildir(root);
        fs::write(root.join("new/1.host"), message("one@example.com")).unwrap();
        let db = Database::create_with(Backend::Local, root).unwrap();
        let config = SyncConfig {
            new_tags: vec!["inbox".into(), String::new()],
            ..SyncConfig::default()
        };
        let report = Syncer::new(&db, &config).sync_maildir(root).unwrap();
        assert_eq!(report.indexed, 0);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].1.status(), Some(Status::IllegalArgument));
        let one = db.find_message("one@example.com").unwrap().unwrap();
        assert!(one.tags().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn root_spelling_does_not_matter() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        let link = dir.path().join("link");
        make_maildir(&real);
        std::os::unix::fs::symlink(&real, &link).unwrap();
        fs::write(real.join("new/1.host"), message("one@example.com")).unwrap();

        let db = Database::create_with(Backend::Local, &link).unwrap();
        let config = SyncConfig::default();
        let syncer = Syncer::new(&db, &config);
        assert_eq!(syncer.sync_maildir(&link).unwrap().indexed, 1);
        let report = syncer.sync_maildir(&real).unwrap();
        assert_eq!(report.indexed, 0);
        assert_eq!(report.duplicates, 0);
        assert_eq!(report.unchanged, 1);
        let one = db.find_message("one@example.com").unwrap().unwrap();
        assert_eq!(one.file_names().len(), 1);
    }
}
