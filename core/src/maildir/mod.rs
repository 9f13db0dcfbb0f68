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

//! Maildir++ layout (cur, new, tmp, .Folder subfolders), filenames and flag/tag mapping.

pub mod filename;
pub mod flags;

pub use filename::{MaildirFilename, Subdir};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const MAILDIR_FOLDER_PREFIX: char = '.';

/// A Maildir++ tree rooted at the user's maildir (root contains cur/new/tmp and .Folder subdirs).
#[derive(Debug, Clone)]
pub struct Maildir {
    root: PathBuf,
}

impl Maildir {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_valid_maildir(p: &Path) -> bool {
        p.is_dir() && p.join("cur").is_dir() && p.join("new").is_dir() && p.join("tmp").is_dir()
    }

    /// Folder directories: the root (if it is a maildir) and every valid .Folder below it.
    pub fn folders(&self) -> io::Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        if Self::is_valid_maildir(&self.root) {
            result.push(self.root.clone());
        }
        let mut subfolders = Vec::new();
        for e in fs::read_dir(&self.root)? {
            let e = e?;
            let name = e.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(MAILDIR_FOLDER_PREFIX)
                && name != "."
                && name != ".."
                && name != ".notmuch"
                && !name.ends_with(".tmp")
            {
                let path = e.path();
                if Self::is_valid_maildir(&path) {
                    subfolders.push(path);
                }
            }
        }
        subfolders.sort();
        result.extend(subfolders);
        Ok(result)
    }

    /// Message files of one folder: new/ first, then cur/, each sorted by name. Dotfiles are skipped.
    pub fn message_files(folder: &Path) -> io::Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for sub in [Subdir::New, Subdir::Cur] {
            let dir = folder.join(sub.as_str());
            let mut files = Vec::new();
            for e in fs::read_dir(&dir)? {
                let e = e?;
                if e.file_name().to_string_lossy().starts_with('.') {
                    continue;
                }
                if e.file_type()?.is_file() {
                    files.push(e.path());
                }
            }
            files.sort();
            out.extend(files);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_maildir(p: &Path) {
        for sub in ["cur", "new", "tmp"] {
            fs::create_dir_all(p.join(sub)).unwrap();
        }
    }

    #[test]
    fn folders_lists_root_and_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        make_maildir(dir.path());
        make_maildir(&dir.path().join(".Sent"));
        make_maildir(&dir.path().join(".Archive.2024"));
        fs::create_dir_all(dir.path().join(".notmuch")).unwrap();
        fs::create_dir_all(dir.path().join(".half/cur")).unwrap();
        let folders = Maildir::new(dir.path()).folders().unwrap();
        assert_eq!(
            folders,
            vec![
                dir.path().to_path_buf(),
                dir.path().join(".Archive.2024"),
                dir.path().join(".Sent"),
            ]
        );
    }

    #[test]
    fn message_files_skips_dotfiles_and_tmp() {
        let dir = tempfile::tempdir().unwrap();
        make_maildir(dir.path());
        fs::write(dir.path().join("new/b"), "x").unwrap();
        fs::write(dir.path().join("cur/a:2,S"), "x").unwrap();
        fs::write(dir.path().join("cur/.hidden"), "x").unwrap();
        fs::write(dir.path().join("tmp/c"), "x").unwrap();
        let files = Maildir::message_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("new/b"), dir.path().join("cur/a:2,S")]);
    }
}
