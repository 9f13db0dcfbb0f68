/*
 * state.rs
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

//! On-disk state of the local engine: `.notmuch/nmsync-index.json`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory created inside the database path.
pub(crate) const DB_DIR: &str = ".notmuch";
const INDEX_FILE: &str = "nmsync-index.json";

/// Format written by this version. Older files need an upgrade before writes.
pub(crate) const CURRENT_VERSION: u32 = 3;

/// One indexed message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Document {
    pub filenames: Vec<PathBuf>,
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub date: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct IndexState {
    pub version: u32,
    #[serde(default)]
    pub messages: BTreeMap<String, Document>,
}

impl IndexState {
    pub(crate) fn new() -> Self {
        Self {
            version: CURRENT_VERSION,
            messages: BTreeMap::new(),
        }
    }

    pub(crate) fn index_path(root: &Path) -> PathBuf {
        root.join(DB_DIR).join(INDEX_FILE)
    }

    pub(crate) fn exists(root: &Path) -> bool {
        Self::index_path(root).is_file()
    }

    pub(crate) fn load(root: &Path) -> io::Result<Self> {
        let raw = fs::read(Self::index_path(root))?;
        serde_json::from_slice(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Write to a temporary file then rename over the index.
    pub(crate) fn save(&self, root: &Path) -> io::Result<()> {
        let path = Self::index_path(root);
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_vec_pretty(self).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &path)
    }

    /// Id of the message a filename belongs to.
    pub(crate) fn id_for_filename(&self, filename: &Path) -> Option<&str> {
        self.messages
            .iter()
            .find(|(_, doc)| doc.filenames.iter().any(|f| f == filename))
            .map(|(id, _)| id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(DB_DIR)).unwrap();
        let mut state = IndexState::new();
        state.messages.insert(
            "a@b".into(),
            Document {
                filenames: vec![PathBuf::from("/m/cur/x")],
                tags: ["inbox".to_string()].into_iter().collect(),
                date: Some(10),
            },
        );
        state.save(dir.path()).unwrap();
        assert!(IndexState::exists(dir.path()));
        let loaded = IndexState::load(dir.path()).unwrap();
        assert_eq!(loaded.version, CURRENT_VERSION);
        assert_eq!(loaded.id_for_filename(Path::new("/m/cur/x")), Some("a@b"));
        assert_eq!(loaded.id_for_filename(Path::new("/m/cur/y")), None);
    }

    #[test]
    fn garbage_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(DB_DIR)).unwrap();
        fs::write(IndexState::index_path(dir.path()), "not json").unwrap();
        let err = IndexState::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
