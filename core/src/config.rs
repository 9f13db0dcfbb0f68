/*
 * config.rs
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

//! Sync configuration: load/save ~/.nmsync/config.xml.
//! All XML read/write uses the quick_xml parser/writer; no hand parsing.
//!
//! ```xml
//! <nmsync>
//!   <database><path>/home/me/mail</path><mode>read-write</mode></database>
//!   <new-tags><tag>inbox</tag><tag>unread</tag></new-tags>
//!   <synchronize-flags>true</synchronize-flags>
//!   <ignore><name>.mbsyncstate</name></ignore>
//! </nmsync>
//! ```

use crate::database::Mode;
use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Settings for the sync driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Database (and maildir root) path. None means ~/mail.
    pub database_path: Option<PathBuf>,
    pub mode: Mode,
    /// Tags added to every newly indexed message.
    pub new_tags: Vec<String>,
    /// Keep maildir flags and tags in step.
    pub synchronize_flags: bool,
    /// File or directory names never visited.
    pub ignore: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            mode: Mode::ReadWrite,
            new_tags: vec!["inbox".to_string(), "unread".to_string()],
            synchronize_flags: true,
            ignore: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Configured database path, or ~/mail.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from).map(|h| h.join("mail")))
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.iter().any(|i| i == name)
    }
}

/// Default config directory: ~/.nmsync.
pub fn default_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from).map(|h| h.join(".nmsync"))
}

/// Default config path: ~/.nmsync/config.xml.
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|d| d.join("config.xml"))
}

fn mode_name(mode: Mode) -> &'static str {
    match mode {
        Mode::ReadOnly => "read-only",
        Mode::ReadWrite => "read-write",
    }
}

fn parse_mode(s: &str) -> Result<Mode> {
    match s {
        "read-only" => Ok(Mode::ReadOnly),
        "read-write" => Ok(Mode::ReadWrite),
        other => Err(Error::Config(format!("unknown database mode: {}", other))),
    }
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(Error::Config(format!("not a boolean: {}", other))),
    }
}

/// Load the config. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<SyncConfig> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SyncConfig::default()),
        Err(e) => return Err(e.into()),
    };
    parse_config(&content)
}

/// Parse config XML. Elements not listed in the module docs are ignored.
pub fn parse_config(content: &str) -> Result<SyncConfig> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut config = SyncConfig::default();
    let mut new_tags: Option<Vec<String>> = None;
    let mut stack: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Err(e) => return Err(Error::Config(format!("XML parse error: {}", e))),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"new-tags" {
                    new_tags = Some(Vec::new());
                }
                stack.push(e.name().as_ref().to_vec());
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"new-tags" {
                    new_tags = Some(Vec::new());
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(xml_err)?.trim().to_string();
                let parent = stack.len().checked_sub(2).map(|i| stack[i].as_slice());
                match (parent, stack.last().map(Vec::as_slice)) {
                    (Some(b"database"), Some(b"path")) => config.database_path = Some(PathBuf::from(text)),
                    (Some(b"database"), Some(b"mode")) => config.mode = parse_mode(&text)?,
                    (Some(b"new-tags"), Some(b"tag")) => {
                        if let Some(tags) = new_tags.as_mut() {
                            tags.push(text);
                        }
                    }
                    (Some(b"nmsync"), Some(b"synchronize-flags")) => {
                        config.synchronize_flags = parse_bool(&text)?
                    }
                    (Some(b"ignore"), Some(b"name")) => config.ignore.push(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            _ => {}
        }
        buf.clear();
    }
    if let Some(tags) = new_tags {
        config.new_tags = tags;
    }
    Ok(config)
}

fn xml_err(e: impl std::fmt::Display) -> Error {
    Error::Config(e.to_string())
}

fn write_text_element<W: io::Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name))).map_err(xml_err)?;
    writer.write_event(Event::Text(BytesText::new(text))).map_err(xml_err)?;
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(xml_err)?;
    Ok(())
}

/// Build config XML into a byte vector (UTF-8).
pub fn config_xml_to_bytes(config: &SyncConfig) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut writer = Writer::new_with_indent(&mut out, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None))).map_err(xml_err)?;
    writer.write_event(Event::Start(BytesStart::new("nmsync"))).map_err(xml_err)?;

    writer.write_event(Event::Start(BytesStart::new("database"))).map_err(xml_err)?;
    if let Some(path) = &config.database_path {
        let path = path
            .to_str()
            .ok_or_else(|| Error::Config(format!("database path is not UTF-8: {}", path.display())))?;
        write_text_element(&mut writer, "path", path)?;
    }
    write_text_element(&mut writer, "mode", mode_name(config.mode))?;
    writer.write_event(Event::End(BytesEnd::new("database"))).map_err(xml_err)?;

    writer.write_event(Event::Start(BytesStart::new("new-tags"))).map_err(xml_err)?;
    for tag in &config.new_tags {
        write_text_element(&mut writer, "tag", tag)?;
    }
    writer.write_event(Event::End(BytesEnd::new("new-tags"))).map_err(xml_err)?;

    write_text_element(
        &mut writer,
        "synchronize-flags",
        if config.synchronize_flags { "true" } else { "false" },
    )?;

    writer.write_event(Event::Start(BytesStart::new("ignore"))).map_err(xml_err)?;
    for name in &config.ignore {
        write_text_element(&mut writer, "name", name)?;
    }
    writer.write_event(Event::End(BytesEnd::new("ignore"))).map_err(xml_err)?;

    writer.write_event(Event::End(BytesEnd::new("nmsync"))).map_err(xml_err)?;
    Ok(out)
}

/// Save the config, creating the parent directory if needed.
pub fn save_config(path: &Path, config: &SyncConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, config_xml_to_bytes(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("config.xml")).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.new_tags, vec!["inbox", "unread"]);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub/config.xml");
        let config = SyncConfig {
            database_path: Some(PathBuf::from("/home/me/mail")),
            mode: Mode::ReadOnly,
            new_tags: vec!["new".into(), "a&b".into()],
            synchronize_flags: false,
            ignore: vec![".mbsyncstate".into()],
        };
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn empty_new_tags_clears_defaults() {
        let config = parse_config("<nmsync><new-tags/></nmsync>").unwrap();
        assert!(config.new_tags.is_empty());
        let config = parse_config("<nmsync><synchronize-flags>no</synchronize-flags></nmsync>").unwrap();
        assert!(!config.synchronize_flags);
        assert_eq!(config.new_tags, vec!["inbox", "unread"]);
    }

    #[test]
    fn bad_values_are_config_errors() {
        let err = parse_config("<nmsync><database><mode>sometimes</mode></database></nmsync>").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = parse_config("<nmsync><synchronize-flags>maybe</synchronize-flags></nmsync>").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn ignore_list() {
        let config = parse_config("<nmsync><ignore><name>a</name><name>b</name></ignore></nmsync>").unwrap();
        assert!(config.is_ignored("b"));
        assert!(!config.is_ignored("c"));
    }

    #[test]
    fn default_paths_live_under_home() {
        let home = match std::env::var_os("HOME") {
            Some(h) => PathBuf::from(h),
            None => return,
        };
        assert_eq!(default_config_dir(), Some(home.join(".nmsync")));
        assert_eq!(default_config_path(), Some(home.join(".nmsync/config.xml")));
        assert_eq!(SyncConfig::default().database_path(), Some(home.join("mail")));
    }
}
