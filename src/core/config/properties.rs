use crate::{logging, utils, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Key/value pairs in the `java.util.Properties` text format: `key=value`,
/// `key: value` or `key value` lines, `#` and `!` comments, and a trailing
/// backslash continuing a value on the next line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Properties::default()
    }

    pub fn parse(content: &str) -> Self {
        let mut properties = Properties::new();
        let mut lines = content.lines();
        while let Some(line) = lines.next() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let mut logical = line.to_string();
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some(next) => logical.push_str(next.trim_start()),
                    None => break,
                }
            }
            let (key, value) = split_entry(&logical);
            properties.insert(key, value);
        }
        properties
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Properties::parse(&content))
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// an odd number of trailing backslashes escapes the line break
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (String, String) {
    let mut key = String::new();
    let mut chars = line.chars().peekable();
    let mut separated = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    key.push(unescape(escaped));
                }
            }
            '=' | ':' => {
                separated = true;
                break;
            }
            c if c.is_whitespace() => break,
            c => key.push(c),
        }
    }
    // `key  =  value`: whitespace may surround the separator
    while let Some(c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if !separated && (*c == '=' || *c == ':') {
            separated = true;
            chars.next();
        } else {
            break;
        }
    }
    let mut value = String::new();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(unescape(escaped));
            }
        } else {
            value.push(c);
        }
    }
    (key, value.trim_end().to_string())
}

fn unescape(c: char) -> char {
    match c {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        'f' => '\u{c}',
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

/// Tracks a properties file, telling whether it changed since it was last read.
/// A file which does not exist reads as empty.
#[derive(Debug)]
pub struct PropertyFileWatcher {
    path: PathBuf,
    // `None` until the first read, `Some(None)` when the file was missing
    last_read: Mutex<Option<Option<FileStamp>>>,
}

impl PropertyFileWatcher {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        PropertyFileWatcher {
            path: path.into(),
            last_read: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn stamp(&self) -> Option<FileStamp> {
        fs::metadata(&self.path).ok().map(|meta| FileStamp {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }

    /// True when the file was never read, or was created, modified or deleted since.
    pub fn is_stale(&self) -> bool {
        match *self.last_read.lock() {
            None => true,
            Some(last) => last != self.stamp(),
        }
    }

    /// Reads the file, `None` if it does not exist.
    pub fn read(&self) -> Result<Option<Properties>> {
        let stamp = self.stamp();
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                if let Some(modified) = stamp.and_then(|s| s.modified) {
                    logging::debug!(
                        "[PropertyFileWatcher] Reading {}, last modified {}",
                        self.path.display(),
                        utils::format_system_time(modified)
                    );
                }
                *self.last_read.lock() = Some(stamp);
                Ok(Some(Properties::parse(&content)))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                *self.last_read.lock() = Some(None);
                Ok(None)
            }
            Err(err) => {
                logging::warn!(
                    "[PropertyFileWatcher] Failed to read {}, error: {}",
                    self.path.display(),
                    err
                );
                Err(err.into())
            }
        }
    }
}
