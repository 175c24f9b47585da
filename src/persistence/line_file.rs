//! Line-file backend: one append-only text file per topic, one envelope per
//! line.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::{HistoryRecord, MessageStore};
use crate::utils::StoreError;

pub const FILE_EXTENSION: &str = "txt";

#[derive(Debug)]
pub struct LineFileStore {
    dir: PathBuf,
    // Serialises appends against reads so a reader never sees half a line.
    io: Mutex<()>,
}

impl LineFileStore {
    /// Use `dir` as the data directory, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            io: Mutex::new(()),
        })
    }

    /// Path of the log file backing `topic`.
    pub fn topic_path(&self, topic: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{FILE_EXTENSION}", topic_file_stem(topic)))
    }
}

/// File stem for a topic. Letters, digits, `-` and `_` are kept; any other
/// byte is written as `%XX`, so the name can never leave the data directory.
pub fn topic_file_stem(topic: &str) -> String {
    let mut stem = String::with_capacity(topic.len());
    for byte in topic.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

impl MessageStore for LineFileStore {
    fn append(&self, topic: &str, envelope: &str) -> Result<(), StoreError> {
        if envelope.contains(['\n', '\r']) {
            return Err(StoreError::InvalidRecord(
                "envelope contains a line break".to_string(),
            ));
        }

        let _guard = self.io.lock().map_err(|_| StoreError::Poisoned)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.topic_path(topic))?;
        file.write_all(format!("{envelope}\n").as_bytes())?;
        debug!("Message saved to file for topic: {topic}");
        Ok(())
    }

    fn history(&self, topic: &str) -> Result<Vec<HistoryRecord>, StoreError> {
        let _guard = self.io.lock().map_err(|_| StoreError::Poisoned)?;
        let file = match File::open(self.topic_path(topic)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                records.push(HistoryRecord::content_only(line));
            }
        }
        Ok(records)
    }
}
