//! Loading raw stack dumps
//!
//! A dump is a sequence of blocks separated by blank lines; each block
//! starts with a metadata line (`goroutine 12 [running]:`) followed by its
//! frames. Lines outside any block (panic messages, log noise) are skipped
//! with a warning.

use crate::dump::TaskDump;
use crate::error::Result;
use crate::record::{TaskRecord, DEFAULT_HEADER_PREFIX};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Parses dump text into a [`TaskDump`]
#[derive(Debug, Clone)]
pub struct DumpLoader {
    header_prefix: String,
}

impl Default for DumpLoader {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_PREFIX)
    }
}

impl DumpLoader {
    pub fn new(header_prefix: impl Into<String>) -> Self {
        Self {
            header_prefix: header_prefix.into(),
        }
    }

    pub fn header_prefix(&self) -> &str {
        &self.header_prefix
    }

    fn is_metadata_line(&self, line: &str) -> bool {
        line.starts_with(&self.header_prefix) && line.ends_with("]:")
    }

    /// Load from an in-memory string
    pub fn load_str(&self, text: &str) -> Result<TaskDump> {
        self.load_lines(text.lines().map(|l| Ok(l.to_string())))
    }

    /// Load from any buffered reader
    pub fn load_reader<R: BufRead>(&self, reader: R) -> Result<TaskDump> {
        self.load_lines(reader.lines())
    }

    /// Load from a file
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<TaskDump> {
        let path = path.as_ref();
        let dump = self.load_reader(BufReader::new(File::open(path)?))?;
        tracing::info!(path = %path.display(), tasks = dump.len(), "loaded dump");
        Ok(dump)
    }

    fn load_lines<I>(&self, lines: I) -> Result<TaskDump>
    where
        I: IntoIterator<Item = std::io::Result<String>>,
    {
        let mut dump = TaskDump::new();
        let mut current: Option<TaskRecord> = None;
        let mut skipped = 0usize;

        for (index, line) in lines.into_iter().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');

            if self.is_metadata_line(line) {
                if let Some(done) = current.take() {
                    dump.add(done);
                }
                current = Some(TaskRecord::parse_with_prefix(line, &self.header_prefix)?);
            } else if line.trim().is_empty() {
                if let Some(done) = current.take() {
                    dump.add(done);
                }
            } else if let Some(task) = current.as_mut() {
                task.add_line(line);
            } else {
                skipped += 1;
                tracing::debug!(line = index + 1, "skipping line outside a task block");
            }
        }

        if let Some(done) = current.take() {
            dump.add(done);
        }
        if skipped > 0 {
            tracing::warn!(skipped, "ignored lines outside task blocks");
        }
        Ok(dump)
    }
}
