//! Task records parsed from a stack dump
//!
//! A record starts from its metadata line, for example
//!
//! ```text
//! goroutine 42 [chan receive, 15 minutes]:
//! ```
//!
//! then accumulates body lines until it is finalized. Finalizing computes the
//! stack fingerprint once; afterwards the record is read-only.

use crate::error::{DumpError, Result};
use crate::fingerprint;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Default prefix of a metadata line
pub const DEFAULT_HEADER_PREFIX: &str = "goroutine ";

/// Closed set of annotations carried by a metadata line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetaTag {
    /// First annotation, always present (e.g. "running", "chan receive")
    State,
    /// Second annotation, if any (e.g. "15 minutes")
    Duration,
}

#[derive(Debug, Clone)]
struct Frozen {
    body_raw: String,
    body_normalized: String,
    fingerprint: String,
}

/// One task (goroutine) of a dump
#[derive(Debug, Clone)]
pub struct TaskRecord {
    id: u64,
    header: String,
    lines: usize,
    duration_minutes: u64,
    metas: BTreeMap<MetaTag, String>,
    raw_lines: Vec<String>,
    normalized_lines: Vec<String>,
    irregular_lines: usize,
    frozen: Option<Frozen>,
    duplicate_ids: Vec<u64>,
}

impl TaskRecord {
    /// Parse a metadata line using the default `goroutine ` prefix
    pub fn parse(metaline: &str) -> Result<Self> {
        Self::parse_with_prefix(metaline, DEFAULT_HEADER_PREFIX)
    }

    /// Parse a metadata line of the form `<prefix><id> [<state>, <duration>]:`
    ///
    /// Fails with [`DumpError::Parse`] when the annotation list is missing or
    /// the identity is not an integer. A second annotation that does not read
    /// `N minutes` is kept as the Duration tag with zero minutes.
    pub fn parse_with_prefix(metaline: &str, prefix: &str) -> Result<Self> {
        let parse_error = |reason: &str| DumpError::Parse {
            line: metaline.to_string(),
            reason: reason.to_string(),
        };

        let open = metaline
            .find('[')
            .ok_or_else(|| parse_error("missing '[' annotation list"))?;
        let rest = &metaline[open + 1..];
        let close = rest
            .rfind(']')
            .ok_or_else(|| parse_error("missing ']' closing the annotation list"))?;
        let annotations = &rest[..close];

        let id_part = metaline[..open]
            .strip_prefix(prefix)
            .or_else(|| metaline[..open].strip_prefix(prefix.trim_end()))
            .ok_or_else(|| parse_error("missing metadata prefix"))?;
        let id = id_part
            .trim()
            .parse::<u64>()
            .map_err(|e| parse_error(&format!("invalid identity '{}': {}", id_part.trim(), e)))?;

        let mut parts = annotations.split(',');
        let mut metas = BTreeMap::new();
        metas.insert(
            MetaTag::State,
            parts.next().unwrap_or_default().trim().to_string(),
        );

        let mut duration_minutes = 0;
        if let Some(value) = parts.next() {
            let value = value.trim();
            duration_minutes = parse_minutes(value).unwrap_or(0);
            metas.insert(MetaTag::Duration, value.to_string());
        }

        Ok(Self {
            id,
            header: metaline.to_string(),
            lines: 1,
            duration_minutes,
            metas,
            raw_lines: Vec::new(),
            normalized_lines: Vec::new(),
            irregular_lines: 0,
            frozen: None,
            duplicate_ids: Vec::new(),
        })
    }

    /// Append one body line; ignored once the record is finalized
    pub fn add_line(&mut self, line: &str) {
        if self.is_finalized() {
            return;
        }

        self.lines += 1;
        self.raw_lines.push(line.to_string());
        self.normalized_lines
            .push(fingerprint::normalize_line(line));

        // Frame location lines read "\t<file>:<line> +0x<offset>"
        if line.starts_with('\t') && line.split(' ').count() != 2 {
            self.irregular_lines += 1;
            tracing::warn!(task = self.id, line, "irregular frame location line");
        }
    }

    /// Freeze the record and compute its fingerprint; idempotent
    pub fn finalize(&mut self) {
        if self.is_finalized() {
            return;
        }

        let body_raw = std::mem::take(&mut self.raw_lines).join("\n");
        let body_normalized = std::mem::take(&mut self.normalized_lines).join("\n");
        let fingerprint = fingerprint::digest(&body_normalized);

        self.frozen = Some(Frozen {
            body_raw,
            body_normalized,
            fingerprint,
        });
    }

    pub fn is_finalized(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Original metadata line
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Header line plus body lines
    pub fn line_count(&self) -> usize {
        self.lines
    }

    pub fn duration_minutes(&self) -> u64 {
        self.duration_minutes
    }

    pub fn meta(&self, tag: MetaTag) -> Option<&str> {
        self.metas.get(&tag).map(String::as_str)
    }

    pub fn state(&self) -> &str {
        self.meta(MetaTag::State).unwrap_or_default()
    }

    /// Number of indented lines that did not look like `<file>:<line> +<offset>`
    pub fn irregular_lines(&self) -> usize {
        self.irregular_lines
    }

    /// Body lines exactly as appended, joined with newlines
    pub fn body_raw(&self) -> Cow<'_, str> {
        match &self.frozen {
            Some(frozen) => Cow::Borrowed(&frozen.body_raw),
            None => Cow::Owned(self.raw_lines.join("\n")),
        }
    }

    /// Body lines with hex argument groups scrubbed, joined with newlines
    pub fn body_normalized(&self) -> Cow<'_, str> {
        match &self.frozen {
            Some(frozen) => Cow::Borrowed(&frozen.body_normalized),
            None => Cow::Owned(self.normalized_lines.join("\n")),
        }
    }

    /// Stack fingerprint; `None` until the record is finalized
    pub fn fingerprint(&self) -> Option<&str> {
        self.frozen.as_ref().map(|f| f.fingerprint.as_str())
    }

    /// Identities sharing this record's fingerprint, set by dedupe
    pub fn duplicate_ids(&self) -> &[u64] {
        &self.duplicate_ids
    }

    pub(crate) fn set_duplicate_ids(&mut self, ids: Vec<u64>) {
        debug_assert!(ids.contains(&self.id));
        self.duplicate_ids = ids;
    }
}

/// Parse `^\d+ minutes$`
fn parse_minutes(value: &str) -> Option<u64> {
    let digits = value.strip_suffix(" minutes")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
