//! Text rendering of tasks
//!
//! A task that stands for several identical stacks is rendered with its
//! header scrubbed of digits, the identities it stands for, and the
//! normalized body. Every other task is rendered verbatim.

use crate::fingerprint::scrub_header;
use crate::record::TaskRecord;
use console::style;
use std::fmt::Write as _;
use std::io::{self, Write};

fn format_ids(ids: &[u64]) -> String {
    let joined: Vec<String> = ids.iter().map(u64::to_string).collect();
    format!("[{}]", joined.join(" "))
}

fn is_group(task: &TaskRecord) -> bool {
    task.duplicate_ids().len() > 1
}

/// Write one task block (header, body, blank line)
pub fn write_task<W: Write>(w: &mut W, task: &TaskRecord) -> io::Result<()> {
    let body = if is_group(task) {
        writeln!(
            w,
            "{} {} times: {}",
            scrub_header(task.header()),
            task.duplicate_ids().len(),
            format_ids(task.duplicate_ids())
        )?;
        task.body_normalized()
    } else {
        writeln!(w, "{}", task.header())?;
        task.body_raw()
    };

    if !body.is_empty() {
        writeln!(w, "{}", body)?;
    }
    writeln!(w)
}

/// Renders tasks for a terminal, optionally colored
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn render(&self, task: &TaskRecord) -> String {
        if !self.color {
            let mut buf = Vec::new();
            // writing into a Vec cannot fail
            let _ = write_task(&mut buf, task);
            return String::from_utf8_lossy(&buf).into_owned();
        }

        let mut out = String::new();
        let body = if is_group(task) {
            let _ = writeln!(
                out,
                "{} {} times: {}",
                style(scrub_header(task.header())).blue(),
                style(task.duplicate_ids().len()).red(),
                style(format_ids(task.duplicate_ids())).green()
            );
            task.body_normalized()
        } else {
            let _ = writeln!(out, "{}", style(task.header()).blue());
            task.body_raw()
        };
        if !body.is_empty() {
            let _ = writeln!(out, "{}", body);
        }
        out.push('\n');
        out
    }
}
