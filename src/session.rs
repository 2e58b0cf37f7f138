//! Interactive command session
//!
//! Statements operate on named dumps:
//!
//! ```text
//! original = load("goroutines.txt")
//! original.dedup()
//! original.delete("state == 'running'")
//! stuck = original.copy("duration > 30")
//! gone, kept, fresh = original.diff(later)
//! stuck.search("contains(trace, 'Mutex')", 0, 5)
//! stuck.save("stuck.txt")
//! ```
//!
//! A failing statement reports its error and leaves every dump unchanged.

use crate::cli::OutputFormat;
use crate::diff::DumpDiff;
use crate::dump::{DumpSummary, Renderer, TaskDump};
use crate::loader::DumpLoader;
use crate::predicate::lexer::{tokenize, Token};
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::sync::OnceLock;

const HELP: &str = "\
Statements:
  NAME = load(\"PATH\")              load a dump file
  NAME                              summary of NAME
  NAME.summary()                    summary of NAME
  NAME.dedup()                      fold tasks with identical stacks
  NAME.delete(\"COND\")               remove tasks matching COND
  NAME.keep(\"COND\")                 keep only tasks matching COND
  NEW = NAME.copy([\"COND\"])         copy (matching) tasks into NEW
  L, C, R = NAME.diff(OTHER)        split NAME and OTHER by task id
  NAME.search(\"COND\"[, OFFSET[, LIMIT]])
  NAME.show([OFFSET, LIMIT])
  NAME.sort()                       order by task id
  NAME.save(\"PATH\")
  whos | help | exit

COND attributes: id, dups, duration, lines, state, trace
COND functions:  contains(s, sub), lower(s), upper(s)
";

/// Whether the session should keep reading statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Session-wide settings
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub loader: DumpLoader,
    pub renderer: Renderer,
    pub format: OutputFormat,
    pub search_limit: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            loader: DumpLoader::default(),
            renderer: Renderer::plain(),
            format: OutputFormat::Text,
            search_limit: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Str(String),
    Int(i64),
    Ident(String),
}

impl Arg {
    fn describe(&self) -> String {
        match self {
            Arg::Str(s) => format!("{:?}", s),
            Arg::Int(n) => n.to_string(),
            Arg::Ident(name) => name.clone(),
        }
    }
}

enum Outcome {
    Nothing,
    Dump(TaskDump),
    Diff(DumpDiff),
}

fn assignment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z_]\w*(?:\s*,\s*[A-Za-z_]\w*)*)\s*=\s*([^=].*)$")
            .expect("valid assignment pattern")
    })
}

fn call_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z_]\w*)(?:\s*\.\s*([A-Za-z_]\w*))?\s*\((.*)\)$")
            .expect("valid call pattern")
    })
}

/// Named dumps plus the statement interpreter
#[derive(Debug, Default)]
pub struct Session {
    dumps: BTreeMap<String, TaskDump>,
    options: SessionOptions,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            dumps: BTreeMap::new(),
            options,
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, dump: TaskDump) {
        self.dumps.insert(name.into(), dump);
    }

    pub fn get(&self, name: &str) -> Option<&TaskDump> {
        self.dumps.get(name)
    }

    /// Variable names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.dumps.keys().map(String::as_str).collect()
    }

    /// Read statements until end of input or `exit`
    ///
    /// Statement errors go to `err` and do not stop the loop.
    pub fn run<R, W, E>(&mut self, input: R, out: &mut W, err: &mut E, prompt: bool) -> Result<()>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        let mut lines = input.lines();
        loop {
            if prompt {
                write!(out, "> ")?;
                out.flush()?;
            }
            let Some(line) = lines.next() else {
                break;
            };
            let line = line.context("Failed to read statement")?;

            match self.execute(&line, out) {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => writeln!(err, "error: {:#}", e)?,
            }
        }
        Ok(())
    }

    /// Execute one statement
    pub fn execute<W: Write>(&mut self, statement: &str, out: &mut W) -> Result<Flow> {
        let statement = statement.trim();
        if statement.is_empty() || statement.starts_with('#') {
            return Ok(Flow::Continue);
        }
        tracing::debug!(statement, "executing");

        match statement {
            "exit" | "quit" => return Ok(Flow::Exit),
            "help" | "?" => {
                write!(out, "{}", HELP)?;
                return Ok(Flow::Continue);
            }
            "whos" => {
                for (name, dump) in &self.dumps {
                    writeln!(out, "{:>15}: {} tasks", name, dump.len())?;
                }
                return Ok(Flow::Continue);
            }
            _ => {}
        }

        if let Some(caps) = assignment_pattern().captures(statement) {
            let targets: Vec<String> = caps[1].split(',').map(|s| s.trim().to_string()).collect();
            let outcome = self.evaluate(caps[2].trim(), out)?;
            self.assign(targets, outcome)?;
            return Ok(Flow::Continue);
        }

        match self.evaluate(statement, out)? {
            Outcome::Nothing => {}
            Outcome::Dump(dump) => self.print_summary(&dump.summary(), out)?,
            Outcome::Diff(diff) => {
                for (label, dump) in [
                    ("left only", &diff.left_only),
                    ("common", &diff.common),
                    ("right only", &diff.right_only),
                ] {
                    writeln!(out, "{:>15}: {} tasks", label, dump.len())?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn assign(&mut self, targets: Vec<String>, outcome: Outcome) -> Result<()> {
        match (outcome, targets.as_slice()) {
            (Outcome::Dump(dump), [name]) => {
                self.dumps.insert(name.clone(), dump);
            }
            (Outcome::Diff(diff), [left, common, right]) => {
                self.dumps.insert(left.clone(), diff.left_only);
                self.dumps.insert(common.clone(), diff.common);
                self.dumps.insert(right.clone(), diff.right_only);
            }
            (Outcome::Diff(_), _) => bail!("diff() produces three dumps; assign to three names"),
            (Outcome::Dump(_), _) => bail!("expected a single name to assign to"),
            (Outcome::Nothing, _) => bail!("statement produces no value to assign"),
        }
        Ok(())
    }

    fn evaluate<W: Write>(&mut self, expr: &str, out: &mut W) -> Result<Outcome> {
        if let Some(dump) = self.dumps.get(expr) {
            return Ok(Outcome::Dump(dump.clone()));
        }

        let Some(caps) = call_pattern().captures(expr) else {
            bail!("unrecognized statement '{}' (try 'help')", expr);
        };
        let args = parse_args(&caps[3])?;

        let Some(method) = caps.get(2) else {
            return match &caps[1] {
                "load" => {
                    let [Arg::Str(path)] = args.as_slice() else {
                        bail!("usage: load(\"PATH\")");
                    };
                    let dump = self.options.loader.load_file(path)?;
                    Ok(Outcome::Dump(dump))
                }
                other => bail!("unknown function '{}'", other),
            };
        };

        let name = &caps[1];
        self.call_method(name, method.as_str(), &args, out)
    }

    fn dump_mut(&mut self, name: &str) -> Result<&mut TaskDump> {
        self.dumps
            .get_mut(name)
            .with_context(|| format!("unknown dump '{}'", name))
    }

    fn call_method<W: Write>(
        &mut self,
        name: &str,
        method: &str,
        args: &[Arg],
        out: &mut W,
    ) -> Result<Outcome> {
        let renderer = self.options.renderer;
        let search_limit = self.options.search_limit;

        match (method, args) {
            ("dedup" | "dedupe", []) => {
                let report = self.dump_mut(name)?.dedupe();
                if report.changed() {
                    writeln!(out, "{}", report)?;
                }
            }
            ("delete", [Arg::Str(cond)]) => {
                let report = self.dump_mut(name)?.delete(cond)?;
                writeln!(out, "{}", report)?;
            }
            ("keep", [Arg::Str(cond)]) => {
                let report = self.dump_mut(name)?.keep(cond)?;
                writeln!(out, "{}", report)?;
            }
            ("copy", []) => return Ok(Outcome::Dump(self.dump_mut(name)?.copy("")?)),
            ("copy", [Arg::Str(cond)]) => {
                return Ok(Outcome::Dump(self.dump_mut(name)?.copy(cond)?))
            }
            ("diff", [Arg::Ident(other)]) => {
                let right = self
                    .dumps
                    .get(other)
                    .with_context(|| format!("unknown dump '{}'", other))?;
                let left = self
                    .dumps
                    .get(name)
                    .with_context(|| format!("unknown dump '{}'", name))?;
                return Ok(Outcome::Diff(left.diff(right)));
            }
            ("search", [Arg::Str(cond), rest @ ..]) => {
                let (offset, limit) = window(rest, 0, search_limit)?;
                let dump = self.dump_mut(name)?;
                let found = dump.search(cond, offset, limit)?;
                writeln!(out, "Search with offset {} and limit {}.\n", offset, limit)?;
                for task in found {
                    write!(out, "{}", renderer.render(task))?;
                }
            }
            ("show", rest) => {
                let dump = self.dump_mut(name)?;
                let (offset, limit) = window(rest, 0, dump.len())?;
                for task in dump.show(offset, limit) {
                    write!(out, "{}", renderer.render(task))?;
                }
            }
            ("sort", []) => {
                let count = self.dump_mut(name)?.sort();
                writeln!(out, "# of tasks: {}", count)?;
            }
            ("summary", []) => {
                let summary = self.dump_mut(name)?.summary();
                self.print_summary(&summary, out)?;
            }
            ("save", [Arg::Str(path)]) => {
                self.dump_mut(name)?
                    .save(path)
                    .with_context(|| format!("Failed to save {}", path))?;
                writeln!(out, "Saved {} to {}.", name, path)?;
            }
            (method, args) => {
                let args: Vec<String> = args.iter().map(Arg::describe).collect();
                bail!(
                    "unsupported call {}.{}({}) (try 'help')",
                    name,
                    method,
                    args.join(", ")
                );
            }
        }
        Ok(Outcome::Nothing)
    }

    fn print_summary<W: Write>(&self, summary: &DumpSummary, out: &mut W) -> Result<()> {
        match self.options.format {
            OutputFormat::Text => write!(out, "{}", summary)?,
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(summary)?)?,
        }
        Ok(())
    }
}

/// `[OFFSET[, LIMIT]]` with defaults
fn window(args: &[Arg], offset: usize, limit: usize) -> Result<(usize, usize)> {
    let number = |arg: &Arg| match arg {
        Arg::Int(n) => usize::try_from(*n).context("offset and limit must not be negative"),
        other => bail!("expected a number, got {}", other.describe()),
    };
    match args {
        [] => Ok((offset, limit)),
        [o] => Ok((number(o)?, limit)),
        [o, l] => Ok((number(o)?, number(l)?)),
        _ => bail!("expected at most OFFSET and LIMIT"),
    }
}

/// Split a call's argument list into literals and names
fn parse_args(text: &str) -> Result<Vec<Arg>> {
    let tokens = tokenize(text)?;
    let mut args = Vec::new();
    let mut expect_arg = true;

    for spanned in tokens {
        match (expect_arg, spanned.token) {
            (true, Token::Str(s)) => args.push(Arg::Str(s)),
            (true, Token::Int(n)) => args.push(Arg::Int(n)),
            (true, Token::Ident(name)) => args.push(Arg::Ident(name)),
            (false, Token::Comma) => {}
            (_, other) => bail!(
                "unexpected {:?} at offset {} in arguments",
                other,
                spanned.offset
            ),
        }
        expect_arg = !expect_arg;
    }

    if !args.is_empty() && expect_arg {
        bail!("trailing ',' in arguments");
    }
    Ok(args)
}
