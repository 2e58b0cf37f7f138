// Task dump collection and its analysis operations
//
// A TaskDump owns an ordered list of finalized tasks (parse order unless
// sorted). Tasks are shared through Arc: copy() and diff() hand the same
// task instances to new collections. The only per-task field written after
// finalization is the duplicate list, and dedupe writes it copy-on-write so
// tasks shared with another collection are never changed underneath it.
//
// Operations taking a condition compile it once and evaluate it against
// every task before touching the collection; an error leaves it unchanged.

mod render;
mod report;

pub use render::{write_task, Renderer};
pub use report::{DedupeReport, DumpSummary, FilterReport};

use crate::diff::{self, DumpDiff};
use crate::error::Result;
use crate::predicate::Predicate;
use crate::record::TaskRecord;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Ordered collection of tasks from one dump
#[derive(Debug, Clone, Default)]
pub struct TaskDump {
    tasks: Vec<Arc<TaskRecord>>,
}

impl TaskDump {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records in order, finalizing each
    pub fn from_records<I: IntoIterator<Item = TaskRecord>>(records: I) -> Self {
        let mut dump = Self::new();
        for record in records {
            dump.add(record);
        }
        dump
    }

    /// Build from an identity-keyed grouping; the result is ordered by identity
    pub(crate) fn from_id_map(tasks: BTreeMap<u64, Arc<TaskRecord>>) -> Self {
        Self {
            tasks: tasks.into_values().collect(),
        }
    }

    /// Append a task, finalizing it first if needed
    pub fn add(&mut self, mut record: TaskRecord) {
        record.finalize();
        self.tasks.push(Arc::new(record));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks.iter().map(Arc::as_ref)
    }

    pub(crate) fn shared(&self) -> impl Iterator<Item = &Arc<TaskRecord>> {
        self.tasks.iter()
    }

    /// Identities in current order
    pub fn ids(&self) -> Vec<u64> {
        self.iter().map(TaskRecord::id).collect()
    }

    pub fn get(&self, id: u64) -> Option<&TaskRecord> {
        self.iter().find(|t| t.id() == id)
    }

    /// Fold tasks with the same stack fingerprint into one representative
    ///
    /// The representative is the first task of its group in collection
    /// order; its duplicate list becomes the sorted identities of the whole
    /// group (including identities previous dedupes folded into members), so
    /// dedupe is idempotent. Representatives keep their relative order.
    pub fn dedupe(&mut self) -> DedupeReport {
        let tasks = std::mem::take(&mut self.tasks);
        let before = tasks.len();

        let mut groups: Vec<(Arc<TaskRecord>, Vec<u64>)> = Vec::new();
        {
            let mut by_fingerprint: HashMap<&str, usize> = HashMap::new();
            for task in &tasks {
                let represented = if task.duplicate_ids().is_empty() {
                    vec![task.id()]
                } else {
                    task.duplicate_ids().to_vec()
                };

                let key = task.fingerprint().unwrap_or_default();
                match by_fingerprint.get(key) {
                    Some(&index) => groups[index].1.extend(represented),
                    None => {
                        by_fingerprint.insert(key, groups.len());
                        groups.push((Arc::clone(task), represented));
                    }
                }
            }
        }
        // release the old handles so unshared representatives are written in place
        drop(tasks);

        self.tasks = groups
            .into_iter()
            .map(|(mut task, mut ids)| {
                ids.sort_unstable();
                ids.dedup();
                if task.duplicate_ids() != ids.as_slice() {
                    Arc::make_mut(&mut task).set_duplicate_ids(ids);
                }
                task
            })
            .collect();

        let report = DedupeReport {
            before,
            after: self.tasks.len(),
        };
        if report.changed() {
            tracing::info!("{}", report);
        }
        report
    }

    /// Evaluate `predicate` against every task, in order
    pub fn evaluate(&self, predicate: &Predicate) -> Result<Vec<bool>> {
        self.iter().map(|task| predicate.evaluate(task)).collect()
    }

    /// Remove tasks matching `cond`
    pub fn delete(&mut self, cond: &str) -> Result<FilterReport> {
        let predicate = Predicate::compile_builtin(cond)?;
        self.delete_where(&predicate)
    }

    /// Keep only tasks matching `cond`
    pub fn keep(&mut self, cond: &str) -> Result<FilterReport> {
        let predicate = Predicate::compile_builtin(cond)?;
        self.keep_where(&predicate)
    }

    pub fn delete_where(&mut self, predicate: &Predicate) -> Result<FilterReport> {
        self.retain_by(predicate, false)
    }

    pub fn keep_where(&mut self, predicate: &Predicate) -> Result<FilterReport> {
        self.retain_by(predicate, true)
    }

    fn retain_by(&mut self, predicate: &Predicate, keep_matching: bool) -> Result<FilterReport> {
        let verdicts = self.evaluate(predicate)?;
        let before = self.tasks.len();

        let mut verdicts = verdicts.into_iter();
        self.tasks
            .retain(|_| verdicts.next() == Some(keep_matching));

        let report = FilterReport {
            removed: before - self.tasks.len(),
            kept: self.tasks.len(),
        };
        tracing::info!(predicate = predicate.source(), "{}", report);
        Ok(report)
    }

    /// New collection with the tasks matching `cond`; `""` copies everything
    pub fn copy(&self, cond: &str) -> Result<TaskDump> {
        let Some(predicate) = optional_predicate(cond)? else {
            return Ok(self.clone());
        };

        let verdicts = self.evaluate(&predicate)?;
        let tasks = self
            .tasks
            .iter()
            .zip(verdicts)
            .filter(|(_, matched)| *matched)
            .map(|(task, _)| Arc::clone(task))
            .collect();
        Ok(Self { tasks })
    }

    /// Matching tasks whose match rank falls in `[offset, offset + limit)`
    ///
    /// `""` matches every task.
    pub fn search(&self, cond: &str, offset: usize, limit: usize) -> Result<Vec<&TaskRecord>> {
        let verdicts = match optional_predicate(cond)? {
            Some(predicate) => self.evaluate(&predicate)?,
            None => vec![true; self.tasks.len()],
        };

        Ok(self
            .iter()
            .zip(verdicts)
            .filter(|(_, matched)| *matched)
            .map(|(task, _)| task)
            .skip(offset)
            .take(limit)
            .collect())
    }

    /// Window of the collection in current order
    pub fn show(&self, offset: usize, limit: usize) -> impl Iterator<Item = &TaskRecord> {
        self.iter().skip(offset).take(limit)
    }

    /// Order by identity ascending (stable); returns the task count
    pub fn sort(&mut self) -> usize {
        self.tasks.sort_by_key(|task| task.id());
        self.tasks.len()
    }

    pub fn summary(&self) -> DumpSummary {
        let mut states = BTreeMap::new();
        for task in self.iter() {
            *states.entry(task.state().to_string()).or_insert(0) += 1;
        }
        DumpSummary {
            total: self.tasks.len(),
            states,
        }
    }

    /// Three-way split against `other` by identity
    pub fn diff(&self, other: &TaskDump) -> DumpDiff {
        diff::diff(self, other)
    }

    /// Write every task block in current order
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        for task in self.iter() {
            write_task(w, task)?;
        }
        Ok(())
    }

    /// Save to `path`, truncating it
    ///
    /// On error, bytes already written stay on disk.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut w = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut w)?;
        w.flush()?;
        tracing::debug!(path = %path.as_ref().display(), tasks = self.len(), "saved dump");
        Ok(())
    }
}

fn optional_predicate(cond: &str) -> Result<Option<Predicate>> {
    if cond.trim().is_empty() {
        return Ok(None);
    }
    Predicate::compile_builtin(cond).map(Some)
}
