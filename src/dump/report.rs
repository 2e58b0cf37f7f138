use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of delete/keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub removed: usize,
    pub kept: usize,
}

impl fmt::Display for FilterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deleted {} tasks, kept {}.", self.removed, self.kept)
    }
}

/// Outcome of dedupe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DedupeReport {
    pub before: usize,
    pub after: usize,
}

impl DedupeReport {
    /// True when at least two tasks were folded together
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

impl fmt::Display for DedupeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dedupped {}, kept {}", self.before, self.after)
    }
}

/// Task count overall and per state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DumpSummary {
    pub total: usize,
    /// State name -> number of tasks, ordered by state name
    pub states: BTreeMap<String, usize>,
}

impl fmt::Display for DumpSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# of tasks: {}", self.total)?;
        if self.total > 0 {
            writeln!(f)?;
        }
        if !self.states.is_empty() {
            for (state, count) in &self.states {
                writeln!(f, "{:>15}: {}", state, count)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_report_display() {
        let report = FilterReport {
            removed: 3,
            kept: 7,
        };
        assert_eq!(report.to_string(), "Deleted 3 tasks, kept 7.");
    }

    #[test]
    fn test_dedupe_report() {
        let report = DedupeReport {
            before: 10,
            after: 4,
        };
        assert!(report.changed());
        assert_eq!(report.to_string(), "dedupped 10, kept 4");
        assert!(!DedupeReport {
            before: 2,
            after: 2
        }
        .changed());
    }

    #[test]
    fn test_summary_display() {
        let mut states = BTreeMap::new();
        states.insert("running".to_string(), 1);
        states.insert("chan receive".to_string(), 2);
        let summary = DumpSummary { total: 3, states };

        assert_eq!(
            summary.to_string(),
            "# of tasks: 3\n\n   chan receive: 2\n        running: 1\n\n"
        );
    }

    #[test]
    fn test_empty_summary_display() {
        assert_eq!(DumpSummary::default().to_string(), "# of tasks: 0\n");
    }

    #[test]
    fn test_summary_serializes() {
        let mut states = BTreeMap::new();
        states.insert("idle".to_string(), 2);
        let json = serde_json::to_string(&DumpSummary { total: 2, states }).unwrap();
        assert_eq!(json, r#"{"total":2,"states":{"idle":2}}"#);
    }
}
