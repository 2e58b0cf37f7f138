// Predicate language for selecting tasks
//
// A predicate is a boolean expression over the attributes of one task:
//
//   id        integer identity
//   dups      number of identities the task stands for after dedupe (0 if none)
//   duration  minutes from the "N minutes" annotation (0 if absent)
//   lines     header line plus body lines
//   state     first annotation, e.g. "chan receive"
//   trace     raw body text
//
// Expressions are compiled once per operation and evaluated once per task,
// in collection order. Functions come from an explicit FunctionTable.

mod eval;
mod functions;
pub mod lexer;
mod parser;

pub use eval::Value;
pub use functions::{BuiltinFn, FunctionSpec, FunctionTable};
pub use parser::Attribute;

use crate::error::{DumpError, Result};
use crate::record::TaskRecord;
use parser::Expr;

/// A compiled predicate
#[derive(Debug, Clone)]
pub struct Predicate {
    source: String,
    expr: Expr,
}

impl Predicate {
    /// Compile `source` against the given function table
    ///
    /// # Errors
    /// [`DumpError::ExpressionSyntax`] for malformed input, unknown
    /// identifiers or unknown functions; [`DumpError::Arity`] when a function
    /// is called with the wrong number of arguments.
    ///
    /// # Example
    /// ```
    /// use taskdump::predicate::{FunctionTable, Predicate};
    /// use taskdump::record::TaskRecord;
    ///
    /// let predicate = Predicate::compile(
    ///     r#"state == "running" && duration > 5"#,
    ///     &FunctionTable::builtin(),
    /// )?;
    ///
    /// let mut task = TaskRecord::parse("goroutine 7 [running, 10 minutes]:")?;
    /// task.finalize();
    /// assert!(predicate.evaluate(&task)?);
    /// # Ok::<(), taskdump::error::DumpError>(())
    /// ```
    pub fn compile(source: &str, functions: &FunctionTable) -> Result<Self> {
        let expr = parser::parse(source, functions)?;
        tracing::debug!(predicate = source, "compiled predicate");
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Compile against [`FunctionTable::builtin`]
    pub fn compile_builtin(source: &str) -> Result<Self> {
        Self::compile(source, &FunctionTable::builtin())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against one task
    ///
    /// # Errors
    /// [`DumpError::Evaluation`] when an operation fails for this task and
    /// [`DumpError::ResultType`] when the result is not a boolean.
    pub fn evaluate(&self, record: &TaskRecord) -> Result<bool> {
        match eval::evaluate(&self.expr, record) {
            Ok(Value::Bool(b)) => Ok(b),
            Ok(other) => Err(DumpError::ResultType {
                id: record.id(),
                found: other.type_name(),
            }),
            Err(reason) => Err(DumpError::Evaluation {
                id: record.id(),
                reason,
            }),
        }
    }
}
