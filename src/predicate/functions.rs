use super::eval::Value;
use std::borrow::Cow;
use std::collections::HashMap;

/// Signature of a function callable from a predicate
pub type BuiltinFn = for<'a> fn(&[Value<'a>]) -> std::result::Result<Value<'a>, String>;

/// A named function with a fixed arity
#[derive(Clone, Copy)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub arity: usize,
    pub call: BuiltinFn,
}

impl std::fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Immutable name -> function mapping handed to the compiler
///
/// Arity is checked when an expression is compiled, so a bad call fails
/// before any task is evaluated.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<&'static str, FunctionSpec>,
}

impl FunctionTable {
    /// Table with no functions
    pub fn empty() -> Self {
        Self::default()
    }

    /// `contains(haystack, needle)`, `lower(s)` and `upper(s)`
    pub fn builtin() -> Self {
        Self::empty()
            .with("contains", 2, contains)
            .with("lower", 1, lower)
            .with("upper", 1, upper)
    }

    /// Add (or replace) a function
    pub fn with(mut self, name: &'static str, arity: usize, call: BuiltinFn) -> Self {
        self.functions
            .insert(name, FunctionSpec { name, arity, call });
        self
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }

    /// Function names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn string_arg<'v, 'a>(args: &'v [Value<'a>], index: usize, function: &str) -> Result<&'v str, String> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(&**s),
        Some(other) => Err(format!(
            "{}() expects a string as argument {}, got {}",
            function,
            index + 1,
            other.type_name()
        )),
        None => Err(format!("{}() is missing argument {}", function, index + 1)),
    }
}

fn contains<'a>(args: &[Value<'a>]) -> Result<Value<'a>, String> {
    let haystack = string_arg(args, 0, "contains")?;
    let needle = string_arg(args, 1, "contains")?;
    Ok(Value::Bool(haystack.contains(needle)))
}

fn lower<'a>(args: &[Value<'a>]) -> Result<Value<'a>, String> {
    let s = string_arg(args, 0, "lower")?;
    Ok(Value::Str(Cow::Owned(s.to_lowercase())))
}

fn upper<'a>(args: &[Value<'a>]) -> Result<Value<'a>, String> {
    let s = string_arg(args, 0, "upper")?;
    Ok(Value::Str(Cow::Owned(s.to_uppercase())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value<'_> {
        Value::Str(Cow::Borrowed(v))
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(
            FunctionTable::builtin().names(),
            vec!["contains", "lower", "upper"]
        );
        assert!(FunctionTable::empty().names().is_empty());
    }

    #[test]
    fn test_contains() {
        assert_eq!(
            contains(&[s("sync.(*Mutex).Lock"), s("Mutex")]),
            Ok(Value::Bool(true))
        );
        assert_eq!(contains(&[s("abc"), s("x")]), Ok(Value::Bool(false)));
        assert_eq!(contains(&[s("abc"), s("")]), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_case_folding() {
        assert_eq!(lower(&[s("Chan Receive")]), Ok(s("chan receive")));
        assert_eq!(upper(&[s("select")]), Ok(s("SELECT")));
    }

    #[test]
    fn test_type_mismatch() {
        let err = contains(&[Value::Int(1), s("x")]).unwrap_err();
        assert!(err.contains("expects a string"));
    }

    #[test]
    fn test_custom_function() {
        fn always<'a>(_: &[Value<'a>]) -> Result<Value<'a>, String> {
            Ok(Value::Bool(true))
        }
        let table = FunctionTable::empty().with("always", 0, always);
        let spec = table.get("always").unwrap();
        assert_eq!(spec.arity, 0);
        assert_eq!((spec.call)(&[]), Ok(Value::Bool(true)));
    }
}
