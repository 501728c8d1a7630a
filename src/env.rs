use std::collections::{HashMap, HashSet};

use crate::{builtins, number::Number};

pub const DEFAULT_CONSTANTS: &[(&str, f64)] = &[
    ("pi", std::f64::consts::PI),
    ("e", std::f64::consts::E),
    ("tau", std::f64::consts::TAU),
    ("phi", 1.618_033_988_749_895),
];

/// True for names owned by the language itself: default constants and
/// built-in functions, compared case-insensitively.
pub fn is_builtin_name(name: &str) -> bool {
    let key = name.to_lowercase();
    DEFAULT_CONSTANTS.iter().any(|(c, _)| *c == key) || builtins::lookup(&key).is_some()
}

/// A case-insensitive name → number mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: HashMap<String, Number>,
}

impl Bindings {
    pub fn get(&self, name: &str) -> Option<Number> {
        self.values.get(&name.to_lowercase()).copied()
    }

    /// Returns the previous value bound to `name`, if any.
    pub fn insert(&mut self, name: &str, value: Number) -> Option<Number> {
        self.values.insert(name.to_lowercase(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Number> {
        self.values.remove(&name.to_lowercase())
    }

    /// Puts `name` back to `previous`, removing it when there was no prior
    /// binding.
    pub fn restore(&mut self, name: &str, previous: Option<Number>) {
        match previous {
            Some(value) => {
                self.insert(name, value);
            }
            None => {
                self.remove(name);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Number)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Session state: constants, user variables and the names neither may be
/// shadowed by.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    constants: Bindings,
    pub variables: Bindings,
    protected: HashSet<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::with_constants(std::iter::empty::<(&str, Number)>())
    }

    /// Default constants plus `overrides`. Every resulting constant name and
    /// every built-in function name is protected from assignment.
    pub fn with_constants<I, S>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (S, Number)>,
        S: AsRef<str>,
    {
        let mut constants = Bindings::default();
        for (name, value) in DEFAULT_CONSTANTS {
            constants.insert(name, Number::Float(*value));
        }
        for (name, value) in overrides {
            constants.insert(name.as_ref(), value);
        }

        let protected = constants
            .iter()
            .map(|(name, _)| name.to_string())
            .chain(builtins::names().map(str::to_string))
            .collect();

        Self {
            constants,
            variables: Bindings::default(),
            protected,
        }
    }

    /// Variables first, then constants.
    pub fn lookup(&self, name: &str) -> Option<Number> {
        self.variables.get(name).or_else(|| self.constants.get(name))
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.protected.contains(&name.to_lowercase())
    }

    pub fn constants(&self) -> &Bindings {
        &self.constants
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let env = Environment::new();
        assert_eq!(env.lookup("pi"), Some(Number::Float(std::f64::consts::PI)));
        assert_eq!(env.lookup("TAU"), Some(Number::Float(std::f64::consts::TAU)));
        assert_eq!(env.lookup("x"), None);
        assert_eq!(env.constants().len(), 4);
        assert!(env.variables.is_empty());
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let env = Environment::with_constants([("PI", Number::Int(3)), ("g", Number::Float(9.81))]);
        assert_eq!(env.lookup("pi"), Some(Number::Int(3)));
        assert_eq!(env.lookup("G"), Some(Number::Float(9.81)));
        assert!(env.is_protected("g"));
    }

    #[test]
    fn test_protected_names() {
        let env = Environment::new();
        assert!(env.is_protected("Pi"));
        assert!(env.is_protected("SQRT"));
        assert!(env.is_protected("max"));
        assert!(!env.is_protected("x"));
    }

    #[test]
    fn test_variables_shadow_constants() {
        let mut env = Environment::with_constants([("k", Number::Int(1))]);
        env.variables.insert("K", Number::Int(2));
        assert_eq!(env.lookup("k"), Some(Number::Int(2)));
    }

    #[test]
    fn test_restore_binding() {
        let mut vars = Bindings::default();
        let prev = vars.insert("x", Number::Int(1));
        assert_eq!(prev, None);
        vars.restore("x", prev);
        assert!(!vars.contains("x"));
        assert!(vars.is_empty());

        vars.insert("y", Number::Int(5));
        let prev = vars.insert("Y", Number::Int(6));
        vars.restore("y", prev);
        assert_eq!(vars.get("y"), Some(Number::Int(5)));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn test_builtin_name_check() {
        assert!(is_builtin_name("E"));
        assert!(is_builtin_name("log"));
        assert!(!is_builtin_name("t"));
    }
}
