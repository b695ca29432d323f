//! Call arguments, priorities, and aggregated hook results.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keyword arguments passed to a hook call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookArgs {
    /// Argument name → value.
    pub data: HashMap<String, Value>,
}

impl HookArgs {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value.
    pub fn with_data(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Inserts a string value.
    pub fn with_string(self, key: &str, value: &str) -> Self {
        self.with_data(key, Value::from(value))
    }

    /// Inserts an integer value.
    pub fn with_int(self, key: &str, value: i64) -> Self {
        self.with_data(key, Value::from(value))
    }

    /// Inserts a boolean value.
    pub fn with_bool(self, key: &str, value: bool) -> Self {
        self.with_data(key, Value::from(value))
    }

    /// Gets a value by key.
    pub fn get_data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Gets a string value.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Gets an i64 value.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(|v| v.as_i64())
    }

    /// Gets a bool value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }

    /// Gets a value an implementation declared, failing if it is absent.
    pub fn require(&self, key: &str) -> anyhow::Result<&Value> {
        self.data
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("missing hook argument '{key}'"))
    }

    /// Returns whether the argument is present.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the argument names, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.data.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns whether there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Narrows the arguments to exactly `names`.
    ///
    /// Returns the missing names when any of them is absent.
    pub fn project(&self, names: &[String]) -> Result<HookArgs, Vec<String>> {
        let mut projected = HashMap::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.data.get(name) {
                Some(value) => {
                    projected.insert(name.clone(), value.clone());
                }
                None => missing.push(name.clone()),
            }
        }
        if missing.is_empty() {
            Ok(HookArgs { data: projected })
        } else {
            Err(missing)
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for HookArgs {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Relative ordering group of an implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Runs before every neutral and last implementation.
    First,
    /// Default group.
    #[default]
    Neutral,
    /// Runs after every first and neutral implementation.
    Last,
}

impl Priority {
    /// Returns the string name of this priority.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Neutral => "neutral",
            Self::Last => "last",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregated result of one hook call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HookReturn {
    /// Every non-null implementation result, in dispatch order.
    All(Vec<Value>),
    /// The first non-null result of a firstresult hook.
    First(Option<Value>),
}

impl HookReturn {
    /// Flattens the result into a list of values.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Self::All(values) => values,
            Self::First(value) => value.into_iter().collect(),
        }
    }

    /// Returns the values as a slice-like vector of references.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Self::All(values) => values.iter().collect(),
            Self::First(value) => value.iter().collect(),
        }
    }

    /// Returns the single value of a firstresult call, or the first of a list.
    pub fn first(&self) -> Option<&Value> {
        match self {
            Self::All(values) => values.first(),
            Self::First(value) => value.as_ref(),
        }
    }

    /// Returns whether no implementation produced a value.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::All(values) => values.is_empty(),
            Self::First(value) => value.is_none(),
        }
    }
}
