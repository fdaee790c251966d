use std::collections::HashMap;

use crate::value::Value;

/// Named parameters visible while parsing and folding expressions.
///
/// An identifier bound here is a parameter reference; every other identifier is a field.
#[derive(Clone, Debug, Default)]
pub struct Context {
    params: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_param(name, value);
        self
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(name.into(), value.into());
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }
}
