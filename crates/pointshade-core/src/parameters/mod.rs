//! Host-visible float parameters.
//!
//! The host application owns the parameter collection (sliders, persistence,
//! automation). This crate only needs to add, remove and read parameters, so
//! the collection is abstracted as [`HostParameters`]. [`ParameterSet`] is a
//! plain in-memory implementation for drivers without their own storage.

pub mod registry;
pub use registry::{ReconcileReport, ScriptParameters};

/// A bounded float parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatParam {
    pub name: String,
    pub value: f32,
    pub default: f32,
    pub min: f32,
    pub max: f32,
    pub description: Option<String>,
}

impl FloatParam {
    pub fn new(name: impl Into<String>, default: f32, min: f32, max: f32) -> Self {
        Self {
            name: name.into(),
            value: default,
            default,
            min,
            max,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Clamp `value` into `[min, max]`.
    pub fn clamp(&self, value: f32) -> f32 {
        if self.min <= self.max {
            value.clamp(self.min, self.max)
        } else {
            value
        }
    }
}

/// The host's parameter collection, as seen from a pattern.
pub trait HostParameters {
    /// Register a parameter. A parameter with the same name is replaced.
    fn add(&mut self, param: FloatParam);

    /// Remove a parameter, returning whether it existed.
    fn remove(&mut self, name: &str) -> bool;

    fn contains(&self, name: &str) -> bool;

    /// Current live value of a parameter.
    fn value(&self, name: &str) -> Option<f32>;

    /// Set the live value of a parameter, clamped to its bounds. Returns
    /// `false` if no such parameter exists.
    fn set_value(&mut self, name: &str, value: f32) -> bool;
}

/// Insertion-ordered in-memory parameter collection.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    params: Vec<FloatParam>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FloatParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Set the live value of a parameter, clamped to its bounds.
    ///
    /// Returns `false` if no such parameter exists.
    pub fn set_value(&mut self, name: &str, value: f32) -> bool {
        match self.params.iter_mut().find(|p| p.name == name) {
            Some(param) => {
                param.value = param.clamp(value);
                true
            }
            None => false,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl HostParameters for ParameterSet {
    fn add(&mut self, param: FloatParam) {
        match self.params.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => *existing = param,
            None => self.params.push(param),
        }
    }

    fn remove(&mut self, name: &str) -> bool {
        let before = self.params.len();
        self.params.retain(|p| p.name != name);
        self.params.len() != before
    }

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn value(&self, name: &str) -> Option<f32> {
        self.get(name).map(|p| p.value)
    }

    fn set_value(&mut self, name: &str, value: f32) -> bool {
        ParameterSet::set_value(self, name, value)
    }
}
