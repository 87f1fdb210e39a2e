//! Script parameters: the subset of host parameters declared by the active
//! shader's metadata.

use tracing::debug;

use super::{FloatParam, HostParameters};
use crate::isf::IsfMetadata;

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    /// The host already had a parameter of this name (a built-in such as
    /// `speed`). Its value is shared with the shader but it is never added or
    /// removed by the registry.
    borrowed: bool,
}

/// What a [`ScriptParameters::reconcile`] call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub kept: Vec<String>,
}

/// Tracks which host parameters belong to the current shader.
#[derive(Debug, Clone, Default)]
pub struct ScriptParameters {
    entries: Vec<Entry>,
}

impl ScriptParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script parameter names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live `(name, value)` pairs read from the host.
    pub fn values<'a>(
        &'a self,
        host: &'a dyn HostParameters,
    ) -> impl Iterator<Item = (&'a str, f32)> + 'a {
        self.entries
            .iter()
            .filter_map(move |e| host.value(&e.name).map(|v| (e.name.as_str(), v)))
    }

    /// Bring the registered script parameters in line with `meta`.
    ///
    /// Destructive: every current script parameter is removed and every
    /// declared one is added fresh at its default. A declared name the host
    /// already owns is reset to the declared default. Non-destructive: only new
    /// names are added and only names no longer declared are removed; the
    /// rest keep their live value.
    pub fn reconcile(
        &mut self,
        meta: &IsfMetadata,
        destructive: bool,
        host: &mut dyn HostParameters,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        if destructive {
            self.clear_into(host, &mut report.removed);
        } else {
            let stale: Vec<Entry> = self
                .entries
                .iter()
                .filter(|e| meta.get(&e.name).is_none())
                .cloned()
                .collect();
            for entry in stale {
                if !entry.borrowed {
                    host.remove(&entry.name);
                }
                report.removed.push(entry.name);
            }
        }

        let mut next = Vec::with_capacity(meta.inputs.len());
        for input in &meta.inputs {
            if let Some(existing) = self.entries.iter().find(|e| e.name == input.name) {
                report.kept.push(input.name.clone());
                next.push(existing.clone());
                continue;
            }

            let borrowed = host.contains(&input.name);
            if borrowed {
                if destructive {
                    host.set_value(&input.name, input.default);
                }
            } else {
                host.add(FloatParam::new(
                    input.name.clone(),
                    input.default,
                    input.min,
                    input.max,
                ));
            }
            report.added.push(input.name.clone());
            next.push(Entry {
                name: input.name.clone(),
                borrowed,
            });
        }
        self.entries = next;

        debug!(
            destructive,
            added = ?report.added,
            removed = ?report.removed,
            kept = ?report.kept,
            "reconciled script parameters"
        );
        report
    }

    /// Remove every script parameter from the host.
    pub fn clear(&mut self, host: &mut dyn HostParameters) {
        let mut removed = Vec::new();
        self.clear_into(host, &mut removed);
    }

    fn clear_into(&mut self, host: &mut dyn HostParameters, removed: &mut Vec<String>) {
        for entry in self.entries.drain(..) {
            if !entry.borrowed {
                host.remove(&entry.name);
            }
            removed.push(entry.name);
        }
    }
}
