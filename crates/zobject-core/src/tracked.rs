//! Dirty-attribute tracking.
//!
//! Each object keeps its current attribute values next to a shadow copy of
//! the last-saved value for every attribute changed since the last
//! successful write. Tracking is per attribute slot, in declaration order.

use crate::schema::AttributeInfo;
use crate::value::Value;

/// One attribute change: the last-saved value and the current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub name: &'static str,
    pub old: Value,
    pub new: Value,
}

/// Current values plus last-saved shadows for one object.
#[derive(Debug, Clone)]
pub struct AttributeTracker {
    attributes: &'static [AttributeInfo],
    values: Vec<Value>,
    /// Last-saved value for each dirty slot; `None` means clean.
    originals: Vec<Option<Value>>,
    previously_changed: Vec<Change>,
}

impl AttributeTracker {
    /// Create a tracker with every attribute null and clean.
    pub fn new(attributes: &'static [AttributeInfo]) -> Self {
        Self {
            attributes,
            values: vec![Value::Null; attributes.len()],
            originals: vec![None; attributes.len()],
            previously_changed: Vec::new(),
        }
    }

    /// Declared attributes, in slot order.
    pub fn attributes(&self) -> &'static [AttributeInfo] {
        self.attributes
    }

    /// Slot index for a local attribute name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Current value of an attribute.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index_of(name).map(|i| &self.values[i])
    }

    /// Assign a value, recording the last-saved value on the first change.
    ///
    /// Assigning the last-saved value back does not clean the slot.
    /// Returns `false` if the attribute is not declared.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        let Some(idx) = self.index_of(name) else {
            return false;
        };
        if self.originals[idx].is_none() && self.values[idx] != value {
            self.originals[idx] = Some(self.values[idx].clone());
        }
        self.values[idx] = value;
        true
    }

    /// Force an attribute dirty without changing its value.
    ///
    /// Returns `false` if the attribute is not declared.
    pub fn mark_changed(&mut self, name: &str) -> bool {
        let Some(idx) = self.index_of(name) else {
            return false;
        };
        if self.originals[idx].is_none() {
            self.originals[idx] = Some(self.values[idx].clone());
        }
        true
    }

    /// Check whether a single attribute is dirty.
    pub fn is_changed(&self, name: &str) -> bool {
        self.index_of(name)
            .is_some_and(|i| self.originals[i].is_some())
    }

    /// Check whether any attribute is dirty.
    pub fn has_changes(&self) -> bool {
        self.originals.iter().any(Option::is_some)
    }

    /// Names of dirty attributes, in declaration order.
    pub fn changed(&self) -> Vec<&'static str> {
        self.dirty_slots().map(|i| self.attributes[i].name).collect()
    }

    /// Dirty attributes mapped to their last-saved value.
    pub fn changed_attributes(&self) -> Vec<(&'static str, Value)> {
        self.dirty_slots()
            .filter_map(|i| {
                self.originals[i]
                    .as_ref()
                    .map(|old| (self.attributes[i].name, old.clone()))
            })
            .collect()
    }

    /// Dirty attributes with both last-saved and current values.
    pub fn changes(&self) -> Vec<Change> {
        self.dirty_slots()
            .filter_map(|i| {
                self.originals[i].as_ref().map(|old| Change {
                    name: self.attributes[i].name,
                    old: old.clone(),
                    new: self.values[i].clone(),
                })
            })
            .collect()
    }

    /// Dirty attributes with their current value.
    pub fn changed_values(&self) -> impl Iterator<Item = (&'static AttributeInfo, &Value)> {
        self.dirty_slots()
            .map(|i| (&self.attributes[i], &self.values[i]))
    }

    /// Accept current values as the new baseline.
    ///
    /// The changes being cleared are kept for [`previously_changed`](Self::previously_changed).
    pub fn clear_changed(&mut self) {
        self.previously_changed = self.changes();
        for slot in &mut self.originals {
            *slot = None;
        }
    }

    /// Restore last-saved values and clean every slot.
    pub fn revert_changes(&mut self) {
        for (value, original) in self.values.iter_mut().zip(self.originals.iter_mut()) {
            if let Some(old) = original.take() {
                *value = old;
            }
        }
    }

    /// Changes cleared by the most recent [`clear_changed`](Self::clear_changed).
    pub fn previously_changed(&self) -> &[Change] {
        &self.previously_changed
    }

    /// Iterate over `(attribute, current value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static AttributeInfo, &Value)> {
        self.attributes.iter().zip(self.values.iter())
    }

    fn dirty_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.originals
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_some())
            .map(|(i, _)| i)
    }
}
