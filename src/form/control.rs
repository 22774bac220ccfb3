use serde_json::Value;

use super::validators::{self, ValidationIssue, Validator};

/// A state change reported by the form tree.
///
/// The tree queues events during each pass and mutation; the view layer
/// drains them. This replaces per-node hot observables with one
/// explicit seam (derived read-only state lives on the nodes).
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    HiddenChanged { path: String, hidden: bool },
    EnabledChanged { path: String, enabled: bool },
    ValueChanged { path: String },
    StructureChanged { path: String },
}

/// The derived UI state every node carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiState {
    pub hidden: bool,
    pub disabled: bool,
    pub required: bool,
}

/// The state a parent hands down during the derived-state pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentState {
    pub is_disabled: bool,
    pub is_hidden: bool,
}

/// A leaf value container: the current value, the active validators and
/// the derived UI state.
#[derive(Debug)]
pub struct FieldControl {
    path: String,
    value: Option<Value>,
    validators: Vec<Validator>,
    state: UiState,
}

impl FieldControl {
    pub fn new(path: String, value: Option<Value>, validators: Vec<Validator>) -> Self {
        Self {
            path,
            value,
            validators,
            state: UiState::default(),
        }
    }

    pub(crate) fn with_state(mut self, state: UiState) -> Self {
        self.state = state;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.path = path;
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn set_value(&mut self, value: Option<Value>) {
        self.value = value;
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn is_hidden(&self) -> bool {
        self.state.hidden
    }

    pub fn is_disabled(&self) -> bool {
        self.state.disabled
    }

    pub fn is_required(&self) -> bool {
        self.state.required
    }

    pub fn set_validators(&mut self, validators: Vec<Validator>) {
        self.validators = validators;
    }

    /// Applies freshly computed state, queueing events only for flags
    /// that actually flipped. Returns whether `required` flipped, which
    /// tells the owner to rebuild validators.
    pub fn apply_state(&mut self, state: UiState, events: &mut Vec<FormEvent>) -> bool {
        if state.hidden != self.state.hidden {
            events.push(FormEvent::HiddenChanged {
                path: self.path.clone(),
                hidden: state.hidden,
            });
        }
        if state.disabled != self.state.disabled {
            events.push(FormEvent::EnabledChanged {
                path: self.path.clone(),
                enabled: !state.disabled,
            });
        }
        let required_flipped = state.required != self.state.required;
        self.state = state;
        required_flipped
    }

    /// Validation findings. Hidden and disabled controls never report
    /// findings; they are not part of the editable surface.
    pub fn errors(&self) -> Vec<ValidationIssue> {
        if self.state.hidden || self.state.disabled {
            return Vec::new();
        }
        validators::validate(self.value.as_ref(), &self.validators)
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }
}
