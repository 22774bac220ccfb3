use serde::{Deserialize, Serialize};

/// What a matched rule forces on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleAction {
    Hide,
    Disable,
    Require,
}

/// A declarative per-field rule: when `condition` evaluates truthy for
/// a field matching `field`, the action is forced.
///
/// `field` is a dotted form path, or the sentinel `tag:<name>` to match
/// every field tagged `<name>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: String,
    pub action: RuleAction,
    pub condition: String,
}

impl FieldRule {
    pub fn new(action: RuleAction, field: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            action,
            condition: condition.into(),
        }
    }

    /// The tag name if this is a `tag:<name>` sentinel rule.
    pub fn tag(&self) -> Option<&str> {
        self.field.strip_prefix("tag:")
    }
}
