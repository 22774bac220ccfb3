use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// One conditional branch of an If step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfBranch {
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum IfTag {
    If,
}

/// A branching step: named branches in declaration order plus an else
/// pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStep {
    #[serde(rename = "stepType")]
    tag: IfTag,
    #[serde(default)]
    pub branches: Vec<IfBranch>,
    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_step: Option<String>,
}

impl IfStep {
    pub fn new(branches: Vec<IfBranch>, else_step: Option<String>) -> Self {
        Self {
            tag: IfTag::If,
            branches,
            else_step,
        }
    }
}

/// Any non-branching automation step, kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStep {
    #[serde(rename = "stepType")]
    pub step_type: String,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl RawStep {
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            values: Map::new(),
        }
    }
}

/// A step definition, discriminated by its `stepType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlowStep {
    If(IfStep),
    Raw(RawStep),
}

impl FlowStep {
    pub fn as_if(&self) -> Option<&IfStep> {
        match self {
            FlowStep::If(step) => Some(step),
            FlowStep::Raw(_) => None,
        }
    }
}

/// A step entry: its definition plus the chain pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStepHolder {
    pub step: FlowStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_step_id: Option<String>,
}

/// The serializable flow graph: a step map plus the root of the default
/// branch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowDefinition {
    #[serde(default)]
    pub steps: AHashMap<String, FlowStepHolder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_step: Option<String>,
}

/// Where a branch's root pointer lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchTarget {
    /// The graph's `initial_step`.
    Root,
    /// The `index`-th named branch of the If step.
    IfBranch { step_id: String, index: usize },
    /// The If step's else pointer.
    IfElse { step_id: String },
}

/// One editable branch, as presented to the editor UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubBranch {
    pub label: String,
    pub root: Option<String>,
    pub target: BranchTarget,
}

/// An immutable view over a flow definition.
///
/// Every mutator returns a new `FlowView` built from a deep clone; the
/// original is never touched. Invalid inputs (unknown ids, a non-If
/// parent, an out-of-range branch index) are not errors: the operation
/// is a no-op returning a view that shares the same underlying
/// definition, so callers can detect "nothing changed" cheaply via
/// [`same_definition`].
///
/// [`same_definition`]: Self::same_definition
#[derive(Debug, Clone)]
pub struct FlowView {
    def: Arc<FlowDefinition>,
}

impl Default for FlowView {
    fn default() -> Self {
        Self::empty()
    }
}

impl FlowView {
    pub fn empty() -> Self {
        Self {
            def: Arc::new(FlowDefinition::default()),
        }
    }

    pub fn from_definition(def: FlowDefinition) -> Self {
        Self { def: Arc::new(def) }
    }

    /// The serializable definition, for persistence.
    pub fn dto(&self) -> &FlowDefinition {
        &self.def
    }

    /// True when both views share the exact same underlying definition,
    /// i.e. no mutation happened between them.
    pub fn same_definition(&self, other: &FlowView) -> bool {
        Arc::ptr_eq(&self.def, &other.def)
    }

    fn share(&self) -> FlowView {
        FlowView {
            def: self.def.clone(),
        }
    }

    fn branch_target(&self, parent_id: Option<&str>, branch_index: usize) -> Option<BranchTarget> {
        let Some(parent_id) = parent_id else {
            return Some(BranchTarget::Root);
        };
        let if_step = self.def.steps.get(parent_id)?.step.as_if()?;
        if branch_index < if_step.branches.len() {
            Some(BranchTarget::IfBranch {
                step_id: parent_id.to_string(),
                index: branch_index,
            })
        } else if branch_index == if_step.branches.len() {
            Some(BranchTarget::IfElse {
                step_id: parent_id.to_string(),
            })
        } else {
            None
        }
    }

    /// Inserts a step into a branch: as the new branch root when
    /// `after_id` is omitted, immediately after `after_id` otherwise.
    /// The inserted step gets a fresh id and inherits its predecessor's
    /// former `next_step_id`.
    pub fn add(
        &self,
        step: FlowStep,
        after_id: Option<&str>,
        parent_id: Option<&str>,
        branch_index: usize,
    ) -> FlowView {
        let Some(target) = self.branch_target(parent_id, branch_index) else {
            return self.share();
        };

        let root = read_root(&self.def, &target);
        let new_id = Uuid::new_v4().to_string();
        let mut def = (*self.def).clone();

        match after_id {
            None => {
                def.steps.insert(
                    new_id.clone(),
                    FlowStepHolder {
                        step,
                        next_step_id: root,
                    },
                );
                write_root(&mut def, &target, Some(new_id));
            }
            Some(after) => {
                if !chain_contains(&self.def, root.as_deref(), after) {
                    return self.share();
                }
                let Some(holder) = def.steps.get_mut(after) else {
                    return self.share();
                };
                let old_next = holder.next_step_id.take();
                holder.next_step_id = Some(new_id.clone());
                def.steps.insert(
                    new_id,
                    FlowStepHolder {
                        step,
                        next_step_id: old_next,
                    },
                );
            }
        }

        cleanup(&mut def);
        FlowView { def: Arc::new(def) }
    }

    /// Unlinks and deletes a step from a branch, reconnecting its
    /// predecessor (or the branch root pointer) to its successor.
    pub fn remove(&self, id: &str, parent_id: Option<&str>, branch_index: usize) -> FlowView {
        let Some(target) = self.branch_target(parent_id, branch_index) else {
            return self.share();
        };

        let root = read_root(&self.def, &target);
        if !chain_contains(&self.def, root.as_deref(), id) {
            return self.share();
        }

        let mut def = (*self.def).clone();
        let removed_next = def.steps.get(id).and_then(|h| h.next_step_id.clone());

        if root.as_deref() == Some(id) {
            write_root(&mut def, &target, removed_next);
        } else {
            let Some(predecessor) = find_predecessor(&def, root.as_deref(), id) else {
                return self.share();
            };
            let Some(holder) = def.steps.get_mut(&predecessor) else {
                return self.share();
            };
            holder.next_step_id = removed_next;
        }

        def.steps.remove(id);
        cleanup(&mut def);
        FlowView { def: Arc::new(def) }
    }

    /// Replaces a step's definition, preserving its chain pointer.
    pub fn update(&self, id: &str, step: FlowStep) -> FlowView {
        let mut def = (*self.def).clone();
        let Some(holder) = def.steps.get_mut(id) else {
            return self.share();
        };
        holder.step = step;
        cleanup(&mut def);
        FlowView { def: Arc::new(def) }
    }

    /// The editable branches under a parent: the single root branch for
    /// no parent (or a non-If parent), otherwise one branch per declared
    /// If branch plus the trailing else.
    pub fn branches(&self, parent_id: Option<&str>) -> Vec<SubBranch> {
        let if_step = parent_id.and_then(|id| {
            self.def
                .steps
                .get(id)
                .and_then(|h| h.step.as_if())
                .map(|s| (id, s))
        });
        let Some((parent_id, if_step)) = if_step else {
            return vec![SubBranch {
                label: "root".to_string(),
                root: self.def.initial_step.clone(),
                target: BranchTarget::Root,
            }];
        };

        let mut branches: Vec<SubBranch> = if_step
            .branches
            .iter()
            .enumerate()
            .map(|(index, branch)| SubBranch {
                label: format!("if: {}", branch.condition),
                root: branch.step.clone(),
                target: BranchTarget::IfBranch {
                    step_id: parent_id.to_string(),
                    index,
                },
            })
            .collect();
        branches.push(SubBranch {
            label: "else".to_string(),
            root: if_step.else_step.clone(),
            target: BranchTarget::IfElse {
                step_id: parent_id.to_string(),
            },
        });
        branches
    }

    /// Rewrites one branch root pointer.
    pub fn set_branch_root(&self, target: &BranchTarget, id: Option<String>) -> FlowView {
        if !target_exists(&self.def, target) {
            return self.share();
        }
        let mut def = (*self.def).clone();
        write_root(&mut def, target, id);
        cleanup(&mut def);
        FlowView { def: Arc::new(def) }
    }
}

fn target_exists(def: &FlowDefinition, target: &BranchTarget) -> bool {
    match target {
        BranchTarget::Root => true,
        BranchTarget::IfBranch { step_id, index } => def
            .steps
            .get(step_id)
            .and_then(|h| h.step.as_if())
            .is_some_and(|s| *index < s.branches.len()),
        BranchTarget::IfElse { step_id } => def
            .steps
            .get(step_id)
            .and_then(|h| h.step.as_if())
            .is_some(),
    }
}

fn read_root(def: &FlowDefinition, target: &BranchTarget) -> Option<String> {
    match target {
        BranchTarget::Root => def.initial_step.clone(),
        BranchTarget::IfBranch { step_id, index } => def
            .steps
            .get(step_id)
            .and_then(|h| h.step.as_if())
            .and_then(|s| s.branches.get(*index))
            .and_then(|b| b.step.clone()),
        BranchTarget::IfElse { step_id } => def
            .steps
            .get(step_id)
            .and_then(|h| h.step.as_if())
            .and_then(|s| s.else_step.clone()),
    }
}

fn write_root(def: &mut FlowDefinition, target: &BranchTarget, id: Option<String>) {
    match target {
        BranchTarget::Root => def.initial_step = id,
        BranchTarget::IfBranch { step_id, index } => {
            if let Some(FlowStep::If(if_step)) = def.steps.get_mut(step_id).map(|h| &mut h.step) {
                if let Some(branch) = if_step.branches.get_mut(*index) {
                    branch.step = id;
                }
            }
        }
        BranchTarget::IfElse { step_id } => {
            if let Some(FlowStep::If(if_step)) = def.steps.get_mut(step_id).map(|h| &mut h.step) {
                if_step.else_step = id;
            }
        }
    }
}

/// Walks a branch's `next_step_id` chain looking for `id`. Bounded by a
/// visited set so a malformed cyclic definition cannot loop forever.
fn chain_contains(def: &FlowDefinition, root: Option<&str>, id: &str) -> bool {
    let mut visited = AHashSet::new();
    let mut current = root.map(str::to_string);
    while let Some(step_id) = current {
        if !visited.insert(step_id.clone()) {
            return false;
        }
        if step_id == id {
            return true;
        }
        current = def
            .steps
            .get(&step_id)
            .and_then(|h| h.next_step_id.clone());
    }
    false
}

fn find_predecessor(def: &FlowDefinition, root: Option<&str>, id: &str) -> Option<String> {
    let mut visited = AHashSet::new();
    let mut current = root.map(str::to_string);
    while let Some(step_id) = current {
        if !visited.insert(step_id.clone()) {
            return None;
        }
        let next = def.steps.get(&step_id).and_then(|h| h.next_step_id.clone());
        if next.as_deref() == Some(id) {
            return Some(step_id);
        }
        current = next;
    }
    None
}

/// Deletes every step not reachable from the graph's initial step,
/// following chain pointers and, through reached If steps, their branch
/// and else pointers. Runs after every mutation so orphans never
/// persist silently.
fn cleanup(def: &mut FlowDefinition) {
    let mut reachable = AHashSet::new();
    let mut queue: Vec<String> = def.initial_step.iter().cloned().collect();

    while let Some(id) = queue.pop() {
        if !reachable.insert(id.clone()) {
            continue;
        }
        let Some(holder) = def.steps.get(&id) else {
            continue;
        };
        if let Some(next) = &holder.next_step_id {
            queue.push(next.clone());
        }
        if let FlowStep::If(if_step) = &holder.step {
            for branch in &if_step.branches {
                if let Some(step) = &branch.step {
                    queue.push(step.clone());
                }
            }
            if let Some(else_step) = &if_step.else_step {
                queue.push(else_step.clone());
            }
        }
    }

    def.steps.retain(|id, _| reachable.contains(id));
}
