use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::partition::Partition;
use crate::rules::{CompiledRules, RuleContext};
use crate::schema::{FieldSchema, FieldType, RuleAction, Schema};

use super::control::{FieldControl, FormEvent, ParentState, UiState};
use super::defaults;
use super::validators::{self, CustomCheck, ValidationIssue, Validator};

/// The component discriminator key on the wire.
pub const DISCRIMINATOR: &str = "schemaId";

/// Everything node construction and mutation needs from the tree.
#[derive(Clone, Copy)]
pub struct FormScope<'a> {
    pub schemas: &'a AHashMap<String, Arc<Schema>>,
    pub remote: Option<&'a CustomCheck>,
    pub now: DateTime<Utc>,
}

/// Inputs of one derived-state pass.
pub struct PassContext<'a> {
    pub data: &'a Value,
    pub context: &'a RuleContext,
    pub scope: FormScope<'a>,
}

/// A form node for one field at one partition.
#[derive(Debug)]
pub enum FieldNode {
    Value(FieldValueForm),
    Array(FieldArrayForm),
    Component(ComponentForm),
}

impl FieldNode {
    pub fn field(&self) -> &Arc<FieldSchema> {
        match self {
            FieldNode::Value(form) => &form.field,
            FieldNode::Array(form) => &form.field,
            FieldNode::Component(form) => &form.field,
        }
    }

    pub fn state(&self) -> UiState {
        match self {
            FieldNode::Value(form) => form.control.state(),
            FieldNode::Array(form) => form.state,
            FieldNode::Component(form) => form.state,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.state().hidden
    }

    pub fn value(&self) -> Option<Value> {
        match self {
            FieldNode::Value(form) => form.control.value().cloned(),
            FieldNode::Array(form) => form.value(),
            FieldNode::Component(form) => form.value(),
        }
    }

    pub fn control(&self) -> Option<&FieldControl> {
        match self {
            FieldNode::Value(form) => Some(&form.control),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&FieldArrayForm> {
        match self {
            FieldNode::Array(form) => Some(form),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut FieldArrayForm> {
        match self {
            FieldNode::Array(form) => Some(form),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&ComponentForm> {
        match self {
            FieldNode::Component(form) => Some(form),
            _ => None,
        }
    }

    /// Walks the remaining path segments: array indexes for array
    /// nodes, field names for object/component bodies.
    pub fn resolve(&self, segments: &[&str]) -> Option<&FieldNode> {
        let Some((head, rest)) = segments.split_first() else {
            return Some(self);
        };
        match self {
            FieldNode::Value(_) => None,
            FieldNode::Array(form) => {
                let index: usize = head.parse().ok()?;
                form.items.get(index)?.resolve(rest)
            }
            FieldNode::Component(form) => form
                .fields
                .iter()
                .find(|c| c.field.name == *head)?
                .node
                .resolve(rest),
        }
    }

    pub fn resolve_mut(&mut self, segments: &[&str]) -> Option<&mut FieldNode> {
        let Some((head, rest)) = segments.split_first() else {
            return Some(self);
        };
        match self {
            FieldNode::Value(_) => None,
            FieldNode::Array(form) => {
                let index: usize = head.parse().ok()?;
                form.items.get_mut(index)?.resolve_mut(rest)
            }
            FieldNode::Component(form) => {
                let child = form.fields.iter_mut().find(|c| c.field.name == *head)?;
                child.node.resolve_mut(rest)
            }
        }
    }

    pub fn set_value(&mut self, value: Option<Value>, scope: &FormScope, events: &mut Vec<FormEvent>) {
        match self {
            FieldNode::Value(form) => {
                form.control.set_value(value);
                events.push(FormEvent::ValueChanged {
                    path: form.control.path().to_string(),
                });
            }
            FieldNode::Array(form) => form.set_value(value, scope, events),
            FieldNode::Component(form) => form.set_value(value, scope, events),
        }
    }

    pub fn update_state(
        &mut self,
        ctx: &PassContext,
        rules: &CompiledRules,
        item_data: Option<&Value>,
        parent: ParentState,
        events: &mut Vec<FormEvent>,
    ) {
        match self {
            FieldNode::Value(form) => form.update_state(ctx, rules, item_data, parent, events),
            FieldNode::Array(form) => form.update_state(ctx, rules, item_data, parent, events),
            FieldNode::Component(form) => form.update_state(ctx, rules, item_data, parent, events),
        }
    }

    pub fn errors(&self) -> Vec<(String, ValidationIssue)> {
        match self {
            FieldNode::Value(form) => {
                let path = form.control.path().to_string();
                form.control.errors().into_iter().map(|e| (path.clone(), e)).collect()
            }
            FieldNode::Array(form) => form.errors(),
            FieldNode::Component(form) => form.errors(),
        }
    }

    fn set_path(&mut self, path: String) {
        match self {
            FieldNode::Value(form) => form.set_path(path),
            FieldNode::Array(form) => form.set_path(path),
            FieldNode::Component(form) => form.set_path(path),
        }
    }
}

/// Builds the node for one field at one partition, seeded with the
/// field's default value.
pub(crate) fn build_node(
    field: &Arc<FieldSchema>,
    partition: &Partition,
    path: String,
    rule_path: String,
    rules: &Arc<CompiledRules>,
    scope: &FormScope,
) -> FieldNode {
    match &field.field_type {
        FieldType::Array { .. } | FieldType::Components { .. } => {
            let mut form = FieldArrayForm::new(field, partition, path, rule_path, rules);
            let default = defaults::value_for(field, &partition.key, scope.now);
            form.set_value(default, scope, &mut Vec::new());
            FieldNode::Array(form)
        }
        FieldType::Component { .. } => {
            let mut form = ComponentForm::new(field, partition, path, rule_path, rules);
            if let Some(default) = defaults::value_for(field, &partition.key, scope.now) {
                form.set_value(Some(default), scope, &mut Vec::new());
            }
            FieldNode::Component(form)
        }
        _ => {
            let state = initial_state(field, partition);
            let validators =
                validators::for_field(field, state.required, partition.is_optional, scope.remote);
            let value = defaults::value_for(field, &partition.key, scope.now);
            let control = FieldControl::new(path, value, validators).with_state(state);
            FieldNode::Value(FieldValueForm {
                field: field.clone(),
                partition: partition.clone(),
                rule_path,
                control,
            })
        }
    }
}

fn initial_state(field: &FieldSchema, partition: &Partition) -> UiState {
    UiState {
        hidden: false,
        disabled: field.is_disabled,
        required: field.properties.is_required && !partition.is_optional,
    }
}

/// Shared flip-aware state application for container nodes.
fn apply_container_state(
    path: &str,
    current: &mut UiState,
    state: UiState,
    events: &mut Vec<FormEvent>,
) -> bool {
    if state.hidden != current.hidden {
        events.push(FormEvent::HiddenChanged {
            path: path.to_string(),
            hidden: state.hidden,
        });
    }
    if state.disabled != current.disabled {
        events.push(FormEvent::EnabledChanged {
            path: path.to_string(),
            enabled: !state.disabled,
        });
    }
    let required_flipped = state.required != current.required;
    *current = state;
    required_flipped
}

/// Computes a node's derived state: schema + parent baseline, then every
/// matching rule in declaration order. Rules are cumulative; a forced
/// flag is never demoted within one pass.
fn derive_state(
    ctx: &PassContext,
    rules: &CompiledRules,
    field: &FieldSchema,
    partition: &Partition,
    rule_path: &str,
    item_data: Option<&Value>,
    parent: ParentState,
) -> UiState {
    let mut state = UiState {
        disabled: field.is_disabled || parent.is_disabled,
        hidden: parent.is_hidden,
        required: field.properties.is_required && !partition.is_optional,
    };

    for rule in rules.rules_for(rule_path, &field.properties.tags) {
        if !rule.eval(ctx.context, ctx.data, item_data) {
            continue;
        }
        match rule.action() {
            RuleAction::Disable => state.disabled = true,
            RuleAction::Hide => state.hidden = true,
            _ => state.required = true,
        }
    }

    state
}

/// A leaf node wrapping one typed control.
#[derive(Debug)]
pub struct FieldValueForm {
    pub field: Arc<FieldSchema>,
    pub partition: Partition,
    rule_path: String,
    pub control: FieldControl,
}

impl FieldValueForm {
    fn update_state(
        &mut self,
        ctx: &PassContext,
        rules: &CompiledRules,
        item_data: Option<&Value>,
        parent: ParentState,
        events: &mut Vec<FormEvent>,
    ) {
        let state = derive_state(
            ctx,
            rules,
            &self.field,
            &self.partition,
            &self.rule_path,
            item_data,
            parent,
        );
        let required_flipped = self.control.apply_state(state, events);
        if required_flipped {
            // Validators are rebuilt only on an actual flip to avoid
            // churn; all type-specific validators are preserved.
            self.control.set_validators(validators::for_field(
                &self.field,
                state.required,
                self.partition.is_optional,
                ctx.scope.remote,
            ));
        }
    }

    fn set_path(&mut self, path: String) {
        self.control.set_path(path);
    }
}

/// One item of an array or components field.
#[derive(Debug)]
pub enum ArrayItem {
    Object(ObjectForm),
    Component(ComponentForm),
}

impl ArrayItem {
    pub fn value(&self) -> Option<Value> {
        match self {
            ArrayItem::Object(form) => Some(form.value()),
            ArrayItem::Component(form) => form.value(),
        }
    }

    pub fn as_object(&self) -> Option<&ObjectForm> {
        match self {
            ArrayItem::Object(form) => Some(form),
            _ => None,
        }
    }

    fn resolve(&self, segments: &[&str]) -> Option<&FieldNode> {
        let Some((head, rest)) = segments.split_first() else {
            return None;
        };
        match self {
            ArrayItem::Object(form) => form
                .fields
                .iter()
                .find(|c| c.field.name == *head)?
                .node
                .resolve(rest),
            ArrayItem::Component(form) => form
                .fields
                .iter()
                .find(|c| c.field.name == *head)?
                .node
                .resolve(rest),
        }
    }

    fn resolve_mut(&mut self, segments: &[&str]) -> Option<&mut FieldNode> {
        let Some((head, rest)) = segments.split_first() else {
            return None;
        };
        let fields = match self {
            ArrayItem::Object(form) => &mut form.fields,
            ArrayItem::Component(form) => &mut form.fields,
        };
        let child = fields.iter_mut().find(|c| c.field.name == *head)?;
        child.node.resolve_mut(rest)
    }

    fn update_state(
        &mut self,
        ctx: &PassContext,
        rules: &CompiledRules,
        parent: ParentState,
        events: &mut Vec<FormEvent>,
    ) {
        match self {
            ArrayItem::Object(form) => form.update_state(ctx, rules, parent, events),
            ArrayItem::Component(form) => {
                let item_data = form.value();
                form.update_state(ctx, rules, item_data.as_ref(), parent, events);
            }
        }
    }

    fn errors(&self) -> Vec<(String, ValidationIssue)> {
        match self {
            ArrayItem::Object(form) => form.errors(),
            ArrayItem::Component(form) => form.errors(),
        }
    }

    fn set_path(&mut self, path: String) {
        match self {
            ArrayItem::Object(form) => form.set_path(path),
            ArrayItem::Component(form) => form.set_path(path),
        }
    }
}

/// A nested field inside an item or component body.
#[derive(Debug)]
pub struct ChildField {
    pub field: Arc<FieldSchema>,
    pub node: FieldNode,
}

/// The object body of one array item.
#[derive(Debug)]
pub struct ObjectForm {
    path: String,
    partition: Partition,
    pub state: UiState,
    pub fields: Vec<ChildField>,
}

impl ObjectForm {
    fn build(
        item_fields: &[FieldSchema],
        partition: &Partition,
        path: String,
        rule_path: String,
        rules: &Arc<CompiledRules>,
        scope: &FormScope,
    ) -> Self {
        let fields = item_fields
            .iter()
            .map(|f| {
                let field = Arc::new(f.clone());
                let child_path = format!("{}.{}", path, f.name);
                let child_rule_path = format!("{}.{}", rule_path, f.name);
                let node = build_node(&field, partition, child_path, child_rule_path, rules, scope);
                ChildField { field, node }
            })
            .collect();
        Self {
            path,
            partition: partition.clone(),
            state: UiState::default(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|c| c.field.name == name).map(|c| &c.node)
    }

    pub fn value(&self) -> Value {
        let mut object = Map::new();
        for child in &self.fields {
            if let Some(value) = child.node.value() {
                object.insert(child.field.name.clone(), value);
            }
        }
        Value::Object(object)
    }

    /// Sets provided keys; keys the value omits reset to their schema
    /// defaults, so a loaded item behaves like a freshly created one.
    fn load(&mut self, value: &Value, scope: &FormScope, events: &mut Vec<FormEvent>) {
        for child in &mut self.fields {
            let next = value
                .get(&child.field.name)
                .cloned()
                .or_else(|| defaults::value_for(&child.field, &self.partition.key, scope.now));
            child.node.set_value(next, scope, events);
        }
    }

    fn update_state(
        &mut self,
        ctx: &PassContext,
        rules: &CompiledRules,
        parent: ParentState,
        events: &mut Vec<FormEvent>,
    ) {
        // Items are not rule targets themselves; they relay the parent
        // state and scope their children to the item's local data.
        let state = UiState {
            hidden: parent.is_hidden,
            disabled: parent.is_disabled,
            required: false,
        };
        apply_container_state(&self.path, &mut self.state, state, events);

        let item_data = self.value();
        let child_parent = ParentState {
            is_disabled: state.disabled,
            is_hidden: state.hidden,
        };
        for child in &mut self.fields {
            child
                .node
                .update_state(ctx, rules, Some(&item_data), child_parent, events);
        }
    }

    fn errors(&self) -> Vec<(String, ValidationIssue)> {
        self.fields.iter().flat_map(|c| c.node.errors()).collect()
    }

    fn set_path(&mut self, path: String) {
        for child in &mut self.fields {
            child.node.set_path(format!("{}.{}", path, child.field.name));
        }
        self.path = path;
    }
}

/// An Array or Components container. The live `items` collection and
/// the underlying value are kept in lockstep: the value is derived from
/// the items, so no intermediate mismatch is observable.
#[derive(Debug)]
pub struct FieldArrayForm {
    pub field: Arc<FieldSchema>,
    pub partition: Partition,
    path: String,
    rule_path: String,
    pub state: UiState,
    present: bool,
    items: Vec<ArrayItem>,
    validators: Vec<Validator>,
    rules: Arc<CompiledRules>,
}

impl FieldArrayForm {
    fn new(
        field: &Arc<FieldSchema>,
        partition: &Partition,
        path: String,
        rule_path: String,
        rules: &Arc<CompiledRules>,
    ) -> Self {
        let state = initial_state(field, partition);
        let validators = validators::for_field(field, state.required, partition.is_optional, None);
        Self {
            field: field.clone(),
            partition: partition.clone(),
            path,
            rule_path,
            state,
            present: false,
            items: Vec::new(),
            validators,
            rules: rules.clone(),
        }
    }

    pub fn items(&self) -> &[ArrayItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// The derived value: `None` when unset, otherwise the item values.
    pub fn value(&self) -> Option<Value> {
        if !self.present {
            return None;
        }
        let items = self
            .items
            .iter()
            .map(|item| item.value().unwrap_or(Value::Null))
            .collect();
        Some(Value::Array(items))
    }

    fn nested_fields(&self) -> &[FieldSchema] {
        match &self.field.field_type {
            FieldType::Array { fields } => fields,
            _ => &[],
        }
    }

    fn is_components(&self) -> bool {
        matches!(self.field.field_type, FieldType::Components { .. })
    }

    fn build_item(&self, index: usize, scope: &FormScope) -> ArrayItem {
        let path = format!("{}.{}", self.path, index);
        if self.is_components() {
            ArrayItem::Component(ComponentForm::new(
                &self.field,
                &self.partition,
                path,
                self.rule_path.clone(),
                &self.rules,
            ))
        } else {
            ArrayItem::Object(ObjectForm::build(
                self.nested_fields(),
                &self.partition,
                path,
                self.rule_path.clone(),
                &self.rules,
                scope,
            ))
        }
    }

    /// Appends an item carrying schema defaults.
    pub fn add_item(&mut self, scope: &FormScope, events: &mut Vec<FormEvent>) {
        let item = self.build_item(self.items.len(), scope);
        self.present = true;
        self.items.push(item);
        events.push(FormEvent::StructureChanged { path: self.path.clone() });
    }

    /// Appends a clone of another item's current value.
    pub fn add_copy(&mut self, source: usize, scope: &FormScope, events: &mut Vec<FormEvent>) -> bool {
        let Some(value) = self.items.get(source).and_then(|i| i.value()) else {
            return false;
        };
        let mut item = self.build_item(self.items.len(), scope);
        load_item(&mut item, &value, scope, events);
        self.present = true;
        self.items.push(item);
        events.push(FormEvent::StructureChanged { path: self.path.clone() });
        true
    }

    /// Appends a component item pre-seeded with the discriminator.
    pub fn add_component(&mut self, schema_id: &str, scope: &FormScope, events: &mut Vec<FormEvent>) {
        let mut item = self.build_item(self.items.len(), scope);
        load_item(&mut item, &json!({ DISCRIMINATOR: schema_id }), scope, events);
        self.present = true;
        self.items.push(item);
        events.push(FormEvent::StructureChanged { path: self.path.clone() });
    }

    pub fn remove_item_at(&mut self, index: usize, events: &mut Vec<FormEvent>) -> bool {
        if index >= self.items.len() {
            return false;
        }
        self.items.remove(index);
        self.renumber();
        events.push(FormEvent::StructureChanged { path: self.path.clone() });
        true
    }

    /// Reorders one item to a new position, keeping the rest stable.
    pub fn move_item(&mut self, from: usize, to: usize, events: &mut Vec<FormEvent>) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        self.renumber();
        events.push(FormEvent::StructureChanged { path: self.path.clone() });
        true
    }

    /// Reorders all items by the given permutation of current indexes.
    pub fn sort(&mut self, order: &[usize], events: &mut Vec<FormEvent>) -> bool {
        if order.len() != self.items.len() {
            return false;
        }
        let mut seen = vec![false; self.items.len()];
        for &index in order {
            if index >= self.items.len() || seen[index] {
                return false;
            }
            seen[index] = true;
        }
        let mut old: Vec<Option<ArrayItem>> = self.items.drain(..).map(Some).collect();
        for &index in order {
            if let Some(item) = old[index].take() {
                self.items.push(item);
            }
        }
        self.renumber();
        events.push(FormEvent::StructureChanged { path: self.path.clone() });
        true
    }

    /// `None` unsets the value entirely; an array value rebuilds the
    /// items. Both leave `items` and the value consistent atomically.
    fn set_value(&mut self, value: Option<Value>, scope: &FormScope, events: &mut Vec<FormEvent>) {
        match value {
            None => {
                self.present = false;
                self.items.clear();
            }
            Some(Value::Array(values)) => {
                self.present = true;
                self.items.clear();
                for (index, value) in values.iter().enumerate() {
                    let mut item = self.build_item(index, scope);
                    load_item(&mut item, value, scope, &mut Vec::new());
                    self.items.push(item);
                }
            }
            Some(_) => {
                self.present = true;
                self.items.clear();
            }
        }
        events.push(FormEvent::ValueChanged { path: self.path.clone() });
        events.push(FormEvent::StructureChanged { path: self.path.clone() });
    }

    fn renumber(&mut self) {
        for (index, item) in self.items.iter_mut().enumerate() {
            item.set_path(format!("{}.{}", self.path, index));
        }
    }

    fn update_state(
        &mut self,
        ctx: &PassContext,
        rules: &CompiledRules,
        item_data: Option<&Value>,
        parent: ParentState,
        events: &mut Vec<FormEvent>,
    ) {
        let state = derive_state(
            ctx,
            rules,
            &self.field,
            &self.partition,
            &self.rule_path,
            item_data,
            parent,
        );
        let required_flipped = apply_container_state(&self.path, &mut self.state, state, events);
        if required_flipped {
            self.validators =
                validators::for_field(&self.field, state.required, self.partition.is_optional, None);
        }

        let child_parent = ParentState {
            is_disabled: state.disabled,
            is_hidden: state.hidden,
        };
        for item in &mut self.items {
            item.update_state(ctx, rules, child_parent, events);
        }
    }

    pub fn errors(&self) -> Vec<(String, ValidationIssue)> {
        if self.state.hidden || self.state.disabled {
            return Vec::new();
        }
        let value = self.value();
        let mut errors: Vec<(String, ValidationIssue)> = validators::validate(value.as_ref(), &self.validators)
            .into_iter()
            .map(|e| (self.path.clone(), e))
            .collect();
        for item in &self.items {
            errors.extend(item.errors());
        }
        errors
    }

    fn set_path(&mut self, path: String) {
        self.path = path;
        self.renumber();
    }
}

fn load_item(item: &mut ArrayItem, value: &Value, scope: &FormScope, events: &mut Vec<FormEvent>) {
    match item {
        ArrayItem::Object(form) => form.load(value, scope, events),
        ArrayItem::Component(form) => form.set_value(Some(value.clone()), scope, events),
    }
}

/// A component node: an object discriminated by a component-schema id.
/// Changing the discriminator tears the child-field set down and
/// rebuilds it from the newly referenced schema; an unknown id yields
/// an empty, childless object.
#[derive(Debug)]
pub struct ComponentForm {
    pub field: Arc<FieldSchema>,
    pub partition: Partition,
    path: String,
    rule_path: String,
    pub state: UiState,
    present: bool,
    schema: Option<Arc<Schema>>,
    pub fields: Vec<ChildField>,
    /// The scope this component's children are matched against.
    rules: Arc<CompiledRules>,
    parent_rules: Arc<CompiledRules>,
}

impl ComponentForm {
    fn new(
        field: &Arc<FieldSchema>,
        partition: &Partition,
        path: String,
        rule_path: String,
        parent_rules: &Arc<CompiledRules>,
    ) -> Self {
        Self {
            field: field.clone(),
            partition: partition.clone(),
            path,
            rule_path,
            state: initial_state(field, partition),
            present: false,
            schema: None,
            fields: Vec::new(),
            rules: Arc::new(CompiledRules::default()),
            parent_rules: parent_rules.clone(),
        }
    }

    pub fn schema_id(&self) -> Option<&str> {
        self.schema.as_ref().map(|s| s.id.as_str())
    }

    pub fn field_node(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|c| c.field.name == name).map(|c| &c.node)
    }

    pub fn value(&self) -> Option<Value> {
        if !self.present {
            return None;
        }
        let mut object = Map::new();
        if let Some(schema) = &self.schema {
            object.insert(DISCRIMINATOR.to_string(), json!(schema.id));
            for child in &self.fields {
                if let Some(value) = child.node.value() {
                    object.insert(child.field.name.clone(), value);
                }
            }
        }
        Some(Value::Object(object))
    }

    fn set_value(&mut self, value: Option<Value>, scope: &FormScope, events: &mut Vec<FormEvent>) {
        match value {
            None => {
                self.present = false;
                self.schema = None;
                self.fields.clear();
            }
            Some(Value::Object(object)) => {
                self.present = true;
                let next_id = object.get(DISCRIMINATOR).and_then(|v| v.as_str());
                if next_id != self.schema_id() {
                    self.materialize(next_id, scope);
                    events.push(FormEvent::StructureChanged { path: self.path.clone() });
                }
                let value = Value::Object(object);
                for child in &mut self.fields {
                    let next = value
                        .get(&child.field.name)
                        .cloned()
                        .or_else(|| {
                            defaults::value_for(&child.field, &self.partition.key, scope.now)
                        });
                    child.node.set_value(next, scope, events);
                }
            }
            Some(_) => {
                self.present = true;
                self.schema = None;
                self.fields.clear();
            }
        }
        events.push(FormEvent::ValueChanged { path: self.path.clone() });
    }

    /// Rebuilds the child-field set for a new discriminator. The rule
    /// scope is recompiled at the same time: parent rules targeting this
    /// component are re-rooted to relative paths and merged with the
    /// component schema's own rules.
    fn materialize(&mut self, schema_id: Option<&str>, scope: &FormScope) {
        self.fields.clear();
        self.schema = schema_id.and_then(|id| scope.schemas.get(id)).cloned();

        let Some(schema) = self.schema.clone() else {
            self.rules = Arc::new(CompiledRules::default());
            return;
        };

        self.rules = Arc::new(
            self.parent_rules
                .scoped_to_component(&self.rule_path, &schema),
        );

        for f in &schema.fields {
            if !f.field_type.is_content() {
                continue;
            }
            let field = Arc::new(f.clone());
            let child_path = format!("{}.{}", self.path, f.name);
            // Paths inside a component scope are relative to the body.
            let node = build_node(
                &field,
                &self.partition,
                child_path,
                f.name.clone(),
                &self.rules,
                scope,
            );
            self.fields.push(ChildField { field, node });
        }
    }

    fn update_state(
        &mut self,
        ctx: &PassContext,
        rules: &CompiledRules,
        item_data: Option<&Value>,
        parent: ParentState,
        events: &mut Vec<FormEvent>,
    ) {
        let state = derive_state(
            ctx,
            rules,
            &self.field,
            &self.partition,
            &self.rule_path,
            item_data,
            parent,
        );
        apply_container_state(&self.path, &mut self.state, state, events);

        let own_value = self.value();
        let child_parent = ParentState {
            is_disabled: state.disabled,
            is_hidden: state.hidden,
        };
        let child_rules = self.rules.clone();
        for child in &mut self.fields {
            child
                .node
                .update_state(ctx, &child_rules, own_value.as_ref(), child_parent, events);
        }
    }

    fn errors(&self) -> Vec<(String, ValidationIssue)> {
        if self.state.hidden || self.state.disabled {
            return Vec::new();
        }
        self.fields.iter().flat_map(|c| c.node.errors()).collect()
    }

    fn set_path(&mut self, path: String) {
        for child in &mut self.fields {
            child.node.set_path(format!("{}.{}", path, child.field.name));
        }
        self.path = path;
    }
}

/// The partition aggregator for one top-level field: one child node per
/// partition the field carries values for.
#[derive(Debug)]
pub struct FieldForm {
    pub field: Arc<FieldSchema>,
    rule_path: String,
    pub state: UiState,
    partitions: Vec<(Partition, FieldNode)>,
}

impl FieldForm {
    pub(crate) fn build(
        field: &Arc<FieldSchema>,
        partitions: Vec<Partition>,
        rules: &Arc<CompiledRules>,
        scope: &FormScope,
    ) -> Self {
        let rule_path = field.name.clone();
        let nodes = partitions
            .into_iter()
            .map(|partition| {
                let path = format!("{}.{}", field.name, partition.key);
                let node = build_node(field, &partition, path.clone(), path, rules, scope);
                (partition, node)
            })
            .collect();
        Self {
            field: field.clone(),
            rule_path,
            state: UiState {
                hidden: false,
                disabled: field.is_disabled,
                required: field.properties.is_required,
            },
            partitions: nodes,
        }
    }

    pub fn name(&self) -> &str {
        &self.field.name
    }

    pub fn is_hidden(&self) -> bool {
        self.state.hidden
    }

    pub fn partitions(&self) -> impl Iterator<Item = (&Partition, &FieldNode)> {
        self.partitions.iter().map(|(p, n)| (p, n))
    }

    pub fn partition(&self, key: &str) -> Option<&FieldNode> {
        self.partitions.iter().find(|(p, _)| p.key == key).map(|(_, n)| n)
    }

    pub fn partition_mut(&mut self, key: &str) -> Option<&mut FieldNode> {
        self.partitions
            .iter_mut()
            .find(|(p, _)| p.key == key)
            .map(|(_, n)| n)
    }

    /// The field's slice of the flattened wire value.
    pub fn value(&self) -> Option<Value> {
        let mut object = Map::new();
        for (partition, node) in &self.partitions {
            if let Some(value) = node.value() {
                object.insert(partition.key.clone(), value);
            }
        }
        if object.is_empty() {
            None
        } else {
            Some(Value::Object(object))
        }
    }

    pub(crate) fn load(&mut self, value: Option<&Value>, scope: &FormScope, events: &mut Vec<FormEvent>) {
        for (partition, node) in &mut self.partitions {
            let next = value.and_then(|v| v.get(&partition.key)).cloned();
            node.set_value(next, scope, events);
        }
    }

    pub(crate) fn update_state(
        &mut self,
        ctx: &PassContext,
        rules: &CompiledRules,
        events: &mut Vec<FormEvent>,
    ) {
        let invariant = Partition::invariant();
        let state = derive_state(ctx, rules, &self.field, &invariant, &self.rule_path, None, ParentState::default());
        apply_container_state(&self.rule_path, &mut self.state, state, events);

        let child_parent = ParentState {
            is_disabled: state.disabled,
            is_hidden: state.hidden,
        };
        for (_, node) in &mut self.partitions {
            node.update_state(ctx, rules, None, child_parent, events);
        }
    }

    pub fn errors(&self) -> Vec<(String, ValidationIssue)> {
        self.partitions.iter().flat_map(|(_, n)| n.errors()).collect()
    }
}
