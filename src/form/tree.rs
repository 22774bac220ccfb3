use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::partition::PartitionSet;
use crate::rules::{CompiledRules, RuleContext};
use crate::schema::{FieldSchema, Language, Schema};

use super::control::{FieldControl, FormEvent};
use super::node::{FieldArrayForm, FieldForm, FieldNode, FormScope, PassContext};
use super::validators::{CustomCheck, ValidationIssue};

/// Coalesces rapid value edits into one derived-state recomputation.
/// Purely cooperative: the embedder drives it through `tick`.
#[derive(Debug)]
pub struct Debounce {
    interval: Duration,
    pending_since: Option<Instant>,
}

impl Debounce {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending_since: None,
        }
    }

    /// Records a change. The window starts at the first mark and is not
    /// extended by later ones, so a burst settles after one interval.
    pub fn mark(&mut self, now: Instant) {
        self.pending_since.get_or_insert(now);
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    pub fn ready(&self, now: Instant) -> bool {
        self.pending_since
            .is_some_and(|since| now.duration_since(since) >= self.interval)
    }

    pub fn clear(&mut self) {
        self.pending_since = None;
    }
}

/// Construction options for a form tree.
pub struct FormOptions {
    pub debounce: Duration,
    pub remote_check: Option<CustomCheck>,
    pub clock: fn() -> DateTime<Utc>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            remote_check: None,
            clock: Utc::now,
        }
    }
}

/// A visual grouping of top-level fields, split at UI separator fields.
#[derive(Debug)]
pub struct FormSection {
    pub separator: Option<Arc<FieldSchema>>,
    pub fields: Vec<String>,
    /// A section hides only when every member field is hidden.
    pub hidden: bool,
}

/// The root aggregate: one [`FieldForm`] per top-level content field,
/// sections, dirty tracking against a snapshot, and the debounced
/// derived-state pass.
pub struct ContentFormTree {
    partitions: PartitionSet,
    schema: Arc<Schema>,
    schemas: AHashMap<String, Arc<Schema>>,
    rules: Arc<CompiledRules>,
    fields: Vec<FieldForm>,
    sections: Vec<FormSection>,
    context: RuleContext,
    initial_data: Value,
    last_pass_data: Option<Value>,
    debounce: Debounce,
    events: Vec<FormEvent>,
    remote_check: Option<CustomCheck>,
    submitting: bool,
    clock: fn() -> DateTime<Utc>,
}

impl ContentFormTree {
    pub fn new(
        languages: Vec<Language>,
        schema: Schema,
        component_schemas: impl IntoIterator<Item = Schema>,
        context: RuleContext,
        options: FormOptions,
    ) -> Self {
        let partitions = PartitionSet::new(languages);
        let schema = Arc::new(schema);
        let schemas: AHashMap<String, Arc<Schema>> = component_schemas
            .into_iter()
            .map(|s| (s.id.clone(), Arc::new(s)))
            .collect();
        let rules = Arc::new(CompiledRules::compile(&schema));

        let scope = FormScope {
            schemas: &schemas,
            remote: options.remote_check.as_ref(),
            now: (options.clock)(),
        };

        let mut fields = Vec::new();
        let mut sections: Vec<FormSection> = vec![FormSection {
            separator: None,
            fields: Vec::new(),
            hidden: false,
        }];

        for f in &schema.fields {
            let field = Arc::new(f.clone());
            if !field.field_type.is_content() {
                sections.push(FormSection {
                    separator: Some(field),
                    fields: Vec::new(),
                    hidden: false,
                });
                continue;
            }
            if let Some(section) = sections.last_mut() {
                section.fields.push(field.name.clone());
            }
            fields.push(FieldForm::build(
                &field,
                partitions.all_for(&field),
                &rules,
                &scope,
            ));
        }

        let mut tree = Self {
            partitions,
            schema,
            schemas,
            rules,
            fields,
            sections,
            context,
            initial_data: Value::Object(Map::new()),
            last_pass_data: None,
            debounce: Debounce::new(options.debounce),
            events: Vec::new(),
            remote_check: options.remote_check,
            submitting: false,
            clock: options.clock,
        };
        tree.initial_data = tree.value();
        tree.run_state_pass(true);
        tree
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn sections(&self) -> &[FormSection] {
        &self.sections
    }

    pub fn fields(&self) -> &[FieldForm] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldForm> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldForm> {
        self.fields.iter_mut().find(|f| f.name() == name)
    }

    /// Resolves a dotted form path: field, partition key, then array
    /// indexes and nested field names.
    pub fn resolve(&self, path: &str) -> Option<&FieldNode> {
        let segments: Vec<&str> = path.split('.').collect();
        let (field, rest) = segments.split_first()?;
        let (partition, rest) = rest.split_first()?;
        self.field(field)?.partition(partition)?.resolve(rest)
    }

    fn resolve_mut_fields<'a>(
        fields: &'a mut [FieldForm],
        path: &str,
    ) -> Option<&'a mut FieldNode> {
        let segments: Vec<&str> = path.split('.').collect();
        let (field, rest) = segments.split_first()?;
        let (partition, rest) = rest.split_first()?;
        fields
            .iter_mut()
            .find(|f| f.name() == *field)?
            .partition_mut(partition)?
            .resolve_mut(rest)
    }

    pub fn control(&self, path: &str) -> Option<&FieldControl> {
        self.resolve(path)?.control()
    }

    /// The flattened wire value: `{ field: { partition: value } }`.
    pub fn value(&self) -> Value {
        let mut object = Map::new();
        for field in &self.fields {
            if let Some(value) = field.value() {
                object.insert(field.name().to_string(), value);
            }
        }
        Value::Object(object)
    }

    /// True iff the current value differs from the snapshot taken at
    /// construction, the last initial `load`, or the last completed
    /// submit. Key order never matters: values compare structurally.
    pub fn has_changed(&self) -> bool {
        self.value() != self.initial_data
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn submit(&mut self) {
        self.submitting = true;
    }

    /// A completed save re-baselines the change snapshot.
    pub fn submit_completed(&mut self) {
        self.submitting = false;
        self.initial_data = self.value();
    }

    pub fn submit_failed(&mut self) {
        self.submitting = false;
    }

    /// Replaces all values from a wire-shaped object. With `is_initial`
    /// the snapshot is re-baselined. Runs the derived-state pass
    /// immediately; loading is not a keystroke.
    pub fn load(&mut self, value: &Value, is_initial: bool) {
        let scope = FormScope {
            schemas: &self.schemas,
            remote: self.remote_check.as_ref(),
            now: (self.clock)(),
        };
        for field in &mut self.fields {
            let slice = value.get(field.name());
            field.load(slice, &scope, &mut self.events);
        }
        if is_initial {
            self.initial_data = self.value();
        }
        self.debounce.clear();
        self.run_state_pass(true);
    }

    /// Swaps the ambient rule context (e.g. the current user) and
    /// re-runs the derived-state pass without touching values.
    pub fn set_context(&mut self, context: RuleContext) {
        self.context = context;
        self.run_state_pass(true);
    }

    /// Sets a leaf or container value through a dotted path. The
    /// derived-state recomputation is debounced; call [`tick`] from the
    /// embedder's loop, or [`flush`] to force it.
    ///
    /// [`tick`]: Self::tick
    /// [`flush`]: Self::flush
    pub fn set_value(&mut self, path: &str, value: Option<Value>) -> bool {
        let scope = FormScope {
            schemas: &self.schemas,
            remote: self.remote_check.as_ref(),
            now: (self.clock)(),
        };
        let Some(node) = Self::resolve_mut_fields(&mut self.fields, path) else {
            return false;
        };
        node.set_value(value, &scope, &mut self.events);
        self.debounce.mark(Instant::now());
        true
    }

    fn with_array<R>(
        &mut self,
        path: &str,
        op: impl FnOnce(&mut FieldArrayForm, &FormScope, &mut Vec<FormEvent>) -> R,
    ) -> Option<R> {
        let scope = FormScope {
            schemas: &self.schemas,
            remote: self.remote_check.as_ref(),
            now: (self.clock)(),
        };
        let node = Self::resolve_mut_fields(&mut self.fields, path)?;
        let array = node.as_array_mut()?;
        let result = op(array, &scope, &mut self.events);
        self.debounce.mark(Instant::now());
        Some(result)
    }

    /// Appends a default item to the array at `path`.
    pub fn add_array_item(&mut self, path: &str) -> bool {
        self.with_array(path, |array, scope, events| {
            array.add_item(scope, events);
            true
        })
        .unwrap_or(false)
    }

    /// Appends a clone of the item at `source`.
    pub fn add_array_copy(&mut self, path: &str, source: usize) -> bool {
        self.with_array(path, |array, scope, events| array.add_copy(source, scope, events))
            .unwrap_or(false)
    }

    /// Appends a component item pre-seeded with the discriminator.
    pub fn add_array_component(&mut self, path: &str, schema_id: &str) -> bool {
        self.with_array(path, |array, scope, events| {
            array.add_component(schema_id, scope, events);
            true
        })
        .unwrap_or(false)
    }

    pub fn remove_array_item(&mut self, path: &str, index: usize) -> bool {
        self.with_array(path, |array, _, events| array.remove_item_at(index, events))
            .unwrap_or(false)
    }

    pub fn move_array_item(&mut self, path: &str, from: usize, to: usize) -> bool {
        self.with_array(path, |array, _, events| array.move_item(from, to, events))
            .unwrap_or(false)
    }

    pub fn sort_array_items(&mut self, path: &str, order: &[usize]) -> bool {
        self.with_array(path, |array, _, events| array.sort(order, events))
            .unwrap_or(false)
    }

    /// Runs the derived-state pass if the debounce window has elapsed.
    pub fn tick(&mut self) {
        if self.debounce.ready(Instant::now()) {
            self.flush();
        }
    }

    /// Forces the derived-state pass now.
    pub fn flush(&mut self) {
        self.debounce.clear();
        self.run_state_pass(false);
    }

    /// One derived-state pass over every live node. Skipped when the
    /// flattened value is deep-equal to the previous pass input, unless
    /// forced (context swaps change state without changing values).
    fn run_state_pass(&mut self, force: bool) {
        let data = self.value();
        if !force && self.last_pass_data.as_ref() == Some(&data) {
            return;
        }

        let rules = self.rules.clone();
        let ctx = PassContext {
            data: &data,
            context: &self.context,
            scope: FormScope {
                schemas: &self.schemas,
                remote: self.remote_check.as_ref(),
                now: (self.clock)(),
            },
        };
        for field in &mut self.fields {
            field.update_state(&ctx, &rules, &mut self.events);
        }

        for section in &mut self.sections {
            let hidden = !section.fields.is_empty()
                && section.fields.iter().all(|name| {
                    self.fields
                        .iter()
                        .find(|f| f.name() == name.as_str())
                        .is_some_and(|f| f.is_hidden())
                });
            section.hidden = hidden;
        }

        self.last_pass_data = Some(data);
    }

    /// All current validation findings, paired with control paths.
    pub fn errors(&self) -> Vec<(String, ValidationIssue)> {
        let mut errors: Vec<(String, ValidationIssue)> =
            self.fields.iter().flat_map(|f| f.errors()).collect();
        errors.sort_by(|a, b| a.0.cmp(&b.0));
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Drains the queued state-change events for the view layer.
    pub fn drain_events(&mut self) -> Vec<FormEvent> {
        std::mem::take(&mut self.events)
    }

    /// Per-language completeness of localizable fields, `0..=100`.
    pub fn translation_status(&self) -> AHashMap<String, i64> {
        content_translation_status(&self.value(), &self.schema, self.partitions.languages())
    }
}

/// True when a value is present and carries actual content.
pub fn is_valid_value(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_null())
}

/// The rounded percentage of localizable fields holding a valid value,
/// per language. A schema without localizable fields reports 100 for
/// every language.
pub fn content_translation_status(
    data: &Value,
    schema: &Schema,
    languages: &[Language],
) -> AHashMap<String, i64> {
    let localizable: Vec<&FieldSchema> = schema
        .fields
        .iter()
        .filter(|f| f.field_type.is_content() && f.is_localizable)
        .collect();

    let mut status = AHashMap::new();
    for language in languages {
        let percent = if localizable.is_empty() {
            100
        } else {
            let filled = localizable
                .iter()
                .filter(|f| {
                    is_valid_value(data.get(&f.name).and_then(|v| v.get(&language.iso2_code)))
                })
                .count();
            (100.0 * filled as f64 / localizable.len() as f64).round() as i64
        };
        status.insert(language.iso2_code.clone(), percent);
    }
    status
}
