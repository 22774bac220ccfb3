use itertools::Itertools;
use serde_json::Value;
use std::sync::Arc;

use crate::expr::{self, EvalContext, Expression, ExprEngine, is_truthy};
use crate::schema::{FieldRule, RuleAction, Schema};

/// The ambient inputs every rule condition can read.
#[derive(Debug, Clone, Default)]
pub struct RuleContext {
    pub user: Value,
    pub ctx: Value,
}

/// A field rule plus its parsed condition.
///
/// Compilation is fail-closed: a condition that does not parse yields a
/// rule whose predicate is always `false`, and evaluation errors
/// likewise resolve to `false`. A broken admin-authored rule must never
/// hide, disable or require a field.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: FieldRule,
    predicate: Option<Expression>,
    use_item_data: bool,
}

impl CompiledRule {
    pub fn new(rule: FieldRule, use_item_data: bool) -> Self {
        let predicate = expr::parse(&rule.condition).ok();
        Self {
            rule,
            predicate,
            use_item_data,
        }
    }

    pub fn action(&self) -> RuleAction {
        self.rule.action
    }

    /// Evaluates the condition against the content data. `item_data` is
    /// the nearest enclosing array-item's local object, when inside one.
    pub fn eval(&self, context: &RuleContext, data: &Value, item_data: Option<&Value>) -> bool {
        let Some(predicate) = &self.predicate else {
            return false;
        };
        let primary = if self.use_item_data {
            item_data.unwrap_or(data)
        } else {
            data
        };
        let engine = ExprEngine::new(EvalContext {
            user: &context.user,
            ctx: &context.ctx,
            data: primary,
            item_data,
        });
        match engine.evaluate(predicate) {
            Ok(value) => is_truthy(&value),
            Err(_) => false,
        }
    }
}

/// Removes the second dot-segment of a form path, so a rule written
/// against `"field4.nested42"` matches `"field4.iv.nested42"` no matter
/// which partition the actual path carries. Exactly one segment is
/// removed; deeper nesting is not special-cased.
pub fn simplify_path(path: &str) -> Option<String> {
    path.split('.').nth(1)?;
    Some(
        path.split('.')
            .enumerate()
            .filter(|(index, _)| *index != 1)
            .map(|(_, segment)| segment)
            .join("."),
    )
}

/// The compiled rule set of one schema scope. The root form uses the
/// root schema's set; each component body carries its own scoped set.
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    rules: Vec<Arc<CompiledRule>>,
}

impl CompiledRules {
    /// Compiles one rule per declared field rule, in declaration order.
    ///
    /// Root-schema rules bind `data` to the root content data. Rules a
    /// component schema declares for its own fields are compiled with
    /// `use_item_data`, so they reference sibling fields of the same
    /// item by unqualified name.
    pub fn compile(schema: &Schema) -> Self {
        Self::compile_scoped(schema, false)
    }

    fn compile_scoped(schema: &Schema, use_item_data: bool) -> Self {
        let rules = schema
            .field_rules
            .iter()
            .map(|r| Arc::new(CompiledRule::new(r.clone(), use_item_data)))
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CompiledRule>> {
        self.rules.iter()
    }

    /// The rules applying to a field at `path` carrying `tags`, in
    /// declaration order: exact path match, partition-simplified match,
    /// or `tag:` sentinel match.
    pub fn rules_for<'a>(
        &'a self,
        path: &str,
        tags: &[String],
    ) -> impl Iterator<Item = &'a Arc<CompiledRule>> + use<'a> {
        let simplified = simplify_path(path);
        let path = path.to_string();
        let tags = tags.to_vec();
        self.rules.iter().filter(move |compiled| {
            let field = &compiled.rule.field;
            if let Some(tag) = compiled.rule.tag() {
                return tags.iter().any(|t| t == tag);
            }
            *field == path || simplified.as_deref() == Some(field.as_str())
        })
    }

    /// Builds the rule set for a component body mounted at
    /// `component_path`: this set's rules re-rooted to the relative
    /// inner path, merged (fast, non-deduping) with the component
    /// schema's own rules.
    pub fn scoped_to_component(&self, component_path: &str, component: &Schema) -> CompiledRules {
        let mut rules: Vec<Arc<CompiledRule>> =
            CompiledRules::compile_scoped(component, true).rules;

        // The component may be addressed with or without its partition
        // segment, so both prefixes re-root.
        let mut prefixes = vec![format!("{component_path}.")];
        if let Some(simplified) = simplify_path(component_path) {
            prefixes.push(format!("{simplified}."));
        }

        for compiled in &self.rules {
            if compiled.rule.tag().is_some() {
                rules.push(compiled.clone());
                continue;
            }
            for prefix in &prefixes {
                if let Some(relative) = compiled.rule.field.strip_prefix(prefix.as_str()) {
                    let mut rule = compiled.rule.clone();
                    rule.field = relative.to_string();
                    // Re-rooting changes where the rule matches, not
                    // what its condition was written against.
                    rules.push(Arc::new(CompiledRule {
                        rule,
                        predicate: compiled.predicate.clone(),
                        use_item_data: compiled.use_item_data,
                    }));
                    break;
                }
            }
        }

        CompiledRules { rules }
    }
}
