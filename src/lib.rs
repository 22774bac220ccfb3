//! # Katachi - Schema-Driven Content Form Engine
//!
//! **Katachi** builds editable form trees from content-type schemas at
//! runtime: per-field validation, default values, conditional
//! visibility/require/disable rules evaluated through a sandboxed
//! expression language, and an immutable flow-step graph for branching
//! automation definitions.
//!
//! ## Core Workflow
//!
//! 1.  **Describe your content**: build a [`Schema`](schema::Schema) —
//!     an ordered field list (strings, numbers, arrays, components, ...)
//!     plus declarative [`FieldRule`](schema::FieldRule)s whose
//!     conditions are plain expression strings such as
//!     `data.field2.iv > 100`.
//! 2.  **Build the form**: construct a
//!     [`ContentFormTree`](form::ContentFormTree) from the schema, the
//!     app languages and any component schemas. The tree materializes
//!     one node per field and partition, seeded with default values.
//! 3.  **Edit**: set values through dotted paths, add/remove/move array
//!     items, swap component schemas. The tree keeps the live node
//!     collections and the flattened value consistent at every step.
//! 4.  **Observe**: drive `tick()` from your event loop; the derived
//!     hidden/disabled/required pass runs debounced, and state flips are
//!     reported as [`FormEvent`](form::FormEvent)s.
//!
//! ## Quick Start
//!
//! ```rust
//! use katachi::prelude::*;
//! use serde_json::json;
//!
//! // 1. A schema with one localizable field and a rule.
//! let mut schema = Schema::new("posts", "Posts");
//! let mut title = FieldSchema::new(1, "title", FieldType::String);
//! title.is_localizable = true;
//! title.properties.is_required = true;
//! schema.fields.push(title);
//!
//! let count = FieldSchema::new(2, "count", FieldType::Number);
//! schema.fields.push(count);
//!
//! schema.field_rules.push(FieldRule::new(
//!     RuleAction::Hide,
//!     "title",
//!     "data.count.iv > 100",
//! ));
//!
//! // 2. Build the form tree.
//! let languages = vec![Language::master("en"), Language::optional("de")];
//! let mut form = ContentFormTree::new(
//!     languages,
//!     schema,
//!     [],
//!     RuleContext::default(),
//!     FormOptions::default(),
//! );
//!
//! // 3. Edit and flush the derived-state pass.
//! form.set_value("count.iv", Some(json!(120)));
//! form.flush();
//!
//! assert!(form.field("title").unwrap().is_hidden());
//! assert!(form.has_changed());
//! ```

pub mod error;
pub mod expr;
pub mod flow;
pub mod form;
pub mod partition;
pub mod prelude;
pub mod resolver;
pub mod rules;
pub mod schema;
