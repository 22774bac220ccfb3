//! Prelude module for convenient imports
//!
//! Re-exports the most commonly used types so embedders can bring the
//! whole editing surface in with a single `use`.
//!
//! # Example
//!
//! ```rust,no_run
//! use katachi::prelude::*;
//!
//! let schema = Schema::new("posts", "Posts");
//! let mut form = ContentFormTree::new(
//!     vec![Language::master("en")],
//!     schema,
//!     [],
//!     RuleContext::default(),
//!     FormOptions::default(),
//! );
//! form.flush();
//! ```

// Form tree and nodes
pub use crate::form::{
    ContentFormTree, FieldArrayForm, FieldControl, FieldForm, FieldNode, FormEvent, FormOptions,
    FormSection, UiState, ValidationIssue, Validator, content_translation_status, field_display,
    is_valid_value,
};

// Schema model
pub use crate::schema::{
    CalculatedDefault, FieldProperties, FieldRule, FieldSchema, FieldType, Language, RuleAction,
    Schema,
};

// Rules and partitions
pub use crate::partition::{INVARIANT, Partition, PartitionSet};
pub use crate::rules::{CompiledRule, CompiledRules, RuleContext, simplify_path};

// Expression language
pub use crate::expr::{EvalContext, ExprEngine, Expression, PathRoot, parse};

// Flow graphs
pub use crate::flow::{
    BranchTarget, FlowDefinition, FlowStep, FlowStepHolder, FlowView, IfBranch, IfStep, RawStep,
    SubBranch,
};

// Reference resolution
pub use crate::resolver::ResolverQueue;

// Error types
pub use crate::error::{EvalError, ExprError};
