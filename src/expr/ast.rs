use serde_json::Value;
use std::fmt;

/// The root object a member path resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathRoot {
    /// Content data. Inside an array item this binds the item's local
    /// object when the rule was compiled with `use_item_data`.
    Data,
    /// The nearest enclosing array-item's local data, always.
    ItemData,
    /// The ambient evaluation context (app, schema, ...).
    Ctx,
    /// The current user.
    User,
}

impl PathRoot {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "data" => Some(PathRoot::Data),
            "itemData" => Some(PathRoot::ItemData),
            "ctx" | "context" => Some(PathRoot::Ctx),
            "user" => Some(PathRoot::User),
            _ => None,
        }
    }
}

impl fmt::Display for PathRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathRoot::Data => write!(f, "data"),
            PathRoot::ItemData => write!(f, "itemData"),
            PathRoot::Ctx => write!(f, "ctx"),
            PathRoot::User => write!(f, "user"),
        }
    }
}

/// The syntax tree of a parsed rule condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // Logical
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),

    // Comparison
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),
    SmallerThan(Box<Expression>, Box<Expression>),
    SmallerThanOrEqual(Box<Expression>, Box<Expression>),

    // Leaf nodes
    Literal(Value),
    Path(PathRoot, Vec<String>),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Not(v) => write!(f, "!({})", v),
            Expression::And(l, r) => write!(f, "({} && {})", l, r),
            Expression::Or(l, r) => write!(f, "({} || {})", l, r),
            Expression::Equal(l, r) => write!(f, "({} == {})", l, r),
            Expression::NotEqual(l, r) => write!(f, "({} != {})", l, r),
            Expression::GreaterThan(l, r) => write!(f, "({} > {})", l, r),
            Expression::GreaterThanOrEqual(l, r) => write!(f, "({} >= {})", l, r),
            Expression::SmallerThan(l, r) => write!(f, "({} < {})", l, r),
            Expression::SmallerThanOrEqual(l, r) => write!(f, "({} <= {})", l, r),
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::Path(root, segments) => {
                write!(f, "{}", root)?;
                for segment in segments {
                    write!(f, ".{}", segment)?;
                }
                Ok(())
            }
        }
    }
}
