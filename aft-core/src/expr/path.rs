//! Path resolution for two-way bindings.
//!
//! A binding path (`user.address.city`, `items[2].name`) resolves to the
//! *container holding the final segment*, not to the value itself, so one
//! resolution serves both directions of a two-way binding: read the current
//! value out, write the input's value back in.
//!
//! Paths are parsed with the expression parser and then restricted: only
//! identifier roots, dotted members, and literal index segments survive.
//! Resolution walks the binding context the same way the evaluator resolves
//! identifiers: locals before data.
//!
//! "Not resolvable" (`Ok(None)`) is an ordinary outcome, distinct both from
//! a syntax error and from a path that resolves to an `Undefined` value: a
//! missing intermediate means there is no container to write through.

use smallvec::SmallVec;

use super::ast::{Expr, Literal, Spanned};
use super::eval::BindingContext;
use super::parser::parse;
use crate::error::Error;
use crate::reactive::{ReactiveList, ReactiveObject};
use crate::value::Value;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A named member: `.name` or `['name']`.
    Prop(String),
    /// A literal list position: `[2]`.
    Index(usize),
}

type Segments = SmallVec<[PathSegment; 4]>;

/// The resolved (container, final key) pair of a binding path.
#[derive(Debug, Clone)]
pub enum PathTarget {
    Object { object: ReactiveObject, key: String },
    List { list: ReactiveList, index: usize },
}

impl PathTarget {
    /// Read the bound value. A tracked read, like any other.
    pub fn read(&self) -> Value {
        match self {
            PathTarget::Object { object, key } => object.get(key),
            PathTarget::List { list, index } => list.get(*index),
        }
    }

    /// Write the bound value. An out-of-range list index extends the list.
    pub fn write(&self, value: impl Into<Value>) {
        match self {
            PathTarget::Object { object, key } => object.set(key, value),
            PathTarget::List { list, index } => list.set(*index, value),
        }
    }
}

/// Parse a path into segments without resolving it.
///
/// # Errors
///
/// [`Error::Syntax`] for text outside the path grammar, [`Error::BadIndex`]
/// for an index segment that is not a non-negative integer literal.
pub fn parse_path(source: &str) -> Result<Vec<PathSegment>, Error> {
    Ok(segments_of(source)?.into_vec())
}

fn segments_of(source: &str) -> Result<Segments, Error> {
    let ast = parse(source)?;
    let mut segments = Segments::new();
    flatten(&ast, &mut segments)?;
    Ok(segments)
}

fn flatten(expr: &Spanned<Expr>, segments: &mut Segments) -> Result<(), Error> {
    match &expr.node {
        Expr::Identifier(name) => segments.push(PathSegment::Prop(name.clone())),
        Expr::Member { object, property } => {
            flatten(object, segments)?;
            segments.push(PathSegment::Prop(property.clone()));
        }
        Expr::Index { object, index } => {
            flatten(object, segments)?;
            match &index.node {
                Expr::Literal(Literal::Number(n)) if n.fract() == 0.0 && *n >= 0.0 => {
                    segments.push(PathSegment::Index(*n as usize));
                }
                Expr::Literal(Literal::Str(key)) => {
                    segments.push(PathSegment::Prop(key.clone()));
                }
                _ => {
                    return Err(Error::bad_index(
                        index.span,
                        "path indices must be non-negative integer literals",
                    ))
                }
            }
        }
        _ => {
            return Err(Error::syntax(
                expr.span,
                "a binding path may contain only property and index segments",
            ))
        }
    }
    Ok(())
}

/// Resolve a path against the context to its (container, final key) pair.
///
/// Returns `Ok(None)`, "not resolvable", when the root name is unbound,
/// when an intermediate segment is missing or not a container, or when the
/// path is a bare root name (the context map itself is not a tracked
/// container to write through). An out-of-range index on the *final*
/// segment still resolves: its current value is `Undefined` and writing
/// through it extends the list.
///
/// # Errors
///
/// Path syntax errors only; see [`parse_path`].
pub fn resolve_path(source: &str, ctx: &BindingContext) -> Result<Option<PathTarget>, Error> {
    let segments = segments_of(source)?;

    let Some((first, rest)) = segments.split_first() else {
        return Ok(None);
    };
    let PathSegment::Prop(root_name) = first else {
        return Ok(None);
    };
    let Some((last, middle)) = rest.split_last() else {
        return Ok(None);
    };

    let mut current = match ctx.lookup(root_name) {
        Some(value) => value.clone(),
        None => return Ok(None),
    };

    for segment in middle {
        current = match step(&current, segment) {
            Some(next) => next,
            None => return Ok(None),
        };
    }

    Ok(target(&current, last))
}

// Intermediate steps read through tracked containers, so a binding that
// re-resolves inside an effect re-runs when an intermediate object is
// replaced wholesale.
fn step(current: &Value, segment: &PathSegment) -> Option<Value> {
    match (current, segment) {
        (Value::Object(object), PathSegment::Prop(key)) => Some(object.get(key)),
        (Value::Object(object), PathSegment::Index(index)) => {
            Some(object.get(&index.to_string()))
        }
        (Value::List(list), PathSegment::Index(index)) => Some(list.get(*index)),
        _ => None,
    }
}

fn target(container: &Value, segment: &PathSegment) -> Option<PathTarget> {
    match (container, segment) {
        (Value::Object(object), PathSegment::Prop(key)) => Some(PathTarget::Object {
            object: object.clone(),
            key: key.clone(),
        }),
        (Value::Object(object), PathSegment::Index(index)) => Some(PathTarget::Object {
            object: object.clone(),
            key: index.to_string(),
        }),
        (Value::List(list), PathSegment::Index(index)) => Some(PathTarget::List {
            list: list.clone(),
            index: *index,
        }),
        _ => None,
    }
}
