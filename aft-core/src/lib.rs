//! Aft Core
//!
//! This crate provides the engine under the Aft attribute-based data-binding
//! framework. It implements:
//!
//! - Reactive primitives: tracked containers, effects, computed caches, and
//!   the dependency store connecting them
//! - The safe binding-expression language: lexer, parser, evaluator
//! - Path resolution for two-way bindings
//!
//! The DOM-facing layers (attribute directives, custom elements, the dev
//! server) live outside this crate and consume it through the functions
//! re-exported here.
//!
//! # Architecture
//!
//! - `reactive`: dependency tracking; reads record, writes notify
//! - `expr`: the expression/path layer evaluated against binding contexts
//! - `value`: the dynamic JSON-flavoured value type both layers share
//!
//! # Example
//!
//! ```rust,ignore
//! use aft_core::{effect, evaluate, reactive, BindingContext};
//! use serde_json::json;
//!
//! let user = reactive(json!({"name": "ada", "visits": 1}))?;
//!
//! let mut ctx = BindingContext::new();
//! ctx.insert_data("user", user.clone());
//!
//! // Re-renders whenever user.name changes, and only then.
//! let binding = effect(move || {
//!     let text = evaluate("'hello, ' + user.name", &ctx).unwrap();
//!     println!("{text}");
//! });
//! ```

pub mod error;
pub mod expr;
pub mod reactive;
pub mod value;

pub use error::Error;
pub use expr::{
    evaluate, evaluate_parsed, parse, parse_path, resolve_path, BindingContext, PathSegment,
    PathTarget,
};
pub use reactive::{
    computed, effect, reactive, track, trigger, Computed, Effect, Key, ReactiveList,
    ReactiveObject, TargetId,
};
pub use value::Value;
