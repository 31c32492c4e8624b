//! A fuzzy-logic rule engine.
//!
//! Input variables carry membership curves. Sets hold rules of the form
//! `IF depth IS deep AND slope IS NOT steep THEN score IS good`. Evaluating
//! a set against a record yields an [`Implication`], which a [`Combiner`]
//! defuzzifies and combines with other sets' results. Missing data flows
//! through every step as a [`NoData`] sentinel instead of an error.

pub mod combiner;
mod compiler;
pub mod config;
pub mod curves;
pub mod document;
pub mod dsl;
mod error;
pub mod geometry;
pub mod implication;
pub mod inference;
mod inputs;
mod linspace;
mod math;
pub mod nodata;
pub mod ops;
mod outputs;
pub mod rules;
pub mod set;
pub mod variable;

pub use combiner::{Combiner, Operand};
pub use compiler::{compile_alias, AliasTable};
pub use config::{EngineConfig, NoDataConfig};
pub use curves::Curve;
pub use dsl::{Expr, Function};
pub use error::{CompileError, CompileErrors, FuzzyError, Result, StatementKind};
pub use geometry::{Point2D, Segment};
pub use implication::{ClippedCurve, Implication};
pub use inference::{EvaluationObserver, Model, SkipLog};
pub use inputs::Inputs;
pub use nodata::{NoData, Value};
pub use ops::{DefuzzificationOp, LogicOp};
pub use outputs::{Outputs, SkipReason};
pub use rules::{import_rules, Rule, RuleImport};
pub use set::FuzzyLogicSet;
pub use variable::{FuzzyResult, Variable, VariableKey, Variables};
