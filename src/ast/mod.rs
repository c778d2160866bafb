// src/ast/mod.rs
pub mod types;

pub use types::{
    Assignment, Condition, ConditionKind, FunctionCall, Include, Node, Program, Rule, Value,
};
