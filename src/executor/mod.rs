//! The dependency-aware rule executor
//!
//! Two passes over a parsed program. The check pass registers rule names
//! (refusing duplicates, including across include files), validates every
//! `require`/`notify` reference, resolves each rule's module and runs its
//! parameter check, and validates conditional arity. The execute pass
//! walks nodes in encounter order, pulling `require` targets in first and
//! cascading `notify` targets after a rule reports changed.
//!
//! Each rule executes at most once per run, keyed by rule name. A rule
//! currently being resolved is guarded against re-entry, so dependency
//! cycles collapse instead of recursing forever.

pub mod types;

pub use types::{CheckError, ExecError, RunState};

use std::collections::{HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;

use crate::ast::{Assignment, Condition, ConditionKind, FunctionCall, Include, Node, Program, Rule, Value};
use crate::conditionals::{self, CallResult};
use crate::env::Environment;
use crate::errors::EvalError;
use crate::modules::{ParamValue, MODULES};
use crate::parser::parse;

/// Evaluate a value to its string form: interpolate strings, expand
/// backticks, stringify numbers and booleans, invoke function calls.
pub fn eval_value(env: &Environment, value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Str(s) => Ok(env.interpolate(s)),
        Value::Backtick(command) => env.expand_backtick(command),
        Value::Number(n) => Ok(n.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Call(call) => Ok(eval_call(env, call)?.into_string()),
        Value::List(_) => Err(EvalError::ListValue),
    }
}

/// Evaluate a function call: stringify every argument, then dispatch.
pub fn eval_call(env: &Environment, call: &FunctionCall) -> Result<CallResult, EvalError> {
    let mut args = Vec::with_capacity(call.args.len());
    for arg in &call.args {
        args.push(eval_value(env, arg)?);
    }
    conditionals::call(&call.name, &args)
}

/// Evaluate an `if`/`unless` gate. True means "proceed".
pub fn run_condition(env: &Environment, condition: &Condition) -> Result<bool, EvalError> {
    let result = eval_call(env, &condition.call)?;
    Ok(match condition.kind {
        ConditionKind::If => result.truthy(),
        ConditionKind::Unless => !result.truthy(),
    })
}

/// Publish INCLUDE_FILE / INCLUDE_DIR for the file being processed.
pub(crate) fn publish_include_vars(env: &mut Environment, path: &str) {
    env.set("INCLUDE_FILE", path);
    let dir = Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    env.set("INCLUDE_DIR", dir);
}

/// Executes one program. Include files get their own child executor
/// sharing the environment and the [`RunState`].
pub struct Executor {
    program: Program,
    rule_index: HashMap<String, usize>,
    executed: HashSet<String>,
    visiting: HashSet<String>,
}

impl Executor {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            rule_index: HashMap::new(),
            executed: HashSet::new(),
            visiting: HashSet::new(),
        }
    }

    /// The pre-flight pass. `state.names` carries the rule names already
    /// registered by ancestor executors, so duplicates across include
    /// boundaries are refused too.
    pub fn check(&mut self, state: &mut RunState) -> Result<(), CheckError> {
        for (idx, rule) in self.program.rules() {
            if !state.names.insert(rule.name.clone()) {
                return Err(CheckError::DuplicateRule(rule.name.clone()));
            }
            self.rule_index.insert(rule.name.clone(), idx);
        }

        for (_, rule) in self.program.rules() {
            for target in rule.require.iter().chain(rule.notify.iter()) {
                if !self.rule_index.contains_key(target) {
                    return Err(CheckError::DanglingReference {
                        rule: rule.name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        for node in &self.program.nodes {
            match node {
                Node::Rule(rule) => {
                    let module =
                        MODULES
                            .lookup(&rule.module)
                            .ok_or_else(|| CheckError::UnknownModule {
                                rule: rule.name.clone(),
                                module: rule.module.clone(),
                            })?;
                    module.check(&rule.params).map_err(|source| CheckError::Params {
                        rule: rule.name.clone(),
                        source,
                    })?;
                    check_condition_arity(&rule.condition, || format!("rule '{}'", rule.name))?;
                }
                Node::Assignment(assignment) => {
                    check_condition_arity(&assignment.condition, || {
                        format!("assignment '{}'", assignment.name)
                    })?;
                    if let Value::Call(call) = &assignment.value {
                        conditionals::check_arity(&call.name, call.args.len()).map_err(
                            |source| CheckError::Condition {
                                context: format!("assignment '{}'", assignment.name),
                                source,
                            },
                        )?;
                    }
                }
                Node::Include(include) => {
                    check_condition_arity(&include.condition, || "include".to_string())?;
                }
            }
        }

        Ok(())
    }

    /// The execute pass: nodes in encounter order.
    pub fn execute(&mut self, env: &mut Environment, state: &mut RunState) -> Result<(), ExecError> {
        for idx in 0..self.program.nodes.len() {
            let node = self.program.nodes[idx].clone();
            match &node {
                Node::Assignment(assignment) => self.exec_assignment(assignment, env)?,
                Node::Include(include) => self.exec_include(include, env, state)?,
                Node::Rule(_) => self.exec_rule(idx, env, state, false)?,
            }
        }
        Ok(())
    }

    fn exec_assignment(
        &self,
        assignment: &Assignment,
        env: &mut Environment,
    ) -> Result<(), ExecError> {
        if let Some(condition) = &assignment.condition {
            if !run_condition(env, condition).map_err(ExecError::Eval)? {
                log::debug!(
                    "skipping assignment '{}': {} condition not met",
                    assignment.name,
                    condition.kind.as_str()
                );
                return Ok(());
            }
        }
        let value = eval_value(env, &assignment.value)?;
        log::debug!("set {} = {}", assignment.name, value);
        env.set(assignment.name.as_str(), value);
        Ok(())
    }

    fn exec_include(
        &self,
        include: &Include,
        env: &mut Environment,
        state: &mut RunState,
    ) -> Result<(), ExecError> {
        let path = eval_value(env, &include.source)?;

        if let Some(condition) = &include.condition {
            if !run_condition(env, condition).map_err(ExecError::Eval)? {
                log::debug!("skipping include '{}': condition not met", path);
                return Ok(());
            }
        }

        let canonical = std::fs::canonicalize(&path)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| path.clone());
        if !state.included.insert(canonical.clone()) {
            log::debug!("include '{}' already processed, skipping", path);
            return Ok(());
        }

        let source = std::fs::read_to_string(&path).map_err(|source| ExecError::Include {
            path: path.clone(),
            source,
        })?;
        let program = parse(&source).map_err(|source| ExecError::IncludeParse {
            path: path.clone(),
            source,
        })?;

        log::info!("including '{}'", path);
        let previous_file = env.get("INCLUDE_FILE").map(str::to_string);
        let previous_dir = env.get("INCLUDE_DIR").map(str::to_string);
        publish_include_vars(env, &canonical);

        let mut child = Executor::new(program);
        let result = child
            .check(state)
            .map_err(ExecError::from)
            .and_then(|()| child.execute(env, state));

        if let Some(file) = previous_file {
            env.set("INCLUDE_FILE", file);
        }
        if let Some(dir) = previous_dir {
            env.set("INCLUDE_DIR", dir);
        }
        result
    }

    /// Execute one rule node, honouring the triggered flag, the executed
    /// set, and the in-progress guard that collapses dependency cycles.
    fn exec_rule(
        &mut self,
        idx: usize,
        env: &mut Environment,
        state: &mut RunState,
        forced: bool,
    ) -> Result<(), ExecError> {
        let rule = match &self.program.nodes[idx] {
            Node::Rule(rule) => rule.clone(),
            _ => return Ok(()),
        };

        if rule.triggered && !forced {
            return Ok(());
        }
        if self.executed.contains(&rule.name) || self.visiting.contains(&rule.name) {
            return Ok(());
        }

        self.visiting.insert(rule.name.clone());
        let outcome = self.run_rule(&rule, env, state);
        self.visiting.remove(&rule.name);

        if outcome? {
            self.executed.insert(rule.name);
        }
        Ok(())
    }

    /// Returns whether the rule actually ran (a failed conditional gate
    /// leaves the rule eligible for a later attempt).
    fn run_rule(
        &mut self,
        rule: &Rule,
        env: &mut Environment,
        state: &mut RunState,
    ) -> Result<bool, ExecError> {
        for target in &rule.require {
            if let Some(&target_idx) = self.rule_index.get(target) {
                self.exec_rule(target_idx, env, state, false)?;
            }
        }

        if let Some(condition) = &rule.condition {
            if !run_condition(env, condition).map_err(ExecError::Eval)? {
                log::info!(
                    "skipping rule '{}': {} condition not met",
                    rule.name,
                    condition.kind.as_str()
                );
                return Ok(false);
            }
        }

        let mut params: IndexMap<String, ParamValue> = IndexMap::new();
        for (key, value) in &rule.params {
            let interpolated = match value {
                Value::List(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(eval_value(env, item)?);
                    }
                    ParamValue::List(out)
                }
                scalar => ParamValue::Str(eval_value(env, scalar)?),
            };
            params.insert(key.clone(), interpolated);
        }

        let mut module = MODULES
            .lookup(&rule.module)
            .ok_or_else(|| ExecError::UnknownModule {
                rule: rule.name.clone(),
                module: rule.module.clone(),
            })?;

        log::info!("running rule '{}' ({})", rule.name, rule.module);
        let changed = module
            .execute(env, &params)
            .map_err(|source| ExecError::Module {
                rule: rule.name.clone(),
                module: rule.module.clone(),
                source,
            })?;
        log::debug!("rule '{}' changed={}", rule.name, changed);

        if changed {
            for (key, value) in module.outputs() {
                env.set(format!("{}.{}", rule.name, key), value);
            }
            for target in &rule.notify {
                if let Some(&target_idx) = self.rule_index.get(target) {
                    log::debug!("rule '{}' notifying '{}'", rule.name, target);
                    self.exec_rule(target_idx, env, state, true)?;
                }
            }
        }

        Ok(true)
    }
}

fn check_condition_arity<F: Fn() -> String>(
    condition: &Option<Condition>,
    context: F,
) -> Result<(), CheckError> {
    if let Some(condition) = condition {
        conditionals::check_arity(&condition.call.name, condition.call.args.len()).map_err(
            |source| CheckError::Condition {
                context: context(),
                source,
            },
        )?;
    }
    Ok(())
}
