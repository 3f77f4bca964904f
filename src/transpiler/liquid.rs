//! Refinement annotations synthesized from a function's own checks.
//!
//! Top-level `require(c)` statements become preconditions and top-level
//! `assert(c)` statements become postconditions. Nothing else is inferred.

use super::ast::{Expression, Statement};
use super::expression::{mentioned_identifiers, reads_state, translate_expression};
use super::gather::constructor_name;
use super::haskell::has_placeholder;
use super::scope::{FunctionScope, CONSTRUCTOR_BLOCK, CONSTRUCTOR_MSG, INCOMING_STATE, RESULT_TOKEN};
use log::{debug, warn};
use std::collections::HashSet;

/// Where a precondition is attached in the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    State,
    /// Index into the declared parameter list.
    Param(usize),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotation {
    /// Conjuncts refining the incoming state.
    pub state: Vec<String>,
    /// Conjuncts refining each parameter, in declaration order.
    pub params: Vec<Vec<String>>,
    /// Conjuncts refining the result.
    pub result: Vec<String>,
}

fn conjunction(predicates: &[String]) -> String {
    if predicates.is_empty() {
        "True".to_string()
    } else {
        predicates.join(" && ")
    }
}

impl Annotation {
    /// `{-@ f :: {st:CState | P} -> {x:T | Q} -> {v:R | S} @-}`
    pub fn render(&self, scope: &FunctionScope) -> String {
        let function = scope.function;
        let state = scope.state();
        let mut parts = Vec::new();
        let name = if function.is_constructor() {
            parts.push(format!("{}:Message", CONSTRUCTOR_MSG));
            parts.push(format!("{}:Block", CONSTRUCTOR_BLOCK));
            constructor_name(&state.contract_name)
        } else {
            parts.push(format!(
                "{{{}:{} | {}}}",
                INCOMING_STATE,
                state.state_type(),
                conjunction(&self.state)
            ));
            function.name.clone()
        };
        for (idx, param) in function.params.iter().enumerate() {
            let predicates = self.params.get(idx).map(Vec::as_slice).unwrap_or(&[]);
            parts.push(format!(
                "{{{}:{} | {}}}",
                param.name,
                param.ty,
                conjunction(predicates)
            ));
        }
        parts.push(format!(
            "{{{}:{} | {}}}",
            RESULT_TOKEN,
            result_type(scope),
            conjunction(&self.result)
        ));
        format!("{{-@ {} :: {} @-}}", name, parts.join(" -> "))
    }
}

/// Declared result type: the return type of a read-only function, the
/// state type otherwise.
pub fn result_type(scope: &FunctionScope) -> String {
    let function = scope.function;
    if function.is_read_only() && !function.is_constructor() {
        match &function.return_type {
            Some(ty) => ty.to_string(),
            None => "UnknownType".to_string(),
        }
    } else {
        scope.state().state_type()
    }
}

/// Conditions of top-level calls to `check` (`require` or `assert`).
pub fn top_level_checks<'b>(body: &'b [Statement], check: &str) -> Vec<&'b Expression> {
    body.iter()
        .filter_map(|statement| match statement {
            Statement::Expression(expr) if expr.called_name() == Some(check) => match expr {
                Expression::Call { args, .. } => args.first(),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

/// Names of every local declared anywhere in `body`.
pub fn declared_locals(body: &[Statement]) -> HashSet<String> {
    let mut names = HashSet::new();
    collect_locals(body, &mut names);
    names
}

fn collect_locals(body: &[Statement], names: &mut HashSet<String>) {
    for statement in body {
        match statement {
            Statement::VariableDeclaration { declarations, .. } => {
                names.extend(declarations.iter().flatten().map(|d| d.name.clone()));
            }
            Statement::Block(inner) => collect_locals(inner, names),
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_locals(std::slice::from_ref(then_branch.as_ref()), names);
                if let Some(else_branch) = else_branch {
                    collect_locals(std::slice::from_ref(else_branch.as_ref()), names);
                }
            }
            _ => {}
        }
    }
}

/// Right-most declared parameter the condition mentions, else the state.
pub fn attribute(scope: &FunctionScope, condition: &Expression) -> Target {
    let mentioned: HashSet<&str> = mentioned_identifiers(condition).into_iter().collect();
    scope
        .function
        .params
        .iter()
        .rposition(|param| mentioned.contains(param.original_name.as_str()))
        .map_or(Target::State, Target::Param)
}

/// Translates a check, or `None` when it cannot appear in a signature.
fn predicate(
    scope: &FunctionScope,
    condition: &Expression,
    token: &str,
    locals: &HashSet<String>,
) -> Option<String> {
    let precondition = token == INCOMING_STATE && !scope.function.is_read_only();
    let function = &scope.function.original_name;
    let local = mentioned_identifiers(condition)
        .into_iter()
        .find(|name| locals.contains(*name) && scope.param(name).is_none());
    if let Some(local) = local {
        warn!(
            "Dropping predicate `{}` of {}: it mentions local `{}`",
            condition, function, local
        );
        return None;
    }
    if precondition && scope.function.is_constructor() && reads_state(scope, condition) {
        warn!(
            "Dropping predicate `{}` of {}: the state does not exist yet",
            condition, function
        );
        return None;
    }
    let text = translate_expression(scope, condition, token);
    if has_placeholder(&text) {
        warn!(
            "Dropping predicate `{}` of {}: it has no translation",
            condition, function
        );
        return None;
    }
    Some(text)
}

/// Builds the annotation of the function `scope` translates. The scope
/// must not have any locals bound yet.
///
/// Postconditions of read-only functions read the unchanged incoming
/// state `st` rather than the result binder `v`.
pub fn synthesize(scope: &FunctionScope) -> Annotation {
    let function = scope.function;
    let locals = declared_locals(&function.body);
    let mut annotation = Annotation {
        params: vec![Vec::new(); function.params.len()],
        ..Annotation::default()
    };

    for condition in top_level_checks(&function.body, "require") {
        let text = match predicate(scope, condition, INCOMING_STATE, &locals) {
            Some(text) => text,
            None => continue,
        };
        match attribute(scope, condition) {
            Target::Param(idx) => annotation.params[idx].push(text),
            Target::State if function.is_constructor() => warn!(
                "Dropping predicate `{}` of the {} constructor: it refines no parameter",
                condition, scope.contract.name
            ),
            Target::State => annotation.state.push(text),
        }
    }

    // Read-only results are plain values; their checks refer to `st`.
    let token = if function.is_read_only() {
        INCOMING_STATE
    } else {
        RESULT_TOKEN
    };
    for condition in top_level_checks(&function.body, "assert") {
        if let Some(text) = predicate(scope, condition, token, &locals) {
            annotation.result.push(text);
        }
    }

    debug!(
        "{}: {} state, {} parameter, {} result predicates",
        function.original_name,
        annotation.state.len(),
        annotation.params.iter().map(Vec::len).sum::<usize>(),
        annotation.result.len()
    );
    annotation
}
