//! Rewrites statement sequences into pure expressions.
//!
//! Mutating bodies thread the state record through a chain of fresh
//! bindings (`st1`, `st2`, ...). Read-only bodies fold into a single value,
//! with `if`/`return` chains becoming nested conditionals.

use super::ast::{AssignOp, BinaryOp, Expression, LocalDeclaration, Statement, UnaryOp};
use super::expression::{
    binary_operator, reads_state, revert_message, translate_expression, value_transfer,
};
use super::haskell::{unsupported_state, unsupported_value, unwrap_group, HsExpr};
use super::scope::{FunctionScope, INCOMING_STATE};
use super::types::LiquidType;
use log::debug;
use std::collections::{HashMap, HashSet};

/// A flattened statement; nested blocks are spliced in between markers so
/// their locals can be dropped when the block ends.
#[derive(Debug, Clone, Copy)]
enum Item<'s> {
    Statement(&'s Statement),
    BlockStart,
    BlockEnd,
}

fn items_of<'s, I: IntoIterator<Item = &'s Statement>>(statements: I) -> Vec<Item<'s>> {
    let mut items = Vec::new();
    for statement in statements {
        match statement {
            Statement::Block(inner) => {
                items.push(Item::BlockStart);
                items.extend(items_of(inner));
                items.push(Item::BlockEnd);
            }
            other => items.push(Item::Statement(other)),
        }
    }
    items
}

/// Tracks block nesting while walking a flattened sequence.
#[derive(Default)]
struct Blocks(Vec<HashSet<String>>);

impl Blocks {
    /// Returns the statement of `item`, or handles a block marker.
    fn visit<'s>(&mut self, scope: &mut FunctionScope, item: Item<'s>) -> Option<&'s Statement> {
        match item {
            Item::Statement(statement) => Some(statement),
            Item::BlockStart => {
                self.0.push(scope.local_names());
                None
            }
            Item::BlockEnd => {
                // Continuations moved into a branch may close blocks they never opened.
                if let Some(outer) = self.0.pop() {
                    scope.forget_locals_except(&outer);
                }
                None
            }
        }
    }
}

/// One step of a mutating body.
#[derive(Debug, Clone, PartialEq)]
enum Emit {
    /// New state, bound to a fresh `st<n>`.
    State(String),
    /// Local (re)binding.
    Bind(String, String),
    /// Ends every path through the rest of the block.
    Terminal(String),
}

/// Threads a mutating function body, starting from `incoming`.
pub fn translate_mutating(scope: &mut FunctionScope, body: &[Statement], incoming: &str) -> HsExpr {
    thread(scope, &items_of(body), incoming)
}

/// Folds a read-only function body into its result value.
pub fn translate_read_only(scope: &mut FunctionScope, body: &[Statement]) -> HsExpr {
    fold_value(scope, &items_of(body))
}

fn thread(scope: &mut FunctionScope, items: &[Item], incoming: &str) -> HsExpr {
    let mut bindings: Vec<(String, HsExpr)> = Vec::new();
    let mut current = incoming.to_string();
    let mut blocks = Blocks::default();

    for (idx, item) in items.iter().enumerate() {
        let statement = match blocks.visit(scope, *item) {
            Some(statement) => statement,
            None => continue,
        };
        let emits = match statement {
            Statement::Return(_) => break,
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let rest = &items[idx + 1..];
                let condition = translate_expression(scope, condition, &current);
                let then_returns = then_branch.always_returns();
                let else_returns = else_branch.as_ref().map_or(false, |e| e.always_returns());
                let may_exit = then_branch.may_return()
                    || else_branch.as_ref().map_or(false, |e| e.may_return());
                if may_exit {
                    // An early exit anywhere in a branch confines the rest of
                    // the block to the paths that fall through.
                    let then_rest = if then_returns { &[][..] } else { rest };
                    let else_rest = if else_returns { &[][..] } else { rest };
                    let then_expr = branch(scope, Some(then_branch.as_ref()), then_rest, &current);
                    let else_expr = branch(scope, else_branch.as_deref(), else_rest, &current);
                    return HsExpr::let_in(
                        bindings,
                        HsExpr::if_then_else(condition, then_expr, else_expr),
                    );
                }
                let then_expr = branch(scope, Some(then_branch.as_ref()), &[], &current);
                let else_expr = branch(scope, else_branch.as_deref(), &[], &current);
                let next = scope.fresh_state();
                bindings.push((
                    next.clone(),
                    HsExpr::if_then_else(condition, then_expr, else_expr),
                ));
                current = next;
                continue;
            }
            Statement::Expression(expr) => expression_step(scope, expr, &current),
            Statement::VariableDeclaration {
                declarations,
                initial_value,
            } => declaration_step(scope, declarations, initial_value.as_ref(), &current),
            Statement::Emit(event) => {
                debug!("Event `{}` is not modeled", event);
                Vec::new()
            }
            Statement::Loop(kind) => {
                debug!("Unsupported {:?} loop", kind);
                vec![Emit::State(unsupported_state(&current, &format!("{:?} loop", kind).to_lowercase()))]
            }
            Statement::Break | Statement::Continue => {
                vec![Emit::State(unsupported_state(&current, "loop control"))]
            }
            // `items_of` splices nested blocks in as markers.
            Statement::Block(_) => continue,
        };

        for emit in emits {
            match emit {
                Emit::State(text) => {
                    let next = scope.fresh_state();
                    bindings.push((next.clone(), HsExpr::atom(text)));
                    current = next;
                }
                Emit::Bind(name, value) => bindings.push((name, HsExpr::atom(value))),
                Emit::Terminal(text) => return HsExpr::let_in(bindings, HsExpr::atom(text)),
            }
        }
    }

    HsExpr::let_in(bindings, HsExpr::atom(current))
}

/// Threads one branch followed by `rest`. Locals of the branch stay local.
fn branch<'s>(
    scope: &mut FunctionScope,
    statement: Option<&'s Statement>,
    rest: &[Item<'s>],
    current: &str,
) -> HsExpr {
    let snapshot = scope.snapshot();
    let mut items = statement.map(|s| items_of([s])).unwrap_or_default();
    items.extend_from_slice(rest);
    let expr = thread(scope, &items, current);
    scope.restore(snapshot);
    expr
}

fn placeholder(current: &str, expr: &Expression) -> Vec<Emit> {
    debug!("Unsupported statement `{}`", expr);
    vec![Emit::State(unsupported_state(current, &expr.to_string()))]
}

fn expression_step(scope: &mut FunctionScope, expr: &Expression, current: &str) -> Vec<Emit> {
    if let Some(transfer) = value_transfer(scope, expr) {
        return vec![Emit::State(transfer.translate(scope, current))];
    }
    match expr {
        Expression::Call { callee, args, .. } => call_step(scope, expr, callee, args, current),
        Expression::Assign(op, target, value) => assignment_step(scope, *op, target, value, current),
        Expression::Unary(op, target) => match op {
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => {
                update_step(scope, target, Some(BinaryOp::Add), &Expression::number("1"), current)
            }
            UnaryOp::PreDecrement | UnaryOp::PostDecrement => {
                update_step(scope, target, Some(BinaryOp::Sub), &Expression::number("1"), current)
            }
            UnaryOp::Delete => delete_step(scope, target, current),
            UnaryOp::Not | UnaryOp::Neg => placeholder(current, expr),
        },
        _ => placeholder(current, expr),
    }
}

fn call_step(
    scope: &mut FunctionScope,
    expr: &Expression,
    callee: &Expression,
    args: &[Expression],
    current: &str,
) -> Vec<Emit> {
    match callee {
        Expression::Identifier(name) if !scope.is_value_binding(name) => match name.as_str() {
            "require" => match args.split_first() {
                Some((condition, message)) => vec![Emit::State(format!(
                    "if {} then {} else revert {}",
                    translate_expression(scope, condition, current),
                    current,
                    revert_message(message)
                ))],
                None => Vec::new(),
            },
            "assert" => Vec::new(),
            "revert" => vec![Emit::Terminal(format!("revert {}", revert_message(args)))],
            function => match scope.callee(function) {
                Some(info) if info.is_read_only() => Vec::new(),
                _ => state_call(scope, expr, current),
            },
        },
        Expression::Member(target, method) => match target.as_ref() {
            Expression::Identifier(instance) => match scope.instance(instance) {
                Some(contract) => instance_call(scope, expr, instance, &contract, method, current),
                // `this.f(..)` and untracked receivers call into this contract.
                None => match scope.callee(method) {
                    Some(info) if info.is_read_only() => Vec::new(),
                    _ => state_call(scope, expr, current),
                },
            },
            _ => placeholder(current, expr),
        },
        _ => placeholder(current, expr),
    }
}

/// A call whose result is the next state.
fn state_call(scope: &FunctionScope, expr: &Expression, current: &str) -> Vec<Emit> {
    let text = translate_expression(scope, expr, current);
    if super::haskell::has_placeholder(&text) {
        placeholder(current, expr)
    } else {
        vec![Emit::State(unwrap_group(text))]
    }
}

/// `inst.method(args)` on a contract-typed value. Read-only callees change
/// nothing; mutating ones replace the instance with the callee's result.
fn instance_call(
    scope: &mut FunctionScope,
    expr: &Expression,
    instance: &str,
    contract: &str,
    method: &str,
    current: &str,
) -> Vec<Emit> {
    let model = scope.contract_model(contract);
    let read_only = match model.and_then(|m| m.function(method)) {
        Some(info) => info.is_read_only(),
        // Public state variables are read through generated getters.
        None => model.map_or(false, |m| m.state.name_map.contains_key(method)),
    };
    if read_only {
        return Vec::new();
    }
    let updated = translate_expression(scope, expr, current);
    if let Some(field) = scope.state_field(instance) {
        return vec![Emit::State(format!(
            "{} {{ {} = {} }}",
            current, field.name, updated
        ))];
    }
    let name = scope.rebind(instance);
    vec![Emit::Bind(name, unwrap_group(updated))]
}

fn field_update(current: &str, field: &str, value: &str) -> Emit {
    Emit::State(format!("{} {{ {} = {} }}", current, field, value))
}

/// Field targeted by `x` or `this.x`, unless a local shadows it.
fn target_field(scope: &FunctionScope, target: &Expression) -> Option<String> {
    match target {
        Expression::Identifier(name) => scope.state_field(name).map(|v| v.name.clone()),
        Expression::Member(base, member) => match base.as_ref() {
            Expression::Identifier(this) if this == "this" => {
                scope.state().field(member).map(|v| v.name.clone())
            }
            _ => None,
        },
        _ => None,
    }
}

fn assignment_step(
    scope: &mut FunctionScope,
    op: AssignOp,
    target: &Expression,
    value: &Expression,
    current: &str,
) -> Vec<Emit> {
    if let (AssignOp::Assign, Expression::Tuple(targets), Expression::Tuple(values)) =
        (op, target, value)
    {
        return tuple_assignment(scope, targets, values, current);
    }
    update_step(scope, target, op.arithmetic(), value, current)
}

/// Assigns `target = value`, or `target = target op value` for compound forms.
fn update_step(
    scope: &mut FunctionScope,
    target: &Expression,
    op: Option<BinaryOp>,
    value: &Expression,
    current: &str,
) -> Vec<Emit> {
    let rhs = translate_expression(scope, value, current);
    let combine = |old: String| match op {
        Some(op) => format!("({} {} {})", old, binary_operator(op), rhs),
        None => rhs.clone(),
    };
    match target {
        Expression::Identifier(name) if scope.is_value_binding(name) => {
            let new_value = combine(translate_expression(scope, target, current));
            let emitted = scope.rebind(name);
            vec![Emit::Bind(emitted, new_value)]
        }
        _ => match target_field(scope, target) {
            Some(field) => {
                let new_value = combine(format!("({} {})", field, current));
                vec![field_update(current, &field, &new_value)]
            }
            None => placeholder(current, &Expression::Assign(
                AssignOp::Assign,
                Box::new(target.clone()),
                Box::new(value.clone()),
            )),
        },
    }
}

/// `(a, b) = (x, y)` on locals: every right-hand side is read before any
/// name is rebound.
fn tuple_assignment(
    scope: &mut FunctionScope,
    targets: &[Option<Expression>],
    values: &[Option<Expression>],
    current: &str,
) -> Vec<Emit> {
    let pairs: Option<Vec<(&str, &Expression)>> = targets
        .iter()
        .zip(values)
        .map(|pair| match pair {
            (Some(Expression::Identifier(name)), Some(value)) if scope.is_value_binding(name) => {
                Some((name.as_str(), value))
            }
            _ => None,
        })
        .collect();
    let pairs = match pairs {
        Some(pairs) if targets.len() == values.len() => pairs,
        _ => {
            let expr = Expression::Assign(
                AssignOp::Assign,
                Box::new(Expression::Tuple(targets.to_vec())),
                Box::new(Expression::Tuple(values.to_vec())),
            );
            return placeholder(current, &expr);
        }
    };
    let values: Vec<String> = pairs
        .iter()
        .map(|(_, value)| translate_expression(scope, value, current))
        .collect();
    pairs
        .iter()
        .zip(values)
        .map(|((name, _), value)| Emit::Bind(scope.rebind(name), value))
        .collect()
}

fn delete_step(scope: &mut FunctionScope, target: &Expression, current: &str) -> Vec<Emit> {
    let deleted = || Expression::Unary(UnaryOp::Delete, Box::new(target.clone()));
    if let Expression::Identifier(name) = target {
        if scope.is_value_binding(name) {
            let zero = scope
                .value_type(name)
                .and_then(|ty| scope.state().zero_value(&ty));
            return match zero {
                Some(value) => vec![Emit::Bind(scope.rebind(name), value)],
                None => placeholder(current, &deleted()),
            };
        }
    }
    let state = scope.state();
    let cleared = target_field(scope, target)
        .and_then(|field| state.variables.iter().find(|v| v.name == field))
        .and_then(|var| state.zero_value(&var.ty).map(|value| (var, value)));
    match cleared {
        Some((var, value)) => vec![field_update(current, &var.name, &value)],
        None => placeholder(current, &deleted()),
    }
}

/// Value a declared but uninitialized local starts with.
fn initial_value(scope: &FunctionScope, ty: &LiquidType, name: &str) -> String {
    scope
        .state()
        .zero_value(ty)
        .unwrap_or_else(|| unsupported_value(&format!("no default for {}", name)))
}

fn declaration_step(
    scope: &mut FunctionScope,
    declarations: &[Option<LocalDeclaration>],
    initial: Option<&Expression>,
    current: &str,
) -> Vec<Emit> {
    let mut emits = Vec::new();

    // `(bool ok, ) = to.call{value: v}("")` performs the transfer; the
    // modeled transfer always succeeds.
    if let Some(transfer) = initial.and_then(|expr| value_transfer(scope, expr)) {
        emits.push(Emit::State(transfer.translate(scope, current)));
        for declaration in declarations.iter().flatten() {
            let ty = scope.map_type(&declaration.type_name);
            let value = match ty {
                LiquidType::Bool => "True".to_string(),
                _ => initial_value(scope, &ty, &declaration.name),
            };
            emits.push(Emit::Bind(scope.bind_local(&declaration.name, Some(ty)), value));
        }
        return emits;
    }

    let value = initial.map(|expr| translate_expression(scope, expr, current));
    match declarations {
        [Some(declaration)] => {
            let ty = scope.map_type(&declaration.type_name);
            let value = value.unwrap_or_else(|| initial_value(scope, &ty, &declaration.name));
            emits.push(Emit::Bind(scope.bind_local(&declaration.name, Some(ty)), value));
        }
        _ => {
            let value = value.unwrap_or_else(|| unsupported_value("uninitialized tuple"));
            let names: Vec<String> = declarations
                .iter()
                .map(|slot| match slot {
                    Some(declaration) => {
                        let ty = scope.map_type(&declaration.type_name);
                        scope.bind_local(&declaration.name, Some(ty))
                    }
                    None => "_".to_string(),
                })
                .collect();
            emits.push(Emit::Bind(format!("({})", names.join(", ")), value));
        }
    }
    emits
}

/// Zero value of the declared return type, used when a read-only body
/// falls off its end.
fn default_result(scope: &FunctionScope) -> String {
    scope
        .function
        .return_type
        .as_ref()
        .and_then(|ty| scope.state().zero_value(ty))
        .unwrap_or_else(|| unsupported_value("missing return value"))
}

fn fold_value(scope: &mut FunctionScope, items: &[Item]) -> HsExpr {
    let mut bindings: Vec<(String, HsExpr)> = Vec::new();
    let mut blocks = Blocks::default();

    for (idx, item) in items.iter().enumerate() {
        let statement = match blocks.visit(scope, *item) {
            Some(statement) => statement,
            None => continue,
        };
        let rest = &items[idx + 1..];
        match statement {
            Statement::Return(Some(expr)) => {
                let value = translate_expression(scope, expr, INCOMING_STATE);
                return HsExpr::let_in(bindings, HsExpr::atom(value));
            }
            Statement::Return(None) => {
                return HsExpr::let_in(bindings, HsExpr::atom(default_result(scope)));
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = translate_expression(scope, condition, INCOMING_STATE);
                let then_rest = if then_branch.always_returns() { &[][..] } else { rest };
                let else_rest = match else_branch {
                    Some(e) if e.always_returns() => &[][..],
                    _ => rest,
                };
                let then_value = value_branch(scope, Some(then_branch.as_ref()), then_rest);
                let else_value = value_branch(scope, else_branch.as_deref(), else_rest);
                return HsExpr::let_in(
                    bindings,
                    HsExpr::if_then_else(condition, then_value, else_value),
                );
            }
            Statement::Expression(expr) => match expr {
                Expression::Call { callee, args, .. }
                    if matches!(callee.as_ref(), Expression::Identifier(name)
                        if name == "require" && !scope.is_value_binding(name)) =>
                {
                    let (condition, message) = match args.split_first() {
                        Some(split) => split,
                        None => continue,
                    };
                    let condition = translate_expression(scope, condition, INCOMING_STATE);
                    let guarded = fold_value(scope, rest);
                    let failed = HsExpr::atom(format!("revert {}", revert_message(message)));
                    return HsExpr::let_in(
                        bindings,
                        HsExpr::if_then_else(condition, guarded, failed),
                    );
                }
                Expression::Call { callee, args, .. }
                    if matches!(callee.as_ref(), Expression::Identifier(name)
                        if name == "revert" && !scope.is_value_binding(name)) =>
                {
                    let failed = format!("revert {}", revert_message(args));
                    return HsExpr::let_in(bindings, HsExpr::atom(failed));
                }
                _ => {
                    for emit in expression_step(scope, expr, INCOMING_STATE) {
                        if let Emit::Bind(name, value) = emit {
                            bindings.push((name, HsExpr::atom(value)));
                        } else {
                            debug!("Statement `{}` has no effect on the result", expr);
                        }
                    }
                }
            },
            Statement::VariableDeclaration {
                declarations,
                initial_value,
            } => {
                for emit in declaration_step(scope, declarations, initial_value.as_ref(), INCOMING_STATE) {
                    if let Emit::Bind(name, value) = emit {
                        bindings.push((name, HsExpr::atom(value)));
                    }
                }
            }
            Statement::Emit(_) => {}
            Statement::Loop(_) | Statement::Break | Statement::Continue => {
                let text = unsupported_value(statement_kind(statement));
                return HsExpr::let_in(bindings, HsExpr::atom(text));
            }
            // Spliced in as markers by `items_of`.
            Statement::Block(_) => {}
        }
    }

    HsExpr::let_in(bindings, HsExpr::atom(default_result(scope)))
}

fn statement_kind(statement: &Statement) -> &'static str {
    match statement {
        Statement::Loop(_) => "loop",
        Statement::Break => "break",
        Statement::Continue => "continue",
        _ => "statement",
    }
}

fn value_branch<'s>(
    scope: &mut FunctionScope,
    statement: Option<&'s Statement>,
    rest: &[Item<'s>],
) -> HsExpr {
    let snapshot = scope.snapshot();
    let mut items = statement.map(|s| items_of([s])).unwrap_or_default();
    items.extend_from_slice(rest);
    let value = fold_value(scope, &items);
    scope.restore(snapshot);
    value
}

/// Builds a constructor body: the initial state record, followed by
/// whatever could not be folded into it.
pub fn translate_constructor(scope: &mut FunctionScope) -> HsExpr {
    let state = scope.state();
    let function = scope.function;
    let mut values: HashMap<String, String> = HashMap::new();
    let mut pending: Vec<Statement> = Vec::new();

    for (field, init) in &state.initializers {
        let original = state
            .variables
            .iter()
            .find(|v| &v.name == field)
            .map(|v| v.original_name.clone())
            .unwrap_or_else(|| field.clone());
        if reads_state(scope, init) {
            pending.push(Statement::Expression(Expression::Assign(
                AssignOp::Assign,
                Box::new(Expression::member(Expression::identifier("this"), &original)),
                Box::new(init.clone()),
            )));
        } else {
            values.insert(field.clone(), translate_expression(scope, init, INCOMING_STATE));
        }
    }

    let mut folded = 0;
    if pending.is_empty() {
        for statement in &function.body {
            let (target, value) = match statement {
                Statement::Expression(Expression::Assign(AssignOp::Assign, target, value)) => {
                    (target, value)
                }
                _ => break,
            };
            let field = match target.as_ref() {
                Expression::Identifier(name) => scope.state_field(name),
                _ => None,
            };
            match field {
                Some(var) if state.declared().any(|d| d.name == var.name) && !reads_state(scope, value) => {
                    values.insert(var.name.clone(), translate_expression(scope, value, INCOMING_STATE));
                    folded += 1;
                }
                _ => break,
            }
        }
    }

    let record = state_record(scope, &values);
    let rest: Vec<&Statement> = pending.iter().chain(function.body[folded..].iter()).collect();
    let threaded = thread(scope, &items_of(rest), INCOMING_STATE);
    if threaded == HsExpr::atom(INCOMING_STATE) {
        HsExpr::atom(record)
    } else {
        threaded.prepend_binding(INCOMING_STATE, HsExpr::atom(record))
    }
}

/// The initial record literal of a constructor.
fn state_record(scope: &FunctionScope, values: &HashMap<String, String>) -> String {
    let state = scope.state();
    let implicit = [
        super::scope::CONSTRUCTOR_MSG.to_string(),
        super::scope::CONSTRUCTOR_BLOCK.to_string(),
        "0".to_string(),
        format!("fromString {:?}", state.contract_name),
    ];
    let fields: Vec<(String, String)> = state
        .variables
        .iter()
        .take(implicit.len())
        .zip(implicit.iter())
        .map(|(var, value)| (var.name.clone(), value.clone()))
        .chain(state.declared().map(|var| {
            let value = values
                .get(&var.name)
                .cloned()
                .unwrap_or_else(|| initial_value(scope, &var.ty, &var.original_name));
            (var.name.clone(), value)
        }))
        .collect();

    let mut lines = vec![state.state_type()];
    for (idx, (name, value)) in fields.iter().enumerate() {
        let lead = if idx == 0 { "  { " } else { "  , " };
        lines.push(format!("{}{} = {}", lead, name, value));
    }
    if !fields.is_empty() {
        lines.push("  }".to_string());
    }
    lines.join("\n")
}
