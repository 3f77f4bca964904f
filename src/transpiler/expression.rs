//! Expression rewriting. Every function here is total: shapes without a
//! translation become inline placeholders.

use super::ast::{BinaryOp, Expression, UnaryOp};
use super::gather::{constructor_name, normalize_identifier};
use super::haskell::{atom, string_literal, unsupported_value};
use super::scope::{Environment, FunctionScope};
use super::types::LiquidType;
use super::ContractModel;
use log::debug;

/// Message used when a `require` or `revert` carries no string.
pub const DEFAULT_REVERT_MESSAGE: &str = "error";

const CAST_FUNCTIONS: &[&str] = &["address", "payable", "bool", "string"];

const OPAQUE_BUILTINS: &[&str] = &[
    "keccak256", "sha256", "ripemd160", "ecrecover", "blockhash", "gasleft", "addmod",
    "mulmod", "selfdestruct", "type", "require", "assert",
];

/// Builtin objects whose members have no translation as method calls.
const GLOBAL_NAMESPACES: &[&str] = &["abi", "msg", "block", "tx"];

/// `uint`, `int` and their sized variants.
fn is_integer_type(name: &str) -> bool {
    let size = name.strip_prefix("uint").or_else(|| name.strip_prefix("int"));
    matches!(size, Some(size) if size.chars().all(|c| c.is_ascii_digit()))
}

fn is_cast(name: &str) -> bool {
    CAST_FUNCTIONS.contains(&name) || is_integer_type(name)
}

fn is_opaque(name: &str) -> bool {
    OPAQUE_BUILTINS.contains(&name) || name.starts_with("bytes")
}

/// Haskell spelling of a binary operator.
pub fn binary_operator(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "`div`",
        BinaryOp::Mod => "`mod`",
        BinaryOp::Pow => "^",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "/=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

/// Translates `expr`, reading state through the binding `current`.
pub fn translate_expression(scope: &FunctionScope, expr: &Expression, current: &str) -> String {
    match expr {
        Expression::Number { value, unit } => number_literal(value, unit.as_deref()),
        Expression::Bool(true) => "True".to_string(),
        Expression::Bool(false) => "False".to_string(),
        Expression::Str(value) => string_literal(value),
        Expression::Identifier(name) => identifier(scope, name, current),
        Expression::Member(base, member) => member_access(scope, base, member, current),
        Expression::Call {
            callee,
            options,
            args,
        } => {
            if let Some(transfer) = value_transfer(scope, expr) {
                return format!("({})", transfer.translate(scope, current));
            }
            call(scope, callee, options.is_empty(), args, current)
        }
        Expression::Unary(UnaryOp::Not, operand) => {
            format!("(not {})", atom(translate_expression(scope, operand, current)))
        }
        Expression::Unary(UnaryOp::Neg, operand) => {
            format!("(negate {})", atom(translate_expression(scope, operand, current)))
        }
        Expression::Binary(op, left, right) => format!(
            "({} {} {})",
            translate_expression(scope, left, current),
            binary_operator(*op),
            translate_expression(scope, right, current)
        ),
        Expression::Conditional(condition, then, otherwise) => format!(
            "(if {} then {} else {})",
            translate_expression(scope, condition, current),
            translate_expression(scope, then, current),
            translate_expression(scope, otherwise, current)
        ),
        Expression::Tuple(items) if items.iter().all(Option::is_some) => {
            let items: Vec<String> = items
                .iter()
                .flatten()
                .map(|item| translate_expression(scope, item, current))
                .collect();
            format!("({})", items.join(", "))
        }
        Expression::Tuple(_)
        | Expression::Index(..)
        | Expression::New(_)
        | Expression::Unary(..)
        | Expression::Assign(..) => unsupported(expr),
    }
}

fn unsupported(expr: &Expression) -> String {
    debug!("Unsupported expression `{}`", expr);
    unsupported_value(&expr.to_string())
}

fn identifier(scope: &FunctionScope, name: &str, current: &str) -> String {
    if let Some(local) = scope.local(name) {
        return local.emitted.clone();
    }
    if let Some(param) = scope.param(name) {
        return param.name.clone();
    }
    match (scope.env, name) {
        (Environment::Constructor, "msg") => return scope.msg_context(current),
        (Environment::Constructor, "block") => return scope.block_context(current),
        _ => {}
    }
    if let Some(var) = scope.state().field(name) {
        return format!("({} {})", var.name, current);
    }
    match name {
        "this" => scope.this_address(current),
        "now" => format!("(timestamp {})", scope.block_context(current)),
        _ => {
            debug!("Unresolved identifier `{}`", name);
            unsupported_value(name)
        }
    }
}

/// Whether `name` is one of the environment globals rather than a binding.
fn is_global(scope: &FunctionScope, name: &str, global: &str) -> bool {
    name == global && !scope.is_value_binding(name) && scope.state().name_map.get(name).is_none()
}

fn member_access(scope: &FunctionScope, base: &Expression, member: &str, current: &str) -> String {
    if let Expression::Identifier(name) = base {
        if is_global(scope, name, "msg") {
            match member {
                "sender" | "value" => {
                    return format!("({} {})", member, scope.msg_context(current))
                }
                _ => {}
            }
        }
        if is_global(scope, name, "block") {
            match member {
                "number" | "timestamp" => {
                    return format!("({} {})", member, scope.block_context(current))
                }
                _ => {}
            }
        }
        if let Some(def) = scope.state().find_enum(name) {
            if let Some(found) = def.members.iter().find(|m| m.original_name == member) {
                return found.name.clone();
            }
        }
        if name == "this" {
            if let Some(var) = scope.state().field(member) {
                return format!("({} {})", var.name, current);
            }
        }
        if let Some(contract) = scope.instance(name) {
            let field = scope
                .contract_model(&contract)
                .and_then(|model| model.state.name_map.get(member));
            if let Some(field) = field {
                return format!("({} {})", field, atom(identifier(scope, name, current)));
            }
        }
    }
    if member == "balance" {
        return scope.balance(current);
    }
    unsupported(&Expression::member(base.clone(), member))
}

/// Emitted name of `contract`'s function `name`, which may have been
/// renamed to keep top-level names unique.
fn function_name(contract: &ContractModel, name: &str) -> String {
    contract
        .function(name)
        .map(|f| f.name.clone())
        .unwrap_or_else(|| normalize_identifier(name))
}

fn arguments(scope: &FunctionScope, args: &[Expression], current: &str) -> String {
    args.iter()
        .map(|arg| format!(" {}", atom(translate_expression(scope, arg, current))))
        .collect()
}

fn call(
    scope: &FunctionScope,
    callee: &Expression,
    plain: bool,
    args: &[Expression],
    current: &str,
) -> String {
    let rebuilt = || Expression::Call {
        callee: Box::new(callee.clone()),
        options: Vec::new(),
        args: args.to_vec(),
    };
    match callee {
        Expression::Identifier(name) if scope.is_value_binding(name) => unsupported(&rebuilt()),
        Expression::Identifier(name) => match (name.as_str(), args) {
            ("revert", _) => format!("(revert {})", revert_message(args)),
            ("address", [Expression::Identifier(this)]) if this == "this" => {
                scope.this_address(current)
            }
            (cast, [arg]) if is_cast(cast) => translate_expression(scope, arg, current),
            (builtin, _) if is_opaque(builtin) || is_cast(builtin) => {
                unsupported(&rebuilt())
            }
            (other, _)
                if scope.state().find_enum(other).is_some()
                    || scope.contract_model(other).is_some() =>
            {
                unsupported(&rebuilt())
            }
            (function, _) => format!(
                "({} {}{})",
                function_name(scope.contract, function),
                current,
                arguments(scope, args, current)
            ),
        },
        Expression::Member(target, method) if plain => {
            method_call(scope, target, method, args, current).unwrap_or_else(|| unsupported(&rebuilt()))
        }
        Expression::New(type_name) => {
            let name = type_name.to_string();
            let contract = name.rsplit('.').next().unwrap_or(&name);
            format!(
                "({} {} {}{})",
                constructor_name(contract),
                scope.msg_context(current),
                scope.block_context(current),
                arguments(scope, args, current)
            )
        }
        _ => unsupported(&rebuilt()),
    }
}

fn method_call(
    scope: &FunctionScope,
    target: &Expression,
    method: &str,
    args: &[Expression],
    current: &str,
) -> Option<String> {
    let name = match target {
        Expression::Identifier(name) => name,
        _ => return None,
    };
    if GLOBAL_NAMESPACES.contains(&name.as_str()) && !scope.is_value_binding(name) {
        return None;
    }
    let contract = match scope.instance(name) {
        Some(contract) => contract,
        // `this` and receivers of unknown type resolve against this contract.
        None => {
            return Some(format!(
                "({} {}{})",
                function_name(scope.contract, method),
                current,
                arguments(scope, args, current)
            ))
        }
    };
    let instance = atom(identifier(scope, name, current));
    let model = scope.contract_model(&contract);
    let getter = model
        .filter(|m| m.function(method).is_none())
        .and_then(|m| m.state.name_map.get(method));
    Some(match getter {
        Some(field) if args.is_empty() => format!("({} {})", field, instance),
        _ => format!(
            "({} {}{})",
            model.map_or_else(|| normalize_identifier(method), |m| function_name(m, method)),
            instance,
            arguments(scope, args, current)
        ),
    })
}

/// The message of `revert(...)` or the second argument of `require`.
pub fn revert_message(args: &[Expression]) -> String {
    match args.first() {
        Some(Expression::Str(message)) => string_literal(message),
        _ => string_literal(DEFAULT_REVERT_MESSAGE),
    }
}

/// A value transfer to an address: `to.call{value: v}(...)`,
/// `to.transfer(v)` or `to.send(v)`.
#[derive(Debug, Clone, Copy)]
pub struct Transfer<'e> {
    pub target: &'e Expression,
    pub amount: Option<&'e Expression>,
}

impl<'e> Transfer<'e> {
    /// `call<C> cur (to) (amount)`; a missing amount transfers nothing.
    pub fn translate(&self, scope: &FunctionScope, current: &str) -> String {
        let amount = self
            .amount
            .map(|amount| atom(translate_expression(scope, amount, current)))
            .unwrap_or_else(|| "0".to_string());
        format!(
            "{} {} {} {}",
            scope.state().transfer_helper(),
            current,
            atom(translate_expression(scope, self.target, current)),
            amount
        )
    }
}

pub fn value_transfer<'e>(scope: &FunctionScope, expr: &'e Expression) -> Option<Transfer<'e>> {
    let (callee, options, args) = match expr {
        Expression::Call {
            callee,
            options,
            args,
        } => (callee, options, args),
        _ => return None,
    };
    let (target, method) = match callee.as_ref() {
        Expression::Member(target, method) => (target.as_ref(), method.as_str()),
        _ => return None,
    };
    match method {
        "call" => {
            let amount = options
                .iter()
                .find(|(name, _)| name == "value")
                .map(|(_, value)| value);
            if amount.is_some() || is_address(scope, target) {
                Some(Transfer { target, amount })
            } else {
                None
            }
        }
        "transfer" | "send" if args.len() == 1 && is_address(scope, target) => Some(Transfer {
            target,
            amount: args.first(),
        }),
        _ => None,
    }
}

/// Whether `expr` statically denotes an address.
pub fn is_address(scope: &FunctionScope, expr: &Expression) -> bool {
    match expr {
        Expression::Call { callee, .. } => matches!(
            callee.as_ref(),
            Expression::Identifier(name) if name == "payable" || name == "address"
        ),
        Expression::Member(base, member) => match (base.as_ref(), member.as_str()) {
            (Expression::Identifier(name), "sender") => is_global(scope, name, "msg"),
            (Expression::Identifier(name), "origin") => name == "tx",
            (Expression::Identifier(name), field) if name == "this" => {
                scope.state().field(field).map(|v| &v.ty) == Some(&LiquidType::Address)
            }
            _ => false,
        },
        Expression::Identifier(name) => scope.value_type(name) == Some(LiquidType::Address),
        _ => false,
    }
}

/// Whether evaluating `expr` needs the threaded state record.
pub fn reads_state(scope: &FunctionScope, expr: &Expression) -> bool {
    let constructor = scope.env == Environment::Constructor;
    match expr {
        Expression::Number { .. } | Expression::Bool(_) | Expression::Str(_) => false,
        Expression::Identifier(name) => {
            if scope.is_value_binding(name) {
                false
            } else if constructor && matches!(name.as_str(), "msg" | "block" | "this") {
                scope.state().name_map.contains_key(name)
            } else {
                scope.state().field(name).is_some() || name == "this" || name == "now"
            }
        }
        Expression::Member(base, member) => {
            member == "balance"
                || match base.as_ref() {
                    Expression::Identifier(name) if scope.state().find_enum(name).is_some() => false,
                    Expression::Identifier(name) if name == "this" => true,
                    other => reads_state(scope, other),
                }
        }
        Expression::Call { callee, args, .. } => {
            let args_read = args.iter().any(|arg| reads_state(scope, arg));
            match callee.as_ref() {
                Expression::Identifier(name) if is_cast(name) => args_read,
                Expression::New(_) => !constructor || args_read,
                _ => true,
            }
        }
        Expression::Unary(_, operand) => reads_state(scope, operand),
        Expression::Binary(_, left, right) | Expression::Assign(_, left, right) => {
            reads_state(scope, left) || reads_state(scope, right)
        }
        Expression::Conditional(c, t, e) => {
            reads_state(scope, c) || reads_state(scope, t) || reads_state(scope, e)
        }
        Expression::Tuple(items) => items.iter().flatten().any(|item| reads_state(scope, item)),
        Expression::Index(..) | Expression::New(_) => true,
    }
}

/// Every identifier `expr` mentions, in source order.
pub fn mentioned_identifiers(expr: &Expression) -> Vec<&str> {
    let mut names = Vec::new();
    expr.walk(&mut |e| {
        if let Expression::Identifier(name) = e {
            names.push(name.as_str());
        }
    });
    names
}

fn unit_multiplier(unit: &str) -> Option<u128> {
    let multiplier = match unit {
        "wei" | "seconds" => 1,
        "gwei" => 1_000_000_000,
        "szabo" => 1_000_000_000_000,
        "finney" => 1_000_000_000_000_000,
        "ether" => 1_000_000_000_000_000_000,
        "minutes" => 60,
        "hours" => 3_600,
        "days" => 86_400,
        "weeks" => 604_800,
        _ => return None,
    };
    Some(multiplier)
}

/// Decimal rendering of a literal, with any unit applied.
pub fn number_literal(value: &str, unit: Option<&str>) -> String {
    let multiplier = unit.and_then(unit_multiplier).unwrap_or(1);
    match exact_value(value, multiplier) {
        Some(scaled) => scaled.to_string(),
        None if multiplier == 1 => value.to_string(),
        None => format!("({} * {})", value, multiplier),
    }
}

/// `value * multiplier` when it is a whole number that fits in `u128`.
fn exact_value(value: &str, multiplier: u128) -> Option<u128> {
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        return u128::from_str_radix(hex, 16).ok()?.checked_mul(multiplier);
    }
    let (mantissa, exponent) = match value.split_once(|c: char| c == 'e' || c == 'E') {
        Some((m, e)) => (m, e.parse::<i32>().ok()?),
        None => (value, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits: u128 = format!("{}{}", whole, fraction).parse().ok()?;
    let scale = exponent - fraction.len() as i32;
    let product = digits.checked_mul(multiplier)?;
    if scale >= 0 {
        product.checked_mul(10u128.checked_pow(scale as u32)?)
    } else {
        let divisor = 10u128.checked_pow(scale.unsigned_abs())?;
        if product % divisor == 0 {
            Some(product / divisor)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_units() {
        assert_eq!(number_literal("42", None), "42");
        assert_eq!(number_literal("1", Some("ether")), "1000000000000000000");
        assert_eq!(number_literal("0.5", Some("ether")), "500000000000000000");
        assert_eq!(number_literal("2", Some("days")), "172800");
        assert_eq!(number_literal("1e3", None), "1000");
        assert_eq!(number_literal("0xff", None), "255");
    }

    #[test]
    fn test_oversized_literals_pass_through() {
        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(number_literal(max, None), max);
    }

    #[test]
    fn test_operator_spelling() {
        assert_eq!(binary_operator(BinaryOp::Ne), "/=");
        assert_eq!(binary_operator(BinaryOp::Div), "`div`");
        assert_eq!(binary_operator(BinaryOp::Mod), "`mod`");
        assert_eq!(binary_operator(BinaryOp::Pow), "^");
    }

    #[test]
    fn test_revert_message_defaults() {
        assert_eq!(revert_message(&[]), "\"error\"");
        assert_eq!(revert_message(&[Expression::Str("no".into())]), "\"no\"");
    }
}
