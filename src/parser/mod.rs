use crate::error::{malformed, Result};
use crate::transpiler::ast::*;
use log::{debug, trace};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "parser/solidity.pest"]
pub struct SolidityParser;

/// Parses a whole source unit; contracts come back in declaration order.
pub fn parse(source: &str) -> Result<SourceUnit> {
    let mut pairs = SolidityParser::parse(Rule::source_unit, source)?;
    let unit_pair = pairs
        .next()
        .ok_or_else(|| malformed("Invalid source unit structure"))?;

    let mut unit = SourceUnit::default();
    for pair in unit_pair.into_inner() {
        match pair.as_rule() {
            Rule::contract_definition => {
                let contract = parse_contract(pair)?;
                debug!(
                    "Parsed contract {} ({} declarations)",
                    contract.name,
                    contract.parts.len()
                );
                unit.contracts.push(contract);
            }
            Rule::pragma_directive | Rule::import_directive => {
                trace!("Skipping directive: {}", pair.as_str());
            }
            _ => {}
        }
    }
    Ok(unit)
}

fn parse_contract(pair: Pair<Rule>) -> Result<Contract> {
    let mut contract = Contract {
        name: String::new(),
        kind: ContractKind::Contract,
        bases: Vec::new(),
        parts: Vec::new(),
    };

    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::contract_kind => {
                let text = item.as_str();
                contract.kind = if text.starts_with("abstract") {
                    ContractKind::Abstract
                } else if text == "interface" {
                    ContractKind::Interface
                } else if text == "library" {
                    ContractKind::Library
                } else {
                    ContractKind::Contract
                };
            }
            Rule::identifier => contract.name = item.as_str().to_string(),
            Rule::inheritance_specifier => {
                contract.bases = item
                    .into_inner()
                    .filter(|p| p.as_rule() == Rule::user_type)
                    .map(|p| p.as_str().to_string())
                    .collect();
            }
            Rule::state_variable_declaration => {
                contract
                    .parts
                    .push(ContractPart::StateVariable(parse_state_variable(item)?));
            }
            Rule::enum_definition => {
                contract.parts.push(ContractPart::Enum(parse_enum(item)?));
            }
            Rule::struct_definition => {
                contract.parts.push(ContractPart::Struct(parse_struct(item)?));
            }
            Rule::event_definition => {
                contract.parts.push(ContractPart::Event(parse_event(item)?));
            }
            Rule::modifier_definition => {
                let name = first_identifier(item)?;
                contract.parts.push(ContractPart::Modifier(name));
            }
            Rule::using_directive => {
                contract
                    .parts
                    .push(ContractPart::Using(item.as_str().to_string()));
            }
            Rule::function_definition
            | Rule::constructor_definition
            | Rule::fallback_definition => {
                contract.parts.push(ContractPart::Function(parse_function(item)?));
            }
            _ => {}
        }
    }

    if contract.name.is_empty() {
        return Err(malformed("Contract name not found"));
    }
    Ok(contract)
}

fn first_identifier(pair: Pair<Rule>) -> Result<String> {
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::identifier)
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| malformed("Declaration name not found"))
}

fn parse_state_variable(pair: Pair<Rule>) -> Result<StateVariable> {
    let mut type_name = None;
    let mut name = None;
    let mut visibility = None;
    let mut is_constant = false;
    let mut is_immutable = false;
    let mut initial_value = None;

    for token in pair.into_inner() {
        match token.as_rule() {
            Rule::type_name => type_name = Some(parse_type_name(token)?),
            Rule::visibility => visibility = Some(token.as_str().to_string()),
            Rule::constant_modifier => is_constant = true,
            Rule::immutable_modifier => is_immutable = true,
            Rule::identifier => name = Some(token.as_str().to_string()),
            Rule::expression => initial_value = Some(parse_expression(token)?),
            _ => {}
        }
    }

    Ok(StateVariable {
        name: name.ok_or_else(|| malformed("State variable name not found"))?,
        type_name: type_name.ok_or_else(|| malformed("State variable type not found"))?,
        visibility,
        is_constant,
        is_immutable,
        initial_value,
    })
}

fn parse_enum(pair: Pair<Rule>) -> Result<EnumDefinition> {
    let mut names = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::identifier)
        .map(|p| p.as_str().to_string());
    let name = names.next().ok_or_else(|| malformed("Enum name not found"))?;
    Ok(EnumDefinition {
        name,
        members: names.collect(),
    })
}

fn parse_struct(pair: Pair<Rule>) -> Result<StructDefinition> {
    let mut name = String::new();
    let mut fields = Vec::new();
    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::identifier => name = item.as_str().to_string(),
            Rule::struct_field => {
                let mut inner = item.into_inner();
                let type_pair = inner
                    .next()
                    .ok_or_else(|| malformed("Struct field type not found"))?;
                let field_name = inner.next().map(|p| p.as_str().to_string());
                fields.push(Parameter {
                    type_name: parse_type_name(type_pair)?,
                    name: field_name,
                });
            }
            _ => {}
        }
    }
    Ok(StructDefinition { name, fields })
}

fn parse_event(pair: Pair<Rule>) -> Result<EventDefinition> {
    let mut name = String::new();
    let mut params = Vec::new();
    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::identifier => name = item.as_str().to_string(),
            Rule::parameter_list => params = parse_parameters(item)?,
            _ => {}
        }
    }
    Ok(EventDefinition { name, params })
}

fn parse_function(pair: Pair<Rule>) -> Result<Function> {
    let kind = match pair.as_rule() {
        Rule::constructor_definition => FunctionKind::Constructor,
        Rule::fallback_definition if pair.as_str().starts_with("receive") => FunctionKind::Receive,
        Rule::fallback_definition => FunctionKind::Fallback,
        _ => FunctionKind::Function,
    };

    let mut function = Function {
        kind,
        name: None,
        params: Vec::new(),
        returns: Vec::new(),
        visibility: None,
        mutability: None,
        modifiers: Vec::new(),
        body: None,
    };

    for token in pair.into_inner() {
        match token.as_rule() {
            Rule::identifier => {
                function.name = Some(token.as_str().to_string());
            }
            Rule::parameter_list => {
                function.params = parse_parameters(token)?;
            }
            Rule::visibility => {
                function.visibility = Some(token.as_str().to_string());
            }
            Rule::state_mutability => {
                function.mutability = match token.as_str() {
                    "pure" => Some(Mutability::Pure),
                    "view" | "constant" => Some(Mutability::View),
                    _ => Some(Mutability::Payable),
                };
            }
            Rule::modifier_invocation => {
                function.modifiers.push(first_identifier(token)?);
            }
            Rule::returns_clause => {
                let list = token
                    .into_inner()
                    .next()
                    .ok_or_else(|| malformed("Invalid return type"))?;
                function.returns = parse_parameters(list)?;
            }
            Rule::block => {
                function.body = Some(parse_block(token)?);
            }
            _ => {}
        }
    }

    if kind == FunctionKind::Function && function.name.is_none() {
        return Err(malformed("Function must have a name"));
    }
    debug!(
        "Parsed function {} ({:?})",
        function.name.as_deref().unwrap_or("<unnamed>"),
        kind
    );
    Ok(function)
}

fn parse_parameters(pair: Pair<Rule>) -> Result<Vec<Parameter>> {
    let mut params = Vec::new();
    for param in pair.into_inner() {
        if param.as_rule() != Rule::parameter {
            continue;
        }
        let mut type_name = None;
        let mut name = None;
        for token in param.into_inner() {
            match token.as_rule() {
                Rule::type_name => type_name = Some(parse_type_name(token)?),
                Rule::identifier => name = Some(token.as_str().to_string()),
                _ => {}
            }
        }
        params.push(Parameter {
            type_name: type_name.ok_or_else(|| malformed("Parameter type not found"))?,
            name,
        });
    }
    Ok(params)
}

fn parse_type_name(pair: Pair<Rule>) -> Result<TypeName> {
    let mut inner = pair.into_inner();
    let base = inner
        .next()
        .ok_or_else(|| malformed("Empty type name"))?;

    let mut type_name = match base.as_rule() {
        Rule::elementary_type => {
            // `address payable` collapses to `address`.
            let text = base.as_str().split_whitespace().next().unwrap_or_default();
            TypeName::Elementary(text.to_string())
        }
        Rule::user_type => TypeName::UserDefined(base.as_str().to_string()),
        Rule::mapping_type => {
            let mut types = base
                .into_inner()
                .filter(|p| p.as_rule() == Rule::type_name);
            let key = types
                .next()
                .ok_or_else(|| malformed("Mapping key type not found"))?;
            let value = types
                .next()
                .ok_or_else(|| malformed("Mapping value type not found"))?;
            TypeName::Mapping(
                Box::new(parse_type_name(key)?),
                Box::new(parse_type_name(value)?),
            )
        }
        other => return Err(malformed(format!("Unexpected type rule: {:?}", other))),
    };

    for suffix in inner {
        if suffix.as_rule() == Rule::array_suffix {
            type_name = TypeName::Array(Box::new(type_name));
        }
    }
    Ok(type_name)
}

fn parse_block(pair: Pair<Rule>) -> Result<Vec<Statement>> {
    let mut statements = Vec::new();
    for stmt in pair.into_inner() {
        if stmt.as_rule() == Rule::statement {
            statements.push(parse_statement(stmt)?);
        }
    }
    Ok(statements)
}

fn parse_statement(pair: Pair<Rule>) -> Result<Statement> {
    // Unwrap the `statement` node to the concrete statement kind.
    let stmt = if pair.as_rule() == Rule::statement {
        pair.into_inner()
            .next()
            .ok_or_else(|| malformed("Empty statement"))?
    } else {
        pair
    };
    trace!("Parsing statement of type: {:?}", stmt.as_rule());

    match stmt.as_rule() {
        Rule::block => Ok(Statement::Block(parse_block(stmt)?)),
        Rule::unchecked_block => {
            let block = stmt
                .into_inner()
                .next()
                .ok_or_else(|| malformed("Unchecked block without body"))?;
            Ok(Statement::Block(parse_block(block)?))
        }
        Rule::if_statement => {
            let mut inner = stmt.into_inner();
            let condition = inner
                .next()
                .ok_or_else(|| malformed("If condition not found"))?;
            let then_branch = inner
                .next()
                .ok_or_else(|| malformed("If body not found"))?;
            let else_branch = match inner.next() {
                Some(clause) => {
                    let body = clause
                        .into_inner()
                        .next()
                        .ok_or_else(|| malformed("Else body not found"))?;
                    Some(Box::new(parse_statement(body)?))
                }
                None => None,
            };
            Ok(Statement::If {
                condition: parse_expression(condition)?,
                then_branch: Box::new(parse_statement(then_branch)?),
                else_branch,
            })
        }
        Rule::while_statement => Ok(Statement::Loop(LoopKind::While)),
        Rule::do_while_statement => Ok(Statement::Loop(LoopKind::DoWhile)),
        Rule::for_statement => Ok(Statement::Loop(LoopKind::For)),
        Rule::return_statement => match stmt.into_inner().next() {
            Some(expr) => Ok(Statement::Return(Some(parse_expression(expr)?))),
            None => Ok(Statement::Return(None)),
        },
        Rule::emit_statement => {
            let expr = stmt
                .into_inner()
                .next()
                .ok_or_else(|| malformed("Emitted event not found"))?;
            Ok(Statement::Emit(parse_expression(expr)?))
        }
        Rule::break_statement => Ok(Statement::Break),
        Rule::continue_statement => Ok(Statement::Continue),
        Rule::variable_declaration_statement => {
            let mut declarations = Vec::new();
            let mut initial_value = None;
            for token in stmt.into_inner() {
                match token.as_rule() {
                    Rule::local_declaration => {
                        declarations.push(Some(parse_local_declaration(token)?))
                    }
                    Rule::expression => initial_value = Some(parse_expression(token)?),
                    _ => {}
                }
            }
            Ok(Statement::VariableDeclaration {
                declarations,
                initial_value,
            })
        }
        Rule::tuple_declaration_statement => {
            let mut declarations = Vec::new();
            let mut initial_value = None;
            for token in stmt.into_inner() {
                match token.as_rule() {
                    Rule::tuple_slot => match token.into_inner().next() {
                        Some(decl) => declarations.push(Some(parse_local_declaration(decl)?)),
                        None => declarations.push(None),
                    },
                    Rule::expression => initial_value = Some(parse_expression(token)?),
                    _ => {}
                }
            }
            Ok(Statement::VariableDeclaration {
                declarations,
                initial_value,
            })
        }
        Rule::expression_statement => {
            let expr = stmt
                .into_inner()
                .next()
                .ok_or_else(|| malformed("Expression statement without expression"))?;
            Ok(Statement::Expression(parse_expression(expr)?))
        }
        other => Err(malformed(format!("Unexpected statement rule: {:?}", other))),
    }
}

fn parse_local_declaration(pair: Pair<Rule>) -> Result<LocalDeclaration> {
    let mut type_name = None;
    let mut name = None;
    for token in pair.into_inner() {
        match token.as_rule() {
            Rule::type_name => type_name = Some(parse_type_name(token)?),
            Rule::identifier => name = Some(token.as_str().to_string()),
            _ => {}
        }
    }
    Ok(LocalDeclaration {
        type_name: type_name.ok_or_else(|| malformed("Local variable type not found"))?,
        name: name.ok_or_else(|| malformed("Local variable name not found"))?,
    })
}

fn parse_expression(pair: Pair<Rule>) -> Result<Expression> {
    match pair.as_rule() {
        Rule::expression => {
            let mut inner = pair.into_inner();
            let target = parse_expression(
                inner
                    .next()
                    .ok_or_else(|| malformed("Expression must have at least one term"))?,
            )?;
            match (inner.next(), inner.next()) {
                (Some(op), Some(value)) => {
                    let op = AssignOp::from_symbol(op.as_str())
                        .ok_or_else(|| malformed(format!("Unknown assignment: {}", op.as_str())))?;
                    Ok(Expression::Assign(
                        op,
                        Box::new(target),
                        Box::new(parse_expression(value)?),
                    ))
                }
                _ => Ok(target),
            }
        }
        Rule::conditional => {
            let mut inner = pair.into_inner();
            let condition = parse_expression(
                inner
                    .next()
                    .ok_or_else(|| malformed("Empty conditional expression"))?,
            )?;
            match (inner.next(), inner.next()) {
                (Some(then), Some(otherwise)) => Ok(Expression::Conditional(
                    Box::new(condition),
                    Box::new(parse_expression(then)?),
                    Box::new(parse_expression(otherwise)?),
                )),
                _ => Ok(condition),
            }
        }
        Rule::or_expr
        | Rule::and_expr
        | Rule::equality
        | Rule::comparison
        | Rule::additive
        | Rule::multiplicative => parse_binary_chain(pair),
        Rule::power => {
            // `**` is right associative.
            let operands: Vec<Pair<Rule>> = pair
                .into_inner()
                .filter(|p| p.as_rule() != Rule::power_op)
                .collect();
            let mut operands = operands.into_iter().rev();
            let mut expr = parse_expression(
                operands
                    .next()
                    .ok_or_else(|| malformed("Empty power expression"))?,
            )?;
            for base in operands {
                expr = Expression::binary(BinaryOp::Pow, parse_expression(base)?, expr);
            }
            Ok(expr)
        }
        Rule::unary => {
            let mut prefixes = Vec::new();
            let mut operand = None;
            for token in pair.into_inner() {
                match token.as_rule() {
                    Rule::prefix_op => prefixes.push(token.as_str().to_string()),
                    _ => operand = Some(parse_expression(token)?),
                }
            }
            let mut expr = operand.ok_or_else(|| malformed("Unary operator without operand"))?;
            for prefix in prefixes.iter().rev() {
                let op = match prefix.as_str() {
                    "!" => UnaryOp::Not,
                    "-" => UnaryOp::Neg,
                    "++" => UnaryOp::PreIncrement,
                    "--" => UnaryOp::PreDecrement,
                    _ => UnaryOp::Delete,
                };
                expr = Expression::Unary(op, Box::new(expr));
            }
            Ok(expr)
        }
        Rule::postfix => parse_postfix(pair),
        _ => parse_primary(pair),
    }
}

fn parse_binary_chain(pair: Pair<Rule>) -> Result<Expression> {
    let mut pairs = pair.into_inner();
    let first = pairs
        .next()
        .ok_or_else(|| malformed("Expression must have at least one term"))?;
    let mut expr = parse_expression(first)?;

    while let Some(op_pair) = pairs.next() {
        if let Some(term_pair) = pairs.next() {
            let op = BinaryOp::from_symbol(op_pair.as_str())
                .ok_or_else(|| malformed(format!("Unknown operator: {}", op_pair.as_str())))?;
            expr = Expression::binary(op, expr, parse_expression(term_pair)?);
        }
    }
    Ok(expr)
}

fn parse_postfix(pair: Pair<Rule>) -> Result<Expression> {
    let mut inner = pair.into_inner();
    let mut expr = parse_primary(
        inner
            .next()
            .ok_or_else(|| malformed("Postfix expression without operand"))?,
    )?;
    let mut pending_options: Vec<(String, Expression)> = Vec::new();

    for suffix in inner {
        match suffix.as_rule() {
            Rule::member_suffix => {
                let member = first_identifier(suffix)?;
                expr = Expression::Member(Box::new(expr), member);
            }
            Rule::index_suffix => {
                let index = match suffix.into_inner().next() {
                    Some(index) => Some(Box::new(parse_expression(index)?)),
                    None => None,
                };
                expr = Expression::Index(Box::new(expr), index);
            }
            Rule::call_options => {
                for option in suffix.into_inner() {
                    let mut parts = option.into_inner();
                    let name = parts
                        .next()
                        .ok_or_else(|| malformed("Call option name not found"))?;
                    let value = parts
                        .next()
                        .ok_or_else(|| malformed("Call option value not found"))?;
                    pending_options.push((name.as_str().to_string(), parse_expression(value)?));
                }
            }
            Rule::call_arguments => {
                let args = suffix
                    .into_inner()
                    .map(parse_expression)
                    .collect::<Result<Vec<_>>>()?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    options: std::mem::take(&mut pending_options),
                    args,
                };
            }
            Rule::postfix_op => {
                let op = if suffix.as_str() == "++" {
                    UnaryOp::PostIncrement
                } else {
                    UnaryOp::PostDecrement
                };
                expr = Expression::Unary(op, Box::new(expr));
            }
            _ => {}
        }
    }
    Ok(expr)
}

fn parse_primary(pair: Pair<Rule>) -> Result<Expression> {
    match pair.as_rule() {
        Rule::identifier | Rule::elementary_type | Rule::payable_expression => {
            Ok(Expression::Identifier(pair.as_str().to_string()))
        }
        Rule::bool_literal => Ok(Expression::Bool(pair.as_str() == "true")),
        Rule::number_literal => {
            let mut value = String::new();
            let mut unit = None;
            for token in pair.into_inner() {
                match token.as_rule() {
                    Rule::number_value => value = token.as_str().replace('_', ""),
                    Rule::number_unit => unit = Some(token.as_str().to_string()),
                    _ => {}
                }
            }
            Ok(Expression::Number { value, unit })
        }
        Rule::string_literal => {
            let text = pair.as_str();
            Ok(Expression::Str(text[1..text.len() - 1].to_string()))
        }
        Rule::new_expression => {
            let type_pair = pair
                .into_inner()
                .next()
                .ok_or_else(|| malformed("New expression without type"))?;
            Ok(Expression::New(parse_type_name(type_pair)?))
        }
        Rule::tuple_expression => {
            let mut items = Vec::new();
            for item in pair.into_inner() {
                match item.into_inner().next() {
                    Some(expr) => items.push(Some(parse_expression(expr)?)),
                    None => items.push(None),
                }
            }
            // A parenthesised single expression is just grouping.
            if items.len() == 1 {
                if let Some(Some(expr)) = items.pop() {
                    return Ok(expr);
                }
                return Ok(Expression::Tuple(vec![None]));
            }
            Ok(Expression::Tuple(items))
        }
        other => Err(malformed(format!("Unexpected term type: {:?}", other))),
    }
}
