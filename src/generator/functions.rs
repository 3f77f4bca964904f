use crate::transpiler::ast::FunctionKind;
use crate::transpiler::gather::{constructor_name, FunctionInfo};
use crate::transpiler::haskell::HsExpr;
use crate::transpiler::liquid::{self, result_type};
use crate::transpiler::scope::{FunctionScope, CONSTRUCTOR_BLOCK, CONSTRUCTOR_MSG, INCOMING_STATE};
use crate::transpiler::statement::{translate_constructor, translate_mutating, translate_read_only};
use crate::transpiler::{ContractModel, Program};
use log::debug;

/// Longest implementation kept on the line of its header.
const MAX_INLINE: usize = 100;

/// Stand-in for a contract that declares no constructor.
fn implicit_constructor() -> FunctionInfo {
    FunctionInfo {
        name: "constructor".to_string(),
        original_name: "constructor".to_string(),
        kind: FunctionKind::Constructor,
        params: Vec::new(),
        body: Vec::new(),
        is_view: false,
        is_pure: false,
        return_type: None,
        modifiers: Vec::new(),
    }
}

/// Every function of `contract`, in declaration order.
pub fn generate_functions(program: &Program, contract: &ContractModel) -> String {
    let mut output = Vec::new();
    if !contract.functions.iter().any(FunctionInfo::is_constructor) {
        debug!("{} declares no constructor, emitting an empty one", contract.name);
        output.push(generate_function(program, contract, &implicit_constructor()));
    }
    for function in &contract.functions {
        output.push(generate_function(program, contract, function));
    }
    output.join("\n")
}

pub fn generate_function(program: &Program, contract: &ContractModel, function: &FunctionInfo) -> String {
    let mut scope = FunctionScope::new(program, contract, function);
    // Annotations only see parameters, so they are built before any local exists.
    let annotation = liquid::synthesize(&scope).render(&scope);
    let signature = type_signature(&scope);

    let params: String = function.params.iter().map(|p| format!(" {}", p.name)).collect();
    let (header, body) = if function.is_constructor() {
        let header = format!(
            "{} {} {}{}",
            constructor_name(&contract.name),
            CONSTRUCTOR_MSG,
            CONSTRUCTOR_BLOCK,
            params
        );
        (header, translate_constructor(&mut scope))
    } else if function.is_read_only() {
        let header = format!("{} {}{}", function.name, INCOMING_STATE, params);
        (header, translate_read_only(&mut scope, &function.body))
    } else {
        let header = format!("{} {}{}", function.name, INCOMING_STATE, params);
        (header, translate_mutating(&mut scope, &function.body, INCOMING_STATE))
    };

    format!("{}\n{}\n{}\n", annotation, signature, implementation(&header, &body))
}

fn type_signature(scope: &FunctionScope) -> String {
    let function = scope.function;
    let state_type = scope.state().state_type();
    let mut types = Vec::new();
    let name = if function.is_constructor() {
        types.push("Message".to_string());
        types.push("Block".to_string());
        constructor_name(&scope.contract.name)
    } else {
        types.push(state_type);
        function.name.clone()
    };
    types.extend(function.params.iter().map(|p| p.ty.to_string()));
    types.push(result_type(scope));
    format!("{} :: {}", name, types.join(" -> "))
}

fn implementation(header: &str, body: &HsExpr) -> String {
    if let Some(line) = body.render_inline() {
        if header.len() + line.len() + 3 <= MAX_INLINE {
            return format!("{} = {}", header, line);
        }
    }
    let mut lines = vec![format!("{} =", header)];
    lines.extend(body.render().into_iter().map(|line| format!("  {}", line)));
    lines.join("\n")
}
