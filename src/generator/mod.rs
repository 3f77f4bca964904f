pub mod data;
pub mod functions;
pub mod preamble;

use crate::transpiler::Program;
use log::info;

/// Assembles the whole module: shared preamble once, then every contract
/// in declaration order.
pub fn generate(program: &Program, module_name: &str) -> String {
    let mut output = Vec::new();

    output.push(preamble::LIQUID_PRAGMAS.to_string());
    output.push(preamble::module_header(module_name));
    output.push(preamble::CONTEXT_DEFINITIONS.to_string());
    output.push(preamble::REVERT_FUNCTION.to_string());

    for contract in &program.contracts {
        info!("Generating {} ({} functions)", contract.name, contract.functions.len());
        output.push(data::generate_call_function(&contract.state));
        output.push(data::generate_data(&contract.state));
        output.push(String::new());
        output.push(functions::generate_functions(program, contract));
    }

    output.join("\n")
}
