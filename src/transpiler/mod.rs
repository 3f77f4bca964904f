pub mod ast;
pub mod expression;
pub mod gather;
pub mod haskell;
pub mod liquid;
pub mod scope;
pub mod statement;
pub mod types;

use ast::{Contract, ContractKind, SourceUnit};
use gather::{gather_functions, gather_state, type_scope, FunctionInfo, StateInfo};
use log::{debug, info};
use std::collections::{BTreeSet, HashSet};
use types::TypeScope;

/// Everything gathered about one contract before translation starts.
#[derive(Debug, Clone)]
pub struct ContractModel {
    pub name: String,
    pub kind: ContractKind,
    pub types: TypeScope,
    pub state: StateInfo,
    pub functions: Vec<FunctionInfo>,
}

impl ContractModel {
    /// Finds a function by its source or normalized name.
    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        let normalized = gather::normalize_identifier(name);
        self.functions
            .iter()
            .find(|f| f.original_name == name || f.name == normalized)
    }
}

/// All contracts of one source unit, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub contracts: Vec<ContractModel>,
}

impl Program {
    pub fn contract(&self, name: &str) -> Option<&ContractModel> {
        self.contracts.iter().find(|c| c.name == name)
    }
}

pub fn convert(contract: &Contract, known_contracts: &BTreeSet<String>) -> ContractModel {
    let state = gather_state(contract, known_contracts);
    let functions = gather_functions(contract, &state, known_contracts);
    info!(
        "Gathered {}: {} state variables, {} functions",
        contract.name,
        state.variables.len(),
        functions.len()
    );
    ContractModel {
        name: contract.name.clone(),
        kind: contract.kind,
        types: type_scope(contract, known_contracts),
        state,
        functions,
    }
}

/// First pass: gathers every contract so later passes can resolve
/// cross-contract calls and `new` expressions.
pub fn gather_program(unit: &SourceUnit) -> Program {
    let known: BTreeSet<String> = unit.contracts.iter().map(|c| c.name.clone()).collect();
    let mut contracts: Vec<ContractModel> = unit
        .contracts
        .iter()
        .map(|contract| convert(contract, &known))
        .collect();

    // All contracts share one module, so function names must be unique
    // across it. Later duplicates take their contract's name as a suffix.
    let mut taken: HashSet<String> = HashSet::new();
    for model in &mut contracts {
        for function in model.functions.iter_mut().filter(|f| !f.is_constructor()) {
            if taken.insert(function.name.clone()) {
                continue;
            }
            let mut renamed = format!("{}{}", function.name, model.name);
            while taken.contains(&renamed) {
                renamed.push('\'');
            }
            debug!("Function {}.{} emitted as {}", model.name, function.original_name, renamed);
            taken.insert(renamed.clone());
            function.name = renamed;
        }
    }
    Program { contracts }
}
