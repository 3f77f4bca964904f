use super::ast::TypeName;
use super::gather::{
    normalize_identifier, FunctionInfo, Param, StateInfo, HASKELL_RESERVED, IMPLICIT_ADDRESS,
    IMPLICIT_BLOCK, IMPLICIT_MSG,
};
use super::types::{map_type, LiquidType};
use super::{ContractModel, Program};
use std::collections::{HashMap, HashSet};

/// Name of the incoming state argument of every translated function.
pub const INCOMING_STATE: &str = "st";
/// Binder of the result refinement.
pub const RESULT_TOKEN: &str = "v";
/// Constructor parameters carrying the call environment.
pub const CONSTRUCTOR_MSG: &str = "msgctx";
pub const CONSTRUCTOR_BLOCK: &str = "block";

/// Where `msg`, `block` and `this` are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// From the fields of the threaded state record.
    State,
    /// From the constructor's own parameters.
    Constructor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Local {
    /// Name of the let-binding currently holding the value.
    pub emitted: String,
    pub ty: Option<LiquidType>,
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    locals: HashMap<String, Local>,
}

/// Translation context of a single function. Lives exactly as long as the
/// translation of that function. Contract-typed locals double as the
/// instance table.
#[derive(Debug)]
pub struct FunctionScope<'a> {
    pub program: &'a Program,
    pub contract: &'a ContractModel,
    pub function: &'a FunctionInfo,
    pub env: Environment,
    locals: HashMap<String, Local>,
    used: HashSet<String>,
    next_state: usize,
}

impl<'a> FunctionScope<'a> {
    pub fn new(program: &'a Program, contract: &'a ContractModel, function: &'a FunctionInfo) -> Self {
        let env = if function.is_constructor() {
            Environment::Constructor
        } else {
            Environment::State
        };
        let mut used: HashSet<String> = HASKELL_RESERVED.iter().map(|s| s.to_string()).collect();
        used.extend(function.params.iter().map(|p| p.name.clone()));
        used.extend(contract.state.variables.iter().map(|v| v.name.clone()));
        used.extend(contract.functions.iter().map(|f| f.name.clone()));
        FunctionScope {
            program,
            contract,
            function,
            env,
            locals: HashMap::new(),
            used,
            next_state: 0,
        }
    }

    pub fn state(&self) -> &'a StateInfo {
        &self.contract.state
    }

    /// Next unused `st<n>` name.
    pub fn fresh_state(&mut self) -> String {
        loop {
            self.next_state += 1;
            let name = format!("{}{}", INCOMING_STATE, self.next_state);
            if self.used.insert(name.clone()) {
                return name;
            }
        }
    }

    /// Introduces a new binding for the source local `original` and returns
    /// its emitted name. Rebinding an existing local primes the name.
    pub fn bind_local(&mut self, original: &str, ty: Option<LiquidType>) -> String {
        let mut name = normalize_identifier(original);
        while self.used.contains(&name) {
            name.push('\'');
        }
        self.used.insert(name.clone());
        self.locals.insert(
            original.to_string(),
            Local {
                emitted: name.clone(),
                ty,
            },
        );
        name
    }

    /// Rebinds a local or parameter, keeping its known type.
    pub fn rebind(&mut self, original: &str) -> String {
        let ty = self.value_type(original);
        self.bind_local(original, ty)
    }

    pub fn local(&self, original: &str) -> Option<&Local> {
        self.locals.get(original)
    }

    pub fn param(&self, original: &str) -> Option<&'a Param> {
        self.function.params.iter().find(|p| p.original_name == original)
    }

    /// Whether `original` names a local or parameter, which shadow state.
    pub fn is_value_binding(&self, original: &str) -> bool {
        self.locals.contains_key(original) || self.param(original).is_some()
    }

    /// Declared state field named `original`, unless a local or parameter
    /// shadows it.
    pub fn state_field(&self, original: &str) -> Option<&'a super::gather::StateVariable> {
        if self.is_value_binding(original) {
            return None;
        }
        self.state().field(original)
    }

    /// Type of a local, parameter or state variable.
    pub fn value_type(&self, original: &str) -> Option<LiquidType> {
        if let Some(local) = self.locals.get(original) {
            return local.ty.clone();
        }
        if let Some(param) = self.param(original) {
            return Some(param.ty.clone());
        }
        self.state().field(original).map(|v| v.ty.clone())
    }

    /// Contract named by the type of a local, parameter or state variable.
    pub fn instance(&self, original: &str) -> Option<String> {
        match self.value_type(original) {
            Some(LiquidType::Contract(name)) => Some(name),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            locals: self.locals.clone(),
        }
    }

    /// Forgets every local introduced since `snapshot`. Used names stay
    /// reserved so later bindings never reuse them.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.locals = snapshot.locals;
    }

    /// Source names of every local currently in scope.
    pub fn local_names(&self) -> HashSet<String> {
        self.locals.keys().cloned().collect()
    }

    /// Drops locals declared after `outer` was taken, keeping any rebinding
    /// of the outer ones.
    pub fn forget_locals_except(&mut self, outer: &HashSet<String>) {
        self.locals.retain(|name, _| outer.contains(name));
    }

    pub fn map_type(&self, type_name: &TypeName) -> LiquidType {
        map_type(type_name, &self.contract.types)
    }

    pub fn callee(&self, name: &str) -> Option<&'a FunctionInfo> {
        self.contract.function(name)
    }

    pub fn contract_model(&self, name: &str) -> Option<&'a ContractModel> {
        self.program.contract(name)
    }

    /// The `Message` record of the current call.
    pub fn msg_context(&self, current: &str) -> String {
        match self.env {
            Environment::State => format!("({} {})", self.state().implicit_field(IMPLICIT_MSG), current),
            Environment::Constructor => CONSTRUCTOR_MSG.to_string(),
        }
    }

    /// The `Block` record of the current call.
    pub fn block_context(&self, current: &str) -> String {
        match self.env {
            Environment::State => {
                format!("({} {})", self.state().implicit_field(IMPLICIT_BLOCK), current)
            }
            Environment::Constructor => CONSTRUCTOR_BLOCK.to_string(),
        }
    }

    /// Address of the contract being translated.
    pub fn this_address(&self, current: &str) -> String {
        match self.env {
            Environment::State => {
                format!("({} {})", self.state().implicit_field(IMPLICIT_ADDRESS), current)
            }
            Environment::Constructor => format!("(fromString {:?})", self.contract.name),
        }
    }

    pub fn balance(&self, current: &str) -> String {
        format!("({} {})", self.state().balance_field(), current)
    }
}
