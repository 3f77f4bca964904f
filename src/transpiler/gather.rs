//! Collects per-contract state layout and function signatures.
//!
//! Every declared symbol is suffixed with its contract name so that several
//! contracts can share one output module without clashes.

use super::ast::{self, Contract, ContractPart, FunctionKind, Mutability, Statement};
use super::types::{map_return_types, map_type, LiquidType, TypeScope};
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};

/// Prefix given to parameters that would shadow a state field.
pub const COLLISION_MARKER: &str = "_input_";

/// Source names of the environment fields every state record starts with.
pub const IMPLICIT_MSG: &str = "msg";
pub const IMPLICIT_BLOCK: &str = "block";
pub const IMPLICIT_BALANCE: &str = "balance";
pub const IMPLICIT_ADDRESS: &str = "address";

/// Keywords plus every name the generated code binds or calls itself.
pub const HASKELL_RESERVED: &[&str] = &[
    "case", "class", "data", "default", "deriving", "do", "else", "foreign", "if", "import",
    "in", "infix", "infixl", "infixr", "instance", "let", "module", "newtype", "of", "then",
    "type", "where", "st", "v", "msgctx", "block", "sender", "value", "number", "timestamp",
    "revert", "fromString", "not", "negate", "div", "mod", "undefined", "error",
];

#[derive(Debug, Clone, PartialEq)]
pub struct StateVariable {
    pub name: String,
    pub ty: LiquidType,
    pub original_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub original_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub original_name: String,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateInfo {
    pub contract_name: String,
    pub variables: Vec<StateVariable>,
    pub enums: Vec<EnumDef>,
    /// Original to normalized names of declared variables only.
    pub name_map: HashMap<String, String>,
    /// Declared initializers, keyed by normalized field name.
    pub initializers: Vec<(String, ast::Expression)>,
}

impl StateInfo {
    pub fn state_type(&self) -> String {
        format!("{}State", self.contract_name)
    }

    /// Field name of one of the four environment variables.
    pub fn implicit_field(&self, original: &str) -> String {
        format!("{}{}", original, self.contract_name)
    }

    pub fn balance_field(&self) -> String {
        self.implicit_field(IMPLICIT_BALANCE)
    }

    /// Resolves a source identifier to a state field. Declared variables
    /// shadow the implicit environment ones.
    pub fn field(&self, original: &str) -> Option<&StateVariable> {
        if let Some(normalized) = self.name_map.get(original) {
            return self.variables.iter().find(|v| &v.name == normalized);
        }
        self.variables
            .iter()
            .take(4)
            .find(|v| v.original_name == original)
    }

    pub fn declared(&self) -> impl Iterator<Item = &StateVariable> {
        self.variables.iter().skip(4)
    }

    pub fn find_enum(&self, original: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|e| e.original_name == original)
    }

    /// Name of the per-contract value-transfer helper.
    pub fn transfer_helper(&self) -> String {
        format!("call{}", self.contract_name)
    }

    /// Default value a field or local of type `ty` starts with, if the
    /// type has one.
    pub fn zero_value(&self, ty: &LiquidType) -> Option<String> {
        match ty {
            LiquidType::Uint | LiquidType::Integer | LiquidType::Amount | LiquidType::Address => {
                Some("0".to_string())
            }
            LiquidType::Bool => Some("False".to_string()),
            LiquidType::Str => Some("\"\"".to_string()),
            LiquidType::Enum(name) => self
                .enums
                .iter()
                .find(|e| &e.name == name)
                .and_then(|e| e.members.first())
                .map(|m| m.name.clone()),
            LiquidType::Tuple(items) => {
                let values: Option<Vec<String>> = items.iter().map(|t| self.zero_value(t)).collect();
                values.map(|v| format!("({})", v.join(", ")))
            }
            LiquidType::Message
            | LiquidType::Block
            | LiquidType::Struct(_)
            | LiquidType::Contract(_)
            | LiquidType::Unknown(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: LiquidType,
    pub original_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    pub name: String,
    pub original_name: String,
    pub kind: FunctionKind,
    pub params: Vec<Param>,
    pub body: Vec<Statement>,
    pub is_view: bool,
    pub is_pure: bool,
    pub return_type: Option<LiquidType>,
    pub modifiers: Vec<String>,
}

impl FunctionInfo {
    pub fn is_read_only(&self) -> bool {
        self.is_view || self.is_pure
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }
}

/// Emitted name of a contract's constructor.
pub fn constructor_name(contract: &str) -> String {
    format!("constructor{}", contract)
}

/// Lowercases the first character; total on any input.
pub fn normalize_identifier(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Builds the type scope of one contract: its enums and structs, plus every
/// contract of the source unit.
pub fn type_scope(contract: &Contract, known_contracts: &BTreeSet<String>) -> TypeScope {
    let mut scope = TypeScope::new(&contract.name);
    for part in &contract.parts {
        match part {
            ContractPart::Enum(def) => {
                scope.enums.insert(def.name.clone());
            }
            ContractPart::Struct(def) => {
                scope.structs.insert(def.name.clone());
            }
            _ => {}
        }
    }
    scope.contracts = known_contracts.clone();
    scope
}

pub fn gather_state(contract: &Contract, known_contracts: &BTreeSet<String>) -> StateInfo {
    let contract_name = contract.name.clone();
    let scope = type_scope(contract, known_contracts);

    let implicit = [
        (IMPLICIT_MSG, LiquidType::Message),
        (IMPLICIT_BLOCK, LiquidType::Block),
        (IMPLICIT_BALANCE, LiquidType::Amount),
        (IMPLICIT_ADDRESS, LiquidType::Address),
    ];
    let mut variables: Vec<StateVariable> = implicit
        .iter()
        .map(|(original, ty)| StateVariable {
            name: format!("{}{}", original, contract_name),
            ty: ty.clone(),
            original_name: original.to_string(),
        })
        .collect();

    let mut enums = Vec::new();
    let mut name_map = HashMap::new();
    let mut initializers = Vec::new();

    for part in &contract.parts {
        match part {
            ContractPart::StateVariable(var) => {
                let mut normalized = normalize_identifier(&format!("{}{}", var.name, contract_name));
                while variables.iter().any(|v| v.name == normalized) {
                    normalized.push('\'');
                }
                debug!("State variable {} -> {}", var.name, normalized);
                name_map.insert(var.name.clone(), normalized.clone());
                if let Some(init) = &var.initial_value {
                    initializers.push((normalized.clone(), init.clone()));
                }
                variables.push(StateVariable {
                    name: normalized,
                    ty: map_type(&var.type_name, &scope),
                    original_name: var.name.clone(),
                });
            }
            ContractPart::Enum(def) => {
                enums.push(EnumDef {
                    name: format!("{}{}", def.name, contract_name),
                    original_name: def.name.clone(),
                    members: def
                        .members
                        .iter()
                        .map(|m| EnumMember {
                            name: format!("{}{}", m, contract_name),
                            original_name: m.clone(),
                        })
                        .collect(),
                });
            }
            _ => {}
        }
    }

    StateInfo {
        contract_name,
        variables,
        enums,
        name_map,
        initializers,
    }
}

/// Normalizes a parameter name, renaming it when it would collide with a
/// state variable or a reserved word of the output language.
pub fn unique_param_name(base: &str, state: &StateInfo) -> String {
    let normalized = normalize_identifier(base);
    let lowered = normalized.to_lowercase();
    let collides = state.variables.iter().any(|v| {
        v.name.to_lowercase() == lowered || v.original_name.to_lowercase() == lowered
    }) || HASKELL_RESERVED.contains(&normalized.as_str());
    if collides {
        debug!("Parameter {} renamed to avoid a collision", base);
        format!("{}{}", COLLISION_MARKER, base)
    } else {
        normalized
    }
}

pub fn gather_functions(
    contract: &Contract,
    state: &StateInfo,
    known_contracts: &BTreeSet<String>,
) -> Vec<FunctionInfo> {
    let scope = type_scope(contract, known_contracts);
    let mut functions = Vec::new();

    for part in &contract.parts {
        let function = match part {
            ContractPart::Function(function) => function,
            ContractPart::Modifier(name) => {
                warn!("Modifier {} in {} is not modeled", name, contract.name);
                continue;
            }
            _ => continue,
        };

        let original_name = match (function.kind, &function.name) {
            (FunctionKind::Constructor, _) => "constructor".to_string(),
            (FunctionKind::Fallback, _) => "fallback".to_string(),
            (FunctionKind::Receive, _) => "receive".to_string(),
            (FunctionKind::Function, Some(name)) => name.clone(),
            (FunctionKind::Function, None) => "constructor".to_string(),
        };
        let name = normalize_identifier(&original_name);

        for modifier in &function.modifiers {
            warn!(
                "Modifier {} on {}.{} is ignored",
                modifier, contract.name, original_name
            );
        }

        let params = function
            .params
            .iter()
            .enumerate()
            .map(|(idx, param)| {
                let original = param
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("arg{}", idx));
                Param {
                    name: unique_param_name(&original, state),
                    ty: map_type(&param.type_name, &scope),
                    original_name: original,
                }
            })
            .collect();

        let is_view = function.mutability == Some(Mutability::View);
        let is_pure = function.mutability == Some(Mutability::Pure);
        let return_type = if is_view || is_pure {
            let types: Vec<ast::TypeName> = function
                .returns
                .iter()
                .map(|p| p.type_name.clone())
                .collect();
            map_return_types(&types, &scope)
        } else {
            None
        };

        functions.push(FunctionInfo {
            name,
            original_name,
            kind: function.kind,
            params,
            body: function.body.clone().unwrap_or_default(),
            is_view,
            is_pure,
            return_type,
            modifiers: function.modifiers.clone(),
        });
    }
    functions
}
