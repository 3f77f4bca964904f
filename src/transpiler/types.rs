use super::ast::TypeName;
use log::debug;
use std::collections::BTreeSet;
use std::fmt;

/// Target-language type of a state field, parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiquidType {
    /// Non-negative integer alias (`{v:Integer | v >= 0}`).
    Uint,
    Integer,
    Bool,
    Str,
    Address,
    /// Non-negative balance alias.
    Amount,
    Message,
    Block,
    /// Contract-suffixed enum name.
    Enum(String),
    /// Contract-suffixed struct name.
    Struct(String),
    /// Another contract's state type; holds the bare contract name.
    Contract(String),
    Tuple(Vec<LiquidType>),
    /// Anything the mapper cannot classify; keeps the source spelling.
    Unknown(String),
}

impl LiquidType {
    /// Whether values of this type can be compared with `==` in the output.
    pub fn is_comparable(&self) -> bool {
        match self {
            LiquidType::Uint
            | LiquidType::Integer
            | LiquidType::Bool
            | LiquidType::Str
            | LiquidType::Address
            | LiquidType::Amount
            | LiquidType::Message
            | LiquidType::Block
            | LiquidType::Enum(_) => true,
            LiquidType::Tuple(items) => items.iter().all(LiquidType::is_comparable),
            LiquidType::Struct(_) | LiquidType::Contract(_) | LiquidType::Unknown(_) => false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            LiquidType::Uint | LiquidType::Integer | LiquidType::Amount | LiquidType::Address
        )
    }
}

impl fmt::Display for LiquidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidType::Uint => write!(f, "Uint"),
            LiquidType::Integer => write!(f, "Integer"),
            LiquidType::Bool => write!(f, "Bool"),
            LiquidType::Str => write!(f, "String"),
            LiquidType::Address => write!(f, "Address"),
            LiquidType::Amount => write!(f, "Amount"),
            LiquidType::Message => write!(f, "Message"),
            LiquidType::Block => write!(f, "Block"),
            LiquidType::Enum(name) | LiquidType::Struct(name) => write!(f, "{}", name),
            LiquidType::Contract(name) => write!(f, "{}State", name),
            LiquidType::Tuple(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "({})", items.join(", "))
            }
            LiquidType::Unknown(original) if original.is_empty() => write!(f, "UnknownType"),
            LiquidType::Unknown(original) => write!(f, "UnknownType_{}", sanitize(original)),
        }
    }
}

/// Names a type reference may resolve against while mapping one contract.
#[derive(Debug, Clone, Default)]
pub struct TypeScope {
    pub contract_name: String,
    pub enums: BTreeSet<String>,
    pub structs: BTreeSet<String>,
    pub contracts: BTreeSet<String>,
}

impl TypeScope {
    pub fn new(contract_name: &str) -> Self {
        TypeScope {
            contract_name: contract_name.to_string(),
            ..TypeScope::default()
        }
    }

    pub fn with_enum(mut self, name: &str) -> Self {
        self.enums.insert(name.to_string());
        self
    }

    pub fn with_struct(mut self, name: &str) -> Self {
        self.structs.insert(name.to_string());
        self
    }

    pub fn with_contract(mut self, name: &str) -> Self {
        self.contracts.insert(name.to_string());
        self
    }
}

pub fn map_type(type_name: &TypeName, scope: &TypeScope) -> LiquidType {
    let mapped = match type_name {
        TypeName::Elementary(name) => map_elementary(name),
        TypeName::UserDefined(path) => {
            // `Other.Kind` refers to a member type; only the last segment names it.
            let name = path.rsplit('.').next().unwrap_or(path);
            if scope.enums.contains(name) {
                LiquidType::Enum(format!("{}{}", name, scope.contract_name))
            } else if scope.structs.contains(name) {
                LiquidType::Struct(format!("{}{}", name, scope.contract_name))
            } else if scope.contracts.contains(name) {
                LiquidType::Contract(name.to_string())
            } else {
                LiquidType::Unknown(path.clone())
            }
        }
        TypeName::Mapping(..) | TypeName::Array(_) => LiquidType::Unknown(type_name.to_string()),
    };
    if let LiquidType::Unknown(original) = &mapped {
        debug!("Unresolved type `{}` in {}", original, scope.contract_name);
    }
    mapped
}

/// Maps a `returns (...)` list: nothing, a single type, or a tuple.
pub fn map_return_types(types: &[TypeName], scope: &TypeScope) -> Option<LiquidType> {
    match types {
        [] => None,
        [single] => Some(map_type(single, scope)),
        many => Some(LiquidType::Tuple(
            many.iter().map(|t| map_type(t, scope)).collect(),
        )),
    }
}

fn map_elementary(name: &str) -> LiquidType {
    if name.starts_with("uint") {
        LiquidType::Uint
    } else if name.starts_with("int") {
        LiquidType::Integer
    } else {
        match name {
            "bool" => LiquidType::Bool,
            "string" => LiquidType::Str,
            "address" => LiquidType::Address,
            _ => LiquidType::Unknown(name.to_string()),
        }
    }
}

fn sanitize(original: &str) -> String {
    let mut out = String::new();
    for c in original.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elementary(name: &str) -> TypeName {
        TypeName::Elementary(name.to_string())
    }

    #[test]
    fn test_elementary_types() {
        let scope = TypeScope::new("Bank");
        assert_eq!(map_type(&elementary("uint256"), &scope), LiquidType::Uint);
        assert_eq!(map_type(&elementary("uint8"), &scope), LiquidType::Uint);
        assert_eq!(map_type(&elementary("int128"), &scope), LiquidType::Integer);
        assert_eq!(map_type(&elementary("bool"), &scope), LiquidType::Bool);
        assert_eq!(map_type(&elementary("string"), &scope), LiquidType::Str);
        assert_eq!(map_type(&elementary("address"), &scope), LiquidType::Address);
    }

    #[test]
    fn test_unknown_types_stay_visible() {
        let scope = TypeScope::new("Bank");
        let bytes = map_type(&elementary("bytes32"), &scope);
        assert_eq!(bytes.to_string(), "UnknownType_bytes32");

        let mapping = TypeName::Mapping(
            Box::new(elementary("address")),
            Box::new(elementary("uint256")),
        );
        assert_eq!(
            map_type(&mapping, &scope).to_string(),
            "UnknownType_mapping_address_uint256"
        );
        assert_eq!(LiquidType::Unknown(String::new()).to_string(), "UnknownType");
    }

    #[test]
    fn test_user_defined_types_are_suffixed() {
        let scope = TypeScope::new("Market")
            .with_enum("Status")
            .with_struct("Offer")
            .with_contract("Token");
        let status = map_type(&TypeName::UserDefined("Status".into()), &scope);
        assert_eq!(status.to_string(), "StatusMarket");
        let offer = map_type(&TypeName::UserDefined("Offer".into()), &scope);
        assert_eq!(offer.to_string(), "OfferMarket");
        let token = map_type(&TypeName::UserDefined("Token".into()), &scope);
        assert_eq!(token.to_string(), "TokenState");
        let missing = map_type(&TypeName::UserDefined("Ghost".into()), &scope);
        assert_eq!(missing.to_string(), "UnknownType_Ghost");
    }

    #[test]
    fn test_return_lists() {
        let scope = TypeScope::new("C");
        assert_eq!(map_return_types(&[], &scope), None);
        let pair = map_return_types(&[elementary("uint256"), elementary("bool")], &scope);
        assert_eq!(pair.map(|t| t.to_string()), Some("(Uint, Bool)".to_string()));
    }
}
