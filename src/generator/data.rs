use crate::transpiler::gather::{EnumDef, StateInfo};

/// The per-contract value-transfer helper. Its refinement moves `amount`
/// out of the balance and leaves every other comparable field unchanged.
pub fn generate_call_function(state: &StateInfo) -> String {
    let state_type = state.state_type();
    let helper = state.transfer_helper();
    let balance = state.balance_field();

    let mut guarantees = vec![format!("{0} ctx' == {0} ctx - amount", balance)];
    guarantees.extend(
        state
            .variables
            .iter()
            .filter(|v| v.name != balance && v.ty.is_comparable())
            .map(|v| format!("({0} ctx' == {0} ctx)", v.name)),
    );

    let mut output = Vec::new();
    output.push(format!("{{-@ {} :: ctx:{}", helper, state_type));
    output.push("           -> Address".to_string());
    output.push(format!(
        "           -> amount:{{v:Amount | 0 <= v && v <= {} ctx}}",
        balance
    ));
    output.push(format!(
        "           -> {{ctx':{} | {}}}",
        state_type,
        guarantees.join("\n                 && ")
    ));
    output.push("@-}".to_string());
    output.push(format!(
        "{} :: {} -> Address -> Amount -> {}",
        helper, state_type, state_type
    ));
    output.push(format!(
        "{0} ctx addr amount = ctx {{ {1} = {1} ctx - amount }}",
        helper, balance
    ));
    output.push(String::new());
    output.join("\n")
}

pub fn generate_enum(def: &EnumDef) -> String {
    let members: Vec<&str> = def.members.iter().map(|m| m.name.as_str()).collect();
    if members.is_empty() {
        format!("data {}", def.name)
    } else {
        format!("data {} = {} deriving (Show, Eq)", def.name, members.join(" | "))
    }
}

/// The reflected refinement copy of the state record, then the record.
pub fn generate_data(state: &StateInfo) -> String {
    let state_type = state.state_type();
    let mut output = Vec::new();

    for def in &state.enums {
        output.push(generate_enum(def));
    }
    if !state.enums.is_empty() {
        output.push(String::new());
    }

    if state.variables.is_empty() {
        output.push(format!("data {0} = {0}", state_type));
        return output.join("\n");
    }

    let fields: Vec<String> = state
        .variables
        .iter()
        .map(|v| format!("  {} :: {}", v.name, v.ty))
        .collect();
    let record = format!(
        "data {0} = {0} {{\n{1}\n}}",
        state_type,
        fields.join(",\n")
    );
    output.push(format!("{{-@ {}\n@-}}\n", record));
    output.push(record);
    output.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transpiler::gather::EnumMember;
    use std::collections::HashMap;

    fn empty_state(contract: &str) -> StateInfo {
        StateInfo {
            contract_name: contract.to_string(),
            variables: Vec::new(),
            enums: Vec::new(),
            name_map: HashMap::new(),
            initializers: Vec::new(),
        }
    }

    #[test]
    fn test_empty_layout_is_nullary() {
        let data = generate_data(&empty_state("Empty"));
        assert_eq!(data, "data EmptyState = EmptyState");
    }

    #[test]
    fn test_enum_members_are_listed_in_order() {
        let def = EnumDef {
            name: "PhaseC".into(),
            original_name: "Phase".into(),
            members: ["Open", "Closed"]
                .iter()
                .map(|m| EnumMember {
                    name: format!("{}C", m),
                    original_name: m.to_string(),
                })
                .collect(),
        };
        assert_eq!(generate_enum(&def), "data PhaseC = OpenC | ClosedC deriving (Show, Eq)");
    }
}
