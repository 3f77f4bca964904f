/// Knobs of a single translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Output module name. Defaults to the first contract's name, or `Main`
    /// for a source without contracts.
    pub module_name: Option<String>,
}

impl TranslateOptions {
    pub fn with_module_name(mut self, name: &str) -> Self {
        self.module_name = Some(name.to_string());
        self
    }

    /// Module name for a source whose first contract is `first_contract`.
    /// Haskell module names start upper case, so the first letter is raised.
    pub fn resolve_module_name(&self, first_contract: Option<&str>) -> String {
        let name = self
            .module_name
            .as_deref()
            .or(first_contract)
            .filter(|name| !name.is_empty())
            .unwrap_or("Main");
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Main".to_string(),
        }
    }
}
