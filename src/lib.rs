//! Translates a restricted subset of Solidity into a Haskell module carrying
//! LiquidHaskell refinement types derived from the contracts' own
//! `require`/`assert` checks.

pub mod config;
pub mod error;
pub mod generator;
pub mod parser;
pub mod transpiler;

#[cfg(test)]
mod tests;

pub use config::TranslateOptions;
pub use error::{Result, TranslateError};

use log::info;

/// A generated module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidModule {
    pub name: String,
    /// Contracts it contains, in declaration order.
    pub contracts: Vec<String>,
    pub text: String,
}

/// Translates `source` with default options, returning the module text.
pub fn translate(source: &str) -> Result<String> {
    translate_with(source, &TranslateOptions::default()).map(|module| module.text)
}

pub fn translate_with(source: &str, options: &TranslateOptions) -> Result<LiquidModule> {
    let unit = parser::parse(source)?;
    let program = transpiler::gather_program(&unit);
    let contracts: Vec<String> = program.contracts.iter().map(|c| c.name.clone()).collect();
    let name = options.resolve_module_name(contracts.first().map(String::as_str));
    info!("Translating {} contract(s) into module {}", contracts.len(), name);
    let text = generator::generate(&program, &name);
    Ok(LiquidModule {
        name,
        contracts,
        text,
    })
}
