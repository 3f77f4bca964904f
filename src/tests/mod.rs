use super::parser;
use super::transpiler::{ast::*, gather_program};
use super::{translate, translate_with, TranslateError, TranslateOptions};
use anyhow::Result;

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: &str = r#"
        pragma solidity ^0.8.0;

        contract Counter {
            uint256 count;

            function increment(uint256 x) public {
                count = count + x;
            }

            function get() public view returns (uint256) {
                return count;
            }
        }
    "#;

    #[test]
    fn test_parse_basic_contract() -> Result<()> {
        let unit = parser::parse(COUNTER)?;
        assert_eq!(unit.contracts.len(), 1);
        let contract = &unit.contracts[0];
        assert_eq!(contract.name, "Counter");
        assert_eq!(contract.kind, ContractKind::Contract);

        let functions: Vec<&Function> = contract
            .parts
            .iter()
            .filter_map(|part| match part {
                ContractPart::Function(function) => Some(function),
                _ => None,
            })
            .collect();
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name.as_deref(), Some("increment"));
        assert_eq!(functions[1].mutability, Some(Mutability::View));
        Ok(())
    }

    #[test]
    fn test_parse_syntax_error() {
        let result = parser::parse("contract Broken { uint256 count = ; }");
        assert!(matches!(result, Err(TranslateError::Syntax(_))));
    }

    #[test]
    fn test_gather_implicit_variables() -> Result<()> {
        let program = gather_program(&parser::parse(COUNTER)?);
        let names: Vec<&str> = program.contracts[0]
            .state
            .variables
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["msgCounter", "blockCounter", "balanceCounter", "addressCounter", "countCounter"]
        );
        Ok(())
    }

    #[test]
    fn test_parameter_collisions_are_renamed() -> Result<()> {
        let source = r#"
            contract Counter {
                uint256 count;
                function set(uint256 count, uint256 value) public {
                    count = value;
                }
            }
        "#;
        let program = gather_program(&parser::parse(source)?);
        let set = program.contracts[0]
            .function("set")
            .ok_or_else(|| anyhow::anyhow!("set not gathered"))?;
        let params: Vec<&str> = set.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["_input_count", "_input_value"]);
        Ok(())
    }

    #[test]
    fn test_renamed_parameter_used_everywhere() -> Result<()> {
        let source = r#"
            contract Counter {
                uint256 count;
                function set(uint256 count) public {
                    require(count > 0);
                    this.count = count;
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains(
            "{-@ set :: {st:CounterState | True} -> {_input_count:Uint | (_input_count > 0)} -> {v:CounterState | True} @-}"
        ));
        assert!(output.contains("set :: CounterState -> Uint -> CounterState"));
        assert!(output.contains("set st _input_count =\n"));
        assert!(output.contains(
            "let { st1 = if (_input_count > 0) then st else revert \"error\""
        ));
        assert!(output.contains("; st2 = st1 { countCounter = _input_count }"));
        Ok(())
    }

    #[test]
    fn test_if_else_threads_both_branches() -> Result<()> {
        let source = r#"
            contract Ifs {
                uint256 x;
                function ifs(bool c) public {
                    if (c) {
                        x = 1;
                    } else {
                        x = 2;
                    }
                    x = x + 1;
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains("let { st3 = if c\n"));
        assert!(output.contains("then let { st1 = st { xIfs = 1 }"));
        assert!(output.contains("else let { st2 = st { xIfs = 2 }"));
        assert!(output.contains("; st4 = st3 { xIfs = ((xIfs st3) + 1) }"));
        assert!(output.contains("} in st4"));
        Ok(())
    }

    #[test]
    fn test_nested_return_confines_rest() -> Result<()> {
        let source = r#"
            contract Esc {
                uint256 x;
                uint256 y;
                function f(bool a, bool b) public {
                    if (a) {
                        if (b) {
                            return;
                        }
                        x = 1;
                    }
                    y = 2;
                }
            }
        "#;
        let output = translate(source)?;
        // `y = 2` runs after `x = 1` when `b` is false, and on its own when
        // `a` is false, but never on the path that returned.
        assert!(output.contains("then if b\n"));
        assert!(output.contains("then st\n"));
        assert!(output.contains("else let { st1 = st { xEsc = 1 }"));
        assert!(output.contains("; st2 = st1 { yEsc = 2 }"));
        assert!(output.contains("else let { st3 = st { yEsc = 2 }"));
        assert_eq!(output.matches("yEsc = 2").count(), 2);
        Ok(())
    }

    #[test]
    fn test_read_only_if_chain_folds() -> Result<()> {
        let source = r#"
            contract Chooser {
                uint256 base;
                function pick(uint256 n) public view returns (uint256) {
                    uint256 d = n * 2;
                    if (n > 10) {
                        return d;
                    } else if (n > 5) {
                        return n;
                    }
                    return 0;
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains("pick :: ChooserState -> Uint -> Uint"));
        assert!(output.contains("pick st n =\n  let { d = (n * 2)\n"));
        assert!(output.contains("} in if (n > 10) then d else if (n > 5) then n else 0"));
        Ok(())
    }

    #[test]
    fn test_untracked_receiver_calls_own_method() -> Result<()> {
        let source = r#"
            contract Relay {
                uint256 total;
                function g(uint256 n) public {
                    total = total + n;
                }
                function peek(uint256 n) public view returns (uint256) {
                    return total + n;
                }
                function f(uint256 n) public {
                    helper.g(n);
                    helper.peek(n);
                    total = other.peek(n);
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains("let { st1 = g st n\n"));
        assert!(output.contains("; st2 = st1 { totalRelay = (peek st1 n) }"));
        assert!(!output.contains("unsupported"));
        Ok(())
    }

    #[test]
    fn test_increment_threads_state() -> Result<()> {
        let output = translate(COUNTER)?;
        assert!(output.contains("increment :: CounterState -> Uint -> CounterState"));
        assert!(output.contains("st { countCounter = ((countCounter st) + x) }"));
        assert!(output.contains(
            "{-@ increment :: {st:CounterState | True} -> {x:Uint | True} -> {v:CounterState | True} @-}"
        ));
        Ok(())
    }

    #[test]
    fn test_view_function_folds_to_value() -> Result<()> {
        let output = translate(COUNTER)?;
        assert!(output.contains("get :: CounterState -> Uint"));
        assert!(output.contains("get st = (countCounter st)"));
        assert!(output.contains("{-@ get :: {st:CounterState | True} -> {v:Uint | True} @-}"));
        Ok(())
    }

    #[test]
    fn test_constructor_reads_caller() -> Result<()> {
        let source = r#"
            contract Owned {
                address owner;
                constructor() public {
                    owner = msg.sender;
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains(
            "{-@ constructorOwned :: msgctx:Message -> block:Block -> {v:OwnedState | True} @-}"
        ));
        assert!(output.contains("constructorOwned :: Message -> Block -> OwnedState"));
        assert!(output.contains("constructorOwned msgctx block =\n  OwnedState\n    { msgOwned = msgctx"));
        assert!(output.contains("    , addressOwned = fromString \"Owned\""));
        assert!(output.contains("    , ownerOwned = (sender msgctx)"));
        Ok(())
    }

    #[test]
    fn test_implicit_constructor() -> Result<()> {
        let output = translate(COUNTER)?;
        assert!(output.contains("    , countCounter = 0\n    }"));
        let constructor = output
            .find("constructorCounter ::")
            .ok_or_else(|| anyhow::anyhow!("no constructor"))?;
        let increment = output
            .find("increment ::")
            .ok_or_else(|| anyhow::anyhow!("no increment"))?;
        assert!(constructor < increment);
        Ok(())
    }

    #[test]
    fn test_state_precondition() -> Result<()> {
        let source = r#"
            contract Bank {
                uint256 funds;
                uint256 limit;
                function withdraw() public {
                    require(funds > limit);
                    limit = 0;
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains(
            "{-@ withdraw :: {st:BankState | ((fundsBank st) > (limitBank st))} -> {v:BankState | True} @-}"
        ));
        assert!(output.contains(
            "let { st1 = if ((fundsBank st) > (limitBank st)) then st else revert \"error\""
        ));
        assert!(output.contains("    ; st2 = st1 { limitBank = 0 }\n      } in st2"));
        Ok(())
    }

    #[test]
    fn test_implicit_balance_precondition() -> Result<()> {
        let source = r#"
            contract Vault {
                uint256 amount;
                function drain() public {
                    require(balance > amount);
                    amount = 0;
                }
            }
            contract Till {
                uint256 total;
                function withdraw(uint256 amount) public {
                    require(balance > amount);
                    total = total + amount;
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains(
            "{-@ drain :: {st:VaultState | ((balanceVault st) > (amountVault st))} -> {v:VaultState | True} @-}"
        ));
        assert!(output.contains(
            "{-@ withdraw :: {st:TillState | True} -> {amount:Uint | ((balanceTill st) > amount)} -> {v:TillState | True} @-}"
        ));
        Ok(())
    }

    #[test]
    fn test_contract_instances() -> Result<()> {
        let source = r#"
            contract Token {
                uint256 supply;
                function mint(uint256 n) public {
                    supply = supply + n;
                }
            }
            contract Shop {
                Token token;
                constructor() public {
                    token = new Token();
                }
                function buy(uint256 n) public {
                    token.mint(n);
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains("  tokenShop :: TokenState"));
        assert!(output.contains("    , tokenShop = (constructorToken msgctx block)"));
        assert!(output.contains("st { tokenShop = (mint (tokenShop st) n) }"));
        Ok(())
    }

    #[test]
    fn test_parameter_preconditions() -> Result<()> {
        let source = r#"
            contract Pair {
                uint256 total;
                function pay(uint256 a, uint256 b) public {
                    require(a > 0, "empty");
                    require(b > a);
                    total = total + b;
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains(
            "{-@ pay :: {st:PairState | True} -> {a:Uint | (a > 0)} -> {b:Uint | (b > a)} -> {v:PairState | True} @-}"
        ));
        assert!(output.contains("revert \"empty\""));
        Ok(())
    }

    #[test]
    fn test_local_predicates_are_dropped() -> Result<()> {
        let source = r#"
            contract Local {
                uint256 count;
                function bump(uint256 x) public {
                    uint256 y = x + 1;
                    require(y > 1);
                    count = y;
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains("{-@ bump :: {st:LocalState | True} -> {x:Uint | True}"));
        assert!(output.contains("let { y = (x + 1)"));
        assert!(output.contains("st1 { countLocal = y }"));
        Ok(())
    }

    #[test]
    fn test_assert_becomes_postcondition() -> Result<()> {
        let source = r#"
            contract Guard {
                uint256 count;
                function reset() public {
                    count = 0;
                    assert(count == 0);
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains("-> {v:GuardState | ((countGuard v) == 0)} @-}"));
        Ok(())
    }

    #[test]
    fn test_read_only_postcondition_reads_state() -> Result<()> {
        let source = r#"
            contract Gauge {
                uint256 level;
                function sample() public view returns (uint256) {
                    assert(level >= 0);
                    return level;
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains(
            "{-@ sample :: {st:GaugeState | True} -> {v:Uint | ((levelGauge st) >= 0)} @-}"
        ));
        Ok(())
    }

    #[test]
    fn test_value_transfer_helper() -> Result<()> {
        let source = r#"
            contract Wallet {
                uint256 paid;
                function pay(uint256 amount) public {
                    payable(msg.sender).transfer(amount);
                    paid = paid + amount;
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains("callWallet :: WalletState -> Address -> Amount -> WalletState"));
        assert!(output.contains(
            "callWallet ctx addr amount = ctx { balanceWallet = balanceWallet ctx - amount }"
        ));
        assert!(output.contains("(paidWallet ctx' == paidWallet ctx)"));
        assert!(output.contains("st1 = callWallet st"));
        Ok(())
    }

    #[test]
    fn test_enums_are_suffixed() -> Result<()> {
        let source = r#"
            contract Door {
                enum Status { Open, Closed }
                Status status;
                function close() public {
                    status = Status.Closed;
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains("data StatusDoor = OpenDoor | ClosedDoor deriving (Show, Eq)"));
        assert!(output.contains("  statusDoor :: StatusDoor"));
        assert!(output.contains("st { statusDoor = ClosedDoor }"));
        assert!(output.contains("    , statusDoor = OpenDoor\n    }"));
        Ok(())
    }

    #[test]
    fn test_loops_become_placeholders() -> Result<()> {
        let source = r#"
            contract Loop {
                uint256 count;
                function spin(uint256 n) public {
                    for (uint256 i = 0; i < n; i++) {
                        count = count + 1;
                    }
                }
            }
        "#;
        let output = translate(source)?;
        assert!(output.contains("unsupported: for loop"));
        Ok(())
    }

    #[test]
    fn test_contracts_keep_declaration_order() -> Result<()> {
        let source = r#"
            contract Zeta { uint256 a; function get() public view returns (uint256) { return a; } }
            contract Alpha { uint256 b; function get() public view returns (uint256) { return b; } }
        "#;
        let module = translate_with(source, &TranslateOptions::default())?;
        assert_eq!(module.name, "Zeta");
        assert_eq!(module.contracts, vec!["Zeta", "Alpha"]);

        let zeta = module.text.find("data ZetaState").unwrap_or(usize::MAX);
        let alpha = module.text.find("data AlphaState").unwrap_or(0);
        assert!(zeta < alpha);
        // Function names are unique across the module.
        assert!(module.text.contains("get :: ZetaState -> Uint"));
        assert!(module.text.contains("getAlpha :: AlphaState -> Uint"));
        Ok(())
    }

    #[test]
    fn test_preamble_emitted_once() -> Result<()> {
        let source = r#"
            contract A { uint256 x; }
            contract B { uint256 y; }
        "#;
        let output = translate(source)?;
        assert_eq!(output.matches("revert :: String -> a").count(), 1);
        assert_eq!(output.matches("import Data.Char (ord)").count(), 1);
        assert!(output.contains("data AState = AState {"));
        assert!(output.contains("data BState = BState {"));
        assert!(output.starts_with("{-@ LIQUID \"--exact-data-cons\" @-}"));
        Ok(())
    }

    #[test]
    fn test_translation_is_deterministic() -> Result<()> {
        let first = translate(COUNTER)?;
        let second = translate(COUNTER)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_empty_source() -> Result<()> {
        let module = translate_with("pragma solidity ^0.8.0;", &TranslateOptions::default())?;
        assert_eq!(module.name, "Main");
        assert!(module.contracts.is_empty());
        assert!(module.text.contains("module Main where"));
        Ok(())
    }

    #[test]
    fn test_module_name_override() -> Result<()> {
        let options = TranslateOptions::default().with_module_name("verified");
        let module = translate_with(COUNTER, &options)?;
        assert_eq!(module.name, "Verified");
        assert!(module.text.contains("module Verified where"));
        Ok(())
    }
}
