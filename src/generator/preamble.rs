//! Text shared by every generated module, emitted once at the top.

pub const LIQUID_PRAGMAS: &str = r#"{-@ LIQUID "--exact-data-cons" @-}
{-@ LIQUID "--ple" @-}
{-@ LIQUID "--no-termination" @-}
"#;

/// Address hashing plus the call environment records and the type aliases
/// state fields are declared with.
pub const CONTEXT_DEFINITIONS: &str = r#"import Data.Char (ord)

{-@ fromString :: String -> {v:Integer | v >= 0} @-}
fromString :: String -> Integer
fromString = go 0
  where
    go acc [] = acc
    go acc (c:cs) =
      let acc' = acc * 31 + toInteger (ord c)
      in acc' `seq` go (if acc' >= 0 then acc' else 0) cs

data Message = Message {
  sender :: Address,
  value :: Integer
} deriving (Show, Eq)

{-@ data Message = Message {
  sender :: Address,
  value :: Integer
}
@-}

data Block = Block {
  number :: Integer,
  timestamp :: Integer
} deriving (Show, Eq)

{-@ data Block = Block {
  number :: Integer,
  timestamp :: Integer
}
@-}

{-@ type Amount = {v: Integer | v >= 0} @-}
type Amount = Integer

{-@ type Uint = {v: Integer | v >= 0} @-}
type Uint = Integer

{-@ type Address = Integer @-}
type Address = Integer
"#;

/// A call to `revert` must be unreachable for a function to verify.
pub const REVERT_FUNCTION: &str = r#"{-@ revert :: {v:String | False} -> a @-}
revert :: String -> a
revert = error
"#;

pub fn module_header(module_name: &str) -> String {
    format!("module {} where\n", module_name)
}
