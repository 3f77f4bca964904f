//! Minimal expression tree for the generated function bodies.
//!
//! Let-chains are rendered with explicit braces and semicolons, so the
//! output is valid regardless of how deeply it ends up indented.

/// Width under which a conditional with single-line branches stays on one line.
const INLINE_WIDTH: usize = 72;

#[derive(Debug, Clone, PartialEq)]
pub enum HsExpr {
    /// Already rendered text; may span several lines.
    Atom(String),
    Let {
        bindings: Vec<(String, HsExpr)>,
        body: Box<HsExpr>,
    },
    If {
        condition: String,
        then_branch: Box<HsExpr>,
        else_branch: Box<HsExpr>,
    },
}

impl HsExpr {
    pub fn atom(text: impl Into<String>) -> Self {
        HsExpr::Atom(text.into())
    }

    /// Wraps `body` in a let-chain, or returns it unchanged when there is
    /// nothing to bind.
    pub fn let_in(bindings: Vec<(String, HsExpr)>, body: HsExpr) -> Self {
        if bindings.is_empty() {
            body
        } else {
            HsExpr::Let {
                bindings,
                body: Box::new(body),
            }
        }
    }

    pub fn if_then_else(condition: impl Into<String>, then_branch: HsExpr, else_branch: HsExpr) -> Self {
        HsExpr::If {
            condition: condition.into(),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    /// Puts `name = value` in front of every other binding.
    pub fn prepend_binding(self, name: &str, value: HsExpr) -> Self {
        match self {
            HsExpr::Let { mut bindings, body } => {
                bindings.insert(0, (name.to_string(), value));
                HsExpr::Let { bindings, body }
            }
            other => HsExpr::let_in(vec![(name.to_string(), value)], other),
        }
    }

    pub fn render(&self) -> Vec<String> {
        match self {
            HsExpr::Atom(text) => text.lines().map(str::to_string).collect(),
            HsExpr::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let then_lines = then_branch.render();
                let else_lines = else_branch.render();
                if then_lines.len() == 1 && else_lines.len() == 1 {
                    let line = format!(
                        "if {} then {} else {}",
                        condition, then_lines[0], else_lines[0]
                    );
                    if line.len() <= INLINE_WIDTH {
                        return vec![line];
                    }
                }
                let mut lines = vec![format!("if {}", condition)];
                lines.extend(hang("  then ", &then_lines));
                lines.extend(hang("  else ", &else_lines));
                lines
            }
            HsExpr::Let { bindings, body } => {
                let mut lines = Vec::new();
                for (idx, (name, value)) in bindings.iter().enumerate() {
                    let lead = if idx == 0 { "let { " } else { "    ; " };
                    lines.extend(hang(&format!("{}{} = ", lead, name), &value.render()));
                }
                lines.extend(hang("    } in ", &body.render()));
                lines
            }
        }
    }

    /// Renders as a single line when possible.
    pub fn render_inline(&self) -> Option<String> {
        match self.render().as_slice() {
            [line] => Some(line.clone()),
            _ => None,
        }
    }
}

/// Prefixes the first line with `lead` and aligns the rest under it.
fn hang(lead: &str, lines: &[String]) -> Vec<String> {
    let pad = " ".repeat(lead.len());
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            if idx == 0 {
                format!("{}{}", lead, line)
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect()
}

/// Parenthesizes `text` unless it is already a single token or group.
pub fn atom(text: String) -> String {
    let grouped = text.starts_with('(') && text.ends_with(')') && balanced_group(&text);
    let quoted = text.starts_with('"') && text.ends_with('"');
    if grouped || quoted || !text.contains(char::is_whitespace) {
        text
    } else {
        format!("({})", text)
    }
}

/// Drops one pair of enclosing parentheses, if they enclose all of `text`.
pub fn unwrap_group(text: String) -> String {
    if text.starts_with('(') && text.ends_with(')') && balanced_group(&text) {
        text[1..text.len() - 1].to_string()
    } else {
        text
    }
}

/// Whether the outermost parentheses of `text` enclose all of it.
fn balanced_group(text: &str) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    for (idx, c) in text.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 && idx + 1 < text.len() {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Inline marker for a construct the translator does not model, usable
/// wherever a value is expected.
pub fn unsupported_value(what: &str) -> String {
    format!("(undefined {{- unsupported: {} -}})", comment_text(what))
}

/// Inline marker for an unmodeled statement; the state passes through.
pub fn unsupported_state(current: &str, what: &str) -> String {
    format!("{} {{- unsupported: {} -}}", current, comment_text(what))
}

/// Whether rendered text carries an unsupported marker.
pub fn has_placeholder(text: &str) -> bool {
    text.contains("{- unsupported:")
}

pub fn string_literal(value: &str) -> String {
    format!("{:?}", value)
}

fn comment_text(what: &str) -> String {
    let flat: String = what
        .replace("{-", "{ -")
        .replace("-}", "- }")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if flat.chars().count() > 60 {
        let cut: String = flat.chars().take(57).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_let_chain_uses_braces() {
        let expr = HsExpr::let_in(
            vec![
                ("st1".into(), HsExpr::atom("st { aC = 1 }")),
                ("st2".into(), HsExpr::atom("st1 { bC = 2 }")),
            ],
            HsExpr::atom("st2"),
        );
        assert_eq!(
            expr.render(),
            vec![
                "let { st1 = st { aC = 1 }",
                "    ; st2 = st1 { bC = 2 }",
                "    } in st2",
            ]
        );
    }

    #[test]
    fn test_empty_let_is_its_body() {
        let expr = HsExpr::let_in(Vec::new(), HsExpr::atom("st"));
        assert_eq!(expr, HsExpr::atom("st"));
    }

    #[test]
    fn test_short_conditional_stays_inline() {
        let expr = HsExpr::if_then_else("(x > 0)", HsExpr::atom("st"), HsExpr::atom("revert \"error\""));
        assert_eq!(expr.render_inline().as_deref(), Some("if (x > 0) then st else revert \"error\""));
    }

    #[test]
    fn test_nested_conditional_hangs() {
        let inner = HsExpr::let_in(vec![("st1".into(), HsExpr::atom("st"))], HsExpr::atom("st1"));
        let expr = HsExpr::if_then_else("c", inner, HsExpr::atom("st"));
        let lines = expr.render();
        assert_eq!(lines[0], "if c");
        assert_eq!(lines[1], "  then let { st1 = st");
        assert_eq!(lines[2], "           } in st1");
        assert_eq!(lines[3], "  else st");
    }

    #[test]
    fn test_atom_parenthesizes_compound_text() {
        assert_eq!(atom("x".into()), "x");
        assert_eq!(atom("(a + b)".into()), "(a + b)");
        assert_eq!(atom("(a) + (b)".into()), "((a) + (b))");
        assert_eq!(atom("\"a b\"".into()), "\"a b\"");
        assert_eq!(atom("f st".into()), "(f st)");
    }

    #[test]
    fn test_unwrap_group() {
        assert_eq!(unwrap_group("(f st x)".into()), "f st x");
        assert_eq!(unwrap_group("(a) + (b)".into()), "(a) + (b)");
        assert_eq!(unwrap_group("st".into()), "st");
    }

    #[test]
    fn test_placeholder_text_is_comment_safe() {
        let text = unsupported_value("odd {- comment -}");
        assert!(has_placeholder(&text));
        assert_eq!(text.matches("-}").count(), 1);
    }
}
