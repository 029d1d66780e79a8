//! Parser for the netlist language.

use std::collections::HashMap;

use super::ast::{ComponentDef, ComponentKind, NetlistAst};
use super::lexer::{parse_magnitude, Lexer, Token, TokenKind};
use crate::error::{NodalError, Result};

/// Parser for netlist input.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self { lexer }
    }

    /// Parse the entire netlist.
    pub fn parse(&mut self) -> Result<NetlistAst> {
        let mut ast = NetlistAst::new();

        loop {
            let statement = self.read_statement()?;
            if statement.is_empty() {
                break;
            }
            ast.components.push(interpret_statement(&statement)?);
        }

        Ok(ast)
    }

    /// Collect the tokens of the next non-blank line. Empty at end of input.
    fn read_statement(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.lexer.next_token()?;
            match token.kind {
                TokenKind::Newline => {
                    if tokens.is_empty() {
                        continue;
                    }
                    break;
                }
                TokenKind::Eof => break,
                _ => tokens.push(token),
            }
        }
        Ok(tokens)
    }
}

/// Interpret one statement: a component declaration or a `node = value`
/// voltage-source shorthand.
fn interpret_statement(tokens: &[Token]) -> Result<ComponentDef> {
    let first = &tokens[0];
    if first.kind != TokenKind::Identifier {
        return Err(NodalError::parse(
            first.line,
            first.column,
            format!("expected component kind or node name, got '{}'", first.text),
        ));
    }

    if let Some(kind) = ComponentKind::from_keyword(&first.text) {
        return interpret_component(kind, first, &tokens[1..]);
    }

    // `<node> = <value>v` creates an implicit voltage source to ground.
    if tokens.len() >= 2 && tokens[1].kind == TokenKind::Equals {
        return interpret_assignment(first, tokens);
    }

    Err(NodalError::UnknownKind {
        kind: first.text.clone(),
        line: first.line,
    })
}

fn interpret_assignment(node: &Token, tokens: &[Token]) -> Result<ComponentDef> {
    if tokens.len() != 3 || tokens[2].kind != TokenKind::Number {
        let at = tokens.get(2).unwrap_or(&tokens[1]);
        return Err(NodalError::parse(
            at.line,
            at.column,
            "expected a single voltage after '='",
        ));
    }
    let value = magnitude(&tokens[2])?;

    Ok(ComponentDef {
        kind: ComponentKind::VoltageSource,
        name: None,
        nodes: vec![node.text.clone(), "0".to_string()],
        value: Some(value),
        params: HashMap::new(),
        line: node.line,
    })
}

fn interpret_component(
    kind: ComponentKind,
    keyword: &Token,
    rest: &[Token],
) -> Result<ComponentDef> {
    // Leading run of name/terminal words. A bare `0` counts as the ground
    // terminal while terminals are still expected.
    let mut words = Vec::new();
    let mut index = 0;
    while index < rest.len() && words.len() < 3 {
        let token = &rest[index];
        let is_key = token.kind == TokenKind::Identifier
            && rest.get(index + 1).map(|t| t.kind) == Some(TokenKind::Equals);
        let is_ground_digit = token.kind == TokenKind::Number
            && token.text == "0"
            && (words.len() < 2 || rest[index + 1..].iter().any(|t| t.kind == TokenKind::Number));
        if is_key || (token.kind == TokenKind::Number && !is_ground_digit) {
            break;
        }
        words.push(token);
        index += 1;
    }

    let (name, nodes) = match words.len() {
        2 => (None, vec![words[0].text.clone(), words[1].text.clone()]),
        3 => {
            if words[0].kind != TokenKind::Identifier {
                return Err(NodalError::parse(
                    words[0].line,
                    words[0].column,
                    "component name must not start with a digit",
                ));
            }
            (
                Some(words[0].text.clone()),
                vec![words[1].text.clone(), words[2].text.clone()],
            )
        }
        _ => {
            return Err(NodalError::parse(
                keyword.line,
                keyword.column,
                format!("{} requires two terminal nodes", kind),
            ));
        }
    };

    // Positional magnitude (required for R, C, L, VG; diodes take keywords only)
    let mut value = None;
    if kind.takes_value() {
        match rest.get(index) {
            Some(token) if token.kind == TokenKind::Number => {
                value = Some(magnitude(token)?);
                index += 1;
            }
            other => {
                let at = other.unwrap_or(keyword);
                return Err(NodalError::parse(
                    at.line,
                    at.column,
                    format!("{} requires a value", kind),
                ));
            }
        }
    }

    // Keyword parameters
    let mut params = HashMap::new();
    while index < rest.len() {
        let key = &rest[index];
        let valid = key.kind == TokenKind::Identifier
            && rest.get(index + 1).map(|t| t.kind) == Some(TokenKind::Equals)
            && rest.get(index + 2).map(|t| t.kind) == Some(TokenKind::Number);
        if !valid {
            return Err(NodalError::parse(
                key.line,
                key.column,
                format!("unexpected token '{}'", key.text),
            ));
        }
        let key_name = key.text.to_ascii_lowercase();
        let allowed = match kind {
            ComponentKind::Capacitor | ComponentKind::Inductor => {
                matches!(key_name.as_str(), "v0" | "i0")
            }
            ComponentKind::Diode => matches!(key_name.as_str(), "i0" | "m" | "v0"),
            _ => false,
        };
        if !allowed {
            return Err(NodalError::parse(
                key.line,
                key.column,
                format!("parameter '{}' is not valid for {}", key.text, kind),
            ));
        }
        params.insert(key_name, magnitude(&rest[index + 2])?);
        index += 3;
    }

    if kind == ComponentKind::Diode {
        for required in ["i0", "m", "v0"] {
            if !params.contains_key(required) {
                return Err(NodalError::parse(
                    keyword.line,
                    keyword.column,
                    format!("diode requires parameter '{}'", required),
                ));
            }
        }
    }

    Ok(ComponentDef {
        kind,
        name,
        nodes,
        value,
        params,
        line: keyword.line,
    })
}

fn magnitude(token: &Token) -> Result<f64> {
    parse_magnitude(&token.text).ok_or_else(|| {
        NodalError::parse(
            token.line,
            token.column,
            format!("malformed magnitude '{}'", token.text),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_resistor() {
        let ast = super::super::parse("R R1 vcc v_out 1k").unwrap();
        assert_eq!(ast.components.len(), 1);
        let def = &ast.components[0];
        assert_eq!(def.kind, ComponentKind::Resistor);
        assert_eq!(def.name.as_deref(), Some("R1"));
        assert_eq!(def.nodes, vec!["vcc", "v_out"]);
        assert_eq!(def.value, Some(1000.0));
    }

    #[test]
    fn test_parse_unnamed_resistor_with_unit() {
        let ast = super::super::parse("R v_out gnd 1kOhm").unwrap();
        let def = &ast.components[0];
        assert!(def.name.is_none());
        assert_eq!(def.value, Some(1000.0));
    }

    #[test]
    fn test_parse_assignment_shorthand() {
        let ast = super::super::parse("vcc = 2.5v").unwrap();
        let def = &ast.components[0];
        assert_eq!(def.kind, ComponentKind::VoltageSource);
        assert!(def.name.is_none());
        assert_eq!(def.nodes, vec!["vcc", "0"]);
        assert_eq!(def.value, Some(2.5));
    }

    #[test]
    fn test_parse_diode_keyword_params() {
        let ast = super::super::parse("D my_diode v1 gnd i0=1e-5 m=3 v0=0.5").unwrap();
        let def = &ast.components[0];
        assert_eq!(def.kind, ComponentKind::Diode);
        assert_eq!(def.name.as_deref(), Some("my_diode"));
        assert_eq!(def.params["i0"], 1e-5);
        assert_eq!(def.params["m"], 3.0);
        assert_eq!(def.params["v0"], 0.5);
    }

    #[test]
    fn test_parse_diode_params_any_order() {
        let ast = super::super::parse("D a b m=2 v0=0.3 i0=1e-6").unwrap();
        let def = &ast.components[0];
        assert_eq!(def.params["m"], 2.0);
    }

    #[test]
    fn test_parse_diode_missing_param() {
        let err = super::super::parse("D a b i0=1e-6 m=2").unwrap_err();
        assert!(matches!(err, NodalError::Parse { .. }));
    }

    #[test]
    fn test_parse_capacitor_initial_conditions() {
        let ast = super::super::parse("C c1 v_out 0 30uF v0=1.5 i0=0.1").unwrap();
        let def = &ast.components[0];
        assert_eq!(def.value, Some(30e-6));
        assert_eq!(def.params["v0"], 1.5);
        assert_eq!(def.params["i0"], 0.1);
    }

    #[test]
    fn test_parse_ground_digit_terminal() {
        let ast = super::super::parse("R 0 a 1k\nVG src vcc 0 5v").unwrap();
        assert_eq!(ast.components[0].nodes, vec!["0", "a"]);
        assert_eq!(ast.components[1].nodes, vec!["vcc", "0"]);
        assert_eq!(ast.components[1].value, Some(5.0));
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = super::super::parse("X a b 1k").unwrap_err();
        assert!(matches!(err, NodalError::UnknownKind { ref kind, line: 1 } if kind == "X"));
    }

    #[test]
    fn test_parse_missing_value() {
        let err = super::super::parse("R a b").unwrap_err();
        assert!(matches!(err, NodalError::Parse { .. }));
    }

    #[test]
    fn test_parse_malformed_magnitude() {
        let err = super::super::parse("R a b 1x").unwrap_err();
        assert!(matches!(err, NodalError::Parse { .. }));
    }

    #[test]
    fn test_parse_case_insensitive_kind() {
        let ast = super::super::parse("r a b 1k\nvg s a 0 1v").unwrap();
        assert_eq!(ast.components[0].kind, ComponentKind::Resistor);
        assert_eq!(ast.components[1].kind, ComponentKind::VoltageSource);
    }

    #[test]
    fn test_parse_multiline_with_comments() {
        let input = "# divider\nR R1 vcc v_out 1k\nR v_out gnd 1kOhm ; lower leg\nvcc = 2.5v\n";
        let ast = super::super::parse(input).unwrap();
        assert_eq!(ast.components.len(), 3);
        assert_eq!(ast.components[2].line, 4);
    }

    #[test]
    fn test_parse_rejects_resistor_extra_param() {
        let err = super::super::parse("R a b 1k v0=2").unwrap_err();
        assert!(matches!(err, NodalError::Parse { .. }));
    }
}
