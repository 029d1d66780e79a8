//! Lexer (tokenizer) for the netlist language.

use crate::error::{NodalError, Result};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in the netlist language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// An identifier (kind keyword, component name, node name, parameter key)
    Identifier,
    /// A magnitude (number, possibly with SI prefix and unit suffix)
    Number,
    /// Equals sign '='
    Equals,
    /// Newline
    Newline,
    /// End of file
    Eof,
}

/// Lexer for tokenizing netlist input.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let ch = match self.chars.peek().copied() {
            Some(ch) => ch,
            None => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    line: self.line,
                    column: self.column,
                });
            }
        };

        let start_line = self.line;
        let start_column = self.column;

        let token = match ch {
            '\n' => {
                self.advance();
                Token {
                    kind: TokenKind::Newline,
                    text: "\n".to_string(),
                    line: start_line,
                    column: start_column,
                }
            }
            '=' => {
                self.advance();
                Token {
                    kind: TokenKind::Equals,
                    text: "=".to_string(),
                    line: start_line,
                    column: start_column,
                }
            }
            '-' | '+' | '.' | '0'..='9' => {
                let text = self.read_number();
                Token {
                    kind: TokenKind::Number,
                    text,
                    line: start_line,
                    column: start_column,
                }
            }
            _ if ch.is_alphabetic() || ch == '_' => {
                let text = self.read_identifier();
                Token {
                    kind: TokenKind::Identifier,
                    text,
                    line: start_line,
                    column: start_column,
                }
            }
            _ => {
                return Err(NodalError::lexer(
                    start_line,
                    start_column,
                    format!("unexpected character '{}'", ch),
                ));
            }
        };

        Ok(token)
    }

    fn advance(&mut self) -> Option<char> {
        if let Some(ch) = self.chars.next() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            Some(ch)
        } else {
            None
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else if ch == '#' || ch == ';' {
                // Skip comment until end of line
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_number(&mut self) -> String {
        let mut text = String::new();

        // Optional sign
        if let Some(&ch) = self.chars.peek() {
            if ch == '-' || ch == '+' {
                text.push(ch);
                self.advance();
            }
        }

        // Integer part
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Decimal part
        if let Some(&'.') = self.chars.peek() {
            text.push('.');
            self.advance();
            while let Some(&ch) = self.chars.peek() {
                if ch.is_ascii_digit() {
                    text.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        // Exponent part: only consume 'e'/'E' when a digit or sign follows,
        // otherwise the letter belongs to a unit suffix
        if let Some(&ch) = self.chars.peek() {
            if ch == 'e' || ch == 'E' {
                let mut lookahead = self.chars.clone();
                lookahead.next();
                let next = lookahead.peek().copied();
                if matches!(next, Some(c) if c.is_ascii_digit() || c == '-' || c == '+') {
                    text.push(ch);
                    self.advance();
                    if let Some(&sign) = self.chars.peek() {
                        if sign == '-' || sign == '+' {
                            text.push(sign);
                            self.advance();
                        }
                    }
                    while let Some(&c) = self.chars.peek() {
                        if c.is_ascii_digit() {
                            text.push(c);
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
            }
        }

        // SI prefix and unit word ("k", "kOhm", "uF", "v", ...)
        while let Some(&ch) = self.chars.peek() {
            if ch.is_alphabetic() || ch == 'µ' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        text
    }
}

/// Parse a magnitude string with optional SI prefix and unit suffix.
///
/// Accepts plain numbers (`100`, `2.5`, `1e-5`), SI prefixes
/// (`1k`, `30u`, `2n`), and unit words with or without a prefix
/// (`1kOhm`, `30uF`, `50uH`, `2.5v`). Unit words are case-insensitive;
/// the `m`/`M` prefixes keep their case to separate milli from mega.
pub fn parse_magnitude(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    // Split the numeric head from the alphabetic suffix.
    let split = text
        .char_indices()
        .find(|(i, ch)| {
            if ch.is_alphabetic() || *ch == 'µ' {
                // 'e'/'E' inside the head is an exponent when followed by a digit/sign
                if (*ch == 'e' || *ch == 'E')
                    && text[i + 1..]
                        .chars()
                        .next()
                        .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
                {
                    return false;
                }
                true
            } else {
                false
            }
        })
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    let (head, suffix) = text.split_at(split);
    let base: f64 = head.parse().ok()?;

    // Strip the unit word (ohm, F, H, V), case-insensitively.
    let lower = suffix.to_ascii_lowercase();
    let prefix = if lower.ends_with("ohm") {
        &suffix[..suffix.len() - 3]
    } else if matches!(lower.chars().last(), Some('f' | 'h' | 'v')) {
        &suffix[..suffix.len() - 1]
    } else {
        suffix
    };

    let multiplier = match prefix {
        "" => 1.0,
        "p" => 1e-12,
        "n" => 1e-9,
        "u" | "µ" => 1e-6,
        "m" => 1e-3,
        "k" | "K" => 1e3,
        "M" => 1e6,
        _ => return None,
    };

    Some(base * multiplier)
}
