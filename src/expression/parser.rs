//! Arithmetic over fully substituted formula text.
//!
//! Grammar (whitespace ignored):
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := factor (('*' | '/') factor)*
//! factor     := ('+' | '-') factor | number | '(' expression ')'
//! ```

use super::ExpressionError;

/// Deepest run of signs and parentheses accepted around a single factor.
pub const MAX_NESTING: usize = 256;

/// Evaluate a formula containing only numbers, operators and parentheses.
///
/// Division by zero yields zero.
pub fn evaluate_literal(text: &str) -> Result<f32, ExpressionError> {
    if text.trim().is_empty() {
        return Err(ExpressionError::Empty);
    }

    let mut parser = Parser {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    parser.skip_whitespace();
    if parser.pos < parser.bytes.len() {
        return Err(parser.unexpected());
    }

    Ok(value as f32)
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn expression(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.factor()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    value = if divisor == 0.0 { 0.0 } else { value / divisor };
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor(&mut self) -> Result<f64, ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ExpressionError::TooDeep {
                expression: self.text.to_string(),
                limit: MAX_NESTING,
            });
        }
        let value = self.primary();
        self.depth -= 1;
        value
    }

    fn primary(&mut self) -> Result<f64, ExpressionError> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some(b'+') => {
                self.pos += 1;
                self.factor()
            }
            Some(b'(') => {
                let open = self.pos;
                self.pos += 1;
                let value = self.expression()?;
                if self.peek() != Some(b')') {
                    return Err(ExpressionError::UnmatchedParenthesis {
                        expression: self.text.to_string(),
                        position: open,
                    });
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(_) => Err(self.unexpected()),
            None => Err(ExpressionError::UnexpectedEnd {
                expression: self.text.to_string(),
            }),
        }
    }

    fn number(&mut self) -> Result<f64, ExpressionError> {
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|c| c.is_ascii_digit() || *c == b'.')
        {
            self.pos += 1;
        }

        let literal = &self.text[start..self.pos];
        literal
            .parse::<f64>()
            .map_err(|_| ExpressionError::InvalidNumber {
                expression: self.text.to_string(),
                literal: literal.to_string(),
            })
    }

    /// Next non-whitespace byte, without consuming it.
    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|c| c.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> ExpressionError {
        let found = self.text[self.pos..].chars().next().unwrap_or('\0');
        ExpressionError::UnexpectedCharacter {
            expression: self.text.to_string(),
            position: self.pos,
            found,
        }
    }
}
