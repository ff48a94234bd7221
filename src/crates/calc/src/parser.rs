//! Recursive-descent evaluator over the token stream.
//!
//! Precedence, lowest to highest: `+ -`, `* /`, unary minus, `**`
//! (right-associative, binding tighter than unary minus on its left —
//! `-2**2` is `-(2**2)`). Names resolve only through the constant and
//! function allow-lists; anything else fails the parse.

use crate::lexer::Token;

pub(crate) fn parse(tokens: &[Token]) -> Option<f64> {
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if parser.pos != tokens.len() {
        // trailing tokens
        return None;
    }
    Some(value)
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        "tau" => Some(std::f64::consts::TAU),
        _ => None,
    }
}

fn apply(name: &str, arg: f64) -> Option<f64> {
    match name {
        "sqrt" => Some(arg.sqrt()),
        "abs" => Some(arg.abs()),
        _ => None,
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn expect(&mut self, token: Token) -> Option<()> {
        (self.advance() == Some(&token)).then_some(())
    }

    fn expr(&mut self) -> Option<f64> {
        let mut lhs = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            let add = *op == Token::Plus;
            self.pos += 1;
            let rhs = self.term()?;
            lhs = if add { lhs + rhs } else { lhs - rhs };
        }
        Some(lhs)
    }

    fn term(&mut self) -> Option<f64> {
        let mut lhs = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            let mul = *op == Token::Star;
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = if mul { lhs * rhs } else { lhs / rhs };
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<f64> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return Some(-self.unary()?);
        }
        self.power()
    }

    fn power(&mut self) -> Option<f64> {
        let base = self.atom()?;
        if self.peek() == Some(&Token::Pow) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Some(base.powf(exponent));
        }
        Some(base)
    }

    fn atom(&mut self) -> Option<f64> {
        match self.advance()?.clone() {
            Token::Num(value) => Some(value),
            Token::ParenOpen => {
                let value = self.expr()?;
                self.expect(Token::ParenClose)?;
                Some(value)
            }
            Token::Ident(name) => {
                if self.peek() == Some(&Token::ParenOpen) {
                    self.pos += 1;
                    let arg = self.expr()?;
                    self.expect(Token::ParenClose)?;
                    apply(&name, arg)
                } else {
                    constant(&name)
                }
            }
            _ => None,
        }
    }
}
