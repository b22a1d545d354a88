use crate::formula::formula_model::{BinOp, Expr, FormulaError, Literal, UnaryOp, MAX_DEPTH};
use crate::formula::lexer::{tokenize, Token};

/// Parse a formula into an expression tree.
///
/// The whole input must be consumed: `"1 2"` is an error, not `1`.
/// Trees deeper than [`MAX_DEPTH`] are rejected with `TooDeep`.
pub fn parse(src: &str) -> Result<Expr, FormulaError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(FormulaError::UnexpectedToken(format!("{:?}", token))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(FormulaError::UnexpectedToken(format!("{:?}", token))),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    /// One level deeper in the tree. Callers restore `depth` themselves;
    /// on error the whole parse is abandoned.
    fn descend(&mut self) -> Result<(), FormulaError> {
        if self.depth >= MAX_DEPTH {
            return Err(FormulaError::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr, FormulaError> {
        self.descend()?;
        let expr = self.conditional()?;
        self.depth -= 1;
        Ok(expr)
    }

    fn conditional(&mut self) -> Result<Expr, FormulaError> {
        let condition = self.logical_or()?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let then_expr = self.expression()?;
        self.expect(Token::Colon)?;
        let else_expr = self.expression()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, FormulaError> {
        let mark = self.depth;
        let mut left = self.logical_and()?;
        while self.eat(&Token::OrOr) {
            self.descend()?;
            let right = self.logical_and()?;
            left = binary(BinOp::Or, left, right);
        }
        self.depth = mark;
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, FormulaError> {
        let mark = self.depth;
        let mut left = self.equality()?;
        while self.eat(&Token::AndAnd) {
            self.descend()?;
            let right = self.equality()?;
            left = binary(BinOp::And, left, right);
        }
        self.depth = mark;
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, FormulaError> {
        let mark = self.depth;
        let mut left = self.relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::StrictEq) => BinOp::StrictEq,
                Some(Token::StrictNe) => BinOp::StrictNe,
                Some(Token::LooseEq) => BinOp::LooseEq,
                Some(Token::LooseNe) => BinOp::LooseNe,
                _ => {
                    self.depth = mark;
                    return Ok(left);
                }
            };
            self.pos += 1;
            self.descend()?;
            let right = self.relational()?;
            left = binary(op, left, right);
        }
    }

    fn relational(&mut self) -> Result<Expr, FormulaError> {
        let mark = self.depth;
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Ge) => BinOp::Ge,
                _ => {
                    self.depth = mark;
                    return Ok(left);
                }
            };
            self.pos += 1;
            self.descend()?;
            let right = self.additive()?;
            left = binary(op, left, right);
        }
    }

    fn additive(&mut self) -> Result<Expr, FormulaError> {
        let mark = self.depth;
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => {
                    self.depth = mark;
                    return Ok(left);
                }
            };
            self.pos += 1;
            self.descend()?;
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, FormulaError> {
        let mark = self.depth;
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Mod,
                _ => {
                    self.depth = mark;
                    return Ok(left);
                }
            };
            self.pos += 1;
            self.descend()?;
            let right = self.unary()?;
            left = binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.pos += 1;
        self.descend()?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, FormulaError> {
        let mark = self.depth;
        let mut expr = self.primary()?;
        loop {
            let chained = matches!(
                self.peek(),
                Some(Token::Dot | Token::LBracket | Token::LParen)
            );
            if chained {
                self.descend()?;
            }
            if self.eat(&Token::Dot) {
                match self.advance() {
                    Some(Token::Ident(name)) => expr = Expr::member(expr, &name),
                    Some(token) => return Err(FormulaError::UnexpectedToken(format!("{:?}", token))),
                    None => return Err(FormulaError::UnexpectedEnd),
                }
            } else if self.eat(&Token::LBracket) {
                let property = self.expression()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: Box::new(property),
                };
            } else if self.eat(&Token::LParen) {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                self.depth = mark;
                return Ok(expr);
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, FormulaError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen)?;
            return Ok(args);
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Literal::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Literal::Str(s))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Expr::Literal(Literal::Bool(true)),
                "false" => Expr::Literal(Literal::Bool(false)),
                "null" => Expr::Literal(Literal::Null),
                "undefined" => Expr::Literal(Literal::Undefined),
                "NaN" => Expr::Literal(Literal::Number(f64::NAN)),
                "Infinity" => Expr::Literal(Literal::Number(f64::INFINITY)),
                _ => Expr::Ident(name),
            }),
            Some(Token::LParen) => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(FormulaError::UnexpectedToken(format!("{:?}", token))),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: &str) -> Expr {
        Expr::member(Expr::Ident("values".into()), id)
    }

    #[test]
    fn test_literal_parsing() {
        assert_eq!(parse("42").unwrap(), Expr::Literal(Literal::Number(42.0)));
        assert_eq!(parse("'hi'").unwrap(), Expr::Literal(Literal::Str("hi".into())));
        assert_eq!(parse("true").unwrap(), Expr::Literal(Literal::Bool(true)));
    }

    #[test]
    fn test_field_access_forms() {
        assert_eq!(parse("values.price").unwrap(), field("price"));
        assert_eq!(parse("values['price']").unwrap(), field("price"));
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        match parse("values.a + values.b * 2").unwrap() {
            Expr::Binary {
                op: BinOp::Add,
                left,
                right,
            } => {
                assert_eq!(*left, field("a"));
                assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("Expected Add at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        match parse("10 - 4 - 3").unwrap() {
            Expr::Binary {
                op: BinOp::Sub,
                left,
                right,
            } => {
                assert!(matches!(*left, Expr::Binary { op: BinOp::Sub, .. }));
                assert_eq!(*right, Expr::Literal(Literal::Number(3.0)));
            }
            other => panic!("Expected Sub at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_call_with_member_argument() {
        match parse("Number(values.a)").unwrap() {
            Expr::Call { callee, args } => {
                assert_eq!(*callee, Expr::Ident("Number".into()));
                assert_eq!(args, vec![field("a")]);
            }
            other => panic!("Expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_conditional_nests_to_the_right() {
        let expr = parse("values.a ? 1 : values.b ? 2 : 3").unwrap();
        match expr {
            Expr::Conditional { else_expr, .. } => {
                assert!(matches!(*else_expr, Expr::Conditional { .. }));
            }
            other => panic!("Expected Conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(matches!(parse("1 2"), Err(FormulaError::UnexpectedToken(_))));
    }

    #[test]
    fn test_incomplete_expression() {
        assert_eq!(parse("values.a +"), Err(FormulaError::UnexpectedEnd));
        assert_eq!(parse(""), Err(FormulaError::UnexpectedEnd));
    }

    #[test]
    fn test_unbalanced_parens() {
        assert_eq!(parse("(1 + 2"), Err(FormulaError::UnexpectedEnd));
    }
}
