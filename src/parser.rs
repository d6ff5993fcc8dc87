use std::collections::HashMap;

use log::debug;

use crate::ast::{Expression, Function, Prototype};
use crate::lexer::{Lexer, Token};

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum ParserError {
    #[error("unknown token when expecting an expression")]
    UnknownToken,
    #[error("expected ')'")]
    ExpectedCloseParen,
    #[error("Expected ')' or ',' in argument list")]
    ExpectedArgumentDelimiter,
    #[error("Expected function name in prototype")]
    ExpectedFunctionName,
    #[error("Expected '(' in prototype")]
    ExpectedPrototypeOpenParen,
    #[error("Expected ')' in prototype")]
    ExpectedPrototypeCloseParen,
}

pub type PartialParseResult = Result<Expression, ParserError>;

/// The built-in binary operators. Higher binds tighter.
pub fn default_precedence() -> HashMap<char, i32> {
    let mut operator_precedence = HashMap::new();
    operator_precedence.insert('<', 10);
    operator_precedence.insert('+', 20);
    operator_precedence.insert('-', 30);
    operator_precedence.insert('*', 40);
    operator_precedence
}

/// Recursive descent parser pulling tokens from a [`Lexer`] one at a time.
///
/// The parser starts out unprimed: call [`Parser::advance`] once to load the
/// first token before parsing.
pub struct Parser<I: Iterator<Item = char>> {
    lexer: Lexer<I>,
    cur_tok: Token,
    operator_precedence: HashMap<char, i32>,
}

impl<I: Iterator<Item = char>> Parser<I> {
    pub fn new(lexer: Lexer<I>) -> Self {
        Self::with_precedence(lexer, default_precedence())
    }

    pub fn with_precedence(lexer: Lexer<I>, operator_precedence: HashMap<char, i32>) -> Self {
        Self {
            lexer,
            cur_tok: Token::Eof,
            operator_precedence,
        }
    }

    /// Declare `op` as a binary operator, replacing any previous precedence.
    /// A precedence of zero or less leaves it unusable as an operator.
    pub fn install_operator(&mut self, op: char, precedence: i32) {
        self.operator_precedence.insert(op, precedence);
    }

    pub fn cur_tok(&self) -> &Token {
        &self.cur_tok
    }

    /// Read the next token from the lexer into the current token.
    pub fn advance(&mut self) -> &Token {
        self.cur_tok = self.lexer.next_token();
        &self.cur_tok
    }

    /// Precedence of the pending binary operator, or -1 if the current token
    /// isn't one.
    pub fn token_precedence(&self) -> i32 {
        match self.cur_tok {
            Token::Char(op) if op.is_ascii() => match self.operator_precedence.get(&op) {
                Some(&precedence) if precedence > 0 => precedence,
                _ => -1,
            },
            _ => -1,
        }
    }

    fn parse_number(&mut self) -> PartialParseResult {
        let value = self.lexer.number();
        self.advance();
        Ok(Expression::Literal(value))
    }

    fn parse_nested(&mut self) -> PartialParseResult {
        self.advance();
        let res = self.parse_expression()?;
        if self.cur_tok != Token::Char(')') {
            return Err(ParserError::ExpectedCloseParen);
        }
        self.advance();
        Ok(res)
    }

    fn parse_identifier(&mut self) -> PartialParseResult {
        let name = self.lexer.identifier().to_string();
        self.advance();

        if self.cur_tok != Token::Char('(') {
            return Ok(Expression::Variable(name));
        }
        self.advance();

        let mut args = Vec::new();
        if self.cur_tok != Token::Char(')') {
            loop {
                args.push(self.parse_expression()?);

                if self.cur_tok == Token::Char(')') {
                    break;
                }
                if self.cur_tok != Token::Char(',') {
                    return Err(ParserError::ExpectedArgumentDelimiter);
                }
                self.advance();
            }
        }
        self.advance();

        Ok(Expression::Call(name, args))
    }

    fn parse_primary(&mut self) -> PartialParseResult {
        match self.cur_tok {
            Token::Identifier(_) => self.parse_identifier(),
            Token::Number(_) => self.parse_number(),
            Token::Char('(') => self.parse_nested(),
            _ => Err(ParserError::UnknownToken),
        }
    }

    /// Fold `(binop primary)*` onto `lhs`, consuming only operators that bind
    /// at least as tightly as `expr_precedence`.
    fn parse_rhs(&mut self, expr_precedence: i32, lhs: Expression) -> PartialParseResult {
        let mut result = lhs;

        loop {
            let precedence = self.token_precedence();
            if precedence < expr_precedence {
                return Ok(result);
            }

            let operator = match self.cur_tok {
                Token::Char(op) => op,
                _ => return Ok(result),
            };
            self.advance();

            let mut rhs = self.parse_primary()?;

            if precedence < self.token_precedence() {
                rhs = self.parse_rhs(precedence + 1, rhs)?;
            }

            result = Expression::binary(operator, result, rhs);
        }
    }

    pub fn parse_expression(&mut self) -> PartialParseResult {
        let lhs = self.parse_primary()?;
        self.parse_rhs(0, lhs)
    }

    /// `id '(' id* ')'`
    pub fn parse_prototype(&mut self) -> Result<Prototype, ParserError> {
        let name = match self.cur_tok {
            Token::Identifier(ref name) => name.clone(),
            _ => return Err(ParserError::ExpectedFunctionName),
        };
        self.advance();

        if self.cur_tok != Token::Char('(') {
            return Err(ParserError::ExpectedPrototypeOpenParen);
        }

        let mut args = Vec::new();
        while let Token::Identifier(arg) = self.advance() {
            args.push(arg.clone());
        }

        if self.cur_tok != Token::Char(')') {
            return Err(ParserError::ExpectedPrototypeCloseParen);
        }
        self.advance();

        Ok(Prototype { name, args })
    }

    /// `'def' prototype expression`
    pub fn parse_definition(&mut self) -> Result<Function, ParserError> {
        self.advance();
        let prototype = self.parse_prototype()?;
        let body = self.parse_expression()?;
        debug!("parsed definition of {}", prototype.name);
        Ok(Function { prototype, body })
    }

    /// `'extern' prototype`
    pub fn parse_extern(&mut self) -> Result<Prototype, ParserError> {
        self.advance();
        let prototype = self.parse_prototype()?;
        debug!("parsed extern {}", prototype.name);
        Ok(prototype)
    }

    /// A bare expression, wrapped in an anonymous zero-argument function.
    pub fn parse_top_level_expr(&mut self) -> Result<Function, ParserError> {
        let body = self.parse_expression()?;
        debug!("parsed top-level expression");
        Ok(Function::anonymous(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ANON_FN_NAME;
    use pretty_assertions::assert_eq;
    use std::str::Chars;

    fn parser(input: &str) -> Parser<Chars<'_>> {
        let mut parser = Parser::new(Lexer::new(input.chars()));
        parser.advance();
        parser
    }

    fn num(value: f64) -> Expression {
        Expression::Literal(value)
    }

    fn var(name: &str) -> Expression {
        Expression::Variable(name.to_string())
    }

    fn bin(op: char, lhs: Expression, rhs: Expression) -> Expression {
        Expression::binary(op, lhs, rhs)
    }

    #[test]
    fn parse_expr_works() {
        let res = parser("x + 1 * (2 - 3)").parse_expression().unwrap();
        let target = bin('+', var("x"), bin('*', num(1.0), bin('-', num(2.0), num(3.0))));
        assert_eq!(res, target);
    }

    #[test]
    fn higher_precedence_on_the_right_groups_first() {
        let res = parser("1 + 2 * 3").parse_expression().unwrap();
        assert_eq!(res, bin('+', num(1.0), bin('*', num(2.0), num(3.0))));
    }

    #[test]
    fn higher_precedence_on_the_left_groups_first() {
        let res = parser("1 * 2 + 3").parse_expression().unwrap();
        assert_eq!(res, bin('+', bin('*', num(1.0), num(2.0)), num(3.0)));
    }

    #[test]
    fn equal_precedence_associates_left() {
        let res = parser("1 - 2 - 3").parse_expression().unwrap();
        assert_eq!(res, bin('-', bin('-', num(1.0), num(2.0)), num(3.0)));
    }

    #[test]
    fn minus_binds_tighter_than_plus() {
        let res = parser("a + b - c").parse_expression().unwrap();
        assert_eq!(res, bin('+', var("a"), bin('-', var("b"), var("c"))));
    }

    #[test]
    fn comparison_binds_loosest() {
        let res = parser("a < b * 2 + 1").parse_expression().unwrap();
        assert_eq!(
            res,
            bin('<', var("a"), bin('+', bin('*', var("b"), num(2.0)), num(1.0)))
        );
    }

    #[test]
    fn mixed_chain_resumes_at_lower_precedence() {
        let res = parser("a + b * c - d").parse_expression().unwrap();
        assert_eq!(
            res,
            bin('+', var("a"), bin('-', bin('*', var("b"), var("c")), var("d")))
        );
    }

    #[test]
    fn unknown_operator_ends_the_expression() {
        let mut p = parser("a / b");
        assert_eq!(p.parse_expression().unwrap(), var("a"));
        assert_eq!(p.cur_tok(), &Token::Char('/'));
    }

    #[test]
    fn installed_operator_is_used() {
        let mut p = Parser::new(Lexer::new("a / b + c".chars()));
        p.install_operator('/', 50);
        p.advance();
        assert_eq!(
            p.parse_expression().unwrap(),
            bin('+', bin('/', var("a"), var("b")), var("c"))
        );
    }

    #[test]
    fn non_positive_precedence_is_not_an_operator() {
        let mut table = default_precedence();
        table.insert('+', 0);
        let mut p = Parser::with_precedence(Lexer::new("a + b".chars()), table);
        p.advance();
        assert_eq!(p.token_precedence(), -1);
        p.advance();
        assert_eq!(p.token_precedence(), -1);
    }

    #[test]
    fn non_ascii_operator_is_never_binary() {
        let mut p = Parser::new(Lexer::new("a é b".chars()));
        p.install_operator('é', 50);
        p.advance();
        p.advance();
        assert_eq!(p.cur_tok(), &Token::Char('é'));
        assert_eq!(p.token_precedence(), -1);
    }

    #[test]
    fn call_with_arguments() {
        let res = parser("foo(1, 2+3)").parse_expression().unwrap();
        assert_eq!(
            res,
            Expression::Call(
                "foo".to_string(),
                vec![num(1.0), bin('+', num(2.0), num(3.0))]
            )
        );
    }

    #[test]
    fn call_without_arguments() {
        let res = parser("foo()").parse_expression().unwrap();
        assert_eq!(res, Expression::Call("foo".to_string(), vec![]));
    }

    #[test]
    fn nested_calls() {
        let res = parser("f(g(x), (y))").parse_expression().unwrap();
        assert_eq!(
            res,
            Expression::Call(
                "f".to_string(),
                vec![Expression::Call("g".to_string(), vec![var("x")]), var("y")]
            )
        );
    }

    #[test]
    fn missing_argument_delimiter() {
        assert_eq!(
            parser("foo(1 2)").parse_expression(),
            Err(ParserError::ExpectedArgumentDelimiter)
        );
    }

    #[test]
    fn missing_close_paren() {
        assert_eq!(
            parser("(1 + 2").parse_expression(),
            Err(ParserError::ExpectedCloseParen)
        );
    }

    #[test]
    fn unknown_token() {
        assert_eq!(parser(")").parse_expression(), Err(ParserError::UnknownToken));
        assert_eq!(parser("1 +").parse_expression(), Err(ParserError::UnknownToken));
    }

    #[test]
    fn prototype_takes_space_separated_params() {
        let proto = parser("add(x y z)").parse_prototype().unwrap();
        assert_eq!(
            proto,
            Prototype::new("add", vec!["x".to_string(), "y".to_string(), "z".to_string()])
        );
    }

    #[test]
    fn prototype_errors() {
        assert_eq!(
            parser("1(x)").parse_prototype(),
            Err(ParserError::ExpectedFunctionName)
        );
        assert_eq!(
            parser("f x").parse_prototype(),
            Err(ParserError::ExpectedPrototypeOpenParen)
        );
        assert_eq!(
            parser("f(x, y)").parse_prototype(),
            Err(ParserError::ExpectedPrototypeCloseParen)
        );
    }

    #[test]
    fn definition() {
        let func = parser("def add(a b) a + b").parse_definition().unwrap();
        assert_eq!(
            func,
            Function {
                prototype: Prototype::new("add", vec!["a".to_string(), "b".to_string()]),
                body: bin('+', var("a"), var("b")),
            }
        );
    }

    #[test]
    fn definition_with_bad_prototype() {
        assert_eq!(
            parser("def 1 2").parse_definition(),
            Err(ParserError::ExpectedFunctionName)
        );
    }

    #[test]
    fn extern_has_no_body() {
        let mut p = parser("extern sin(x); 1");
        assert_eq!(
            p.parse_extern().unwrap(),
            Prototype::new("sin", vec!["x".to_string()])
        );
        assert_eq!(p.cur_tok(), &Token::Char(';'));
    }

    #[test]
    fn top_level_expression_is_wrapped() {
        let func = parser("4 + x").parse_top_level_expr().unwrap();
        assert_eq!(func.prototype.name, ANON_FN_NAME);
        assert!(func.prototype.args.is_empty());
        assert_eq!(func.body, bin('+', num(4.0), var("x")));
    }
}
