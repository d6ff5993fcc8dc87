//! Top-level read loop: dispatches on `def`, `extern` and bare expressions,
//! reports each result to a diagnostics sink, and recovers from syntax
//! errors by skipping a single token.

use std::io::{self, Write};

use log::debug;

use crate::ast::ASTNode;
use crate::lexer::{Lexer, Token};
use crate::parser::{Parser, ParserError};

pub const PROMPT: &str = "ready> ";

pub struct Session<I: Iterator<Item = char>, W: Write> {
    parser: Parser<I>,
    diagnostics: W,
    prompt: bool,
    primed: bool,
    finished: bool,
}

impl<I: Iterator<Item = char>, W: Write> Session<I, W> {
    /// Start a session over an unprimed parser.
    pub fn new(parser: Parser<I>, diagnostics: W) -> Self {
        Self {
            parser,
            diagnostics,
            prompt: false,
            primed: false,
            finished: false,
        }
    }

    /// Write `ready> ` once before the first token is read and again before
    /// every dispatch.
    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn into_diagnostics(self) -> W {
        self.diagnostics
    }

    fn show_prompt(&mut self) -> io::Result<()> {
        if self.prompt {
            write!(self.diagnostics, "{}", PROMPT)?;
            self.diagnostics.flush()?;
        }
        Ok(())
    }

    fn report(&mut self, result: &Result<ASTNode, ParserError>) -> io::Result<()> {
        match result {
            Ok(ASTNode::Function(func)) if func.is_anonymous() => {
                writeln!(self.diagnostics, "Parsed a top-level expr")?
            }
            Ok(ASTNode::Function(_)) => writeln!(self.diagnostics, "Parsed a function definition.")?,
            Ok(ASTNode::Extern(_)) => writeln!(self.diagnostics, "Parsed an extern")?,
            Err(err) => writeln!(self.diagnostics, "Error: {}", err)?,
        }
        self.diagnostics.flush()
    }

    /// Parse the next top-level form. `Ok(None)` once the input is exhausted;
    /// `Err` only if the diagnostics sink fails.
    pub fn next_form(&mut self) -> io::Result<Option<Result<ASTNode, ParserError>>> {
        if self.finished {
            return Ok(None);
        }
        if !self.primed {
            self.show_prompt()?;
            self.parser.advance();
            self.primed = true;
        }

        loop {
            self.show_prompt()?;
            let result = match self.parser.cur_tok() {
                Token::Eof => {
                    self.finished = true;
                    return Ok(None);
                }
                Token::Char(';') => {
                    self.parser.advance();
                    continue;
                }
                Token::Def => self.parser.parse_definition().map(ASTNode::Function),
                Token::Extern => self.parser.parse_extern().map(ASTNode::Extern),
                _ => self.parser.parse_top_level_expr().map(ASTNode::Function),
            };

            // report before skipping, the skip may block on more input
            self.report(&result)?;
            if let Err(ref err) = result {
                debug!("recovering from `{}` at {}", err, self.parser.cur_tok());
                self.parser.advance();
            }
            return Ok(Some(result));
        }
    }

    /// Drain the session, keeping only the forms that parsed.
    pub fn run(&mut self) -> io::Result<Vec<ASTNode>> {
        let mut nodes = Vec::new();
        while let Some(result) = self.next_form()? {
            if let Ok(node) = result {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }
}

/// Parse a whole string, collecting parsed forms and errors separately.
pub fn parse_str(source: &str) -> (Vec<ASTNode>, Vec<ParserError>) {
    let parser = Parser::new(Lexer::new(source.chars()));
    let mut session = Session::new(parser, io::sink());
    let mut nodes = Vec::new();
    let mut errors = Vec::new();
    while let Ok(Some(result)) = session.next_form() {
        match result {
            Ok(node) => nodes.push(node),
            Err(err) => errors.push(err),
        }
    }
    (nodes, errors)
}
