//! Front end for the silly language: a pull-based lexer feeding a
//! precedence-climbing recursive descent parser.

pub mod ast;
pub mod driver;
pub mod lexer;
pub mod parser;
