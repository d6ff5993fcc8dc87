use std::{fmt, io::Read};

use lazy_static::lazy_static;
use log::{trace, warn};
use regex::Regex;

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Eof,
    Def,
    Extern,
    Identifier(String),
    Number(f64),
    /// Any other character, returned as itself (operators, parens, commas...).
    Char(char),
}

impl Token {
    /// Integer encoding of the token: small negative sentinels for the fixed
    /// categories, the character's ordinal otherwise.
    pub fn code(&self) -> i32 {
        match self {
            Token::Eof => -1,
            Token::Def => -2,
            Token::Extern => -3,
            Token::Identifier(_) => -4,
            Token::Number(_) => -5,
            Token::Char(c) => *c as i32,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Eof => write!(f, "end of input"),
            Token::Def => write!(f, "def"),
            Token::Extern => write!(f, "extern"),
            Token::Identifier(ident) => write!(f, "identifier `{}`", ident),
            Token::Number(num) => write!(f, "number {}", num),
            Token::Char(c) => write!(f, "'{}'", c),
        }
    }
}

lazy_static! {
    static ref NUMBER_PREFIX_RE: Regex = Regex::new(r"^(\d+\.?\d*|\.\d+)").unwrap();
}

/// Convert a run of digits and dots the way `strtod` would: the longest
/// leading decimal literal wins and anything after it is dropped, so
/// `1.2.3` reads as `1.2`. A run with no usable prefix (`.`) reads as `0`.
fn parse_number(text: &str) -> f64 {
    NUMBER_PREFIX_RE
        .find(text)
        .and_then(|prefix| prefix.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// Pull-based tokenizer over a character stream.
///
/// Always holds one character read past the end of the last token; that
/// character is where the next call to [`Lexer::next_token`] starts.
pub struct Lexer<I: Iterator<Item = char>> {
    input: I,
    last_char: Option<char>,
    identifier: String,
    number: f64,
}

impl<I: Iterator<Item = char>> Lexer<I> {
    pub fn new(input: I) -> Self {
        Self {
            input,
            last_char: Some(' '),
            identifier: String::new(),
            number: 0.0,
        }
    }

    /// Text of the most recent identifier or keyword.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Value of the most recent number token.
    pub fn number(&self) -> f64 {
        self.number
    }

    fn bump(&mut self) {
        self.last_char = self.input.next();
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.last_char {
            // `is_ascii_whitespace` leaves out vertical tab
            if !(c.is_ascii_whitespace() || c == '\x0b') {
                break;
            }
            self.bump();
        }
    }

    fn lex_identifier(&mut self, first: char) -> Token {
        self.identifier.clear();
        self.identifier.push(first);
        self.bump();
        while let Some(c) = self.last_char {
            if !c.is_ascii_alphanumeric() {
                break;
            }
            self.identifier.push(c);
            self.bump();
        }

        match self.identifier.as_str() {
            "def" => Token::Def,
            "extern" => Token::Extern,
            ident => Token::Identifier(ident.to_string()),
        }
    }

    fn lex_number(&mut self) -> Token {
        let mut text = String::new();
        while let Some(c) = self.last_char {
            if !(c.is_ascii_digit() || c == '.') {
                break;
            }
            text.push(c);
            self.bump();
        }

        self.number = parse_number(&text);
        Token::Number(self.number)
    }

    /// Skip a `#` comment up to the end of the line. Returns `false` if the
    /// input ran out first.
    fn skip_comment(&mut self) -> bool {
        loop {
            self.bump();
            match self.last_char {
                None => return false,
                Some('\n') | Some('\r') => return true,
                Some(_) => {}
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        let token = loop {
            self.skip_whitespace();

            let c = match self.last_char {
                Some(c) => c,
                None => break Token::Eof,
            };

            if c.is_ascii_alphabetic() {
                break self.lex_identifier(c);
            }

            if c.is_ascii_digit() || c == '.' {
                break self.lex_number();
            }

            if c == '#' {
                if self.skip_comment() {
                    continue;
                }
                break Token::Eof;
            }

            self.bump();
            break Token::Char(c);
        };

        trace!("lexed {}", token);
        token
    }
}

impl<I: Iterator<Item = char>> Iterator for Lexer<I> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        match self.next_token() {
            Token::Eof => None,
            token => Some(token),
        }
    }
}

/// lex the given input string - the final token is always `Token::Eof`
pub fn lex(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input.chars());
    let mut res: Vec<Token> = lexer.by_ref().collect();
    res.push(Token::Eof);
    res
}

/// Read a byte stream one byte per character, stopping at the first I/O error.
pub fn byte_chars<R: Read>(reader: R) -> impl Iterator<Item = char> {
    reader.bytes().map_while(|byte| match byte {
        Ok(byte) => Some(char::from(byte)),
        Err(err) => {
            warn!("stopped reading input: {}", err);
            None
        }
    })
}
