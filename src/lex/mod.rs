use std::{fmt, iter::Peekable, str::Chars};

use internment::LocalIntern;
use log::debug;
use thiserror::Error;

use crate::Name;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(i64),
    Id(Name),
    String(String),
    Char(char),
    Class,
    Return,
    If,
    Else,
    Def,
    Print,
    And,
    Or,
    Not,
    None,
    True,
    False,
    Eq,
    NotEq,
    LessOrEq,
    GreaterOrEq,
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::Id(name) => write!(f, "identifier '{}'", name.as_str()),
            Token::String(s) => write!(f, "string {:?}", s),
            Token::Char(c) => write!(f, "'{}'", c),
            Token::Class => write!(f, "'class'"),
            Token::Return => write!(f, "'return'"),
            Token::If => write!(f, "'if'"),
            Token::Else => write!(f, "'else'"),
            Token::Def => write!(f, "'def'"),
            Token::Print => write!(f, "'print'"),
            Token::And => write!(f, "'and'"),
            Token::Or => write!(f, "'or'"),
            Token::Not => write!(f, "'not'"),
            Token::None => write!(f, "'None'"),
            Token::True => write!(f, "'True'"),
            Token::False => write!(f, "'False'"),
            Token::Eq => write!(f, "'=='"),
            Token::NotEq => write!(f, "'!='"),
            Token::LessOrEq => write!(f, "'<='"),
            Token::GreaterOrEq => write!(f, "'>='"),
            Token::Newline => write!(f, "end of line"),
            Token::Indent => write!(f, "indent"),
            Token::Dedent => write!(f, "dedent"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum LexError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },
    #[error("line {line}: unrecognized escape sequence '\\{escape}'")]
    UnknownEscape { escape: char, line: usize },
    #[error("line {line}: number '{literal}' is out of range")]
    NumberOutOfRange { literal: String, line: usize },
}

/// An eagerly tokenized source program.
///
/// The whole token vector is produced up front; `current` and `advance`
/// give the parser a random-access cursor that saturates at `Eof`.
pub struct Lexer {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Result<Self, LexError> {
        let tokens = tokenize(source)?;
        debug!("lexed {} tokens", tokens.len());
        Ok(Self { tokens, cursor: 0 })
    }

    pub fn current(&self) -> &Token {
        &self.tokens[self.cursor]
    }

    pub fn advance(&mut self) -> &Token {
        if self.cursor + 1 < self.tokens.len() {
            self.cursor += 1;
        }
        &self.tokens[self.cursor]
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut level = 0usize;
    let mut pending = 0usize;
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        let at_line_start = matches!(tokens.last(), Some(Token::Newline));

        // Indentation is reconciled at the first significant character of a
        // line, so blank and comment-only lines leave it untouched.
        if at_line_start && !matches!(c, ' ' | '\t' | '\r' | '\n' | '#') {
            let target = pending / 2;
            if target > level {
                tokens.push(Token::Indent);
                level += 1;
            }
            while target < level {
                tokens.push(Token::Dedent);
                level -= 1;
            }
        }

        match c {
            ' ' => {
                chars.next();
                if at_line_start {
                    pending += 1;
                }
            }
            '\n' => {
                chars.next();
                line += 1;
                pending = 0;
                if !matches!(tokens.last(), Option::None | Some(Token::Newline)) {
                    tokens.push(Token::Newline);
                }
            }
            '#' => {
                while chars.peek().is_some_and(|&c| c != '\n') {
                    chars.next();
                }
            }
            '0'..='9' => tokens.push(number(&mut chars, line)?),
            'A'..='Z' | 'a'..='z' | '_' => tokens.push(word(&mut chars)),
            '\'' | '"' => {
                chars.next();
                tokens.push(string(&mut chars, c, &mut line)?);
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(match c {
                        '=' => Token::Eq,
                        '!' => Token::NotEq,
                        '<' => Token::LessOrEq,
                        _ => Token::GreaterOrEq,
                    });
                } else {
                    tokens.push(Token::Char(c));
                }
            }
            '+' | '-' | '*' | '/' | ':' | '(' | ')' | ',' | '.' => {
                chars.next();
                tokens.push(Token::Char(c));
            }
            // Tabs, carriage returns and other stray characters carry no
            // meaning in the language and are skipped.
            _ => {
                chars.next();
            }
        }
    }

    if !matches!(
        tokens.last(),
        Option::None | Some(Token::Newline) | Some(Token::Dedent)
    ) {
        tokens.push(Token::Newline);
    }
    while level > 0 {
        tokens.push(Token::Dedent);
        level -= 1;
    }
    tokens.push(Token::Eof);

    Ok(tokens)
}

fn number(chars: &mut Peekable<Chars>, line: usize) -> Result<Token, LexError> {
    let mut literal = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            literal.push(c);
            chars.next();
        } else {
            break;
        }
    }
    literal
        .parse::<i64>()
        .map(Token::Number)
        .map_err(|_| LexError::NumberOutOfRange { literal, line })
}

fn word(chars: &mut Peekable<Chars>) -> Token {
    let mut word = String::new();
    while let Some(&c) = chars.peek() {
        if c == '_' || c.is_ascii_alphanumeric() {
            word.push(c);
            chars.next();
        } else {
            break;
        }
    }
    match word.as_str() {
        "class" => Token::Class,
        "return" => Token::Return,
        "if" => Token::If,
        "else" => Token::Else,
        "def" => Token::Def,
        "print" => Token::Print,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "None" => Token::None,
        "True" => Token::True,
        "False" => Token::False,
        _ => Token::Id(LocalIntern::new(word)),
    }
}

fn string(chars: &mut Peekable<Chars>, quote: char, line: &mut usize) -> Result<Token, LexError> {
    let mut value = String::new();
    loop {
        let c = chars
            .next()
            .ok_or(LexError::UnterminatedString { line: *line })?;
        match c {
            _ if c == quote => break,
            '\\' => {
                let escape = chars
                    .next()
                    .ok_or(LexError::UnterminatedString { line: *line })?;
                value.push(match escape {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '"' => '"',
                    '\'' => '\'',
                    '\\' => '\\',
                    _ => return Err(LexError::UnknownEscape { escape, line: *line }),
                });
            }
            '\n' => {
                *line += 1;
                value.push(c);
            }
            _ => value.push(c),
        }
    }
    Ok(Token::String(value))
}
