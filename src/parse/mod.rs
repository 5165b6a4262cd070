use std::{collections::HashMap, rc::Rc};

use log::debug;
use thiserror::Error;

use crate::{
    lex::{Lexer, Token},
    walker::value::{Class, Method, Value},
    Name,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(self) -> char {
        match self {
            ArithOp::Add => '+',
            ArithOp::Sub => '-',
            ArithOp::Mul => '*',
            ArithOp::Div => '/',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Less,
    Greater,
    LessOrEq,
    GreaterOrEq,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// One node of the program tree. Statements and expressions share the
/// same shape: every node evaluates to a value, and nodes that exist for
/// their side effects evaluate to `None`.
#[derive(Debug)]
pub enum Stmt {
    Const(Value),
    /// A dotted name: the head is looked up in the environment, the rest
    /// are instance fields.
    Variable(Vec<Name>),
    Assign {
        var: Name,
        rv: Box<Stmt>,
    },
    FieldAssign {
        object: Vec<Name>,
        field: Name,
        rv: Box<Stmt>,
    },
    Print(Vec<Stmt>),
    Stringify(Box<Stmt>),
    Arith {
        op: ArithOp,
        lhs: Box<Stmt>,
        rhs: Box<Stmt>,
    },
    Compare {
        op: CmpOp,
        lhs: Box<Stmt>,
        rhs: Box<Stmt>,
    },
    Logic {
        op: LogicOp,
        lhs: Box<Stmt>,
        rhs: Box<Stmt>,
    },
    Not(Box<Stmt>),
    IfElse {
        condition: Box<Stmt>,
        if_body: Box<Stmt>,
        else_body: Option<Box<Stmt>>,
    },
    Compound(Vec<Stmt>),
    Return(Box<Stmt>),
    ClassDef(Rc<Class>),
    NewInstance {
        class: Rc<Class>,
        args: Vec<Stmt>,
    },
    MethodCall {
        object: Box<Stmt>,
        method: Name,
        args: Vec<Stmt>,
    },
    /// Wraps every method body; consumes the return sentinel so it never
    /// escapes the frame.
    MethodBody(Box<Stmt>),
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: Token,
    },
    #[error("'{0}' does not name a class")]
    UnknownClass(String),
    #[error("str() takes exactly one argument")]
    StringifyArity,
    #[error("the first parameter of a method must be 'self'")]
    MissingSelf,
    #[error("invalid assignment target")]
    InvalidTarget,
}

pub fn parse(lexer: &mut Lexer) -> Result<Stmt, ParseError> {
    Parser::new(lexer).program()
}

struct Parser<'a> {
    lexer: &'a mut Lexer,
    // Classes resolve at parse time: construction sites and base-class
    // references need the class value itself, not its runtime binding.
    classes: HashMap<Name, Rc<Class>>,
}

impl<'a> Parser<'a> {
    fn new(lexer: &'a mut Lexer) -> Self {
        Self {
            lexer,
            classes: HashMap::new(),
        }
    }

    fn current(&self) -> &Token {
        self.lexer.current()
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.lexer.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), ParseError> {
        if self.current() == &token {
            self.lexer.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::Unexpected {
            expected,
            found: self.current().clone(),
        }
    }

    fn ident(&mut self, expected: &'static str) -> Result<Name, ParseError> {
        match self.current() {
            Token::Id(name) => {
                let name = *name;
                self.lexer.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn program(mut self) -> Result<Stmt, ParseError> {
        let mut stmts = Vec::new();
        while self.current() != &Token::Eof {
            stmts.push(self.statement()?);
        }
        Ok(Stmt::Compound(stmts))
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current() {
            Token::Class => self.class_definition(),
            Token::If => self.if_else(),
            _ => {
                let stmt = self.simple_statement()?;
                self.expect(Token::Newline, "end of line")?;
                Ok(stmt)
            }
        }
    }

    fn class_definition(&mut self) -> Result<Stmt, ParseError> {
        self.lexer.advance();
        let name = self.ident("a class name")?;
        let parent = if self.eat(&Token::Char('(')) {
            let parent_name = self.ident("a base class name")?;
            self.expect(Token::Char(')'), "')'")?;
            Some(
                self.classes
                    .get(&parent_name)
                    .cloned()
                    .ok_or_else(|| ParseError::UnknownClass((*parent_name).clone()))?,
            )
        } else {
            None
        };
        self.expect(Token::Char(':'), "':'")?;
        self.expect(Token::Newline, "end of line")?;
        self.expect(Token::Indent, "an indented class body")?;
        let mut methods = Vec::new();
        while self.current() == &Token::Def {
            methods.push(self.method_def()?);
        }
        self.expect(Token::Dedent, "a method definition")?;
        let class = Class::new(name, methods, parent.as_ref());
        debug!("parsed class '{}'", name.as_str());
        self.classes.insert(name, class.clone());
        Ok(Stmt::ClassDef(class))
    }

    fn method_def(&mut self) -> Result<Rc<Method>, ParseError> {
        self.lexer.advance();
        let name = self.ident("a method name")?;
        self.expect(Token::Char('('), "'('")?;
        // The receiver is spelled out but is not a formal parameter; it is
        // bound implicitly on every call.
        match self.current() {
            Token::Id(id) if id.as_str() == "self" => {
                self.lexer.advance();
            }
            _ => return Err(ParseError::MissingSelf),
        }
        let mut params = Vec::new();
        while self.eat(&Token::Char(',')) {
            params.push(self.ident("a parameter name")?);
        }
        self.expect(Token::Char(')'), "')'")?;
        self.expect(Token::Char(':'), "':'")?;
        let body = self.suite()?;
        Ok(Rc::new(Method {
            name,
            params,
            body: Stmt::MethodBody(Box::new(body)),
        }))
    }

    fn suite(&mut self) -> Result<Stmt, ParseError> {
        self.expect(Token::Newline, "end of line")?;
        self.expect(Token::Indent, "an indented block")?;
        let mut stmts = Vec::new();
        while self.current() != &Token::Dedent {
            stmts.push(self.statement()?);
        }
        self.lexer.advance();
        Ok(Stmt::Compound(stmts))
    }

    fn if_else(&mut self) -> Result<Stmt, ParseError> {
        self.lexer.advance();
        let condition = self.expression()?;
        self.expect(Token::Char(':'), "':'")?;
        let if_body = self.suite()?;
        let else_body = if self.eat(&Token::Else) {
            self.expect(Token::Char(':'), "':'")?;
            Some(Box::new(self.suite()?))
        } else {
            None
        };
        Ok(Stmt::IfElse {
            condition: Box::new(condition),
            if_body: Box::new(if_body),
            else_body,
        })
    }

    fn simple_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current() {
            Token::Return => {
                self.lexer.advance();
                let value = if self.current() == &Token::Newline {
                    Stmt::Const(Value::None)
                } else {
                    self.expression()?
                };
                Ok(Stmt::Return(Box::new(value)))
            }
            Token::Print => {
                self.lexer.advance();
                let mut args = Vec::new();
                if self.current() != &Token::Newline {
                    args.push(self.expression()?);
                    while self.eat(&Token::Char(',')) {
                        args.push(self.expression()?);
                    }
                }
                Ok(Stmt::Print(args))
            }
            _ => self.assignment_or_expression(),
        }
    }

    fn assignment_or_expression(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        if self.current() != &Token::Char('=') {
            return Ok(expr);
        }
        self.lexer.advance();
        let rv = Box::new(self.expression()?);
        match expr {
            Stmt::Variable(mut path) => match path.pop() {
                Some(name) if path.is_empty() => Ok(Stmt::Assign { var: name, rv }),
                Some(field) => Ok(Stmt::FieldAssign {
                    object: path,
                    field,
                    rv,
                }),
                None => Err(ParseError::InvalidTarget),
            },
            _ => Err(ParseError::InvalidTarget),
        }
    }

    fn expression(&mut self) -> Result<Stmt, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Stmt, ParseError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::Or) {
            let rhs = self.and_expr()?;
            lhs = Stmt::Logic {
                op: LogicOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Stmt, ParseError> {
        let mut lhs = self.not_expr()?;
        while self.eat(&Token::And) {
            let rhs = self.not_expr()?;
            lhs = Stmt::Logic {
                op: LogicOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Stmt, ParseError> {
        if self.eat(&Token::Not) {
            Ok(Stmt::Not(Box::new(self.not_expr()?)))
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> Result<Stmt, ParseError> {
        let lhs = self.additive()?;
        let op = match self.current() {
            Token::Eq => CmpOp::Eq,
            Token::NotEq => CmpOp::NotEq,
            Token::Char('<') => CmpOp::Less,
            Token::Char('>') => CmpOp::Greater,
            Token::LessOrEq => CmpOp::LessOrEq,
            Token::GreaterOrEq => CmpOp::GreaterOrEq,
            _ => return Ok(lhs),
        };
        self.lexer.advance();
        let rhs = self.additive()?;
        Ok(Stmt::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn additive(&mut self) -> Result<Stmt, ParseError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.current() {
                Token::Char('+') => ArithOp::Add,
                Token::Char('-') => ArithOp::Sub,
                _ => break,
            };
            self.lexer.advance();
            let rhs = self.term()?;
            lhs = Stmt::Arith {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Stmt, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.current() {
                Token::Char('*') => ArithOp::Mul,
                Token::Char('/') => ArithOp::Div,
                _ => break,
            };
            self.lexer.advance();
            let rhs = self.unary()?;
            lhs = Stmt::Arith {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Stmt, ParseError> {
        if self.eat(&Token::Char('-')) {
            // There is no negation node; -x is 0 - x.
            Ok(Stmt::Arith {
                op: ArithOp::Sub,
                lhs: Box::new(Stmt::Const(Value::Number(0))),
                rhs: Box::new(self.unary()?),
            })
        } else if self.eat(&Token::Char('+')) {
            self.unary()
        } else {
            self.primary()
        }
    }

    fn primary(&mut self) -> Result<Stmt, ParseError> {
        match self.current().clone() {
            Token::Number(n) => {
                self.lexer.advance();
                Ok(Stmt::Const(Value::Number(n)))
            }
            Token::String(s) => {
                self.lexer.advance();
                Ok(Stmt::Const(Value::String(Rc::new(s))))
            }
            Token::True => {
                self.lexer.advance();
                Ok(Stmt::Const(Value::Bool(true)))
            }
            Token::False => {
                self.lexer.advance();
                Ok(Stmt::Const(Value::Bool(false)))
            }
            Token::None => {
                self.lexer.advance();
                Ok(Stmt::Const(Value::None))
            }
            Token::Char('(') => {
                self.lexer.advance();
                let expr = self.expression()?;
                self.expect(Token::Char(')'), "')'")?;
                Ok(expr)
            }
            Token::Id(_) => self.name_expression(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn name_expression(&mut self) -> Result<Stmt, ParseError> {
        let mut path = vec![self.ident("a name")?];
        while self.eat(&Token::Char('.')) {
            path.push(self.ident("a field name")?);
        }
        if self.current() != &Token::Char('(') {
            return Ok(Stmt::Variable(path));
        }
        let mut args = self.call_args()?;
        if path.len() > 1 {
            let method = match path.pop() {
                Some(method) => method,
                None => return Err(self.unexpected("a method name")),
            };
            return Ok(Stmt::MethodCall {
                object: Box::new(Stmt::Variable(path)),
                method,
                args,
            });
        }
        let name = path[0];
        if let Some(class) = self.classes.get(&name).cloned() {
            Ok(Stmt::NewInstance { class, args })
        } else if name.as_str() == "str" {
            match args.pop() {
                Some(arg) if args.is_empty() => Ok(Stmt::Stringify(Box::new(arg))),
                _ => Err(ParseError::StringifyArity),
            }
        } else {
            Err(ParseError::UnknownClass((*name).clone()))
        }
    }

    fn call_args(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(Token::Char('('), "'('")?;
        let mut args = Vec::new();
        if self.current() != &Token::Char(')') {
            args.push(self.expression()?);
            while self.eat(&Token::Char(',')) {
                args.push(self.expression()?);
            }
        }
        self.expect(Token::Char(')'), "')'")?;
        Ok(args)
    }
}
