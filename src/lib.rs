//! A tree-walking interpreter for a small, indentation-sensitive,
//! dynamically typed scripting language.

pub mod error;
pub mod lex;
pub mod parse;
pub mod walker;

use std::io;

use internment::LocalIntern;
use log::debug;

pub use crate::{
    error::Error,
    lex::Lexer,
    walker::{
        value::{Closure, Value},
        Context,
    },
};

/// An interned identifier, field, or method name.
pub type Name = LocalIntern<String>;

#[derive(Default)]
pub struct Engine;

impl Engine {
    /// Run a source program, sending `print` output to `output`.
    pub fn execute(&mut self, source: &str, output: &mut dyn io::Write) -> Result<(), Error> {
        let mut lexer = Lexer::new(source)?;
        let program = parse::parse(&mut lexer)?;
        debug!("program parsed, starting execution");
        let mut globals = Closure::new();
        let mut ctx = Context::new(output);
        walker::exec(&program, &mut globals, &mut ctx)?;
        Ok(())
    }

    /// Like [`Engine::execute`], but captures the output.
    pub fn run(&mut self, source: &str) -> Result<String, Error> {
        let mut output = Vec::new();
        self.execute(source, &mut output)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}
