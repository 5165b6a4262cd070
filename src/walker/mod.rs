pub mod value;

use std::{io, rc::Rc};

use log::trace;
use thiserror::Error;

use crate::{
    parse::{ArithOp, CmpOp, LogicOp, Stmt},
    Name,
};

use self::value::{
    equal, greater, greater_or_equal, less, less_or_equal, not_equal, sym, Closure, Instance,
    InstanceRef, Value,
};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("name '{0}' is not defined")]
    UndefinedVariable(String),
    #[error("value is not a class instance")]
    NotAnInstance,
    #[error("method '{0}' not found or takes a different number of arguments")]
    NoSuchMethod(String),
    #[error("unsupported operands for '{op}': {lhs} and {rhs}")]
    InvalidOperands {
        op: char,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("cannot compare objects for {0}")]
    NotComparable(&'static str),
    #[error("self reference to a dropped instance")]
    DanglingSelf,
    #[error(transparent)]
    Output(#[from] io::Error),
}

/// The host's side of an execution: where `print` output goes.
pub struct Context<'a> {
    output: &'a mut dyn io::Write,
}

impl<'a> Context<'a> {
    pub fn new(output: &'a mut dyn io::Write) -> Self {
        Self { output }
    }

    pub fn write(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes())
    }
}

/// Evaluate one statement against a call frame and the host context.
///
/// Statements without a meaningful result evaluate to `Value::None`.
pub fn exec(stmt: &Stmt, env: &mut Closure, ctx: &mut Context) -> Result<Value, ExecError> {
    Ok(match stmt {
        Stmt::Const(value) => value.clone(),
        Stmt::Variable(path) => lookup(path, env)?,
        Stmt::Assign { var, rv } => {
            let value = exec(rv, env, ctx)?;
            env.insert(*var, value.clone());
            value
        }
        Stmt::FieldAssign { object, field, rv } => {
            let target = lookup(object, env)?;
            let instance = target.as_instance()?.get()?;
            let value = exec(rv, env, ctx)?;
            instance.fields_mut().insert(*field, value.clone());
            value
        }
        Stmt::Print(args) => {
            for (i, arg) in args.iter().enumerate() {
                let value = exec(arg, env, ctx)?;
                let text = value.render(ctx)?;
                ctx.write(&text)?;
                if i + 1 != args.len() {
                    ctx.write(" ")?;
                }
            }
            ctx.write("\n")?;
            Value::None
        }
        Stmt::Stringify(arg) => {
            let value = exec(arg, env, ctx)?;
            Value::String(Rc::new(value.render(ctx)?))
        }
        Stmt::Arith { op, lhs, rhs } => {
            let lhs = exec(lhs, env, ctx)?;
            let rhs = exec(rhs, env, ctx)?;
            arith(*op, lhs, rhs, ctx)?
        }
        Stmt::Compare { op, lhs, rhs } => {
            let lhs = exec(lhs, env, ctx)?;
            let rhs = exec(rhs, env, ctx)?;
            Value::Bool(match op {
                CmpOp::Eq => equal(&lhs, &rhs, ctx)?,
                CmpOp::NotEq => not_equal(&lhs, &rhs, ctx)?,
                CmpOp::Less => less(&lhs, &rhs, ctx)?,
                CmpOp::Greater => greater(&lhs, &rhs, ctx)?,
                CmpOp::LessOrEq => less_or_equal(&lhs, &rhs, ctx)?,
                CmpOp::GreaterOrEq => greater_or_equal(&lhs, &rhs, ctx)?,
            })
        }
        Stmt::Logic {
            op: LogicOp::Or,
            lhs,
            rhs,
        } => {
            if exec(lhs, env, ctx)?.is_true() {
                Value::Bool(true)
            } else {
                Value::Bool(exec(rhs, env, ctx)?.is_true())
            }
        }
        Stmt::Logic {
            op: LogicOp::And,
            lhs,
            rhs,
        } => {
            if exec(lhs, env, ctx)?.is_true() {
                Value::Bool(exec(rhs, env, ctx)?.is_true())
            } else {
                Value::Bool(false)
            }
        }
        Stmt::Not(arg) => Value::Bool(!exec(arg, env, ctx)?.is_true()),
        Stmt::IfElse {
            condition,
            if_body,
            else_body,
        } => {
            if exec(condition, env, ctx)?.is_true() {
                exec(if_body, env, ctx)?;
            } else if let Some(else_body) = else_body {
                exec(else_body, env, ctx)?;
            }
            Value::None
        }
        Stmt::Compound(stmts) => {
            for stmt in stmts {
                exec(stmt, env, ctx)?;
                if env.contains_key(&sym::return_val()) {
                    break;
                }
            }
            Value::None
        }
        Stmt::Return(value) => {
            let value = exec(value, env, ctx)?;
            env.insert(sym::return_val(), value);
            Value::None
        }
        Stmt::ClassDef(class) => {
            trace!("defining class '{}'", class.name().as_str());
            env.insert(class.name(), Value::Class(class.clone()));
            Value::None
        }
        Stmt::NewInstance { class, args } => {
            let instance = Instance::new(class.clone());
            // Without a matching __init__ the constructor arguments are
            // never evaluated.
            if instance.has_method(sym::init(), args.len()) {
                let mut actual = Vec::with_capacity(args.len());
                for arg in args {
                    actual.push(exec(arg, env, ctx)?);
                }
                instance.clone().call(sym::init(), actual, ctx)?;
            }
            Value::Instance(InstanceRef::strong(instance))
        }
        Stmt::MethodCall {
            object,
            method,
            args,
        } => {
            let receiver = exec(object, env, ctx)?;
            let instance = receiver.as_instance()?.get()?;
            let mut actual = Vec::with_capacity(args.len());
            for arg in args {
                actual.push(exec(arg, env, ctx)?);
            }
            instance.call(*method, actual, ctx)?
        }
        Stmt::MethodBody(body) => {
            exec(body, env, ctx)?;
            env.remove(&sym::return_val()).unwrap_or(Value::None)
        }
    })
}

fn lookup(path: &[Name], env: &Closure) -> Result<Value, ExecError> {
    let Some((first, rest)) = path.split_first() else {
        return Ok(Value::None);
    };
    let mut value = env
        .get(first)
        .cloned()
        .ok_or_else(|| ExecError::UndefinedVariable((**first).clone()))?;
    for field in rest {
        let instance = value.as_instance()?.get()?;
        // A missing field reads as None, not an error.
        let next = instance.fields().get(field).cloned().unwrap_or(Value::None);
        value = next;
    }
    Ok(value)
}

fn arith(op: ArithOp, lhs: Value, rhs: Value, ctx: &mut Context) -> Result<Value, ExecError> {
    match (op, &lhs, &rhs) {
        (ArithOp::Add, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.wrapping_add(*b))),
        (ArithOp::Add, Value::String(a), Value::String(b)) => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Value::String(Rc::new(joined)))
        }
        (ArithOp::Add, Value::Instance(handle), _) => {
            let instance = handle.get()?;
            if instance.has_method(sym::add(), 1) {
                instance.call(sym::add(), vec![rhs.clone()], ctx)
            } else {
                Err(invalid_operands(op, &lhs, &rhs))
            }
        }
        (ArithOp::Sub, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.wrapping_sub(*b))),
        (ArithOp::Mul, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.wrapping_mul(*b))),
        (ArithOp::Div, Value::Number(_), Value::Number(0)) => Err(ExecError::DivisionByZero),
        (ArithOp::Div, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.wrapping_div(*b))),
        _ => Err(invalid_operands(op, &lhs, &rhs)),
    }
}

fn invalid_operands(op: ArithOp, lhs: &Value, rhs: &Value) -> ExecError {
    ExecError::InvalidOperands {
        op: op.symbol(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    }
}
