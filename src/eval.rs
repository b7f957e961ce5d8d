//! Tree-walking evaluator.
//!
//! Control-flow statements execute directly in the current scope — only procedure and function
//! calls open a child scope, and that child's parent is the *calling* scope rather than the
//! routine's definition site, so routines resolve free identifiers dynamically. `RETURN` is
//! modelled as a `Flow` signal threaded back up through statement execution rather than as a
//! Rust-level exception, since the interpreter has no use for unwinding past an error boundary.

use std::io::{BufRead, Write};
use std::mem::discriminant;
use std::rc::Rc;

use crate::ast::{Access, BinOp, CaseCondition, Expr, Literal, Parameter, Program, Stmt, TypeSpec, UnOp};
use crate::builtins;
use crate::env::{Scope, TypeDef};
use crate::error::EvalError;
use crate::file_table::FileTable;
use crate::value::{ArrayValue, RecordValue, Value};

/// The single point of configuration for a run: whether undeclared variables are a hard error
/// (`strict`) or get implicitly declared on first assignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpretOptions {
    pub strict: bool,
}

/// Non-local control transfer produced by `RETURN`. Everything else is `Normal`.
enum Flow {
    Normal,
    Return(Value),
}

struct Interp<'io> {
    stdin: &'io mut dyn BufRead,
    stdout: &'io mut dyn Write,
    files: FileTable,
}

/// Runs a parsed program to completion against the given I/O streams.
///
/// Open files are closed as their handles drop, whether `run` returns `Ok` or `Err` — there is
/// no explicit cleanup step to forget.
pub fn run(
    program: &Program,
    stdin: &mut dyn BufRead,
    stdout: &mut dyn Write,
    options: InterpretOptions,
) -> Result<(), EvalError> {
    let global = Scope::new(options.strict);
    let mut ctx = Interp {
        stdin,
        stdout,
        files: FileTable::new(),
    };
    exec_block(&program.statements, &global, &mut ctx)?;
    Ok(())
}

fn exec_block(stmts: &[Stmt], scope: &Rc<Scope>, ctx: &mut Interp) -> Result<Flow, EvalError> {
    for stmt in stmts {
        match exec_stmt(stmt, scope, ctx)? {
            Flow::Normal => {}
            ret @ Flow::Return(_) => return Ok(ret),
        }
    }
    Ok(Flow::Normal)
}

fn exec_stmt(stmt: &Stmt, scope: &Rc<Scope>, ctx: &mut Interp) -> Result<Flow, EvalError> {
    match stmt {
        Stmt::Declare { name, type_spec, .. } => {
            let value = default_value(type_spec, scope, ctx)?;
            scope.define_variable(name, value)?;
            Ok(Flow::Normal)
        }

        Stmt::Constant { name, value, .. } => {
            let v = eval_expr(value, scope, ctx)?;
            scope.define_constant(name, v)?;
            Ok(Flow::Normal)
        }

        Stmt::TypeDef { name, fields, .. } => {
            scope.define_type(name, TypeDef { fields: fields.clone() });
            Ok(Flow::Normal)
        }

        Stmt::Assign { target, value, .. } => {
            let v = eval_expr(value, scope, ctx)?;
            assign_access(target, v, scope, ctx)?;
            Ok(Flow::Normal)
        }

        Stmt::Input { target, .. } => {
            let mut line = String::new();
            ctx.stdin
                .read_line(&mut line)
                .map_err(|e| EvalError::io_error("stdin", e.to_string()))?;
            let raw = line.trim_end_matches(['\n', '\r']);
            let old = eval_access(target, scope, ctx)?;
            let parsed = if matches!(old, Value::Char(_)) {
                Value::Char(raw.chars().next().unwrap_or(' '))
            } else {
                parse_input_value(raw)
            };
            let coerced = check_assignable(&target.name, &old, parsed)?;
            assign_access(target, coerced, scope, ctx)?;
            Ok(Flow::Normal)
        }

        Stmt::Output { items, .. } => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                parts.push(eval_expr(item, scope, ctx)?.canonical_string());
            }
            writeln!(ctx.stdout, "{}", parts.join(" "))
                .map_err(|e| EvalError::io_error("stdout", e.to_string()))?;
            Ok(Flow::Normal)
        }

        Stmt::If {
            condition,
            then_block,
            else_block,
            line,
        } => {
            if as_bool(&eval_expr(condition, scope, ctx)?, "IF", *line)? {
                exec_block(then_block, scope, ctx)
            } else if let Some(else_block) = else_block {
                exec_block(else_block, scope, ctx)
            } else {
                Ok(Flow::Normal)
            }
        }

        Stmt::Case {
            identifier,
            branches,
            otherwise,
            ..
        } => {
            let value = scope.get_variable(identifier)?;
            for branch in branches {
                let matched = match &branch.condition {
                    CaseCondition::Value(expr) => {
                        let cond = eval_expr(expr, scope, ctx)?;
                        values_equal(&value, &cond)
                    }
                    CaseCondition::Range(lo, hi) => {
                        let lo = eval_expr(lo, scope, ctx)?;
                        let hi = eval_expr(hi, scope, ctx)?;
                        !compare(&value, &lo, BinOp::Lt)? && !compare(&value, &hi, BinOp::Gt)?
                    }
                };
                if matched {
                    return exec_stmt(&branch.statement, scope, ctx);
                }
            }
            if let Some(otherwise) = otherwise {
                exec_stmt(otherwise, scope, ctx)
            } else {
                Ok(Flow::Normal)
            }
        }

        Stmt::For {
            variable,
            start,
            end,
            step,
            body,
            line,
        } => {
            let start = expect_integer(&eval_expr(start, scope, ctx)?, "FOR", *line)?;
            let end = expect_integer(&eval_expr(end, scope, ctx)?, "FOR", *line)?;
            let step = match step {
                Some(step) => expect_integer(&eval_expr(step, scope, ctx)?, "FOR", *line)?,
                None => 1,
            };
            if step == 0 {
                return Err(EvalError::builtin("FOR", "step value must not be zero"));
            }

            let mut counter = start;
            scope.define_variable(variable, Value::Integer(counter))?;
            loop {
                let continues = if step > 0 { counter <= end } else { counter >= end };
                if !continues {
                    break;
                }
                match exec_block(body, scope, ctx)? {
                    Flow::Normal => {}
                    ret @ Flow::Return(_) => return Ok(ret),
                }
                counter += step;
                scope.set_variable(variable, Value::Integer(counter))?;
            }
            Ok(Flow::Normal)
        }

        Stmt::While { condition, body, line } => {
            while as_bool(&eval_expr(condition, scope, ctx)?, "WHILE", *line)? {
                match exec_block(body, scope, ctx)? {
                    Flow::Normal => {}
                    ret @ Flow::Return(_) => return Ok(ret),
                }
            }
            Ok(Flow::Normal)
        }

        Stmt::Repeat { body, condition, line } => loop {
            match exec_block(body, scope, ctx)? {
                Flow::Normal => {}
                ret @ Flow::Return(_) => return Ok(ret),
            }
            if as_bool(&eval_expr(condition, scope, ctx)?, "REPEAT", *line)? {
                return Ok(Flow::Normal);
            }
        },

        Stmt::ProcDef { name, .. } => {
            scope.define_procedure(name, Rc::new(stmt.clone()));
            Ok(Flow::Normal)
        }

        Stmt::FuncDef { name, .. } => {
            scope.define_function(name, Rc::new(stmt.clone()));
            Ok(Flow::Normal)
        }

        Stmt::Call { name, arguments, .. } => {
            let def = scope.get_procedure(name)?;
            let (parameters, body) = match def.as_ref() {
                Stmt::ProcDef { parameters, body, .. } => (parameters, body),
                _ => unreachable!("get_procedure only returns ProcDef bindings"),
            };
            call_routine(name, parameters, body, arguments, scope, ctx)?;
            Ok(Flow::Normal)
        }

        Stmt::Return { value, .. } => {
            let v = eval_expr(value, scope, ctx)?;
            Ok(Flow::Return(v))
        }

        Stmt::FileOpen { file_id, mode, .. } => {
            ctx.files.open(file_id, file_id, mode.clone())?;
            Ok(Flow::Normal)
        }

        Stmt::FileRead { file_id, target, .. } => {
            let content = ctx.files.read_line(file_id)?;
            let old = eval_access(target, scope, ctx)?;
            let coerced = check_assignable(&target.name, &old, Value::String(content))?;
            assign_access(target, coerced, scope, ctx)?;
            Ok(Flow::Normal)
        }

        Stmt::FileWrite { file_id, value, .. } => {
            let v = eval_expr(value, scope, ctx)?;
            ctx.files.write_line(file_id, &v.canonical_string())?;
            Ok(Flow::Normal)
        }

        Stmt::FileClose { file_id, .. } => {
            ctx.files.close(file_id);
            Ok(Flow::Normal)
        }
    }
}

/// Builds the zero value for a freshly-`DECLARE`d name: scalar defaults for simple types,
/// an all-default-filled grid for arrays, and a recursively zero-filled record for custom types.
fn default_value(ts: &TypeSpec, scope: &Rc<Scope>, ctx: &mut Interp) -> Result<Value, EvalError> {
    match ts {
        TypeSpec::Simple(kind) => Ok(Value::default_for_simple(*kind)),

        TypeSpec::Array { dims, element } => {
            let element_kind = match element.as_ref() {
                TypeSpec::Simple(kind) => *kind,
                _ => {
                    return Err(EvalError::builtin(
                        "DECLARE",
                        "array element type must be a simple type",
                    ))
                }
            };
            let mut bounds = Vec::with_capacity(dims.len());
            for (lo, hi) in dims {
                let lo = expect_integer(&eval_expr(lo, scope, ctx)?, "DECLARE", lo.line())?;
                let hi = expect_integer(&eval_expr(hi, scope, ctx)?, "DECLARE", hi.line())?;
                bounds.push((lo, hi));
            }
            Ok(Value::Array(ArrayValue::new(bounds, element_kind)))
        }

        TypeSpec::Custom(name) => {
            let def = scope.get_type(name)?;
            let mut field_order = Vec::with_capacity(def.fields.len());
            let mut field_types = std::collections::HashMap::new();
            let mut field_values = std::collections::HashMap::new();
            for (field_name, field_type) in &def.fields {
                field_order.push(field_name.clone());
                field_types.insert(field_name.clone(), field_type.clone());
                field_values.insert(field_name.clone(), default_value(field_type, scope, ctx)?);
            }
            Ok(Value::Record(RecordValue {
                type_name: name.clone(),
                field_order,
                field_types,
                field_values,
            }))
        }
    }
}

fn array_indices(
    access: &Access,
    scope: &Rc<Scope>,
    ctx: &mut Interp,
) -> Result<Vec<i64>, EvalError> {
    let mut indices = Vec::with_capacity(2);
    if let Some(index1) = &access.index1 {
        indices.push(expect_integer(&eval_expr(index1, scope, ctx)?, &access.name, access.line)?);
    }
    if let Some(index2) = &access.index2 {
        indices.push(expect_integer(&eval_expr(index2, scope, ctx)?, &access.name, access.line)?);
    }
    Ok(indices)
}

fn eval_access(access: &Access, scope: &Rc<Scope>, ctx: &mut Interp) -> Result<Value, EvalError> {
    if access.index1.is_some() {
        let container = scope.get_variable(&access.name)?;
        let arr = match &container {
            Value::Array(arr) => arr,
            other => return Err(EvalError::type_mismatch(&access.name, "ARRAY", other.type_name())),
        };
        let indices = array_indices(access, scope, ctx)?;
        Ok(arr.get(&indices, &access.name)?.clone())
    } else if let Some(field) = &access.field {
        let container = scope.get_variable(&access.name)?;
        let rec = match &container {
            Value::Record(rec) => rec,
            other => return Err(EvalError::type_mismatch(&access.name, "RECORD", other.type_name())),
        };
        Ok(rec.get_field(field)?.clone())
    } else {
        scope.get_variable(&access.name)
    }
}

fn assign_access(
    access: &Access,
    value: Value,
    scope: &Rc<Scope>,
    ctx: &mut Interp,
) -> Result<(), EvalError> {
    if access.index1.is_some() {
        let indices = array_indices(access, scope, ctx)?;
        let mut container = scope.get_variable(&access.name)?;
        let arr = match &mut container {
            Value::Array(arr) => arr,
            other => return Err(EvalError::type_mismatch(&access.name, "ARRAY", other.type_name())),
        };
        let old = arr.get(&indices, &access.name)?.clone();
        let coerced = check_assignable(&access.name, &old, value)?;
        arr.set(&indices, coerced, &access.name)?;
        scope.set_variable(&access.name, container)
    } else if let Some(field) = &access.field {
        let mut container = scope.get_variable(&access.name)?;
        let rec = match &mut container {
            Value::Record(rec) => rec,
            other => return Err(EvalError::type_mismatch(&access.name, "RECORD", other.type_name())),
        };
        let old = rec.get_field(field)?.clone();
        let coerced = check_assignable(field, &old, value)?;
        rec.set_field(field, coerced)?;
        scope.set_variable(&access.name, container)
    } else {
        let old = scope.get_variable(&access.name)?;
        let coerced = check_assignable(&access.name, &old, value)?;
        scope.set_variable(&access.name, coerced)
    }
}

/// Exact type match is always fine; the one standing widening is `INTEGER` into a `REAL` slot.
fn check_assignable(name: &str, old: &Value, new: Value) -> Result<Value, EvalError> {
    match (old, &new) {
        (Value::Real(_), Value::Integer(i)) => Ok(Value::Real(*i as f64)),
        _ if discriminant(old) == discriminant(&new) => Ok(new),
        _ => Err(EvalError::type_mismatch(name, old.type_name(), new.type_name())),
    }
}

fn parse_input_value(raw: &str) -> Value {
    if !raw.contains('.') {
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Integer(i);
        }
    }
    if let Ok(r) = raw.parse::<f64>() {
        return Value::Real(r);
    }
    match raw.to_uppercase().as_str() {
        "TRUE" => return Value::Boolean(true),
        "FALSE" => return Value::Boolean(false),
        _ => {}
    }
    Value::String(raw.to_string())
}

fn eval_expr(expr: &Expr, scope: &Rc<Scope>, ctx: &mut Interp) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(lit, _) => Ok(match lit {
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Real(r) => Value::Real(*r),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Char(c) => Value::Char(*c),
            Literal::Boolean(b) => Value::Boolean(*b),
        }),

        Expr::Access(access) => eval_access(access, scope, ctx),

        Expr::BinaryOp { op, left, right, line } => {
            let l = eval_expr(left, scope, ctx)?;
            let r = eval_expr(right, scope, ctx)?;
            match op {
                BinOp::Add | BinOp::Sub | BinOp::Mul => numeric_arith(&l, &r, *op),
                BinOp::Div => numeric_div(&l, &r),
                BinOp::Pow => numeric_pow(&l, &r),
                BinOp::Concat => Ok(Value::String(format!(
                    "{}{}",
                    l.canonical_string(),
                    r.canonical_string()
                ))),
                BinOp::Eq => Ok(Value::Boolean(values_equal(&l, &r))),
                BinOp::Ne => Ok(Value::Boolean(!values_equal(&l, &r))),
                BinOp::Lt => Ok(Value::Boolean(compare(&l, &r, BinOp::Lt)?)),
                BinOp::Gt => Ok(Value::Boolean(compare(&l, &r, BinOp::Gt)?)),
                BinOp::Le => Ok(Value::Boolean(compare(&l, &r, BinOp::Le)?)),
                BinOp::Ge => Ok(Value::Boolean(compare(&l, &r, BinOp::Ge)?)),
                BinOp::And => {
                    Ok(Value::Boolean(as_bool(&l, "AND", *line)? && as_bool(&r, "AND", *line)?))
                }
                BinOp::Or => {
                    Ok(Value::Boolean(as_bool(&l, "OR", *line)? || as_bool(&r, "OR", *line)?))
                }
            }
        }

        Expr::UnaryOp { op, operand, line } => {
            let v = eval_expr(operand, scope, ctx)?;
            match op {
                UnOp::Neg => match v {
                    Value::Integer(i) => Ok(Value::Integer(-i)),
                    Value::Real(r) => Ok(Value::Real(-r)),
                    other => Err(EvalError::type_mismatch("-", "INTEGER or REAL", other.type_name())),
                },
                UnOp::Pos => Ok(v),
                UnOp::Not => Ok(Value::Boolean(!as_bool(&v, "NOT", *line)?)),
            }
        }

        Expr::FunctionCall { name, arguments, line } => {
            eval_function_call(name, arguments, *line, scope, ctx)
        }
    }
}

fn eval_function_call(
    name: &str,
    arguments: &[Expr],
    line: usize,
    scope: &Rc<Scope>,
    ctx: &mut Interp,
) -> Result<Value, EvalError> {
    if name.eq_ignore_ascii_case("EOF") {
        if arguments.len() != 1 {
            return Err(EvalError::arg_arity("EOF", 1, arguments.len()));
        }
        let file_id = match eval_expr(&arguments[0], scope, ctx)? {
            Value::String(s) => s,
            other => return Err(EvalError::type_mismatch("EOF", "STRING", other.type_name())),
        };
        return Ok(Value::Boolean(ctx.files.is_eof(&file_id)?));
    }

    let mut args = Vec::with_capacity(arguments.len());
    for arg in arguments {
        args.push(eval_expr(arg, scope, ctx)?);
    }
    if let Some(result) = builtins::call(name, args, line) {
        return result;
    }

    let def = scope.get_function(name)?;
    let (parameters, body) = match def.as_ref() {
        Stmt::FuncDef { parameters, body, .. } => (parameters, body),
        _ => unreachable!("get_function only returns FuncDef bindings"),
    };
    match call_routine(name, parameters, body, arguments, scope, ctx)? {
        Flow::Return(v) => Ok(v),
        Flow::Normal => Err(EvalError::MissingReturn(name.to_string())),
    }
}

/// Shared by procedure calls and function calls: evaluates arguments in the caller's scope,
/// executes the body in a fresh scope parented to the caller (not the definition site), and
/// writes `BYREF` results back through the original argument expressions.
fn call_routine(
    name: &str,
    parameters: &[Parameter],
    body: &[Stmt],
    arguments: &[Expr],
    scope: &Rc<Scope>,
    ctx: &mut Interp,
) -> Result<Flow, EvalError> {
    if parameters.len() != arguments.len() {
        return Err(EvalError::arg_arity(name, parameters.len(), arguments.len()));
    }

    let mut arg_values = Vec::with_capacity(arguments.len());
    for arg in arguments {
        arg_values.push(eval_expr(arg, scope, ctx)?);
    }

    let child = Scope::with_parent(scope);
    for (param, value) in parameters.iter().zip(arg_values.into_iter()) {
        child.define_variable(&param.name, value)?;
    }

    let flow = exec_block(body, &child, ctx)?;

    for (param, arg_expr) in parameters.iter().zip(arguments.iter()) {
        if !param.by_ref {
            continue;
        }
        let access = match arg_expr {
            Expr::Access(access) => access,
            _ => return Err(EvalError::ByRefRequiresVariable(param.name.clone())),
        };
        let new_value = child.get_variable(&param.name)?;
        assign_access(access, new_value, scope, ctx)?;
    }

    Ok(flow)
}

fn expect_integer(value: &Value, context: &str, _line: usize) -> Result<i64, EvalError> {
    match value {
        Value::Integer(i) => Ok(*i),
        other => Err(EvalError::type_mismatch(context, "INTEGER", other.type_name())),
    }
}

fn as_bool(value: &Value, context: &str, _line: usize) -> Result<bool, EvalError> {
    match value {
        Value::Boolean(b) => Ok(*b),
        other => Err(EvalError::type_mismatch(context, "BOOLEAN", other.type_name())),
    }
}

fn as_numeric(value: &Value, op: &str) -> Result<f64, EvalError> {
    value
        .as_number()
        .ok_or_else(|| EvalError::type_mismatch(op, "INTEGER or REAL", value.type_name()))
}

fn numeric_arith(left: &Value, right: &Value, op: BinOp) -> Result<Value, EvalError> {
    let name = match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        _ => unreachable!("numeric_arith only handles +, -, *"),
    };
    let l = as_numeric(left, name)?;
    let r = as_numeric(right, name)?;
    if left.is_integral() && right.is_integral() {
        let (l, r) = (l as i64, r as i64);
        Ok(Value::Integer(match op {
            BinOp::Add => l + r,
            BinOp::Sub => l - r,
            BinOp::Mul => l * r,
            _ => unreachable!(),
        }))
    } else {
        Ok(Value::Real(match op {
            BinOp::Add => l + r,
            BinOp::Sub => l - r,
            BinOp::Mul => l * r,
            _ => unreachable!(),
        }))
    }
}

fn numeric_div(left: &Value, right: &Value) -> Result<Value, EvalError> {
    let l = as_numeric(left, "/")?;
    let r = as_numeric(right, "/")?;
    if r == 0.0 {
        return Err(EvalError::ZeroDivision);
    }
    Ok(Value::Real(l / r))
}

fn numeric_pow(left: &Value, right: &Value) -> Result<Value, EvalError> {
    let l = as_numeric(left, "^")?;
    let r = as_numeric(right, "^")?;
    if left.is_integral() && right.is_integral() && r >= 0.0 {
        Ok(Value::Integer((l as i64).pow(r as u32)))
    } else {
        Ok(Value::Real(l.powf(r)))
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        return l == r;
    }
    left.canonical_string() == right.canonical_string()
}

fn compare(left: &Value, right: &Value, op: BinOp) -> Result<bool, EvalError> {
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        return Ok(match op {
            BinOp::Lt => l < r,
            BinOp::Gt => l > r,
            BinOp::Le => l <= r,
            BinOp::Ge => l >= r,
            _ => unreachable!("compare only handles the four ordering operators"),
        });
    }
    if matches!(left, Value::Boolean(_)) || matches!(right, Value::Boolean(_)) {
        let name = match op {
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            _ => unreachable!("compare only handles the four ordering operators"),
        };
        return Err(EvalError::type_mismatch(name, "INTEGER, REAL, or STRING", "BOOLEAN"));
    }
    let l = left.canonical_string();
    let r = right.canonical_string();
    Ok(match op {
        BinOp::Lt => l < r,
        BinOp::Gt => l > r,
        BinOp::Le => l <= r,
        BinOp::Ge => l >= r,
        _ => unreachable!("compare only handles the four ordering operators"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::io::{BufReader, Cursor};

    fn run_program(source: &str, input: &str) -> (Result<(), EvalError>, String) {
        let program = parse(source).expect("program should parse");
        let mut stdin = BufReader::new(Cursor::new(input.to_string()));
        let mut stdout = Vec::new();
        let result = run(&program, &mut stdin, &mut stdout, InterpretOptions::default());
        (result, String::from_utf8(stdout).unwrap())
    }

    #[test]
    fn hello_world_outputs_a_line() {
        let (result, out) = run_program("OUTPUT \"Hello, World!\"\n", "");
        result.unwrap();
        assert_eq!(out, "Hello, World!\n");
    }

    #[test]
    fn for_loop_accumulates_a_sum() {
        let source = "\
DECLARE Total : INTEGER
Total <- 0
FOR I <- 1 TO 5
    Total <- Total + I
NEXT I
OUTPUT Total
";
        let (result, out) = run_program(source, "");
        result.unwrap();
        assert_eq!(out, "15\n");
    }

    #[test]
    fn for_loop_rejects_zero_step() {
        let source = "\
FOR I <- 1 TO 5 STEP 0
    OUTPUT I
NEXT I
";
        let (result, _) = run_program(source, "");
        assert!(result.is_err());
    }

    #[test]
    fn array_out_of_bounds_is_a_runtime_error() {
        let source = "\
DECLARE A : ARRAY[1:3] OF INTEGER
A[5] <- 1
";
        let (result, _) = run_program(source, "");
        assert!(matches!(result, Err(EvalError::IndexOutOfBounds { .. })));
    }

    #[test]
    fn byref_parameter_writes_back_to_the_caller() {
        let source = "\
PROCEDURE Increment(BYREF X : INTEGER)
    X <- X + 1
ENDPROCEDURE
DECLARE N : INTEGER
N <- 10
CALL Increment(N)
OUTPUT N
";
        let (result, out) = run_program(source, "");
        result.unwrap();
        assert_eq!(out, "11\n");
    }

    #[test]
    fn function_without_return_is_an_error() {
        let source = "\
FUNCTION Broken() RETURNS INTEGER
    DECLARE X : INTEGER
ENDFUNCTION
OUTPUT Broken()
";
        let (result, _) = run_program(source, "");
        assert!(matches!(result, Err(EvalError::MissingReturn(_))));
    }

    #[test]
    fn input_coerces_to_the_declared_type() {
        let source = "\
DECLARE X : INTEGER
INPUT X
OUTPUT X + 1
";
        let (result, out) = run_program(source, "41\n");
        result.unwrap();
        assert_eq!(out, "42\n");
    }

    #[test]
    fn type_mismatch_on_assignment_is_rejected() {
        let source = "\
DECLARE X : INTEGER
X <- \"oops\"
";
        let (result, _) = run_program(source, "");
        assert!(matches!(result, Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn chained_comparison_of_a_boolean_is_rejected() {
        let source = "\
DECLARE X : INTEGER
DECLARE Y : INTEGER
DECLARE Z : INTEGER
X <- 1
Y <- 2
Z <- 3
OUTPUT X < Y < Z
";
        let (result, _) = run_program(source, "");
        assert!(matches!(result, Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn case_statement_falls_through_to_otherwise() {
        let source = "\
DECLARE Grade : INTEGER
Grade <- 9
CASE OF Grade
    1: OUTPUT \"one\"
    2: OUTPUT \"two\"
    OTHERWISE OUTPUT \"other\"
ENDCASE
";
        let (result, out) = run_program(source, "");
        result.unwrap();
        assert_eq!(out, "other\n");
    }

    #[test]
    fn division_always_produces_a_real() {
        let (result, out) = run_program("OUTPUT 4 / 2\n", "");
        result.unwrap();
        assert_eq!(out, "2.0\n");
    }
}
