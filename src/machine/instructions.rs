//! Built-in instruction set.
//!
//! Integer arithmetic wraps on overflow. Binary operators pop the right
//! operand first, so `a b -` computes `a - b`.

use super::{Machine, MAX_STRING_LEN};
use crate::error::MachineError;
use crate::types::Value;

fn mismatch(op: &str, expected: &str, actual: &Value) -> MachineError {
    MachineError::TypeMismatch {
        op: op.to_string(),
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

fn pop_pair(m: &mut Machine, op: &str) -> Result<(Value, Value), MachineError> {
    let b = m.pop(op)?;
    let a = m.pop(op)?;
    Ok((a, b))
}

fn integer_op(
    m: &mut Machine,
    op: &str,
    f: impl Fn(i64, i64) -> Result<i64, MachineError>,
) -> Result<(), MachineError> {
    let b = m.pop_integer(op)?;
    let a = m.pop_integer(op)?;
    let result = f(a, b)?;
    m.push(Value::Integer(result))
}

// --- Arithmetic ---

pub fn add(m: &mut Machine) -> Result<(), MachineError> {
    match pop_pair(m, "+")? {
        (Value::Integer(a), Value::Integer(b)) => m.push(Value::Integer(a.wrapping_add(b))),
        (Value::Str(mut a), Value::Str(b)) => {
            if a.len() + b.len() > MAX_STRING_LEN {
                return Err(MachineError::StringTooLong(a.len() + b.len()));
            }
            a.extend_from_slice(&b);
            m.push(Value::Str(a))
        }
        (_, other) => Err(mismatch("+", "matching integers or strings", &other)),
    }
}

pub fn sub(m: &mut Machine) -> Result<(), MachineError> {
    integer_op(m, "-", |a, b| Ok(a.wrapping_sub(b)))
}

pub fn mul(m: &mut Machine) -> Result<(), MachineError> {
    integer_op(m, "*", |a, b| Ok(a.wrapping_mul(b)))
}

pub fn div(m: &mut Machine) -> Result<(), MachineError> {
    integer_op(m, "/", |a, b| {
        if b == 0 {
            Err(MachineError::DivisionByZero)
        } else {
            Ok(a.wrapping_div(b))
        }
    })
}

pub fn rem(m: &mut Machine) -> Result<(), MachineError> {
    integer_op(m, "%", |a, b| {
        if b == 0 {
            Err(MachineError::DivisionByZero)
        } else {
            Ok(a.wrapping_rem(b))
        }
    })
}

pub fn abs(m: &mut Machine) -> Result<(), MachineError> {
    let n = m.pop_integer("abs")?;
    m.push(Value::Integer(n.wrapping_abs()))
}

pub fn negate(m: &mut Machine) -> Result<(), MachineError> {
    let n = m.pop_integer("negate")?;
    m.push(Value::Integer(n.wrapping_neg()))
}

pub fn bit_and(m: &mut Machine) -> Result<(), MachineError> {
    integer_op(m, "&", |a, b| Ok(a & b))
}

pub fn bit_or(m: &mut Machine) -> Result<(), MachineError> {
    integer_op(m, "|", |a, b| Ok(a | b))
}

pub fn bit_xor(m: &mut Machine) -> Result<(), MachineError> {
    integer_op(m, "^", |a, b| Ok(a ^ b))
}

pub fn bit_not(m: &mut Machine) -> Result<(), MachineError> {
    let n = m.pop_integer("~")?;
    m.push(Value::Integer(!n))
}

// --- Comparison and logic ---

fn ordering(op: &str, a: &Value, b: &Value) -> Result<std::cmp::Ordering, MachineError> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Integer(_), other) | (Value::Str(_), other) => {
            Err(mismatch(op, a.type_name(), other))
        }
        (other, _) => Err(mismatch(op, "integer or string", other)),
    }
}

pub fn less(m: &mut Machine) -> Result<(), MachineError> {
    let (a, b) = pop_pair(m, "<")?;
    let result = ordering("<", &a, &b)?.is_lt();
    m.push(Value::Bool(result))
}

pub fn greater(m: &mut Machine) -> Result<(), MachineError> {
    let (a, b) = pop_pair(m, ">")?;
    let result = ordering(">", &a, &b)?.is_gt();
    m.push(Value::Bool(result))
}

pub fn equal(m: &mut Machine) -> Result<(), MachineError> {
    let (a, b) = pop_pair(m, "=")?;
    m.push(Value::Bool(a == b))
}

pub fn not_equal(m: &mut Machine) -> Result<(), MachineError> {
    let (a, b) = pop_pair(m, "<>")?;
    m.push(Value::Bool(a != b))
}

pub fn and(m: &mut Machine) -> Result<(), MachineError> {
    let (a, b) = pop_pair(m, "and")?;
    m.push(Value::Bool(a.is_truthy() && b.is_truthy()))
}

pub fn or(m: &mut Machine) -> Result<(), MachineError> {
    let (a, b) = pop_pair(m, "or")?;
    m.push(Value::Bool(a.is_truthy() || b.is_truthy()))
}

pub fn not(m: &mut Machine) -> Result<(), MachineError> {
    let a = m.pop("not")?;
    m.push(Value::Bool(!a.is_truthy()))
}

pub fn push_true(m: &mut Machine) -> Result<(), MachineError> {
    m.push(Value::Bool(true))
}

pub fn push_false(m: &mut Machine) -> Result<(), MachineError> {
    m.push(Value::Bool(false))
}

// --- Casts ---

pub fn cast_bool(m: &mut Machine) -> Result<(), MachineError> {
    let a = m.pop("bool")?;
    m.push(Value::Bool(a.is_truthy()))
}

pub fn cast_int(m: &mut Machine) -> Result<(), MachineError> {
    let value = match m.pop("int")? {
        Value::Integer(n) => n,
        Value::Bool(b) => b as i64,
        Value::Str(bytes) => std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| mismatch("int", "numeric string", &Value::Str(bytes.clone())))?,
    };
    m.push(Value::Integer(value))
}

pub fn cast_str(m: &mut Machine) -> Result<(), MachineError> {
    let value = match m.pop("str")? {
        Value::Str(bytes) => bytes,
        other => other.to_string().into_bytes(),
    };
    m.push(Value::Str(value))
}

// --- Stack manipulation ---

pub fn dup(m: &mut Machine) -> Result<(), MachineError> {
    let top = m.peek("dup")?.clone();
    m.push(top)
}

pub fn drop(m: &mut Machine) -> Result<(), MachineError> {
    m.pop("drop").map(|_| ())
}

pub fn swap(m: &mut Machine) -> Result<(), MachineError> {
    let (a, b) = pop_pair(m, "swap")?;
    m.push(b)?;
    m.push(a)
}

pub fn over(m: &mut Machine) -> Result<(), MachineError> {
    let (a, b) = pop_pair(m, "over")?;
    m.push(a.clone())?;
    m.push(b)?;
    m.push(a)
}

/// ( a b c -- b c a )
pub fn rot(m: &mut Machine) -> Result<(), MachineError> {
    let c = m.pop("rot")?;
    let b = m.pop("rot")?;
    let a = m.pop("rot")?;
    m.push(b)?;
    m.push(c)?;
    m.push(a)
}

pub fn nop(_m: &mut Machine) -> Result<(), MachineError> {
    Ok(())
}

// --- Control flow ---

pub fn jmp(m: &mut Machine) -> Result<(), MachineError> {
    let target = m.pop_integer("jmp")?;
    m.jump(target)
}

pub fn call(m: &mut Machine) -> Result<(), MachineError> {
    let target = m.pop_integer("call")?;
    let return_address = m.instruction_pointer();
    m.jump(target)?;
    m.push_return(return_address)
}

pub fn ret(m: &mut Machine) -> Result<(), MachineError> {
    let address = m.pop_return()?;
    m.jump(address as i64)
}

/// ( cond a b -- a|b )
pub fn select(m: &mut Machine) -> Result<(), MachineError> {
    let b = m.pop("if")?;
    let a = m.pop("if")?;
    let cond = m.pop("if")?;
    m.push(if cond.is_truthy() { a } else { b })
}

pub fn exit(m: &mut Machine) -> Result<(), MachineError> {
    m.stop();
    Ok(())
}

// --- I/O ---

pub fn print(m: &mut Machine) -> Result<(), MachineError> {
    let a = m.pop(".")?;
    m.write_output(format!("{}\n", a).as_bytes());
    Ok(())
}

pub fn write(m: &mut Machine) -> Result<(), MachineError> {
    match m.pop("write")? {
        Value::Str(bytes) => m.write_output(&bytes),
        other => m.write_output(other.to_string().as_bytes()),
    }
    Ok(())
}

pub fn read(m: &mut Machine) -> Result<(), MachineError> {
    let line = m.read_line()?;
    m.push(Value::Str(line))
}

pub fn dump_stack(m: &mut Machine) -> Result<(), MachineError> {
    let rendered = m
        .stack()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    let line = format!("<{}> {}\n", m.stack().len(), rendered);
    m.write_output(line.as_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::machine::{InstructionRegistry, Machine, RunStatus};
    use crate::error::MachineError;
    use crate::types::{Token, Value};
    use std::sync::Arc;

    fn run(code: Vec<Token>) -> (Result<RunStatus, MachineError>, Machine) {
        let mut m = Machine::new(Arc::new(InstructionRegistry::new()), code);
        let status = m.run(50);
        (status, m)
    }

    fn op(name: &str) -> Token {
        Token::opcode(name)
    }

    #[test]
    fn test_subtraction_order() {
        let (_, m) = run(vec![Token::Integer(10), Token::Integer(3), op("-")]);
        assert_eq!(m.top(), Some(&Value::Integer(7)));
    }

    #[test]
    fn test_division_by_zero() {
        let (status, _) = run(vec![Token::Integer(1), Token::Integer(0), op("/")]);
        assert_eq!(status, Err(MachineError::DivisionByZero));
    }

    #[test]
    fn test_overflow_wraps() {
        let (status, m) = run(vec![Token::Integer(i64::MAX), Token::Integer(1), op("+")]);
        assert_eq!(status, Ok(RunStatus::Halted));
        assert_eq!(m.top(), Some(&Value::Integer(i64::MIN)));
    }

    #[test]
    fn test_string_concat() {
        let (_, m) = run(vec![Token::Str(b"ab".to_vec()), Token::Str(b"c".to_vec()), op("+")]);
        assert_eq!(m.top(), Some(&Value::Str(b"abc".to_vec())));
    }

    #[test]
    fn test_mixed_add_is_type_error() {
        let (status, _) = run(vec![Token::Str(b"a".to_vec()), Token::Integer(1), op("+")]);
        assert!(matches!(status, Err(MachineError::TypeMismatch { .. })));
    }

    #[test]
    fn test_rot() {
        let (_, m) = run(vec![Token::Integer(1), Token::Integer(2), Token::Integer(3), op("rot")]);
        assert_eq!(
            m.stack(),
            &[Value::Integer(2), Value::Integer(3), Value::Integer(1)]
        );
    }

    #[test]
    fn test_call_and_return() {
        // subroutine at 5 pushes 41, caller adds 1
        let code = vec![
            Token::Integer(5), // 0
            op("call"),        // 1
            Token::Integer(1), // 2
            op("+"),           // 3
            op("exit"),        // 4
            Token::Integer(41), // 5
            op("return"),      // 6
        ];
        let (status, m) = run(code);
        assert_eq!(status, Ok(RunStatus::Stopped));
        assert_eq!(m.top(), Some(&Value::Integer(42)));
        assert!(m.return_stack().is_empty());
    }

    #[test]
    fn test_invalid_jump() {
        let (status, _) = run(vec![Token::Integer(-1), op("jmp")]);
        assert_eq!(status, Err(MachineError::InvalidJump(-1)));
    }

    #[test]
    fn test_select() {
        let (_, m) = run(vec![op("true"), Token::Integer(1), Token::Integer(2), op("if")]);
        assert_eq!(m.top(), Some(&Value::Integer(1)));
        let (_, m) = run(vec![Token::Integer(0), Token::Integer(1), Token::Integer(2), op("if")]);
        assert_eq!(m.top(), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_cast_int_from_string() {
        let (_, m) = run(vec![Token::Str(b"123".to_vec()), op("int")]);
        assert_eq!(m.top(), Some(&Value::Integer(123)));
        let (status, _) = run(vec![Token::Str(b"x".to_vec()), op("int")]);
        assert!(matches!(status, Err(MachineError::TypeMismatch { .. })));
    }

    #[test]
    fn test_print_writes_output() {
        let (_, m) = run(vec![Token::Integer(5), op(".")]);
        assert_eq!(m.output(), b"5\n");
        assert!(m.stack().is_empty());
    }

    #[test]
    fn test_arity_checked_before_execution() {
        let (status, m) = run(vec![Token::Integer(1), op("swap")]);
        assert_eq!(status, Err(MachineError::StackUnderflow("swap".to_string())));
        assert_eq!(m.stack(), &[Value::Integer(1)]);
    }
}
