//! The built-in function table: string, numeric, date, and random helpers that resolve before
//! any user-defined function of the same name. `EOF` is handled in `eval.rs` instead since it
//! needs the open-file table, which these pure functions never touch.

use chrono::{Datelike, Duration, Local, NaiveDate};
use rand::Rng;

use crate::error::EvalError;
use crate::value::Value;

/// Looks up `name` in the built-in table and, if found, applies it to `args`.
///
/// Returns `None` for any name the table doesn't recognize, so the caller can fall back to
/// looking up a user-defined function of the same name.
pub fn call(name: &str, args: Vec<Value>, _line: usize) -> Option<Result<Value, EvalError>> {
    let upper = name.to_uppercase();
    let f: fn(Vec<Value>) -> Result<Value, EvalError> = match upper.as_str() {
        "ASC" => asc,
        "CHR" => chr,
        "LENGTH" => length,
        "LEFT" => left,
        "RIGHT" => right,
        "MID" => mid,
        "TO_UPPER" | "UCASE" => to_upper,
        "TO_LOWER" | "LCASE" => to_lower,
        "NUM_TO_STR" => num_to_str,
        "STR_TO_NUM" => str_to_num,
        "IS_NUM" => is_num,
        "INT" => int_of,
        "ABS" => abs,
        "SQRT" => sqrt,
        "POWER" => power,
        "ROUND" => round,
        "MOD" => modulo,
        "DIV" => int_div,
        "RAND" => rand_bounded,
        "RANDOM" => random_unit,
        "RANDOMINT" => random_int,
        "TODAY" => today,
        "DAY" => day_of,
        "MONTH" => month_of,
        "YEAR" => year_of,
        "DAYINDEX" => day_index,
        "SETDATE" => set_date,
        "DATEDIFF" => date_diff,
        _ => return None,
    };
    Some(f(args))
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), EvalError> {
    if args.len() != expected {
        return Err(EvalError::arg_arity(name, expected, args.len()));
    }
    Ok(())
}

fn as_text(name: &str, value: &Value) -> Result<String, EvalError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Char(c) => Ok(c.to_string()),
        other => Err(EvalError::type_mismatch(name, "STRING or CHAR", other.type_name())),
    }
}

fn as_int(name: &str, value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Integer(i) => Ok(*i),
        other => Err(EvalError::type_mismatch(name, "INTEGER", other.type_name())),
    }
}

fn as_num(name: &str, value: &Value) -> Result<f64, EvalError> {
    value
        .as_number()
        .ok_or_else(|| EvalError::type_mismatch(name, "INTEGER or REAL", value.type_name()))
}

fn as_date(name: &str, value: &Value) -> Result<NaiveDate, EvalError> {
    match value {
        Value::Date(d) => Ok(*d),
        other => Err(EvalError::type_mismatch(name, "DATE", other.type_name())),
    }
}

fn asc(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("ASC", &args, 1)?;
    let s = as_text("ASC", &args.remove(0))?;
    let c = s
        .chars()
        .next()
        .ok_or_else(|| EvalError::builtin("ASC", "empty string"))?;
    Ok(Value::Integer(c as i64))
}

fn chr(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("CHR", &args, 1)?;
    let code = as_int("CHR", &args.remove(0))?;
    let c = u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| EvalError::builtin("CHR", format!("{} is not a valid character code", code)))?;
    Ok(Value::Char(c))
}

fn length(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("LENGTH", &args, 1)?;
    let s = as_text("LENGTH", &args.remove(0))?;
    Ok(Value::Integer(s.chars().count() as i64))
}

fn left(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("LEFT", &args, 2)?;
    let count = as_int("LEFT", &args.remove(1))?;
    let s = as_text("LEFT", &args.remove(0))?;
    let chars: Vec<char> = s.chars().collect();
    if count < 0 {
        return Err(EvalError::builtin("LEFT", format!("count cannot be negative, got {}", count)));
    }
    if count as usize > chars.len() {
        return Err(EvalError::builtin(
            "LEFT",
            format!("requested {} characters but string only has {}", count, chars.len()),
        ));
    }
    Ok(Value::String(chars[..count as usize].iter().collect()))
}

fn right(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("RIGHT", &args, 2)?;
    let count = as_int("RIGHT", &args.remove(1))?;
    let s = as_text("RIGHT", &args.remove(0))?;
    let chars: Vec<char> = s.chars().collect();
    if count < 0 {
        return Err(EvalError::builtin("RIGHT", format!("count cannot be negative, got {}", count)));
    }
    if count as usize > chars.len() {
        return Err(EvalError::builtin(
            "RIGHT",
            format!("requested {} characters but string only has {}", count, chars.len()),
        ));
    }
    Ok(Value::String(chars[chars.len() - count as usize..].iter().collect()))
}

fn mid(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("MID", &args, 3)?;
    let len_val = as_int("MID", &args.remove(2))?;
    let start_pos = as_int("MID", &args.remove(1))?;
    let s = as_text("MID", &args.remove(0))?;
    let chars: Vec<char> = s.chars().collect();

    if start_pos < 1 {
        return Err(EvalError::builtin("MID", format!("start position must be >= 1, got {}", start_pos)));
    }
    if len_val < 0 {
        return Err(EvalError::builtin("MID", format!("length cannot be negative, got {}", len_val)));
    }
    if start_pos as usize > chars.len() {
        return Err(EvalError::builtin(
            "MID",
            format!("start position {} is beyond string length {}", start_pos, chars.len()),
        ));
    }
    let end = start_pos as usize - 1 + len_val as usize;
    if end > chars.len() {
        return Err(EvalError::builtin(
            "MID",
            format!(
                "substring from position {} with length {} exceeds string length {}",
                start_pos,
                len_val,
                chars.len()
            ),
        ));
    }
    Ok(Value::String(chars[start_pos as usize - 1..end].iter().collect()))
}

fn to_upper(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("TO_UPPER", &args, 1)?;
    let s = as_text("TO_UPPER", &args.remove(0))?;
    Ok(Value::String(s.to_uppercase()))
}

fn to_lower(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("TO_LOWER", &args, 1)?;
    let s = as_text("TO_LOWER", &args.remove(0))?;
    Ok(Value::String(s.to_lowercase()))
}

fn num_to_str(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("NUM_TO_STR", &args, 1)?;
    let v = args.remove(0);
    if v.as_number().is_none() {
        return Err(EvalError::type_mismatch("NUM_TO_STR", "INTEGER or REAL", v.type_name()));
    }
    Ok(Value::String(v.canonical_string()))
}

fn str_to_num(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("STR_TO_NUM", &args, 1)?;
    let s = as_text("STR_TO_NUM", &args.remove(0))?;
    if s.contains('.') {
        s.parse::<f64>()
            .map(Value::Real)
            .map_err(|_| EvalError::builtin("STR_TO_NUM", format!("cannot convert '{}' to a number", s)))
    } else {
        s.parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| EvalError::builtin("STR_TO_NUM", format!("cannot convert '{}' to a number", s)))
    }
}

fn is_num(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("IS_NUM", &args, 1)?;
    let s = as_text("IS_NUM", &args.remove(0))?;
    Ok(Value::Boolean(s.parse::<f64>().is_ok()))
}

fn int_of(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("INT", &args, 1)?;
    let n = as_num("INT", &args.remove(0))?;
    Ok(Value::Integer(n.trunc() as i64))
}

fn abs(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("ABS", &args, 1)?;
    match args.remove(0) {
        Value::Integer(i) => Ok(Value::Integer(i.abs())),
        Value::Real(r) => Ok(Value::Real(r.abs())),
        other => Err(EvalError::type_mismatch("ABS", "INTEGER or REAL", other.type_name())),
    }
}

fn sqrt(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("SQRT", &args, 1)?;
    let n = as_num("SQRT", &args.remove(0))?;
    if n < 0.0 {
        return Err(EvalError::builtin("SQRT", format!("cannot take the square root of {}", n)));
    }
    Ok(Value::Real(n.sqrt()))
}

fn power(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("POWER", &args, 2)?;
    let exp = as_num("POWER", &args.remove(1))?;
    let base = as_num("POWER", &args.remove(0))?;
    Ok(Value::Real(base.powf(exp)))
}

fn round(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("ROUND", &args, 2)?;
    let places = as_int("ROUND", &args.remove(1))?;
    let n = as_num("ROUND", &args.remove(0))?;
    if places < 0 {
        return Err(EvalError::builtin("ROUND", format!("decimal places cannot be negative, got {}", places)));
    }
    let factor = 10f64.powi(places as i32);
    Ok(Value::Real((n * factor).round() / factor))
}

fn modulo(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("MOD", &args, 2)?;
    let rhs = as_int("MOD", &args.remove(1))?;
    let lhs = as_int("MOD", &args.remove(0))?;
    if rhs == 0 {
        return Err(EvalError::ZeroDivision);
    }
    Ok(Value::Integer(lhs.rem_euclid(rhs)))
}

fn int_div(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("DIV", &args, 2)?;
    let rhs = as_int("DIV", &args.remove(1))?;
    let lhs = as_int("DIV", &args.remove(0))?;
    if rhs == 0 {
        return Err(EvalError::ZeroDivision);
    }
    Ok(Value::Integer(lhs.div_euclid(rhs)))
}

fn rand_bounded(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("RAND", &args, 1)?;
    let upper = as_num("RAND", &args.remove(0))?;
    if upper <= 0.0 {
        return Err(EvalError::builtin("RAND", format!("upper bound must be > 0, got {}", upper)));
    }
    Ok(Value::Real(rand::thread_rng().gen::<f64>() * upper))
}

fn random_unit(args: Vec<Value>) -> Result<Value, EvalError> {
    arity("RANDOM", &args, 0)?;
    Ok(Value::Real(rand::thread_rng().gen::<f64>()))
}

fn random_int(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("RANDOMINT", &args, 2)?;
    let hi = as_int("RANDOMINT", &args.remove(1))?;
    let lo = as_int("RANDOMINT", &args.remove(0))?;
    if lo > hi {
        return Err(EvalError::builtin("RANDOMINT", format!("lower bound {} exceeds upper bound {}", lo, hi)));
    }
    Ok(Value::Integer(rand::thread_rng().gen_range(lo..=hi)))
}

fn today(args: Vec<Value>) -> Result<Value, EvalError> {
    arity("TODAY", &args, 0)?;
    Ok(Value::Date(Local::now().date_naive()))
}

fn day_of(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("DAY", &args, 1)?;
    let d = as_date("DAY", &args.remove(0))?;
    Ok(Value::Integer(d.day() as i64))
}

fn month_of(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("MONTH", &args, 1)?;
    let d = as_date("MONTH", &args.remove(0))?;
    Ok(Value::Integer(d.month() as i64))
}

fn year_of(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("YEAR", &args, 1)?;
    let d = as_date("YEAR", &args.remove(0))?;
    Ok(Value::Integer(d.year() as i64))
}

/// Sun=1, Mon=2, … Sat=7.
fn day_index(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("DAYINDEX", &args, 1)?;
    let d = as_date("DAYINDEX", &args.remove(0))?;
    Ok(Value::Integer(d.weekday().number_from_sunday() as i64))
}

fn set_date(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("SETDATE", &args, 3)?;
    let year = as_int("SETDATE", &args.remove(2))?;
    let month = as_int("SETDATE", &args.remove(1))?;
    let day = as_int("SETDATE", &args.remove(0))?;
    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or_else(|| EvalError::builtin("SETDATE", format!("{:02}/{:02}/{:04} is not a valid date", day, month, year)))?;
    Ok(Value::Date(date))
}

fn date_diff(mut args: Vec<Value>) -> Result<Value, EvalError> {
    arity("DATEDIFF", &args, 2)?;
    let b = as_date("DATEDIFF", &args.remove(1))?;
    let a = as_date("DATEDIFF", &args.remove(0))?;
    let delta: Duration = a - b;
    Ok(Value::Integer(delta.num_days()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call_ok(name: &str, args: Vec<Value>) -> Value {
        call(name, args, 1).expect("builtin should be recognized").expect("builtin should succeed")
    }

    #[test]
    fn unknown_name_falls_through_to_user_defined_lookup() {
        assert!(call("NOT_A_BUILTIN", vec![], 1).is_none());
    }

    #[test]
    fn left_and_right_and_mid() {
        let s = Value::String("COMPUTER".to_string());
        assert_eq!(call_ok("LEFT", vec![s.clone(), Value::Integer(4)]), Value::String("COMP".to_string()));
        assert_eq!(call_ok("RIGHT", vec![s.clone(), Value::Integer(3)]), Value::String("TER".to_string()));
        assert_eq!(call_ok("MID", vec![s, Value::Integer(3), Value::Integer(4)]), Value::String("MPUT".to_string()));
    }

    #[test]
    fn left_rejects_counts_longer_than_the_string() {
        let s = Value::String("AB".to_string());
        assert!(call("LEFT", vec![s, Value::Integer(5)], 1).unwrap().is_err());
    }

    #[test]
    fn asc_and_chr_round_trip() {
        assert_eq!(call_ok("ASC", vec![Value::Char('A')]), Value::Integer(65));
        assert_eq!(call_ok("CHR", vec![Value::Integer(65)]), Value::Char('A'));
    }

    #[test]
    fn str_to_num_picks_integer_or_real_by_the_presence_of_a_dot() {
        assert_eq!(call_ok("STR_TO_NUM", vec![Value::String("42".to_string())]), Value::Integer(42));
        assert_eq!(call_ok("STR_TO_NUM", vec![Value::String("4.5".to_string())]), Value::Real(4.5));
    }

    #[test]
    fn is_num_reports_well_formed_numbers_only() {
        assert_eq!(call_ok("IS_NUM", vec![Value::String("3.14".to_string())]), Value::Boolean(true));
        assert_eq!(call_ok("IS_NUM", vec![Value::String("abc".to_string())]), Value::Boolean(false));
    }

    #[test]
    fn mod_and_div_follow_euclidean_convention() {
        assert_eq!(call_ok("MOD", vec![Value::Integer(-7), Value::Integer(3)]), Value::Integer(2));
        assert_eq!(call_ok("DIV", vec![Value::Integer(-7), Value::Integer(3)]), Value::Integer(-3));
    }

    #[test]
    fn division_by_zero_is_rejected_for_mod_and_div() {
        assert!(matches!(
            call("MOD", vec![Value::Integer(1), Value::Integer(0)], 1).unwrap(),
            Err(EvalError::ZeroDivision)
        ));
    }

    #[test]
    fn randomint_stays_within_bounds() {
        for _ in 0..50 {
            match call_ok("RANDOMINT", vec![Value::Integer(1), Value::Integer(6)]) {
                Value::Integer(n) => assert!((1..=6).contains(&n)),
                other => panic!("expected integer, got {:?}", other),
            }
        }
    }

    #[test]
    fn rand_stays_within_the_given_upper_bound() {
        for _ in 0..50 {
            match call_ok("RAND", vec![Value::Real(10.0)]) {
                Value::Real(r) => assert!((0.0..10.0).contains(&r)),
                other => panic!("expected real, got {:?}", other),
            }
        }
    }

    #[test]
    fn rand_rejects_a_non_positive_upper_bound() {
        assert!(call("RAND", vec![Value::Integer(0)], 1).unwrap().is_err());
    }

    #[test]
    fn random_takes_no_arguments_and_stays_in_unit_interval() {
        match call_ok("RANDOM", vec![]) {
            Value::Real(r) => assert!((0.0..1.0).contains(&r)),
            other => panic!("expected real, got {:?}", other),
        }
    }

    #[test]
    fn dayindex_sunday_is_one() {
        let sunday = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(call_ok("DAYINDEX", vec![sunday]), Value::Integer(1));
        let saturday = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(call_ok("DAYINDEX", vec![saturday]), Value::Integer(7));
    }

    #[test]
    fn date_diff_counts_whole_days() {
        let a = Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let b = Value::Date(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(call_ok("DATEDIFF", vec![a, b]), Value::Integer(-9));
    }

    #[test]
    fn setdate_rejects_impossible_calendar_dates() {
        assert!(call("SETDATE", vec![Value::Integer(30), Value::Integer(2), Value::Integer(2024)], 1)
            .unwrap()
            .is_err());
    }
}
