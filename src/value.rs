//! Runtime value types: the tagged variant at the bottom of the evaluator's dispatch.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;

use crate::ast::{SimpleType, TypeSpec};

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub dims: Vec<(i64, i64)>,
    pub element_kind: SimpleType,
    pub cells: Vec<Value>,
}

impl ArrayValue {
    pub fn new(dims: Vec<(i64, i64)>, element_kind: SimpleType) -> Self {
        let size: usize = dims
            .iter()
            .map(|(lo, hi)| (hi - lo + 1).max(0) as usize)
            .product();
        let cells = (0..size).map(|_| Value::default_for_simple(element_kind)).collect();
        ArrayValue {
            dims,
            element_kind,
            cells,
        }
    }

    fn flat_index(&self, indices: &[i64], name: &str) -> Result<usize, crate::error::EvalError> {
        if indices.len() != self.dims.len() {
            return Err(crate::error::EvalError::builtin(
                name,
                format!(
                    "array requires {} index(es), got {}",
                    self.dims.len(),
                    indices.len()
                ),
            ));
        }
        let mut stride = 1usize;
        let mut offset = 0usize;
        for (i, &idx) in indices.iter().enumerate().rev() {
            let (lo, hi) = self.dims[i];
            if idx < lo || idx > hi {
                return Err(crate::error::EvalError::index_out_of_bounds(name, idx, lo, hi));
            }
            offset += (idx - lo) as usize * stride;
            stride *= (hi - lo + 1) as usize;
        }
        Ok(offset)
    }

    pub fn get(&self, indices: &[i64], name: &str) -> Result<&Value, crate::error::EvalError> {
        let i = self.flat_index(indices, name)?;
        Ok(&self.cells[i])
    }

    pub fn set(&mut self, indices: &[i64], value: Value, name: &str) -> Result<(), crate::error::EvalError> {
        let i = self.flat_index(indices, name)?;
        self.cells[i] = value;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    pub type_name: String,
    pub field_order: Vec<String>,
    pub field_types: HashMap<String, TypeSpec>,
    pub field_values: HashMap<String, Value>,
}

impl RecordValue {
    pub fn get_field(&self, field: &str) -> Result<&Value, crate::error::EvalError> {
        self.field_values
            .get(field)
            .ok_or_else(|| crate::error::EvalError::unknown_field(&self.type_name, field))
    }

    pub fn set_field(&mut self, field: &str, value: Value) -> Result<(), crate::error::EvalError> {
        if !self.field_values.contains_key(field) {
            return Err(crate::error::EvalError::unknown_field(&self.type_name, field));
        }
        self.field_values.insert(field.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Real(f64),
    String(String),
    Char(char),
    Boolean(bool),
    Date(NaiveDate),
    Array(ArrayValue),
    Record(RecordValue),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::String(_) => "STRING",
            Value::Char(_) => "CHAR",
            Value::Boolean(_) => "BOOLEAN",
            Value::Date(_) => "DATE",
            Value::Array(_) => "ARRAY",
            Value::Record(_) => "RECORD",
        }
    }

    pub fn default_for_simple(kind: SimpleType) -> Self {
        match kind {
            SimpleType::Integer => Value::Integer(0),
            SimpleType::Real => Value::Real(0.0),
            SimpleType::String => Value::String(String::new()),
            SimpleType::Char => Value::Char(' '),
            SimpleType::Boolean => Value::Boolean(false),
            SimpleType::Date => Value::Date(epoch_date()),
        }
    }

    /// The canonical printable representation used by `OUTPUT` and `WRITEFILE`.
    pub fn canonical_string(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Real(r) => format_real(*r),
            Value::String(s) => s.clone(),
            Value::Char(c) => c.to_string(),
            Value::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Date(d) => d.format("%d/%m/%Y").to_string(),
            Value::Array(_) => "ARRAY".to_string(),
            Value::Record(_) => "RECORD".to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Value::Integer(_))
    }
}

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date")
}

/// Shortest round-trip decimal with a mandatory `.`.
fn format_real(r: f64) -> String {
    if r.fract() == 0.0 && r.is_finite() {
        format!("{:.1}", r)
    } else {
        let s = format!("{}", r);
        if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
            s
        } else {
            format!("{}.0", s)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_canonical_form() {
        assert_eq!(Value::Boolean(true).canonical_string(), "TRUE");
        assert_eq!(Value::Boolean(false).canonical_string(), "FALSE");
    }

    #[test]
    fn integer_canonical_form_has_no_leading_zeros() {
        assert_eq!(Value::Integer(42).canonical_string(), "42");
        assert_eq!(Value::Integer(-7).canonical_string(), "-7");
        assert_eq!(Value::Integer(0).canonical_string(), "0");
    }

    #[test]
    fn real_canonical_form_always_has_a_dot() {
        assert_eq!(Value::Real(3.5).canonical_string(), "3.5");
        assert_eq!(Value::Real(4.0).canonical_string(), "4.0");
    }

    #[test]
    fn date_canonical_form_is_zero_padded_dmy() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(Value::Date(d).canonical_string(), "07/03/2024");
    }

    #[test]
    fn array_get_set_round_trip() {
        let mut arr = ArrayValue::new(vec![(2, 4)], SimpleType::Integer);
        arr.set(&[2], Value::Integer(10), "A").unwrap();
        arr.set(&[4], Value::Integer(40), "A").unwrap();
        assert_eq!(*arr.get(&[2], "A").unwrap(), Value::Integer(10));
        assert_eq!(*arr.get(&[4], "A").unwrap(), Value::Integer(40));
        assert!(arr.get(&[1], "A").is_err());
    }

    #[test]
    fn two_dimensional_array_indexing() {
        let mut arr = ArrayValue::new(vec![(1, 2), (1, 3)], SimpleType::Integer);
        arr.set(&[1, 1], Value::Integer(1), "M").unwrap();
        arr.set(&[2, 3], Value::Integer(99), "M").unwrap();
        assert_eq!(*arr.get(&[1, 1], "M").unwrap(), Value::Integer(1));
        assert_eq!(*arr.get(&[2, 3], "M").unwrap(), Value::Integer(99));
    }
}
