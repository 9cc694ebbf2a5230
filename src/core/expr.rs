//! Purpose: Compile and evaluate jq-style boolean expressions against records.
//! Exports: `WhereExpr`, `ExprValue`.
//! Role: Adapter around `jaq-core` so queries like `.age > 30` run without shelling out.
//! Invariants: Compile failures are usage errors; evaluation errors count as "no match".
//! Invariants: An expression must yield only booleans (otherwise: usage error).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use jaq_core::load::{Arena, File, Loader};
use jaq_core::ops::Math;
use jaq_core::path::Opt;
use jaq_core::{Compiler, Ctx, Error as JaqError, Native, RcIter, ValX};
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone)]
pub struct WhereExpr {
    source: String,
    filter: jaq_core::Filter<Native<ExprValue>>,
}

impl fmt::Debug for WhereExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhereExpr")
            .field("source", &self.source)
            .finish()
    }
}

impl WhereExpr {
    pub fn compile(source: &str) -> Result<Self, Error> {
        let arena = Arena::default();
        let loader = Loader::new(std::iter::empty());
        let program = File {
            code: source,
            path: (),
        };
        let modules = loader
            .load(&arena, program)
            .map_err(|errs| compile_error(source, errs))?;
        let filter = Compiler::default()
            .with_funs(jaq_std::base_funs::<ExprValue>())
            .compile(modules)
            .map_err(|errs| compile_error(source, errs))?;

        Ok(Self {
            source: source.to_string(),
            filter,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when any output is `true`. Evaluation errors (missing fields,
    /// type mismatches) are `Ok(false)`.
    pub fn matches(&self, input: &Value) -> Result<bool, Error> {
        let input = ExprValue::from_json(input);
        let inputs = RcIter::new(std::iter::empty::<Result<ExprValue, String>>());
        let outputs = self.filter.run((Ctx::new([], &inputs), input));

        let mut matched = false;
        for output in outputs {
            match output {
                Ok(ExprValue::Bool(b)) => matched |= b,
                Ok(other) => {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("where expression must yield booleans")
                        .with_hint(format!(
                            "Expression `{}` yielded non-boolean value: {other}",
                            self.source
                        )));
                }
                Err(_) => return Ok(false),
            }
        }
        Ok(matched)
    }
}

fn compile_error<E: fmt::Debug>(source: &str, err: E) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message("invalid where expression")
        .with_hint(format!(
            "Failed to parse/compile `{source}`.\nDetails: {err:?}\nExample: '.type == \"admin\"'"
        ))
}

/// Value domain the compiled filters run over; a JSON mirror with f64 numbers.
#[derive(Clone, Debug)]
pub enum ExprValue {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    Arr(Vec<ExprValue>),
    Obj(BTreeMap<String, ExprValue>),
}

impl ExprValue {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Num(n.as_f64().unwrap_or(0.0)),
            Value::String(s) => Self::Str(s.clone()),
            Value::Array(items) => Self::Arr(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Obj(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    // null < false/true < numbers < strings < arrays < objects
    fn type_order(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Num(_) => 2,
            Self::Str(_) => 3,
            Self::Arr(_) => 4,
            Self::Obj(_) => 5,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integral numbers only; used for array positions and slice bounds.
    fn as_index(&self) -> Result<isize, JaqError<Self>> {
        match self {
            Self::Num(n) if n.is_finite() && n.fract() == 0.0 => Ok(*n as isize),
            other => Err(JaqError::typ(other.clone(), "integer")),
        }
    }

    fn arith(self, op: Math, rhs: Self) -> Result<Self, JaqError<Self>> {
        match (self, op, rhs) {
            (Self::Num(a), Math::Add, Self::Num(b)) => Ok(Self::Num(a + b)),
            (Self::Num(a), Math::Sub, Self::Num(b)) => Ok(Self::Num(a - b)),
            (Self::Num(a), Math::Mul, Self::Num(b)) => Ok(Self::Num(a * b)),
            (Self::Num(a), Math::Div, Self::Num(b)) => Ok(Self::Num(a / b)),
            (Self::Num(a), Math::Rem, Self::Num(b)) => Ok(Self::Num(a % b)),
            (Self::Str(a), Math::Add, Self::Str(b)) => Ok(Self::Str(a + &b)),
            (Self::Arr(mut a), Math::Add, Self::Arr(b)) => {
                a.extend(b);
                Ok(Self::Arr(a))
            }
            (l, op, r) => Err(JaqError::math(l, op, r)),
        }
    }
}

/// Keeps the first value an update closure produces (`.a |= empty` writes null).
fn first_update<'a, I: Iterator<Item = ValX<'a, ExprValue>>>(
    mut outputs: I,
) -> ValX<'a, ExprValue> {
    outputs.next().unwrap_or(Ok(ExprValue::Null))
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{}", Value::from(s.as_str())),
            Self::Arr(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Obj(map) => {
                write!(f, "{{")?;
                for (idx, (k, v)) in map.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{v}", Value::from(k.as_str()))?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for ExprValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<isize> for ExprValue {
    fn from(value: isize) -> Self {
        Self::Num(value as f64)
    }
}

impl From<f64> for ExprValue {
    fn from(value: f64) -> Self {
        Self::Num(value)
    }
}

impl From<String> for ExprValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl FromIterator<Self> for ExprValue {
    fn from_iter<T: IntoIterator<Item = Self>>(iter: T) -> Self {
        Self::Arr(iter.into_iter().collect())
    }
}

impl PartialEq for ExprValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ExprValue {}

impl PartialOrd for ExprValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ExprValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Num(a), Self::Num(b)) => compare_numbers(*a, *b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            (Self::Arr(a), Self::Arr(b)) => a.cmp(b),
            (Self::Obj(a), Self::Obj(b)) => a.cmp(b),
            (a, b) => a.type_order().cmp(&b.type_order()),
        }
    }
}

/// Numeric order where `-0.0` equals `0`; NaN falls back to total ordering.
fn compare_numbers(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

impl std::ops::Add for ExprValue {
    type Output = Result<Self, JaqError<Self>>;

    fn add(self, rhs: Self) -> Self::Output {
        self.arith(Math::Add, rhs)
    }
}

impl std::ops::Sub for ExprValue {
    type Output = Result<Self, JaqError<Self>>;

    fn sub(self, rhs: Self) -> Self::Output {
        self.arith(Math::Sub, rhs)
    }
}

impl std::ops::Mul for ExprValue {
    type Output = Result<Self, JaqError<Self>>;

    fn mul(self, rhs: Self) -> Self::Output {
        self.arith(Math::Mul, rhs)
    }
}

impl std::ops::Div for ExprValue {
    type Output = Result<Self, JaqError<Self>>;

    fn div(self, rhs: Self) -> Self::Output {
        self.arith(Math::Div, rhs)
    }
}

impl std::ops::Rem for ExprValue {
    type Output = Result<Self, JaqError<Self>>;

    fn rem(self, rhs: Self) -> Self::Output {
        self.arith(Math::Rem, rhs)
    }
}

impl std::ops::Neg for ExprValue {
    type Output = Result<Self, JaqError<Self>>;

    fn neg(self) -> Self::Output {
        match self {
            Self::Num(n) => Ok(Self::Num(-n)),
            other => Err(JaqError::typ(other, "number")),
        }
    }
}

impl jaq_core::ValT for ExprValue {
    fn from_num(n: &str) -> Result<Self, JaqError<Self>> {
        n.parse::<f64>().map(Self::Num).map_err(JaqError::str)
    }

    fn from_map<I: IntoIterator<Item = (Self, Self)>>(iter: I) -> Result<Self, JaqError<Self>> {
        let mut map = BTreeMap::new();
        for (k, v) in iter {
            match k {
                Self::Str(key) => map.insert(key, v),
                other => return Err(JaqError::typ(other, "string")),
            };
        }
        Ok(Self::Obj(map))
    }

    fn values(self) -> Box<dyn Iterator<Item = Result<Self, JaqError<Self>>>> {
        match self {
            Self::Arr(items) => Box::new(items.into_iter().map(Ok)),
            Self::Obj(map) => Box::new(map.into_values().map(Ok)),
            other => Box::new(std::iter::once(Err(JaqError::typ(other, "iterable")))),
        }
    }

    fn index(self, index: &Self) -> Result<Self, JaqError<Self>> {
        match (self, index) {
            (Self::Obj(mut map), Self::Str(key)) => match map.remove(key) {
                Some(value) => Ok(value),
                None => Err(JaqError::index(Self::Obj(map), index.clone())),
            },
            (Self::Arr(items), Self::Num(_)) => {
                let raw = index.as_index()?;
                let len = items.len() as isize;
                let pos = if raw < 0 { len + raw } else { raw };
                match usize::try_from(pos).ok().and_then(|pos| items.get(pos)) {
                    Some(value) => Ok(value.clone()),
                    None => Err(JaqError::index(Self::Arr(items), index.clone())),
                }
            }
            (l, r) => Err(JaqError::index(l, r.clone())),
        }
    }

    fn range(self, range: jaq_core::val::Range<&Self>) -> Result<Self, JaqError<Self>> {
        let items = match self {
            Self::Arr(items) => items,
            other => return Err(JaqError::typ(other, "array")),
        };
        let len = items.len() as isize;
        let clamp = |idx: isize| (if idx < 0 { len + idx } else { idx }).clamp(0, len) as usize;
        let start = range.start.map(Self::as_index).transpose()?.unwrap_or(0);
        let end = range.end.map(Self::as_index).transpose()?.unwrap_or(len);
        let (start, end) = (clamp(start), clamp(end));
        if end <= start {
            return Ok(Self::Arr(Vec::new()));
        }
        Ok(Self::Arr(items[start..end].to_vec()))
    }

    fn map_values<'a, I: Iterator<Item = ValX<'a, Self>>>(
        self,
        opt: Opt,
        f: impl Fn(Self) -> I,
    ) -> ValX<'a, Self> {
        match self {
            Self::Arr(items) => items
                .into_iter()
                .map(|item| first_update(f(item)))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Arr),
            Self::Obj(map) => map
                .into_iter()
                .map(|(k, v)| first_update(f(v)).map(|v| (k, v)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Self::Obj),
            other => match opt {
                Opt::Optional => Ok(other),
                Opt::Essential => Err(JaqError::typ(other, "iterable").into()),
            },
        }
    }

    fn map_index<'a, I: Iterator<Item = ValX<'a, Self>>>(
        self,
        index: &Self,
        opt: Opt,
        f: impl Fn(Self) -> I,
    ) -> ValX<'a, Self> {
        let mut map = match self {
            Self::Obj(map) => map,
            other => {
                return match opt {
                    Opt::Optional => Ok(other),
                    Opt::Essential => Err(JaqError::index(other, index.clone()).into()),
                };
            }
        };
        let Some(key) = index.as_text() else {
            return Err(JaqError::typ(index.clone(), "string").into());
        };
        match map.remove(key) {
            Some(value) => {
                let updated = first_update(f(value))?;
                map.insert(key.to_string(), updated);
                Ok(Self::Obj(map))
            }
            None => match opt {
                Opt::Optional => Ok(Self::Obj(map)),
                Opt::Essential => Err(JaqError::index(Self::Obj(map), index.clone()).into()),
            },
        }
    }

    fn map_range<'a, I: Iterator<Item = ValX<'a, Self>>>(
        self,
        range: jaq_core::val::Range<&Self>,
        opt: Opt,
        f: impl Fn(Self) -> I,
    ) -> ValX<'a, Self> {
        match self {
            Self::Arr(_) => first_update(f(<Self as jaq_core::ValT>::range(self, range)?)),
            other => match opt {
                Opt::Optional => Ok(other),
                Opt::Essential => Err(JaqError::typ(other, "array").into()),
            },
        }
    }

    fn as_bool(&self) -> bool {
        !matches!(self, Self::Null | Self::Bool(false))
    }

    fn as_str(&self) -> Option<&str> {
        self.as_text()
    }
}

impl jaq_std::ValT for ExprValue {
    fn into_seq<S: FromIterator<Self>>(self) -> Result<S, Self> {
        match self {
            Self::Arr(items) => Ok(items.into_iter().collect()),
            other => Err(other),
        }
    }

    fn as_isize(&self) -> Option<isize> {
        let n = self.as_number()?;
        let cast = n as isize;
        (n.is_finite() && n.fract() == 0.0 && cast as f64 == n)
            .then_some(cast)
    }

    fn as_f64(&self) -> Result<f64, JaqError<Self>> {
        self.as_number()
            .ok_or_else(|| JaqError::typ(self.clone(), "number"))
    }
}
