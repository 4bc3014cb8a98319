use crate::error::{Result, StubError};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive SQL types a canned column or a bound parameter can carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Decimal,
    Numeric,
    Varchar,
    Date,
    Time,
    Timestamp,
}

/// Static per-type metadata used when no value-specific information exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDefaults {
    pub class_name: &'static str,
    pub type_name: &'static str,
    pub precision: u32,
    pub scale: u32,
    pub signed: bool,
}

impl SqlType {
    pub const ALL: [SqlType; 14] = [
        SqlType::Boolean,
        SqlType::TinyInt,
        SqlType::SmallInt,
        SqlType::Integer,
        SqlType::BigInt,
        SqlType::Float,
        SqlType::Real,
        SqlType::Double,
        SqlType::Decimal,
        SqlType::Numeric,
        SqlType::Varchar,
        SqlType::Date,
        SqlType::Time,
        SqlType::Timestamp,
    ];

    pub fn defaults(self) -> TypeDefaults {
        let (class_name, type_name, precision, scale, signed) = match self {
            SqlType::Boolean => ("bool", "BOOL", 1, 0, false),
            SqlType::TinyInt => ("i8", "TINYINT", 16, 0, true),
            SqlType::SmallInt => ("i16", "SMALLINT", 16, 0, true),
            SqlType::Integer => ("i32", "INTEGER", 32, 0, true),
            SqlType::BigInt => ("i64", "BIGINT", 64, 0, true),
            SqlType::Float => ("f32", "FLOAT", 32, 2, true),
            // REAL reports itself as FLOAT, as most drivers do.
            SqlType::Real => ("f32", "FLOAT", 32, 2, true),
            SqlType::Double => ("f64", "DOUBLE", 64, 2, true),
            SqlType::Decimal => ("Decimal", "DECIMAL", 0, 2, true),
            SqlType::Numeric => ("Decimal", "NUMERIC", 0, 2, true),
            SqlType::Varchar => ("String", "VARCHAR", 0, 0, false),
            SqlType::Date => ("NaiveDate", "DATE", 0, 0, false),
            SqlType::Time => ("NaiveTime", "TIME", 0, 0, false),
            SqlType::Timestamp => ("NaiveDateTime", "TIMESTAMP", 0, 0, false),
        };
        TypeDefaults {
            class_name,
            type_name,
            precision,
            scale,
            signed,
        }
    }

    pub fn type_name(self) -> &'static str {
        self.defaults().type_name
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            SqlType::Boolean
                | SqlType::TinyInt
                | SqlType::SmallInt
                | SqlType::Integer
                | SqlType::BigInt
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, SqlType::Float | SqlType::Real | SqlType::Double)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Exact decimal number; its scale keeps trailing zeros (`1.50` has scale 2).
pub use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Null, Cell::Null) => true,
            (Cell::Bool(a), Cell::Bool(b)) => a == b,
            (Cell::Int(a), Cell::Int(b)) => a == b,
            (Cell::Float(a), Cell::Float(b)) => a.to_bits() == b.to_bits(),
            (Cell::Decimal(a), Cell::Decimal(b)) => a == b,
            (Cell::Text(a), Cell::Text(b)) => a == b,
            (Cell::Date(a), Cell::Date(b)) => a == b,
            (Cell::Time(a), Cell::Time(b)) => a == b,
            (Cell::Timestamp(a), Cell::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Cell::Null => 0.hash(state),
            Cell::Bool(b) => {
                1.hash(state);
                b.hash(state);
            }
            Cell::Int(i) => {
                2.hash(state);
                i.hash(state);
            }
            Cell::Float(f) => {
                3.hash(state);
                f.to_bits().hash(state);
            }
            Cell::Decimal(d) => {
                4.hash(state);
                d.hash(state);
            }
            Cell::Text(s) => {
                5.hash(state);
                s.hash(state);
            }
            Cell::Date(d) => {
                6.hash(state);
                d.hash(state);
            }
            Cell::Time(t) => {
                7.hash(state);
                t.hash(state);
            }
            Cell::Timestamp(ts) => {
                8.hash(state);
                ts.hash(state);
            }
        }
    }
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Best type tag for a cell seen without column metadata.
    pub fn sql_type(&self) -> Option<SqlType> {
        match self {
            Cell::Null => None,
            Cell::Bool(_) => Some(SqlType::Boolean),
            Cell::Int(_) => Some(SqlType::BigInt),
            Cell::Float(_) => Some(SqlType::Double),
            Cell::Decimal(_) => Some(SqlType::Decimal),
            Cell::Text(_) => Some(SqlType::Varchar),
            Cell::Date(_) => Some(SqlType::Date),
            Cell::Time(_) => Some(SqlType::Time),
            Cell::Timestamp(_) => Some(SqlType::Timestamp),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Cell::Null => "NULL",
            Cell::Bool(_) => "boolean",
            Cell::Int(_) => "integer",
            Cell::Float(_) => "float",
            Cell::Decimal(_) => "decimal",
            Cell::Text(_) => "text",
            Cell::Date(_) => "date",
            Cell::Time(_) => "time",
            Cell::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NULL"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Decimal(d) => write!(f, "{d}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Cell::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// A Rust value usable as a typed row cell or a bound parameter.
pub trait IntoCell: Clone {
    const SQL_TYPE: SqlType;
    const NULLABLE: bool = false;

    fn into_cell(self) -> Cell;
}

macro_rules! into_cell {
    ($ty:ty, $sql:expr, |$v:ident| $body:expr) => {
        impl IntoCell for $ty {
            const SQL_TYPE: SqlType = $sql;

            fn into_cell(self) -> Cell {
                let $v = self;
                $body
            }
        }
    };
}

into_cell!(bool, SqlType::Boolean, |v| Cell::Bool(v));
into_cell!(i8, SqlType::TinyInt, |v| Cell::Int(i64::from(v)));
into_cell!(i16, SqlType::SmallInt, |v| Cell::Int(i64::from(v)));
into_cell!(i32, SqlType::Integer, |v| Cell::Int(i64::from(v)));
into_cell!(i64, SqlType::BigInt, |v| Cell::Int(v));
into_cell!(f32, SqlType::Float, |v| Cell::Float(f64::from(v)));
into_cell!(f64, SqlType::Double, |v| Cell::Float(v));
into_cell!(Decimal, SqlType::Decimal, |v| Cell::Decimal(v));
into_cell!(String, SqlType::Varchar, |v| Cell::Text(v));
into_cell!(NaiveDate, SqlType::Date, |v| Cell::Date(v));
into_cell!(NaiveTime, SqlType::Time, |v| Cell::Time(v));
into_cell!(NaiveDateTime, SqlType::Timestamp, |v| Cell::Timestamp(v));

impl IntoCell for &str {
    const SQL_TYPE: SqlType = SqlType::Varchar;

    fn into_cell(self) -> Cell {
        Cell::Text(self.to_string())
    }
}

impl<T: IntoCell> IntoCell for Option<T> {
    const SQL_TYPE: SqlType = T::SQL_TYPE;
    const NULLABLE: bool = true;

    fn into_cell(self) -> Cell {
        match self {
            Some(v) => v.into_cell(),
            None => Cell::Null,
        }
    }
}

/// Typed read of a cell, with the widening conversions a client expects.
pub trait FromCell: Sized {
    fn from_cell(cell: &Cell) -> Result<Self>;
}

fn incompatible<T>(cell: &Cell, target: &str) -> Result<T> {
    Err(StubError::InvalidArgument(format!(
        "cannot read {} value as {target}",
        cell.kind()
    )))
}

impl FromCell for Cell {
    fn from_cell(cell: &Cell) -> Result<Self> {
        Ok(cell.clone())
    }
}

impl<T: FromCell> FromCell for Option<T> {
    fn from_cell(cell: &Cell) -> Result<Self> {
        match cell {
            Cell::Null => Ok(None),
            other => T::from_cell(other).map(Some),
        }
    }
}

impl FromCell for i64 {
    fn from_cell(cell: &Cell) -> Result<Self> {
        match cell {
            Cell::Int(i) => Ok(*i),
            Cell::Bool(b) => Ok(i64::from(*b)),
            Cell::Decimal(d) if d.scale() == 0 => d
                .to_i64()
                .ok_or_else(|| StubError::InvalidArgument(format!("integer overflow: {d}"))),
            other => incompatible(other, "i64"),
        }
    }
}

macro_rules! narrow_int {
    ($($ty:ty),*) => {$(
        impl FromCell for $ty {
            fn from_cell(cell: &Cell) -> Result<Self> {
                let wide = i64::from_cell(cell)?;
                <$ty>::try_from(wide).map_err(|_| {
                    StubError::InvalidArgument(format!(
                        "{wide} out of range for {}",
                        stringify!($ty)
                    ))
                })
            }
        }
    )*};
}

narrow_int!(i8, i16, i32);

impl FromCell for f64 {
    fn from_cell(cell: &Cell) -> Result<Self> {
        match cell {
            Cell::Float(f) => Ok(*f),
            Cell::Int(i) => Ok(*i as f64),
            Cell::Decimal(d) => d
                .to_f64()
                .ok_or_else(|| StubError::InvalidArgument(format!("not representable as f64: {d}"))),
            other => incompatible(other, "f64"),
        }
    }
}

impl FromCell for f32 {
    fn from_cell(cell: &Cell) -> Result<Self> {
        f64::from_cell(cell).map(|f| f as f32)
    }
}

impl FromCell for bool {
    fn from_cell(cell: &Cell) -> Result<Self> {
        match cell {
            Cell::Bool(b) => Ok(*b),
            Cell::Int(i) => Ok(*i != 0),
            other => incompatible(other, "bool"),
        }
    }
}

impl FromCell for Decimal {
    fn from_cell(cell: &Cell) -> Result<Self> {
        match cell {
            Cell::Decimal(d) => Ok(*d),
            Cell::Int(i) => Ok(Decimal::from(*i)),
            Cell::Text(s) => parse_decimal(s),
            other => incompatible(other, "decimal"),
        }
    }
}

/// Parses decimal text exactly, keeping the written scale.
pub(crate) fn parse_decimal(text: &str) -> Result<Decimal> {
    let t = text.trim();
    let parsed = if t.contains(['e', 'E']) {
        Decimal::from_scientific(t)
    } else {
        Decimal::from_str_exact(t)
    };
    parsed.map_err(|e| StubError::InvalidArgument(format!("not a decimal number: {text}: {e}")))
}

impl FromCell for String {
    fn from_cell(cell: &Cell) -> Result<Self> {
        match cell {
            Cell::Null => incompatible(cell, "String"),
            other => Ok(other.to_string()),
        }
    }
}

impl FromCell for NaiveDate {
    fn from_cell(cell: &Cell) -> Result<Self> {
        match cell {
            Cell::Date(d) => Ok(*d),
            Cell::Timestamp(ts) => Ok(ts.date()),
            other => incompatible(other, "date"),
        }
    }
}

impl FromCell for NaiveTime {
    fn from_cell(cell: &Cell) -> Result<Self> {
        match cell {
            Cell::Time(t) => Ok(*t),
            Cell::Timestamp(ts) => Ok(ts.time()),
            other => incompatible(other, "time"),
        }
    }
}

impl FromCell for NaiveDateTime {
    fn from_cell(cell: &Cell) -> Result<Self> {
        match cell {
            Cell::Timestamp(ts) => Ok(*ts),
            Cell::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            other => incompatible(other, "timestamp"),
        }
    }
}
