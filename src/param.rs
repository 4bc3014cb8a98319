//! Descriptors for bound statement parameters.
//!
//! Descriptors are only built through the factory functions on
//! [`ParameterDescriptor`]; the static per-type values come from
//! [`SqlType::defaults`].

use crate::error::{Result, StubError};
use crate::model::{Cell, Decimal, IntoCell, SqlType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterMode {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nullability {
    NoNulls,
    Nullable,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterDescriptor {
    class_name: String,
    mode: ParameterMode,
    sql_type: SqlType,
    sql_type_name: String,
    precision: u32,
    scale: u32,
    nullability: Nullability,
    signed: bool,
}

impl ParameterDescriptor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        class_name: impl Into<String>,
        mode: ParameterMode,
        sql_type: SqlType,
        sql_type_name: impl Into<String>,
        precision: u32,
        scale: u32,
        nullability: Nullability,
        signed: bool,
    ) -> Result<Self> {
        let class_name = class_name.into();
        let sql_type_name = sql_type_name.into();
        if class_name.is_empty() {
            return Err(StubError::InvalidArgument("missing class name".into()));
        }
        if sql_type_name.is_empty() {
            return Err(StubError::InvalidArgument("missing SQL type name".into()));
        }
        Ok(Self {
            class_name,
            mode,
            sql_type,
            sql_type_name,
            precision,
            scale,
            nullability,
            signed,
        })
    }

    /// Descriptor carrying the table defaults for `sql_type`.
    pub fn default_for(sql_type: SqlType) -> Self {
        let d = sql_type.defaults();
        Self::scaled(sql_type, d.scale)
    }

    /// Table defaults with a value-dependent scale.
    pub fn scaled(sql_type: SqlType, scale: u32) -> Self {
        let d = sql_type.defaults();
        Self {
            class_name: d.class_name.to_string(),
            mode: ParameterMode::In,
            sql_type,
            sql_type_name: d.type_name.to_string(),
            precision: d.precision,
            scale,
            nullability: Nullability::Unknown,
            signed: d.signed,
        }
    }

    /// Same descriptor with another parameter mode.
    pub fn with_mode(mut self, mode: ParameterMode) -> Self {
        self.mode = mode;
        self
    }

    /// Descriptor of an OUT parameter registered with table defaults.
    pub fn out(sql_type: SqlType) -> Self {
        Self::default_for(sql_type).with_mode(ParameterMode::Out)
    }

    pub fn out_scaled(sql_type: SqlType, scale: u32) -> Self {
        Self::scaled(sql_type, scale).with_mode(ParameterMode::Out)
    }

    pub fn null(sql_type: SqlType) -> Self {
        Self::default_for(sql_type)
    }

    pub fn bool() -> Self {
        Self::default_for(SqlType::Boolean)
    }

    pub fn byte() -> Self {
        Self::default_for(SqlType::TinyInt)
    }

    pub fn short() -> Self {
        Self::default_for(SqlType::SmallInt)
    }

    pub fn int() -> Self {
        Self::default_for(SqlType::Integer)
    }

    pub fn long() -> Self {
        Self::default_for(SqlType::BigInt)
    }

    pub fn float(value: f32) -> Self {
        Self::scaled(SqlType::Float, fraction_digits(&value.to_string()))
    }

    pub fn real(value: f32) -> Self {
        Self::scaled(SqlType::Real, fraction_digits(&value.to_string()))
    }

    pub fn double(value: f64) -> Self {
        Self::scaled(SqlType::Double, fraction_digits(&value.to_string()))
    }

    pub fn decimal(value: &Decimal) -> Self {
        Self::scaled(SqlType::Decimal, value.scale())
    }

    pub fn numeric(value: &Decimal) -> Self {
        Self::scaled(SqlType::Numeric, value.scale())
    }

    pub fn string() -> Self {
        Self::default_for(SqlType::Varchar)
    }

    pub fn date() -> Self {
        Self::default_for(SqlType::Date)
    }

    pub fn time() -> Self {
        Self::default_for(SqlType::Time)
    }

    pub fn timestamp() -> Self {
        Self::default_for(SqlType::Timestamp)
    }

    /// Descriptor for a value whose declared type is `sql_type`.
    pub fn for_cell(sql_type: SqlType, cell: &Cell) -> Self {
        match (sql_type, cell) {
            (SqlType::Float, Cell::Float(f)) => Self::float(*f as f32),
            (SqlType::Real, Cell::Float(f)) => Self::real(*f as f32),
            (SqlType::Double, Cell::Float(f)) => Self::double(*f),
            (SqlType::Decimal, Cell::Decimal(d)) => Self::decimal(d),
            (SqlType::Numeric, Cell::Decimal(d)) => Self::numeric(d),
            (ty, _) => Self::default_for(ty),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn mode(&self) -> ParameterMode {
        self.mode
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn sql_type_name(&self) -> &str {
        &self.sql_type_name
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn nullability(&self) -> Nullability {
        self.nullability
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }
}

/// Fractional digits of a plain decimal rendering, ignoring trailing zeros.
fn fraction_digits(text: &str) -> u32 {
    match text.split_once('.') {
        Some((_, frac)) => frac.trim_end_matches('0').len() as u32,
        None => 0,
    }
}

/// One bound value and its descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub descriptor: ParameterDescriptor,
    pub value: Cell,
}

impl Parameter {
    pub fn new(descriptor: ParameterDescriptor, value: Cell) -> Self {
        Self { descriptor, value }
    }

    /// Binds a Rust value, deriving the descriptor from its type and value.
    pub fn of<T: IntoCell>(value: T) -> Self {
        let value = value.into_cell();
        Self {
            descriptor: ParameterDescriptor::for_cell(T::SQL_TYPE, &value),
            value,
        }
    }

    pub fn null(sql_type: SqlType) -> Self {
        Self {
            descriptor: ParameterDescriptor::null(sql_type),
            value: Cell::Null,
        }
    }
}

/// Descriptors by 1-based position; a position may be left unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterMetadata {
    descriptors: Vec<Option<ParameterDescriptor>>,
}

impl ParameterMetadata {
    pub fn new(descriptors: Vec<Option<ParameterDescriptor>>) -> Self {
        Self { descriptors }
    }

    pub fn from_bindings(bindings: &[Parameter]) -> Self {
        Self::new(
            bindings
                .iter()
                .map(|p| Some(p.descriptor.clone()))
                .collect(),
        )
    }

    pub fn parameter_count(&self) -> usize {
        self.descriptors.len()
    }

    pub fn descriptor(&self, position: usize) -> Result<&ParameterDescriptor> {
        if position == 0 || position > self.descriptors.len() {
            return Err(StubError::Bounds(position));
        }
        self.descriptors[position - 1]
            .as_ref()
            .ok_or(StubError::Unbound(position))
    }

    pub fn is_nullable(&self, position: usize) -> Result<Nullability> {
        self.descriptor(position).map(|d| d.nullability)
    }

    pub fn is_signed(&self, position: usize) -> Result<bool> {
        self.descriptor(position).map(|d| d.signed)
    }

    pub fn precision(&self, position: usize) -> Result<u32> {
        self.descriptor(position).map(|d| d.precision)
    }

    pub fn scale(&self, position: usize) -> Result<u32> {
        self.descriptor(position).map(|d| d.scale)
    }

    pub fn parameter_type(&self, position: usize) -> Result<SqlType> {
        self.descriptor(position).map(|d| d.sql_type)
    }

    pub fn parameter_type_name(&self, position: usize) -> Result<&str> {
        self.descriptor(position).map(|d| d.sql_type_name.as_str())
    }

    pub fn parameter_class_name(&self, position: usize) -> Result<&str> {
        self.descriptor(position).map(|d| d.class_name.as_str())
    }

    pub fn parameter_mode(&self, position: usize) -> Result<ParameterMode> {
        self.descriptor(position).map(|d| d.mode)
    }
}
