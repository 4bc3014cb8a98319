//! A programmable stand-in for a SQL database.
//!
//! Statements are routed by a [`Dispatcher`] to caller-supplied query and
//! update logic, whose canned results come back through typed
//! [`RowList`]s and forward-only [`Cursor`]s. The [`backend`] module puts
//! the same machinery behind the MySQL wire protocol.

pub mod auth;
pub mod backend;
pub mod callable;
pub mod connection;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod fixture;
pub mod handler;
pub mod model;
pub mod param;
pub mod row;
pub mod rowlist;
pub mod statement;

pub use callable::CallableStatement;
pub use connection::{Connection, CONTINUE_ON_ERROR};
pub use cursor::Cursor;
pub use driver::{Driver, URL_PREFIX};
pub use error::{Result, StubError};
pub use fixture::Fixture;
pub use handler::{DetectionRule, Dispatcher, StatementHandler};
pub use model::{Cell, Decimal, FromCell, IntoCell, SqlType};
pub use param::{Nullability, Parameter, ParameterDescriptor, ParameterMetadata, ParameterMode};
pub use row::{row1, row2, row3, row4, row5, row6, row7, row8, Cells, Row};
pub use rowlist::{Column, RowList};
pub use statement::{FetchDirection, PreparedStatement, Statement};
