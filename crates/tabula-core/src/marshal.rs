//! Record marshalling
//!
//! Moves data between typed records and flat [`DatabaseValue`] lists.
//!
//! A record type declares its persisted fields once, usually through the
//! [`database_record!`](crate::database_record) macro. Fields are matched to
//! columns by case-insensitive name.
//!
//! The two directions treat mismatches differently:
//!
//! - [`to_values`] skips fields with no matching column. Records may carry
//!   state that is not persisted.
//! - [`to_record`] fails when a value names a column the table does not have,
//!   or a column no field can receive. Either means the schema and the record
//!   type have drifted apart.

use std::sync::Arc;

use crate::{DatabaseValue, Result, TableSchema, TabulaError, Value};

/// A typed record that maps onto a table
pub trait DatabaseRecord: Default {
    /// Names of the persisted fields, in declaration order
    const FIELDS: &'static [&'static str];

    /// Schema of the table this record type is stored in
    fn table_schema() -> Arc<TableSchema>;

    /// Current value of a persisted field, `None` for unknown names
    fn field_value(&self, field: &str) -> Option<Value>;

    /// Assign a persisted field. Returns `Ok(false)` for unknown names.
    fn set_field(&mut self, field: &str, value: Value) -> Result<bool>;
}

/// Conversion between a Rust field type and a cell value.
///
/// `from_value` holds the coercion table: integers become booleans
/// (nonzero is true), doubles narrow to `f32` and integers narrow to the
/// smaller integer types. Anything else must already have the right kind.
pub trait FieldValue: Sized {
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Result<Self>;
}

fn incompatible<T>(value: &Value, target: &str) -> Result<T> {
    Err(TabulaError::Mapping(format!(
        "cannot assign {} value to {}",
        value.kind(),
        target
    )))
}

impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Integer(i) => Ok(i != 0),
            other => incompatible(&other, "bool"),
        }
    }
}

impl FieldValue for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => incompatible(&other, "i64"),
        }
    }
}

macro_rules! narrow_integer_field {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::Integer(i) => Ok(i as $ty),
                        other => incompatible(&other, stringify!($ty)),
                    }
                }
            }
        )*
    };
}

narrow_integer_field!(i8, i16, i32, u8, u16, u32);

impl FieldValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            other => incompatible(&other, "f64"),
        }
    }
}

impl FieldValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f as f32),
            Value::Integer(i) => Ok(i as f32),
            other => incompatible(&other, "f32"),
        }
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => incompatible(&other, "String"),
        }
    }
}

impl FieldValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(b) => Ok(b),
            other => incompatible(&other, "Vec<u8>"),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Assign `value` to `slot`, naming `field` in any mapping error.
pub fn assign<T: FieldValue>(field: &str, slot: &mut T, value: Value) -> Result<()> {
    *slot = T::from_value(value).map_err(|e| match e {
        TabulaError::Mapping(msg) => TabulaError::Mapping(format!("field '{}': {}", field, msg)),
        other => other,
    })?;
    Ok(())
}

/// Implement [`DatabaseRecord`] for a struct by listing its persisted fields.
///
/// ```ignore
/// database_record!(User, table = users_table(), fields { id, name, active });
/// ```
///
/// Every listed field must implement [`FieldValue`]; fields left out of the
/// list are never read or written.
#[macro_export]
macro_rules! database_record {
    ($ty:ty, table = $table:expr, fields { $($field:ident),* $(,)? }) => {
        impl $crate::DatabaseRecord for $ty {
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];

            fn table_schema() -> ::std::sync::Arc<$crate::TableSchema> {
                $table
            }

            fn field_value(&self, field: &str) -> ::std::option::Option<$crate::Value> {
                match field {
                    $(stringify!($field) => ::std::option::Option::Some(
                        $crate::FieldValue::to_value(&self.$field),
                    ),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn set_field(&mut self, field: &str, value: $crate::Value) -> $crate::Result<bool> {
                match field {
                    $(stringify!($field) => {
                        $crate::marshal::assign(field, &mut self.$field, value)?;
                        ::std::result::Result::Ok(true)
                    })*
                    _ => ::std::result::Result::Ok(false),
                }
            }
        }
    };
}

/// Flatten a record into values for `table`.
///
/// Fields without a matching column are skipped, as are columns the
/// database generates (primary key with auto increment).
pub fn to_values<R: DatabaseRecord>(table: &TableSchema, record: &R) -> Vec<DatabaseValue> {
    R::FIELDS
        .iter()
        .filter_map(|field| {
            let column = table.column_ignore_case(field)?;
            if column.is_generated_key() {
                return None;
            }
            let value = record.field_value(field)?;
            Some(DatabaseValue::new(column.name(), value))
        })
        .collect()
}

/// Every mapped field paired with its column, primary keys included.
pub fn mapped_values<R: DatabaseRecord>(table: &TableSchema, record: &R) -> Vec<DatabaseValue> {
    R::FIELDS
        .iter()
        .filter_map(|field| {
            let column = table.column_ignore_case(field)?;
            let value = record.field_value(field)?;
            Some(DatabaseValue::new(column.name(), value))
        })
        .collect()
}

/// Apply `values` to `target`.
///
/// Each value's column is looked up by exact name, then the field by
/// case-insensitive match against that column's name.
pub fn to_record<R: DatabaseRecord>(
    table: &TableSchema,
    values: &[DatabaseValue],
    target: &mut R,
) -> Result<()> {
    for value in values {
        let column = table.column(value.column()).ok_or_else(|| {
            TabulaError::Mapping(format!(
                "column '{}' does not exist in table '{}'",
                value.column(),
                table.name()
            ))
        })?;
        let field = R::FIELDS
            .iter()
            .find(|f| f.eq_ignore_ascii_case(column.name()))
            .ok_or_else(|| {
                TabulaError::Mapping(format!(
                    "no field receives column '{}' of table '{}'",
                    column.name(),
                    table.name()
                ))
            })?;
        if !target.set_field(field, value.value().clone())? {
            return Err(TabulaError::Mapping(format!(
                "record does not accept field '{}'",
                field
            )));
        }
    }
    Ok(())
}

/// Build a fresh record from `values`.
pub fn from_values<R: DatabaseRecord>(table: &TableSchema, values: &[DatabaseValue]) -> Result<R> {
    let mut record = R::default();
    to_record(table, values, &mut record)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CanonicalType, ColumnSchema};
    use pretty_assertions::assert_eq;
    use std::sync::OnceLock;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Account {
        id: i64,
        name: String,
        balance: f32,
        level: i16,
        active: bool,
        nickname: Option<String>,
        transient_counter: u32,
    }

    fn accounts() -> Arc<TableSchema> {
        static TABLE: OnceLock<Arc<TableSchema>> = OnceLock::new();
        TABLE
            .get_or_init(|| {
                Arc::new(
                    TableSchema::builder("accounts")
                        .column(
                            ColumnSchema::builder("ID", CanonicalType::Integer)
                                .primary_key()
                                .auto_increment()
                                .build()
                                .unwrap(),
                        )
                        .column(ColumnSchema::builder("Name", CanonicalType::Text).build().unwrap())
                        .column(
                            ColumnSchema::builder("balance", CanonicalType::Double)
                                .build()
                                .unwrap(),
                        )
                        .column(
                            ColumnSchema::builder("level", CanonicalType::SmallInt)
                                .build()
                                .unwrap(),
                        )
                        .column(
                            ColumnSchema::builder("active", CanonicalType::Boolean)
                                .build()
                                .unwrap(),
                        )
                        .column(
                            ColumnSchema::builder("nickname", CanonicalType::Text)
                                .build()
                                .unwrap(),
                        )
                        .build()
                        .unwrap(),
                )
            })
            .clone()
    }

    crate::database_record!(
        Account,
        table = accounts(),
        fields { id, name, balance, level, active, nickname, transient_counter }
    );

    fn sample() -> Account {
        Account {
            id: 7,
            name: "Ada".into(),
            balance: 12.5,
            level: 3,
            active: true,
            nickname: None,
            transient_counter: 99,
        }
    }

    #[test]
    fn test_to_values_skips_generated_key_and_unmatched_fields() {
        let values = to_values(&accounts(), &sample());
        let columns: Vec<&str> = values.iter().map(|v| v.column()).collect();
        assert_eq!(columns, vec!["Name", "balance", "level", "active", "nickname"]);
        assert_eq!(values[0].value(), &Value::Text("Ada".into()));
        assert_eq!(values[4].value(), &Value::Null);
    }

    #[test]
    fn test_mapped_values_keep_primary_key() {
        let values = mapped_values(&accounts(), &sample());
        assert_eq!(values[0], DatabaseValue::new("ID", 7i64));
        assert_eq!(values.len(), 6);
    }

    #[test]
    fn test_round_trip_leaves_generated_key_unset() {
        let table = accounts();
        let original = sample();
        let restored: Account = from_values(&table, &to_values(&table, &original)).unwrap();
        assert_eq!(
            restored,
            Account {
                id: 0,
                transient_counter: 0,
                ..original
            }
        );
    }

    #[test]
    fn test_coercions() {
        let table = accounts();
        let values = vec![
            DatabaseValue::new("active", Value::Integer(2)),
            DatabaseValue::new("balance", Value::Float(1.25)),
            DatabaseValue::new("level", Value::Integer(300)),
            DatabaseValue::new("nickname", Value::Text("ace".into())),
        ];
        let record: Account = from_values(&table, &values).unwrap();
        assert!(record.active);
        assert_eq!(record.balance, 1.25f32);
        assert_eq!(record.level, 300);
        assert_eq!(record.nickname.as_deref(), Some("ace"));
    }

    #[test]
    fn test_incompatible_value_is_mapping_error() {
        let err = from_values::<Account>(
            &accounts(),
            &[DatabaseValue::new("Name", Value::Integer(1))],
        )
        .unwrap_err();
        match err {
            TabulaError::Mapping(msg) => assert!(msg.contains("field 'name'"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_column_is_mapping_error() {
        let err = from_values::<Account>(&accounts(), &[DatabaseValue::new("email", "x")])
            .unwrap_err();
        assert!(matches!(err, TabulaError::Mapping(_)));
    }

    #[test]
    fn test_column_lookup_is_exact() {
        let err =
            from_values::<Account>(&accounts(), &[DatabaseValue::new("name", "x")]).unwrap_err();
        assert!(matches!(err, TabulaError::Mapping(_)));
    }

    #[test]
    fn test_column_without_field_is_mapping_error() {
        let mut table = (*accounts()).clone();
        table
            .add_column(ColumnSchema::builder("email", CanonicalType::Text).build().unwrap())
            .unwrap();
        let err = from_values::<Account>(&table, &[DatabaseValue::new("email", "a@b")])
            .unwrap_err();
        assert!(matches!(err, TabulaError::Mapping(_)));
    }

    #[test]
    fn test_null_into_plain_field_fails() {
        assert!(bool::from_value(Value::Null).is_err());
        assert_eq!(Option::<bool>::from_value(Value::Null).unwrap(), None);
    }
}
