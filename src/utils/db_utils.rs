use chrono::NaiveDate;
use serde_json::Value;
use sqlx::{MySql, Transaction};

use crate::error::ApiError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Date(NaiveDate),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// What a column stores, so a payload value can be checked before it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    NullableText,
    Date,
    NullableDate,
    Number,
    NullableNumber,
}

impl ColumnKind {
    fn nullable(self) -> bool {
        matches!(
            self,
            ColumnKind::NullableText | ColumnKind::NullableDate | ColumnKind::NullableNumber
        )
    }
}

/// JSON key accepted from clients, the column it writes and that column's kind.
pub type FieldMap = [(&'static str, &'static str, ColumnKind)];

fn to_sql_value(key: &str, kind: ColumnKind, value: &Value) -> Result<SqlValue, ApiError> {
    if value.is_null() {
        return if kind.nullable() {
            Ok(SqlValue::Null)
        } else {
            Err(ApiError::bad_request(format!("{key} cannot be null")))
        };
    }

    match (kind, value) {
        (ColumnKind::Text | ColumnKind::NullableText, Value::String(s)) => {
            Ok(SqlValue::String(s.trim().to_string()))
        }
        (ColumnKind::Text | ColumnKind::NullableText, _) => {
            Err(ApiError::bad_request(format!("{key} must be a string")))
        }
        (ColumnKind::Date | ColumnKind::NullableDate, Value::String(s)) => {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(SqlValue::Date)
                .map_err(|_| ApiError::bad_request(format!("{key} must be a date (YYYY-MM-DD)")))
        }
        (ColumnKind::Date | ColumnKind::NullableDate, _) => {
            Err(ApiError::bad_request(format!("{key} must be a date (YYYY-MM-DD)")))
        }
        (ColumnKind::Number | ColumnKind::NullableNumber, Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::I64(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::F64(f))
            } else {
                Err(ApiError::bad_request(format!("{key} is out of range")))
            }
        }
        (ColumnKind::Number | ColumnKind::NullableNumber, _) => {
            Err(ApiError::bad_request(format!("{key} must be a number")))
        }
    }
}

/// ===============================
/// Build a partial UPDATE
/// ===============================
///
/// Only keys listed in `fields` are accepted, and each value must fit its
/// column kind; anything else is a 400.
/// `scope` becomes the WHERE clause, e.g. `[("id", ..), ("tenant_id", ..)]`.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    fields: &FieldMap,
    scope: &[(&str, SqlValue)],
) -> Result<SqlUpdate, ApiError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    let mut assignments = Vec::with_capacity(obj.len() + 1);
    let mut values = Vec::with_capacity(obj.len() + scope.len());

    for (key, value) in obj {
        let (_, column, kind) = fields
            .iter()
            .find(|(json_key, _, _)| json_key == key)
            .ok_or_else(|| ApiError::bad_request(format!("Field '{key}' cannot be updated")))?;

        assignments.push(format!("{column} = ?"));
        values.push(to_sql_value(key, *kind, value)?);
    }
    assignments.push("updated_at = NOW()".to_string());

    let where_clause = scope
        .iter()
        .map(|(column, _)| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ");
    values.extend(scope.iter().map(|(_, v)| v.clone()));

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        table,
        assignments.join(", "),
        where_clause
    );

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(
    tx: &mut Transaction<'_, MySql>,
    update: SqlUpdate,
) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(&mut **tx).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIELDS: &FieldMap = &[
        ("firstName", "first_name", ColumnKind::Text),
        ("department", "department", ColumnKind::Text),
        ("gender", "gender", ColumnKind::NullableText),
        ("hireDate", "hire_date", ColumnKind::Date),
        ("birthDate", "birth_date", ColumnKind::NullableDate),
        ("salary", "salary", ColumnKind::NullableNumber),
    ];

    fn update(payload: Value) -> Result<SqlUpdate, ApiError> {
        build_update_sql("employees", &payload, FIELDS, &[("id", SqlValue::U64(1))])
    }

    #[test]
    fn builds_scoped_update() {
        let update = build_update_sql(
            "employees",
            &json!({ "firstName": " Lina ", "hireDate": "2025-02-01" }),
            FIELDS,
            &[("id", SqlValue::U64(3)), ("tenant_id", SqlValue::U64(9))],
        )
        .unwrap();

        assert_eq!(
            update.sql,
            "UPDATE employees SET first_name = ?, hire_date = ?, updated_at = NOW() WHERE id = ? AND tenant_id = ?"
        );
        assert_eq!(
            update.values,
            vec![
                SqlValue::String("Lina".into()),
                SqlValue::Date(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()),
                SqlValue::U64(3),
                SqlValue::U64(9),
            ]
        );
    }

    #[test]
    fn rejects_unknown_columns() {
        let err = update(json!({ "tenant_id": 2 })).unwrap_err();
        assert_eq!(err.to_string(), "Field 'tenant_id' cannot be updated");
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        assert!(build_update_sql("employees", &json!({}), FIELDS, &[]).is_err());
        assert!(build_update_sql("employees", &json!([1, 2]), FIELDS, &[]).is_err());
        assert!(update(json!({ "firstName": { "a": 1 } })).is_err());
    }

    #[test]
    fn values_must_fit_their_column() {
        assert_eq!(
            update(json!({ "department": null })).unwrap_err().to_string(),
            "department cannot be null"
        );
        assert_eq!(
            update(json!({ "hireDate": "soon" })).unwrap_err().to_string(),
            "hireDate must be a date (YYYY-MM-DD)"
        );
        assert_eq!(
            update(json!({ "salary": "lots" })).unwrap_err().to_string(),
            "salary must be a number"
        );
        assert_eq!(
            update(json!({ "firstName": 42 })).unwrap_err().to_string(),
            "firstName must be a string"
        );
        // A date-looking string stays text in a text column.
        assert_eq!(
            update(json!({ "department": "2025-01-01" })).unwrap().values[0],
            SqlValue::String("2025-01-01".into())
        );
    }

    #[test]
    fn nullable_columns_accept_null() {
        for payload in [
            json!({ "salary": null }),
            json!({ "birthDate": null }),
            json!({ "gender": null }),
        ] {
            assert_eq!(update(payload).unwrap().values[0], SqlValue::Null);
        }

        assert_eq!(update(json!({ "salary": 5500.5 })).unwrap().values[0], SqlValue::F64(5500.5));
        assert_eq!(update(json!({ "salary": 6000 })).unwrap().values[0], SqlValue::I64(6000));
    }
}
