/// Custom GraphQL scalar types for Date and DateTime
///
/// These scalars handle ISO 8601 formatted date and datetime strings.

use crate::schema::fields::{DATE, DATE_TIME};

use async_graphql::dynamic::Scalar;
use async_graphql::Value;
use chrono::{DateTime, NaiveDate};

/// Register custom scalars in the schema builder
pub fn register_custom_scalars() -> Vec<Scalar> {
    vec![date_scalar(), datetime_scalar()]
}

fn date_scalar() -> Scalar {
    Scalar::new(DATE)
        .description("ISO 8601 date format (YYYY-MM-DD)")
        .validator(is_date)
}

fn datetime_scalar() -> Scalar {
    Scalar::new(DATE_TIME)
        .description("ISO 8601 datetime format with timezone")
        .validator(is_datetime)
}

fn is_date(value: &Value) -> bool {
    match value {
        Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        _ => false,
    }
}

fn is_datetime(value: &Value) -> bool {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).is_ok(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_registration() {
        let scalars = register_custom_scalars();
        let names: Vec<&str> = scalars.iter().map(|s| s.type_name()).collect();
        assert_eq!(names, vec![DATE, DATE_TIME]);
    }

    #[test]
    fn test_date_validation() {
        assert!(is_date(&Value::String("2024-01-15".to_string())));
        assert!(!is_date(&Value::String("invalid-date".to_string())));
        assert!(!is_date(&Value::Number(20240115.into())));
    }

    #[test]
    fn test_datetime_validation() {
        assert!(is_datetime(&Value::String("2024-01-15T10:00:00Z".to_string())));
        assert!(is_datetime(&Value::String("2024-01-15T10:00:00+02:00".to_string())));
        assert!(!is_datetime(&Value::String("not-a-datetime".to_string())));
        assert!(!is_datetime(&Value::String("2024-01-15".to_string())));
    }
}
