use serde_json::json;

/// Rule violations in identifier generation, catalog loading and table state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be in {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("student sequence {0} no longer fits in four digits")]
    SequenceExhausted(u32),
    #[error("unknown department: {0}")]
    UnknownDepartment(u8),
    #[error("major {major_id} does not belong to department {department_id}")]
    UnknownMajor { department_id: u8, major_id: u8 },
    #[error("duplicate {kind}: {key}")]
    Duplicate { kind: &'static str, key: String },
    #[error("page size must be one of 5, 10, 25, 50 (got {0})")]
    InvalidPageSize(usize),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("column cannot be hidden: {0}")]
    ColumnNotHideable(String),
    #[error("column cannot be sorted: {0}")]
    ColumnNotSortable(String),
    #[error("class code {0} is not offered for this department and major")]
    ClassCodeNotOffered(String),
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

impl ValidationError {
    /// Machine-readable payload attached to IPC error responses.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => Some(json!({ "field": field, "value": value, "min": min, "max": max })),
            Self::UnknownMajor {
                department_id,
                major_id,
            } => Some(json!({ "departmentId": department_id, "majorId": major_id })),
            Self::Duplicate { kind, key } => Some(json!({ "kind": kind, "key": key })),
            Self::UnknownColumn(c) | Self::ColumnNotHideable(c) | Self::ColumnNotSortable(c) => {
                Some(json!({ "column": c }))
            }
            _ => None,
        }
    }

    /// Exhausting the id space is reported as a conflict, everything else as bad input.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SequenceExhausted(_) => "conflict",
            _ => "validation_failed",
        }
    }
}

pub fn check_range(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<i64, ValidationError> {
    if !(min..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(value)
}
