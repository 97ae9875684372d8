use crate::error::{check_range, ValidationError};

/// Literal digit placed between the prefix and the running number of every code.
pub const SEPARATOR: char = '0';

/// Class ordinals offered when picking a class for a new student.
pub const CLASS_ORDINALS: [u8; 2] = [1, 2];

const MAX_SEQUENCE: u32 = 9999;

fn year_suffix(enrollment_year: i64) -> Result<String, ValidationError> {
    let year = check_range("enrollmentYear", enrollment_year, 1000, 9999)?;
    Ok(format!("{:02}", year % 100))
}

/// Department, major and class ordinals are two-digit fields.
pub fn check_two_digit(field: &'static str, value: i64) -> Result<u8, ValidationError> {
    let v = check_range(field, value, 0, 99)?;
    Ok(v as u8)
}

/// `YY` + department id as given + `0` + `counter + 1` padded to four digits.
///
/// `generate_student_id(2021, 5, 972)` is `"21500973"`.
pub fn generate_student_id(
    enrollment_year: i64,
    department_id: i64,
    sequence_counter: u32,
) -> Result<String, ValidationError> {
    let year = year_suffix(enrollment_year)?;
    let department = check_two_digit("departmentId", department_id)?;
    let next = sequence_counter
        .checked_add(1)
        .filter(|n| *n <= MAX_SEQUENCE)
        .ok_or(ValidationError::SequenceExhausted(sequence_counter))?;
    Ok(format!("{year}{department}{SEPARATOR}{next:04}"))
}

/// `YY` + department (2) + major (2) + `0` + ordinal (2).
pub fn generate_class_code(
    enrollment_year: i64,
    department_id: i64,
    major_id: i64,
    class_ordinal: i64,
) -> Result<String, ValidationError> {
    let year = year_suffix(enrollment_year)?;
    let department = check_two_digit("departmentId", department_id)?;
    let major = check_two_digit("majorId", major_id)?;
    let ordinal = check_two_digit("classOrdinal", class_ordinal)?;
    Ok(format!(
        "{year}{department:02}{major:02}{SEPARATOR}{ordinal:02}"
    ))
}

pub fn class_code_options(
    enrollment_year: i64,
    department_id: i64,
    major_id: i64,
) -> Result<Vec<String>, ValidationError> {
    CLASS_ORDINALS
        .iter()
        .map(|&n| generate_class_code(enrollment_year, department_id, major_id, i64::from(n)))
        .collect()
}

/// Rejects a class code that is not among the options for this department and major.
pub fn require_offered_class_code(
    enrollment_year: i64,
    department_id: i64,
    major_id: i64,
    code: &str,
) -> Result<(), ValidationError> {
    let options = class_code_options(enrollment_year, department_id, major_id)?;
    if options.iter().any(|o| o == code) {
        Ok(())
    } else {
        Err(ValidationError::ClassCodeNotOffered(code.to_string()))
    }
}
