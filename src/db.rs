use crate::catalog::{Catalog, ClassInfo, Department, Major};
use crate::codes;
use crate::student::StudentRecord;
use chrono::{NaiveDate, Utc};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;

pub const DB_FILE: &str = "roster.sqlite3";
pub const STUDENT_SEQUENCE: &str = "student";
// Number of students already enrolled when the roster was first set up.
const STUDENT_SEQUENCE_START: i64 = 972;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sequences(
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS departments(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS majors(
            department_id INTEGER NOT NULL,
            id INTEGER NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY(department_id, id),
            FOREIGN KEY(department_id) REFERENCES departments(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id INTEGER PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        )",
        [],
    )?;

    // Catalog references are checked in the handlers, not with foreign keys,
    // so a catalog import can replace the lookup tables in one transaction.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            student_no TEXT NOT NULL,
            name TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            location TEXT NOT NULL DEFAULT '',
            birth_date TEXT,
            department_id INTEGER NOT NULL,
            major_id INTEGER NOT NULL,
            class_id INTEGER NOT NULL,
            active INTEGER NOT NULL,
            sort_order INTEGER NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_students_student_no ON students(student_no)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_sort ON students(sort_order)",
        [],
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO sequences(name, value) VALUES(?, ?)",
        (STUDENT_SEQUENCE, STUDENT_SEQUENCE_START),
    )?;

    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

pub fn sequence_value(conn: &Connection, name: &str) -> anyhow::Result<u32> {
    let v: i64 = conn.query_row("SELECT value FROM sequences WHERE name = ?", [name], |r| {
        r.get(0)
    })?;
    Ok(u32::try_from(v)?)
}

fn sequence_set(conn: &Connection, name: &str, value: u32) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE sequences SET value = ? WHERE name = ?",
        (i64::from(value), name),
    )?;
    Ok(())
}

/// First free student id at or after the current sequence value, and the
/// sequence value that follows it. Does not write anything.
pub fn next_free_student_id(
    conn: &Connection,
    enrollment_year: i64,
    department_id: u8,
) -> anyhow::Result<(String, u32)> {
    let mut counter = sequence_value(conn, STUDENT_SEQUENCE)?;
    loop {
        let candidate =
            codes::generate_student_id(enrollment_year, i64::from(department_id), counter)?;
        counter += 1;
        if !student_no_exists(conn, &candidate)? {
            return Ok((candidate, counter));
        }
    }
}

/// Consumes the sequence. Call inside the transaction that inserts the student.
pub fn allocate_student_id(
    conn: &Connection,
    enrollment_year: i64,
    department_id: u8,
) -> anyhow::Result<String> {
    let (student_no, next) = next_free_student_id(conn, enrollment_year, department_id)?;
    sequence_set(conn, STUDENT_SEQUENCE, next)?;
    Ok(student_no)
}

pub fn load_catalog(conn: &Connection) -> anyhow::Result<Catalog> {
    let mut dept_stmt = conn.prepare("SELECT id, name FROM departments ORDER BY id")?;
    let mut departments = dept_stmt
        .query_map([], |row| {
            Ok(Department {
                id: row.get(0)?,
                name: row.get(1)?,
                majors: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut major_stmt =
        conn.prepare("SELECT id, name FROM majors WHERE department_id = ? ORDER BY id")?;
    for d in &mut departments {
        d.majors = major_stmt
            .query_map([d.id], |row| {
                Ok(Major {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
    }

    let mut class_stmt = conn.prepare("SELECT id, code, name FROM classes ORDER BY id")?;
    let classes = class_stmt
        .query_map([], |row| {
            Ok(ClassInfo {
                id: row.get(0)?,
                code: row.get(1)?,
                name: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Catalog::new(departments, classes)?)
}

/// Wipes and rewrites the lookup tables. Call inside a transaction.
pub fn replace_catalog(conn: &Connection, catalog: &Catalog) -> anyhow::Result<()> {
    conn.execute("DELETE FROM majors", [])?;
    conn.execute("DELETE FROM departments", [])?;
    conn.execute("DELETE FROM classes", [])?;
    for d in catalog.departments() {
        conn.execute(
            "INSERT INTO departments(id, name) VALUES(?, ?)",
            (d.id, &d.name),
        )?;
        for m in &d.majors {
            conn.execute(
                "INSERT INTO majors(department_id, id, name) VALUES(?, ?, ?)",
                (d.id, m.id, &m.name),
            )?;
        }
    }
    for c in catalog.classes() {
        conn.execute(
            "INSERT INTO classes(id, code, name) VALUES(?, ?, ?)",
            (c.id, &c.code, &c.name),
        )?;
    }
    Ok(())
}

pub fn catalog_is_empty(conn: &Connection) -> anyhow::Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM departments) + (SELECT COUNT(*) FROM classes)",
        [],
        |r| r.get(0),
    )?;
    Ok(n == 0)
}

/// Returns the id of the class with this code, creating the row if needed.
pub fn ensure_class(conn: &Connection, code: &str, name: &str) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO classes(code, name) VALUES(?, ?)",
        (code, name),
    )?;
    let id = conn.query_row("SELECT id FROM classes WHERE code = ?", [code], |r| {
        r.get(0)
    })?;
    Ok(id)
}

const STUDENT_COLUMNS: &str = "id, student_no, name, email, location, birth_date,
     department_id, major_id, class_id, active";

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<StudentRecord> {
    let id: String = row.get(0)?;
    let birth_date: Option<String> = row.get(5)?;
    let birthday = birth_date.and_then(|s| {
        match NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!(student = %id, birth_date = %s, "ignoring unreadable birth date: {e}");
                None
            }
        }
    });
    let active: i64 = row.get(9)?;
    Ok(StudentRecord {
        id,
        student_id: row.get(1)?,
        name: row.get(2)?,
        student_email: row.get(3)?,
        location: row.get(4)?,
        birthday,
        department_id: row.get(6)?,
        major_id: row.get(7)?,
        class_id: row.get(8)?,
        is_activated: active != 0,
    })
}

pub fn list_students(conn: &Connection) -> anyhow::Result<Vec<StudentRecord>> {
    let sql = format!("SELECT {STUDENT_COLUMNS} FROM students ORDER BY sort_order");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_student(conn: &Connection, id: &str) -> anyhow::Result<Option<StudentRecord>> {
    let sql = format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?");
    Ok(conn.query_row(&sql, [id], student_from_row).optional()?)
}

pub fn student_no_exists(conn: &Connection, student_no: &str) -> anyhow::Result<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM students WHERE student_no = ?",
            [student_no],
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

fn now_stamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub fn insert_student(conn: &Connection, s: &StudentRecord) -> anyhow::Result<()> {
    let sort_order: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM students",
        [],
        |r| r.get(0),
    )?;
    conn.execute(
        "INSERT INTO students(
           id,
           student_no,
           name,
           email,
           location,
           birth_date,
           department_id,
           major_id,
           class_id,
           active,
           sort_order,
           updated_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &s.id,
            &s.student_id,
            &s.name,
            &s.student_email,
            &s.location,
            s.birthday.map(|d| d.format("%Y-%m-%d").to_string()),
            s.department_id,
            s.major_id,
            s.class_id,
            i64::from(s.is_activated),
            sort_order,
            now_stamp(),
        ),
    )?;
    Ok(())
}

/// Writes the editable fields; `student_no` and references are never touched.
pub fn update_student(conn: &Connection, s: &StudentRecord) -> anyhow::Result<bool> {
    let n = conn.execute(
        "UPDATE students
         SET name = ?, email = ?, location = ?, birth_date = ?, active = ?, updated_at = ?
         WHERE id = ?",
        (
            &s.name,
            &s.student_email,
            &s.location,
            s.birthday.map(|d| d.format("%Y-%m-%d").to_string()),
            i64::from(s.is_activated),
            now_stamp(),
            &s.id,
        ),
    )?;
    Ok(n > 0)
}

pub fn delete_students(conn: &Connection, ids: &[String]) -> anyhow::Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("DELETE FROM students WHERE id IN ({placeholders})");
    Ok(conn.execute(&sql, params_from_iter(ids.iter()))?)
}

/// Students whose department/major/class would be missing from `catalog`.
pub fn count_orphans(conn: &Connection, catalog: &Catalog) -> anyhow::Result<usize> {
    Ok(list_students(conn)?
        .iter()
        .filter(|s| {
            catalog.major(s.department_id, s.major_id).is_none() || catalog.class(s.class_id).is_none()
        })
        .count())
}
