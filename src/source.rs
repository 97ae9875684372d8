use crate::db;
use crate::student::StudentRecord;
use anyhow::Context;
use rusqlite::Connection;

const EMBEDDED_STUDENTS: &str = include_str!("../fixtures/students.json");

/// Supplies the ordered record collection the table works over.
pub trait StudentSource {
    fn fetch_all_students(&self) -> anyhow::Result<Vec<StudentRecord>>;
}

pub struct SqliteStudentSource<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStudentSource<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl StudentSource for SqliteStudentSource<'_> {
    fn fetch_all_students(&self) -> anyhow::Result<Vec<StudentRecord>> {
        db::list_students(self.conn)
    }
}

/// Static demo data bundled with the binary.
pub struct FixtureStudentSource {
    raw: &'static str,
}

impl FixtureStudentSource {
    pub fn embedded() -> Self {
        Self {
            raw: EMBEDDED_STUDENTS,
        }
    }
}

impl StudentSource for FixtureStudentSource {
    fn fetch_all_students(&self) -> anyhow::Result<Vec<StudentRecord>> {
        serde_json::from_str(self.raw).context("failed to parse student fixture")
    }
}
