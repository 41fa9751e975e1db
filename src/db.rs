use rusqlite::Connection;
use std::path::Path;

use crate::store::{Course, Instructor, RecordStore, Student};

/// Opens (creating if needed) a SQLite mirror of the record store.
/// `sort_order` columns preserve insertion order across round-trips.
pub fn open_db(path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            age INTEGER,
            updated_at TEXT,
            sort_order INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS instructors(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            age INTEGER,
            updated_at TEXT,
            sort_order INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            course_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            PRIMARY KEY(course_id, student_id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_student ON enrollments(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignments(
            course_id TEXT NOT NULL,
            instructor_id TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            PRIMARY KEY(course_id, instructor_id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            FOREIGN KEY(instructor_id) REFERENCES instructors(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assignments_instructor ON assignments(instructor_id)",
        [],
    )?;
    Ok(())
}

/// Replaces the database contents with the store state in one transaction.
pub fn save_store(conn: &Connection, store: &RecordStore) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;

    // Dependency order: association rows first.
    tx.execute("DELETE FROM enrollments", [])?;
    tx.execute("DELETE FROM assignments", [])?;
    tx.execute("DELETE FROM students", [])?;
    tx.execute("DELETE FROM instructors", [])?;
    tx.execute("DELETE FROM courses", [])?;

    for (i, s) in store.students().iter().enumerate() {
        tx.execute(
            "INSERT INTO students(id, name, email, age, updated_at, sort_order)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                &s.id,
                &s.name,
                &s.email,
                s.age.map(|a| a as i64),
                s.updated_at.as_deref(),
                i as i64,
            ),
        )?;
    }
    for (i, ins) in store.instructors().iter().enumerate() {
        tx.execute(
            "INSERT INTO instructors(id, name, email, age, updated_at, sort_order)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                &ins.id,
                &ins.name,
                &ins.email,
                ins.age.map(|a| a as i64),
                ins.updated_at.as_deref(),
                i as i64,
            ),
        )?;
    }
    for (i, c) in store.courses().iter().enumerate() {
        tx.execute(
            "INSERT INTO courses(id, name, sort_order) VALUES(?, ?, ?)",
            (&c.id, &c.name, i as i64),
        )?;
        for (j, sid) in c.enrolled_student_ids.iter().enumerate() {
            tx.execute(
                "INSERT INTO enrollments(course_id, student_id, sort_order) VALUES(?, ?, ?)",
                (&c.id, sid, j as i64),
            )?;
        }
        for (j, iid) in c.assigned_instructor_ids.iter().enumerate() {
            tx.execute(
                "INSERT INTO assignments(course_id, instructor_id, sort_order) VALUES(?, ?, ?)",
                (&c.id, iid, j as i64),
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// Reads the database back into a fresh store, re-checking the uniqueness
/// and referential invariants on the way in.
pub fn load_store(conn: &Connection) -> anyhow::Result<RecordStore> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, age, updated_at FROM students ORDER BY sort_order",
    )?;
    let students = stmt
        .query_map([], |row| {
            Ok(Student {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                age: row.get::<_, Option<i64>>(3)?.map(|a| a as u32),
                updated_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, name, email, age, updated_at FROM instructors ORDER BY sort_order",
    )?;
    let instructors = stmt
        .query_map([], |row| {
            Ok(Instructor {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                age: row.get::<_, Option<i64>>(3)?.map(|a| a as u32),
                updated_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare("SELECT id, name FROM courses ORDER BY sort_order")?;
    let mut courses = stmt
        .query_map([], |row| {
            Ok(Course {
                id: row.get(0)?,
                name: row.get(1)?,
                enrolled_student_ids: Vec::new(),
                assigned_instructor_ids: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn
        .prepare("SELECT course_id, student_id FROM enrollments ORDER BY course_id, sort_order")?;
    let enrollments = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (course_id, student_id) in enrollments {
        if let Some(course) = courses.iter_mut().find(|c| c.id == course_id) {
            course.enrolled_student_ids.push(student_id);
        }
    }

    let mut stmt = conn.prepare(
        "SELECT course_id, instructor_id FROM assignments ORDER BY course_id, sort_order",
    )?;
    let assignments = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (course_id, instructor_id) in assignments {
        if let Some(course) = courses.iter_mut().find(|c| c.id == course_id) {
            course.assigned_instructor_ids.push(instructor_id);
        }
    }

    RecordStore::from_records(students, instructors, courses).map_err(Into::into)
}
