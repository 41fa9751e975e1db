use std::fmt;
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Student,
    Instructor,
    Course,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Student => write!(f, "student"),
            RecordKind::Instructor => write!(f, "instructor"),
            RecordKind::Course => write!(f, "course"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: RecordKind, id: String },
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl StoreError {
    fn duplicate(kind: RecordKind, id: &str) -> Self {
        StoreError::DuplicateId {
            kind,
            id: id.to_string(),
        }
    }

    fn not_found(kind: RecordKind, id: &str) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enrolled_student_ids: Vec<String>,
    #[serde(default)]
    pub assigned_instructor_ids: Vec<String>,
}

/// Patch for student/instructor updates. Absent field = unchanged;
/// `age: Some(None)` clears a previously set age.
#[derive(Debug, Default, Clone)]
pub struct PersonPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<Option<u32>>,
}

#[derive(Debug, Default, Clone)]
pub struct CoursePatch {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub kind: RecordKind,
    pub id: String,
    pub name: String,
}

const MAX_AGE: u32 = 150;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email regex")
    })
}

fn validate_id(id: &str) -> Result<String, StoreError> {
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(StoreError::invalid("id", "must not be empty"));
    }
    Ok(id)
}

fn validate_name(name: &str) -> Result<String, StoreError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(StoreError::invalid("name", "must not be empty"));
    }
    Ok(name)
}

fn validate_email(email: &str) -> Result<String, StoreError> {
    let email = email.trim().to_string();
    if !email_regex().is_match(&email) {
        return Err(StoreError::invalid(
            "email",
            format!("not a valid email address: {email}"),
        ));
    }
    Ok(email)
}

fn validate_age(age: Option<u32>) -> Result<Option<u32>, StoreError> {
    match age {
        Some(a) if a > MAX_AGE => Err(StoreError::invalid(
            "age",
            format!("must be at most {MAX_AGE}, got {a}"),
        )),
        other => Ok(other),
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Owns every student, instructor, course, and association in the system.
/// Per-type lists keep insertion order; every operation validates fully
/// before mutating, so a failed call never leaves a partial change behind.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    students: Vec<Student>,
    instructors: Vec<Instructor>,
    courses: Vec<Course>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from raw record lists, enforcing per-type id
    /// uniqueness and rejecting associations that reference absent ids.
    /// This is the single gate both snapshot load and the SQLite mirror
    /// pass through.
    pub fn from_records(
        students: Vec<Student>,
        instructors: Vec<Instructor>,
        courses: Vec<Course>,
    ) -> Result<Self, StoreError> {
        let mut store = RecordStore::new();
        for s in students {
            store.check_new_student(&s.id)?;
            store.students.push(s);
        }
        for i in instructors {
            store.check_new_instructor(&i.id)?;
            store.instructors.push(i);
        }
        for c in courses {
            if store.courses.iter().any(|x| x.id == c.id) {
                return Err(StoreError::duplicate(RecordKind::Course, &c.id));
            }
            for sid in &c.enrolled_student_ids {
                if !store.students.iter().any(|s| &s.id == sid) {
                    return Err(StoreError::not_found(RecordKind::Student, sid));
                }
            }
            for iid in &c.assigned_instructor_ids {
                if !store.instructors.iter().any(|i| &i.id == iid) {
                    return Err(StoreError::not_found(RecordKind::Instructor, iid));
                }
            }
            store.courses.push(c);
        }
        Ok(store)
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn instructors(&self) -> &[Instructor] {
        &self.instructors
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    fn check_new_student(&self, id: &str) -> Result<(), StoreError> {
        if self.students.iter().any(|s| s.id == id) {
            return Err(StoreError::duplicate(RecordKind::Student, id));
        }
        Ok(())
    }

    fn check_new_instructor(&self, id: &str) -> Result<(), StoreError> {
        if self.instructors.iter().any(|i| i.id == id) {
            return Err(StoreError::duplicate(RecordKind::Instructor, id));
        }
        Ok(())
    }

    pub fn add_student(
        &mut self,
        id: &str,
        name: &str,
        email: &str,
        age: Option<u32>,
    ) -> Result<(), StoreError> {
        let id = validate_id(id)?;
        let name = validate_name(name)?;
        let email = validate_email(email)?;
        let age = validate_age(age)?;
        self.check_new_student(&id)?;
        self.students.push(Student {
            id,
            name,
            email,
            age,
            updated_at: Some(now_rfc3339()),
        });
        Ok(())
    }

    pub fn add_instructor(
        &mut self,
        id: &str,
        name: &str,
        email: &str,
        age: Option<u32>,
    ) -> Result<(), StoreError> {
        let id = validate_id(id)?;
        let name = validate_name(name)?;
        let email = validate_email(email)?;
        let age = validate_age(age)?;
        self.check_new_instructor(&id)?;
        self.instructors.push(Instructor {
            id,
            name,
            email,
            age,
            updated_at: Some(now_rfc3339()),
        });
        Ok(())
    }

    pub fn add_course(&mut self, id: &str, name: &str) -> Result<(), StoreError> {
        let id = validate_id(id)?;
        let name = validate_name(name)?;
        if self.courses.iter().any(|c| c.id == id) {
            return Err(StoreError::duplicate(RecordKind::Course, &id));
        }
        self.courses.push(Course {
            id,
            name,
            enrolled_student_ids: Vec::new(),
            assigned_instructor_ids: Vec::new(),
        });
        Ok(())
    }

    pub fn student(&self, id: &str) -> Result<&Student, StoreError> {
        self.students
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Student, id))
    }

    pub fn instructor(&self, id: &str) -> Result<&Instructor, StoreError> {
        self.instructors
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Instructor, id))
    }

    pub fn course(&self, id: &str) -> Result<&Course, StoreError> {
        self.courses
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Course, id))
    }

    pub fn update_student(&mut self, id: &str, patch: PersonPatch) -> Result<&Student, StoreError> {
        // Validate everything up front; the record is only touched once
        // all patch fields are known-good.
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let email = patch.email.as_deref().map(validate_email).transpose()?;
        let age = patch.age.map(validate_age).transpose()?;
        let student = self
            .students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Student, id))?;
        if let Some(name) = name {
            student.name = name;
        }
        if let Some(email) = email {
            student.email = email;
        }
        if let Some(age) = age {
            student.age = age;
        }
        student.updated_at = Some(now_rfc3339());
        Ok(student)
    }

    pub fn update_instructor(
        &mut self,
        id: &str,
        patch: PersonPatch,
    ) -> Result<&Instructor, StoreError> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let email = patch.email.as_deref().map(validate_email).transpose()?;
        let age = patch.age.map(validate_age).transpose()?;
        let instructor = self
            .instructors
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Instructor, id))?;
        if let Some(name) = name {
            instructor.name = name;
        }
        if let Some(email) = email {
            instructor.email = email;
        }
        if let Some(age) = age {
            instructor.age = age;
        }
        instructor.updated_at = Some(now_rfc3339());
        Ok(instructor)
    }

    pub fn update_course(&mut self, id: &str, patch: CoursePatch) -> Result<&Course, StoreError> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let course = self
            .courses
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Course, id))?;
        if let Some(name) = name {
            course.name = name;
        }
        Ok(course)
    }

    /// Removes the student and cascades the removal out of every course
    /// enrollment that referenced it.
    pub fn delete_student(&mut self, id: &str) -> Result<(), StoreError> {
        let pos = self
            .students
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Student, id))?;
        self.students.remove(pos);
        for course in &mut self.courses {
            course.enrolled_student_ids.retain(|sid| sid != id);
        }
        Ok(())
    }

    /// Removes the instructor and cascades the removal out of every course
    /// assignment that referenced it.
    pub fn delete_instructor(&mut self, id: &str) -> Result<(), StoreError> {
        let pos = self
            .instructors
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Instructor, id))?;
        self.instructors.remove(pos);
        for course in &mut self.courses {
            course.assigned_instructor_ids.retain(|iid| iid != id);
        }
        Ok(())
    }

    /// Removes the course; its association lists go with it.
    pub fn delete_course(&mut self, id: &str) -> Result<(), StoreError> {
        let pos = self
            .courses
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Course, id))?;
        self.courses.remove(pos);
        Ok(())
    }

    /// Enrolls the student into the course. Idempotent: re-enrolling an
    /// already-enrolled student is a no-op and returns `false`.
    pub fn enroll(&mut self, student_id: &str, course_id: &str) -> Result<bool, StoreError> {
        self.student(student_id)?;
        let course = self
            .courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Course, course_id))?;
        if course.enrolled_student_ids.iter().any(|s| s == student_id) {
            return Ok(false);
        }
        course.enrolled_student_ids.push(student_id.to_string());
        Ok(true)
    }

    /// Assigns the instructor to the course. Idempotent like `enroll`.
    pub fn assign(&mut self, instructor_id: &str, course_id: &str) -> Result<bool, StoreError> {
        self.instructor(instructor_id)?;
        let course = self
            .courses
            .iter_mut()
            .find(|c| c.id == course_id)
            .ok_or_else(|| StoreError::not_found(RecordKind::Course, course_id))?;
        if course
            .assigned_instructor_ids
            .iter()
            .any(|i| i == instructor_id)
        {
            return Ok(false);
        }
        course.assigned_instructor_ids.push(instructor_id.to_string());
        Ok(true)
    }

    /// Case-insensitive substring search over record names, across all
    /// three record types, in store order.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let needle = query.trim().to_lowercase();
        let mut hits = Vec::new();
        if needle.is_empty() {
            return hits;
        }
        for s in &self.students {
            if s.name.to_lowercase().contains(&needle) {
                hits.push(SearchHit {
                    kind: RecordKind::Student,
                    id: s.id.clone(),
                    name: s.name.clone(),
                });
            }
        }
        for i in &self.instructors {
            if i.name.to_lowercase().contains(&needle) {
                hits.push(SearchHit {
                    kind: RecordKind::Instructor,
                    id: i.id.clone(),
                    name: i.name.clone(),
                });
            }
        }
        for c in &self.courses {
            if c.name.to_lowercase().contains(&needle) {
                hits.push(SearchHit {
                    kind: RecordKind::Course,
                    id: c.id.clone(),
                    name: c.name.clone(),
                });
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> RecordStore {
        let mut store = RecordStore::new();
        store
            .add_student("1", "Ada Lovelace", "ada@x.com", Some(20))
            .expect("add student");
        store
            .add_instructor("i1", "Grace Hopper", "grace@x.com", None)
            .expect("add instructor");
        store.add_course("10", "Math").expect("add course");
        store
    }

    #[test]
    fn add_then_get_returns_same_record() {
        let store = sample_store();
        let s = store.student("1").expect("get");
        assert_eq!(s.name, "Ada Lovelace");
        assert_eq!(s.email, "ada@x.com");
        assert_eq!(s.age, Some(20));
    }

    #[test]
    fn duplicate_id_fails_and_leaves_store_unchanged() {
        let mut store = sample_store();
        let err = store
            .add_student("1", "Impostor", "imp@x.com", None)
            .expect_err("duplicate must fail");
        assert!(matches!(err, StoreError::DuplicateId { .. }));
        assert_eq!(store.students().len(), 1);
        assert_eq!(store.student("1").expect("get").name, "Ada Lovelace");
    }

    #[test]
    fn invalid_email_rejected_before_mutation() {
        let mut store = sample_store();
        let err = store
            .add_student("2", "Bob", "not-an-email", None)
            .expect_err("bad email must fail");
        assert!(matches!(err, StoreError::Invalid { field: "email", .. }));
        assert_eq!(store.students().len(), 1);
    }

    #[test]
    fn oversized_age_rejected() {
        let mut store = sample_store();
        let err = store
            .add_instructor("i2", "Old One", "old@x.com", Some(151))
            .expect_err("age 151 must fail");
        assert!(matches!(err, StoreError::Invalid { field: "age", .. }));
        assert_eq!(store.instructors().len(), 1);
    }

    #[test]
    fn blank_name_rejected() {
        let mut store = sample_store();
        let err = store.add_course("11", "   ").expect_err("blank name");
        assert!(matches!(err, StoreError::Invalid { field: "name", .. }));
        assert_eq!(store.courses().len(), 1);
    }

    #[test]
    fn enroll_is_idempotent() {
        let mut store = sample_store();
        assert!(store.enroll("1", "10").expect("first enroll"));
        assert!(!store.enroll("1", "10").expect("second enroll"));
        assert_eq!(store.course("10").expect("get").enrolled_student_ids, ["1"]);
    }

    #[test]
    fn assign_is_idempotent() {
        let mut store = sample_store();
        assert!(store.assign("i1", "10").expect("first assign"));
        assert!(!store.assign("i1", "10").expect("second assign"));
        assert_eq!(
            store.course("10").expect("get").assigned_instructor_ids,
            ["i1"]
        );
    }

    #[test]
    fn enroll_unknown_ids_fail_without_mutation() {
        let mut store = sample_store();
        assert!(matches!(
            store.enroll("missing", "10"),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.enroll("1", "missing"),
            Err(StoreError::NotFound { .. })
        ));
        assert!(store.course("10").expect("get").enrolled_student_ids.is_empty());
    }

    #[test]
    fn delete_student_cascades_out_of_courses() {
        let mut store = sample_store();
        store.add_course("11", "Physics").expect("add course");
        store.enroll("1", "10").expect("enroll 10");
        store.enroll("1", "11").expect("enroll 11");
        store.delete_student("1").expect("delete");
        assert!(store.student("1").is_err());
        assert!(store.course("10").expect("get").enrolled_student_ids.is_empty());
        assert!(store.course("11").expect("get").enrolled_student_ids.is_empty());
    }

    #[test]
    fn delete_instructor_cascades_out_of_courses() {
        let mut store = sample_store();
        store.assign("i1", "10").expect("assign");
        store.delete_instructor("i1").expect("delete");
        assert!(store.course("10").expect("get").assigned_instructor_ids.is_empty());
    }

    #[test]
    fn update_patches_only_named_fields() {
        let mut store = sample_store();
        store
            .update_student(
                "1",
                PersonPatch {
                    email: Some("ada@new.com".into()),
                    ..Default::default()
                },
            )
            .expect("update");
        let s = store.student("1").expect("get");
        assert_eq!(s.name, "Ada Lovelace");
        assert_eq!(s.email, "ada@new.com");
        assert_eq!(s.age, Some(20));
    }

    #[test]
    fn update_can_clear_age() {
        let mut store = sample_store();
        store
            .update_student(
                "1",
                PersonPatch {
                    age: Some(None),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(store.student("1").expect("get").age, None);
    }

    #[test]
    fn update_with_bad_email_leaves_record_unchanged() {
        let mut store = sample_store();
        let err = store
            .update_student(
                "1",
                PersonPatch {
                    name: Some("Renamed".into()),
                    email: Some("broken".into()),
                    ..Default::default()
                },
            )
            .expect_err("bad email");
        assert!(matches!(err, StoreError::Invalid { field: "email", .. }));
        let s = store.student("1").expect("get");
        assert_eq!(s.name, "Ada Lovelace");
        assert_eq!(s.email, "ada@x.com");
    }

    #[test]
    fn list_keeps_insertion_order() {
        let mut store = RecordStore::new();
        for (id, name) in [("b", "Beta"), ("a", "Alpha"), ("c", "Gamma")] {
            store
                .add_student(id, name, &format!("{id}@x.com"), None)
                .expect("add");
        }
        let ids: Vec<&str> = store.students().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn from_records_rejects_dangling_enrollment() {
        let course = Course {
            id: "10".into(),
            name: "Math".into(),
            enrolled_student_ids: vec!["ghost".into()],
            assigned_instructor_ids: Vec::new(),
        };
        let err = RecordStore::from_records(Vec::new(), Vec::new(), vec![course])
            .expect_err("dangling reference");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn from_records_rejects_duplicate_ids() {
        let mk = |id: &str| Student {
            id: id.into(),
            name: "X".into(),
            email: "x@x.com".into(),
            age: None,
            updated_at: None,
        };
        let err = RecordStore::from_records(vec![mk("1"), mk("1")], Vec::new(), Vec::new())
            .expect_err("duplicate id");
        assert!(matches!(err, StoreError::DuplicateId { .. }));
    }

    #[test]
    fn search_is_case_insensitive_across_types() {
        let mut store = sample_store();
        store.add_course("11", "Advanced Mathematics").expect("add");
        let hits = store.search("MATH");
        let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["Math", "Advanced Mathematics"]);
        assert!(store.search("  ").is_empty());
        let ada = store.search("ada");
        assert_eq!(ada.len(), 1);
        assert_eq!(ada[0].kind, RecordKind::Student);
    }
}
