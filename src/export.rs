use std::fmt::Write as _;
use std::path::Path;

use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub student_rows: usize,
    pub instructor_rows: usize,
    pub course_rows: usize,
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn join_ids(ids: &[String]) -> String {
    ids.join(";")
}

/// Renders the whole store as one CSV file: a `[section]` line per record
/// type, a header row, then one row per record. Association columns carry
/// `;`-delimited id lists so they stay inside a single cell. Reads the
/// store only; never mutates.
pub fn render_csv(store: &RecordStore) -> (String, ExportSummary) {
    let mut csv = String::from("[students]\nid,name,email,age,registered_course_ids\n");
    for s in store.students() {
        let registered: Vec<String> = store
            .courses()
            .iter()
            .filter(|c| c.enrolled_student_ids.iter().any(|sid| sid == &s.id))
            .map(|c| c.id.clone())
            .collect();
        let _ = writeln!(
            csv,
            "{},{},{},{},{}",
            csv_quote(&s.id),
            csv_quote(&s.name),
            csv_quote(&s.email),
            s.age.map(|a| a.to_string()).unwrap_or_default(),
            csv_quote(&join_ids(&registered)),
        );
    }

    csv.push_str("\n[instructors]\nid,name,email,age,assigned_course_ids\n");
    for i in store.instructors() {
        let assigned: Vec<String> = store
            .courses()
            .iter()
            .filter(|c| c.assigned_instructor_ids.iter().any(|iid| iid == &i.id))
            .map(|c| c.id.clone())
            .collect();
        let _ = writeln!(
            csv,
            "{},{},{},{},{}",
            csv_quote(&i.id),
            csv_quote(&i.name),
            csv_quote(&i.email),
            i.age.map(|a| a.to_string()).unwrap_or_default(),
            csv_quote(&join_ids(&assigned)),
        );
    }

    csv.push_str("\n[courses]\nid,name,assigned_instructor_ids,enrolled_student_ids\n");
    for c in store.courses() {
        let _ = writeln!(
            csv,
            "{},{},{},{}",
            csv_quote(&c.id),
            csv_quote(&c.name),
            csv_quote(&join_ids(&c.assigned_instructor_ids)),
            csv_quote(&join_ids(&c.enrolled_student_ids)),
        );
    }

    let summary = ExportSummary {
        student_rows: store.students().len(),
        instructor_rows: store.instructors().len(),
        course_rows: store.courses().len(),
    };
    (csv, summary)
}

pub fn export_csv(store: &RecordStore, path: &Path) -> Result<ExportSummary, std::io::Error> {
    let (csv, summary) = render_csv(store);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, csv)?;
    Ok(summary)
}
