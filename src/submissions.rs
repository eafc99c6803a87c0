use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use calamine::{open_workbook, Data as XlsData, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use teloxide::types::UserId;

use crate::impls::file_safe;

const MAX_SHEET_NAME: usize = 31;
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];
const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DURATION_FORMAT: &str = "[h]:mm:ss";

/// User `.xlsx` submissions, `<root>/<user id>/<category>.xlsx`.
#[derive(Debug, Clone)]
pub struct SubmissionBox {
    root: PathBuf,
}

impl SubmissionBox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, user_id: UserId, category: &str) -> PathBuf {
        self.root.join(user_id.0.to_string()).join(file_safe(&format!("{}.xlsx", category)))
    }

    /// Creates the user directory and drops the previous submission for the category.
    pub fn prepare(&self, user_id: UserId, category: &str) -> anyhow::Result<PathBuf> {
        let path = self.path_for(user_id, category);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
        }
        match fs::remove_file(&path) {
            Ok(()) => log::info!("replacing existing file for user {} in category '{}'", user_id.0, category),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("cannot remove {}", path.display())),
        }
        Ok(path)
    }

    /// Saves a submission, replacing the user's previous file for the category.
    pub fn store(&self, user_id: UserId, category: &str, content: &[u8]) -> anyhow::Result<PathBuf> {
        let path = self.prepare(user_id, category)?;
        fs::write(&path, content).with_context(|| format!("cannot write {}", path.display()))?;
        Ok(path)
    }

    /// Every user's file for the category.
    pub fn files_for(&self, category: &str) -> anyhow::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("cannot list {}", self.root.display())),
        };
        let name = file_safe(&format!("{}.xlsx", category));
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let file = entry.path().join(&name);
                if file.is_file() {
                    files.push(file);
                }
            }
        }
        files.sort();
        Ok(files)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel serial date, days since 1899-12-30 with the time of day as the fraction.
    DateTime(f64),
    /// Excel serial duration in days.
    Duration(f64),
}

impl Cell {
    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.is_empty(),
            _ => false,
        }
    }
}

impl From<&XlsData> for Cell {
    fn from(value: &XlsData) -> Self {
        match value {
            XlsData::Empty => Cell::Empty,
            XlsData::String(s) => Cell::Text(s.clone()),
            XlsData::Float(f) => Cell::Number(*f),
            XlsData::Int(i) => Cell::Number(*i as f64),
            XlsData::Bool(b) => Cell::Bool(*b),
            XlsData::DateTime(dt) if dt.is_duration() => Cell::Duration(dt.as_f64()),
            XlsData::DateTime(dt) => Cell::DateTime(dt.as_f64()),
            // iso dates and errors are kept as the text the sheet shows
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Rows of one sheet, addressed from `A1` even when the sheet starts further down.
fn read_rows(path: &Path) -> anyhow::Result<Vec<Vec<Cell>>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no sheets"))??;
    let Some((top, left)) = range.start() else {
        return Ok(Vec::new());
    };
    let mut rows = vec![Vec::new(); top as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; left as usize];
        cells.extend(row.iter().map(Cell::from));
        rows.push(cells);
    }
    Ok(rows)
}

/// All submissions of one category squashed into a single sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub header: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

impl Merged {
    /// Takes the header from the first file that has one and every non-empty row
    /// below the header from each file. Unreadable files are skipped. `None` if no
    /// data row was found.
    pub fn from_files(files: &[PathBuf]) -> Option<Self> {
        let mut header: Option<Vec<Cell>> = None;
        let mut rows = Vec::new();
        for file in files {
            let file_rows = match read_rows(file) {
                Ok(file_rows) => file_rows,
                Err(e) => {
                    log::error!("could not process file {}: {:#}", file.display(), e);
                    continue;
                }
            };
            let mut file_rows = file_rows.into_iter();
            let first = file_rows.next();
            if header.is_none() {
                let cells: Vec<Cell> = first.into_iter().flatten().filter(|c| !c.is_empty()).collect();
                if !cells.is_empty() {
                    header = Some(cells);
                }
            }
            rows.extend(file_rows.filter(|row| row.iter().any(|c| !c.is_empty())));
        }
        if rows.is_empty() {
            return None;
        }
        Some(Self { header: header.unwrap_or_default(), rows })
    }

    pub fn save(&self, sheet: &str, path: &Path) -> anyhow::Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(sheet))?;
        let date = Format::new().set_num_format(DATE_FORMAT);
        let datetime = Format::new().set_num_format(DATETIME_FORMAT);
        let duration = Format::new().set_num_format(DURATION_FORMAT);
        let header = (!self.header.is_empty()).then_some(&self.header);
        for (row, cells) in header.into_iter().chain(self.rows.iter()).enumerate() {
            let row = u32::try_from(row)?;
            for (col, cell) in cells.iter().enumerate() {
                let col = u16::try_from(col)?;
                match cell {
                    Cell::Empty => {}
                    Cell::Text(text) => {
                        worksheet.write_string(row, col, text)?;
                    }
                    Cell::Number(number) => {
                        worksheet.write_number(row, col, *number)?;
                    }
                    Cell::Bool(value) => {
                        worksheet.write_boolean(row, col, *value)?;
                    }
                    Cell::DateTime(serial) => {
                        let format = if serial.fract() == 0.0 { &date } else { &datetime };
                        worksheet.write_number_with_format(row, col, *serial, format)?;
                    }
                    Cell::Duration(serial) => {
                        worksheet.write_number_with_format(row, col, *serial, &duration)?;
                    }
                }
            }
        }
        workbook.save(path)?;
        Ok(())
    }
}

fn sheet_name(category: &str) -> String {
    let name: String = category
        .chars()
        .filter(|c| !FORBIDDEN_SHEET_CHARS.contains(c))
        .take(MAX_SHEET_NAME)
        .collect();
    let name = name.trim_matches('\'').trim().to_owned();
    if name.is_empty() {
        "Report".to_owned()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sheet(path: &Path, rows: &[&[&str]]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save(path).unwrap();
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.into())
    }

    #[test]
    fn files_are_found_per_category() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = SubmissionBox::new(dir.path());
        let a = inbox.prepare(UserId(1), "Netflix").unwrap();
        let b = inbox.prepare(UserId(2), "Netflix").unwrap();
        let c = inbox.prepare(UserId(2), "Hulu").unwrap();
        for path in [&a, &b, &c] {
            fs::write(path, b"x").unwrap();
        }
        assert_eq!(inbox.files_for("Netflix").unwrap(), vec![a.clone(), b]);
        assert_eq!(inbox.files_for("Hulu").unwrap(), vec![c]);
        assert!(inbox.files_for("Gmail").unwrap().is_empty());

        // a new submission replaces the old one
        inbox.prepare(UserId(1), "Netflix").unwrap();
        assert!(!a.exists());
        inbox.store(UserId(1), "Netflix", b"y").unwrap();
        assert_eq!(fs::read(&a).unwrap(), b"y");
    }

    #[test]
    fn missing_root_means_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let inbox = SubmissionBox::new(dir.path().join("nothing"));
        assert!(inbox.files_for("Netflix").unwrap().is_empty());
    }

    #[test]
    fn merge_keeps_one_header_and_all_data_rows() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("1.xlsx");
        let second = dir.path().join("2.xlsx");
        let broken = dir.path().join("3.xlsx");
        write_sheet(&first, &[&["Email", "Password"], &["a@x.com", "pa"], &["", ""], &["b@x.com", "pb"]]);
        write_sheet(&second, &[&["Mail", "Pass"], &["c@x.com", "pc"]]);
        fs::write(&broken, b"not a workbook").unwrap();

        let merged = Merged::from_files(&[first, broken, second]).unwrap();
        assert_eq!(merged.header, vec![text("Email"), text("Password")]);
        assert_eq!(
            merged.rows,
            vec![
                vec![text("a@x.com"), text("pa")],
                vec![text("b@x.com"), text("pb")],
                vec![text("c@x.com"), text("pc")],
            ]
        );

        let out = dir.path().join("Netflix_Report.xlsx");
        merged.save("Netflix", &out).unwrap();
        let mut workbook: Xlsx<_> = open_workbook(&out).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Netflix".to_owned()]);
        assert_eq!(read_rows(&out).unwrap().len(), 4);
    }

    #[test]
    fn merge_keeps_date_cells() {
        // 2024-05-01 and 2024-05-01 12:00
        let (day, noon) = (45413.0, 45413.5);
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("1.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Email").unwrap();
        sheet.write_string(0, 1, "Created").unwrap();
        sheet.write_string(0, 2, "Updated").unwrap();
        sheet.write_string(1, 0, "a@x.com").unwrap();
        sheet.write_number_with_format(1, 1, day, &Format::new().set_num_format(DATE_FORMAT)).unwrap();
        sheet.write_number_with_format(1, 2, noon, &Format::new().set_num_format(DATETIME_FORMAT)).unwrap();
        workbook.save(&file).unwrap();

        let merged = Merged::from_files(&[file]).unwrap();
        let expected = vec![text("a@x.com"), Cell::DateTime(day), Cell::DateTime(noon)];
        assert_eq!(merged.rows, vec![expected.clone()]);

        let out = dir.path().join("Report.xlsx");
        merged.save("Report", &out).unwrap();
        assert_eq!(read_rows(&out).unwrap()[1], expected);
    }

    #[test]
    fn header_only_files_produce_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let only_header = dir.path().join("1.xlsx");
        write_sheet(&only_header, &[&["Email", "Password"]]);
        assert!(Merged::from_files(&[only_header]).is_none());
        assert!(Merged::from_files(&[]).is_none());
    }

    #[test]
    fn leading_empty_cells_keep_their_position() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("1.xlsx");
        write_sheet(&file, &[&["", "Name"], &["", "Rafi"]]);
        let merged = Merged::from_files(&[file]).unwrap();
        assert_eq!(merged.header, vec![text("Name")]);
        assert_eq!(merged.rows, vec![vec![Cell::Empty, text("Rafi")]]);
    }

    #[test]
    fn sheet_names_are_made_valid() {
        assert_eq!(sheet_name("Net/flix:[1]"), "Netflix1");
        assert_eq!(sheet_name("???"), "Report");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), MAX_SHEET_NAME);
    }
}
