use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use tapattend_session::{MemoryRoster, RosterError, RosterRow};
use tracing::{info, warn};

/// Header row expected in roster files; data starts on row 2.
pub const ROSTER_HEADER: [&str; 4] = ["First Name", "Last Name", "CIN", "Major"];

/// Spreadsheet extensions read from the first worksheet.
const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// Load a roster from CSV or a spreadsheet workbook.
///
/// Columns are positional: first name, last name, CIN, major.
pub fn load_roster(path: &Path) -> Result<MemoryRoster, RosterError> {
    let is_workbook = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        });
    let rows = if is_workbook {
        load_workbook(path)?
    } else {
        load_csv(path)?
    };
    info!(path = %path.display(), rows = rows.len(), "loaded roster");
    Ok(MemoryRoster::new(rows))
}

fn load_workbook(path: &Path) -> Result<Vec<RosterRow>, RosterError> {
    let unavailable =
        |err: calamine::Error| RosterError::Unavailable(format!("{}: {err}", path.display()));
    let mut workbook = open_workbook_auto(path).map_err(unavailable)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| RosterError::Unavailable(format!("{}: no worksheets", path.display())))?
        .map_err(unavailable)?;
    Ok(sheet_rows(&range))
}

/// Rows after the header. Spreadsheets store CINs as numbers, so whole
/// floats are written without a fractional part.
fn sheet_rows(range: &Range<Data>) -> Vec<RosterRow> {
    range
        .rows()
        .skip(1)
        .map(|row| {
            let cell = |i: usize| match row.get(i) {
                None | Some(Data::Empty) => String::new(),
                Some(Data::String(s)) => s.trim().to_string(),
                Some(Data::Float(f)) if f.fract() == 0.0 => format!("{f:.0}"),
                Some(other) => other.to_string().trim().to_string(),
            };
            RosterRow {
                first_name: cell(0),
                last_name: cell(1),
                identifier: cell(2),
                major: cell(3),
            }
        })
        .collect()
}

fn load_csv(path: &Path) -> Result<Vec<RosterRow>, RosterError> {
    let unavailable =
        |err: csv::Error| RosterError::Unavailable(format!("{}: {err}", path.display()));

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(unavailable)?;

    let headers = reader.headers().map_err(unavailable)?;
    if !headers.iter().eq(ROSTER_HEADER) {
        warn!(
            path = %path.display(),
            found = ?headers,
            "unexpected roster header, reading columns by position"
        );
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(unavailable)?;
        let cell = |i: usize| record.get(i).unwrap_or_default().to_string();
        rows.push(RosterRow {
            first_name: cell(0),
            last_name: cell(1),
            identifier: cell(2),
            major: cell(3),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use tapattend_session::Roster;

    use super::*;

    fn write_roster(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("roster.csv");
        std::fs::write(&path, format!("{}\n{body}", ROSTER_HEADER.join(","))).unwrap();
        path
    }

    #[test]
    fn rows_are_numbered_from_two() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_roster(
            dir.path(),
            "Ada,Lovelace,305123456,Mathematics\nAlan, Turing ,305000001,Computer Science\n",
        );
        let roster = load_roster(&path).unwrap();

        let alan = roster.row(3).unwrap();
        assert_eq!(alan.last_name, "Turing");
        assert_eq!(alan.identifier, "305000001");
        assert_eq!(roster.find("305123456"), Some(2));
        assert!(matches!(
            roster.row(4),
            Err(RosterError::OutOfRange { row: 4, last: 3 })
        ));
    }

    #[test]
    fn short_row_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_roster(dir.path(), "Grace,Hopper\n");
        let roster = load_roster(&path).unwrap();
        assert!(matches!(
            roster.row(2),
            Err(RosterError::Incomplete { row: 2 })
        ));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_roster(&dir.path().join("nope.csv")),
            Err(RosterError::Unavailable(_))
        ));
        assert!(matches!(
            load_roster(&dir.path().join("nope.xlsx")),
            Err(RosterError::Unavailable(_))
        ));
    }

    #[test]
    fn workbook_extension_is_not_parsed_as_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.XLSX");
        let text = format!("{}\nAda,Lovelace,1,Math\n", ROSTER_HEADER.join(","));
        std::fs::write(&path, text).unwrap();
        assert!(matches!(load_roster(&path), Err(RosterError::Unavailable(_))));
    }

    #[test]
    fn sheet_rows_are_positional_after_header() {
        let mut range = Range::new((0, 0), (2, 3));
        for (col, title) in ROSTER_HEADER.iter().enumerate() {
            range.set_value((0, col as u32), Data::String(title.to_string()));
        }
        range.set_value((1, 0), Data::String(" Ada ".into()));
        range.set_value((1, 1), Data::String("Lovelace".into()));
        range.set_value((1, 2), Data::Float(305123456.0));
        range.set_value((1, 3), Data::String("Mathematics".into()));
        range.set_value((2, 0), Data::String("Grace".into()));
        range.set_value((2, 2), Data::Int(777));

        let roster = MemoryRoster::new(sheet_rows(&range));
        let ada = roster.row(2).unwrap();
        assert_eq!(ada.first_name, "Ada");
        assert_eq!(ada.identifier, "305123456");
        assert_eq!(roster.find("777"), Some(3));
        assert!(matches!(
            roster.row(3),
            Err(RosterError::Incomplete { row: 3 })
        ));
    }
}
