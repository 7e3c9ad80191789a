//! Interactive input picker.
//!
//! Kept apart from clap parsing: clap handles flags, the picker handles the
//! "run `fundrate` and choose a workbook" flow.
//!
//! The picker searches for workbooks (`.xlsx`, `.xlsm`, `.xls`, `.xlsb`,
//! `.ods`) and `.csv` files under the current working directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Default directory recursion depth for finding input files.
const DEFAULT_SEARCH_DEPTH: usize = 4;

const INPUT_EXTENSIONS: [&str; 6] = ["xlsx", "xlsm", "xls", "xlsb", "ods", "csv"];

/// Prompt the user to select an input file from the current directory tree.
///
/// - a number picks from the list, anything else is taken as a path
/// - `q` cancels
pub fn prompt_for_input_path() -> Result<PathBuf, AppError> {
    let files = discover_input_files();
    if files.is_empty() {
        return Err(AppError::new(
            2,
            "No workbook or CSV files found. Provide one with `fundrate report -f <file>` or use --demo.",
        ));
    }

    println!("Found {} input file(s):", files.len());
    for (idx, path) in files.iter().enumerate() {
        println!("{:>3}) {}", idx + 1, pretty_path(path));
    }

    loop {
        print!("Select a file by number (1-{}) or type a path (q to quit): ", files.len());
        io::stdout()
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to write prompt: {e}")))?;

        let mut input = String::new();
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::new(2, format!("Failed to read input: {e}")))?;

        if bytes == 0 {
            return Err(AppError::new(
                2,
                "No input received. Provide a file with `fundrate report -f <file>`.",
            ));
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Err(AppError::new(2, "Canceled."));
        }

        if let Ok(choice) = input.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_input_path(&files[choice - 1]);
            }
            println!("Invalid choice: {choice}. Enter a number between 1 and {}.", files.len());
            continue;
        }

        match validate_input_path(Path::new(input)) {
            Ok(path) => return Ok(path),
            Err(err) => println!("{err}"),
        }
    }
}

/// Validate the path points to an existing workbook or CSV file.
pub fn validate_input_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::new(2, format!("Input file not found: {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::new(
            2,
            format!("Expected a file, got a directory: {}", path.display()),
        ));
    }
    if !has_input_extension(path) {
        return Err(AppError::new(
            2,
            format!(
                "Expected a workbook or .csv file (got: {}). Supported: {}.",
                path.display(),
                INPUT_EXTENSIONS.join(", ")
            ),
        ));
    }

    Ok(path.to_path_buf())
}

/// Discover input files under the current directory (deterministic order).
pub fn discover_input_files() -> Vec<PathBuf> {
    find_input_files(Path::new("."), DEFAULT_SEARCH_DEPTH)
}

fn find_input_files(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut out = Vec::new();
    find_input_files_inner(root, 0, max_depth, &mut out);
    out.sort_by(|a, b| pretty_path(a).cmp(&pretty_path(b)));
    out
}

fn find_input_files_inner(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if !should_skip_dir(&path) {
                find_input_files_inner(&path, depth + 1, max_depth, out);
            }
            continue;
        }

        // Excel lock files (`~$rates.xlsx`) are not workbooks.
        let lock_file = path
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.starts_with("~$"));

        if file_type.is_file() && has_input_extension(&path) && !lock_file {
            out.push(path);
        }
    }
}

fn has_input_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| INPUT_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules" | "examples")
}

fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_workbooks_and_csv_but_not_lock_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("rates.xlsx"), b"").unwrap();
        fs::write(dir.path().join("~$rates.xlsx"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("R.CSV"), b"").unwrap();

        let found = find_input_files(dir.path(), 2);
        let names: Vec<String> = found
            .iter()
            .filter_map(|p| p.file_name().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"rates.xlsx".to_string()));
        assert!(names.contains(&"R.CSV".to_string()));
    }

    #[test]
    fn validation_rejects_directories_and_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(validate_input_path(dir.path()).unwrap_err().exit_code(), 2);

        let txt = dir.path().join("notes.txt");
        fs::write(&txt, b"").unwrap();
        assert!(validate_input_path(&txt).is_err());

        let ods = dir.path().join("rates.ods");
        fs::write(&ods, b"").unwrap();
        assert_eq!(validate_input_path(&ods).unwrap(), ods);
    }
}
