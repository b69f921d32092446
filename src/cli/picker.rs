//! Interactive input selection.
//!
//! Kept separate from clap parsing:
//! - clap handles structured flags/subcommands
//! - the picker provides the "run `csp fit` and choose a titration" UX
//!
//! The picker lists directories under the current working directory that
//! contain peak-list files, then asks for concentrations if none were given.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::io::parse_concentration_list;
use crate::io::source::has_extension;

/// Default directory recursion depth when looking for titrations.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Prompt the user to pick a directory of peak lists.
///
/// Behavior:
/// - list discovered directories with their file counts
/// - accept either a number (from the list) or an explicit path
/// - `q` or end of input cancels
pub fn prompt_for_titration_dir(extension: &str) -> Result<PathBuf, AppError> {
    let dirs = discover_titration_dirs(Path::new("."), extension, DEFAULT_SEARCH_DEPTH);
    if dirs.is_empty() {
        return Err(AppError::source_unavailable(format!(
            "No directories with *.{extension} files found. Pass peak lists with `csp fit <files>` or `--dir`."
        )));
    }

    println!("Found {} titration director{}:", dirs.len(), if dirs.len() == 1 { "y" } else { "ies" });
    for (idx, (path, count)) in dirs.iter().enumerate() {
        println!("{:>3}) {} ({count} spectra)", idx + 1, pretty_path(path));
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        let answer = prompt_line(
            &mut input,
            &format!("Select a directory by number (1-{}) or type a path (q to quit): ", dirs.len()),
        )?;

        if let Ok(choice) = answer.parse::<usize>() {
            if (1..=dirs.len()).contains(&choice) {
                return Ok(dirs[choice - 1].0.clone());
            }
            println!("Invalid choice: {choice}. Enter a number between 1 and {}.", dirs.len());
            continue;
        }

        let candidate = PathBuf::from(&answer);
        if candidate.is_dir() {
            return Ok(candidate);
        }
        println!("Not a directory: {}", candidate.display());
    }
}

/// Prompt for host and guest concentration lists, one line each.
pub fn prompt_for_concentrations(n_spectra: usize) -> Result<(Vec<f64>, Vec<f64>), AppError> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    println!("Enter {n_spectra} comma-separated values per line (q to quit).");
    let host = prompt_list(&mut input, "host")?;
    let guest = prompt_list(&mut input, "guest")?;
    Ok((host, guest))
}

fn prompt_list<R: BufRead>(input: &mut R, what: &str) -> Result<Vec<f64>, AppError> {
    loop {
        let answer = prompt_line(input, &format!("{what} concentrations: "))?;
        match parse_concentration_list(what, &answer) {
            Ok(values) if !values.is_empty() => return Ok(values),
            Ok(_) => println!("Enter at least one value."),
            Err(err) => println!("{err}"),
        }
    }
}

fn prompt_line<R: BufRead>(input: &mut R, prompt: &str) -> Result<String, AppError> {
    print!("{prompt}");
    io::stdout()
        .flush()
        .map_err(|e| AppError::input(format!("Failed to write prompt: {e}")))?;

    let mut line = String::new();
    let bytes = input
        .read_line(&mut line)
        .map_err(|e| AppError::input(format!("Failed to read input: {e}")))?;
    if bytes == 0 {
        return Err(AppError::source_unavailable("No input received."));
    }

    let line = line.trim();
    if line.eq_ignore_ascii_case("q") {
        return Err(AppError::source_unavailable("Canceled."));
    }
    Ok(line.to_string())
}

/// Directories (deterministic order) holding at least one `*.{extension}` file.
pub fn discover_titration_dirs(root: &Path, extension: &str, max_depth: usize) -> Vec<(PathBuf, usize)> {
    let mut out = Vec::new();
    discover_inner(root, extension, 0, max_depth, &mut out);
    out.sort_by(|a, b| pretty_path(&a.0).cmp(&pretty_path(&b.0)));
    out
}

fn discover_inner(root: &Path, extension: &str, depth: usize, max_depth: usize, out: &mut Vec<(PathBuf, usize)>) {
    if depth > max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    let mut count = 0usize;
    for entry in entries.flatten() {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(_) => continue,
        };

        if file_type.is_dir() {
            if should_skip_dir(&path) {
                continue;
            }
            discover_inner(&path, extension, depth + 1, max_depth, out);
            continue;
        }

        if file_type.is_file() && has_extension(&path, extension) {
            count += 1;
        }
    }

    if count > 0 {
        out.push((root.to_path_buf(), count));
    }
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules")
}

fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_and_eof_cancel_the_prompt() {
        let err = prompt_line(&mut "q\n".as_bytes(), "> ").unwrap_err();
        assert!(err.is_source_unavailable());
        let err = prompt_line(&mut "".as_bytes(), "> ").unwrap_err();
        assert!(err.is_source_unavailable());
    }

    #[test]
    fn list_prompt_retries_until_valid() {
        let mut input = "abc\n\n1e-3, 2e-3\n".as_bytes();
        let values = prompt_list(&mut input, "guest").unwrap();
        assert_eq!(values, vec![1e-3, 2e-3]);
    }

    #[test]
    fn discovers_directories_with_peak_lists() {
        let root = std::env::temp_dir().join(format!("csp-picker-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("run1")).unwrap();
        fs::create_dir_all(root.join("target")).unwrap();
        fs::write(root.join("run1/t0.list"), "hdr\n").unwrap();
        fs::write(root.join("run1/t1.list"), "hdr\n").unwrap();
        fs::write(root.join("target/t0.list"), "hdr\n").unwrap();

        let dirs = discover_titration_dirs(&root, "list", 2);
        assert_eq!(dirs.len(), 1);
        assert!(dirs[0].0.ends_with("run1"));
        assert_eq!(dirs[0].1, 2);

        let _ = fs::remove_dir_all(&root);
    }
}
