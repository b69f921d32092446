//! Where spectra come from.
//!
//! The analysis pipeline only sees a `SpectrumSource`; files, directories and
//! in-memory spectra (tests, `csp demo`) all implement it.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AxisMapping, RunWarning, Spectrum};
use crate::error::AppError;
use crate::io::peaks::read_peak_list;

/// Default peak-list file extension for directory discovery.
pub const DEFAULT_PEAK_EXTENSION: &str = "list";

/// Ordered spectra plus any ingest warnings.
#[derive(Debug, Clone, Default)]
pub struct SpectraBatch {
    pub spectra: Vec<Spectrum>,
    pub warnings: Vec<RunWarning>,
}

pub trait SpectrumSource {
    /// Short human-readable description for reports.
    fn describe(&self) -> String;

    /// Load all spectra, in titration order.
    fn spectra(&self) -> Result<SpectraBatch, AppError>;
}

/// Explicit list of peak-list files, used in the order given.
#[derive(Debug, Clone)]
pub struct FileSource {
    paths: Vec<PathBuf>,
    axes: AxisMapping,
}

impl FileSource {
    pub fn new(paths: Vec<PathBuf>, axes: AxisMapping) -> Self {
        Self { paths, axes }
    }
}

impl SpectrumSource for FileSource {
    fn describe(&self) -> String {
        match self.paths.as_slice() {
            [one] => one.display().to_string(),
            paths => format!("{} peak lists", paths.len()),
        }
    }

    fn spectra(&self) -> Result<SpectraBatch, AppError> {
        if self.paths.is_empty() {
            return Err(AppError::input("No peak-list files given."));
        }
        load_paths(&self.paths, self.axes)
    }
}

/// Every peak-list file in one directory, in natural file-name order
/// (`t2.list` before `t10.list`).
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    extension: String,
    axes: AxisMapping,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>, axes: AxisMapping) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
            axes,
        }
    }

    pub fn files(&self) -> Result<Vec<PathBuf>, AppError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            AppError::input(format!(
                "Failed to read directory '{}': {e}",
                self.dir.display()
            ))
        })?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && has_extension(p, &self.extension))
            .collect();
        files.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
        Ok(files)
    }
}

impl SpectrumSource for DirectorySource {
    fn describe(&self) -> String {
        format!("{}/*.{}", self.dir.display(), self.extension)
    }

    fn spectra(&self) -> Result<SpectraBatch, AppError> {
        let files = self.files()?;
        if files.is_empty() {
            return Err(AppError::input(format!(
                "No *.{} files found in '{}'.",
                self.extension,
                self.dir.display()
            )));
        }
        load_paths(&files, self.axes)
    }
}

/// Spectra already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    label: String,
    spectra: Vec<Spectrum>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>, spectra: Vec<Spectrum>) -> Self {
        Self {
            label: label.into(),
            spectra,
        }
    }
}

impl SpectrumSource for MemorySource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn spectra(&self) -> Result<SpectraBatch, AppError> {
        Ok(SpectraBatch {
            spectra: self.spectra.clone(),
            warnings: Vec::new(),
        })
    }
}

fn load_paths(paths: &[PathBuf], axes: AxisMapping) -> Result<SpectraBatch, AppError> {
    let mut batch = SpectraBatch::default();
    for path in paths {
        let (spectrum, warnings) = read_peak_list(path, axes)?;
        log::info!("loaded {} ({} peaks)", path.display(), spectrum.peaks.len());
        batch.spectra.push(spectrum);
        batch.warnings.extend(warnings);
    }
    Ok(batch)
}

pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        == Some(true)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string()
}

/// Compare strings treating runs of ASCII digits as numbers.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) if ca.is_ascii_digit() && cb.is_ascii_digit() => {
                let na = take_digits(&mut a);
                let nb = take_digits(&mut b);
                let ord = na
                    .trim_start_matches('0')
                    .len()
                    .cmp(&nb.trim_start_matches('0').len())
                    .then_with(|| na.trim_start_matches('0').cmp(nb.trim_start_matches('0')))
                    .then_with(|| na.len().cmp(&nb.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(ca), Some(cb)) => {
                if ca != cb {
                    return ca.cmp(&cb);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(it: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut s = String::new();
    while let Some(c) = it.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        s.push(c);
        it.next();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("csp-source-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn natural_order_sorts_numbers_by_value() {
        let mut names = vec!["t10.list", "t2.list", "t1.list", "t02.list"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["t1.list", "t2.list", "t02.list", "t10.list"]);
    }

    #[test]
    fn directory_source_loads_in_natural_order() {
        let dir = temp_dir("dir");
        fs::write(dir.join("t10.list"), "hdr\n1 1.0 2.0 0 0\n").unwrap();
        fs::write(dir.join("t2.list"), "hdr\n1 1.0 2.0 0 0\nbroken\n").unwrap();
        fs::write(dir.join("t1.list"), "hdr\n1 1.0 2.0 0 0\n# A\n").unwrap();
        fs::write(dir.join("notes.txt"), "not a peak list").unwrap();

        let source = DirectorySource::new(&dir, DEFAULT_PEAK_EXTENSION, AxisMapping::Ab);
        let batch = source.spectra().unwrap();
        let names: Vec<&str> = batch.spectra.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["t1", "t2", "t10"]);
        assert!(batch.spectra[0].is_labeled());
        assert_eq!(batch.warnings.len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_directory_is_an_input_error() {
        let dir = temp_dir("empty");
        let err = DirectorySource::new(&dir, "list", AxisMapping::Ab).spectra().unwrap_err();
        assert_eq!(err.exit_code(), 2);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let source = FileSource::new(vec![PathBuf::from("/nonexistent/t0.list")], AxisMapping::Ab);
        assert!(source.spectra().unwrap_err().to_string().contains("t0.list"));
    }
}
