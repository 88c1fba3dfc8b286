use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::debug;

use crate::config::OutputOptions;
use crate::error::CollectorError;
use crate::format_csv::write_csv_to_writer;
use crate::run::ResultWriter;

/// Length of the random suffix that keeps output names unique.
pub const SUFFIX_LEN: usize = 4;

/// Fresh suffixes tried before giving up on a name that already exists.
const NAME_ATTEMPTS: usize = 5;

/// Print error to stderr as `error: <category>: <message>`.
pub fn print_error(err: &CollectorError) {
    eprintln!("error: {}", err);
}

/// Build the output file name.
///
/// With `append_timestamp`, `<stem>_<YYYY-MM-DD_HHMMSS>_<suffix><ext>`; `.csv` is appended
/// whenever the result does not already end in it.
pub fn output_file_name(
    base: &str,
    append_timestamp: bool,
    now: DateTime<Local>,
    suffix: &str,
) -> String {
    let mut name = if append_timestamp {
        let base_path = Path::new(base);
        let stem = base_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = base_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let file = format!("{}_{}_{}{}", stem, now.format("%Y-%m-%d_%H%M%S"), suffix, ext);
        match base_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.join(file).to_string_lossy().into_owned(),
            None => file,
        }
    } else {
        base.to_string()
    };

    if Path::new(&name).extension().and_then(|e| e.to_str()) != Some("csv") {
        name.push_str(".csv");
    }
    name
}

/// Random alphanumeric suffix for output names.
pub fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Writes the merged result set to a uniquely named CSV file.
#[derive(Debug, Clone)]
pub struct CsvFileWriter {
    options: OutputOptions,
}

impl CsvFileWriter {
    pub fn new(options: OutputOptions) -> Self {
        Self { options }
    }

    /// Create a file that did not exist before. Never truncates an existing file; a taken
    /// timestamped name is retried with a fresh suffix.
    fn create_output_file(&self, dir: &Path) -> Result<(PathBuf, File), CollectorError> {
        let attempts = if self.options.append_timestamp {
            NAME_ATTEMPTS
        } else {
            1
        };

        let mut taken = None;
        for _ in 0..attempts {
            let name = output_file_name(
                &self.options.file_name,
                self.options.append_timestamp,
                Local::now(),
                &random_suffix(SUFFIX_LEN),
            );
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "output file already exists");
                    taken = Some((path, e));
                }
                Err(e) => return Err(create_error(&path, &e)),
            }
        }

        Err(match taken {
            Some((path, e)) => create_error(&path, &e),
            None => CollectorError::Write {
                message: "no output file name could be chosen".to_string(),
            },
        })
    }
}

fn create_error(path: &Path, e: &io::Error) -> CollectorError {
    CollectorError::Write {
        message: format!("cannot create CSV file {}: {}", path.display(), e),
    }
}

impl ResultWriter for CsvFileWriter {
    fn write(
        &self,
        columns: &[String],
        rows: &[Vec<String>],
    ) -> Result<Option<PathBuf>, CollectorError> {
        if columns.is_empty() && rows.is_empty() {
            return Ok(None);
        }

        let dir = &self.options.directory;
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(|e| CollectorError::Write {
                message: format!("cannot create output directory {}: {}", dir.display(), e),
            })?;
        }

        let (path, file) = self.create_output_file(dir)?;
        write_csv_to_writer(columns, rows, self.options.delimiter, BufWriter::new(file))?;

        Ok(Some(path))
    }
}
