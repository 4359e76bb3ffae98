use crate::{Error, StrataResult};
use std::io::{IsTerminal, Write};
use std::{fmt, path::PathBuf, str::FromStr};

/// Possible choices for output streams.
/// Used by the `-o` option of the command line driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputFile {
    #[default]
    Stdout,
    File(PathBuf),
}

impl FromStr for OutputFile {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "-" => Ok(OutputFile::Stdout),
            _ => Ok(OutputFile::File(PathBuf::from(s))),
        }
    }
}

impl fmt::Display for OutputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFile::Stdout => write!(f, "-"),
            OutputFile::File(p) => write!(f, "{}", p.display()),
        }
    }
}

impl OutputFile {
    pub fn isatty(&self) -> bool {
        match self {
            OutputFile::Stdout => std::io::stdout().is_terminal(),
            OutputFile::File(_) => false,
        }
    }

    pub fn get_write(&self) -> StrataResult<Box<dyn Write>> {
        match self {
            OutputFile::Stdout => Ok(Box::new(std::io::stdout())),
            OutputFile::File(path) => {
                let file = std::fs::File::create(path).map_err(|err| {
                    Error::write_error(format!(
                        "cannot create {}: {err}",
                        path.display()
                    ))
                })?;
                Ok(Box::new(file))
            }
        }
    }
}
