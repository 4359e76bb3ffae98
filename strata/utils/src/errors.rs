//! Errors generated by the compiler.
use crate::{GPosIdx, Id, WithPos};

/// Convience wrapper to represent success or meaningul compiler error.
pub type StrataResult<T> = std::result::Result<T, Error>;

/// Classification of everything that can go wrong while compiling or calling
/// a stencil.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The definition is malformed.
    #[error("Grammar error: {0}")]
    Grammar(String),
    /// Vertical ranges overlap, are empty, or are listed out of order.
    #[error("Interval error: {0}")]
    Interval(String),
    /// A self-reference reads planes that are not computed yet.
    #[error("Ordering error: {0}")]
    Ordering(String),
    /// A declared external has no value.
    #[error("External resolution error: `{0}' has no value")]
    ExternalResolution(Id),
    /// A backend failed to lower the program.
    #[error("Backend compilation error: {0}")]
    BackendCompilation(String),
    /// The buffers or domain passed at call time do not fit the stencil.
    #[error("Domain mismatch: {0}")]
    DomainMismatch(String),
    /// The compilation cache broke one of its invariants.
    #[error("Cache consistency error: {0}")]
    CacheConsistency(String),
    /// Failed to read an input file.
    #[error("Invalid file: {0}")]
    InvalidFile(String),
    /// Failed to write the output.
    #[error("Failed to write output: {0}")]
    WriteError(String),
    /// Anything else.
    #[error("{0}")]
    Misc(String),
}

/// Standard error type for Strata errors.
#[derive(Clone)]
pub struct Error {
    kind: Box<ErrorKind>,
    pos: GPosIdx,
    post_msg: Option<String>,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.pos == GPosIdx::UNKNOWN {
            write!(f, "{}", self.kind)?
        } else {
            write!(f, "{}", self.pos.format(self.kind.to_string()))?
        }
        if let Some(post) = &self.post_msg {
            write!(f, "\n{}", post)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
            pos: GPosIdx::UNKNOWN,
            post_msg: None,
        }
    }

    /// Attach the position of `pos` to this error.
    pub fn with_pos<T: WithPos>(mut self, pos: &T) -> Self {
        self.pos = pos.copy_span();
        self
    }

    /// Attach a message that is printed after the main error message.
    pub fn with_post_msg(mut self, msg: Option<String>) -> Self {
        self.post_msg = msg;
        self
    }

    pub fn grammar<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Grammar(msg.to_string()))
    }
    pub fn interval<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Interval(msg.to_string()))
    }
    pub fn ordering<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Ordering(msg.to_string()))
    }
    pub fn unresolved_external(name: Id) -> Self {
        Self::new(ErrorKind::ExternalResolution(name))
    }
    pub fn backend<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::BackendCompilation(msg.to_string()))
    }
    pub fn domain_mismatch<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::DomainMismatch(msg.to_string()))
    }
    pub fn cache_consistency<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::CacheConsistency(msg.to_string()))
    }
    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::InvalidFile(msg.to_string()))
    }
    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::WriteError(msg.to_string()))
    }
    pub fn misc<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Misc(msg.to_string()))
    }

    /// Shorthand for a grammar error about `name` already being bound.
    pub fn already_bound<S: ToString>(name: Id, bound_by: S) -> Self {
        Self::grammar(format!(
            "Name `{name}' already bound by {}",
            bound_by.to_string()
        ))
    }

    /// Shorthand for a grammar error about an undefined `name`.
    pub fn undefined<S: ToString>(name: Id, typ: S) -> Self {
        Self::grammar(format!("Undefined {} name: {name}", typ.to_string()))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The message of this error without position information.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn location(&self) -> Option<(String, usize, usize)> {
        self.pos.into_option().map(|p| p.get_location())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::invalid_file(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::write_error(format!("IO Error: {}", err))
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::write_error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_preserved() {
        let err = Error::ordering("field `x' in block 0");
        assert!(matches!(err.kind(), ErrorKind::Ordering(_)));
        assert_eq!(err.message(), "Ordering error: field `x' in block 0");
        assert!(err.location().is_none());
    }

    #[test]
    fn post_message_is_printed() {
        let err = Error::interval("overlap")
            .with_post_msg(Some("first interval here".to_string()));
        assert_eq!(
            format!("{err:?}"),
            "Interval error: overlap\nfirst interval here"
        );
    }
}
