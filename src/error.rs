/// Broad category of a run-aborting failure.
///
/// Each kind maps to a fixed process exit code so scripts can tell a cancelled
/// run apart from bad input or a numerical failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid flags or flag combinations.
    Usage,
    /// Unreadable or structurally invalid input files.
    Input,
    /// Inputs parsed, but nothing usable remains to analyse.
    Data,
    /// Failures writing outputs or unexpected numerical state.
    Internal,
    /// The user backed out of an input/output selection step.
    SourceUnavailable,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::SourceUnavailable => 1,
            ErrorKind::Usage | ErrorKind::Input => 2,
            ErrorKind::Data => 3,
            ErrorKind::Internal => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Input, message)
    }

    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SourceUnavailable, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }

    /// True when the run ended because a selection step was cancelled.
    pub fn is_source_unavailable(&self) -> bool {
        self.kind == ErrorKind::SourceUnavailable
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
