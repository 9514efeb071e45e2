use std::fmt;

/// I/O failure reported by a store or notifier collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// Operation that failed (`read_all_rows`, `append_row`, ...).
    pub op: String,
    pub message: String,
}

impl StoreError {
    pub fn new(op: impl Into<String>, message: impl Into<String>) -> Self {
        Self { op: op.into(), message: message.into() }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.op, self.message)
    }
}

impl std::error::Error for StoreError {}

#[derive(Debug)]
pub enum ReconError {
    /// Directory, intake or notifier I/O failure. Always fatal.
    Store(StoreError),
    /// Directory has no header row and none can be derived.
    Schema(String),
    /// More than one row satisfied the winning match tier and the
    /// configuration asks for a hard failure.
    AmbiguousMatch { field: String, rows: Vec<usize> },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (missing admin, bad URL, ...).
    ConfigValidation(String),
    /// Approval request with missing or malformed parameters.
    InvalidRequest(String),
    /// IO error (config file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "store error: {err}"),
            Self::Schema(msg) => write!(f, "schema error: {msg}"),
            Self::AmbiguousMatch { field, rows } => {
                let rows: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
                write!(f, "ambiguous match on {field}: rows {}", rows.join(", "))
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ReconError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
