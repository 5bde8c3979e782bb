use std::{error::Error, fmt, io};

/// The data preparation result type.
pub type Result<T> = std::result::Result<T, PrepError>;

/// Failures while loading, validating, transforming or writing tables.
#[derive(Debug)]
pub enum PrepError {
    /// Missing or malformed columns, ragged rows, unparsable cells.
    Schema(String),
    /// A row belongs to a city no scaler was fit for.
    MissingScaler { city: String },
    /// A case count the log transform is undefined for.
    InvalidTarget { row: usize, value: f64 },
    EmptyPartition { partition: &'static str },
    Io(io::Error),
    Csv(csv::Error),
}

impl PrepError {
    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }
}

impl fmt::Display for PrepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepError::Schema(msg) => write!(f, "schema error: {msg}"),
            PrepError::MissingScaler { city } => {
                write!(f, "no scaler was fit for city '{city}'")
            }
            PrepError::InvalidTarget { row, value } => {
                write!(f, "invalid case count at row {row}: {value}")
            }
            PrepError::EmptyPartition { partition } => {
                write!(f, "the {partition} partition has no rows")
            }
            PrepError::Io(e) => write!(f, "io error: {e}"),
            PrepError::Csv(e) => write!(f, "csv error: {e}"),
        }
    }
}

impl Error for PrepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PrepError::Io(e) => Some(e),
            PrepError::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PrepError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for PrepError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}
