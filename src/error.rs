use std::io;

use thiserror::Error;

use crate::format::Location;

/// Boxed cause of a failed mapper or reducer call.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while running a MapReduce job.
///
/// The engine never retries; the first error aborts the job and is handed
/// back to the caller unchanged.
#[derive(Error, Debug)]
pub enum Error {
    /// A declared input could not be opened or read.
    #[error("cannot read input `{input}`")]
    SourceNotFound {
        input: String,
        #[source]
        source: io::Error,
    },

    /// A record does not conform to the declared format.
    #[error("{location}: {message}")]
    Parse { location: Location, message: String },

    /// The mapper failed on a record.
    #[error("mapper failed on record at {location}")]
    Map {
        location: Location,
        #[source]
        source: CallbackError,
    },

    /// The reducer failed on a key.
    #[error("reducer failed on key {key}")]
    Reduce {
        key: String,
        #[source]
        source: CallbackError,
    },

    #[error("failed to write results")]
    Io(#[from] io::Error),

    #[error("failed to encode result as JSON")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn parse(location: Location, message: impl ToString) -> Self {
        Error::Parse {
            location,
            message: message.to_string(),
        }
    }

    pub(crate) fn source_not_found(input: impl ToString, source: io::Error) -> Self {
        Error::SourceNotFound {
            input: input.to_string(),
            source,
        }
    }
}
