//! Error types for management API operations.
//!
//! Every failure belongs to one of three categories. Usage errors are caught
//! before any request leaves the process, transport errors happen while
//! talking to the broker, and API errors are non-2xx answers from the broker
//! itself. None of them are retried.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for management operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors, used by the CLI to pick its report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad command-line or config-file input.
    Usage,
    /// Connection refused, DNS failure, TLS failure, timeout.
    Transport,
    /// The broker answered with a 4xx or 5xx status.
    Api,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Usage => "Invalid usage",
            Self::Transport => "Could not reach the management API",
            Self::Api => "The management API rejected the request",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Usage => "Run with --help to see the available commands and options",
            Self::Transport => {
                "Check the host, port and TLS options, and that the management plugin is enabled"
            }
            Self::Api => "Check resource names, the vhost and the permissions of the user",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while resolving config, building or sending requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Generic usage problem.
    #[error("{0}")]
    Usage(String),

    /// Explicitly requested config file could not be read.
    #[error("could not read config file {path}: {source}")]
    ConfigFile {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Config file exists but is not valid INI.
    #[error("invalid config file {path}: {message}")]
    ConfigSyntax {
        /// Path of the config file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// The node section named with --node is missing.
    #[error("section [{node}] not found in config file {path}")]
    MissingSection {
        /// Requested node name.
        node: String,
        /// Config file that was searched.
        path: PathBuf,
    },

    /// Resource kind has no descriptor for the verb.
    #[error("type {kind} not recognised for {verb}; expected one of: {known}")]
    UnknownKind {
        /// Verb being executed.
        verb: String,
        /// Kind given on the command line.
        kind: String,
        /// Comma-separated list of valid kinds.
        known: String,
    },

    /// Positional argument is not `name=value`.
    #[error("argument \"{0}\" not in format name=value")]
    MalformedArgument(String),

    /// Field name is not known to the descriptor.
    #[error("argument \"{0}\" not recognised")]
    UnknownField(String),

    /// A single-name mandatory field is missing.
    #[error("mandatory argument \"{0}\" is required")]
    MissingField(String),

    /// Zero or several fields of an alternative group were supplied.
    #[error("exactly one of mandatory arguments {group} is required, got {supplied}")]
    AlternativeFields {
        /// Group members, joined for display.
        group: String,
        /// Members that were supplied (may be empty).
        supplied: String,
    },

    /// TLS material could not be loaded.
    #[error("could not load TLS file {path}: {message}")]
    Tls {
        /// File that failed to load.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Network-level failure.
    #[error("could not connect to {url}: {message}")]
    Transport {
        /// URL being requested.
        url: String,
        /// Underlying network error text.
        message: String,
    },

    /// Request exceeded the configured timeout.
    #[error("request to {url} timed out after {seconds}s")]
    Timeout {
        /// URL being requested.
        url: String,
        /// Configured timeout.
        seconds: u64,
    },

    /// 2xx answer whose body could not be parsed.
    #[error("unexpected response from {url}: body is not valid JSON ({message})")]
    InvalidResponse {
        /// URL that was requested.
        url: String,
        /// Parser message.
        message: String,
    },

    /// Non-2xx answer from the broker.
    #[error("{message} (HTTP {status} for {method} {path})")]
    Api {
        /// HTTP status code.
        status: u16,
        /// HTTP method of the request.
        method: String,
        /// Request path below the API root.
        path: String,
        /// Message taken from the `error`/`reason` fields of the body.
        message: String,
    },
}

impl Error {
    /// Create a generic usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Create a TLS file error.
    pub fn tls(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::Tls {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Usage(_)
            | Error::ConfigFile { .. }
            | Error::ConfigSyntax { .. }
            | Error::MissingSection { .. }
            | Error::UnknownKind { .. }
            | Error::MalformedArgument(_)
            | Error::UnknownField(_)
            | Error::MissingField(_)
            | Error::AlternativeFields { .. } => ErrorCategory::Usage,
            Error::Tls { .. } | Error::Transport { .. } | Error::Timeout { .. } => {
                ErrorCategory::Transport
            }
            Error::Api { .. } | Error::InvalidResponse { .. } => ErrorCategory::Api,
        }
    }

    /// Whether this error was caught before any network I/O.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        self.category() == ErrorCategory::Usage
    }
}
