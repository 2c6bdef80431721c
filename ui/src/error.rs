use busview_server::connection_session::SessionError;
use thiserror::Error;

/// Failures a console command can report.
///
/// Every variant has a stable [`kind`](AppError::kind) so the console can
/// print `<kind>: <message>` uniformly.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// The command line could not be understood
    #[error("{0}")]
    Usage(String),

    /// `send` was given no body, or only whitespace
    #[error("Message body must not be empty")]
    EmptyBody,

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AppError {
    pub fn usage(message: impl Into<String>) -> Self {
        AppError::Usage(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Usage(_) => "UsageError",
            AppError::EmptyBody => "EmptyBody",
            AppError::Session(e) => e.kind(),
        }
    }

    /// Single line shown to the operator
    pub fn report(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

pub type AppResult<T> = Result<T, AppError>;
