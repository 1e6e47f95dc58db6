use thiserror::Error;

/// Boxed underlying cause, kept for diagnostics only.
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every failure the crawler can observe, tagged by how the search reacts to it.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// An addressed element vanished or the tree changed between resolution and use.
    #[error("stale reference: {context}")]
    StaleReference {
        context: String,
        #[source]
        source: Option<Cause>,
    },

    /// A step index was out of range or the hierarchy had no root.
    #[error("address resolution failed at step {step}: {reason}")]
    AddressResolution { step: usize, reason: String },

    /// The driver could not tell which screen is in the foreground.
    #[error("screen identifier unavailable: {reason}")]
    ScreenIdentifierUnavailable {
        reason: String,
        #[source]
        source: Option<Cause>,
    },

    /// Timeout exceeded or the underlying command failed. Abandons the crawl for this app.
    #[error("driver error ({command}): {message}")]
    Driver {
        command: String,
        message: String,
        #[source]
        source: Option<Cause>,
    },

    /// Unknown algorithm label or unusable settings. Raised before any crawling starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Result delivery to the host collector failed.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl CrawlError {
    pub fn stale(context: impl Into<String>) -> Self {
        CrawlError::StaleReference {
            context: context.into(),
            source: None,
        }
    }

    pub fn resolution(step: usize, reason: impl Into<String>) -> Self {
        CrawlError::AddressResolution {
            step,
            reason: reason.into(),
        }
    }

    pub fn screen_id(reason: impl Into<String>) -> Self {
        CrawlError::ScreenIdentifierUnavailable {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn driver(command: impl Into<String>, message: impl Into<String>) -> Self {
        CrawlError::Driver {
            command: command.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn driver_with(command: impl Into<String>, message: impl Into<String>, source: Cause) -> Self {
        CrawlError::Driver {
            command: command.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn transport(message: impl Into<String>, source: std::io::Error) -> Self {
        CrawlError::Transport {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Stale references and failed resolutions only cost the candidate in progress.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CrawlError::StaleReference { .. } | CrawlError::AddressResolution { .. }
        )
    }

    /// Errors that end the crawl of the current app.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CrawlError::Driver { .. } | CrawlError::Configuration(_) | CrawlError::Transport { .. }
        )
    }
}
