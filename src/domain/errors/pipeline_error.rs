//! Image pipeline error types.

use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Outcome delivered to every waiter of a failed request.
///
/// Cloneable so one execution can fan the same failure out to all coalesced
/// waiters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum PipelineError {
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("failed to decode image: {message}")]
    Decode { message: String },

    #[error("modifier `{identifier}` (step {step}) rejected its input: {reason}")]
    Transform {
        identifier: String,
        step: usize,
        reason: String,
    },

    #[error("request was interrupted: {message}")]
    Interrupted { message: String },
}

impl PipelineError {
    /// Creates fetch error.
    #[must_use]
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates transform error for the modifier at `step`.
    #[must_use]
    pub fn transform(identifier: impl Into<String>, step: usize, error: &ModifierError) -> Self {
        Self::Transform {
            identifier: identifier.into(),
            step,
            reason: error.reason().to_string(),
        }
    }

    /// Creates interrupted error.
    #[must_use]
    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::Interrupted {
            message: message.into(),
        }
    }

    /// Returns whether the failure happened in the transport.
    #[must_use]
    pub const fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Returns whether the fetched bytes could not be decoded.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Returns whether a modifier rejected its input.
    #[must_use]
    pub const fn is_transform(&self) -> bool {
        matches!(self, Self::Transform { .. })
    }

    /// Short label used in events and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Decode { .. } => "decode",
            Self::Transform { .. } => "transform",
            Self::Interrupted { .. } => "interrupted",
        }
    }
}

/// Error returned by a single modifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ModifierError {
    reason: String,
}

impl ModifierError {
    /// Creates a new modifier error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Error for images without pixel data.
    #[must_use]
    pub fn empty_image() -> Self {
        Self::new("image has no pixel data")
    }

    /// Returns the reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_error_message() {
        let err = PipelineError::transform("scale(0x0)", 1, &ModifierError::new("zero size"));
        assert!(err.is_transform());
        assert_eq!(
            err.to_string(),
            "modifier `scale(0x0)` (step 1) rejected its input: zero size"
        );
    }

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            PipelineError::fetch("u", "m"),
            PipelineError::decode("m"),
            PipelineError::transform("id", 0, &ModifierError::empty_image()),
            PipelineError::interrupted("m"),
        ];
        let kinds: std::collections::HashSet<_> = errors.iter().map(PipelineError::kind).collect();
        assert_eq!(kinds.len(), errors.len());
    }
}
