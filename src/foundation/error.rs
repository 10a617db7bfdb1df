pub type MatchcutResult<T> = Result<T, MatchcutError>;

/// Error taxonomy for the render pipeline.
///
/// `Config`, `Asset` and `Layout` are rejected before any frame work begins and
/// are recoverable by resubmitting corrected input. `Render` and `Encode` abort
/// the whole job; partial output is discarded. `Cancelled` is not a failure
/// from the pipeline's perspective but still guarantees cleanup.
#[derive(thiserror::Error, Debug)]
pub enum MatchcutError {
    #[error("config error: {0}")]
    Config(String),

    #[error("asset error: {0}")]
    Asset(String),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("text provider error: {0}")]
    Provider(String),

    #[error("job cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MatchcutError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Short stable kind tag for callers that map errors to user-facing
    /// messages without exposing internal detail.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Asset(_) => "asset",
            Self::Layout(_) => "layout",
            Self::Render(_) => "render",
            Self::Encode(_) => "encode",
            Self::Provider(_) => "provider",
            Self::Cancelled => "cancelled",
            Self::Other(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            MatchcutError::config("x")
                .to_string()
                .contains("config error:")
        );
        assert!(
            MatchcutError::asset("x")
                .to_string()
                .contains("asset error:")
        );
        assert!(
            MatchcutError::layout("x")
                .to_string()
                .contains("layout error:")
        );
        assert!(
            MatchcutError::encode("x")
                .to_string()
                .contains("encode error:")
        );
    }

    #[test]
    fn kind_tags_cover_taxonomy() {
        assert_eq!(MatchcutError::config("x").kind(), "config");
        assert_eq!(MatchcutError::Cancelled.kind(), "cancelled");
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = MatchcutError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
