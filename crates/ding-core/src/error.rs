use crate::dispatch::TransportError;
use crate::markup::MarkupError;
use crate::pattern::PatternError;

/// Attachment and template problems. These are configuration errors: the
/// registry logs them and skips the operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No behavior is registered under the control-type name.
    #[error("no behavior registered as `{0}`")]
    UnknownBehavior(String),
    /// No template is loaded under the name.
    #[error("no template named `{0}`")]
    UnknownTemplate(String),
    /// The element carries no control-type marker.
    #[error("element has no `{0}` attribute")]
    MissingMarker(String),
    /// The operation needs the template container, which is created by
    /// [`Registry::start`](crate::Registry::start).
    #[error("registry has not been started")]
    NotStarted,
}

/// Any error raised by the runtime.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Markup(#[from] MarkupError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
