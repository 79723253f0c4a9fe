/// Decides when an assignment takes effect and whether it is transmitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropertyPolicy {
    /// Only transmitted; the stored value changes when the transport
    /// delivers it back. Every participant sees the same sequence of values.
    Clean,
    /// Stored immediately and transmitted. Participants converge once the
    /// transport has delivered, but may diverge in between.
    Dirty,
    /// Stored immediately, never transmitted
    #[default]
    Local,
}

impl PropertyPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyPolicy::Clean => "Clean",
            PropertyPolicy::Dirty => "Dirty",
            PropertyPolicy::Local => "Local",
        }
    }

    /// Whether a local change is forwarded to the transport
    pub fn transmits(&self) -> bool {
        matches!(self, PropertyPolicy::Clean | PropertyPolicy::Dirty)
    }

    /// Whether a local change is applied before the transport delivers it
    pub fn applies_locally(&self) -> bool {
        matches!(self, PropertyPolicy::Dirty | PropertyPolicy::Local)
    }

    /// Whether a delivered message must be applied. A participant that already
    /// applied its own change at send time skips the echo.
    pub fn accepts_delivery(&self, is_sender: bool) -> bool {
        !is_sender || *self == PropertyPolicy::Clean
    }
}
