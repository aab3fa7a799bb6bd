use review_core::model::ReviewSession;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

impl SessionProgress {
    #[must_use]
    pub fn of(session: &ReviewSession) -> Self {
        Self {
            total: session.total(),
            answered: session.answered(),
            remaining: session.remaining(),
            is_complete: session.is_finished(),
        }
    }
}
