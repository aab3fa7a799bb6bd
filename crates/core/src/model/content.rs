use thiserror::Error;

/// Longest accepted value for any single content field, in characters.
pub const MAX_FIELD_CHARS: usize = 2000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("front cannot be empty")]
    EmptyFront,

    #[error("back cannot be empty")]
    EmptyBack,

    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// The front/back/example triple shown on a flashcard.
///
/// The scheduler never looks inside these strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardContent {
    front: String,
    back: String,
    example: String,
}

impl FlashcardContent {
    /// Validate and normalise user-supplied content.
    ///
    /// `front` and `back` are required; `example` may be empty.
    ///
    /// # Errors
    ///
    /// Returns `ContentError` for blank required fields or oversized input.
    pub fn new(
        front: impl Into<String>,
        back: impl Into<String>,
        example: impl Into<String>,
    ) -> Result<Self, ContentError> {
        let front = checked("front", front.into())?;
        let back = checked("back", back.into())?;
        let example = checked("example", example.into())?;

        if front.is_empty() {
            return Err(ContentError::EmptyFront);
        }
        if back.is_empty() {
            return Err(ContentError::EmptyBack);
        }

        Ok(Self {
            front,
            back,
            example,
        })
    }

    /// Apply a partial edit, validating the merged result.
    ///
    /// # Errors
    ///
    /// Same as [`FlashcardContent::new`].
    pub fn merged(&self, patch: ContentPatch) -> Result<Self, ContentError> {
        Self::new(
            patch.front.unwrap_or_else(|| self.front.clone()),
            patch.back.unwrap_or_else(|| self.back.clone()),
            patch.example.unwrap_or_else(|| self.example.clone()),
        )
    }

    #[must_use]
    pub fn front(&self) -> &str {
        &self.front
    }

    #[must_use]
    pub fn back(&self) -> &str {
        &self.back
    }

    #[must_use]
    pub fn example(&self) -> &str {
        &self.example
    }
}

/// Optional replacements for each content field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPatch {
    pub front: Option<String>,
    pub back: Option<String>,
    pub example: Option<String>,
}

impl ContentPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.front.is_none() && self.back.is_none() && self.example.is_none()
    }
}

fn checked(field: &'static str, raw: String) -> Result<String, ContentError> {
    let trimmed = raw.trim();
    if trimmed.chars().count() > MAX_FIELD_CHARS {
        return Err(ContentError::TooLong {
            field,
            max: MAX_FIELD_CHARS,
        });
    }
    Ok(trimmed.to_owned())
}
