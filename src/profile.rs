//! Stakeholder profile input

use crate::language::{self, Language};
use serde::{Deserialize, Serialize};

/// Who a retrieval is for: drives query reformulation and result sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeholderProfile {
    /// Stable key used for table lookups (e.g. "cto", "qa_manager")
    pub id: String,

    /// Free-text role, may mix languages or list alternatives ("CTO/최고기술책임자")
    pub role: String,

    /// Ordered concerns, most important first as given by the caller
    #[serde(default)]
    pub concerns: Vec<String>,
}

impl StakeholderProfile {
    pub fn new(id: impl Into<String>, role: impl Into<String>, concerns: Vec<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            concerns,
        }
    }

    /// Language most of the role and concerns are written in
    pub fn dominant_language(&self) -> Language {
        language::dominant_language(
            std::iter::once(self.role.as_str()).chain(self.concerns.iter().map(|c| c.as_str())),
        )
    }

    /// Language of the concerns alone, if they contain any letters
    pub fn concerns_language(&self) -> Option<Language> {
        let joined = self.concerns.join(" ");
        language::detect_language(&joined)
    }
}
