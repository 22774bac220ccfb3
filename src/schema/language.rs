use serde::{Deserialize, Serialize};

/// One configured app language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub iso2_code: String,
    #[serde(default)]
    pub is_master: bool,
    /// Optional languages accept empty values even for required fields.
    #[serde(default)]
    pub is_optional: bool,
}

impl Language {
    pub fn master(iso2_code: impl Into<String>) -> Self {
        Self {
            iso2_code: iso2_code.into(),
            is_master: true,
            is_optional: false,
        }
    }

    pub fn optional(iso2_code: impl Into<String>) -> Self {
        Self {
            iso2_code: iso2_code.into(),
            is_master: false,
            is_optional: true,
        }
    }

    pub fn new(iso2_code: impl Into<String>) -> Self {
        Self {
            iso2_code: iso2_code.into(),
            is_master: false,
            is_optional: false,
        }
    }
}
