use crate::schema::{FieldSchema, Language};

/// The partition key for non-localizable values.
pub const INVARIANT: &str = "iv";

/// One value partition of a field: a language code for localizable
/// fields, or the single invariant partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub key: String,
    pub is_optional: bool,
}

impl Partition {
    pub fn invariant() -> Self {
        Self {
            key: INVARIANT.to_string(),
            is_optional: false,
        }
    }
}

/// Maps a field's localizability and the configured app languages to
/// the partitions the field carries values for.
#[derive(Debug, Clone)]
pub struct PartitionSet {
    languages: Vec<Language>,
}

impl PartitionSet {
    pub fn new(languages: Vec<Language>) -> Self {
        Self { languages }
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// The partition for a specific language, or the invariant
    /// partition when no language is given.
    pub fn get(&self, language: Option<&str>) -> Partition {
        match language {
            Some(code) => {
                let is_optional = self
                    .languages
                    .iter()
                    .find(|l| l.iso2_code == code)
                    .is_some_and(|l| l.is_optional);
                Partition {
                    key: code.to_string(),
                    is_optional,
                }
            }
            None => Partition::invariant(),
        }
    }

    /// All partitions a field carries: one per language for localizable
    /// fields, the invariant partition otherwise.
    pub fn all_for(&self, field: &FieldSchema) -> Vec<Partition> {
        if field.is_localizable {
            self.languages
                .iter()
                .map(|l| Partition {
                    key: l.iso2_code.clone(),
                    is_optional: l.is_optional,
                })
                .collect()
        } else {
            vec![Partition::invariant()]
        }
    }
}
