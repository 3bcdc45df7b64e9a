//! Canonical labels for the closed outcome set.
//!
//! Two pure lookups: the label a bare outcome code translates to when it is
//! folded into a composite string, and the per-validator clause recorded
//! while consolidation cannot finalize. Codes outside the closed set have no
//! label and must never be substituted into composite strings.

use crate::types::Outcome;

/// Canonical label for an outcome, as the platform has always rendered it.
pub fn label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Selected => "selecionada",
        Outcome::Invalid => "inválida",
        Outcome::NotSelected => "não selecionada",
        Outcome::Alternate => "suplente",
    }
}

/// The clause a non-finalizing validator contributes to the composite
/// string, e.g. `"validado por Instituto X"`.
pub fn clause(outcome: Outcome, validator_name: &str) -> String {
    match outcome {
        Outcome::Selected => format!("validado por {}", validator_name),
        Outcome::Invalid => format!("invalidado por {}", validator_name),
        Outcome::NotSelected => format!("não selecionado por {}", validator_name),
        Outcome::Alternate => format!("suplente por {}", validator_name),
    }
}
