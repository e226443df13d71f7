//! Request-scoped validation and feature-gate context
//!
//! Maturity flags and validation markers are plain values threaded through
//! every call that needs them. Nothing here is global: two concurrent callers
//! can validate the same spec under different gate settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// API surface maturity requested by the caller.
///
/// Gated behavior (for example parameter propagation into embedded task
/// bodies, or step-level workspace usage) is enabled only at the level that
/// introduced it or above. `Alpha` enables everything, `Stable` only the
/// settled surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiFields {
    #[default]
    Stable,
    Beta,
    Alpha,
}

impl ApiFields {
    /// Whether features gated at `required` are available at this level.
    pub fn enables(self, required: ApiFields) -> bool {
        self >= required
    }
}

impl fmt::Display for ApiFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFields::Stable => write!(f, "stable"),
            ApiFields::Beta => write!(f, "beta"),
            ApiFields::Alpha => write!(f, "alpha"),
        }
    }
}

impl FromStr for ApiFields {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(ApiFields::Stable),
            "beta" => Ok(ApiFields::Beta),
            "alpha" => Ok(ApiFields::Alpha),
            other => Err(format!("invalid api fields value {other:?}")),
        }
    }
}

/// Per-request validation context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext {
    /// Maturity level the caller opted into.
    pub api_fields: ApiFields,
    /// Validation runs as part of a delete; spec checks are skipped because
    /// the object is going away and may predate current rules.
    pub within_delete: bool,
    /// The spec already went through variable substitution; checks that only
    /// hold for pre-substitution text (script variable references) are
    /// skipped.
    pub within_substituted: bool,
}

impl ValidationContext {
    pub fn new(api_fields: ApiFields) -> Self {
        ValidationContext {
            api_fields,
            ..Default::default()
        }
    }

    pub fn within_delete(mut self) -> Self {
        self.within_delete = true;
        self
    }

    pub fn within_substituted(mut self) -> Self {
        self.within_substituted = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_stable() {
        assert_eq!(ApiFields::default(), ApiFields::Stable);
        assert_eq!(ValidationContext::default().api_fields, ApiFields::Stable);
    }

    #[test]
    fn alpha_enables_everything() {
        assert!(ApiFields::Alpha.enables(ApiFields::Stable));
        assert!(ApiFields::Alpha.enables(ApiFields::Beta));
        assert!(ApiFields::Alpha.enables(ApiFields::Alpha));
    }

    #[test]
    fn stable_does_not_enable_alpha() {
        assert!(!ApiFields::Stable.enables(ApiFields::Alpha));
        assert!(!ApiFields::Beta.enables(ApiFields::Alpha));
        assert!(ApiFields::Beta.enables(ApiFields::Beta));
    }

    #[test]
    fn parse_and_display_round_trip() {
        for level in [ApiFields::Stable, ApiFields::Beta, ApiFields::Alpha] {
            assert_eq!(level.to_string().parse::<ApiFields>(), Ok(level));
        }
        assert!("experimental".parse::<ApiFields>().is_err());
    }

    #[test]
    fn context_markers() {
        let ctx = ValidationContext::new(ApiFields::Alpha).within_delete();
        assert!(ctx.within_delete);
        assert!(!ctx.within_substituted);
    }
}
