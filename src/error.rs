//! Error types for resolution and admission validation

use thiserror::Error;

/// Errors surfaced by the resolution passes.
///
/// A placeholder whose data is not available yet is *not* an error: the
/// literal text is left in place for a later pass. Only aggregate failures
/// (pipeline results that can never resolve) and admission-time validation
/// defects are reported.
#[derive(Debug, Error)]
pub enum SkeinError {
    /// The authored spec is not valid YAML for the target type.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// One or more declared pipeline results referenced task results that
    /// don't exist: unknown result name, out-of-range index, missing object
    /// key, or a malformed reference. Names appear in declaration order,
    /// each at most once.
    #[error("invalid pipelineresults [{}], the referred results don't exist", names.join(","))]
    InvalidPipelineResults { names: Vec<String> },

    /// A task specification failed admission validation.
    #[error("{0}")]
    Validation(#[from] FieldError),
}

impl PartialEq for SkeinError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SkeinError::Yaml(a), SkeinError::Yaml(b)) => a.to_string() == b.to_string(),
            (
                SkeinError::InvalidPipelineResults { names: a },
                SkeinError::InvalidPipelineResults { names: b },
            ) => a == b,
            (SkeinError::Validation(a), SkeinError::Validation(b)) => a == b,
            _ => false,
        }
    }
}

/// A validation error qualified by the field path(s) it applies to.
///
/// Renders as `message: path1, path2`, with an optional details block on the
/// following line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub message: String,
    pub paths: Vec<String>,
    pub details: Option<String>,
}

impl FieldError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        FieldError {
            message: message.into(),
            paths: vec![path.into()],
            details: None,
        }
    }

    pub fn with_paths(message: impl Into<String>, paths: Vec<String>) -> Self {
        FieldError {
            message: message.into(),
            paths,
            details: None,
        }
    }

    pub fn missing_field(path: impl Into<String>) -> Self {
        FieldError::new("missing field(s)", path)
    }

    pub fn invalid_value(value: impl std::fmt::Display, path: impl Into<String>) -> Self {
        FieldError::new(format!("invalid value: {value}"), path)
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Requalify every path from the scope of an enclosing field, the way a
    /// nested spec reports errors through its parent.
    pub fn via_field(mut self, field: &str) -> Self {
        for p in &mut self.paths {
            *p = if p.is_empty() {
                field.to_string()
            } else {
                format!("{field}.{p}")
            };
        }
        self
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.message, self.paths.join(", "))?;
        if let Some(details) = &self.details {
            write!(f, "\n{details}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldError {}
