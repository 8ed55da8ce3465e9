use crate::numerics::SpectralError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TemplateResult<T> = Result<T, TemplateError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateErrorCategory {
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl TemplateErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    category: TemplateErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl TemplateError {
    pub fn new(
        category: TemplateErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            TemplateErrorCategory::InputValidationError,
            placeholder,
            message,
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(TemplateErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(TemplateErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(TemplateErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> TemplateErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for TemplateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for TemplateError {}

impl From<SpectralError> for TemplateError {
    fn from(error: SpectralError) -> Self {
        let placeholder = match &error {
            SpectralError::InvalidGrid { .. } => "RUN.INVALID_GRID",
            SpectralError::ShapeMismatch { .. } => "RUN.SHAPE_MISMATCH",
            SpectralError::DegenerateGrid { .. } => "RUN.DEGENERATE_GRID",
            SpectralError::AlreadyBroader { .. } => "RUN.ALREADY_BROADER",
            SpectralError::InvalidSigma { .. } => "RUN.INVALID_SIGMA",
        };
        Self::computation(placeholder, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{TemplateError, TemplateErrorCategory};
    use crate::numerics::SpectralError;

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (TemplateErrorCategory::InputValidationError, 2),
            (TemplateErrorCategory::IoSystemError, 3),
            (TemplateErrorCategory::ComputationError, 4),
            (TemplateErrorCategory::InternalError, 5),
        ];

        for (category, exit_code) in cases {
            assert_eq!(category.exit_code(), exit_code);
        }
    }

    #[test]
    fn fatal_error_renders_diagnostic_lines() {
        let error = TemplateError::input_validation(
            "INPUT.SUBSET_RANGE",
            "subset index 150 exceeds library of 100 models",
        );

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.SUBSET_RANGE] subset index 150 exceeds library of 100 models"
        );
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 2");
    }

    #[test]
    fn spectral_errors_map_to_computation_category() {
        let error: TemplateError = SpectralError::AlreadyBroader {
            index: 3,
            target: 1.0,
            intrinsic: 2.0,
        }
        .into();

        assert_eq!(error.category(), TemplateErrorCategory::ComputationError);
        assert_eq!(error.placeholder(), "RUN.ALREADY_BROADER");
        assert!(error.message().contains("index 3"));
    }
}
