use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    MissingEnvironment { variables: Vec<String> },
    InvalidOption { option: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::MissingEnvironment { .. } => "app/missing-environment",
            AppError::InvalidOption { .. } => "app/invalid-option",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MissingEnvironment { variables } => {
                write!(f, "Missing environment variables: {}", variables.join(", "))
            }
            AppError::InvalidOption { option, message } => {
                write!(f, "Invalid Firebase option '{option}': {message}")
            }
        }
    }
}

impl std::error::Error for AppError {}
