//! Error types for Deskpilot.

use thiserror::Error;

/// Result type alias using Deskpilot's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Deskpilot.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Plan Errors (structural, fatal to a plan)
    // =========================================================================
    #[error("Invalid step {ordinal}: {reason}")]
    InvalidStep { ordinal: usize, reason: String },

    #[error("Rule table error: {0}")]
    Classifier(String),

    #[error("Template error: {0}")]
    Template(String),

    // =========================================================================
    // Capability Errors (per step, absorbed into a StepResult)
    // =========================================================================
    #[error("Capability not found: {0}")]
    CapabilityNotFound(String),

    #[error("Operation '{operation}' not found on capability '{module}'")]
    OperationNotFound { module: String, operation: String },

    #[error("Capability '{module}' is unavailable: {reason}")]
    CapabilityUnavailable { module: String, reason: String },

    #[error("Capability '{0}' is busy")]
    CapabilityBusy(String),

    #[error("Capability '{0}' is already registered")]
    DuplicateCapability(String),

    #[error("Invalid parameters for {module}.{operation}: {reason}")]
    InvalidParams {
        module: String,
        operation: String,
        reason: String,
    },

    /// Module-internal failure. The message is surfaced verbatim.
    #[error("{message}")]
    Module { module: String, message: String },

    // =========================================================================
    // Context Errors
    // =========================================================================
    #[error("Context unavailable: {0}")]
    ContextUnavailable(String),

    // =========================================================================
    // Gateway Errors
    // =========================================================================
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid step error.
    pub fn invalid_step(ordinal: usize, reason: impl Into<String>) -> Self {
        Self::InvalidStep {
            ordinal,
            reason: reason.into(),
        }
    }

    /// Create a capability not found error.
    pub fn capability_not_found(module: impl Into<String>) -> Self {
        Self::CapabilityNotFound(module.into())
    }

    /// Create an operation not found error.
    pub fn operation_not_found(module: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::OperationNotFound {
            module: module.into(),
            operation: operation.into(),
        }
    }

    /// Create a capability unavailable error.
    pub fn unavailable(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CapabilityUnavailable {
            module: module.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid parameters error.
    pub fn invalid_params(
        module: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParams {
            module: module.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a module-internal error.
    pub fn module(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Module {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a gateway error.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error is fatal to a whole plan rather than one step.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::InvalidStep { .. })
    }

    /// Stable machine-readable code for transport error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidStep { .. } => "INVALID_STEP",
            Self::Classifier(_) => "CLASSIFIER_ERROR",
            Self::Template(_) => "TEMPLATE_ERROR",
            Self::CapabilityNotFound(_) => "CAPABILITY_NOT_FOUND",
            Self::OperationNotFound { .. } => "OPERATION_NOT_FOUND",
            Self::CapabilityUnavailable { .. } => "CAPABILITY_UNAVAILABLE",
            Self::CapabilityBusy(_) => "CAPABILITY_BUSY",
            Self::DuplicateCapability(_) => "DUPLICATE_CAPABILITY",
            Self::InvalidParams { .. } => "INVALID_PARAMS",
            Self::Module { .. } => "MODULE_ERROR",
            Self::ContextUnavailable(_) => "CONTEXT_UNAVAILABLE",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::RunNotFound(_) => "RUN_NOT_FOUND",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Yaml(_) => "YAML_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }
}
