use serde::{Deserialize, Serialize};

use super::outcome::CapabilityOutput;

// =============================================================================
// Execution Policies
// =============================================================================

/// How the executor derives `verified` from a capability output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPolicy {
    /// Use the module's explicit verification signal, else its success flag.
    #[default]
    Strict,
    /// A successful invocation counts as verified even when the module's
    /// own self-check failed. Used when classification ran without context.
    Lenient,
}

impl VerificationPolicy {
    /// Derive the verified flag for a completed invocation.
    pub fn verify(&self, output: &CapabilityOutput) -> bool {
        match self {
            Self::Strict => output.verification.unwrap_or(output.success),
            Self::Lenient => output.success || output.verification.unwrap_or(false),
        }
    }
}

/// How step results are folded into overall success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessPolicy {
    /// At least one step succeeded and was verified.
    #[default]
    AnyVerified,
    /// Every step of the plan succeeded and was verified.
    AllVerified,
}

impl SuccessPolicy {
    /// Judge overall success from the verified-success count and plan size.
    pub fn judge(&self, success_count: usize, total_steps: usize) -> bool {
        match self {
            Self::AnyVerified => success_count > 0,
            Self::AllVerified => total_steps > 0 && success_count == total_steps,
        }
    }
}

/// What a module wrapping one shared resource does with concurrent callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Queue callers behind the current holder.
    #[default]
    Wait,
    /// Fail immediately with `CapabilityBusy`.
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_prefers_explicit_signal() {
        let output = CapabilityOutput::ok("launched").with_verification(false);
        assert!(!VerificationPolicy::Strict.verify(&output));

        let output = CapabilityOutput::ok("command issued");
        assert!(VerificationPolicy::Strict.verify(&output));

        let output = CapabilityOutput::failed("not running");
        assert!(!VerificationPolicy::Strict.verify(&output));
    }

    #[test]
    fn test_lenient_accepts_reported_success() {
        let output = CapabilityOutput::ok("launched").with_verification(false);
        assert!(VerificationPolicy::Lenient.verify(&output));

        let output = CapabilityOutput::failed("not running");
        assert!(!VerificationPolicy::Lenient.verify(&output));
    }

    #[test]
    fn test_success_policies() {
        assert!(SuccessPolicy::AnyVerified.judge(1, 3));
        assert!(!SuccessPolicy::AnyVerified.judge(0, 3));
        assert!(!SuccessPolicy::AllVerified.judge(2, 3));
        assert!(SuccessPolicy::AllVerified.judge(3, 3));
        assert!(!SuccessPolicy::AllVerified.judge(0, 0));
    }
}
