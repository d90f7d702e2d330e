use crate::SleuthError;

/// Whether a provider call that failed with `error` may succeed if repeated
/// unchanged.
pub fn is_retryable(error: &SleuthError) -> bool {
    matches!(
        error,
        SleuthError::LlmProvider(_) | SleuthError::Timeout(_)
    )
}
