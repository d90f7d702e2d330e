/// Run-level failure. Step-local problems (bad decisions, failing tools) never
/// surface here; they are recorded in the scratchpad instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentError {
    EmptyInstruction,
    InvalidConfig(String),
    DecisionUnavailable { attempts: u32, reason: String },
    Cancelled,
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::EmptyInstruction => f.write_str("instruction must not be empty"),
            AgentError::InvalidConfig(reason) => write!(f, "invalid agent configuration: {reason}"),
            AgentError::DecisionUnavailable { attempts, reason } => {
                write!(
                    f,
                    "decision service unavailable after {attempts} attempt(s): {reason}"
                )
            }
            AgentError::Cancelled => f.write_str("cancelled"),
        }
    }
}

impl std::error::Error for AgentError {}
