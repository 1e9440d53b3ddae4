use thiserror::Error;

/// Failure kinds that can reach a command handler or periodic job.
///
/// Every kind carries enough detail for the log line; `user_reply` renders
/// the short chat-facing form.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BotError {
    #[error("chat transport call failed: {0}")]
    TransportUnavailable(String),
    #[error("bad input: {0}")]
    BadInput(String),
    #[error("dependency `{service}` failed: {detail}")]
    Dependency { service: String, detail: String },
    #[error("missing configuration: {0}")]
    ConfigurationMissing(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl BotError {
    pub fn dependency(service: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Dependency { service: service.into(), detail: detail.into() }
    }

    /// Short, human-readable chat reply. Starts with a fixed severity prefix;
    /// the underlying cause is inlined in code formatting where it is safe to
    /// expose.
    pub fn user_reply(&self) -> String {
        match self {
            Self::TransportUnavailable(detail) => {
                format!("Something went wrong while talking to the chat service: `{detail}`")
            }
            Self::BadInput(message) => format!("Error: {message}"),
            Self::Dependency { service, detail } => {
                format!("Error: `{service}` call failed: `{detail}`")
            }
            Self::ConfigurationMissing(name) => {
                format!("Error: missing configuration `{name}` — ask an operator to set it.")
            }
            Self::Internal(detail) => format!("Something went wrong: `{detail}`"),
        }
    }

    /// BadInput is corrective guidance for the sender, not an operational
    /// fault, and is never logged at error level.
    pub fn is_operator_fault(&self) -> bool {
        !matches!(self, Self::BadInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::BotError;

    #[test]
    fn user_reply_starts_with_severity_prefix() {
        assert_eq!(
            BotError::BadInput("unknown service `quux`".to_owned()).user_reply(),
            "Error: unknown service `quux`"
        );
        assert!(BotError::Internal("index out of range".to_owned())
            .user_reply()
            .starts_with("Something went wrong"));
        assert!(BotError::TransportUnavailable("timeout".to_owned())
            .user_reply()
            .starts_with("Something went wrong"));
    }

    #[test]
    fn dependency_reply_names_the_service_and_cause() {
        let reply = BotError::dependency("reddit", "HTTP 503").user_reply();
        assert!(reply.contains("`reddit`"));
        assert!(reply.contains("`HTTP 503`"));
    }

    #[test]
    fn bad_input_is_not_an_operator_fault() {
        assert!(!BotError::BadInput("too many arguments".to_owned()).is_operator_fault());
        assert!(BotError::dependency("etsy", "HTTP 500").is_operator_fault());
    }
}
