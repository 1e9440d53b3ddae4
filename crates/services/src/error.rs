use bubbles_core::BotError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} request failed: {detail}")]
    Http { service: &'static str, detail: String },
    #[error("{service} returned an unexpected body: {detail}")]
    Decode { service: &'static str, detail: String },
    #[error("database error: {0}")]
    Database(String),
}

impl ServiceError {
    pub fn http(service: &'static str, error: reqwest::Error) -> Self {
        Self::Http { service, detail: error.to_string() }
    }

    pub fn decode(service: &'static str, detail: impl Into<String>) -> Self {
        Self::Decode { service, detail: detail.into() }
    }

    fn service_name(&self) -> &'static str {
        match self {
            Self::Http { service, .. } | Self::Decode { service, .. } => service,
            Self::Database(_) => "postgres",
        }
    }
}

impl From<ServiceError> for BotError {
    fn from(error: ServiceError) -> Self {
        BotError::dependency(error.service_name(), error.to_string())
    }
}
