use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use extract::ExtractError;
use layout::LayoutError;
use serde::Serialize;
use thiserror::Error;

/// Coarse failure category surfaced to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Credential,
    Network,
    NotReady,
    Parse,
    Layout,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Input(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

impl AppError {
    pub fn input(err: impl std::fmt::Display) -> Self {
        Self::Input(err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) => ErrorKind::Input,
            Self::Layout(_) => ErrorKind::Layout,
            Self::Extract(e) => match e {
                ExtractError::MissingCredential(_) => ErrorKind::Credential,
                ExtractError::Network(_) | ExtractError::Service { .. } => ErrorKind::Network,
                ExtractError::StillProcessing(_)
                | ExtractError::ProcessingFailed(_)
                | ExtractError::NotReady { .. } => ErrorKind::NotReady,
                ExtractError::EmptyResponse | ExtractError::Parse(_) => ErrorKind::Parse,
                ExtractError::Staging { .. } => ErrorKind::Input,
            },
        }
    }

    pub fn hint(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Input => "Adjunta al menos una escritura en PDF o imagen (png, jpg, webp).",
            ErrorKind::Credential => "Configura GOOGLE_API_KEY en el entorno del servidor.",
            ErrorKind::Network => "No se pudo contactar con la IA. Revisa la conexión y la cuota de la API.",
            ErrorKind::NotReady => "La IA no terminó de procesar los documentos. Inténtalo de nuevo.",
            ErrorKind::Parse => "La IA no devolvió un JSON válido.",
            ErrorKind::Layout => "No se pudo generar la hoja de cálculo.",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Input => StatusCode::BAD_REQUEST,
            ErrorKind::Credential | ErrorKind::Layout => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Network | ErrorKind::Parse => StatusCode::BAD_GATEWAY,
            ErrorKind::NotReady => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    kind: ErrorKind,
    error: String,
    hint: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            kind: self.kind(),
            error: self.to_string(),
            hint: self.hint(),
        };
        (self.status(), Json(body)).into_response()
    }
}
