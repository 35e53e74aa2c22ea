use thiserror::Error;

/// Error taxonomy of the reconciliation pipeline. Only `Validation` aborts a
/// whole call; everything else is accumulated per invoice into the response.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("requisição inválida: {0}")]
    Validation(String),

    #[error("nota fiscal {0} não encontrada")]
    NotFound(String),

    #[error("nota {numero}, item {index}: {reason}")]
    Parse {
        numero: String,
        index: usize,
        reason: String,
    },

    #[error("erro de banco de dados: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("erro de serialização: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("sincronização excedeu o limite de {0}s")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, SyncError>;
