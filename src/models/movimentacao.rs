use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Derived accounting row (movimentacao_contabil), ready to insert. Rows are
/// never edited in place: the writer purges by invoice number + direction and
/// regenerates, so this struct carries no id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movimentacao {
    pub tipo: String,
    pub valor: BigDecimal,
    pub descricao: String,
    pub localidade: String,
    pub periodo: String,
    pub animal_id: Option<i64>,
    pub dados_extras: DadosExtras,
    pub criado_em: DateTime<Utc>,
}

/// JSONB side-channel payload of a ledger row. Key names are storage
/// compatible with rows already in production; do not rename.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DadosExtras {
    pub numero_nf: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sexo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raca: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tatuagem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantidade: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_index: Option<i64>,
}

/// Persisted ledger row as fetched back for reports/export.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MovimentacaoRow {
    pub id: i64,
    pub tipo: String,
    pub valor: BigDecimal,
    pub descricao: String,
    pub localidade: String,
    pub periodo: String,
    pub animal_id: Option<i64>,
    pub dados_extras: serde_json::Value,
    pub criado_em: DateTime<Utc>,
}
