use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Invoice header (nota_fiscal). `numero` is free text: often numeric-looking
/// but never treated as a number. `tipo` is "entrada" or "saida".
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NotaFiscal {
    pub id: i64,
    pub numero: String,
    pub tipo: String,
    pub nome_emitente: String,
    pub cnpj_emitente: Option<String>,
    pub data_emissao: Option<NaiveDate>,
    pub valor_total: BigDecimal,
    pub inscricao: Option<String>,
}

impl NotaFiscal {
    pub fn is_entrada(&self) -> bool {
        self.tipo == "entrada"
    }
}

/// Invoice line item (nota_fiscal_item). `dados` holds either a structured
/// object or a bare JSON string with legacy free text.
#[derive(Debug, Clone, FromRow)]
pub struct NotaFiscalItem {
    pub id: i64,
    pub nota_fiscal_id: i64,
    pub dados: serde_json::Value,
}
