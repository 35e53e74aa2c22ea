use crate::db::queries;
use crate::error::SyncError;
use crate::service::sync::{SyncService, SyncSummary};
use axum::{
    extract::{Json, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

/// Request body of the reconciliation endpoints. Exactly one of `period` or
/// `invoiceNumber` must be present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub period: Option<PeriodFilter>,
    pub invoice_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodFilter {
    pub start_date: String,
    pub end_date: String,
}

/// Body of POST /api/sync/nf, the single-invoice endpoint.
#[derive(Debug, Deserialize)]
pub struct SyncNfRequest {
    #[serde(rename = "numeroNF")]
    pub numero_nf: String,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: SyncSummary,
}

#[derive(Debug, Serialize)]
pub struct SyncFailure {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl SyncFailure {
    fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: Vec::new(),
        }
    }
}

/// The validated sync mode extracted from a request.
#[derive(Debug, PartialEq, Eq)]
pub enum SyncMode {
    Periodo(NaiveDate, NaiveDate),
    Nota(String),
}

/// Validate the request shape and normalize its dates. A validation failure
/// is fatal to the whole call; no partial processing happens after it.
pub fn validar_request(req: &SyncRequest) -> Result<SyncMode, SyncError> {
    match (&req.period, &req.invoice_number) {
        (Some(_), Some(_)) => Err(SyncError::Validation(
            "informe apenas um filtro: period ou invoiceNumber".to_string(),
        )),
        (None, None) => Err(SyncError::Validation(
            "informe period ou invoiceNumber".to_string(),
        )),
        (Some(p), None) => {
            let inicio = parse_data_flex(&p.start_date).ok_or_else(|| {
                SyncError::Validation(format!("startDate inválida: {}", p.start_date))
            })?;
            let fim = parse_data_flex(&p.end_date).ok_or_else(|| {
                SyncError::Validation(format!("endDate inválida: {}", p.end_date))
            })?;
            if inicio > fim {
                return Err(SyncError::Validation(
                    "startDate posterior a endDate".to_string(),
                ));
            }
            Ok(SyncMode::Periodo(inicio, fim))
        }
        (None, Some(numero)) => {
            let numero = numero.trim();
            if numero.is_empty() {
                Err(SyncError::Validation("invoiceNumber vazio".to_string()))
            } else {
                Ok(SyncMode::Nota(numero.to_string()))
            }
        }
    }
}

/// Dates arrive as ISO (`YYYY-MM-DD`) or Brazilian (`DD/MM/YYYY`); both are
/// normalized to `NaiveDate` before any query runs.
pub fn parse_data_flex(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(t, "%d/%m/%Y"))
        .ok()
}

/// Health check.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Reconciliation endpoint: all invoices of a period, or one by number.
pub async fn sync_nf_movimentacoes(
    State(service): State<Arc<SyncService>>,
    Json(req): Json<SyncRequest>,
) -> Response {
    let mode = match validar_request(&req) {
        Ok(mode) => mode,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(SyncFailure::new(e.to_string())))
                .into_response();
        }
    };

    let resultado = match mode {
        SyncMode::Periodo(inicio, fim) => service.sync_period(inicio, fim).await,
        SyncMode::Nota(numero) => service.sync_invoice(&numero).await,
    };

    responder(resultado)
}

/// Single-invoice endpoint kept for the callers of the original system.
pub async fn sync_nf(
    State(service): State<Arc<SyncService>>,
    Json(req): Json<SyncNfRequest>,
) -> Response {
    let numero = req.numero_nf.trim().to_string();
    if numero.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SyncFailure::new("numeroNF vazio")),
        )
            .into_response();
    }

    responder(service.sync_invoice(&numero).await)
}

fn responder(resultado: Result<SyncSummary, SyncError>) -> Response {
    match resultado {
        Ok(summary) => (
            StatusCode::OK,
            Json(SyncResponse {
                success: true,
                summary,
            }),
        )
            .into_response(),
        Err(SyncError::NotFound(numero)) => (
            StatusCode::NOT_FOUND,
            Json(SyncFailure::new(format!(
                "nota fiscal {} não encontrada",
                numero
            ))),
        )
            .into_response(),
        Err(e @ SyncError::Validation(_)) => {
            (StatusCode::BAD_REQUEST, Json(SyncFailure::new(e.to_string()))).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SyncFailure::new(format!("erro na sincronização: {}", e))),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub periodo: String,
}

/// CSV dump of one period's ledger rows.
pub async fn export_movimentacoes(
    State(pool): State<PgPool>,
    Query(params): Query<ExportParams>,
) -> Response {
    let rows = match queries::list_movimentacoes_periodo(&pool, &params.periodo).await {
        Ok(rows) => rows,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SyncFailure::new(format!("erro ao consultar movimentações: {}", e))),
            )
                .into_response();
        }
    };

    match queries::export_movimentacoes_csv(&rows) {
        Ok(csv) => ([(header::CONTENT_TYPE, "text/csv")], csv).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SyncFailure::new(format!("erro ao exportar CSV: {}", e))),
        )
            .into_response(),
    }
}
