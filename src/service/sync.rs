use crate::db::queries;
use crate::error::SyncError;
use crate::models::NotaFiscal;
use crate::service::ledger::{self, LedgerWriter};
use crate::service::parser::{self, ParseOutcome};
use crate::service::rules::RuleSet;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::time::Duration;

/// Effective filter of a run, echoed back in the response.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SyncFilter {
    #[serde(rename_all = "camelCase")]
    Periodo { start_date: String, end_date: String },
    #[serde(rename_all = "camelCase")]
    Nota { invoice_number: String },
}

/// Outcome of one sync invocation. `errors` lists per-invoice and per-item
/// failures; `warnings` lists partial successes. A period-scoped run always
/// comes back as a summary, never as a bare error.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub processed: usize,
    pub inserted: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub filter: SyncFilter,
}

impl SyncSummary {
    fn new(filter: SyncFilter) -> Self {
        Self {
            processed: 0,
            inserted: 0,
            skipped: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            filter,
        }
    }
}

/// Top-level entry point of the reconciliation pipeline: loops the selected
/// invoices, parses items, classifies the entity and drives the ledger
/// writer. Stateless across invocations: re-running is the retry mechanism,
/// backed by the writer's purge-then-insert idempotence.
///
/// Concurrent runs for the same invoice number are not safe against
/// interleaving; callers must serialize per invoice number.
pub struct SyncService {
    pool: PgPool,
    rules: RuleSet,
    writer: LedgerWriter,
    timeout: Duration,
}

impl SyncService {
    pub fn new(pool: PgPool, rules: RuleSet, timeout: Duration) -> Self {
        let writer = LedgerWriter::new(pool.clone());
        Self {
            pool,
            rules,
            writer,
            timeout,
        }
    }

    /// Reconcile every invoice issued inside [inicio, fim].
    pub async fn sync_period(
        &self,
        inicio: NaiveDate,
        fim: NaiveDate,
    ) -> Result<SyncSummary, SyncError> {
        let run = self.executar_periodo(inicio, fim);
        match tokio::time::timeout(self.timeout, run).await {
            Ok(resultado) => resultado,
            Err(_) => Err(SyncError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Reconcile a single invoice by its number.
    pub async fn sync_invoice(&self, numero: &str) -> Result<SyncSummary, SyncError> {
        let run = self.executar_nota(numero);
        match tokio::time::timeout(self.timeout, run).await {
            Ok(resultado) => resultado,
            Err(_) => Err(SyncError::Timeout(self.timeout.as_secs())),
        }
    }

    async fn executar_periodo(
        &self,
        inicio: NaiveDate,
        fim: NaiveDate,
    ) -> Result<SyncSummary, SyncError> {
        let notas = queries::list_notas_periodo(&self.pool, inicio, fim).await?;
        let mut summary = SyncSummary::new(SyncFilter::Periodo {
            start_date: inicio.to_string(),
            end_date: fim.to_string(),
        });

        tracing::info!("Sync started: {} invoices in {}..{}", notas.len(), inicio, fim);

        for nf in &notas {
            self.sync_one(nf, &mut summary).await;
        }

        tracing::info!(
            "Sync finished: {} processed, {} inserted, {} skipped, {} errors",
            summary.processed,
            summary.inserted,
            summary.skipped,
            summary.errors.len()
        );
        Ok(summary)
    }

    async fn executar_nota(&self, numero: &str) -> Result<SyncSummary, SyncError> {
        let nf = queries::get_nota_por_numero(&self.pool, numero)
            .await?
            .ok_or_else(|| SyncError::NotFound(numero.to_string()))?;

        let mut summary = SyncSummary::new(SyncFilter::Nota {
            invoice_number: numero.to_string(),
        });
        self.sync_one(&nf, &mut summary).await;
        Ok(summary)
    }

    /// Reconcile one invoice. Failures land in the summary instead of
    /// propagating, so one bad invoice never aborts a period-scoped batch,
    /// and invoices already committed stay committed.
    async fn sync_one(&self, nf: &NotaFiscal, summary: &mut SyncSummary) {
        summary.processed += 1;

        // a missing or unparseable date is a hard failure for this invoice,
        // never defaulted to "now"
        let Some(data) = nf.data_emissao else {
            summary
                .errors
                .push(format!("NF {}: sem data de emissão, ignorada", nf.numero));
            return;
        };
        let periodo = data.format("%Y-%m").to_string();

        let itens = match queries::list_itens(&self.pool, nf.id).await {
            Ok(itens) => itens,
            Err(e) => {
                summary
                    .errors
                    .push(format!("NF {}: falha ao ler itens: {}", nf.numero, e));
                return;
            }
        };

        let outcomes: Vec<ParseOutcome> = itens
            .iter()
            .enumerate()
            .map(|(i, item)| parser::parse_item(&item.dados, i))
            .collect();

        let entidades = self.rules.classify(nf);
        if entidades.is_empty() {
            tracing::warn!("NF {}: no entity rule matched, nothing posted", nf.numero);
            summary.skipped += itens.len();
            summary.warnings.push(format!(
                "NF {}: nenhuma entidade identificada, nada lançado",
                nf.numero
            ));
            return;
        }

        let animais = self.resolver_animais(&outcomes).await;
        let plan = ledger::build_entries(nf, &periodo, &outcomes, &entidades, &animais);

        for outcome in &outcomes {
            if let ParseOutcome::Unidentified { item_index, reason } = outcome {
                let erro = SyncError::Parse {
                    numero: nf.numero.clone(),
                    index: item_index + 1,
                    reason: reason.clone(),
                };
                tracing::warn!("{}", erro);
                summary.errors.push(erro.to_string());
            }
        }
        summary.skipped += plan.skipped.len();

        // every item failed parsing: hard failure, ledger left untouched
        if !itens.is_empty() && plan.entries.is_empty() {
            summary.errors.push(format!(
                "NF {}: nenhum item aproveitável, nota não sincronizada",
                nf.numero
            ));
            return;
        }

        match self.writer.reconcile(&nf.numero, &nf.tipo, &plan.entries).await {
            Ok(inseridas) => {
                summary.inserted += inseridas as usize;
                if !plan.skipped.is_empty() {
                    summary.warnings.push(format!(
                        "NF {}: {} de {} itens sincronizados",
                        nf.numero,
                        itens.len() - plan.skipped.len(),
                        itens.len()
                    ));
                }
            }
            Err(e) => {
                tracing::error!("NF {}: reconcile failed: {}", nf.numero, e);
                summary
                    .errors
                    .push(format!("NF {}: falha ao gravar movimentações: {}", nf.numero, e));
            }
        }
    }

    /// Resolve parsed tattoos to animal ids. Lookup failures only cost the
    /// link, not the entry.
    async fn resolver_animais(&self, outcomes: &[ParseOutcome]) -> HashMap<String, i64> {
        let mut animais = HashMap::new();
        for item in outcomes.iter().filter_map(|o| o.parsed()) {
            let Some(tatuagem) = item.tatuagem.as_deref() else {
                continue;
            };
            if animais.contains_key(tatuagem) {
                continue;
            }
            match queries::find_animal_por_tatuagem(&self.pool, tatuagem).await {
                Ok(Some(id)) => {
                    animais.insert(tatuagem.to_string(), id);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("animal lookup failed for tattoo {}: {}", tatuagem, e);
                }
            }
        }
        animais
    }
}
