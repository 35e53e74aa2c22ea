use crate::db::queries;
use crate::error::SyncError;
use crate::models::{DadosExtras, Movimentacao, NotaFiscal};
use crate::service::parser::ParseOutcome;
use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;

/// Ledger rows planned for one invoice, plus the items that could not be
/// turned into rows.
#[derive(Debug)]
pub struct EntryPlan {
    pub entries: Vec<Movimentacao>,
    pub skipped: Vec<String>,
}

/// Build the full set of ledger rows for one invoice: one row per parsed item
/// per fired entity. Pure; persistence lives in `LedgerWriter::reconcile`.
///
/// Value per row is unit price × quantity. When every unit price is missing,
/// the invoice's declared total is split across items by quantity share
/// instead. An invoice with no line items at all gets a single aggregate row
/// per entity carrying the declared total.
pub fn build_entries(
    nf: &NotaFiscal,
    periodo: &str,
    outcomes: &[ParseOutcome],
    entidades: &[String],
    animais: &HashMap<String, i64>,
) -> EntryPlan {
    let skipped: Vec<String> = outcomes
        .iter()
        .filter_map(|o| match o {
            ParseOutcome::Unidentified { item_index, reason } => {
                Some(format!("item {}: {}", item_index + 1, reason))
            }
            ParseOutcome::Parsed(_) => None,
        })
        .collect();

    let parsed: Vec<_> = outcomes.iter().filter_map(|o| o.parsed()).collect();

    let mut entries = Vec::new();

    if outcomes.is_empty() {
        // invoice without line items: post the declared total as one
        // aggregate row per entity
        for entidade in entidades {
            entries.push(Movimentacao {
                tipo: nf.tipo.clone(),
                valor: nf.valor_total.clone(),
                descricao: format!("NF {} - lançamento integral", nf.numero),
                localidade: entidade.clone(),
                periodo: periodo.to_string(),
                animal_id: None,
                dados_extras: DadosExtras {
                    numero_nf: nf.numero.clone(),
                    ..DadosExtras::default()
                },
                criado_em: Utc::now(),
            });
        }
        return EntryPlan { entries, skipped };
    }

    if parsed.is_empty() {
        // items existed but none survived parsing; the orchestrator reports
        // this invoice as failed
        return EntryPlan { entries, skipped };
    }

    let sem_precos = parsed.iter().all(|p| p.valor_unitario.is_zero());
    let valores: Vec<BigDecimal> = if sem_precos {
        let quantidades: Vec<i64> = parsed.iter().map(|p| p.quantidade).collect();
        alocar_proporcional(&nf.valor_total, &quantidades)
    } else {
        parsed
            .iter()
            .map(|p| &p.valor_unitario * BigDecimal::from(p.quantidade))
            .collect()
    };

    for entidade in entidades {
        for (item, valor) in parsed.iter().zip(&valores) {
            entries.push(Movimentacao {
                tipo: nf.tipo.clone(),
                valor: valor.clone(),
                descricao: format!("NF {} - {}", nf.numero, item.descricao),
                localidade: entidade.clone(),
                periodo: periodo.to_string(),
                animal_id: item
                    .tatuagem
                    .as_deref()
                    .and_then(|t| animais.get(t).copied()),
                dados_extras: DadosExtras {
                    numero_nf: nf.numero.clone(),
                    sexo: item.sexo.map(|s| s.rotulo().to_string()),
                    era: item.era.as_ref().map(|e| e.rotulo()),
                    raca: item.raca.clone(),
                    tatuagem: item.tatuagem.clone(),
                    quantidade: Some(item.quantidade),
                    item_index: Some(item.item_index as i64),
                },
                criado_em: Utc::now(),
            });
        }
    }

    EntryPlan { entries, skipped }
}

/// Split `total` across items by quantity share, in integer cents, using the
/// largest-remainder method: floor every share, then hand leftover cents to
/// the largest truncated remainders (ties go to the lower item index). The
/// shares always sum back to `total` exactly.
pub fn alocar_proporcional(total: &BigDecimal, quantidades: &[i64]) -> Vec<BigDecimal> {
    let soma: i64 = quantidades.iter().sum();
    if quantidades.is_empty() || soma <= 0 {
        return quantidades.iter().map(|_| BigDecimal::zero()).collect();
    }

    let total_centavos: i128 = (total * BigDecimal::from(100))
        .round(0)
        .to_i128()
        .unwrap_or(0);
    let soma = soma as i128;

    let mut base: Vec<i128> = Vec::with_capacity(quantidades.len());
    let mut restos: Vec<(i128, usize)> = Vec::with_capacity(quantidades.len());
    for (i, &q) in quantidades.iter().enumerate() {
        let bruto = total_centavos * q as i128;
        base.push(bruto.div_euclid(soma));
        restos.push((bruto.rem_euclid(soma), i));
    }

    let mut sobra = total_centavos - base.iter().sum::<i128>();
    restos.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, idx) in restos {
        if sobra <= 0 {
            break;
        }
        base[idx] += 1;
        sobra -= 1;
    }

    base.into_iter()
        .map(|centavos| BigDecimal::new(BigInt::from(centavos), 2))
        .collect()
}

/// Makes the persisted ledger consistent with one invoice's planned rows.
pub struct LedgerWriter {
    pool: PgPool,
}

impl LedgerWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Purge-then-insert for one (invoice number, direction) pair, inside a
    /// single transaction: a failure mid-insert rolls back to the pre-purge
    /// state instead of leaving the ledger empty for that invoice. Re-running
    /// is therefore idempotent.
    pub async fn reconcile(
        &self,
        numero: &str,
        tipo: &str,
        entries: &[Movimentacao],
    ) -> Result<u64, SyncError> {
        let mut tx = self.pool.begin().await?;

        let purgadas = queries::purge_movimentacoes(&mut tx, numero, tipo).await?;
        let inseridas = if entries.is_empty() {
            0
        } else {
            queries::insert_movimentacoes(&mut tx, entries).await?
        };

        tx.commit().await?;

        tracing::debug!(
            "NF {} ({}): {} stale rows purged, {} inserted",
            numero,
            tipo,
            purgadas,
            inseridas
        );
        Ok(inseridas)
    }
}
