use crate::error::SyncError;
use crate::models::{Movimentacao, MovimentacaoRow, NotaFiscal, NotaFiscalItem};
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

/// Fetch one invoice header by its number.
pub async fn get_nota_por_numero(
    pool: &PgPool,
    numero: &str,
) -> Result<Option<NotaFiscal>, sqlx::Error> {
    sqlx::query_as::<_, NotaFiscal>(
        r#"
        SELECT id, numero, tipo, nome_emitente, cnpj_emitente,
               data_emissao, valor_total, inscricao
        FROM nota_fiscal
        WHERE numero = $1
        "#,
    )
    .bind(numero)
    .fetch_optional(pool)
    .await
}

/// Fetch the invoice headers issued inside [inicio, fim].
pub async fn list_notas_periodo(
    pool: &PgPool,
    inicio: NaiveDate,
    fim: NaiveDate,
) -> Result<Vec<NotaFiscal>, sqlx::Error> {
    sqlx::query_as::<_, NotaFiscal>(
        r#"
        SELECT id, numero, tipo, nome_emitente, cnpj_emitente,
               data_emissao, valor_total, inscricao
        FROM nota_fiscal
        WHERE data_emissao BETWEEN $1 AND $2
        ORDER BY data_emissao, numero
        "#,
    )
    .bind(inicio)
    .bind(fim)
    .fetch_all(pool)
    .await
}

/// Fetch the line items of one invoice, in insertion order.
pub async fn list_itens(
    pool: &PgPool,
    nota_fiscal_id: i64,
) -> Result<Vec<NotaFiscalItem>, sqlx::Error> {
    sqlx::query_as::<_, NotaFiscalItem>(
        r#"
        SELECT id, nota_fiscal_id, dados
        FROM nota_fiscal_item
        WHERE nota_fiscal_id = $1
        ORDER BY id
        "#,
    )
    .bind(nota_fiscal_id)
    .fetch_all(pool)
    .await
}

/// Resolve a tattoo/tag to an animal id, when the registry knows it.
pub async fn find_animal_por_tatuagem(
    pool: &PgPool,
    tatuagem: &str,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id FROM animal WHERE tatuagem = $1 LIMIT 1
        "#,
    )
    .bind(tatuagem)
    .fetch_optional(pool)
    .await
}

/// Delete every ledger row derived from one (invoice number, direction)
/// pair. Rows are matched by the invoice number echoed into their
/// dados_extras payload.
pub async fn purge_movimentacoes(
    tx: &mut Transaction<'_, Postgres>,
    numero: &str,
    tipo: &str,
) -> Result<u64, sqlx::Error> {
    sqlx::query(
        r#"
        DELETE FROM movimentacao_contabil
        WHERE dados_extras->>'numero_nf' = $1
          AND tipo = $2
        "#,
    )
    .bind(numero)
    .bind(tipo)
    .execute(&mut **tx)
    .await
    .map(|r| r.rows_affected())
}

/// Batch-insert the planned ledger rows for one invoice.
pub async fn insert_movimentacoes(
    tx: &mut Transaction<'_, Postgres>,
    entries: &[Movimentacao],
) -> Result<u64, SyncError> {
    if entries.is_empty() {
        return Ok(0);
    }

    // serialize the extras payloads up front so a bad one fails before any
    // row is written
    let payloads = entries
        .iter()
        .map(|e| serde_json::to_value(&e.dados_extras))
        .collect::<Result<Vec<_>, _>>()?;

    let mut query_builder = sqlx::QueryBuilder::new(
        "INSERT INTO movimentacao_contabil (
            tipo, valor, descricao, localidade, periodo,
            animal_id, dados_extras, criado_em
        ) ",
    );

    query_builder.push_values(entries.iter().zip(payloads), |mut b, (e, extras)| {
        b.push_bind(&e.tipo)
            .push_bind(e.valor.clone())
            .push_bind(&e.descricao)
            .push_bind(&e.localidade)
            .push_bind(&e.periodo)
            .push_bind(e.animal_id)
            .push_bind(extras)
            .push_bind(e.criado_em);
    });

    let result = query_builder.build().execute(&mut **tx).await?;
    Ok(result.rows_affected())
}

/// Fetch the ledger rows of one period for reporting.
pub async fn list_movimentacoes_periodo(
    pool: &PgPool,
    periodo: &str,
) -> Result<Vec<MovimentacaoRow>, sqlx::Error> {
    sqlx::query_as::<_, MovimentacaoRow>(
        r#"
        SELECT id, tipo, valor, descricao, localidade, periodo,
               animal_id, dados_extras, criado_em
        FROM movimentacao_contabil
        WHERE periodo = $1
        ORDER BY id
        "#,
    )
    .bind(periodo)
    .fetch_all(pool)
    .await
}

fn option_to_csv(val: &Option<i64>) -> String {
    val.map(|v| v.to_string()).unwrap_or_default()
}

/// Render ledger rows as CSV (PostgreSQL COPY compatible), for the
/// bookkeeping reports that consume the ledger outside this service.
pub fn export_movimentacoes_csv(
    rows: &[MovimentacaoRow],
) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    use csv::Writer;

    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record([
        "id",
        "tipo",
        "valor",
        "descricao",
        "localidade",
        "periodo",
        "animal_id",
        "dados_extras",
        "criado_em",
    ])?;

    for row in rows {
        writer.write_record(&[
            row.id.to_string(),
            row.tipo.clone(),
            row.valor.to_string(),
            row.descricao.clone(),
            row.localidade.clone(),
            row.periodo.clone(),
            option_to_csv(&row.animal_id),
            row.dados_extras.to_string(),
            row.criado_em.to_rfc3339(),
        ])?;
    }

    Ok(writer.into_inner()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    #[test]
    fn export_csv_inclui_cabecalho_e_payload() {
        let rows = vec![MovimentacaoRow {
            id: 1,
            tipo: "entrada".to_string(),
            valor: BigDecimal::from_str("6000.00").unwrap(),
            descricao: "NF 4346 - 5x Macho".to_string(),
            localidade: "AGROPECUÁRIA PARDINHO LTDA".to_string(),
            periodo: "2025-03".to_string(),
            animal_id: None,
            dados_extras: serde_json::json!({"numero_nf": "4346", "quantidade": 5}),
            criado_em: Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap(),
        }];

        let bytes = export_movimentacoes_csv(&rows).unwrap();
        let texto = String::from_utf8(bytes).unwrap();
        let mut linhas = texto.lines();
        assert!(linhas.next().unwrap().starts_with("id,tipo,valor"));
        let linha = linhas.next().unwrap();
        assert!(linha.contains("6000.00"));
        assert!(linha.contains("numero_nf"));
        assert!(linha.contains("2025-03"));
    }
}
