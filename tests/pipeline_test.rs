use beef_sync_rust::models::NotaFiscal;
use beef_sync_rust::service::ledger::build_entries;
use beef_sync_rust::service::parser::{parse_item, ParseOutcome};
use beef_sync_rust::service::rules::RuleSet;
use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde_json::json;
use std::collections::HashMap;
use std::str::FromStr;

fn nota(numero: &str, tipo: &str, nome: &str, cnpj: Option<&str>, total: &str) -> NotaFiscal {
    NotaFiscal {
        id: 1,
        numero: numero.to_string(),
        tipo: tipo.to_string(),
        nome_emitente: nome.to_string(),
        cnpj_emitente: cnpj.map(|c| c.to_string()),
        data_emissao: NaiveDate::from_ymd_opt(2025, 3, 10),
        valor_total: BigDecimal::from_str(total).unwrap(),
        inscricao: None,
    }
}

fn reconciliar(nf: &NotaFiscal, itens: &[serde_json::Value]) -> Vec<beef_sync_rust::models::Movimentacao> {
    let outcomes: Vec<ParseOutcome> = itens
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_item(raw, i))
        .collect();
    let entidades = RuleSet::padrao().classify(nf);
    let periodo = nf.data_emissao.unwrap().format("%Y-%m").to_string();
    build_entries(nf, &periodo, &outcomes, &entidades, &HashMap::new()).entries
}

#[test]
fn nota_4346_gera_um_lancamento_de_6000() {
    let nf = nota(
        "4346",
        "entrada",
        "AGROPECUÁRIA PARDINHO LTDA",
        None,
        "6000.00",
    );
    let itens = vec![json!({
        "quantidade": 5,
        "sexo": "Macho",
        "valorUnitario": "1.200,00"
    })];

    let entries = reconciliar(&nf, &itens);

    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.valor, BigDecimal::from_str("6000.00").unwrap());
    assert_eq!(entry.localidade, "AGROPECUÁRIA PARDINHO LTDA");
    assert_eq!(entry.tipo, "entrada");
    assert_eq!(entry.periodo, "2025-03");

    let extras = serde_json::to_value(&entry.dados_extras).unwrap();
    assert_eq!(extras["numero_nf"], "4346");
    assert_eq!(extras["quantidade"], 5);
    assert_eq!(extras["sexo"], "Macho");
}

#[test]
fn replanejar_e_deterministico() {
    // same invoice, same items, two runs: identical plans. Combined with the
    // writer's purge-by-invoice-number, a re-run leaves the ledger unchanged.
    let nf = nota("5010", "saida", "FAZENDA SANT ANNA", None, "3000.00");
    let itens = vec![
        json!({"quantidade": 2, "sexo": "F", "valorUnitario": "750,00"}),
        json!({"quantidade": 3, "sexo": "M", "valorUnitario": "500,00"}),
    ];

    let a = reconciliar(&nf, &itens);
    let b = reconciliar(&nf, &itens);

    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.valor, y.valor);
        assert_eq!(x.localidade, y.localidade);
        assert_eq!(x.dados_extras, y.dados_extras);
    }
}

#[test]
fn alocacao_sem_precos_fecha_com_o_total() {
    // declared total, no unit prices anywhere: proportional allocation must
    // sum back exactly, odd cents included
    let nf = nota("5020", "entrada", "AGROPECUÁRIA PARDINHO LTDA", None, "1000.01");
    let itens = vec![
        json!({"quantidade": 3, "sexo": "M"}),
        json!({"quantidade": 3, "sexo": "F"}),
        json!({"quantidade": 1, "sexo": "F"}),
    ];

    let entries = reconciliar(&nf, &itens);

    assert_eq!(entries.len(), 3);
    let soma = entries
        .iter()
        .fold(BigDecimal::zero(), |acc, e| acc + &e.valor);
    assert_eq!(soma, BigDecimal::from_str("1000.01").unwrap());
}

#[test]
fn nota_com_cnpj_e_nome_de_entidades_diferentes_posta_nos_dois_livros() {
    // documented dual-post quirk, preserved end to end
    let nf = nota(
        "5030",
        "saida",
        "FAZENDA SANT ANNA LTDA",
        Some("18.978.214/0004-45"),
        "500.00",
    );
    let itens = vec![json!({"quantidade": 1, "sexo": "M", "valorUnitario": "500,00"})];

    let entries = reconciliar(&nf, &itens);

    let localidades: Vec<&str> = entries.iter().map(|e| e.localidade.as_str()).collect();
    assert_eq!(
        localidades,
        vec!["AGROPECUÁRIA PARDINHO LTDA", "FAZENDA SANT ANNA"]
    );
}

#[test]
fn itens_ilegiveis_e_legiveis_convivem() {
    let nf = nota("5040", "entrada", "AGROPECUÁRIA PARDINHO LTDA", None, "900.00");
    let itens = vec![
        json!({}),
        json!({"quantidade": 2, "sexo": "Fêmea", "valorUnitario": "450,00"}),
    ];

    let outcomes: Vec<ParseOutcome> = itens
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_item(raw, i))
        .collect();
    let entidades = RuleSet::padrao().classify(&nf);
    let plan = build_entries(&nf, "2025-03", &outcomes, &entidades, &HashMap::new());

    assert_eq!(plan.skipped.len(), 1);
    assert_eq!(plan.entries.len(), 1);
    assert_eq!(plan.entries[0].valor, BigDecimal::from_str("900.00").unwrap());
}

#[test]
fn texto_legado_passa_pelo_pipeline() {
    let nf = nota("5050", "entrada", "AGROPECUÁRIA PARDINHO LTDA", None, "2550.00");
    let itens = vec![json!("3x Bezerro Nelore 0-7 R$ 850,00")];

    let entries = reconciliar(&nf, &itens);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].valor, BigDecimal::from_str("2550.00").unwrap());
    let extras = serde_json::to_value(&entries[0].dados_extras).unwrap();
    assert_eq!(extras["sexo"], "Macho");
    assert_eq!(extras["raca"], "Nelore");
    assert_eq!(extras["era"], "0-7");
    assert_eq!(extras["quantidade"], 3);
}
