use crate::models::NotaFiscal;
use indexmap::IndexSet;

/// One legal entity and the evidence that attributes an invoice to it.
/// Rules are data, not code: the table is injected into the service so it can
/// be extended or replaced without touching the pipeline.
#[derive(Debug, Clone)]
pub struct EntityRule {
    /// Ledger locality label this rule posts to.
    pub entidade: String,
    /// Known tax ids, stored normalized (digits only).
    pub cnpjs: Vec<String>,
    /// Case-insensitive substrings matched against the counterparty name.
    pub nome_padroes: Vec<String>,
    /// Legal inscription labels accepted for `entrada` invoices.
    pub inscricoes: Vec<String>,
}

impl EntityRule {
    /// Whether this rule fires for the given invoice evidence. `saida`
    /// invoices are eligible on tax id or name alone; `entrada` invoices get
    /// the extra inscription path.
    fn dispara(&self, cnpj: &str, nome_upper: &str, entrada: bool, inscricao: Option<&str>) -> bool {
        if !cnpj.is_empty() && self.cnpjs.iter().any(|c| c == cnpj) {
            return true;
        }
        if self
            .nome_padroes
            .iter()
            .any(|p| nome_upper.contains(p.as_str()))
        {
            return true;
        }
        if entrada {
            if let Some(insc) = inscricao {
                let insc = insc.trim();
                return self.inscricoes.iter().any(|known| known == insc);
            }
        }
        false
    }
}

/// The injectable rule table. `classify` returns EVERY entity whose rule
/// fires: an invoice matching one entity's tax id and another's name posts to
/// both ledgers. That dual-post behavior is inherited from the books as they
/// are kept today; do not collapse it to first-match-wins without a decision
/// from accounting.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<EntityRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<EntityRule>) -> Self {
        Self { rules }
    }

    /// The two entities the books are currently split across.
    pub fn padrao() -> Self {
        Self::new(vec![
            EntityRule {
                entidade: "AGROPECUÁRIA PARDINHO LTDA".to_string(),
                cnpjs: vec!["18978214000445".to_string(), "18978214000104".to_string()],
                nome_padroes: vec!["PARDINHO".to_string()],
                inscricoes: vec!["283.240.150.117".to_string()],
            },
            EntityRule {
                entidade: "FAZENDA SANT ANNA".to_string(),
                cnpjs: vec!["04929432000101".to_string()],
                nome_padroes: vec!["SANT ANNA".to_string(), "SANTANNA".to_string()],
                inscricoes: vec!["283.042.801.112".to_string()],
            },
        ])
    }

    /// Entities the invoice's value posts to, in rule-table order, deduped.
    pub fn classify(&self, nf: &NotaFiscal) -> Vec<String> {
        let cnpj = nf
            .cnpj_emitente
            .as_deref()
            .map(normalize_cnpj)
            .unwrap_or_default();
        let nome_upper = nf.nome_emitente.to_uppercase();
        let entrada = nf.is_entrada();

        let mut entidades: IndexSet<String> = IndexSet::new();
        for rule in &self.rules {
            if rule.dispara(&cnpj, &nome_upper, entrada, nf.inscricao.as_deref()) {
                entidades.insert(rule.entidade.clone());
            }
        }
        entidades.into_iter().collect()
    }
}

/// Strip punctuation and whitespace from a tax id: "18.978.214/0004-45" and
/// "18978214000445" compare equal.
pub fn normalize_cnpj(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn nota(
        tipo: &str,
        nome: &str,
        cnpj: Option<&str>,
        inscricao: Option<&str>,
    ) -> NotaFiscal {
        NotaFiscal {
            id: 1,
            numero: "1001".to_string(),
            tipo: tipo.to_string(),
            nome_emitente: nome.to_string(),
            cnpj_emitente: cnpj.map(|c| c.to_string()),
            data_emissao: NaiveDate::from_ymd_opt(2025, 3, 10),
            valor_total: BigDecimal::from(1000),
            inscricao: inscricao.map(|i| i.to_string()),
        }
    }

    #[test]
    fn cnpj_pontuado_e_liso_casam_na_mesma_regra() {
        assert_eq!(normalize_cnpj("18.978.214/0004-45"), "18978214000445");
        let regras = RuleSet::padrao();

        let pontuado = nota("saida", "Frigorífico XYZ", Some("18.978.214/0004-45"), None);
        let liso = nota("saida", "Frigorífico XYZ", Some("18978214000445"), None);
        assert_eq!(regras.classify(&pontuado), regras.classify(&liso));
        assert_eq!(
            regras.classify(&liso),
            vec!["AGROPECUÁRIA PARDINHO LTDA".to_string()]
        );
    }

    #[test]
    fn nome_casa_por_substring_sem_caixa() {
        let regras = RuleSet::padrao();
        let nf = nota("saida", "Agropecuária Pardinho Ltda", None, None);
        assert_eq!(
            regras.classify(&nf),
            vec!["AGROPECUÁRIA PARDINHO LTDA".to_string()]
        );
    }

    #[test]
    fn dual_post_quando_duas_regras_disparam() {
        // inherited quirk: tax id of one entity + name of the other fires
        // both books; keep until accounting decides otherwise
        let regras = RuleSet::padrao();
        let nf = nota(
            "saida",
            "FAZENDA SANT ANNA COMERCIO",
            Some("18.978.214/0004-45"),
            None,
        );
        assert_eq!(
            regras.classify(&nf),
            vec![
                "AGROPECUÁRIA PARDINHO LTDA".to_string(),
                "FAZENDA SANT ANNA".to_string()
            ]
        );
    }

    #[test]
    fn entrada_aceita_inscricao_conhecida() {
        let regras = RuleSet::padrao();
        let nf = nota("entrada", "Produtor avulso", None, Some("283.240.150.117"));
        assert_eq!(
            regras.classify(&nf),
            vec!["AGROPECUÁRIA PARDINHO LTDA".to_string()]
        );
    }

    #[test]
    fn saida_ignora_inscricao() {
        let regras = RuleSet::padrao();
        let nf = nota("saida", "Produtor avulso", None, Some("283.240.150.117"));
        assert!(regras.classify(&nf).is_empty());
    }

    #[test]
    fn sem_evidencia_nenhuma_regra_dispara() {
        let regras = RuleSet::padrao();
        let nf = nota("entrada", "Leilão Rural SP", Some("11.222.333/0001-44"), None);
        assert!(regras.classify(&nf).is_empty());
    }
}
