use crate::models::{Era, ParsedItem, Sexo};
use bigdecimal::{BigDecimal, Zero};
use serde_json::Value;
use std::str::FromStr;

/// Field aliases seen in stored items for the animal count.
const CAMPOS_QUANTIDADE: &[&str] = &["quantidade", "quantidadeAnimais", "qtd"];
const CAMPOS_VALOR: &[&str] = &["valorUnitario", "valor_unitario", "precoUnitario", "preco"];
const CAMPOS_ERA: &[&str] = &["era", "idade"];
const CAMPOS_TATUAGEM: &[&str] = &["tatuagem", "brinco", "tag"];

/// Breeds that show up in free-text descriptions, lowercase → canonical.
const RACAS_CONHECIDAS: &[(&str, &str)] = &[
    ("nelore", "Nelore"),
    ("angus", "Angus"),
    ("girolando", "Girolando"),
    ("gir", "Gir"),
    ("brahman", "Brahman"),
    ("senepol", "Senepol"),
    ("tabapua", "Tabapuã"),
    ("tabapuã", "Tabapuã"),
    ("guzera", "Guzerá"),
    ("guzerá", "Guzerá"),
    ("caracu", "Caracu"),
];

/// Cattle words that imply a sex in legacy free text. Feminine terms are
/// checked first, mirroring the fêmea-before-m rule of the literal matcher.
const TERMOS_FEMEA: &[&str] = &["femea", "vaca", "novilha", "bezerra", "matriz"];
const TERMOS_MACHO: &[&str] = &["macho", "boi", "touro", "bezerro", "novilho", "garrote"];

/// Result of parsing one line item. An unidentified item never aborts the
/// batch; it is counted separately and surfaced in the run summary.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Parsed(ParsedItem),
    Unidentified { item_index: usize, reason: String },
}

impl ParseOutcome {
    pub fn parsed(&self) -> Option<&ParsedItem> {
        match self {
            ParseOutcome::Parsed(p) => Some(p),
            ParseOutcome::Unidentified { .. } => None,
        }
    }
}

/// Normalize one raw line item. `raw` is either a structured JSON object or a
/// bare string with legacy free text.
pub fn parse_item(raw: &Value, item_index: usize) -> ParseOutcome {
    match raw {
        Value::Object(_) => parse_objeto(raw, item_index),
        Value::String(texto) => parse_texto_livre(texto, item_index),
        _ => ParseOutcome::Unidentified {
            item_index,
            reason: "conteúdo do item não é objeto nem texto".to_string(),
        },
    }
}

fn parse_objeto(raw: &Value, item_index: usize) -> ParseOutcome {
    // category-mode items carry the count inside the categoria object
    let quantidade = campo_inteiro(raw, CAMPOS_QUANTIDADE).or_else(|| {
        raw.get("categoria")
            .and_then(|c| campo_inteiro(c, CAMPOS_QUANTIDADE))
    });

    let valor_unitario = campo_decimal(raw, CAMPOS_VALOR).unwrap_or_else(BigDecimal::zero);
    let descricao = campo_texto(raw, &["descricao", "observacao"]);

    let sexo = campo_texto(raw, &["sexo"])
        .as_deref()
        .and_then(classify_sexo)
        .or_else(|| descricao.as_deref().and_then(sexo_do_texto));

    let era = campo_texto(raw, CAMPOS_ERA)
        .as_deref()
        .and_then(parse_era)
        .or_else(|| descricao.as_deref().and_then(era_do_texto));

    let raca = campo_texto(raw, &["raca"])
        .or_else(|| descricao.as_deref().and_then(raca_do_texto));

    let tatuagem = campo_texto(raw, CAMPOS_TATUAGEM);

    // minimal shape: an item with no count, no price and no identifiable sex
    // carries nothing the ledger can use
    if quantidade.is_none() && valor_unitario.is_zero() && sexo.is_none() {
        return ParseOutcome::Unidentified {
            item_index,
            reason: "sem quantidade, valor ou sexo identificável".to_string(),
        };
    }

    let quantidade = quantidade.unwrap_or(1);
    let descricao =
        descricao.unwrap_or_else(|| montar_descricao(quantidade, sexo, &raca, &era));

    ParseOutcome::Parsed(ParsedItem {
        item_index,
        quantidade,
        valor_unitario,
        sexo,
        era,
        raca,
        tatuagem,
        descricao,
    })
}

fn parse_texto_livre(texto: &str, item_index: usize) -> ParseOutcome {
    let aparado = texto.trim();
    if aparado.is_empty() {
        return ParseOutcome::Unidentified {
            item_index,
            reason: "descrição vazia".to_string(),
        };
    }

    let quantidade = quantidade_do_texto(aparado);
    let valor_unitario = valor_do_texto(aparado).unwrap_or_else(BigDecimal::zero);
    let sexo = sexo_do_texto(aparado);
    let era = era_do_texto(aparado);
    let raca = raca_do_texto(aparado);

    if quantidade.is_none() && valor_unitario.is_zero() && sexo.is_none() {
        return ParseOutcome::Unidentified {
            item_index,
            reason: format!("texto não reconhecido: \"{}\"", aparado),
        };
    }

    ParseOutcome::Parsed(ParsedItem {
        item_index,
        quantidade: quantidade.unwrap_or(1),
        valor_unitario,
        sexo,
        era,
        raca,
        tatuagem: None,
        descricao: aparado.to_string(),
    })
}

/// Classify an explicit sex value into Macho/Fêmea, or `None` when the text
/// names neither. Exact literals are checked before substring containment:
/// a bare "m" must only match as a whole value, otherwise "fêmea" (and any
/// word containing 'm') would spuriously classify as male.
pub fn classify_sexo(raw: &str) -> Option<Sexo> {
    let t = normalizar_texto(raw);
    if t.is_empty() {
        return None;
    }
    match t.as_str() {
        "macho" | "m" => return Some(Sexo::Macho),
        "femea" | "f" => return Some(Sexo::Femea),
        _ => {}
    }
    if t.contains("femea") {
        return Some(Sexo::Femea);
    }
    if t.contains("macho") {
        return Some(Sexo::Macho);
    }
    None
}

/// Sex from legacy free text: the literal matcher first, then cattle words
/// that imply a sex ("vaca", "bezerro"). Feminine terms win on a draw.
pub fn sexo_do_texto(texto: &str) -> Option<Sexo> {
    if let Some(s) = classify_sexo(texto) {
        return Some(s);
    }
    let t = normalizar_texto(texto);
    for palavra in t.split(|c: char| !c.is_alphanumeric()) {
        if TERMOS_FEMEA.contains(&palavra) {
            return Some(Sexo::Femea);
        }
    }
    for palavra in t.split(|c: char| !c.is_alphanumeric()) {
        if TERMOS_MACHO.contains(&palavra) {
            return Some(Sexo::Macho);
        }
    }
    None
}

/// Parse one era value: "0-7", "24+" or "36 meses".
pub fn parse_era(raw: &str) -> Option<Era> {
    let t = raw.trim().to_lowercase();
    if let Some(resto) = t.strip_suffix('+') {
        if let Ok(n) = resto.trim().parse() {
            return Some(Era::Acima(n));
        }
    }
    if let Some((a, b)) = t.split_once('-') {
        if let (Ok(a), Ok(b)) = (a.trim().parse(), b.trim().parse()) {
            return Some(Era::Faixa(a, b));
        }
    }
    for sufixo in ["meses", "mes", "mês"] {
        if let Some(resto) = t.strip_suffix(sufixo) {
            if let Ok(n) = resto.trim().parse() {
                return Some(Era::Meses(n));
            }
        }
    }
    None
}

/// Scan free text for an era pattern, token by token ("36 meses" spans two
/// tokens, so adjacent pairs are tried as well).
pub fn era_do_texto(texto: &str) -> Option<Era> {
    let tokens: Vec<&str> = texto.split_whitespace().collect();
    for janela in tokens.windows(2) {
        if let Some(era) = parse_era(&format!("{} {}", janela[0], janela[1])) {
            return Some(era);
        }
    }
    tokens.iter().find_map(|t| parse_era(t))
}

pub fn raca_do_texto(texto: &str) -> Option<String> {
    let t = normalizar_texto(texto);
    for palavra in t.split(|c: char| !c.is_alphanumeric()) {
        for (chave, canonico) in RACAS_CONHECIDAS {
            if palavra == *chave {
                return Some((*canonico).to_string());
            }
        }
    }
    None
}

/// Parse a monetary string tolerating the Brazilian comma decimal:
/// "1.234,56" → 1234.56. Plain "1234.56" is accepted unchanged.
pub fn parse_decimal_br(raw: &str) -> Option<BigDecimal> {
    let t = raw
        .trim()
        .trim_start_matches("R$")
        .trim_start_matches("r$")
        .trim();
    if t.is_empty() {
        return None;
    }
    let normalizado = if t.contains(',') {
        t.replace('.', "").replace(',', ".")
    } else {
        t.to_string()
    };
    BigDecimal::from_str(&normalizado).ok()
}

fn quantidade_do_texto(texto: &str) -> Option<i64> {
    let primeiro = texto.split_whitespace().next()?;
    let lower = primeiro.to_lowercase();
    // "5x Bezerro ..." or a bare leading count
    if let Some(prefixo) = lower.strip_suffix('x') {
        if let Ok(n) = prefixo.parse::<i64>() {
            if n > 0 {
                return Some(n);
            }
        }
    }
    if let Ok(n) = lower.parse::<i64>() {
        // counts, not tattoo numbers: keep it small
        if n > 0 && n < 10_000 {
            return Some(n);
        }
    }
    None
}

fn valor_do_texto(texto: &str) -> Option<BigDecimal> {
    let tokens: Vec<&str> = texto.split_whitespace().collect();
    for (i, token) in tokens.iter().enumerate() {
        let lower = token.to_lowercase();
        if lower == "r$" {
            if let Some(proximo) = tokens.get(i + 1) {
                if let Some(v) = parse_decimal_br(proximo) {
                    return Some(v);
                }
            }
        }
        if let Some(resto) = lower.strip_prefix("r$") {
            if let Some(v) = parse_decimal_br(resto) {
                return Some(v);
            }
        }
        // money in legacy text always carries the decimal comma
        if token.contains(',') {
            if let Some(v) = parse_decimal_br(token) {
                return Some(v);
            }
        }
    }
    None
}

fn montar_descricao(
    quantidade: i64,
    sexo: Option<Sexo>,
    raca: &Option<String>,
    era: &Option<Era>,
) -> String {
    let mut partes = vec![format!("{}x", quantidade)];
    if let Some(s) = sexo {
        partes.push(s.rotulo().to_string());
    }
    if let Some(r) = raca {
        partes.push(r.clone());
    }
    if let Some(e) = era {
        partes.push(e.rotulo());
    }
    partes.join(" ")
}

/// Lowercase and fold the accented vowels that show up in this domain, so
/// "Fêmea"/"FEMEA"/"fêmea " all compare equal.
fn normalizar_texto(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['ê', 'é'], "e")
        .replace(['á', 'ã', 'â'], "a")
        .replace(['ô', 'õ'], "o")
        .replace(['í'], "i")
        .replace(['ú'], "u")
}

fn campo_texto(raw: &Value, campos: &[&str]) -> Option<String> {
    for campo in campos {
        if let Some(v) = raw.get(campo) {
            if let Some(s) = v.as_str() {
                let s = s.trim();
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

fn campo_inteiro(raw: &Value, campos: &[&str]) -> Option<i64> {
    for campo in campos {
        if let Some(v) = raw.get(campo) {
            if let Some(n) = v.as_i64() {
                if n > 0 {
                    return Some(n);
                }
            }
            if let Some(f) = v.as_f64() {
                if f > 0.0 {
                    return Some(f as i64);
                }
            }
            if let Some(s) = v.as_str() {
                if let Ok(n) = s.trim().parse::<i64>() {
                    if n > 0 {
                        return Some(n);
                    }
                }
            }
        }
    }
    None
}

fn campo_decimal(raw: &Value, campos: &[&str]) -> Option<BigDecimal> {
    for campo in campos {
        if let Some(v) = raw.get(campo) {
            if let Some(s) = v.as_str() {
                if let Some(d) = parse_decimal_br(s) {
                    return Some(d);
                }
            }
            if v.is_number() {
                if let Ok(d) = BigDecimal::from_str(&v.to_string()) {
                    return Some(d);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sexo_literais_masculinos() {
        for entrada in ["Macho", "M", "macho ", "MACHO", "m"] {
            assert_eq!(classify_sexo(entrada), Some(Sexo::Macho), "{:?}", entrada);
        }
    }

    #[test]
    fn sexo_literais_femininos() {
        for entrada in ["Fêmea", "femea", "F", "fêmea ", "FEMEA"] {
            assert_eq!(classify_sexo(entrada), Some(Sexo::Femea), "{:?}", entrada);
        }
    }

    #[test]
    fn sexo_nao_identificado_fica_nao_identificado() {
        for entrada in ["Não informado", "", "   ", "lote misto"] {
            assert_eq!(classify_sexo(entrada), None, "{:?}", entrada);
        }
    }

    #[test]
    fn femea_nao_cai_na_checagem_de_m() {
        // naive substring on 'm' would turn every fêmea into macho
        assert_eq!(classify_sexo("fêmea"), Some(Sexo::Femea));
        assert_eq!(classify_sexo("Lote de fêmeas"), Some(Sexo::Femea));
    }

    #[test]
    fn sexo_por_palavra_de_gado() {
        assert_eq!(sexo_do_texto("3x Bezerro Nelore"), Some(Sexo::Macho));
        assert_eq!(sexo_do_texto("Vaca Girolando 36 meses"), Some(Sexo::Femea));
        assert_eq!(sexo_do_texto("lote para recria"), None);
    }

    #[test]
    fn decimal_com_virgula_brasileira() {
        assert_eq!(
            parse_decimal_br("1.234,56"),
            Some(BigDecimal::from_str("1234.56").unwrap())
        );
        assert_eq!(
            parse_decimal_br("1200,00"),
            Some(BigDecimal::from_str("1200.00").unwrap())
        );
        assert_eq!(
            parse_decimal_br("1234.56"),
            Some(BigDecimal::from_str("1234.56").unwrap())
        );
        assert_eq!(parse_decimal_br(""), None);
        assert_eq!(parse_decimal_br("abc"), None);
    }

    #[test]
    fn era_explicita_e_de_texto() {
        assert_eq!(parse_era("0-7"), Some(Era::Faixa(0, 7)));
        assert_eq!(parse_era("24+"), Some(Era::Acima(24)));
        assert_eq!(parse_era("36 meses"), Some(Era::Meses(36)));
        assert_eq!(parse_era("adulto"), None);
        assert_eq!(era_do_texto("Bezerro Nelore 0-7"), Some(Era::Faixa(0, 7)));
        assert_eq!(era_do_texto("Vaca 36 meses prenhe"), Some(Era::Meses(36)));
    }

    #[test]
    fn item_objeto_completo() {
        let raw = json!({
            "quantidade": 5,
            "sexo": "Macho",
            "valorUnitario": "1.200,00",
            "era": "0-7",
            "raca": "Nelore",
            "tatuagem": "BR-1042"
        });
        let item = match parse_item(&raw, 0) {
            ParseOutcome::Parsed(p) => p,
            other => panic!("esperava item parseado, veio {:?}", other),
        };
        assert_eq!(item.quantidade, 5);
        assert_eq!(item.valor_unitario, BigDecimal::from_str("1200.00").unwrap());
        assert_eq!(item.sexo, Some(Sexo::Macho));
        assert_eq!(item.era, Some(Era::Faixa(0, 7)));
        assert_eq!(item.raca.as_deref(), Some("Nelore"));
        assert_eq!(item.tatuagem.as_deref(), Some("BR-1042"));
    }

    #[test]
    fn quantidade_por_alias_e_categoria() {
        let alias = json!({"quantidadeAnimais": "12", "sexo": "F"});
        let item = parse_item(&alias, 0);
        assert_eq!(item.parsed().map(|p| p.quantidade), Some(12));

        let categoria = json!({"categoria": {"nome": "Bezerros", "quantidade": 8}, "sexo": "M"});
        let item = parse_item(&categoria, 0);
        assert_eq!(item.parsed().map(|p| p.quantidade), Some(8));

        // nothing parseable as a count defaults to 1
        let sem_qtd = json!({"sexo": "Macho", "valorUnitario": "500,00"});
        let item = parse_item(&sem_qtd, 0);
        assert_eq!(item.parsed().map(|p| p.quantidade), Some(1));
    }

    #[test]
    fn item_texto_livre() {
        let raw = json!("3x Bezerro Nelore 0-7 R$ 850,00");
        let item = match parse_item(&raw, 2) {
            ParseOutcome::Parsed(p) => p,
            other => panic!("esperava item parseado, veio {:?}", other),
        };
        assert_eq!(item.item_index, 2);
        assert_eq!(item.quantidade, 3);
        assert_eq!(item.valor_unitario, BigDecimal::from_str("850.00").unwrap());
        assert_eq!(item.sexo, Some(Sexo::Macho));
        assert_eq!(item.era, Some(Era::Faixa(0, 7)));
        assert_eq!(item.raca.as_deref(), Some("Nelore"));
    }

    #[test]
    fn item_vazio_vira_nao_identificado() {
        for raw in [json!({}), json!(""), json!("   "), json!(42)] {
            match parse_item(&raw, 0) {
                ParseOutcome::Unidentified { .. } => {}
                other => panic!("esperava não identificado para {:?}, veio {:?}", raw, other),
            }
        }
    }
}
