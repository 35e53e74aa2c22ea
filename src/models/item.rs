use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Sex of a batch of animals. The classifier returns `Option<Sexo>`; `None`
/// means unidentified and must stay unidentified, never a default guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sexo {
    Macho,
    Femea,
}

impl Sexo {
    /// Label used in the `dados_extras.sexo` payload key.
    pub fn rotulo(&self) -> &'static str {
        match self {
            Sexo::Macho => "Macho",
            Sexo::Femea => "Fêmea",
        }
    }
}

/// Age bracket ("era") of a batch: a closed range in months, an open-ended
/// bracket, or a point age.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Era {
    Faixa(u32, u32),
    Acima(u32),
    Meses(u32),
}

impl Era {
    pub fn rotulo(&self) -> String {
        match self {
            Era::Faixa(a, b) => format!("{}-{}", a, b),
            Era::Acima(n) => format!("{}+", n),
            Era::Meses(n) => format!("{} meses", n),
        }
    }
}

/// One line item normalized by the parser.
#[derive(Debug, Clone)]
pub struct ParsedItem {
    pub item_index: usize,
    pub quantidade: i64,
    pub valor_unitario: BigDecimal,
    pub sexo: Option<Sexo>,
    pub era: Option<Era>,
    pub raca: Option<String>,
    pub tatuagem: Option<String>,
    pub descricao: String,
}
