pub mod item;
pub mod movimentacao;
pub mod nota_fiscal;

pub use item::{Era, ParsedItem, Sexo};
pub use movimentacao::{DadosExtras, Movimentacao, MovimentacaoRow};
pub use nota_fiscal::{NotaFiscal, NotaFiscalItem};
