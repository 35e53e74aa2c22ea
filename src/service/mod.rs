pub mod ledger;
pub mod parser;
pub mod rules;
pub mod sync;

pub use ledger::LedgerWriter;
pub use parser::ParseOutcome;
pub use rules::{EntityRule, RuleSet};
pub use sync::{SyncService, SyncSummary};
