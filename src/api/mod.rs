pub mod handlers;

pub use handlers::{
    export_movimentacoes, health_check, sync_nf, sync_nf_movimentacoes,
};
