//! Conversation transcript bookkeeping and export.

pub mod export;
pub mod ledger;

pub use export::{export_file_name, write_export};
pub use ledger::{ConversationLedger, ConversationTurn, Role};
