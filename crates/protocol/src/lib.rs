pub mod document;
pub mod fields;
pub mod id;
pub mod response;

pub use document::{FieldDoc, ProcessorEvent};
pub use id::ItemId;
pub use response::{EntryTransaction, TraceItems, TraceResponse, TransactionRef};
