//! Field names of the columnar trace documents.

pub const PROCESSOR_EVENT: &str = "processor.event";
pub const TIMESTAMP: &str = "timestamp.us";
pub const PARENT_ID: &str = "parent.id";
pub const CHILD_ID: &str = "child.id";
pub const SERVICE_NAME: &str = "service.name";

pub const TRANSACTION_ID: &str = "transaction.id";
pub const TRANSACTION_NAME: &str = "transaction.name";
pub const TRANSACTION_DURATION: &str = "transaction.duration.us";

pub const SPAN_ID: &str = "span.id";
pub const SPAN_NAME: &str = "span.name";
pub const SPAN_TYPE: &str = "span.type";
pub const SPAN_SUBTYPE: &str = "span.subtype";
pub const SPAN_DURATION: &str = "span.duration.us";
pub const SPAN_LINKS: &str = "span.links";

pub const ERROR_ID: &str = "error.id";
pub const ERROR_MESSAGE: &str = "error.exception.message";
pub const ERROR_LOG_MESSAGE: &str = "error.log.message";
