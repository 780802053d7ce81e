pub mod append;
pub mod read;
pub mod subscribe;
pub mod trim;

pub use append::{AppendOperation, AppendOperationRequest, AppendOperationResult};
pub use read::{ReadOperation, ReadOperationRequest};
pub use subscribe::{SubscribeOperation, SubscribeOperationRequest};
pub use trim::{TrimOperation, TrimOperationRequest, TrimOperationResult};
