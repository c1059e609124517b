pub mod order_state;
pub mod pricing;
pub mod snapshot;
pub mod status;

pub use order_state::{Assignment, Collection, MemoNumber, OrderState};
pub use snapshot::OrderSnapshot;
