//! Row structs for the damlink tables.

pub mod local_record;
pub mod queue_item;

pub use local_record::LocalRecordRow;
pub use queue_item::QueueItemRow;
