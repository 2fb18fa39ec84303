//! Pure item transforms.
//!
//! Each transform is a function of its config and input items only, so
//! re-running one over its own output with the same config is stable.

mod aggregate;
mod edit_fields;
mod filter;
mod limit;
mod merge;
mod remove_duplicates;
mod split_out;
mod summarize;

pub use aggregate::{AggregateConfig, AggregateMode};
pub use edit_fields::{CoerceType, EditFieldsConfig, EditOperation};
pub use filter::FilterConfig;
pub use limit::{KeepMode, LimitConfig};
pub use merge::{CombineBy, MergeConfig, MergeMode};
pub use remove_duplicates::RemoveDuplicatesConfig;
pub use split_out::SplitOutConfig;
pub use summarize::{SummarizeConfig, SummarizeOp, SummarizeOperation};
