//! Splits Pulumi stack state files of the `file://` backend into one file per
//! resource, so that they can be reviewed and merged like code, and merges
//! them back into the form Pulumi expects.

pub mod error;
pub mod fs;
pub mod model;
pub mod sort;
pub mod split;
pub mod stack_name;
pub mod state_dir;
pub mod state_file;
pub mod stored_state;
pub mod unsplitter;

#[cfg(test)]
pub(crate) mod test_data;

pub use error::{Error, Result};
pub use model::{Checkpoint, Latest, ResolvedResources, Resource, State};
pub use sort::sorted_resources;
pub use split::{
    split_all, split_stack, split_state_file, unsplit_all, unsplit_stack, unsplit_state_dir,
};
pub use stack_name::StackName;
pub use state_dir::{resource_subpath, StateDir};
pub use state_file::StateFile;
pub use stored_state::StoredState;
pub use unsplitter::{with_unsplit, ScopeError, StackSelection, Unsplitter};
