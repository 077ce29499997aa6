//! Runtime module
//!
//! Keeps the logical rack and the live units in sync: node lifecycle,
//! connection management, and the update dispatcher.

pub mod connections;
pub mod error;
pub mod node_manager;
pub mod recorder;
pub mod updater;

pub use connections::{
    can_link, change_destination, connect, delete_link, delete_module, disconnect, init_patch,
    rewire_all,
};
pub use error::RuntimeError;
pub use node_manager::NodeManager;
pub use recorder::{RecordError, Recorder};
pub use updater::{dispatch_update, UpdateEvent};
