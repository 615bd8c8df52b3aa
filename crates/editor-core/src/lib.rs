mod command;
mod config;
pub mod drag;
pub mod editing;
mod editor;
mod error;
mod extension;
mod extensions;
pub mod format;
mod history;
pub mod list;
mod markup;
mod range;
mod serialize;
mod state;
mod tree;
mod value;

pub use crate::command::*;
pub use crate::config::*;
pub use crate::drag::{DragState, DropSide, Layout, NodeRect};
pub use crate::editing::Direction;
pub use crate::editor::*;
pub use crate::error::*;
pub use crate::extension::*;
pub use crate::extensions::*;
pub use crate::format::{PendingFormat, Selector, WrapTemplate};
pub use crate::history::*;
pub use crate::list::{ListEntry, ListModel, Retype};
pub use crate::markup::*;
pub use crate::range::*;
pub use crate::serialize::*;
pub use crate::state::*;
pub use crate::tree::*;
pub use crate::value::*;
