//! Screen controllers that hold no rendering code. Collaborators are always handed in through
//! constructors or arguments.

pub mod settings_editor;
pub mod tabs;
