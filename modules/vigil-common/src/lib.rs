pub mod types;
pub mod view;

pub use types::*;
pub use view::*;
