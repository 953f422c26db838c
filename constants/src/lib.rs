/// Shared configuration for render dataset pre-processing
pub mod camera;
pub mod filtering;
pub mod layout;

pub use camera::*;
pub use filtering::*;
pub use layout::*;
