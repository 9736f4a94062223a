pub mod preprocessing;
pub mod closure;
pub mod moments;
pub mod signature;
pub mod extraction;

pub use preprocessing::*;
pub use closure::*;
pub use moments::*;
pub use signature::*;
pub use extraction::*;
