pub mod export;
pub mod flatten;

pub use flatten::{classify, flatten};
