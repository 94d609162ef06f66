pub mod error;
pub mod metric;
pub mod traits;
pub mod types;

pub use error::*;
pub use metric::*;
pub use traits::*;
pub use types::*;
