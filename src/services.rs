mod injectable;
mod interface;
mod service;

pub use injectable::*;
pub use interface::*;
pub use service::*;
