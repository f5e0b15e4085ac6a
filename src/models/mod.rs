mod order;
mod promotion;

pub use order::*;
pub use promotion::*;
