pub mod combo;
pub mod design;
pub mod order;
pub mod seed;
pub mod sizes;

pub use combo::*;
pub use design::*;
pub use order::*;
pub use seed::*;
pub use sizes::*;
