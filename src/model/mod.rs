//! Pure data structures shared by the pipeline, the gateways and the order desk.

pub mod order;
pub mod stage;
pub mod user;

pub use order::*;
pub use stage::*;
pub use user::*;
