pub mod caller;
pub mod permission;

pub use caller::{authorize, load_caller, CallerContext};
pub use permission::{evaluate, AccessError, Denial};
