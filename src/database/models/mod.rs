pub mod organization;
pub mod profile;
pub mod tables;

pub use organization::{OrgType, Organization};
pub use profile::{Profile, Role};
