// handlers/organizations/mod.rs - /api/organizations/:id (bearer auth required)
//
// The three verbs share one permission gate and differ only in the operation they request.
pub mod delete;
pub mod get;
pub mod put;

pub use delete::organization_delete;
pub use get::organization_get;
pub use put::organization_put;
