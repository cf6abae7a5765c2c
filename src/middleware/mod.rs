/// Middleware module
///
/// Request guards and cross-cutting concerns for the HTTP layer.

mod require_identity;

pub use require_identity::{Identity, RequireIdentity};
