//! Bearer-token authentication against sessions issued by the external auth
//! service, plus role gates for student and staff routes.

pub mod middleware;

pub use middleware::{auth_middleware, require_staff, require_student};
