pub mod middleware;
pub mod utils;

pub use middleware::{Viewer, USER_ID_HEADER, USER_ROLE_HEADER};
pub use utils::{require_owner, require_owner_or_staff};
