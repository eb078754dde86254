mod middleware;
mod public;
mod revalidate;

pub use middleware::{REQUEST_ID_HEADER, RequestContext};
pub use public::{HttpState, build_router};
pub use revalidate::{REVALIDATE_PRODUCTS_PATH, REVALIDATE_SECRET_HEADER, RevalidateState};
