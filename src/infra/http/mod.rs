//! HTTP surface: the axum router serving catalog pages and the sink adapter.

mod middleware;
mod public;
mod sink;

pub use middleware::RequestContext;
pub use public::{HttpState, build_router};
pub use sink::{HttpSink, render_response};
