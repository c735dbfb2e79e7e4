pub mod error;
pub mod extract;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod views;

use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::Config;
use crate::cursor::CursorSigner;
use crate::media::ImageHost;
use crate::storage::Storage;
use crate::views::ViewService;

pub use error::{ApiError, ErrorResponse};
pub use rate_limit::RateLimiter;
pub use routes::create_api_router;

/// Shared state of every API handler
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub tokens: TokenService,
    pub views: ViewService,
    pub media: Arc<dyn ImageHost>,
    pub cursors: CursorSigner,
    pub rate_limiter: RateLimiter,
    pub config: Arc<Config>,
}
