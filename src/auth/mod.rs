//! Bearer authentication for the API and the cookie contract shared with the
//! session proxy.
//!
//! The API only ever sees `Authorization: Bearer <access token>`. Browsers
//! never hold tokens in script-visible storage; the proxy keeps them in
//! `HttpOnly` cookies and turns them into bearer headers.

mod cookie;
mod extractors;
mod state;

pub use cookie::{
    ACCESS_COOKIE_NAME, CookieSettings, REFRESH_COOKIE_NAME, TOKEN_COOKIE_MAX_AGE, get_cookie,
    is_cookie_safe,
};
pub use extractors::{Authorized, Input, bearer_token};
pub use state::HasJwt;
