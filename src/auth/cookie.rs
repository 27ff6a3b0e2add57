//! Session cookie helpers
//!
//! Tokens are carried in an HttpOnly cookie so browser clients never
//! touch the raw JWT. The Authorization header remains supported for
//! API clients; when both are present the cookie wins.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Name of the session cookie carrying the JWT
pub const AUTH_COOKIE_NAME: &str = "hms_session";

/// Build the session cookie for a freshly issued token
pub fn create_auth_cookie(token: String, expiration_hours: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(expiration_hours))
        .build()
}

/// Build an expired cookie that clears the session on logout
pub fn create_logout_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::ZERO)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_cookie_attributes() {
        let cookie = create_auth_cookie("tok".to_string(), 24, true);
        assert_eq!(cookie.name(), AUTH_COOKIE_NAME);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_logout_cookie_expires_immediately() {
        let cookie = create_logout_cookie(false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }
}
