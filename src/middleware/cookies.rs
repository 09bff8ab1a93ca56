use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::session::CookieParams;

/// Create session cookie.
///
/// A non-positive lifetime yields a browser-session cookie.
pub(super) fn session_cookie(
    name: &str,
    session_id: &str,
    params: &CookieParams,
) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_string(), session_id.to_string()))
        .http_only(params.http_only)
        .secure(params.secure)
        .same_site(SameSite::Lax)
        .path(params.path.clone());

    if let Some(domain) = &params.domain {
        cookie = cookie.domain(domain.clone());
    }
    if params.lifetime_secs > 0 {
        cookie = cookie.max_age(Duration::seconds(params.lifetime_secs));
    }
    cookie.build()
}

/// Create removal cookie for session.
pub(super) fn clear_session_cookie(name: &str, params: &CookieParams) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_string(), ""))
        .path(params.path.clone())
        .max_age(Duration::ZERO);

    if let Some(domain) = &params.domain {
        cookie = cookie.domain(domain.clone());
    }
    cookie.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CookieParams {
        CookieParams {
            lifetime_secs: 7200,
            path: "/".into(),
            domain: None,
            secure: false,
            http_only: true,
        }
    }

    #[test]
    fn session_cookie_carries_params() {
        let params = CookieParams {
            domain: Some("app.example.edu".into()),
            secure: true,
            ..params()
        };
        let cookie = session_cookie("CASAuth", "01HX", &params);

        assert_eq!(cookie.name(), "CASAuth");
        assert_eq!(cookie.value(), "01HX");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.domain(), Some("app.example.edu"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(7200)));
    }

    #[test]
    fn zero_lifetime_is_browser_session() {
        let params = CookieParams { lifetime_secs: 0, ..params() };
        assert_eq!(session_cookie("CASAuth", "01HX", &params).max_age(), None);
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie("CASAuth", &params());
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }
}
