use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;

use super::error::AuthError;
use super::state::CasAuth;
use super::traits::SessionStore;
use crate::backend::Authentication;

/// Require a CAS login for every route behind this layer.
///
/// - A valid session cookie is served from the [`SessionStore`] without
///   contacting CAS.
/// - Unauthenticated AJAX requests get `401 Unauthorized`.
/// - Other unauthenticated requests are redirected into the CAS login flow.
/// - Once CAS reports the request authenticated, the principal is stored,
///   the session cookie is set and the request continues with a
///   [`CasUser`](super::CasUser) in its extensions.
///
/// ```rust,ignore
/// router.layer(from_fn_with_state(auth, require_cas_auth::<MySessionStore>))
/// ```
pub async fn require_cas_auth<S: SessionStore>(
    State(auth): State<CasAuth<S>>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if let Some(user) = auth.cached_user(&jar).await? {
        request.extensions_mut().insert(user);
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();

    if !auth.client.is_authenticated(&parts).await? {
        if is_ajax(&parts.headers) {
            return Err(AuthError::Unauthenticated);
        }
        if let Authentication::Redirect { location } = auth.client.authenticate(&parts).await? {
            tracing::debug!(target: "cas", path = %parts.uri.path(), "Redirecting to CAS login");
            return Ok(Redirect::to(&location).into_response());
        }
    }

    let (user, cookie) = auth.establish_session(&parts).await?;
    parts.extensions.insert(user);

    let response = next.run(Request::from_parts(parts, body)).await;
    Ok((jar.add(cookie), response).into_response())
}

/// Send visitors that already hold a CAS session to the configured
/// destination (`cas_redirect_path` by default) instead of the wrapped route.
///
/// Uses the CAS gateway check, so anonymous visitors are never forced into
/// a login.
pub async fn redirect_if_authenticated<S: SessionStore>(
    State(auth): State<CasAuth<S>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (parts, body) = request.into_parts();

    if auth.client.check_authentication(&parts).await? {
        return Ok(Redirect::to(&auth.settings.authenticated_redirect).into_response());
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}

fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;
    use crate::client::CasClient;
    use crate::config::CasConfig;
    use crate::middleware::{CasAuthConfig, CasUser, MemorySessionStore};
    use crate::testing::{Call, RecordingBackend};
    use crate::types::AttributeValue;

    fn auth(backend: &Arc<RecordingBackend>, config: CasConfig) -> CasAuth<MemorySessionStore> {
        let client = Arc::new(CasClient::new(config, backend.clone()).unwrap());
        CasAuth::new(CasAuthConfig::new(client), MemorySessionStore::new())
    }

    fn gated(auth: CasAuth<MemorySessionStore>) -> Router {
        Router::new()
            .route("/protected", get(|user: CasUser| async move { user.user }))
            .layer(from_fn_with_state(auth, require_cas_auth::<MemorySessionStore>))
    }

    fn get_request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_owned()
    }

    #[tokio::test]
    async fn ajax_without_session_is_401() {
        let backend = Arc::new(RecordingBackend::new());
        let app = gated(auth(&backend, CasConfig::default()));

        let request = Request::builder()
            .uri("/protected")
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "Unauthorized.");
        assert_eq!(backend.count(|c| *c == Call::ForceAuthentication), 0);
    }

    #[tokio::test]
    async fn interactive_without_session_redirects_to_cas() {
        let backend = Arc::new(RecordingBackend::new());
        let app = gated(auth(&backend, CasConfig::default()));

        let response = app.oneshot(get_request("/protected")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://cas.example.edu/cas/login"
        );
        assert_eq!(backend.count(|c| *c == Call::ForceAuthentication), 1);
    }

    #[tokio::test]
    async fn authenticated_request_creates_session() {
        let backend = Arc::new(
            RecordingBackend::new()
                .with_authenticated(true)
                .with_attributes([("mail".to_owned(), AttributeValue::from("frank@example.edu"))].into()),
        );
        let auth = auth(&backend, CasConfig::default());
        let app = gated(auth.clone());

        let response = app.oneshot(get_request("/protected")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_cookie(&response).starts_with("CASAuth="));
        assert_eq!(body_text(response).await, "frank");
        assert_eq!(auth.session_store().len(), 1);
        assert_eq!(backend.count(|c| *c == Call::ForceAuthentication), 0);
    }

    #[tokio::test]
    async fn validated_ticket_creates_session() {
        let backend = Arc::new(RecordingBackend::new().with_ticket_valid(true));
        let auth = auth(&backend, CasConfig::default());
        let app = gated(auth.clone());

        let response = app.oneshot(get_request("/protected?ticket=ST-1-abc")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_cookie(&response).starts_with("CASAuth="));
        assert_eq!(body_text(response).await, "frank");
        assert_eq!(auth.session_store().len(), 1);
        assert_eq!(backend.count(|c| *c == Call::IsAuthenticated), 1);
        assert_eq!(backend.count(|c| *c == Call::ForceAuthentication), 1);
        assert_eq!(backend.count(|c| *c == Call::User), 1);
    }

    #[tokio::test]
    async fn cached_session_skips_backend() {
        let backend = Arc::new(RecordingBackend::new().with_authenticated(true));
        let app = gated(auth(&backend, CasConfig::default()));

        let first = app.clone().oneshot(get_request("/protected")).await.unwrap();
        let cookie = session_cookie(&first);
        let calls_after_login = backend.calls().len();

        let request = Request::builder()
            .uri("/protected")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let second = app.oneshot(request).await.unwrap();

        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(body_text(second).await, "frank");
        assert_eq!(backend.calls().len(), calls_after_login);
    }

    #[tokio::test]
    async fn masquerade_passes_without_cas() {
        let backend = Arc::new(RecordingBackend::new());
        let app = gated(auth(&backend, CasConfig::default().with_masquerade("bob")));

        let response = app.oneshot(get_request("/protected")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "bob");
        assert_eq!(
            backend.count(|c| matches!(
                c,
                Call::ForceAuthentication | Call::IsAuthenticated | Call::User
            )),
            0
        );
    }

    #[tokio::test]
    async fn backend_failure_is_500() {
        let backend = Arc::new(RecordingBackend::new().failing());
        let app = gated(auth(&backend, CasConfig::default()));

        let response = app.oneshot(get_request("/protected")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn user_extractor_without_gate_is_401() {
        let app: Router = Router::new().route("/open", get(|user: CasUser| async move { user.user }));

        let response = app.oneshot(get_request("/open")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    fn guest_only(auth: CasAuth<MemorySessionStore>) -> Router {
        Router::new()
            .route("/login-page", get(|| async { "please log in" }))
            .layer(from_fn_with_state(auth, redirect_if_authenticated::<MemorySessionStore>))
    }

    #[tokio::test]
    async fn redirects_visitors_with_cas_session() {
        let backend = Arc::new(RecordingBackend::new().with_gateway_authenticated(true));
        let app = guest_only(auth(
            &backend,
            CasConfig::default().with_redirect_path("https://app.example.edu/home"),
        ));

        let response = app.oneshot(get_request("/login-page")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://app.example.edu/home"
        );
        assert_eq!(backend.count(|c| *c == Call::CheckAuthentication), 1);
    }

    #[tokio::test]
    async fn lets_anonymous_visitors_through() {
        let backend = Arc::new(RecordingBackend::new());
        let app = guest_only(auth(&backend, CasConfig::default()));

        let response = app.oneshot(get_request("/login-page")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "please log in");
        assert_eq!(backend.count(|c| *c == Call::ForceAuthentication), 0);
    }

    #[test]
    fn ajax_detection_ignores_case() {
        let mut headers = HeaderMap::new();
        assert!(!is_ajax(&headers));
        headers.insert("x-requested-with", "xmlhttprequest".parse().unwrap());
        assert!(is_ajax(&headers));
        headers.insert("x-requested-with", "fetch".parse().unwrap());
        assert!(!is_ajax(&headers));
    }
}
