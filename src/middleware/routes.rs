use axum::Router;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use super::error::AuthError;
use super::state::CasAuth;
use super::traits::SessionStore;
use crate::backend::Authentication;
use crate::client::LogoutCompletion;

/// Create the CAS login/logout router.
///
/// - `GET {auth_path}/login`: authenticate against CAS, then redirect to the
///   login destination.
/// - `GET|POST {auth_path}/logout`: drop the cached session and end the CAS
///   session. Accepts optional `url` and `service` query parameters.
pub fn cas_routes<S: SessionStore>(auth: CasAuth<S>) -> Router {
    let auth_path = auth.settings.auth_path.clone();

    Router::new()
        .route(&format!("{auth_path}/login"), get(login::<S>))
        .route(
            &format!("{auth_path}/logout"),
            get(logout::<S>).post(logout::<S>),
        )
        .with_state(auth)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<S: SessionStore>(
    State(auth): State<CasAuth<S>>,
    jar: PrivateCookieJar,
    request: Request,
) -> Result<Response, AuthError> {
    let (parts, _body) = request.into_parts();

    if let Authentication::Redirect { location } = auth.client.authenticate(&parts).await? {
        return Ok(Redirect::to(&location).into_response());
    }

    let (user, cookie) = auth.establish_session(&parts).await?;
    tracing::info!(target: "cas", user = %user.user, "CAS login successful");

    Ok((jar.add(cookie), Redirect::to(&auth.settings.login_redirect)).into_response())
}

// ── Logout ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LogoutQuery {
    url: Option<String>,
    service: Option<String>,
}

async fn logout<S: SessionStore>(
    State(auth): State<CasAuth<S>>,
    jar: PrivateCookieJar,
    Query(query): Query<LogoutQuery>,
    request: Request,
) -> Result<Response, AuthError> {
    let (parts, _body) = request.into_parts();
    let jar = auth.end_session(jar).await;

    let completion = auth
        .client
        .logout(&parts, query.url.as_deref(), query.service.as_deref())
        .await?;

    Ok(match completion {
        LogoutCompletion::Terminate { location } => {
            (jar, Redirect::to(&location)).into_response()
        }
        LogoutCompletion::Continue => (jar, StatusCode::NO_CONTENT).into_response(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, header};
    use tower::ServiceExt;

    use super::*;
    use crate::backend::LogoutParams;
    use crate::client::{CasClient, ContinueRequest};
    use crate::config::CasConfig;
    use crate::middleware::{CasAuthConfig, MemorySessionStore};
    use crate::testing::{Call, RecordingBackend};

    fn auth_with(client: CasClient) -> CasAuth<MemorySessionStore> {
        CasAuth::new(CasAuthConfig::new(Arc::new(client)), MemorySessionStore::new())
    }

    fn auth(backend: &Arc<RecordingBackend>) -> CasAuth<MemorySessionStore> {
        auth_with(CasClient::new(CasConfig::default(), backend.clone()).unwrap())
    }

    fn request(method: Method, uri: &str) -> Request {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn login_redirects_to_cas_when_anonymous() {
        let backend = Arc::new(RecordingBackend::new());
        let app = cas_routes(auth(&backend));

        let response = app.oneshot(request(Method::GET, "/cas/login")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://cas.example.edu/cas/login"
        );
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn login_sets_session_and_redirects_home() {
        let backend = Arc::new(RecordingBackend::new().with_authenticated(true));
        let auth = auth(&backend);
        let app = cas_routes(auth.clone());

        let response = app.oneshot(request(Method::GET, "/cas/login")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        assert!(response.headers().get(header::SET_COOKIE).is_some());
        assert_eq!(auth.session_store().len(), 1);
    }

    #[tokio::test]
    async fn login_with_validated_ticket_sets_session() {
        let backend = Arc::new(RecordingBackend::new().with_ticket_valid(true));
        let auth = auth(&backend);
        let app = cas_routes(auth.clone());

        let response =
            app.oneshot(request(Method::GET, "/cas/login?ticket=ST-1-abc")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        assert!(response.headers().get(header::SET_COOKIE).is_some());
        assert_eq!(auth.session_store().len(), 1);
        assert_eq!(backend.count(|c| *c == Call::ForceAuthentication), 1);
    }

    #[tokio::test]
    async fn logout_clears_session_and_redirects_to_cas() {
        let backend = Arc::new(RecordingBackend::new().with_authenticated(true));
        let auth = auth(&backend);
        let app = cas_routes(auth.clone());

        let login = app.clone().oneshot(request(Method::GET, "/cas/login")).await.unwrap();
        let cookie = login.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        let cookie = cookie.split(';').next().unwrap().to_owned();

        let logout = Request::builder()
            .method(Method::POST)
            .uri("/cas/logout?service=https%3A%2F%2Fapp.example.edu%2Fbye")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(logout).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://cas.example.edu/cas/logout"
        );
        assert!(auth.session_store().is_empty());
        assert_eq!(
            backend.logouts(),
            vec![LogoutParams { service: Some("https://app.example.edu/bye".into()), url: None }]
        );
    }

    #[tokio::test]
    async fn logout_with_continue_strategy_is_204() {
        let backend = Arc::new(RecordingBackend::new());
        let client = CasClient::builder(CasConfig::default(), backend.clone())
            .with_logout_strategy(Arc::new(ContinueRequest))
            .build()
            .unwrap();
        let app = cas_routes(auth_with(client));

        let response = app
            .oneshot(request(Method::GET, "/cas/logout?url=https%3A%2F%2Fexample.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            backend.logouts(),
            vec![LogoutParams { service: None, url: Some("https://example.com".into()) }]
        );
        assert_eq!(backend.count(|c| matches!(c, Call::Logout(_))), 1);
    }
}
