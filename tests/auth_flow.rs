//! End-to-end token lifecycle against the service, with a hand-driven clock.

use actix_web::http::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use chirpy::auth::{
    issue_access_token, validate_access_token, AuthService, PasswordHasher, MIN_BCRYPT_COST,
};
use chirpy::clock::ManualClock;
use chirpy::configuration::AuthSettings;
use chirpy::error::{AppError, AuthError};
use chirpy::store::InMemoryStore;

const EMAIL: &str = "walt@breakingbad.com";
const PASSWORD: &str = "04234";

struct TestAuth {
    service: AuthService,
    clock: Arc<ManualClock>,
    store: Arc<InMemoryStore>,
    user_id: Uuid,
}

fn setup() -> TestAuth {
    let settings = AuthSettings {
        secret: "test-secret-key-at-least-32-characters-long".to_string(),
        access_token_ttl_seconds: 3600,
        refresh_token_ttl_seconds: 60 * 24 * 60 * 60,
        bcrypt_cost: MIN_BCRYPT_COST,
    };

    let store = Arc::new(InMemoryStore::new());
    let hash = PasswordHasher::new(MIN_BCRYPT_COST)
        .hash(PASSWORD)
        .expect("Failed to hash password");
    let user_id = store
        .add_credential(EMAIL, &hash)
        .expect("Failed to seed user");

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let service = AuthService::new(store.clone(), &settings, clock.clone());

    TestAuth {
        service,
        clock,
        store,
        user_id,
    }
}

fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

fn auth_error<T: std::fmt::Debug>(result: Result<T, AppError>) -> AuthError {
    match result {
        Err(AppError::Auth(e)) => e,
        other => panic!("Expected an auth error, got {:?}", other),
    }
}

#[test]
fn password_roundtrip_and_mismatch() {
    let hasher = PasswordHasher::new(MIN_BCRYPT_COST);
    let passwords = ["correctPassword123!", "anotherPassword456!", "p"];

    for p1 in passwords {
        let hash = hasher.hash(p1).unwrap();
        for p2 in passwords {
            assert_eq!(hasher.verify(&hash, p2).unwrap(), p1 == p2, "{} vs {}", p1, p2);
        }
    }
}

#[test]
fn access_token_is_bound_to_its_secret() {
    let user_id = Uuid::new_v4();
    let token = issue_access_token(&user_id, "s1", Duration::hours(1)).unwrap();

    assert_eq!(validate_access_token(&token, "s1"), Ok(user_id));
    assert_eq!(validate_access_token(&token, "s2"), Err(AuthError::TokenInvalid));
}

#[tokio::test]
async fn login_refresh_and_expiry_scenario() {
    let app = setup();

    let tokens = app.service.login(EMAIL, PASSWORD, None).await.unwrap();
    assert_eq!(
        app.service.resolve_request_identity(&bearer(&tokens.access_token)),
        Ok(app.user_id)
    );

    app.clock.advance(Duration::hours(1) + Duration::seconds(1));
    assert_eq!(
        app.service.resolve_request_identity(&bearer(&tokens.access_token)),
        Err(AuthError::TokenExpired)
    );

    let refreshed = app.service.refresh(&bearer(&tokens.refresh_token)).await.unwrap();
    assert_eq!(
        app.service.resolve_request_identity(&bearer(&refreshed)),
        Ok(app.user_id)
    );

    // The refresh token is not consumed by use
    let again = app.service.refresh(&bearer(&tokens.refresh_token)).await.unwrap();
    assert_eq!(
        app.service.resolve_request_identity(&bearer(&again)),
        Ok(app.user_id)
    );
    assert_eq!(app.store.refresh_token_count(app.user_id), 1);
}

#[tokio::test]
async fn revoke_then_login_again_scenario() {
    let app = setup();
    let tokens = app.service.login(EMAIL, PASSWORD, None).await.unwrap();

    app.service.revoke(&bearer(&tokens.refresh_token)).await.unwrap();
    app.service.revoke(&bearer(&tokens.refresh_token)).await.unwrap();

    assert_eq!(
        auth_error(app.service.refresh(&bearer(&tokens.refresh_token)).await),
        AuthError::TokenRevoked
    );

    let fresh = app.service.login(EMAIL, PASSWORD, None).await.unwrap();
    assert_ne!(fresh.refresh_token, tokens.refresh_token);

    let access = app.service.refresh(&bearer(&fresh.refresh_token)).await.unwrap();
    assert_eq!(
        app.service.resolve_request_identity(&bearer(&access)),
        Ok(app.user_id)
    );

    // The revoked row is kept for audit
    assert!(app
        .service
        .refresh_tokens()
        .lookup(&tokens.refresh_token)
        .await
        .unwrap()
        .revoked_at
        .is_some());
}

#[tokio::test]
async fn refresh_token_expires_after_sixty_days() {
    let app = setup();
    let tokens = app.service.login(EMAIL, PASSWORD, None).await.unwrap();

    app.clock.advance(Duration::days(59));
    assert!(app.service.refresh(&bearer(&tokens.refresh_token)).await.is_ok());

    app.clock.advance(Duration::days(1));
    assert_eq!(
        auth_error(app.service.refresh(&bearer(&tokens.refresh_token)).await),
        AuthError::TokenExpired
    );
}

#[tokio::test]
async fn unknown_refresh_token_is_not_found() {
    let app = setup();

    assert_eq!(
        auth_error(app.service.refresh(&bearer("no-such-token")).await),
        AuthError::TokenNotFound
    );
    assert_eq!(
        auth_error(app.service.revoke(&bearer("no-such-token")).await),
        AuthError::TokenNotFound
    );
}

#[tokio::test]
async fn revoking_one_session_leaves_others_alone() {
    let app = setup();
    let laptop = app.service.login(EMAIL, PASSWORD, None).await.unwrap();
    let phone = app.service.login(EMAIL, PASSWORD, None).await.unwrap();

    app.service.revoke(&bearer(&laptop.refresh_token)).await.unwrap();

    assert!(app.service.refresh(&bearer(&phone.refresh_token)).await.is_ok());
}

#[tokio::test]
async fn concurrent_revokes_all_succeed() {
    let app = setup();
    let tokens = app.service.login(EMAIL, PASSWORD, None).await.unwrap();
    let service = Arc::new(app.service);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            let token = tokens.refresh_token.clone();
            tokio::spawn(async move { service.revoke(&bearer(&token)).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(
        auth_error(service.refresh(&bearer(&tokens.refresh_token)).await),
        AuthError::TokenRevoked
    );
}
