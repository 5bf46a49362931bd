//! End-to-end tests for the credential backend over in-memory storage.

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use twostep::{
    Auth, Backend, BackendConfig, Connection, MemoryStorage, PinConfig, Request, Response,
    Storage, TokenParams, TotpConfig, TotpManager, TwostepError, UserEntry,
};

const ISSUER: &str = "TwostepTest";

fn test_backend() -> Backend {
    Backend::with_config(
        Arc::new(MemoryStorage::new()),
        BackendConfig::new(ISSUER).pin(PinConfig::fast()),
    )
}

/// Compute the currently valid code for a secret, the way an
/// authenticator app would.
fn current_code(secret: &str) -> String {
    TotpManager::new(TotpConfig::new(ISSUER))
        .current_code(secret)
        .unwrap()
}

/// Log in with `pin` + the current code for `secret`.
///
/// The time step can roll over between computing the code and the
/// backend verifying it; since these calls use the genuinely correct
/// credentials, a no-match denial can only be that race, and one retry
/// with a fresh code settles it.
async fn login_with_current_code(
    backend: &Backend,
    username: &str,
    pin: &str,
    secret: &str,
    connection: Option<&Connection>,
) -> twostep::Result<Auth> {
    let password = format!("{pin}{}", current_code(secret));
    match backend.login(username, &password, connection).await {
        Err(TwostepError::NoMatchingToken(_)) => {
            let password = format!("{pin}{}", current_code(secret));
            backend.login(username, &password, connection).await
        }
        other => other,
    }
}

async fn login_ok(
    backend: &Backend,
    username: &str,
    pin: &str,
    secret: &str,
    connection: Option<&Connection>,
) -> Auth {
    login_with_current_code(backend, username, pin, secret, connection)
        .await
        .unwrap()
}

async fn create_user(backend: &Backend, username: &str, params: TokenParams) {
    backend
        .handle(Request::CreateUser {
            username: username.into(),
            params,
        })
        .await
        .unwrap();
}

async fn create_token(backend: &Backend, username: &str, name: &str, pin: &str) -> String {
    match backend
        .handle(Request::CreateTotpToken {
            username: username.into(),
            name: name.into(),
            pin: pin.into(),
        })
        .await
        .unwrap()
    {
        Response::Secret { totp_secret } => totp_secret,
        other => panic!("expected secret, got {:?}", other),
    }
}

#[tokio::test]
async fn end_to_end_login_roundtrip() {
    let backend = test_backend();

    create_user(
        &backend,
        "u1",
        TokenParams {
            policies: vec!["dev".into()],
            ttl: Duration::from_secs(3600),
            ..TokenParams::default()
        },
    )
    .await;

    let secret = create_token(&backend, "u1", "t1", "1234").await;

    let auth = login_ok(&backend, "u1", "1234", &secret, None).await;

    assert_eq!(auth.alias, "u1");
    assert_eq!(auth.display_name, "u1");
    assert_eq!(auth.metadata.get("username").map(String::as_str), Some("u1"));
    assert_eq!(auth.policies, vec!["dev".to_string()]);
    assert_eq!(auth.ttl, Duration::from_secs(3600));

    // Delete the token and the same password stops working.
    backend.delete_totp_token("u1", "t1").await.unwrap();
    let password = format!("1234{}", current_code(&secret));
    assert!(matches!(
        backend.login("u1", &password, None).await,
        Err(TwostepError::NoMatchingToken(_))
    ));
}

#[tokio::test]
async fn wrong_pin_or_wrong_code_is_rejected() {
    let backend = test_backend();
    create_user(&backend, "u1", TokenParams::default()).await;
    let secret = create_token(&backend, "u1", "t1", "1234").await;

    // Correct code, wrong pin.
    let password = format!("9999{}", current_code(&secret));
    assert!(matches!(
        backend.login("u1", &password, None).await,
        Err(TwostepError::NoMatchingToken(_))
    ));

    // Correct pin, stale code (a step from far in the past).
    let stale = TotpManager::new(TotpConfig::new(ISSUER))
        .code_at(&secret, 30)
        .unwrap();
    let current = current_code(&secret);
    if stale != current {
        let password = format!("1234{}", stale);
        assert!(matches!(
            backend.login("u1", &password, None).await,
            Err(TwostepError::NoMatchingToken(_))
        ));
    }
}

#[tokio::test]
async fn any_attached_token_can_match() {
    let backend = test_backend();
    create_user(&backend, "u1", TokenParams::default()).await;

    let _first = create_token(&backend, "u1", "t1", "1111").await;
    let second = create_token(&backend, "u1", "t2", "2222").await;
    let _third = create_token(&backend, "u1", "t3", "3333").await;

    // A token in the middle of the sequence authenticates.
    let auth = login_ok(&backend, "u1", "2222", &second, None).await;
    assert_eq!(auth.alias, "u1");
}

#[tokio::test]
async fn replacing_a_token_invalidates_the_old_secret() {
    let backend = test_backend();
    create_user(&backend, "u1", TokenParams::default()).await;

    let old_secret = create_token(&backend, "u1", "t1", "1234").await;
    let new_secret = create_token(&backend, "u1", "t1", "5678").await;

    // Old pin+secret pair no longer validates.
    let password = format!("1234{}", current_code(&old_secret));
    assert!(matches!(
        backend.login("u1", &password, None).await,
        Err(TwostepError::NoMatchingToken(_))
    ));

    // The replacement does.
    login_ok(&backend, "u1", "5678", &new_secret, None).await;
}

#[tokio::test]
async fn login_denied_for_unknown_user_and_empty_token_list() {
    let backend = test_backend();

    assert!(matches!(
        backend.login("ghost", "1234123456", None).await,
        Err(TwostepError::UserNotFound(_))
    ));

    // A user with zero tokens always rejects.
    create_user(&backend, "u1", TokenParams::default()).await;
    assert!(matches!(
        backend.login("u1", "1234123456", None).await,
        Err(TwostepError::NoMatchingToken(_))
    ));
}

#[tokio::test]
async fn username_is_case_normalized() {
    let backend = test_backend();
    create_user(&backend, "Alice", TokenParams::default()).await;
    let secret = create_token(&backend, "ALICE", "t1", "1234").await;

    let auth = login_ok(&backend, " Alice ", "1234", &secret, None).await;
    assert_eq!(auth.alias, "alice");
}

#[tokio::test]
async fn listing_tracks_creates_and_deletes() {
    let backend = test_backend();
    create_user(&backend, "a", TokenParams::default()).await;
    create_user(&backend, "b", TokenParams::default()).await;

    assert_eq!(
        backend.list_users().await.unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );

    backend.delete_user("a").await.unwrap();
    assert_eq!(backend.list_users().await.unwrap(), vec!["b".to_string()]);

    backend.delete_user("b").await.unwrap();
    assert!(backend.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn origin_restriction_on_the_user_record() {
    let backend = test_backend();
    create_user(
        &backend,
        "u1",
        TokenParams {
            bound_cidrs: vec!["10.0.0.0/8".parse().unwrap()],
            ..TokenParams::default()
        },
    )
    .await;
    let secret = create_token(&backend, "u1", "t1", "1234").await;

    // No connection information at all: hard denial.
    assert!(matches!(
        login_with_current_code(&backend, "u1", "1234", &secret, None).await,
        Err(TwostepError::MissingConnection)
    ));

    // Out-of-range address: permission denied, not a credential failure.
    let outside = Connection::new("203.0.113.7".parse::<IpAddr>().unwrap());
    assert!(matches!(
        login_with_current_code(&backend, "u1", "1234", &secret, Some(&outside)).await,
        Err(TwostepError::PermissionDenied)
    ));

    // In-range address: granted, and the grant carries the restriction.
    let inside = Connection::new("10.1.2.3".parse::<IpAddr>().unwrap());
    let auth = login_ok(&backend, "u1", "1234", &secret, Some(&inside)).await;
    assert_eq!(
        auth.bound_cidrs,
        vec!["10.0.0.0/8".parse::<ipnet::IpNet>().unwrap()]
    );
}

#[tokio::test]
async fn origin_restriction_on_an_individual_token() {
    let storage = Arc::new(MemoryStorage::new());
    let backend = Backend::with_config(
        storage.clone(),
        BackendConfig::new(ISSUER).pin(PinConfig::fast()),
    );
    create_user(&backend, "u1", TokenParams::default()).await;
    let secret = create_token(&backend, "u1", "t1", "1234").await;

    // Attach the restriction to the token itself; the user record stays
    // unrestricted, so only the token-level set is in play.
    let raw = storage.get("users/u1").await.unwrap().unwrap();
    let mut entry: UserEntry = serde_json::from_slice(&raw).unwrap();
    entry.totp_tokens[0].bound_cidrs = vec!["10.0.0.0/8".parse().unwrap()];
    storage
        .put("users/u1", serde_json::to_vec(&entry).unwrap())
        .await
        .unwrap();

    // No connection information at all: hard denial.
    assert!(matches!(
        login_with_current_code(&backend, "u1", "1234", &secret, None).await,
        Err(TwostepError::MissingConnection)
    ));

    // Out-of-range address: permission denied, not a credential failure.
    let outside = Connection::new("203.0.113.7".parse::<IpAddr>().unwrap());
    assert!(matches!(
        login_with_current_code(&backend, "u1", "1234", &secret, Some(&outside)).await,
        Err(TwostepError::PermissionDenied)
    ));

    // In-range address: granted. The grant carries the user-level set,
    // which is empty here.
    let inside = Connection::new("10.1.2.3".parse::<IpAddr>().unwrap());
    let auth = login_ok(&backend, "u1", "1234", &secret, Some(&inside)).await;
    assert_eq!(auth.alias, "u1");
    assert!(auth.bound_cidrs.is_empty());
}

#[tokio::test]
async fn renewal_refreshes_ttls_and_detects_policy_drift() {
    let backend = test_backend();
    create_user(
        &backend,
        "u1",
        TokenParams {
            policies: vec!["dev".into(), "ops".into()],
            ttl: Duration::from_secs(60),
            ..TokenParams::default()
        },
    )
    .await;
    let secret = create_token(&backend, "u1", "t1", "1234").await;

    let auth = login_ok(&backend, "u1", "1234", &secret, None).await;

    // Administrative TTL change takes effect on renewal; reordered
    // policies are still equivalent.
    create_user(
        &backend,
        "u1",
        TokenParams {
            policies: vec!["ops".into(), "dev".into()],
            ttl: Duration::from_secs(7200),
            max_ttl: Duration::from_secs(86400),
            period: Duration::from_secs(600),
            ..TokenParams::default()
        },
    )
    .await;

    let renewed = backend.renew(auth.clone()).await.unwrap();
    assert_eq!(renewed.ttl, Duration::from_secs(7200));
    assert_eq!(renewed.max_ttl, Duration::from_secs(86400));
    assert_eq!(renewed.period, Duration::from_secs(600));
    assert_eq!(renewed.alias, "u1");
    assert_eq!(renewed.policies, auth.policies);

    // A policy change is fatal to renewal.
    create_user(
        &backend,
        "u1",
        TokenParams {
            policies: vec!["dev".into()],
            ..TokenParams::default()
        },
    )
    .await;
    assert!(matches!(
        backend.renew(auth).await,
        Err(TwostepError::PolicyChanged)
    ));
}

#[tokio::test]
async fn renewal_without_identity_metadata_fails() {
    let backend = test_backend();
    let mut auth = Auth::new("u1");
    auth.metadata.clear();

    assert!(matches!(
        backend.renew(auth).await,
        Err(TwostepError::MissingField("username"))
    ));
}

#[tokio::test]
async fn renewal_after_user_deletion_fails() {
    let backend = test_backend();
    create_user(&backend, "u1", TokenParams::default()).await;
    let secret = create_token(&backend, "u1", "t1", "1234").await;
    let auth = login_ok(&backend, "u1", "1234", &secret, None).await;

    backend.delete_user("u1").await.unwrap();

    assert!(matches!(
        backend.renew(auth).await,
        Err(TwostepError::UserNotFound(_))
    ));
}

/// Storage that fails every call, proving which paths touch it.
struct ExplodingStorage;

#[async_trait]
impl Storage for ExplodingStorage {
    async fn get(&self, _key: &str) -> twostep::Result<Option<Vec<u8>>> {
        Err(TwostepError::storage("boom"))
    }
    async fn put(&self, _key: &str, _value: Vec<u8>) -> twostep::Result<()> {
        Err(TwostepError::storage("boom"))
    }
    async fn delete(&self, _key: &str) -> twostep::Result<()> {
        Err(TwostepError::storage("boom"))
    }
    async fn list(&self, _prefix: &str) -> twostep::Result<Vec<String>> {
        Err(TwostepError::storage("boom"))
    }
}

#[tokio::test]
async fn short_credentials_are_rejected_before_storage() {
    let backend = Backend::with_config(
        Arc::new(ExplodingStorage),
        BackendConfig::new(ISSUER).pin(PinConfig::fast()),
    );

    // Fewer than 7 characters: parse failure, storage never consulted.
    assert!(matches!(
        backend.login("u1", "123456", None).await,
        Err(TwostepError::InvalidCredential)
    ));

    // A long enough credential reaches storage and surfaces its failure.
    assert!(matches!(
        backend.login("u1", "1234567", None).await,
        Err(TwostepError::Storage(_))
    ));
}

#[tokio::test]
async fn storage_failures_surface_to_the_caller() {
    let backend = Backend::with_config(
        Arc::new(ExplodingStorage),
        BackendConfig::new(ISSUER).pin(PinConfig::fast()),
    );

    assert!(matches!(
        backend.write_user("u1", TokenParams::default()).await,
        Err(TwostepError::Storage(_))
    ));
    assert!(matches!(
        backend.create_totp_token("u1", "t1", "1234").await,
        Err(TwostepError::Storage(_))
    ));
    assert!(matches!(
        backend.list_users().await,
        Err(TwostepError::Storage(_))
    ));
}

#[tokio::test]
async fn dispatched_login_matches_direct_call() {
    let backend = test_backend();
    create_user(&backend, "u1", TokenParams::default()).await;
    let secret = create_token(&backend, "u1", "t1", "1234").await;

    let mut response = backend
        .handle(Request::Login {
            username: "u1".into(),
            password: format!("1234{}", current_code(&secret)),
            connection: None,
        })
        .await;
    if matches!(response, Err(TwostepError::NoMatchingToken(_))) {
        // Step rollover race; retry with a fresh code.
        response = backend
            .handle(Request::Login {
                username: "u1".into(),
                password: format!("1234{}", current_code(&secret)),
                connection: None,
            })
            .await;
    }

    match response.unwrap() {
        Response::Auth(auth) => assert_eq!(auth.alias, "u1"),
        other => panic!("expected auth, got {:?}", other),
    }
}
