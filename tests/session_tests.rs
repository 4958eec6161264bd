mod common;

use std::{sync::Arc, thread, time::Duration as StdDuration};

use blog_portal::{
    auth::{DecodeFailure, Role, decode_claims},
    capability::CapabilityResolver,
    guard::{Guard, GuardDecision},
    session::SessionStore,
    storage::{MemoryTokenStore, TokenStore, TokenStoreState},
};
use chrono::{Duration, Utc};
use common::{sign, token_for};
use serde_json::json;

// --- Claims decoding ---

#[test]
fn test_signed_token_decodes_without_the_key() {
    let claims = decode_claims(&token_for("u1", "user")).unwrap();
    assert_eq!(claims.subject, "u1");
    assert_eq!(claims.role, Role::User);
}

#[test]
fn test_expired_token_is_rejected() {
    let token = sign(json!({
        "sub": "u1",
        "role": "admin",
        "exp": (Utc::now() - Duration::minutes(1)).timestamp(),
    }));
    assert!(matches!(decode_claims(&token), Err(DecodeFailure::Expired(_))));
}

#[test]
fn test_malformed_tokens_are_rejected() {
    assert_eq!(decode_claims(""), Err(DecodeFailure::Empty));
    assert_eq!(decode_claims("not-a-token"), Err(DecodeFailure::Shape));
    assert_eq!(decode_claims("a.b.c.d"), Err(DecodeFailure::Shape));
    assert!(matches!(decode_claims("a.b.c"), Err(DecodeFailure::Header(_))));
}

#[test]
fn test_missing_subject_is_rejected() {
    let token = sign(json!({ "role": "user" }));
    assert_eq!(decode_claims(&token), Err(DecodeFailure::MissingSubject));
}

// --- Session store ---

#[test]
fn test_fresh_store_is_guest() {
    let store = SessionStore::in_memory();
    assert!(!store.is_authenticated());
    assert_eq!(store.role(), Role::Guest);
    assert_eq!(store.user_id(), None);
    assert_eq!(store.token(), None);
}

#[test]
fn test_establish_is_visible_immediately() {
    let mut store = SessionStore::in_memory();
    store.establish(&token_for("u7", "admin"));

    assert!(store.is_authenticated());
    assert_eq!(store.role(), Role::Admin);
    assert_eq!(store.user_id(), Some("u7"));

    let snapshot = store.identity();
    store.establish(&token_for("u8", "user"));
    assert_eq!(store.user_id(), Some("u8"));
    assert_eq!(snapshot.user_id(), Some("u7"), "snapshots do not follow the store");
}

#[test]
fn test_undecodable_token_downgrades_to_guest() {
    let mut store = SessionStore::in_memory();
    store.establish("definitely.not.jwt");
    assert!(!store.is_authenticated());
    assert_eq!(store.role(), Role::Guest);
    assert_eq!(store.user_id(), None);

    let token = sign(json!({ "sub": "u1", "role": "superuser" }));
    store.establish(&token);
    assert_eq!(store.role(), Role::Guest);
}

#[test]
fn test_bearer_prefix_and_quotes_are_accepted() {
    let token = token_for("u1", "user");
    let mut store = SessionStore::in_memory();
    store.establish(&format!("\"Bearer {token}\""));
    assert_eq!(store.token(), Some(token.as_str()));
    assert_eq!(store.user_id(), Some("u1"));
}

#[test]
fn test_clear_is_idempotent() {
    let tokens = Arc::new(MemoryTokenStore::with_token(token_for("u1", "user")));
    let mut store = SessionStore::restore(tokens.clone() as TokenStoreState);
    assert!(store.is_authenticated());

    store.clear();
    assert!(!store.is_authenticated());
    assert_eq!(tokens.load().unwrap(), None);

    store.clear();
    assert!(!store.is_authenticated());
    assert_eq!(store.role(), Role::Guest);
}

#[test]
fn test_establish_writes_through_to_storage() {
    let tokens = Arc::new(MemoryTokenStore::new());
    let mut store = SessionStore::restore(tokens.clone() as TokenStoreState);
    let token = token_for("u1", "user");

    store.establish(&token);
    assert_eq!(tokens.load().unwrap(), Some(token.clone()));

    let restored = SessionStore::restore(tokens as TokenStoreState);
    assert_eq!(restored.user_id(), Some("u1"));
}

#[test]
fn test_restoring_an_expired_token_yields_guest() {
    let expired = sign(json!({
        "sub": "u1",
        "role": "user",
        "exp": (Utc::now() - Duration::hours(1)).timestamp(),
    }));
    let store = SessionStore::restore(Arc::new(MemoryTokenStore::with_token(expired)));
    assert!(!store.is_authenticated());
}

#[test]
fn test_token_expiring_mid_session_downgrades_to_guest() {
    let exp = Utc::now().timestamp() + 2;
    let mut store = SessionStore::in_memory();
    store.establish(&sign(json!({ "sub": "a1", "role": "admin", "exp": exp })));
    assert_eq!(store.role(), Role::Admin);
    assert!(CapabilityResolver::new(&store).can_moderate());

    while Utc::now().timestamp() <= exp {
        thread::sleep(StdDuration::from_millis(100));
    }

    assert!(!store.is_authenticated());
    assert_eq!(store.role(), Role::Guest);
    assert_eq!(store.user_id(), None);
    assert!(!store.identity().is_authenticated());
    assert!(!CapabilityResolver::new(&store).can_moderate());
    assert_eq!(
        Guard::Admin.check(&store, "/login"),
        GuardDecision::Redirect("/login".to_string())
    );
}
