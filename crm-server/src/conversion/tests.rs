//! Conversion engine test suite
//!
//! Drives a real pool (temp-file database + migrations) through the
//! engine's guarantees: uniqueness, caller-visible idempotence, no partial
//! state, first-writer-wins assignment, and race repair.

use sqlx::SqlitePool;
use tempfile::TempDir;

use shared::models::{EnquiryCreate, EnquiryStatus, TeamMemberCreate};

use super::*;
use crate::db::DbService;
use crate::db::repository::{client, enquiry, team_member};

async fn test_pool() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crm-test.db");
    let db = DbService::new(path.to_str().unwrap()).await.unwrap();
    (dir, db.pool)
}

async fn seed_team_member(pool: &SqlitePool, name: &str) -> i64 {
    team_member::create(
        pool,
        TeamMemberCreate {
            display_name: name.to_string(),
            email: None,
        },
    )
    .await
    .unwrap()
    .id
}

fn enquiry_payload(email: &str) -> EnquiryCreate {
    EnquiryCreate {
        first_name: "Asha".to_string(),
        last_name: "Nair".to_string(),
        email: email.to_string(),
        phone: Some("+91 98450 00000".to_string()),
        alternate_phone: None,
        nationality: Some("Indian".to_string()),
        visa_type: Some("Student".to_string()),
        destination_country: Some("Canada".to_string()),
        enquiry_source: Some("Website".to_string()),
        branch_id: None,
        enquiry_status: Some(EnquiryStatus::Contacted),
        assigned_consultant: None,
    }
}

async fn seed_enquiry(pool: &SqlitePool, email: &str) -> i64 {
    enquiry::create(pool, enquiry_payload(email)).await.unwrap().id
}

fn convert_request(enquiry_id: i64, member_id: i64) -> ConversionRequest {
    ConversionRequest {
        enquiry_id,
        assigned_team_member_id: Some(member_id),
        skip_assignment: false,
        allow_duplicate: false,
        merge_into_client_id: None,
    }
}

#[tokio::test]
async fn test_convert_creates_client_for_fresh_email() {
    let (_dir, pool) = test_pool().await;
    let member = seed_team_member(&pool, "Asha Nair").await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let outcome = engine.convert(&convert_request(e1, member)).await.unwrap();

    let ConversionOutcome::Converted { client_id } = outcome else {
        panic!("expected Converted");
    };

    let created = client::find_by_id(&pool, client_id).await.unwrap().unwrap();
    assert_eq!(created.email, "a@x.com");
    assert_eq!(created.email_normalized, "a@x.com");
    assert_eq!(created.assigned_to, Some(member));
    assert_eq!(created.first_name, "Asha");

    let sources = client::source_enquiry_ids(&pool, client_id).await.unwrap();
    assert_eq!(sources, vec![e1]);

    let converted = enquiry::find_by_id(&pool, e1).await.unwrap().unwrap();
    assert!(converted.is_client);
    assert_eq!(converted.client_id, Some(client_id));
}

#[tokio::test]
async fn test_convert_normalizes_email_for_matching() {
    let (_dir, pool) = test_pool().await;
    let member = seed_team_member(&pool, "Asha Nair").await;
    let e1 = seed_enquiry(&pool, "  Lead@Example.COM ").await;

    let engine = ConversionEngine::new(pool.clone());
    let outcome = engine.convert(&convert_request(e1, member)).await.unwrap();
    let ConversionOutcome::Converted { client_id } = outcome else {
        panic!("expected Converted");
    };

    let created = client::find_by_id(&pool, client_id).await.unwrap().unwrap();
    assert_eq!(created.email_normalized, "lead@example.com");

    // A differently-cased second enquiry matches the same identity.
    let e2 = seed_enquiry(&pool, "LEAD@example.com").await;
    let check = engine.check_duplicate(e2).await.unwrap();
    assert!(check.duplicate);
    assert_eq!(check.matched_client_id, Some(client_id));
}

#[tokio::test]
async fn test_convert_is_idempotent_from_the_callers_view() {
    let (_dir, pool) = test_pool().await;
    let member = seed_team_member(&pool, "Asha Nair").await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    engine.convert(&convert_request(e1, member)).await.unwrap();

    let second = engine.convert(&convert_request(e1, member)).await;
    assert!(matches!(
        second,
        Err(ConversionError::AlreadyConverted(id)) if id == e1
    ));

    // Still exactly one client for the email.
    let count = client::count_by_normalized_email(&pool, "a@x.com")
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_convert_missing_enquiry_is_not_found() {
    let (_dir, pool) = test_pool().await;
    let engine = ConversionEngine::new(pool.clone());
    let member = seed_team_member(&pool, "Asha Nair").await;

    let result = engine.convert(&convert_request(404, member)).await;
    assert!(matches!(result, Err(ConversionError::NotFound(404))));
}

#[tokio::test]
async fn test_convert_without_assignment_writes_nothing() {
    let (_dir, pool) = test_pool().await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let result = engine
        .convert(&ConversionRequest {
            enquiry_id: e1,
            assigned_team_member_id: None,
            skip_assignment: false,
            allow_duplicate: false,
            merge_into_client_id: None,
        })
        .await;
    assert!(matches!(result, Err(ConversionError::AssignmentRequired)));

    // No partial state: no client row, enquiry untouched.
    let count = client::count_by_normalized_email(&pool, "a@x.com")
        .await
        .unwrap();
    assert_eq!(count, 0);
    let untouched = enquiry::find_by_id(&pool, e1).await.unwrap().unwrap();
    assert!(!untouched.is_client);
    assert_eq!(untouched.client_id, None);
}

#[tokio::test]
async fn test_convert_with_unknown_team_member_writes_nothing() {
    let (_dir, pool) = test_pool().await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let result = engine.convert(&convert_request(e1, 12345)).await;
    assert!(matches!(result, Err(ConversionError::Validation(_))));

    let count = client::count_by_normalized_email(&pool, "a@x.com")
        .await
        .unwrap();
    assert_eq!(count, 0);
    let untouched = enquiry::find_by_id(&pool, e1).await.unwrap().unwrap();
    assert!(!untouched.is_client);
}

#[tokio::test]
async fn test_convert_requires_minimum_identity() {
    let (_dir, pool) = test_pool().await;
    let member = seed_team_member(&pool, "Asha Nair").await;
    let mut payload = enquiry_payload("a@x.com");
    payload.last_name = "   ".to_string();
    let e1 = enquiry::create(&pool, payload).await.unwrap().id;

    let engine = ConversionEngine::new(pool.clone());
    let result = engine.convert(&convert_request(e1, member)).await;
    assert!(matches!(result, Err(ConversionError::Validation(_))));

    let untouched = enquiry::find_by_id(&pool, e1).await.unwrap().unwrap();
    assert!(!untouched.is_client);
}

#[tokio::test]
async fn test_skip_assignment_leaves_client_unowned() {
    let (_dir, pool) = test_pool().await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let outcome = engine
        .convert(&ConversionRequest {
            enquiry_id: e1,
            assigned_team_member_id: None,
            skip_assignment: true,
            allow_duplicate: false,
            merge_into_client_id: None,
        })
        .await
        .unwrap();

    let ConversionOutcome::Converted { client_id } = outcome else {
        panic!("expected Converted");
    };
    let created = client::find_by_id(&pool, client_id).await.unwrap().unwrap();
    assert_eq!(created.assigned_to, None);
}

#[tokio::test]
async fn test_duplicate_check_reports_match() {
    let (_dir, pool) = test_pool().await;
    let member = seed_team_member(&pool, "Asha Nair").await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;
    let e2 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());

    let before = engine.check_duplicate(e1).await.unwrap();
    assert!(!before.duplicate);
    assert_eq!(before.matched_client_id, None);

    let outcome = engine.convert(&convert_request(e1, member)).await.unwrap();
    let ConversionOutcome::Converted { client_id } = outcome else {
        panic!("expected Converted");
    };

    let after = engine.check_duplicate(e2).await.unwrap();
    assert!(after.duplicate);
    assert_eq!(after.matched_client_id, Some(client_id));
    assert_eq!(after.matched_email.as_deref(), Some("a@x.com"));
}

#[tokio::test]
async fn test_duplicate_check_rejects_converted_enquiry() {
    let (_dir, pool) = test_pool().await;
    let member = seed_team_member(&pool, "Asha Nair").await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    engine.convert(&convert_request(e1, member)).await.unwrap();

    let result = engine.check_duplicate(e1).await;
    assert!(matches!(result, Err(ConversionError::AlreadyConverted(_))));
}

#[tokio::test]
async fn test_unconfirmed_duplicate_aborts_without_writes() {
    let (_dir, pool) = test_pool().await;
    let member = seed_team_member(&pool, "Asha Nair").await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;
    let e2 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let outcome = engine.convert(&convert_request(e1, member)).await.unwrap();
    let ConversionOutcome::Converted { client_id } = outcome else {
        panic!("expected Converted");
    };

    // The engine never merges silently on first detection.
    let aborted = engine.convert(&convert_request(e2, member)).await.unwrap();
    assert_eq!(
        aborted,
        ConversionOutcome::Aborted {
            matched_client_id: client_id
        }
    );

    let untouched = enquiry::find_by_id(&pool, e2).await.unwrap().unwrap();
    assert!(!untouched.is_client);
    let sources = client::source_enquiry_ids(&pool, client_id).await.unwrap();
    assert_eq!(sources, vec![e1]);
}

#[tokio::test]
async fn test_confirmed_merge_appends_source_and_converts() {
    let (_dir, pool) = test_pool().await;
    let member = seed_team_member(&pool, "Asha Nair").await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;
    let e2 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let ConversionOutcome::Converted { client_id } =
        engine.convert(&convert_request(e1, member)).await.unwrap()
    else {
        panic!("expected Converted");
    };

    let outcome = engine
        .convert(&ConversionRequest {
            merge_into_client_id: Some(client_id),
            ..convert_request(e2, member)
        })
        .await
        .unwrap();
    assert_eq!(outcome, ConversionOutcome::Merged { client_id });

    let sources = client::source_enquiry_ids(&pool, client_id).await.unwrap();
    assert_eq!(sources, vec![e1, e2]);

    let merged = enquiry::find_by_id(&pool, e2).await.unwrap().unwrap();
    assert!(merged.is_client);
    assert_eq!(merged.client_id, Some(client_id));
}

#[tokio::test]
async fn test_merge_keeps_first_assignee() {
    let (_dir, pool) = test_pool().await;
    let member_a = seed_team_member(&pool, "Asha Nair").await;
    let member_b = seed_team_member(&pool, "Ben Osei").await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;
    let e2 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let ConversionOutcome::Converted { client_id } = engine
        .convert(&convert_request(e1, member_a))
        .await
        .unwrap()
    else {
        panic!("expected Converted");
    };

    engine
        .convert(&ConversionRequest {
            merge_into_client_id: Some(client_id),
            ..convert_request(e2, member_b)
        })
        .await
        .unwrap();

    let owner = client::find_by_id(&pool, client_id)
        .await
        .unwrap()
        .unwrap()
        .assigned_to;
    assert_eq!(owner, Some(member_a));
}

#[tokio::test]
async fn test_merge_assigns_when_client_unowned() {
    let (_dir, pool) = test_pool().await;
    let member_b = seed_team_member(&pool, "Ben Osei").await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;
    let e2 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let ConversionOutcome::Converted { client_id } = engine
        .convert(&ConversionRequest {
            enquiry_id: e1,
            assigned_team_member_id: None,
            skip_assignment: true,
            allow_duplicate: false,
            merge_into_client_id: None,
        })
        .await
        .unwrap()
    else {
        panic!("expected Converted");
    };

    engine
        .convert(&ConversionRequest {
            merge_into_client_id: Some(client_id),
            ..convert_request(e2, member_b)
        })
        .await
        .unwrap();

    let owner = client::find_by_id(&pool, client_id)
        .await
        .unwrap()
        .unwrap()
        .assigned_to;
    assert_eq!(owner, Some(member_b));
}

#[tokio::test]
async fn test_merge_target_email_mismatch_is_rejected() {
    let (_dir, pool) = test_pool().await;
    let member = seed_team_member(&pool, "Asha Nair").await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;
    let e2 = seed_enquiry(&pool, "b@y.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let ConversionOutcome::Converted { client_id } =
        engine.convert(&convert_request(e1, member)).await.unwrap()
    else {
        panic!("expected Converted");
    };

    // Confirmed target no longer matches this enquiry's identity.
    let result = engine
        .convert(&ConversionRequest {
            merge_into_client_id: Some(client_id),
            ..convert_request(e2, member)
        })
        .await;
    assert!(matches!(result, Err(ConversionError::Validation(_))));

    let untouched = enquiry::find_by_id(&pool, e2).await.unwrap().unwrap();
    assert!(!untouched.is_client);
}

#[tokio::test]
async fn test_lost_race_is_repaired_into_merge() {
    let (_dir, pool) = test_pool().await;
    let member_a = seed_team_member(&pool, "Asha Nair").await;
    let member_b = seed_team_member(&pool, "Ben Osei").await;
    let e1 = seed_enquiry(&pool, "b@y.com").await;
    let e2 = seed_enquiry(&pool, "b@y.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let ConversionOutcome::Converted { client_id } = engine
        .convert(&convert_request(e1, member_a))
        .await
        .unwrap()
    else {
        panic!("expected Converted");
    };

    // allow_duplicate skips the pre-check, so this attempt goes straight
    // to the insert and loses to the unique index. The reconciler turns
    // the loss into a merge.
    let outcome = engine
        .convert(&ConversionRequest {
            allow_duplicate: true,
            ..convert_request(e2, member_b)
        })
        .await
        .unwrap();
    assert_eq!(outcome, ConversionOutcome::Merged { client_id });

    let sources = client::source_enquiry_ids(&pool, client_id).await.unwrap();
    assert_eq!(sources, vec![e1, e2]);

    // First writer kept ownership.
    let owner = client::find_by_id(&pool, client_id)
        .await
        .unwrap()
        .unwrap()
        .assigned_to;
    assert_eq!(owner, Some(member_a));
}

#[tokio::test]
async fn test_concurrent_conversions_yield_single_client() {
    let (_dir, pool) = test_pool().await;
    let member_a = seed_team_member(&pool, "Asha Nair").await;
    let member_b = seed_team_member(&pool, "Ben Osei").await;
    let e1 = seed_enquiry(&pool, "race@y.com").await;
    let e2 = seed_enquiry(&pool, "race@y.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let req1 = ConversionRequest {
        allow_duplicate: true,
        ..convert_request(e1, member_a)
    };
    let req2 = ConversionRequest {
        allow_duplicate: true,
        ..convert_request(e2, member_b)
    };

    let (r1, r2) = tokio::join!(engine.convert(&req1), engine.convert(&req2));
    let o1 = r1.unwrap();
    let o2 = r2.unwrap();

    // Exactly one CreateNew wins; the other is redirected to merge.
    let mut outcomes = [&o1, &o2];
    outcomes.sort_by_key(|o| matches!(o, ConversionOutcome::Merged { .. }));
    assert!(matches!(outcomes[0], ConversionOutcome::Converted { .. }));
    assert!(matches!(outcomes[1], ConversionOutcome::Merged { .. }));

    let count = client::count_by_normalized_email(&pool, "race@y.com")
        .await
        .unwrap();
    assert_eq!(count, 1);

    let winner = client::find_by_normalized_email(&pool, "race@y.com")
        .await
        .unwrap()
        .unwrap();

    for enquiry_id in [e1, e2] {
        let converted = enquiry::find_by_id(&pool, enquiry_id)
            .await
            .unwrap()
            .unwrap();
        assert!(converted.is_client);
        assert_eq!(converted.client_id, Some(winner.id));
    }

    let mut sources = client::source_enquiry_ids(&pool, winner.id).await.unwrap();
    sources.sort_unstable();
    let mut expected = vec![e1, e2];
    expected.sort_unstable();
    assert_eq!(sources, expected);

    // Ownership went to exactly one of the racers.
    assert!(
        winner.assigned_to == Some(member_a) || winner.assigned_to == Some(member_b),
        "unexpected owner {:?}",
        winner.assigned_to
    );
}

#[tokio::test]
async fn test_reconcile_without_winner_is_conflict_unresolved() {
    let (_dir, pool) = test_pool().await;
    let e1 = seed_enquiry(&pool, "nobody@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let result = engine.reconcile(e1, None).await;

    let err = result.unwrap_err();
    assert!(matches!(err, ConversionError::ConflictUnresolved(_)));
    assert!(err.is_retryable());

    // Never left half-converted.
    let untouched = enquiry::find_by_id(&pool, e1).await.unwrap().unwrap();
    assert!(!untouched.is_client);
    assert_eq!(untouched.client_id, None);
}

#[tokio::test]
async fn test_reconcile_merges_and_is_idempotent() {
    let (_dir, pool) = test_pool().await;
    let member_a = seed_team_member(&pool, "Asha Nair").await;
    let member_b = seed_team_member(&pool, "Ben Osei").await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;
    let e2 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    let ConversionOutcome::Converted { client_id } = engine
        .convert(&convert_request(e1, member_a))
        .await
        .unwrap()
    else {
        panic!("expected Converted");
    };

    let first = engine.reconcile(e2, Some(member_b)).await.unwrap();
    assert_eq!(first, ConversionOutcome::Merged { client_id });

    // Running the repair again must not duplicate the source link or
    // reassign ownership.
    let second = engine.reconcile(e2, Some(member_b)).await.unwrap();
    assert_eq!(second, ConversionOutcome::Merged { client_id });

    let sources = client::source_enquiry_ids(&pool, client_id).await.unwrap();
    assert_eq!(sources, vec![e1, e2]);
    let owner = client::find_by_id(&pool, client_id)
        .await
        .unwrap()
        .unwrap()
        .assigned_to;
    assert_eq!(owner, Some(member_a));
}

#[tokio::test]
async fn test_conversion_leaves_enquiry_status_untouched() {
    let (_dir, pool) = test_pool().await;
    let member = seed_team_member(&pool, "Asha Nair").await;
    let e1 = seed_enquiry(&pool, "a@x.com").await;

    let engine = ConversionEngine::new(pool.clone());
    engine.convert(&convert_request(e1, member)).await.unwrap();

    // Conversion is orthogonal to the workflow status: only the
    // is_client/client_id pair changes.
    let converted = enquiry::find_by_id(&pool, e1).await.unwrap().unwrap();
    assert_eq!(converted.enquiry_status, EnquiryStatus::Contacted);
}
