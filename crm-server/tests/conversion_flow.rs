//! End-to-end conversion lifecycle against the public library API:
//! intake → duplicate check → convert → confirmed merge → repair,
//! with the audit chain verified at the end.

use tempfile::TempDir;

use crm_server::audit::{AuditAction, AuditQuery, AuditService, AuditStorage};
use crm_server::conversion::{ConversionEngine, ConversionOutcome, ConversionRequest};
use crm_server::db::DbService;
use crm_server::db::repository::{client, enquiry, team_member};
use shared::models::{EnquiryCreate, TeamMemberCreate};

fn lead(first: &str, last: &str, email: &str) -> EnquiryCreate {
    EnquiryCreate {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: email.to_string(),
        phone: None,
        alternate_phone: None,
        nationality: None,
        visa_type: Some("Work".to_string()),
        destination_country: Some("Australia".to_string()),
        enquiry_source: Some("Referral".to_string()),
        branch_id: None,
        enquiry_status: None,
        assigned_consultant: None,
    }
}

#[tokio::test]
async fn test_full_conversion_lifecycle() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crm.db");
    let db = DbService::new(&db_path.to_string_lossy()).await.unwrap();
    let pool = db.pool.clone();

    let engine = ConversionEngine::new(pool.clone());
    let (audit, audit_rx) =
        AuditService::new(AuditStorage::new(pool.clone()), 16, true);
    let audit_worker = {
        let storage = audit.storage().clone();
        tokio::spawn(crm_server::audit::AuditWorker::new(storage).run(audit_rx))
    };

    // Intake: one consultant, three leads, two sharing an identity.
    let consultant = team_member::create(
        &pool,
        TeamMemberCreate {
            display_name: "Priya Raman".to_string(),
            email: Some("priya@consultancy.example".to_string()),
        },
    )
    .await
    .unwrap();

    let e1 = enquiry::create(&pool, lead("Diego", "Souza", "diego@x.com"))
        .await
        .unwrap();
    let e2 = enquiry::create(&pool, lead("Diego", "Souza", "Diego@X.com"))
        .await
        .unwrap();
    let e3 = enquiry::create(&pool, lead("Mina", "Haddad", "mina@y.com"))
        .await
        .unwrap();

    assert_eq!(e1.display_code(), format!("ENQ-{:05}", e1.enquiry_no));

    // First conversion creates the client.
    let outcome = engine
        .convert(&ConversionRequest {
            enquiry_id: e1.id,
            assigned_team_member_id: Some(consultant.id),
            skip_assignment: false,
            allow_duplicate: false,
            merge_into_client_id: None,
        })
        .await
        .unwrap();
    let ConversionOutcome::Converted { client_id } = outcome else {
        panic!("expected Converted");
    };

    audit
        .log(
            AuditAction::EnquiryConverted,
            "enquiry",
            e1.id.to_string(),
            None,
            Some("Priya Raman".to_string()),
            serde_json::json!({ "client_id": client_id }),
        )
        .await;

    // Second lead with the same identity (different casing) is caught by
    // the duplicate check and aborts until the user decides.
    let check = engine.check_duplicate(e2.id).await.unwrap();
    assert!(check.duplicate);
    assert_eq!(check.matched_client_id, Some(client_id));

    let aborted = engine
        .convert(&ConversionRequest {
            enquiry_id: e2.id,
            assigned_team_member_id: Some(consultant.id),
            skip_assignment: false,
            allow_duplicate: false,
            merge_into_client_id: None,
        })
        .await
        .unwrap();
    assert_eq!(
        aborted,
        ConversionOutcome::Aborted {
            matched_client_id: client_id
        }
    );

    // The user confirms the merge.
    let merged = engine
        .convert(&ConversionRequest {
            enquiry_id: e2.id,
            assigned_team_member_id: Some(consultant.id),
            skip_assignment: false,
            allow_duplicate: false,
            merge_into_client_id: Some(client_id),
        })
        .await
        .unwrap();
    assert_eq!(merged, ConversionOutcome::Merged { client_id });

    // Unrelated lead converts independently.
    let outcome = engine
        .convert(&ConversionRequest {
            enquiry_id: e3.id,
            assigned_team_member_id: Some(consultant.id),
            skip_assignment: false,
            allow_duplicate: false,
            merge_into_client_id: None,
        })
        .await
        .unwrap();
    assert!(matches!(outcome, ConversionOutcome::Converted { .. }));

    // Provenance: the shared-identity client carries both enquiries.
    let detail_sources = client::source_enquiry_ids(&pool, client_id).await.unwrap();
    assert_eq!(detail_sources, vec![e1.id, e2.id]);
    assert_eq!(
        enquiry::count_for_client(&pool, client_id).await.unwrap(),
        2
    );

    // Exactly two clients exist in total.
    assert_eq!(client::find_all(&pool).await.unwrap().len(), 2);

    // Repair entry point is idempotent after the fact.
    let repaired = engine.reconcile(e2.id, None).await.unwrap();
    assert_eq!(repaired, ConversionOutcome::Merged { client_id });

    // Audit: entry drained by the worker and the hash chain is intact.
    drop(audit);
    audit_worker.await.unwrap();

    let storage = AuditStorage::new(pool.clone());
    let verification = storage.verify_chain().await.unwrap();
    assert!(verification.chain_intact);
    assert_eq!(verification.total_entries, 1);

    let (entries, total) = storage
        .query(&AuditQuery {
            from: None,
            to: None,
            action: Some(AuditAction::EnquiryConverted),
            operator_id: None,
            resource_type: None,
            offset: 0,
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(entries[0].resource_id, e1.id.to_string());
    assert_eq!(entries[0].operator_name.as_deref(), Some("Priya Raman"));
}
