use chrono::NaiveDate;
use solidarity_protocol::validation::RequestChanges;
use solidarity_protocol::{Category, ProtocolError, RequestStatus, Role, Urgency, MAX_PENDING_REQUESTS};

use crate::invariants::{
    assert_all_requests_consistent, assert_pending_cap, assert_request_approver_consistent,
    pending_count,
};
use crate::models::RequestFilter;
use crate::reports::Period;
use crate::requests;
use crate::test_support::{domain_error, new_request, setup, today, user, FileDb};

#[tokio::test]
async fn test_new_request_is_pending_without_approver() {
    let pool = setup().await;
    let beneficiary = user(&pool, "Ivy", Role::Beneficiary).await;

    let request = requests::create_request(&pool, &beneficiary, new_request("Rice"))
        .await
        .unwrap();

    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.beneficiary_id, beneficiary.id);
    assert_eq!(request.beneficiary_name.as_deref(), Some("Ivy"));
    assert_request_approver_consistent(&request);
}

#[tokio::test]
async fn test_only_beneficiaries_submit_requests() {
    let pool = setup().await;
    let donor = user(&pool, "Dana", Role::Donor).await;

    let err = domain_error(requests::create_request(&pool, &donor, new_request("Rice")).await);
    assert!(matches!(err, ProtocolError::Permission(_)));
}

#[tokio::test]
async fn test_fourth_pending_request_is_refused_and_not_stored() {
    let pool = setup().await;
    let beneficiary = user(&pool, "Ivy", Role::Beneficiary).await;

    for title in ["Rice", "Beans", "Milk"] {
        requests::create_request(&pool, &beneficiary, new_request(title))
            .await
            .unwrap();
    }

    let err = domain_error(
        requests::create_request(&pool, &beneficiary, new_request("Bread")).await,
    );
    assert!(matches!(err, ProtocolError::AdmissionLimit(_)));
    assert_eq!(
        pending_count(&pool, beneficiary.id).await,
        MAX_PENDING_REQUESTS
    );
    assert_eq!(
        requests::list_requests(&pool, RequestFilter::default())
            .await
            .unwrap()
            .len(),
        3
    );
}

#[tokio::test]
async fn test_resolving_frees_an_admission_slot() {
    let pool = setup().await;
    let beneficiary = user(&pool, "Ivy", Role::Beneficiary).await;
    let org = user(&pool, "Shelter", Role::Organization).await;

    let mut ids = Vec::new();
    for title in ["Rice", "Beans", "Milk"] {
        let request = requests::create_request(&pool, &beneficiary, new_request(title))
            .await
            .unwrap();
        ids.push(request.id);
    }

    requests::reject_request(&pool, &org, ids[0]).await.unwrap();
    assert!(
        requests::create_request(&pool, &beneficiary, new_request("Bread"))
            .await
            .is_ok()
    );
    assert_pending_cap(&pool).await;
}

#[tokio::test]
async fn test_cap_is_per_beneficiary() {
    let pool = setup().await;
    let first = user(&pool, "Ivy", Role::Beneficiary).await;
    let second = user(&pool, "Ian", Role::Beneficiary).await;

    for title in ["Rice", "Beans", "Milk"] {
        requests::create_request(&pool, &first, new_request(title))
            .await
            .unwrap();
    }
    assert!(requests::create_request(&pool, &second, new_request("Rice"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_resolution_records_approver_once() {
    let pool = setup().await;
    let beneficiary = user(&pool, "Ivy", Role::Beneficiary).await;
    let org = user(&pool, "Shelter", Role::Organization).await;
    let admin = user(&pool, "Root", Role::Admin).await;

    let request = requests::create_request(&pool, &beneficiary, new_request("Rice"))
        .await
        .unwrap();

    let approved = requests::approve_request(&pool, &org, request.id).await.unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.approved_by, Some(org.id));
    assert_request_approver_consistent(&approved);

    let err = domain_error(requests::reject_request(&pool, &admin, request.id).await);
    assert!(matches!(err, ProtocolError::StateConflict(_)));
    let err = domain_error(requests::approve_request(&pool, &admin, request.id).await);
    assert!(matches!(err, ProtocolError::StateConflict(_)));

    let unchanged = requests::get_request(&pool, request.id).await.unwrap();
    assert_eq!(unchanged.status, RequestStatus::Approved);
    assert_eq!(unchanged.approved_by, Some(org.id));
}

#[tokio::test]
async fn test_resolution_is_limited_to_organizations_and_admins() {
    let pool = setup().await;
    let beneficiary = user(&pool, "Ivy", Role::Beneficiary).await;
    let donor = user(&pool, "Dana", Role::Donor).await;
    let admin = user(&pool, "Root", Role::Admin).await;

    let request = requests::create_request(&pool, &beneficiary, new_request("Rice"))
        .await
        .unwrap();

    let err = domain_error(requests::approve_request(&pool, &donor, request.id).await);
    assert!(matches!(err, ProtocolError::Permission(_)));
    let err = domain_error(requests::approve_request(&pool, &beneficiary, request.id).await);
    assert!(matches!(err, ProtocolError::Permission(_)));

    let err = domain_error(requests::approve_request(&pool, &admin, 999).await);
    assert!(matches!(err, ProtocolError::NotFound(_)));

    let rejected = requests::reject_request(&pool, &admin, request.id).await.unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.approved_by, Some(admin.id));
}

#[tokio::test]
async fn test_owner_edits_only_while_pending() {
    let pool = setup().await;
    let beneficiary = user(&pool, "Ivy", Role::Beneficiary).await;
    let other = user(&pool, "Ian", Role::Beneficiary).await;
    let org = user(&pool, "Shelter", Role::Organization).await;

    let request = requests::create_request(&pool, &beneficiary, new_request("Rice"))
        .await
        .unwrap();

    let changes = RequestChanges::new(None, None, None, Some(Urgency::Low)).unwrap();
    let edited = requests::update_request(&pool, &beneficiary, request.id, changes.clone())
        .await
        .unwrap();
    assert_eq!(edited.urgency, Urgency::Low);
    assert_eq!(edited.title, request.title);
    assert_eq!(edited.status, RequestStatus::Pending);

    let err = domain_error(
        requests::update_request(&pool, &other, request.id, changes.clone()).await,
    );
    assert!(matches!(err, ProtocolError::Permission(_)));

    let err = domain_error(requests::update_request(&pool, &beneficiary, 999, changes.clone()).await);
    assert!(matches!(err, ProtocolError::NotFound(_)));

    requests::approve_request(&pool, &org, request.id).await.unwrap();
    let err = domain_error(
        requests::update_request(&pool, &beneficiary, request.id, changes).await,
    );
    assert!(matches!(err, ProtocolError::StateConflict(_)));
}

#[tokio::test]
async fn test_owner_deletes_only_while_pending() {
    let pool = setup().await;
    let beneficiary = user(&pool, "Ivy", Role::Beneficiary).await;
    let other = user(&pool, "Ian", Role::Beneficiary).await;
    let org = user(&pool, "Shelter", Role::Organization).await;

    let pending = requests::create_request(&pool, &beneficiary, new_request("Rice"))
        .await
        .unwrap();
    let resolved = requests::create_request(&pool, &beneficiary, new_request("Beans"))
        .await
        .unwrap();
    requests::reject_request(&pool, &org, resolved.id).await.unwrap();

    let err = domain_error(requests::delete_request(&pool, &other, pending.id).await);
    assert!(matches!(err, ProtocolError::Permission(_)));

    let err = domain_error(requests::delete_request(&pool, &beneficiary, resolved.id).await);
    assert!(matches!(err, ProtocolError::StateConflict(_)));

    requests::delete_request(&pool, &beneficiary, pending.id).await.unwrap();
    let err = domain_error(requests::get_request(&pool, pending.id).await);
    assert!(matches!(err, ProtocolError::NotFound(_)));

    assert_all_requests_consistent(&pool).await;
}

#[tokio::test]
async fn test_list_filters() {
    let pool = setup().await;
    let beneficiary = user(&pool, "Ivy", Role::Beneficiary).await;
    let org = user(&pool, "Shelter", Role::Organization).await;

    let rice = requests::create_request(&pool, &beneficiary, new_request("Rice"))
        .await
        .unwrap();
    let mut books = new_request("Schoolbooks");
    books.category = Category::Books;
    books.urgency = Urgency::Medium;
    requests::create_request(&pool, &beneficiary, books).await.unwrap();
    requests::approve_request(&pool, &org, rice.id).await.unwrap();

    let approved = RequestFilter {
        status: Some(RequestStatus::Approved),
        ..Default::default()
    };
    let approved = requests::list_requests(&pool, approved).await.unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].id, rice.id);

    let medium_books = RequestFilter {
        urgency: Some(Urgency::Medium),
        category: Some(Category::Books),
        ..Default::default()
    };
    assert_eq!(
        requests::list_requests(&pool, medium_books).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_request_stats() {
    let pool = setup().await;
    let admin = user(&pool, "Root", Role::Admin).await;
    let ivy = user(&pool, "Ivy", Role::Beneficiary).await;
    let ian = user(&pool, "Ian", Role::Beneficiary).await;

    let rice = requests::create_request(&pool, &ivy, new_request("Rice")).await.unwrap();
    requests::create_request(&pool, &ian, new_request("Beans")).await.unwrap();
    requests::approve_request(&pool, &admin, rice.id).await.unwrap();

    let err = domain_error(requests::request_stats(&pool, &ivy).await);
    assert!(matches!(err, ProtocolError::Permission(_)));

    let stats = requests::request_stats(&pool, &admin).await.unwrap();
    assert_eq!(stats.general.total_requests, 2);
    assert_eq!(stats.general.pending_requests, 1);
    assert_eq!(stats.general.approved_requests, 1);
    assert_eq!(stats.general.rejected_requests, 0);
    assert_eq!(stats.general.total_beneficiaries, 2);
    assert_eq!(stats.by_urgency.len(), 1);
    assert_eq!(stats.by_urgency[0].urgency, Urgency::High);
    assert_eq!(stats.by_urgency[0].approved, 1);
    assert_eq!(stats.by_category[0].category, Category::Food);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_never_exceed_cap() {
    let db = FileDb::new(8).await;
    let beneficiary = user(&db.pool, "Ivy", Role::Beneficiary).await;

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pool = db.pool.clone();
            tokio::spawn(async move {
                requests::create_request(&pool, &beneficiary, new_request(&format!("Need {i}")))
                    .await
            })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => assert!(matches!(
                domain_error::<()>(Err(err)),
                ProtocolError::AdmissionLimit(_)
            )),
        }
    }

    assert_eq!(accepted, MAX_PENDING_REQUESTS);
    assert_pending_cap(&db.pool).await;
}

#[tokio::test]
async fn test_category_breakdown_respects_period() {
    let pool = setup().await;
    let beneficiary = user(&pool, "Ivy", Role::Beneficiary).await;
    requests::create_request(&pool, &beneficiary, new_request("Groceries"))
        .await
        .unwrap();

    let all_time = requests::by_category(&pool, &Period::default()).await.unwrap();
    assert_eq!(all_time.len(), 1);
    assert_eq!(all_time[0].count, 1);

    let long_ago = Period::new(
        NaiveDate::from_ymd_opt(2000, 1, 1),
        NaiveDate::from_ymd_opt(2000, 12, 31),
    )
    .unwrap();
    assert!(requests::by_category(&pool, &long_ago).await.unwrap().is_empty());

    let today_only = Period::new(Some(today()), Some(today())).unwrap();
    assert_eq!(requests::by_category(&pool, &today_only).await.unwrap().len(), 1);
}
