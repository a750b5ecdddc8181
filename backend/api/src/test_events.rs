use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use solidarity_protocol::money::from_cents;
use solidarity_protocol::validation::{EventChanges, EventDraft};
use solidarity_protocol::{EventStatus, Pledge, ProtocolError, Role};

use crate::invariants::assert_totals_match_ledger;
use crate::models::EventFilter;
use crate::reports::Period;
use crate::{events, reports};
use crate::test_support::{
    days_from_today, domain_error, event_draft, setup, today, user, FileDb,
};

fn amount(value: Decimal) -> Pledge {
    Pledge::new(Some(value), None).unwrap()
}

fn goods(description: &str) -> Pledge {
    Pledge::new(None, Some(description.to_string())).unwrap()
}

#[tokio::test]
async fn test_goal_overshoot_keeps_event_active() {
    let pool = setup().await;
    let org = user(&pool, "Shelter", Role::Organization).await;
    let donor = user(&pool, "Dana", Role::Donor).await;

    let draft = EventDraft::new(
        Some("Winter drive".to_string()),
        Some("Blankets and heating".to_string()),
        Some(today()),
        Some(days_from_today(14)),
        Some(dec!(1000)),
        None,
        today(),
    )
    .unwrap();
    let event = events::create_event(&pool, &org, draft).await.unwrap();
    assert_eq!(event.goal_amount, Some(dec!(1000)));
    assert_eq!(event.current_amount, Decimal::ZERO);

    for _ in 0..3 {
        events::donate(&pool, &donor, event.id, amount(dec!(400)))
            .await
            .unwrap();
    }

    let detail = events::get_event(&pool, event.id).await.unwrap();
    assert_eq!(detail.event.current_amount, dec!(1200));
    assert_eq!(detail.event.current_items, 0);
    assert_eq!(detail.event.status, EventStatus::Active);
    assert_eq!(detail.donations.len(), 3);
    assert_totals_match_ledger(&pool, event.id).await;
}

#[tokio::test]
async fn test_pledge_moves_totals_by_present_fields_only() {
    let pool = setup().await;
    let org = user(&pool, "Shelter", Role::Organization).await;
    let donor = user(&pool, "Dana", Role::Donor).await;
    let event = events::create_event(&pool, &org, event_draft("Drive")).await.unwrap();

    events::donate(&pool, &donor, event.id, amount(dec!(25.50))).await.unwrap();
    let after_amount = events::get_event(&pool, event.id).await.unwrap().event;
    assert_eq!(after_amount.current_amount, dec!(25.50));
    assert_eq!(after_amount.current_items, 0);

    events::donate(&pool, &donor, event.id, goods("Ten blankets")).await.unwrap();
    let after_goods = events::get_event(&pool, event.id).await.unwrap().event;
    assert_eq!(after_goods.current_amount, dec!(25.50));
    assert_eq!(after_goods.current_items, 1);

    let both = Pledge::new(Some(dec!(4.50)), Some("Socks".to_string())).unwrap();
    let donation = events::donate(&pool, &donor, event.id, both).await.unwrap();
    assert_eq!(donation.amount, Some(dec!(4.50)));
    assert_eq!(donation.items_description.as_deref(), Some("Socks"));
    assert_eq!(donation.donor_name.as_deref(), Some("Dana"));

    let after_both = events::get_event(&pool, event.id).await.unwrap();
    assert_eq!(after_both.event.current_amount, dec!(30));
    assert_eq!(after_both.event.current_items, 2);
    assert_eq!(after_both.donations[0].id, donation.id, "newest pledge first");
    assert_totals_match_ledger(&pool, event.id).await;
}

#[tokio::test]
async fn test_any_role_may_pledge() {
    let pool = setup().await;
    let org = user(&pool, "Shelter", Role::Organization).await;
    let event = events::create_event(&pool, &org, event_draft("Drive")).await.unwrap();

    for (name, role) in [
        ("Dana", Role::Donor),
        ("Ivy", Role::Beneficiary),
        ("Root", Role::Admin),
    ] {
        let actor = user(&pool, name, role).await;
        events::donate(&pool, &actor, event.id, amount(dec!(1))).await.unwrap();
    }
    events::donate(&pool, &org, event.id, amount(dec!(1))).await.unwrap();

    let event = events::get_event(&pool, event.id).await.unwrap().event;
    assert_eq!(event.current_amount, dec!(4));
}

#[tokio::test]
async fn test_pledge_to_closed_or_missing_event_is_not_found() {
    let pool = setup().await;
    let org = user(&pool, "Shelter", Role::Organization).await;
    let donor = user(&pool, "Dana", Role::Donor).await;
    let event = events::create_event(&pool, &org, event_draft("Drive")).await.unwrap();

    let close = EventChanges {
        status: Some(EventStatus::Finished),
        ..Default::default()
    };
    events::update_event(&pool, &org, event.id, close, today()).await.unwrap();

    let err = domain_error(events::donate(&pool, &donor, event.id, amount(dec!(10))).await);
    assert!(matches!(err, ProtocolError::NotFound(_)));
    let err = domain_error(events::donate(&pool, &donor, 999, amount(dec!(10))).await);
    assert!(matches!(err, ProtocolError::NotFound(_)));

    let event = events::get_event(&pool, event.id).await.unwrap();
    assert_eq!(event.event.current_amount, Decimal::ZERO);
    assert!(event.donations.is_empty());
}

#[tokio::test]
async fn test_only_organizations_create_events() {
    let pool = setup().await;
    let donor = user(&pool, "Dana", Role::Donor).await;

    let err = domain_error(events::create_event(&pool, &donor, event_draft("Drive")).await);
    assert!(matches!(err, ProtocolError::Permission(_)));
}

#[tokio::test]
async fn test_delete_blocked_once_pledged() {
    let pool = setup().await;
    let org = user(&pool, "Shelter", Role::Organization).await;
    let other = user(&pool, "Kitchen", Role::Organization).await;
    let donor = user(&pool, "Dana", Role::Donor).await;

    let pledged = events::create_event(&pool, &org, event_draft("Drive")).await.unwrap();
    let empty = events::create_event(&pool, &org, event_draft("Fair")).await.unwrap();
    events::donate(&pool, &donor, pledged.id, goods("Coats")).await.unwrap();

    let err = domain_error(events::delete_event(&pool, &org, pledged.id).await);
    assert!(matches!(err, ProtocolError::Conflict(_)));
    assert!(events::get_event(&pool, pledged.id).await.is_ok());

    let err = domain_error(events::delete_event(&pool, &other, empty.id).await);
    assert!(matches!(err, ProtocolError::Permission(_)));

    events::delete_event(&pool, &org, empty.id).await.unwrap();
    let err = domain_error(events::get_event(&pool, empty.id).await);
    assert!(matches!(err, ProtocolError::NotFound(_)));
}

#[tokio::test]
async fn test_update_merges_and_revalidates() {
    let pool = setup().await;
    let org = user(&pool, "Shelter", Role::Organization).await;
    let other = user(&pool, "Kitchen", Role::Organization).await;
    let event = events::create_event(&pool, &org, event_draft("Drive")).await.unwrap();

    let changes = EventChanges {
        title: Some("Spring drive".to_string()),
        goal_items: Some(50),
        ..Default::default()
    };
    let updated = events::update_event(&pool, &org, event.id, changes, today())
        .await
        .unwrap();
    assert_eq!(updated.title, "Spring drive");
    assert_eq!(updated.goal_items, Some(50));
    assert_eq!(updated.end_date, event.end_date);

    let inverted = EventChanges {
        end_date: Some(event.start_date),
        ..Default::default()
    };
    let err = domain_error(events::update_event(&pool, &org, event.id, inverted, today()).await);
    assert!(matches!(err, ProtocolError::Validation(_)));

    let foreign = EventChanges {
        title: Some("Hijacked".to_string()),
        ..Default::default()
    };
    let err = domain_error(events::update_event(&pool, &other, event.id, foreign, today()).await);
    assert!(matches!(err, ProtocolError::Permission(_)));

    let unchanged = events::get_event(&pool, event.id).await.unwrap().event;
    assert_eq!(unchanged.title, "Spring drive");
    assert_eq!(unchanged.end_date, event.end_date);
}

#[tokio::test]
async fn test_closed_events_stay_closed() {
    let pool = setup().await;
    let org = user(&pool, "Shelter", Role::Organization).await;
    let event = events::create_event(&pool, &org, event_draft("Drive")).await.unwrap();

    let cancel = EventChanges {
        status: Some(EventStatus::Cancelled),
        ..Default::default()
    };
    let cancelled = events::update_event(&pool, &org, event.id, cancel, today())
        .await
        .unwrap();
    assert_eq!(cancelled.status, EventStatus::Cancelled);

    let reopen = EventChanges {
        status: Some(EventStatus::Active),
        ..Default::default()
    };
    let err = domain_error(events::update_event(&pool, &org, event.id, reopen, today()).await);
    assert!(matches!(err, ProtocolError::StateConflict(_)));

    let active = EventFilter {
        status: Some(EventStatus::Active),
    };
    assert!(events::list_events(&pool, active).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_event_stats() {
    let pool = setup().await;
    let admin = user(&pool, "Root", Role::Admin).await;
    let org = user(&pool, "Shelter", Role::Organization).await;
    let donor = user(&pool, "Dana", Role::Donor).await;

    let drive = events::create_event(&pool, &org, event_draft("Drive")).await.unwrap();
    events::create_event(&pool, &org, event_draft("Fair")).await.unwrap();
    events::donate(&pool, &donor, drive.id, amount(dec!(10))).await.unwrap();
    events::donate(&pool, &donor, drive.id, goods("Coats")).await.unwrap();

    let err = domain_error(events::event_stats(&pool, &org).await);
    assert!(matches!(err, ProtocolError::Permission(_)));

    let stats = events::event_stats(&pool, &admin).await.unwrap();
    assert_eq!(stats.events.total_events, 2);
    assert_eq!(stats.events.active_events, 2);
    assert_eq!(stats.events.total_organizations, 1);
    assert_eq!(stats.donations.total_donations, 2);
    assert_eq!(stats.donations.total_amount, dec!(10));
    assert_eq!(stats.donations.total_donors, 1);
    assert_eq!(stats.donations.events_with_donations, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pledges_lose_no_increment() {
    let db = FileDb::new(8).await;
    let org = user(&db.pool, "Shelter", Role::Organization).await;
    let donor = user(&db.pool, "Dana", Role::Donor).await;
    let event = events::create_event(&db.pool, &org, event_draft("Drive")).await.unwrap();

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let pool = db.pool.clone();
            let pledge = if i % 2 == 0 {
                amount(dec!(2.50))
            } else {
                Pledge::new(Some(dec!(1)), Some(format!("Parcel {i}"))).unwrap()
            };
            tokio::spawn(async move { events::donate(&pool, &donor, event.id, pledge).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let detail = events::get_event(&db.pool, event.id).await.unwrap();
    assert_eq!(detail.donations.len(), 20);
    assert_eq!(detail.event.current_amount, dec!(35));
    assert_eq!(detail.event.current_items, 10);
    assert_totals_match_ledger(&db.pool, event.id).await;
}

#[tokio::test]
async fn test_pledge_past_headroom_is_refused_and_event_stays_readable() {
    let pool = setup().await;
    let org = user(&pool, "Shelter", Role::Organization).await;
    let donor = user(&pool, "Dana", Role::Donor).await;
    let admin = user(&pool, "Root", Role::Admin).await;
    let first = events::create_event(&pool, &org, event_draft("Drive")).await.unwrap();
    let second = events::create_event(&pool, &org, event_draft("Gala")).await.unwrap();

    let near_full = i64::MAX - 50;
    sqlx::query("UPDATE events SET current_amount_cents = ?1, current_items = ?1")
        .bind(near_full)
        .execute(&pool)
        .await
        .unwrap();

    let err = domain_error(events::donate(&pool, &donor, first.id, amount(dec!(1))).await);
    assert!(matches!(err, ProtocolError::Validation(_)));

    let detail = events::get_event(&pool, first.id).await.unwrap();
    assert_eq!(detail.event.current_amount, from_cents(near_full));
    assert!(detail.donations.is_empty());
    assert_eq!(events::list_events(&pool, EventFilter::default()).await.unwrap().len(), 2);

    // The remaining headroom is still usable.
    events::donate(&pool, &donor, second.id, amount(dec!(0.50))).await.unwrap();
    let detail = events::get_event(&pool, second.id).await.unwrap();
    assert_eq!(detail.event.current_amount, from_cents(i64::MAX));

    let report = reports::general_report(&pool, &admin, Period::default())
        .await
        .unwrap();
    assert_eq!(
        report.events.total_amount_raised,
        from_cents(near_full) + from_cents(i64::MAX)
    );
    assert_eq!(report.events.total_items_raised, i64::MAX);
}

#[tokio::test]
async fn test_oversized_pledge_is_rejected() {
    let err = Pledge::new(Some(dec!(90000000000000000)), None).unwrap_err();
    assert!(matches!(err, ProtocolError::Validation(_)));
}
