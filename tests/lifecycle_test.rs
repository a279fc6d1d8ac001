use std::sync::Arc;

use bson::oid::ObjectId;

use startronics_backend::model::quote::{LineItem, QuoteStatus};
use startronics_backend::model::repair_request::{RepairStatus, Urgency};
use startronics_backend::model::role::UserRole;
use startronics_backend::model::user::User;
use startronics_backend::repository::memory::MemoryStore;
use startronics_backend::repository::payment_repo::PaymentRepository;
use startronics_backend::repository::user_repo::UserRepository;
use startronics_backend::service::lifecycle_service::{
    Actor, CardDetails, LifecycleService, LifecycleServiceImpl, NewRepairRequest, PaymentMethod,
};
use startronics_backend::util::error::ServiceError;

fn lifecycle(store: &Arc<MemoryStore>) -> LifecycleServiceImpl {
    LifecycleServiceImpl::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    )
}

async fn seed_user(store: &Arc<MemoryStore>, role: UserRole, email: &str) -> Actor {
    let user = store
        .insert(User {
            id: None,
            username: email.split('@').next().unwrap().to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role,
            created_at: None,
            updated_at: None,
        })
        .await
        .expect("seed user");
    Actor {
        id: user.id.unwrap(),
        role,
    }
}

fn new_request(user_id: ObjectId, urgency: Urgency) -> NewRepairRequest {
    NewRepairRequest {
        user_id,
        device_type: "phone".to_string(),
        brand: Some("Acme".to_string()),
        model: Some("A1".to_string()),
        issue_description: "Screen cracked after a fall".to_string(),
        urgency,
    }
}

fn item(description: &str, amount: f64) -> LineItem {
    LineItem {
        description: description.to_string(),
        amount,
    }
}

fn upi() -> PaymentMethod {
    PaymentMethod::Upi {
        upi_id: "customer@upi".to_string(),
    }
}

/// Scenario A: create -> approve with assignment -> accept -> bill;
/// the quote totals the line items and the request ends up completed.
#[tokio::test]
async fn full_repair_flow_totals_bill_and_completes_request() {
    let store = Arc::new(MemoryStore::new());
    let service = lifecycle(&store);
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;
    let admin = seed_user(&store, UserRole::Admin, "admin@example.com").await;
    let technician = seed_user(&store, UserRole::Technician, "tech@example.com").await;

    let created = service
        .create_request(new_request(customer.id, Urgency::High))
        .await
        .expect("create request");
    let request_id = created.request.id.unwrap();
    assert_eq!(created.request.status, RepairStatus::Pending);
    assert_eq!(created.device.device_type, "phone");

    service
        .approve_request(admin, request_id, None, Some(technician.id))
        .await
        .expect("approve");
    service
        .technician_accept(technician, request_id, Some("On it".to_string()))
        .await
        .expect("accept");

    let quote = service
        .issue_bill(
            technician,
            request_id,
            vec![item("Screen", 100.00), item("Labor", 50.00)],
            None,
        )
        .await
        .expect("issue bill");
    assert_eq!(quote.amount, 150.00);
    assert_eq!(quote.status, QuoteStatus::Sent);
    assert_eq!(quote.breakdown.items.len(), 2);

    let request = startronics_backend::repository::repair_request_repo::RepairRequestRepository::get(
        store.as_ref(),
        request_id,
    )
    .await
    .expect("request");
    assert_eq!(request.status, RepairStatus::Completed);
}

/// Scenario B: two technicians race for the same pending request; exactly
/// one wins, the other observes a claim conflict.
#[tokio::test]
async fn concurrent_claims_have_exactly_one_winner() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(lifecycle(&store));
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;
    let tech_a = seed_user(&store, UserRole::Technician, "a@example.com").await;
    let tech_b = seed_user(&store, UserRole::Technician, "b@example.com").await;

    let created = service
        .create_request(new_request(customer.id, Urgency::Normal))
        .await
        .expect("create request");
    let request_id = created.request.id.unwrap();

    let (first, second) = tokio::join!(
        service.claim_request(tech_a, request_id),
        service.claim_request(tech_b, request_id),
    );

    let winners = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one claim must succeed");
    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser, Err(ServiceError::ClaimConflict(_))));

    let request = startronics_backend::repository::repair_request_repo::RepairRequestRepository::get(
        store.as_ref(),
        request_id,
    )
    .await
    .expect("request");
    let assignee = request.assigned_technician_id.unwrap();
    assert!(assignee == tech_a.id || assignee == tech_b.id);
    // Claiming leaves the status untouched.
    assert_eq!(request.status, RepairStatus::Pending);
}

/// Scenario C: edits recalculate the total while the quote is sent and are
/// refused once it is accepted.
#[tokio::test]
async fn bill_edits_only_while_sent() {
    let store = Arc::new(MemoryStore::new());
    let service = lifecycle(&store);
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;
    let admin = seed_user(&store, UserRole::Admin, "admin@example.com").await;
    let technician = seed_user(&store, UserRole::Technician, "tech@example.com").await;

    let created = service
        .create_request(new_request(customer.id, Urgency::Normal))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();
    service
        .approve_request(admin, request_id, None, Some(technician.id))
        .await
        .expect("approve");
    service.technician_accept(technician, request_id, None).await.expect("accept");
    let quote = service
        .issue_bill(technician, request_id, vec![item("Screen", 100.00)], None)
        .await
        .expect("bill");
    let quote_id = quote.id.unwrap();

    let edited = service
        .edit_bill(
            technician,
            quote_id,
            vec![item("Screen", 100.00), item("Adhesive", 20.00)],
            Some("Added adhesive".to_string()),
        )
        .await
        .expect("edit");
    assert_eq!(edited.amount, 120.00);
    assert_eq!(edited.breakdown.notes.as_deref(), Some("Added adhesive"));

    service
        .confirm_payment(customer, quote_id, 120.00, "INR".to_string(), upi())
        .await
        .expect("pay");

    let refused = service
        .edit_bill(technician, quote_id, vec![item("Screen", 90.00)], None)
        .await;
    assert!(matches!(refused, Err(ServiceError::InvalidState(_))));
}

/// Scenario D: payment accepts the quote exactly once; a second confirm is
/// an invalid state and records nothing.
#[tokio::test]
async fn payment_is_atomic_and_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let service = lifecycle(&store);
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;
    let admin = seed_user(&store, UserRole::Admin, "admin@example.com").await;
    let technician = seed_user(&store, UserRole::Technician, "tech@example.com").await;

    let created = service
        .create_request(new_request(customer.id, Urgency::Normal))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();
    service
        .approve_request(admin, request_id, None, Some(technician.id))
        .await
        .expect("approve");
    service.technician_accept(technician, request_id, None).await.expect("accept");
    let quote = service
        .issue_bill(
            technician,
            request_id,
            vec![item("Screen", 100.00), item("Labor", 50.00)],
            None,
        )
        .await
        .expect("bill");
    let quote_id = quote.id.unwrap();

    let payment = service
        .confirm_payment(customer, quote_id, 150.00, "INR".to_string(), upi())
        .await
        .expect("pay");
    assert_eq!(payment.amount, 150.00);

    let accepted = startronics_backend::repository::quote_repo::QuoteRepository::get(
        store.as_ref(),
        quote_id,
    )
    .await
    .expect("quote");
    assert_eq!(accepted.status, QuoteStatus::Accepted);
    // Accepted quote implies exactly one payment row referencing it.
    assert!(store.find_by_quote(quote_id).await.expect("payment lookup").is_some());

    let again = service
        .confirm_payment(customer, quote_id, 150.00, "INR".to_string(), upi())
        .await;
    assert!(matches!(again, Err(ServiceError::InvalidState(_))));
    assert_eq!(store.list_by_user(customer.id).await.expect("payments").len(), 1);
}

#[tokio::test]
async fn bill_items_are_filtered_and_validated() {
    let store = Arc::new(MemoryStore::new());
    let service = lifecycle(&store);
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;
    let admin = seed_user(&store, UserRole::Admin, "admin@example.com").await;
    let technician = seed_user(&store, UserRole::Technician, "tech@example.com").await;

    let created = service
        .create_request(new_request(customer.id, Urgency::Normal))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();
    service
        .approve_request(admin, request_id, None, Some(technician.id))
        .await
        .expect("approve");
    service.technician_accept(technician, request_id, None).await.expect("accept");

    // Nothing valid survives filtering.
    let rejected = service
        .issue_bill(
            technician,
            request_id,
            vec![item("  ", 10.00), item("Free", 0.00), item("Bad", -3.00)],
            None,
        )
        .await;
    assert!(matches!(rejected, Err(ServiceError::Validation(_))));

    // Invalid rows are dropped, valid ones billed.
    let quote = service
        .issue_bill(
            technician,
            request_id,
            vec![item("Battery", 80.00), item("", 5.00)],
            None,
        )
        .await
        .expect("bill");
    assert_eq!(quote.amount, 80.00);
    assert_eq!(quote.breakdown.items.len(), 1);
}

#[tokio::test]
async fn billing_requires_an_in_repair_assignment() {
    let store = Arc::new(MemoryStore::new());
    let service = lifecycle(&store);
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;
    let technician = seed_user(&store, UserRole::Technician, "tech@example.com").await;

    let created = service
        .create_request(new_request(customer.id, Urgency::Normal))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();

    // Still pending and unassigned.
    let refused = service
        .issue_bill(technician, request_id, vec![item("Screen", 100.00)], None)
        .await;
    assert!(matches!(refused, Err(ServiceError::InvalidState(_))));
}

#[tokio::test]
async fn rejections_require_a_reason() {
    let store = Arc::new(MemoryStore::new());
    let service = lifecycle(&store);
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;
    let admin = seed_user(&store, UserRole::Admin, "admin@example.com").await;
    let technician = seed_user(&store, UserRole::Technician, "tech@example.com").await;

    let created = service
        .create_request(new_request(customer.id, Urgency::Low))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();

    let refused = service.reject_request(admin, request_id, "   ".to_string()).await;
    assert!(matches!(refused, Err(ServiceError::Validation(_))));

    service
        .approve_request(admin, request_id, None, Some(technician.id))
        .await
        .expect("approve");
    let refused = service
        .technician_reject(technician, request_id, String::new())
        .await;
    assert!(matches!(refused, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn technician_rejection_can_be_reapproved() {
    let store = Arc::new(MemoryStore::new());
    let service = lifecycle(&store);
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;
    let admin = seed_user(&store, UserRole::Admin, "admin@example.com").await;
    let technician = seed_user(&store, UserRole::Technician, "tech@example.com").await;

    let created = service
        .create_request(new_request(customer.id, Urgency::Normal))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();
    service
        .approve_request(admin, request_id, None, Some(technician.id))
        .await
        .expect("approve");
    let rejected = service
        .technician_reject(technician, request_id, "Parts unavailable".to_string())
        .await
        .expect("tech reject");
    assert_eq!(rejected.status, RepairStatus::TechnicianRejected);

    let reapproved = service
        .approve_request(admin, request_id, Some("Second look".to_string()), None)
        .await
        .expect("re-approve");
    assert_eq!(reapproved.status, RepairStatus::Approved);

    // A completed request is out of the admin's reach.
    service.technician_accept(technician, request_id, None).await.expect("accept");
    service
        .issue_bill(technician, request_id, vec![item("Fix", 10.00)], None)
        .await
        .expect("bill");
    let refused = service.approve_request(admin, request_id, None, None).await;
    assert!(matches!(refused, Err(ServiceError::InvalidState(_))));
}

#[tokio::test]
async fn cancel_requires_work_in_progress() {
    let store = Arc::new(MemoryStore::new());
    let service = lifecycle(&store);
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;
    let admin = seed_user(&store, UserRole::Admin, "admin@example.com").await;
    let technician = seed_user(&store, UserRole::Technician, "tech@example.com").await;

    let created = service
        .create_request(new_request(customer.id, Urgency::Normal))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();
    service
        .approve_request(admin, request_id, None, Some(technician.id))
        .await
        .expect("approve");

    // Approved but not yet accepted: cancel is out of order.
    let refused = service
        .technician_cancel(technician, request_id, "Changed my mind".to_string())
        .await;
    assert!(matches!(refused, Err(ServiceError::InvalidState(_))));

    service.technician_accept(technician, request_id, None).await.expect("accept");
    let cancelled = service
        .technician_cancel(technician, request_id, "Device unrepairable".to_string())
        .await
        .expect("cancel");
    assert_eq!(cancelled.status, RepairStatus::Cancelled);
}

#[tokio::test]
async fn capability_table_blocks_wrong_roles() {
    let store = Arc::new(MemoryStore::new());
    let service = lifecycle(&store);
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;
    let admin = seed_user(&store, UserRole::Admin, "admin@example.com").await;
    let technician = seed_user(&store, UserRole::Technician, "tech@example.com").await;

    let created = service
        .create_request(new_request(customer.id, Urgency::Normal))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();

    assert!(matches!(
        service.claim_request(customer, request_id).await,
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        service.approve_request(technician, request_id, None, None).await,
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        service
            .confirm_payment(admin, ObjectId::new(), 1.0, "INR".to_string(), upi())
            .await,
        Err(ServiceError::Forbidden(_))
    ));
}

#[tokio::test]
async fn payment_validates_method_amount_and_currency() {
    let store = Arc::new(MemoryStore::new());
    let service = lifecycle(&store);
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;
    let admin = seed_user(&store, UserRole::Admin, "admin@example.com").await;
    let technician = seed_user(&store, UserRole::Technician, "tech@example.com").await;

    let created = service
        .create_request(new_request(customer.id, Urgency::Normal))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();
    service
        .approve_request(admin, request_id, None, Some(technician.id))
        .await
        .expect("approve");
    service.technician_accept(technician, request_id, None).await.expect("accept");
    let quote = service
        .issue_bill(technician, request_id, vec![item("Screen", 100.00)], None)
        .await
        .expect("bill");
    let quote_id = quote.id.unwrap();

    let bad_upi = service
        .confirm_payment(
            customer,
            quote_id,
            100.00,
            "INR".to_string(),
            PaymentMethod::Upi {
                upi_id: "no-at-sign".to_string(),
            },
        )
        .await;
    assert!(matches!(bad_upi, Err(ServiceError::Validation(_))));

    let bad_card = service
        .confirm_payment(
            customer,
            quote_id,
            100.00,
            "INR".to_string(),
            PaymentMethod::Card {
                saved_card_id: None,
                details: Some(CardDetails {
                    card_number: "1234".to_string(),
                    card_holder_name: "T U".to_string(),
                    expiry: "12/30".to_string(),
                    cvv: "123".to_string(),
                }),
                save_card: false,
            },
        )
        .await;
    assert!(matches!(bad_card, Err(ServiceError::Validation(_))));

    let wrong_amount = service
        .confirm_payment(customer, quote_id, 99.00, "INR".to_string(), upi())
        .await;
    assert!(matches!(wrong_amount, Err(ServiceError::Validation(_))));

    let wrong_currency = service
        .confirm_payment(customer, quote_id, 100.00, "USD".to_string(), upi())
        .await;
    assert!(matches!(wrong_currency, Err(ServiceError::Validation(_))));

    // Quote remains payable after every refused attempt.
    service
        .confirm_payment(customer, quote_id, 100.00, "INR".to_string(), upi())
        .await
        .expect("pay");
}

#[tokio::test]
async fn set_default_card_is_idempotent_with_one_default() {
    let store = Arc::new(MemoryStore::new());
    let service = lifecycle(&store);
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;

    let details = |number: &str| CardDetails {
        card_number: number.to_string(),
        card_holder_name: "Test User".to_string(),
        expiry: "11/29".to_string(),
        cvv: String::new(),
    };
    let first = service
        .save_card(customer, details("4111 1111 1111 1111"))
        .await
        .expect("first card");
    let second = service
        .save_card(customer, details("5500 0000 0000 0004"))
        .await
        .expect("second card");
    assert!(first.is_default, "first saved card becomes the default");
    assert!(!second.is_default);

    let second_id = second.id.unwrap();
    service.set_default_card(customer, second_id).await.expect("set default");
    service.set_default_card(customer, second_id).await.expect("set default again");

    let cards = startronics_backend::repository::saved_card_repo::SavedCardRepository::list_by_user(
        store.as_ref(),
        customer.id,
    )
    .await
    .expect("cards");
    let defaults: Vec<_> = cards.iter().filter(|c| c.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, Some(second_id));
    assert_eq!(cards[0].id, Some(second_id), "default card listed first");
}

#[tokio::test]
async fn customers_touch_requests_only_while_pending() {
    let store = Arc::new(MemoryStore::new());
    let service = lifecycle(&store);
    let customer = seed_user(&store, UserRole::Customer, "cust@example.com").await;
    let admin = seed_user(&store, UserRole::Admin, "admin@example.com").await;

    let created = service
        .create_request(new_request(customer.id, Urgency::Normal))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();

    let updated = service
        .update_request(
            customer.id,
            request_id,
            Some("Screen cracked and battery drains".to_string()),
            Some(Urgency::High),
        )
        .await
        .expect("update");
    assert_eq!(updated.urgency, Urgency::High);

    service
        .approve_request(admin, request_id, None, None)
        .await
        .expect("approve");
    let refused = service
        .update_request(customer.id, request_id, None, Some(Urgency::Low))
        .await;
    assert!(matches!(refused, Err(ServiceError::InvalidState(_))));
    let refused = service.delete_request(customer.id, request_id).await;
    assert!(matches!(refused, Err(ServiceError::InvalidState(_))));

    let other = service
        .create_request(new_request(customer.id, Urgency::Low))
        .await
        .expect("create second");
    service
        .delete_request(customer.id, other.request.id.unwrap())
        .await
        .expect("delete pending");
}
