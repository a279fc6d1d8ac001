use std::sync::Arc;

use startronics_backend::model::quote::{LineItem, QuoteStatus};
use startronics_backend::model::repair_request::{RepairStatus, Urgency};
use startronics_backend::model::role::UserRole;
use startronics_backend::model::user::User;
use startronics_backend::repository::memory::MemoryStore;
use startronics_backend::repository::user_repo::UserRepository;
use startronics_backend::service::lifecycle_service::{
    Actor, CardDetails, LifecycleService, LifecycleServiceImpl, NewRepairRequest, PaymentMethod,
};
use startronics_backend::service::view_service::{ViewService, ViewServiceImpl};

fn services(store: &Arc<MemoryStore>) -> (LifecycleServiceImpl, ViewServiceImpl) {
    let lifecycle = LifecycleServiceImpl::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    );
    let views = ViewServiceImpl::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    );
    (lifecycle, views)
}

async fn seed_user(store: &Arc<MemoryStore>, role: UserRole, email: &str, name: &str) -> Actor {
    let user = store
        .insert(User {
            id: None,
            username: name.to_lowercase().replace(' ', "."),
            first_name: name.split(' ').next().unwrap_or("").to_string(),
            last_name: name.split(' ').nth(1).unwrap_or("").to_string(),
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

fn request_for(user_id: bson::oid::ObjectId, description: &str) -> NewRepairRequest {
    NewRepairRequest {
        user_id,
        device_type: "laptop".to_string(),
        brand: Some("Acme".to_string()),
        model: None,
        issue_description: description.to_string(),
        urgency: Urgency::Normal,
    }
}

#[tokio::test]
async fn customer_requests_are_newest_first_with_device_and_latest_quote() {
    let store = Arc::new(MemoryStore::new());
    let (lifecycle, views) = services(&store);
    let customer = seed_user(&store, UserRole::Customer, "c@example.com", "Cara Customer").await;
    let admin = seed_user(&store, UserRole::Admin, "a@example.com", "Ada Admin").await;
    let technician = seed_user(&store, UserRole::Technician, "t@example.com", "Tess Tech").await;

    let first = lifecycle
        .create_request(request_for(customer.id, "Fan noise"))
        .await
        .expect("first");
    let second = lifecycle
        .create_request(request_for(customer.id, "Dead pixel"))
        .await
        .expect("second");

    // Bill the first request so it carries a quote.
    let first_id = first.request.id.unwrap();
    lifecycle
        .approve_request(admin, first_id, None, Some(technician.id))
        .await
        .expect("approve");
    lifecycle.technician_accept(technician, first_id, None).await.expect("accept");
    lifecycle
        .issue_bill(
            technician,
            first_id,
            vec![LineItem {
                description: "Fan".to_string(),
                amount: 40.0,
            }],
            None,
        )
        .await
        .expect("bill");

    let list = views.customer_requests(customer.id).await.expect("list");
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].request.id, second.request.id, "newest first");
    assert_eq!(list[1].request.id, first.request.id);
    assert_eq!(list[1].device.as_ref().unwrap().device_type, "laptop");
    let latest = list[1].latest_quote.as_ref().expect("latest quote");
    assert_eq!(latest.amount, 40.0);
    assert!(list[0].latest_quote.is_none());
}

#[tokio::test]
async fn technician_workspace_counts_match_the_board() {
    let store = Arc::new(MemoryStore::new());
    let (lifecycle, views) = services(&store);
    let customer = seed_user(&store, UserRole::Customer, "c@example.com", "Cara Customer").await;
    let admin = seed_user(&store, UserRole::Admin, "a@example.com", "Ada Admin").await;
    let technician = seed_user(&store, UserRole::Technician, "t@example.com", "Tess Tech").await;

    // One open request in the pool.
    lifecycle
        .create_request(request_for(customer.id, "Open pool job"))
        .await
        .expect("open");

    // One assigned, accepted, billed and paid.
    let paid = lifecycle
        .create_request(request_for(customer.id, "Paid job"))
        .await
        .expect("paid");
    let paid_id = paid.request.id.unwrap();
    lifecycle
        .approve_request(admin, paid_id, None, Some(technician.id))
        .await
        .expect("approve");
    lifecycle.technician_accept(technician, paid_id, None).await.expect("accept");
    let paid_quote = lifecycle
        .issue_bill(
            technician,
            paid_id,
            vec![LineItem {
                description: "Work".to_string(),
                amount: 10.0,
            }],
            None,
        )
        .await
        .expect("bill");
    lifecycle
        .confirm_payment(
            customer,
            paid_quote.id.unwrap(),
            10.0,
            "INR".to_string(),
            PaymentMethod::Upi {
                upi_id: "c@upi".to_string(),
            },
        )
        .await
        .expect("pay");

    // One assigned, accepted and billed but unpaid.
    let unpaid = lifecycle
        .create_request(request_for(customer.id, "Unpaid job"))
        .await
        .expect("unpaid");
    let unpaid_id = unpaid.request.id.unwrap();
    lifecycle
        .approve_request(admin, unpaid_id, None, Some(technician.id))
        .await
        .expect("approve");
    lifecycle.technician_accept(technician, unpaid_id, None).await.expect("accept");
    lifecycle
        .issue_bill(
            technician,
            unpaid_id,
            vec![LineItem {
                description: "Diagnosis".to_string(),
                amount: 5.0,
            }],
            None,
        )
        .await
        .expect("bill");

    let workspace = views.technician_workspace(technician.id).await.expect("workspace");
    assert_eq!(workspace.counts.assigned, 2);
    assert_eq!(workspace.counts.open, 1);
    assert_eq!(workspace.counts.bills_pending, 1);
    assert_eq!(workspace.counts.bills_paid, 1);
    assert_eq!(workspace.my_requests.len(), 2);
    assert_eq!(workspace.open_requests.len(), 1);
    assert_eq!(workspace.open_requests[0].request.status, RepairStatus::Pending);
}

#[tokio::test]
async fn admin_view_joins_display_names_and_technicians() {
    let store = Arc::new(MemoryStore::new());
    let (lifecycle, views) = services(&store);
    let customer = seed_user(&store, UserRole::Customer, "c@example.com", "Cara Customer").await;
    let admin = seed_user(&store, UserRole::Admin, "a@example.com", "Ada Admin").await;
    let technician = seed_user(&store, UserRole::Technician, "t@example.com", "Tess Tech").await;

    let created = lifecycle
        .create_request(request_for(customer.id, "Named job"))
        .await
        .expect("create");
    lifecycle
        .approve_request(admin, created.request.id.unwrap(), None, Some(technician.id))
        .await
        .expect("approve");

    let rows = views.admin_requests().await.expect("admin view");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].customer_name.as_deref(), Some("Cara Customer"));
    assert_eq!(rows[0].technician_name.as_deref(), Some("Tess Tech"));

    let technicians = views.technicians().await.expect("technicians");
    assert_eq!(technicians.len(), 1);
    assert_eq!(technicians[0].display_name, "Tess Tech");
}

#[tokio::test]
async fn customer_quotes_carry_request_context() {
    let store = Arc::new(MemoryStore::new());
    let (lifecycle, views) = services(&store);
    let customer = seed_user(&store, UserRole::Customer, "c@example.com", "Cara Customer").await;
    let admin = seed_user(&store, UserRole::Admin, "a@example.com", "Ada Admin").await;
    let technician = seed_user(&store, UserRole::Technician, "t@example.com", "Tess Tech").await;

    let created = lifecycle
        .create_request(request_for(customer.id, "Hinge broken"))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();
    lifecycle
        .approve_request(admin, request_id, None, Some(technician.id))
        .await
        .expect("approve");
    lifecycle.technician_accept(technician, request_id, None).await.expect("accept");
    lifecycle
        .issue_bill(
            technician,
            request_id,
            vec![LineItem {
                description: "Hinge".to_string(),
                amount: 25.0,
            }],
            None,
        )
        .await
        .expect("bill");

    let quotes = views.customer_quotes(customer.id).await.expect("quotes");
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].quote.status, QuoteStatus::Sent);
    assert_eq!(
        quotes[0].request_title.as_deref(),
        Some("laptop - Hinge broken")
    );
    assert_eq!(quotes[0].request_status, Some(RepairStatus::Completed));
}

#[tokio::test]
async fn payment_history_joins_quote_and_device() {
    let store = Arc::new(MemoryStore::new());
    let (lifecycle, views) = services(&store);
    let customer = seed_user(&store, UserRole::Customer, "c@example.com", "Cara Customer").await;
    let admin = seed_user(&store, UserRole::Admin, "a@example.com", "Ada Admin").await;
    let technician = seed_user(&store, UserRole::Technician, "t@example.com", "Tess Tech").await;

    let created = lifecycle
        .create_request(request_for(customer.id, "Battery swap"))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();
    lifecycle
        .approve_request(admin, request_id, None, Some(technician.id))
        .await
        .expect("approve");
    lifecycle.technician_accept(technician, request_id, None).await.expect("accept");
    let quote = lifecycle
        .issue_bill(
            technician,
            request_id,
            vec![LineItem {
                description: "Battery".to_string(),
                amount: 60.0,
            }],
            None,
        )
        .await
        .expect("bill");
    lifecycle
        .confirm_payment(
            customer,
            quote.id.unwrap(),
            60.0,
            "INR".to_string(),
            PaymentMethod::Upi {
                upi_id: "c@upi".to_string(),
            },
        )
        .await
        .expect("pay");

    let payments = views.customer_payments(customer.id).await.expect("payments");
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].payment.amount, 60.0);
    assert_eq!(payments[0].quote.as_ref().unwrap().status, QuoteStatus::Accepted);
    assert_eq!(
        payments[0].request_title.as_deref(),
        Some("laptop - Battery swap")
    );
    assert_eq!(payments[0].device.as_ref().unwrap().device_type, "laptop");
}

#[tokio::test]
async fn saved_cards_list_default_first() {
    let store = Arc::new(MemoryStore::new());
    let (lifecycle, views) = services(&store);
    let customer = seed_user(&store, UserRole::Customer, "c@example.com", "Cara Customer").await;

    let details = |number: &str| CardDetails {
        card_number: number.to_string(),
        card_holder_name: "Cara Customer".to_string(),
        expiry: "10/28".to_string(),
        cvv: String::new(),
    };
    lifecycle
        .save_card(customer, details("4111 1111 1111 1111"))
        .await
        .expect("visa");
    let mastercard = lifecycle
        .save_card(customer, details("5500 0000 0000 0004"))
        .await
        .expect("mastercard");
    lifecycle
        .set_default_card(customer, mastercard.id.unwrap())
        .await
        .expect("set default");

    let cards = views.customer_cards(customer.id).await.expect("cards");
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].id, mastercard.id);
    assert!(cards[0].is_default);
    assert!(!cards[1].is_default);
}

#[tokio::test]
async fn recent_stories_and_request_count() {
    let store = Arc::new(MemoryStore::new());
    let (lifecycle, views) = services(&store);
    let customer = seed_user(&store, UserRole::Customer, "c@example.com", "Cara Customer").await;
    let admin = seed_user(&store, UserRole::Admin, "a@example.com", "Ada Admin").await;
    let technician = seed_user(&store, UserRole::Technician, "t@example.com", "Tess Tech").await;

    let created = lifecycle
        .create_request(request_for(customer.id, "Story job"))
        .await
        .expect("create");
    let request_id = created.request.id.unwrap();
    lifecycle
        .approve_request(admin, request_id, None, Some(technician.id))
        .await
        .expect("approve");
    lifecycle.technician_accept(technician, request_id, None).await.expect("accept");
    let quote = lifecycle
        .issue_bill(
            technician,
            request_id,
            vec![LineItem {
                description: "Work".to_string(),
                amount: 15.0,
            }],
            None,
        )
        .await
        .expect("bill");
    lifecycle
        .confirm_payment(
            customer,
            quote.id.unwrap(),
            15.0,
            "INR".to_string(),
            PaymentMethod::Upi {
                upi_id: "c@upi".to_string(),
            },
        )
        .await
        .expect("pay");
    lifecycle
        .add_story(customer, quote.id.unwrap(), 5, "Great work".to_string(), None)
        .await
        .expect("story");

    let stories = views.recent_stories(10).await.expect("stories");
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].rating, 5);

    assert_eq!(views.repair_request_count().await.expect("count"), 1);
}
