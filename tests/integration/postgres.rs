//! PostgreSQL store tests
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test postgres -- --ignored
//! Each test gets a fresh database with the migrations applied.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use sqlx::PgPool;

use biblio_server::{
    error::AppError,
    models::{
        book::CreateBook,
        copy::CopyStatus,
        loan::NewLoan,
        notification::{Notification, NotificationType},
        user::{Role, User},
    },
    repository::Repository,
    services::catalog::CatalogService,
};

async fn stocked_book(repository: &Repository, copies: u32) -> String {
    let book = CatalogService::new(repository.clone())
        .create_book(CreateBook {
            title: "The Left Hand of Darkness".to_string(),
            author: "Ursula K. Le Guin".to_string(),
            isbn: None,
            published_year: Some(1969),
            description: None,
            copies: Some(copies),
        })
        .await
        .unwrap();
    book.book.id
}

async fn reader(repository: &Repository, email: &str) -> User {
    let user = User::new("Reader", email, Role::User, String::new());
    repository.users.create(&user).await.unwrap();
    user
}

fn borrow(user_id: &str, book_id: &str) -> NewLoan {
    let now = Utc::now();
    NewLoan {
        user_id: user_id.to_string(),
        book_id: book_id.to_string(),
        borrow_date: now,
        due_date: now + Duration::days(14),
    }
}

#[sqlx::test]
#[ignore]
async fn concurrent_checkouts_never_share_a_copy(pool: PgPool) {
    let repository = Repository::new(pool);
    let book_id = stocked_book(&repository, 3).await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let user = reader(&repository, &format!("reader{}@biblio.test", i)).await;
        let repository = repository.clone();
        let request = borrow(&user.id, &book_id);
        handles.push(tokio::spawn(async move {
            repository.loans.checkout(&request).await.unwrap()
        }));
    }

    let mut copies = HashSet::new();
    for handle in handles {
        if let Some(loan) = handle.await.unwrap() {
            assert!(copies.insert(loan.copy_id));
        }
    }
    assert_eq!(copies.len(), 3);
    assert_eq!(repository.copies.totals().await.unwrap().available, 0);
}

#[sqlx::test]
#[ignore]
async fn checkout_writes_nothing_when_it_fails(pool: PgPool) {
    let repository = Repository::new(pool);
    let book_id = stocked_book(&repository, 1).await;
    let copy = repository.copies.list_by_book(&book_id).await.unwrap().remove(0);
    assert!(repository
        .copies
        .set_status(&copy.id, CopyStatus::Available, CopyStatus::Maintenance)
        .await
        .unwrap());

    let user = reader(&repository, "ged@biblio.test").await;
    assert!(repository.loans.checkout(&borrow(&user.id, &book_id)).await.unwrap().is_none());

    repository
        .copies
        .set_status(&copy.id, CopyStatus::Maintenance, CopyStatus::Available)
        .await
        .unwrap();
    let err = repository
        .loans
        .checkout(&borrow("missing-user", &book_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert!(repository.loans.list_all().await.unwrap().is_empty());
    let copy = repository.copies.get(&copy.id).await.unwrap().unwrap();
    assert_eq!(copy.status, CopyStatus::Available);
}

#[sqlx::test]
#[ignore]
async fn user_cascade_frees_copies_and_reset_requests(pool: PgPool) {
    let repository = Repository::new(pool);
    let book_id = stocked_book(&repository, 2).await;
    let admin = User::new("Admin", "admin@biblio.test", Role::Admin, String::new());
    repository.users.create(&admin).await.unwrap();
    let tenar = reader(&repository, "tenar@biblio.test").await;

    let open = repository
        .loans
        .checkout(&borrow(&tenar.id, &book_id))
        .await
        .unwrap()
        .unwrap();
    let done = repository
        .loans
        .checkout(&borrow(&tenar.id, &book_id))
        .await
        .unwrap()
        .unwrap();
    repository.loans.return_loan(&done.id, Utc::now()).await.unwrap();

    let notifications = &repository.notifications;
    notifications
        .insert(&Notification::loan_returned(&tenar.id, "The Left Hand of Darkness"))
        .await
        .unwrap();
    notifications
        .insert(&Notification::password_reset_request(&admin.id, &tenar.email))
        .await
        .unwrap();
    notifications
        .insert(&Notification::loan_returned(&admin.id, "The Left Hand of Darkness"))
        .await
        .unwrap();

    let summary = repository
        .users
        .delete_cascade(&tenar.id, &tenar.email)
        .await
        .unwrap();
    assert_eq!(summary.freed_copies, 1);
    assert_eq!(summary.deleted_loans, 2);
    assert_eq!(summary.deleted_notifications, 2);

    assert!(repository.users.get(&tenar.id).await.unwrap().is_none());
    assert!(repository.loans.list_for_user(&tenar.id).await.unwrap().is_empty());
    let copy = repository.copies.get(&open.copy_id).await.unwrap().unwrap();
    assert_eq!(copy.status, CopyStatus::Available);

    let remaining = notifications.list_for_user(&admin.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].kind, NotificationType::LoanReturned);

    let err = repository
        .loans
        .checkout(&borrow(&tenar.id, &book_id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
