//! In-process store
//!
//! All collections live behind one `RwLock`, so every trait method is atomic
//! with respect to every other. Used with `database.url = "memory://"` and by
//! the test suite.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{Availability, BookStore, CopyStore, LoanStore, NotificationStore, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery},
        copy::{BookCopy, CopyStatus},
        loan::{Loan, LoanStatus, NewLoan},
        notification::Notification,
        user::{DeletionSummary, Role, User, UserChanges, UserQuery},
    },
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<String, User>,
    books: BTreeMap<String, Book>,
    copies: BTreeMap<String, BookCopy>,
    loans: BTreeMap<String, Loan>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<&str>) -> bool {
        self.users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id.as_str()) != except)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_pattern(pattern: &Option<String>, fields: &[&str]) -> bool {
    match pattern {
        None => true,
        Some(p) => fields.iter().any(|f| f.to_lowercase().contains(p)),
    }
}

fn normalized_pattern(q: &Option<String>) -> Option<String> {
    q.as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn create(&self, book: &Book, copies: &[BookCopy]) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.books.insert(book.id.clone(), book.clone());
        for copy in copies {
            tables.copies.insert(copy.id.clone(), copy.clone());
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(id).cloned())
    }

    async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let pattern = normalized_pattern(&query.q);
        let tables = self.tables.read().await;

        let mut books: Vec<Book> = tables
            .books
            .values()
            .filter(|b| matches_pattern(&pattern, &[b.title.as_str(), b.author.as_str()]))
            .cloned()
            .collect();
        books.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = books.len() as i64;
        let page = books
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.per_page() as usize)
            .collect();
        Ok((page, total))
    }

    async fn update(&self, book: &Book) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.books.get_mut(&book.id) {
            Some(existing) => {
                *existing = book.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let mut tables = self.tables.write().await;

        let borrowed = tables
            .copies
            .values()
            .filter(|c| c.book_id == id && c.status == CopyStatus::Borrowed)
            .count();
        if borrowed > 0 {
            return Err(AppError::Conflict(format!(
                "Book has {} borrowed copies",
                borrowed
            )));
        }

        tables.copies.retain(|_, c| c.book_id != id);
        Ok(tables.books.remove(id).is_some())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables.read().await.books.len() as i64)
    }

    async fn titles(&self, ids: &[String]) -> AppResult<HashMap<String, String>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.books.get(id).map(|b| (id.clone(), b.title.clone())))
            .collect())
    }
}

#[async_trait]
impl CopyStore for MemoryStore {
    async fn create_many(&self, copies: &[BookCopy]) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        for copy in copies {
            tables.copies.insert(copy.id.clone(), copy.clone());
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<BookCopy>> {
        Ok(self.tables.read().await.copies.get(id).cloned())
    }

    async fn list_by_book(&self, book_id: &str) -> AppResult<Vec<BookCopy>> {
        let tables = self.tables.read().await;
        let mut copies: Vec<BookCopy> = tables
            .copies
            .values()
            .filter(|c| c.book_id == book_id)
            .cloned()
            .collect();
        copies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(copies)
    }

    async fn set_status(&self, id: &str, expected: CopyStatus, status: CopyStatus) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.copies.get_mut(id) {
            Some(copy) if copy.status == expected => {
                copy.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_unborrowed(&self, id: &str) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.copies.get(id) {
            Some(copy) if copy.status != CopyStatus::Borrowed => {
                tables.copies.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn availability(&self, book_ids: &[String]) -> AppResult<HashMap<String, Availability>> {
        let tables = self.tables.read().await;
        let mut counts: HashMap<String, Availability> = HashMap::new();
        for copy in tables.copies.values() {
            if !book_ids.contains(&copy.book_id) {
                continue;
            }
            let entry = counts.entry(copy.book_id.clone()).or_default();
            entry.total += 1;
            if copy.status == CopyStatus::Available {
                entry.available += 1;
            }
        }
        Ok(counts)
    }

    async fn totals(&self) -> AppResult<Availability> {
        let tables = self.tables.read().await;
        Ok(Availability {
            total: tables.copies.len() as i64,
            available: tables
                .copies
                .values()
                .filter(|c| c.status == CopyStatus::Available)
                .count() as i64,
        })
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn checkout(&self, request: &NewLoan) -> AppResult<Option<Loan>> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&request.user_id) {
            return Err(AppError::NotFound(format!("User {} not found", request.user_id)));
        }

        let copy_id = tables
            .copies
            .values()
            .filter(|c| c.book_id == request.book_id && c.status == CopyStatus::Available)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .map(|c| c.id.clone());

        let Some(copy_id) = copy_id else {
            return Ok(None);
        };

        if let Some(copy) = tables.copies.get_mut(&copy_id) {
            copy.status = CopyStatus::Borrowed;
        }
        let loan = Loan::open(request, &copy_id);
        tables.loans.insert(loan.id.clone(), loan.clone());
        Ok(Some(loan))
    }

    async fn get(&self, id: &str) -> AppResult<Option<Loan>> {
        Ok(self.tables.read().await.loans.get(id).cloned())
    }

    async fn list_all(&self) -> AppResult<Vec<Loan>> {
        let tables = self.tables.read().await;
        let mut loans: Vec<Loan> = tables.loans.values().cloned().collect();
        loans.sort_by(|a, b| b.borrow_date.cmp(&a.borrow_date).then_with(|| b.id.cmp(&a.id)));
        Ok(loans)
    }

    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Loan>> {
        let mut loans = LoanStore::list_all(self).await?;
        loans.retain(|l| l.user_id == user_id);
        Ok(loans)
    }

    async fn list_open(&self) -> AppResult<Vec<Loan>> {
        let tables = self.tables.read().await;
        let mut loans: Vec<Loan> = tables
            .loans
            .values()
            .filter(|l| !l.is_returned())
            .cloned()
            .collect();
        loans.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        Ok(loans)
    }

    async fn return_loan(&self, id: &str, returned_at: DateTime<Utc>) -> AppResult<Option<Loan>> {
        let mut tables = self.tables.write().await;

        let loan = match tables.loans.get_mut(id) {
            Some(loan) if !loan.is_returned() => {
                loan.return_date = Some(returned_at);
                loan.status = LoanStatus::Returned;
                loan.clone()
            }
            _ => return Ok(None),
        };

        if let Some(copy) = tables.copies.get_mut(&loan.copy_id) {
            if copy.status == CopyStatus::Borrowed {
                copy.status = CopyStatus::Available;
            }
        }
        Ok(Some(loan))
    }

    async fn record_reminder(
        &self,
        id: &str,
        status: LoanStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Loan>> {
        let mut tables = self.tables.write().await;
        match tables.loans.get_mut(id) {
            Some(loan) if !loan.is_returned() => {
                loan.reminder_count += 1;
                loan.last_reminder_at = Some(at);
                loan.status = status;
                Ok(Some(loan.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &User) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let pattern = normalized_pattern(&query.q);
        let tables = self.tables.read().await;

        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| matches_pattern(&pattern, &[u.name.as_str(), u.email.as_str()]))
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = users.len() as i64;
        let page = users
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.per_page() as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_admins(&self) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.role == Role::Admin)
            .cloned()
            .collect())
    }

    async fn update(&self, id: &str, changes: &UserChanges) -> AppResult<Option<User>> {
        let mut tables = self.tables.write().await;
        if let Some(ref email) = changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }

        let Some(user) = tables.users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(ref name) = changes.name {
            user.name = name.clone();
        }
        if let Some(ref email) = changes.email {
            user.email = email.clone();
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(ref hash) = changes.password_hash {
            user.password_hash = hash.clone();
        }
        Ok(Some(user.clone()))
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.tables.read().await.users.len() as i64)
    }

    async fn delete_cascade(&self, id: &str, email: &str) -> AppResult<DeletionSummary> {
        let mut tables = self.tables.write().await;
        let mut summary = DeletionSummary::default();

        let open_copies: Vec<String> = tables
            .loans
            .values()
            .filter(|l| l.user_id == id && !l.is_returned())
            .map(|l| l.copy_id.clone())
            .collect();
        for copy_id in open_copies {
            if let Some(copy) = tables.copies.get_mut(&copy_id) {
                if copy.status == CopyStatus::Borrowed {
                    copy.status = CopyStatus::Available;
                    summary.freed_copies += 1;
                }
            }
        }

        let before = tables.loans.len();
        tables.loans.retain(|_, l| l.user_id != id);
        summary.deleted_loans = (before - tables.loans.len()) as u64;

        let before = tables.notifications.len();
        tables
            .notifications
            .retain(|n| n.user_id != id && !n.is_reset_request_for(email));
        summary.deleted_notifications = (before - tables.notifications.len()) as u64;

        tables.users.remove(id);
        Ok(summary)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert(&self, notification: &Notification) -> AppResult<()> {
        self.tables.write().await.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut notifications: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(notifications)
    }

    async fn unread_count(&self, user_id: &str) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as i64)
    }

    async fn mark_read(&self, id: &str, user_id: &str) -> AppResult<Option<Notification>> {
        let mut tables = self.tables.write().await;
        match tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(n) => {
                n.is_read = true;
                Ok(Some(n.clone()))
            }
            None => Ok(None),
        }
    }

    async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let mut updated = 0;
        for n in tables
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            n.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }
}
