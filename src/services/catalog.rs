//! Catalog management service: books and their physical copies

use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, BookWithAvailability, CreateBook, UpdateBook},
        copy::{BookCopy, CopyStatus, CreateCopies, UpdateCopy},
        ids::generate_id,
    },
    repository::{Availability, Repository},
};

const MAX_COPIES_PER_REQUEST: u32 = 100;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with their copy counters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<BookWithAvailability>, i64)> {
        let (books, total) = self.repository.books.search(query).await?;
        let ids: Vec<String> = books.iter().map(|b| b.id.clone()).collect();
        let availability = self.repository.copies.availability(&ids).await?;

        let books = books
            .into_iter()
            .map(|book| {
                let counts = availability.get(&book.id).copied().unwrap_or_default();
                with_availability(book, counts)
            })
            .collect();
        Ok((books, total))
    }

    /// Get book by ID with its copy counters
    pub async fn get_book(&self, id: &str) -> AppResult<BookWithAvailability> {
        let book = self.find_book(id).await?;
        self.attach_availability(book).await
    }

    /// Create a book, optionally with a batch of AVAILABLE copies
    pub async fn create_book(&self, request: CreateBook) -> AppResult<BookWithAvailability> {
        request.validate()?;

        let book = Book {
            id: generate_id(),
            title: request.title.trim().to_string(),
            author: request.author.trim().to_string(),
            isbn: request.isbn,
            published_year: request.published_year,
            description: request.description,
            created_at: Utc::now(),
        };
        let copies: Vec<BookCopy> = (0..request.copies.unwrap_or(0))
            .map(|_| BookCopy::new(&book.id))
            .collect();

        self.repository.books.create(&book, &copies).await?;
        tracing::info!(book_id = %book.id, copies = copies.len(), "Book created");

        let count = copies.len() as i64;
        Ok(with_availability(
            book,
            Availability {
                total: count,
                available: count,
            },
        ))
    }

    pub async fn update_book(&self, id: &str, request: UpdateBook) -> AppResult<BookWithAvailability> {
        request.validate()?;

        let mut book = self.find_book(id).await?;
        request.apply(&mut book);

        if !self.repository.books.update(&book).await? {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        self.attach_availability(book).await
    }

    /// Delete a book and its copies; refused while a copy is on loan
    pub async fn delete_book(&self, id: &str) -> AppResult<()> {
        if !self.repository.books.delete(id).await? {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        tracing::info!(book_id = %id, "Book deleted");
        Ok(())
    }

    pub async fn list_copies(&self, book_id: &str) -> AppResult<Vec<BookCopy>> {
        self.find_book(book_id).await?;
        self.repository.copies.list_by_book(book_id).await
    }

    /// Add AVAILABLE copies to an existing book
    pub async fn add_copies(&self, book_id: &str, request: CreateCopies) -> AppResult<Vec<BookCopy>> {
        let count = request.count.unwrap_or(1);
        if count == 0 || count > MAX_COPIES_PER_REQUEST {
            return Err(AppError::Validation(format!(
                "count must be between 1 and {}",
                MAX_COPIES_PER_REQUEST
            )));
        }

        self.find_book(book_id).await?;
        let copies: Vec<BookCopy> = (0..count).map(|_| BookCopy::new(book_id)).collect();
        self.repository.copies.create_many(&copies).await?;
        tracing::info!(book_id = %book_id, count, "Copies added");
        Ok(copies)
    }

    /// Toggle a copy between AVAILABLE and MAINTENANCE
    pub async fn update_copy(&self, id: &str, request: UpdateCopy) -> AppResult<BookCopy> {
        let mut copy = self.find_copy(id).await?;

        if copy.status == CopyStatus::Borrowed {
            return Err(AppError::Conflict("Copy is currently borrowed".to_string()));
        }
        if !copy.status.can_set_manually(request.status) {
            return Err(AppError::BadRequest(format!(
                "Cannot change copy status from {} to {}",
                copy.status, request.status
            )));
        }

        if !self
            .repository
            .copies
            .set_status(id, copy.status, request.status)
            .await?
        {
            // Lost a race with a checkout or a deletion
            return Err(AppError::Conflict("Copy status changed, retry".to_string()));
        }

        copy.status = request.status;
        Ok(copy)
    }

    pub async fn delete_copy(&self, id: &str) -> AppResult<()> {
        let copy = self.find_copy(id).await?;
        if copy.status == CopyStatus::Borrowed || !self.repository.copies.delete_unborrowed(id).await? {
            return Err(AppError::Conflict("Copy is currently borrowed".to_string()));
        }
        tracing::info!(copy_id = %id, book_id = %copy.book_id, "Copy deleted");
        Ok(())
    }

    async fn find_book(&self, id: &str) -> AppResult<Book> {
        self.repository
            .books
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    async fn find_copy(&self, id: &str) -> AppResult<BookCopy> {
        self.repository
            .copies
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy {} not found", id)))
    }

    async fn attach_availability(&self, book: Book) -> AppResult<BookWithAvailability> {
        let counts = self
            .repository
            .copies
            .availability(std::slice::from_ref(&book.id))
            .await?
            .remove(&book.id)
            .unwrap_or_default();
        Ok(with_availability(book, counts))
    }
}

fn with_availability(book: Book, counts: Availability) -> BookWithAvailability {
    BookWithAvailability {
        book,
        total_copies: counts.total,
        available_copies: counts.available,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        loan::NewLoan,
        user::{Role, User},
    };
    use chrono::Duration;

    fn create(title: &str, copies: u32) -> CreateBook {
        CreateBook {
            title: title.to_string(),
            author: "Frank Herbert".to_string(),
            isbn: None,
            published_year: Some(1965),
            description: None,
            copies: Some(copies),
        }
    }

    async fn borrow(repository: &Repository, book_id: &str) {
        let reader = User::new("Reader", "reader@example.org", Role::User, String::new());
        repository.users.create(&reader).await.unwrap();
        let now = Utc::now();
        repository
            .loans
            .checkout(&NewLoan {
                user_id: reader.id.clone(),
                book_id: book_id.to_string(),
                borrow_date: now,
                due_date: now + Duration::days(14),
            })
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn availability_follows_copies() {
        let repository = Repository::in_memory();
        let catalog = CatalogService::new(repository.clone());
        let book = catalog.create_book(create("Dune", 2)).await.unwrap();
        assert_eq!((book.total_copies, book.available_copies), (2, 2));

        borrow(&repository, &book.book.id).await;
        let book = catalog.get_book(&book.book.id).await.unwrap();
        assert_eq!((book.total_copies, book.available_copies), (2, 1));

        let (books, total) = catalog.search_books(&BookQuery::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(books[0].available_copies, 1);
    }

    #[tokio::test]
    async fn search_matches_title_or_author_case_insensitively() {
        let catalog = CatalogService::new(Repository::in_memory());
        catalog.create_book(create("Dune", 0)).await.unwrap();
        catalog.create_book(create("Children of Dune", 0)).await.unwrap();
        let mut other = create("Neuromancer", 0);
        other.author = "William Gibson".to_string();
        catalog.create_book(other).await.unwrap();

        let query = BookQuery {
            q: Some("dUnE".to_string()),
            ..Default::default()
        };
        let (books, total) = catalog.search_books(&query).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(books[0].book.title, "Children of Dune");

        let query = BookQuery {
            q: Some("gibson".to_string()),
            ..Default::default()
        };
        assert_eq!(catalog.search_books(&query).await.unwrap().1, 1);
    }

    #[tokio::test]
    async fn borrowed_copy_cannot_be_changed_by_hand() {
        let repository = Repository::in_memory();
        let catalog = CatalogService::new(repository.clone());
        let book = catalog.create_book(create("Dune", 1)).await.unwrap();
        borrow(&repository, &book.book.id).await;
        let copy = catalog.list_copies(&book.book.id).await.unwrap().remove(0);

        let err = catalog
            .update_copy(&copy.id, UpdateCopy { status: CopyStatus::Maintenance })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(matches!(catalog.delete_copy(&copy.id).await, Err(AppError::Conflict(_))));
        assert!(matches!(catalog.delete_book(&book.book.id).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn copies_toggle_between_available_and_maintenance() {
        let catalog = CatalogService::new(Repository::in_memory());
        let book = catalog.create_book(create("Dune", 1)).await.unwrap();
        let copy = catalog.list_copies(&book.book.id).await.unwrap().remove(0);

        let copy = catalog
            .update_copy(&copy.id, UpdateCopy { status: CopyStatus::Maintenance })
            .await
            .unwrap();
        assert_eq!(copy.status, CopyStatus::Maintenance);

        let err = catalog
            .update_copy(&copy.id, UpdateCopy { status: CopyStatus::Borrowed })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let book = catalog.get_book(&book.book.id).await.unwrap();
        assert_eq!((book.total_copies, book.available_copies), (1, 0));
    }

    #[tokio::test]
    async fn add_copies_validates_count_and_book() {
        let catalog = CatalogService::new(Repository::in_memory());
        let book = catalog.create_book(create("Dune", 0)).await.unwrap();

        let added = catalog
            .add_copies(&book.book.id, CreateCopies { count: Some(3) })
            .await
            .unwrap();
        assert_eq!(added.len(), 3);
        assert!(added.iter().all(|c| c.status == CopyStatus::Available));

        assert!(matches!(
            catalog.add_copies(&book.book.id, CreateCopies { count: Some(0) }).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            catalog.add_copies("missing", CreateCopies::default()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
