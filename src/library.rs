//! A small book catalog stored next to the university tables.

use crate::db;
use crate::error::{Result, StoreError};
use crate::models::{Book, EntityKind, NewBook};
use crate::schema::books::dsl::*;
use diesel::prelude::*;

/// Owns a connection to the database holding the `books` table.
pub struct LibraryManager {
    db: SqliteConnection,
}

/// Escapes the `LIKE` wildcards in `fragment` so it matches literally.
fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl LibraryManager {
    /// Connects to the sqlite database at `database_url`, waiting up to `busy_timeout_ms`
    /// for locks held by other writers.
    pub fn open(database_url: &str, busy_timeout_ms: u32) -> Result<Self> {
        let db = db::establish(database_url, busy_timeout_ms)?;
        Ok(Self { db })
    }

    pub fn from_connection(db: SqliteConnection) -> Self {
        Self { db }
    }

    /// Inserts a book. Title and author are both required.
    pub fn add_book(&mut self, new_book: &NewBook) -> Result<Book> {
        new_book.validate()?;

        let book = diesel::insert_into(books)
            .values(new_book)
            .returning(Book::as_returning())
            .get_result(&mut self.db)?;

        tracing::info!(book_id = book.id, "added book");
        Ok(book)
    }

    /// Every book, ordered by ID.
    pub fn books(&mut self) -> Result<Vec<Book>> {
        let rows = books
            .order(id)
            .select(Book::as_select())
            .load(&mut self.db)?;
        Ok(rows)
    }

    pub fn count_books(&mut self) -> Result<i64> {
        let count = books.count().get_result(&mut self.db)?;
        Ok(count)
    }

    pub fn book(&mut self, book_id: i32) -> Result<Option<Book>> {
        let book = books
            .find(book_id)
            .select(Book::as_select())
            .first(&mut self.db)
            .optional()?;
        Ok(book)
    }

    /// Books whose author contains `fragment`, ignoring ASCII case.
    pub fn find_by_author(&mut self, fragment: &str) -> Result<Vec<Book>> {
        let rows = books
            .filter(author.like(like_pattern(fragment)).escape('\\'))
            .order(id)
            .select(Book::as_select())
            .load(&mut self.db)?;

        tracing::debug!(fragment, found = rows.len(), "searched books by author");
        Ok(rows)
    }

    /// Removes and returns a book.
    pub fn delete_book(&mut self, book_id: i32) -> Result<Book> {
        let deleted = diesel::delete(books.find(book_id))
            .returning(Book::as_returning())
            .get_result(&mut self.db)
            .optional()?
            .ok_or_else(|| StoreError::not_found(EntityKind::Book, book_id))?;

        tracing::info!(book_id, "deleted book");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Tol"), "%Tol%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
