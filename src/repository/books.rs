//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{is_unique_violation, BookStore};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BookQuery},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    /// Get book by ID
    async fn get(&self, id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// List books matching the filter, ordered by title
    async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM books WHERE TRUE");

        if let Some(ref title) = query.title {
            builder.push(" AND title ILIKE ").push_bind(format!("%{}%", title));
        }
        if let Some(ref author) = query.author {
            builder.push(" AND author ILIKE ").push_bind(format!("%{}%", author));
        }
        if let Some(ref genre) = query.genre {
            builder.push(" AND LOWER(genre) = LOWER(").push_bind(genre.clone()).push(")");
        }
        if let Some(rarity) = query.rarity {
            builder.push(" AND rarity = ").push_bind(rarity);
        }
        if let Some(age) = query.max_age_limit {
            builder.push(" AND age_limit <= ").push_bind(age);
        }
        if query.available_only {
            builder.push(" AND copies_available > 0");
        }
        builder.push(" ORDER BY title, id");

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn insert(&self, book: &Book) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO books (
                id, title, author, publisher, genre, publishing_year, language,
                rarity, age_limit, copies_total, copies_available, version, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(&book.genre)
        .bind(book.publishing_year)
        .bind(&book.language)
        .bind(book.rarity)
        .bind(book.age_limit)
        .bind(book.copies_total)
        .bind(book.copies_available)
        .bind(book.version)
        .bind(book.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Book {} already exists", book.id))
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let rows = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }
}
