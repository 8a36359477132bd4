//! Product catalog repository.
//!
//! # Invariants
//! - Product names are unique; a duplicate insert surfaces as a storage error.
//! - `updated_at` is refreshed by storage on every update.

use super::{RepoError, RepoResult};
use crate::model::product::{Category, NewProduct, Product};
use crate::model::ProductId;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub trait ProductRepository {
    fn persist_product(&self, product: &NewProduct) -> RepoResult<Product>;
    fn find_product(&self, id: ProductId) -> RepoResult<Option<Product>>;
    fn update_product(&self, product: &Product) -> RepoResult<Product>;
    fn delete_product(&self, id: ProductId) -> RepoResult<()>;
    /// All products in id order.
    fn list_products(&self) -> RepoResult<Vec<Product>>;
}

pub struct SqliteProductRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProductRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProductRepository for SqliteProductRepository<'_> {
    fn persist_product(&self, product: &NewProduct) -> RepoResult<Product> {
        product.validate()?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO tbl_product (prod_name, price, category)
             VALUES (?1, ?2, ?3)
             RETURNING prod_id, prod_name, price, category, create_date, update_date;",
        )?;
        let mut rows = stmt.query(params![
            product.name,
            product.price,
            product.category.map(Category::as_db)
        ])?;
        match rows.next()? {
            Some(row) => parse_product_row(row),
            None => Err(RepoError::InvalidData(
                "insert returned no product row".to_string(),
            )),
        }
    }

    fn find_product(&self, id: ProductId) -> RepoResult<Option<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT prod_id, prod_name, price, category, create_date, update_date
             FROM tbl_product
             WHERE prod_id = ?1;",
        )?;
        let mut rows = stmt.query([id.0])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_product_row(row)?));
        }
        Ok(None)
    }

    fn update_product(&self, product: &Product) -> RepoResult<Product> {
        product.validate()?;

        let updated_at: Option<i64> = self
            .conn
            .query_row(
                "UPDATE tbl_product
                 SET
                    prod_name = ?1,
                    price = ?2,
                    category = ?3,
                    update_date = (strftime('%s', 'now') * 1000)
                 WHERE prod_id = ?4
                 RETURNING update_date;",
                params![
                    product.name,
                    product.price,
                    product.category.map(Category::as_db),
                    product.id.0
                ],
                |row| row.get(0),
            )
            .optional()?;

        match updated_at {
            Some(updated_at) => Ok(Product {
                updated_at,
                ..product.clone()
            }),
            None => Err(RepoError::not_found("product", product.id)),
        }
    }

    fn delete_product(&self, id: ProductId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tbl_product WHERE prod_id = ?1;", [id.0])?;
        if changed == 0 {
            return Err(RepoError::not_found("product", id));
        }
        Ok(())
    }

    fn list_products(&self) -> RepoResult<Vec<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT prod_id, prod_name, price, category, create_date, update_date
             FROM tbl_product
             ORDER BY prod_id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut products = Vec::new();
        while let Some(row) = rows.next()? {
            products.push(parse_product_row(row)?);
        }
        Ok(products)
    }
}

fn parse_product_row(row: &Row<'_>) -> RepoResult<Product> {
    let category = match row.get::<_, Option<String>>("category")? {
        Some(value) => Some(Category::parse_db(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid product category `{value}`"))
        })?),
        None => None,
    };

    Ok(Product {
        id: ProductId(row.get("prod_id")?),
        name: row.get("prod_name")?,
        price: row.get("price")?,
        category,
        created_at: row.get("create_date")?,
        updated_at: row.get("update_date")?,
    })
}
