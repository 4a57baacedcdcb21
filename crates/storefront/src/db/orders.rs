//! Order repository.

use std::collections::HashSet;
use std::future::Future;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use template_shop_core::{
    NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatus, OrderStatusPatch, ProductId,
    UserId,
};

use super::RepositoryError;
use crate::backend::{BackendClient, Caller, Direction, Query};

const ORDERS: &str = "orders";
const ORDER_ITEMS: &str = "order_items";
const SELECT_WITH_ITEMS: &str = "*,order_items(*,products(title,slug,image_url))";
/// Rows requested per page when summing; the backend may cap pages lower.
const REVENUE_PAGE_SIZE: u32 = 1000;

#[derive(Deserialize)]
struct ProductIdRow {
    product_id: ProductId,
}

#[derive(Deserialize)]
struct TotalRow {
    total_amount: Decimal,
}

/// Repository for `orders` and `order_items`.
pub struct OrderRepository<'a> {
    client: &'a BackendClient,
    caller: Caller<'a>,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(client: &'a BackendClient, caller: Caller<'a>) -> Self {
        Self { client, caller }
    }

    /// A user's orders, newest first, with their items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let query = Query::new()
            .select(SELECT_WITH_ITEMS)
            .eq("user_id", user_id)
            .order("created_at", Direction::Desc);
        Ok(self.client.select(self.caller, ORDERS, &query).await?)
    }

    /// All orders, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut query = Query::new().select(SELECT_WITH_ITEMS);
        if let Some(status) = status {
            query = query.eq("status", status);
        }
        let query = query
            .order("created_at", Direction::Desc)
            .page(page, per_page);
        Ok(self.client.select(self.caller, ORDERS, &query).await?)
    }

    /// Get an order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let query = Query::new().select(SELECT_WITH_ITEMS).eq("id", id);
        Ok(self.client.select_one(self.caller, ORDERS, &query).await?)
    }

    /// Count orders, optionally only those with `status`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn count(&self, status: Option<OrderStatus>) -> Result<u64, RepositoryError> {
        let query = match status {
            Some(status) => Query::new().eq("status", status),
            None => Query::new(),
        };
        Ok(self.client.count(self.caller, ORDERS, &query).await?)
    }

    /// Sum of `total_amount` over completed orders.
    ///
    /// Pages through every completed order, so the backend's row cap cannot
    /// truncate the total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if a page fails.
    #[instrument(skip(self))]
    pub async fn completed_revenue(&self) -> Result<Decimal, RepositoryError> {
        sum_pages(|offset| async move {
            let query = Self::revenue_page(offset);
            let rows: Vec<TotalRow> = self.client.select(self.caller, ORDERS, &query).await?;
            let amounts: Vec<Decimal> = rows.into_iter().map(|r| r.total_amount).collect();
            Ok::<_, RepositoryError>(amounts)
        })
        .await
    }

    /// One page of completed order totals in a stable order.
    fn revenue_page(offset: u32) -> Query {
        Query::new()
            .select("total_amount")
            .eq("status", OrderStatus::Completed)
            .order("id", Direction::Asc)
            .limit(REVENUE_PAGE_SIZE)
            .offset(offset)
    }

    /// Products the user has bought in completed orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn purchased_product_ids(
        &self,
        user_id: UserId,
    ) -> Result<HashSet<ProductId>, RepositoryError> {
        let query = Self::purchases(user_id);
        let rows: Vec<ProductIdRow> = self.client.select(self.caller, ORDER_ITEMS, &query).await?;
        Ok(rows.into_iter().map(|r| r.product_id).collect())
    }

    /// Whether the user has a completed order containing `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the query fails.
    #[instrument(skip(self))]
    pub async fn has_purchased(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let query = Self::purchases(user_id).eq("product_id", product_id);
        let row: Option<ProductIdRow> = self
            .client
            .select_one(self.caller, ORDER_ITEMS, &query)
            .await?;
        Ok(row.is_some())
    }

    /// Insert an order row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the insert fails.
    #[instrument(skip(self, order), fields(user_id = %order.user_id, total = %order.total_amount))]
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        Ok(self.client.insert_one(self.caller, ORDERS, order).await?)
    }

    /// Insert the items of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Backend` if the insert fails.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn add_items(&self, items: &[NewOrderItem]) -> Result<Vec<OrderItem>, RepositoryError> {
        Ok(self.client.insert(self.caller, ORDER_ITEMS, items).await?)
    }

    /// Change an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this id.
    #[instrument(skip(self))]
    pub async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<Order, RepositoryError> {
        let query = Query::new().eq("id", id);
        let rows: Vec<Order> = self
            .client
            .update(self.caller, ORDERS, &query, &OrderStatusPatch { status })
            .await?;
        rows.into_iter().next().ok_or(RepositoryError::NotFound)
    }

    /// Order items joined to their completed order for `user_id`.
    fn purchases(user_id: UserId) -> Query {
        Query::new()
            .select("product_id,orders!inner(user_id,status)")
            .eq("orders.user_id", user_id)
            .eq("orders.status", OrderStatus::Completed)
    }
}

/// Add up amounts fetched page by page until an empty page comes back.
///
/// The offset advances by the rows actually returned, so a backend that
/// serves fewer rows than requested is still read to the end.
async fn sum_pages<F, Fut>(mut fetch: F) -> Result<Decimal, RepositoryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<Decimal>, RepositoryError>>,
{
    let mut total = Decimal::ZERO;
    let mut offset: u32 = 0;
    loop {
        let page = fetch(offset).await?;
        if page.is_empty() {
            return Ok(total);
        }
        offset = offset.saturating_add(u32::try_from(page.len()).unwrap_or(u32::MAX));
        total += page.into_iter().sum::<Decimal>();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_purchases_query_joins_completed_orders() {
        let user = UserId::new(uuid::Uuid::nil());
        assert_eq!(
            OrderRepository::purchases(user).to_query_string(),
            "select=product_id,orders!inner(user_id,status)\
             &orders.user_id=eq.00000000-0000-0000-0000-000000000000\
             &orders.status=eq.completed"
        );
    }

    #[test]
    fn test_revenue_page_query() {
        assert_eq!(
            OrderRepository::revenue_page(2000).to_query_string(),
            "select=total_amount&status=eq.completed&order=id.asc&limit=1000&offset=2000"
        );
    }

    #[tokio::test]
    async fn test_revenue_sums_past_row_cap() {
        // 7 orders of 10.00, served at most 3 rows per page
        let amounts = vec![Decimal::new(1000, 2); 7];
        let offsets = Mutex::new(Vec::new());

        let total = sum_pages(|offset| {
            offsets.lock().unwrap().push(offset);
            let start = (offset as usize).min(amounts.len());
            let end = (start + 3).min(amounts.len());
            let page = amounts[start..end].to_vec();
            async move { Ok::<_, RepositoryError>(page) }
        })
        .await
        .unwrap();

        assert_eq!(total, Decimal::new(7000, 2));
        assert_eq!(*offsets.lock().unwrap(), vec![0, 3, 6, 7]);
    }

    #[tokio::test]
    async fn test_revenue_page_error_propagates() {
        let result = sum_pages(|_| async { Err::<Vec<Decimal>, _>(RepositoryError::NotFound) }).await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }
}
