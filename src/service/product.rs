//! Products and their customer/manufacturer references.

use std::collections::HashSet;

use crate::error::{Result, ServiceError};
use crate::models::{Customer, Manufacturer, Product, ProductDraft, ProductInput};

use super::access::{EntityAccessService, Persisted};

/// Resolves product references before anything is written.
#[derive(Clone)]
pub struct ProductService {
    products: EntityAccessService<Product>,
    customers: EntityAccessService<Customer>,
    manufacturers: EntityAccessService<Manufacturer>,
}

impl ProductService {
    pub fn new(
        products: EntityAccessService<Product>,
        customers: EntityAccessService<Customer>,
        manufacturers: EntityAccessService<Manufacturer>,
    ) -> Self {
        Self {
            products,
            customers,
            manufacturers,
        }
    }

    /// Plain access to the product records.
    pub fn access(&self) -> &EntityAccessService<Product> {
        &self.products
    }

    pub async fn create(&self, input: ProductInput) -> Result<Persisted<Product>> {
        let draft = self.resolve(input).await?;
        self.products.create(draft).await
    }

    pub async fn update(&self, id: &str, input: ProductInput) -> Result<Persisted<Product>> {
        let draft = self.resolve(input).await?;
        self.products.update(id, draft).await
    }

    /// Products that list `manufacturer_id` among their manufacturers.
    pub async fn by_manufacturer(&self, manufacturer_id: &str) -> Result<Vec<Product>> {
        self.products
            .find(|p| p.manufacturers.iter().any(|m| m.id == manufacturer_id))
            .await
    }

    async fn resolve(&self, input: ProductInput) -> Result<ProductDraft> {
        let customer = match self.customers.get(&input.customer_id).await {
            Ok(customer) => customer,
            Err(ServiceError::NotFound { .. }) => {
                return Err(ServiceError::not_found(
                    "customerId",
                    format!("Customer with id {} not found", input.customer_id),
                ))
            }
            Err(err) => return Err(err),
        };

        let mut seen = HashSet::new();
        let ids: Vec<String> = input
            .manufacturer_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut found = self.manufacturers.get_range(&ids).await?;
        let missing: Vec<&str> = ids
            .iter()
            .filter(|id| !found.iter().any(|m| &m.id == *id))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::not_found(
                "manufacturerIds",
                format!("Manufacturers not found: {}", missing.join(", ")),
            ));
        }
        // Keep the caller's order
        found.sort_by_key(|m| ids.iter().position(|id| *id == m.id));

        Ok(ProductDraft {
            name: input.name,
            date_of_receipt: input.date_of_receipt,
            customer,
            manufacturers: found,
        })
    }
}
