use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::deal::Deal;
use crate::domain::product::{Product, ProductId};
use crate::domain::profile::{BusinessProfile, UserId};
use crate::domain::purchase::PurchaseRecord;

use super::{ProductFilter, PurchaseQuery, SignalStore, SignalStoreError};

/// Owned set of records used to seed an [`InMemorySignalStore`].
#[derive(Clone, Debug, Default)]
pub struct SignalSnapshot {
    pub profiles: Vec<BusinessProfile>,
    pub products: Vec<Product>,
    pub purchases: Vec<PurchaseRecord>,
    pub deals: Vec<Deal>,
}

/// Process-local signal store.
///
/// Counts every read so callers can assert that a request was rejected before
/// touching data, and can be switched into an unavailable state to exercise
/// outage handling.
#[derive(Default)]
pub struct InMemorySignalStore {
    profiles: RwLock<HashMap<UserId, BusinessProfile>>,
    products: RwLock<BTreeMap<ProductId, Product>>,
    purchases: RwLock<Vec<PurchaseRecord>>,
    deals: RwLock<Vec<Deal>>,
    reads: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: SignalSnapshot) -> Self {
        Self {
            profiles: RwLock::new(
                snapshot.profiles.into_iter().map(|profile| (profile.id, profile)).collect(),
            ),
            products: RwLock::new(
                snapshot.products.into_iter().map(|product| (product.id, product)).collect(),
            ),
            purchases: RwLock::new(snapshot.purchases),
            deals: RwLock::new(snapshot.deals),
            reads: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    pub async fn upsert_profile(&self, profile: BusinessProfile) {
        self.profiles.write().await.insert(profile.id, profile);
    }

    pub async fn upsert_product(&self, product: Product) {
        self.products.write().await.insert(product.id, product);
    }

    pub async fn record_purchase(&self, purchase: PurchaseRecord) {
        self.purchases.write().await.push(purchase);
    }

    pub async fn upsert_deal(&self, deal: Deal) {
        let mut deals = self.deals.write().await;
        deals.retain(|existing| existing.id != deal.id);
        deals.push(deal);
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn begin_read(&self) -> Result<(), SignalStoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SignalStoreError::Unavailable("in-memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SignalStore for InMemorySignalStore {
    async fn business_profile(
        &self,
        user_id: UserId,
    ) -> Result<Option<BusinessProfile>, SignalStoreError> {
        self.begin_read()?;
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }

    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, SignalStoreError> {
        self.begin_read()?;
        let products = self.products.read().await;
        Ok(products.values().filter(|product| filter.matches(product)).cloned().collect())
    }

    async fn purchases(
        &self,
        query: &PurchaseQuery,
    ) -> Result<Vec<PurchaseRecord>, SignalStoreError> {
        self.begin_read()?;
        let profiles = self.profiles.read().await;
        let purchases = self.purchases.read().await;

        let matches = purchases
            .iter()
            .filter(|purchase| query.user_id.map_or(true, |user_id| purchase.user_id == user_id))
            .filter(|purchase| match &query.city {
                Some(city) => profiles
                    .get(&purchase.user_id)
                    .is_some_and(|buyer| buyer.location.city.eq_ignore_ascii_case(city)),
                None => true,
            })
            .filter(|purchase| {
                query.product_ids.as_ref().map_or(true, |ids| ids.contains(&purchase.product_id))
            })
            .filter(|purchase| {
                query.order_ids.as_ref().map_or(true, |orders| orders.contains(&purchase.order_id))
            })
            .filter(|purchase| query.since.map_or(true, |since| purchase.purchased_at >= since))
            .cloned()
            .collect();

        Ok(matches)
    }

    async fn active_deals(&self, at: DateTime<Utc>) -> Result<Vec<Deal>, SignalStoreError> {
        self.begin_read()?;
        let deals = self.deals.read().await;
        Ok(deals.iter().filter(|deal| deal.is_active(at)).cloned().collect())
    }
}
