//! Session-backed cart for guests.
//!
//! Lives under [`session_keys::GUEST_CART`] and shares the session's
//! lifetime: when the session expires, the cart is gone.
//!
//! The session layer gives each request a private copy of the record and
//! writes it back after the handler runs, so two concurrent mutations on the
//! same session would otherwise overwrite each other. Mutations therefore
//! take a per-session lock for the read-modify-write and flush the record to
//! the backing store before releasing it, the session-side counterpart of
//! the row lock in [`crate::db::CartRepository::mutate`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};

use async_trait::async_trait;
use tower_sessions::Session;

use okra_core::ProductId;

use super::{CartError, CartStore};
use crate::models::{Cart, LineSnapshot, session_keys};

static CART_LOCKS: LazyLock<Mutex<HashMap<String, Weak<tokio::sync::Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Lock guarding cart mutations for one session id.
///
/// Entries are weak so the registry never outgrows the set of sessions with
/// a mutation in flight; dead entries are swept whenever a new lock is made.
fn cart_lock(session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
    let mut locks = CART_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = locks.get(session_id).and_then(Weak::upgrade) {
        return existing;
    }
    locks.retain(|_, lock| lock.strong_count() > 0);
    let fresh = Arc::new(tokio::sync::Mutex::new(()));
    locks.insert(session_id.to_owned(), Arc::downgrade(&fresh));
    fresh
}

/// Cart store backed by the caller's session.
pub struct SessionCartStore {
    session: Session,
}

impl SessionCartStore {
    /// Create a store over the request's session. `Session` is a cheap
    /// handle; clones share the underlying record.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    async fn load(&self) -> Result<Cart, CartError> {
        Ok(self
            .session
            .get::<Cart>(session_keys::GUEST_CART)
            .await?
            .unwrap_or_default())
    }

    async fn store(&self, cart: &Cart) -> Result<(), CartError> {
        self.session.insert(session_keys::GUEST_CART, cart).await?;
        Ok(())
    }

    async fn apply<F>(&self, mutate: F) -> Result<Cart, CartError>
    where
        F: FnOnce(&mut Cart) -> Result<(), CartError> + Send,
    {
        // A session with no id yet has never been saved, so no other request
        // can be racing on it.
        let _guard = match self.session.id() {
            Some(id) => Some(cart_lock(&id.to_string()).lock_owned().await),
            None => None,
        };

        // Refresh from the backing store under the lock; the record may have
        // been cached earlier in the request, before the lock was ours.
        self.session.load().await?;

        let mut cart = self.load().await?;
        mutate(&mut cart)?;
        self.store(&cart).await?;
        // Flush while the lock is held so the next holder reads this write
        // instead of whatever the session layer last saved.
        self.session.save().await?;
        Ok(cart)
    }
}

#[async_trait]
impl CartStore for SessionCartStore {
    async fn read(&self) -> Result<Cart, CartError> {
        self.load().await
    }

    async fn add_line(
        &self,
        snapshot: LineSnapshot,
        quantity: i32,
        size: Option<String>,
        color: Option<String>,
    ) -> Result<Cart, CartError> {
        self.apply(|cart| {
            cart.add_line(snapshot, quantity, size, color)
                .map_err(CartError::from)
        })
        .await
    }

    async fn update_quantity(
        &self,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Cart, CartError> {
        self.apply(|cart| {
            cart.update_quantity(product_id, quantity)
                .map_err(CartError::from)
        })
        .await
    }

    async fn remove(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.apply(|cart| cart.remove(product_id).map_err(CartError::from))
            .await
    }

    async fn clear(&self) -> Result<Cart, CartError> {
        self.apply(|cart| {
            cart.clear();
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::{MemoryStore, Session, session::Id};

    use okra_core::Price;

    use super::*;

    fn snapshot() -> LineSnapshot {
        LineSnapshot {
            product_id: ProductId::new(1),
            name: "Ankara Tote".to_owned(),
            unit_price: Price::from_minor(550_000).expect("price"),
            image_url: None,
        }
    }

    fn handle(backing: &Arc<MemoryStore>, id: Id) -> Session {
        Session::new(Some(id), backing.clone(), None)
    }

    /// Seed one line and return the id the store assigned on first save.
    async fn seeded(backing: &Arc<MemoryStore>, quantity: i32) -> Id {
        let session = Session::new(None, backing.clone(), None);
        SessionCartStore::new(session.clone())
            .add_line(snapshot(), quantity, None, None)
            .await
            .expect("seed");
        session.id().expect("id assigned on save")
    }

    #[tokio::test]
    async fn test_overlapping_adds_to_one_session_both_survive() {
        let backing = Arc::new(MemoryStore::default());
        let id = seeded(&backing, 1).await;

        // Two in-flight requests over the same session. Each caches the
        // record before either writes, the way extractors do.
        let store_a = SessionCartStore::new(handle(&backing, id));
        let store_b = SessionCartStore::new(handle(&backing, id));
        store_a.read().await.expect("read a");
        store_b.read().await.expect("read b");

        store_a
            .add_line(snapshot(), 1, None, None)
            .await
            .expect("first add");
        store_b
            .add_line(snapshot(), 1, None, None)
            .await
            .expect("second add");

        let cart = SessionCartStore::new(handle(&backing, id))
            .read()
            .await
            .expect("read");
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 3, "an increment was lost");
    }

    #[tokio::test]
    async fn test_mutations_survive_a_fresh_handle() {
        let backing = Arc::new(MemoryStore::default());
        let id = seeded(&backing, 2).await;

        // A later request sees the write without any middleware save.
        let cart = SessionCartStore::new(handle(&backing, id))
            .read()
            .await
            .expect("read");
        assert_eq!(cart.items[0].quantity, 2);
    }
}
