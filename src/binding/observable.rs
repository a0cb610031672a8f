use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::firestore::error::{FirestoreError, FirestoreResult};
use crate::util::subscribe::{PartialObserver, Unsubscribe};

#[cfg(not(target_arch = "wasm32"))]
pub type LoadFuture<T> = Pin<Box<dyn Future<Output = FirestoreResult<T>> + Send + 'static>>;
#[cfg(target_arch = "wasm32")]
pub type LoadFuture<T> = Pin<Box<dyn Future<Output = FirestoreResult<T>> + 'static>>;

/// Produces the live value of a binding each time it is invoked.
pub type Loader<T> = Arc<dyn Fn() -> LoadFuture<T> + Send + Sync + 'static>;

/// Tri-state result of a live binding.
#[derive(Clone, Debug, PartialEq)]
pub enum ObservableStatus<T> {
    Loading,
    Error(FirestoreError),
    Success(T),
}

impl<T> ObservableStatus<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ObservableStatus::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ObservableStatus::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FirestoreError> {
        match self {
            ObservableStatus::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// Shared handle over one live binding. Clones observe the same state.
pub struct Observable<T> {
    inner: Arc<ObservableInner<T>>,
}

struct ObservableInner<T> {
    status: Mutex<ObservableStatus<T>>,
    seeded: bool,
    has_emitted: AtomicBool,
    observers: Mutex<Vec<(usize, PartialObserver<ObservableStatus<T>>)>>,
    next_observer_id: AtomicUsize,
    loader: Loader<T>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("status", &*lock(&self.inner.status))
            .field("seeded", &self.inner.seeded)
            .finish()
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a binding around `loader`.
    ///
    /// With `initial_data` the binding starts in `Success` and never reports
    /// `Loading`; otherwise it stays `Loading` until the first `refresh`.
    pub fn new(loader: Loader<T>, initial_data: Option<T>) -> Self {
        let seeded = initial_data.is_some();
        let status = match initial_data {
            Some(data) => ObservableStatus::Success(data),
            None => ObservableStatus::Loading,
        };
        Self {
            inner: Arc::new(ObservableInner {
                status: Mutex::new(status),
                seeded,
                has_emitted: AtomicBool::new(seeded),
                observers: Mutex::new(Vec::new()),
                next_observer_id: AtomicUsize::new(0),
                loader,
            }),
        }
    }

    pub fn status(&self) -> ObservableStatus<T> {
        lock(&self.inner.status).clone()
    }

    pub fn data(&self) -> Option<T> {
        lock(&self.inner.status).data().cloned()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.inner.status).is_loading()
    }

    /// Whether the binding has produced a value or an error yet.
    pub fn has_emitted(&self) -> bool {
        self.inner.has_emitted.load(Ordering::SeqCst)
    }

    /// Whether the binding was created with initial data.
    pub fn is_seeded(&self) -> bool {
        self.inner.seeded
    }

    /// Registers `observer` for every subsequent status transition.
    pub fn subscribe(&self, observer: PartialObserver<ObservableStatus<T>>) -> Unsubscribe {
        let id = self.inner.next_observer_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.inner.observers).push((id, observer));
        let weak: Weak<ObservableInner<T>> = Arc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner.observers).retain(|(observer_id, _)| *observer_id != id);
            }
        })
    }

    /// Fetches the live value and publishes the resulting status.
    pub async fn refresh(&self) -> ObservableStatus<T> {
        let next = match (self.inner.loader)().await {
            Ok(data) => ObservableStatus::Success(data),
            Err(error) => ObservableStatus::Error(error),
        };
        self.publish(next.clone());
        next
    }

    fn publish(&self, status: ObservableStatus<T>) {
        *lock(&self.inner.status) = status.clone();
        self.inner.has_emitted.store(true, Ordering::SeqCst);

        let observers: Vec<_> = lock(&self.inner.observers)
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            if let Some(next) = &observer.next {
                next(&status);
            }
            if let (ObservableStatus::Error(error), Some(on_error)) = (&status, &observer.error) {
                on_error(error as &dyn std::error::Error);
            }
        }
    }
}
