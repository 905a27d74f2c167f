//! Lazily-initialized repository handles and the composition-root
//! container.
//!
//! Construction of a repository is asynchronous (it must connect first),
//! but callers want an always-available handle. [`Lazy`] defers the async
//! construction to first use and guarantees it runs at most once, even
//! under concurrent first calls; [`Interfaces`] owns one handle per entity
//! so the process has a single explicit registry instead of hidden
//! module-level singletons.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::OnceCell;

use crate::auth::AuthProvider;
use crate::entities::{Agency, Role, Session, Stop, User, UsersRepository};
use crate::repository::{ConnectOptions, Entity, Profile, RepoError, Repository};
use crate::store::MemoryStore;

type Factory<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, RepoError>> + Send + Sync>;

/// A value constructed asynchronously at most once.
///
/// `get` is single-flight: concurrent first calls wait on the same
/// in-flight construction and exactly one factory invocation succeeds. A
/// failed construction is not cached, so a later call retries.
pub struct Lazy<T> {
    cell: OnceCell<T>,
    factory: Factory<T>,
}

impl<T> Lazy<T> {
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RepoError>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(move || factory().boxed()),
        }
    }

    /// The value, constructing it on first call.
    pub async fn get(&self) -> Result<&T, RepoError> {
        self.cell.get_or_try_init(|| (self.factory)()).await
    }

    /// The value if it has already been constructed.
    pub fn ready(&self) -> Option<&T> {
        self.cell.get()
    }
}

/// The process-wide registry of typed repositories.
///
/// Owned by the composition root; consumers receive references. Call
/// [`init_all`](Self::init_all) at startup to resolve every handle before
/// request handling begins — afterwards every `get` is a pass-through.
pub struct Interfaces {
    pub agencies: Lazy<Repository<Agency>>,
    pub stops: Lazy<Repository<Stop>>,
    pub users: Lazy<UsersRepository>,
    pub roles: Lazy<Repository<Role>>,
    pub sessions: Lazy<Repository<Session>>,
}

impl Interfaces {
    /// Build the registry; each repository connects lazily using the
    /// connection string from its own environment variable.
    pub fn from_env(options: ConnectOptions) -> Self {
        let agencies = {
            let options = options.clone();
            Lazy::new(move || {
                let options = options.clone();
                async move { Repository::connect(&options).await }
            })
        };
        let stops = {
            let options = options.clone();
            Lazy::new(move || {
                let options = options.clone();
                async move { Repository::connect(&options).await }
            })
        };
        let users = {
            let options = options.clone();
            Lazy::new(move || {
                let options = options.clone();
                async move { UsersRepository::connect(&options).await }
            })
        };
        let roles = {
            let options = options.clone();
            Lazy::new(move || {
                let options = options.clone();
                async move { Repository::connect(&options).await }
            })
        };
        let sessions = {
            let options = options.clone();
            Lazy::new(move || {
                let options = options.clone();
                async move { Repository::connect(&options).await }
            })
        };
        Self {
            agencies,
            stops,
            users,
            roles,
            sessions,
        }
    }

    /// Build the registry over a shared in-memory store (test and
    /// single-process path).
    pub fn over_store(store: Arc<MemoryStore>, profile: Profile) -> Self {
        fn lazy_over<E: Entity>(store: &Arc<MemoryStore>, profile: Profile) -> Lazy<Repository<E>> {
            let store = Arc::clone(store);
            Lazy::new(move || {
                let collection = store.collection(E::COLLECTION);
                async move { Repository::from_collection(collection, profile).await }
            })
        }

        let users = {
            let store = Arc::clone(&store);
            Lazy::new(move || {
                let collection = store.collection(User::COLLECTION);
                async move { UsersRepository::from_collection(collection, profile).await }
            })
        };
        Self {
            agencies: lazy_over(&store, profile),
            stops: lazy_over(&store, profile),
            users,
            roles: lazy_over(&store, profile),
            sessions: lazy_over(&store, profile),
        }
    }

    /// Resolve every handle once, in startup order. Any failure aborts
    /// startup of the dependent service.
    pub async fn init_all(&self) -> Result<(), RepoError> {
        self.agencies.get().await?;
        self.stops.get().await?;
        self.users.get().await?;
        self.roles.get().await?;
        self.sessions.get().await?;
        Ok(())
    }

    /// An auth provider over the session, user and role repositories.
    pub async fn auth(&self) -> Result<AuthProvider, RepoError> {
        Ok(AuthProvider::new(
            self.sessions.get().await?.clone(),
            self.users.get().await?.clone(),
            self.roles.get().await?.clone(),
        ))
    }
}
