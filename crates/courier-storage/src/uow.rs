//! Unit of work with post-commit hooks
//!
//! Audit side effects belong after the transaction commits, never inside
//! it. Callers register hooks on the unit of work; `commit` runs them only
//! when the underlying transaction committed. Dropping without commit
//! rolls back and discards the hooks.

use sqlx::postgres::PgConnection;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

/// Post-commit hook
type PostCommitHook = Box<dyn FnOnce() + Send + 'static>;

/// A database transaction carrying an explicit post-commit hook list
pub struct UnitOfWork<'a> {
    tx: Transaction<'a, Postgres>,
    post_commit: Vec<PostCommitHook>,
}

impl<'a> UnitOfWork<'a> {
    /// Begin a new unit of work
    pub async fn begin(pool: &'a PgPool) -> Result<UnitOfWork<'a>, sqlx::Error> {
        let tx = pool.begin().await?;
        Ok(Self {
            tx,
            post_commit: Vec::new(),
        })
    }

    /// Access the transaction connection for queries
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Register a hook to run after a successful commit
    pub fn after_commit<F>(&mut self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_commit.push(Box::new(hook));
    }

    /// Commit the transaction, then run the registered hooks in order
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await?;

        debug!(hooks = self.post_commit.len(), "running post-commit hooks");
        for hook in self.post_commit {
            hook();
        }

        Ok(())
    }

    /// Roll back the transaction, discarding the hooks
    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_hooks_run_in_registration_order() {
        // Hooks are plain FnOnce closures; ordering is the Vec's.
        let counter = Arc::new(AtomicUsize::new(0));
        let mut hooks: Vec<Box<dyn FnOnce() + Send>> = Vec::new();

        for expected in 0..3usize {
            let counter = Arc::clone(&counter);
            hooks.push(Box::new(move || {
                assert_eq!(counter.fetch_add(1, Ordering::SeqCst), expected);
            }));
        }

        for hook in hooks {
            hook();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
