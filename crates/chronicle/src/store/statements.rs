//! Rendered-SQL cache shared by concurrent writers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::errors::Result;

/// SQL text rendered once per query name and reused by every worker.
///
/// Keys carry no backend: a cache lives on one store, which owns one
/// connection and therefore renders for a single backend.
///
/// Readers share the lock; rendering takes the write lock only the first time
/// a name is requested, and re-checks after acquiring it so concurrent first
/// users render at most once.
#[derive(Debug, Default)]
pub struct StatementCache {
    rendered: RwLock<HashMap<&'static str, Arc<str>>>,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached SQL for `name`, rendering it with `render` on first use.
    pub async fn get_or_render<F>(&self, name: &'static str, render: F) -> Result<Arc<str>>
    where
        F: FnOnce() -> Result<String>,
    {
        {
            let rendered = self.rendered.read().await;
            if let Some(sql) = rendered.get(name) {
                return Ok(Arc::clone(sql));
            }
        }

        let mut rendered = self.rendered.write().await;
        if let Some(sql) = rendered.get(name) {
            return Ok(Arc::clone(sql));
        }

        let sql: Arc<str> = Arc::from(render()?);
        tracing::debug!(statement = name, "Rendered statement cached");
        rendered.insert(name, Arc::clone(&sql));
        Ok(sql)
    }

    pub async fn len(&self) -> usize {
        self.rendered.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rendered.read().await.is_empty()
    }
}
