//! Read-through cache of productivity metadata.

use super::store::ProductivitySource;
use crate::error::Result;
use crate::types::{ProductivityLevel, UsageSession};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Caches app overrides and category levels between requests.
///
/// Must be invalidated whenever the metadata changes; [`GoalService`](super::GoalService)
/// does this for writes that go through it.
#[derive(Debug, Default)]
pub struct ProductivityCache {
    apps: RwLock<HashMap<String, Option<ProductivityLevel>>>,
    categories: RwLock<HashMap<String, Option<ProductivityLevel>>>,
}

impl ProductivityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a session's level: the app override, else the category level, else neutral.
    pub fn level_for(
        &self,
        source: &dyn ProductivitySource,
        session: &UsageSession,
    ) -> Result<ProductivityLevel> {
        if let Some(level) = self.app_override(source, &session.app_id)? {
            return Ok(level);
        }
        Ok(self
            .category_level(source, &session.category)?
            .unwrap_or(ProductivityLevel::Neutral))
    }

    fn app_override(
        &self,
        source: &dyn ProductivitySource,
        app_id: &str,
    ) -> Result<Option<ProductivityLevel>> {
        if let Some(cached) = self
            .apps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(app_id)
        {
            return Ok(*cached);
        }

        let level = source.app_productivity_override(app_id)?;
        self.apps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(app_id.to_string(), level);
        Ok(level)
    }

    fn category_level(
        &self,
        source: &dyn ProductivitySource,
        category: &str,
    ) -> Result<Option<ProductivityLevel>> {
        if let Some(cached) = self
            .categories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(category)
        {
            return Ok(*cached);
        }

        let level = source.category_productivity(category)?;
        self.categories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(category.to_string(), level);
        Ok(level)
    }

    /// Drop everything.
    pub fn invalidate(&self) {
        self.apps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.categories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn invalidate_app(&self, app_id: &str) {
        self.apps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(app_id);
    }

    pub fn invalidate_category(&self, category: &str) {
        self.categories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(category);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingSource {
        apps: Mutex<HashMap<String, ProductivityLevel>>,
        categories: Mutex<HashMap<String, ProductivityLevel>>,
        reads: AtomicUsize,
        fail: bool,
    }

    impl ProductivitySource for CountingSource {
        fn app_productivity_override(&self, app_id: &str) -> Result<Option<ProductivityLevel>> {
            if self.fail {
                return Err(Error::Config("offline".to_string()));
            }
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.apps.lock().unwrap().get(app_id).copied())
        }

        fn category_productivity(&self, category: &str) -> Result<Option<ProductivityLevel>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.categories.lock().unwrap().get(category).copied())
        }

        fn set_category_productivity(&self, category: &str, level: ProductivityLevel) -> Result<()> {
            self.categories
                .lock()
                .unwrap()
                .insert(category.to_string(), level);
            Ok(())
        }

        fn set_app_productivity_override(
            &self,
            app_id: &str,
            level: Option<ProductivityLevel>,
        ) -> Result<()> {
            let mut apps = self.apps.lock().unwrap();
            match level {
                Some(level) => apps.insert(app_id.to_string(), level),
                None => apps.remove(app_id),
            };
            Ok(())
        }
    }

    fn session(app: &str, category: &str) -> UsageSession {
        UsageSession {
            id: 1,
            app_id: app.to_string(),
            category: category.to_string(),
            start_time: Utc::now(),
            end_time: Some(Utc::now()),
        }
    }

    #[test]
    fn test_resolution_order() {
        let source = CountingSource::default();
        source
            .set_category_productivity("Dev", ProductivityLevel::Productive)
            .unwrap();
        source
            .set_app_productivity_override("youtube", Some(ProductivityLevel::Unproductive))
            .unwrap();
        let cache = ProductivityCache::new();

        let code = cache.level_for(&source, &session("code", "Dev")).unwrap();
        assert_eq!(code, ProductivityLevel::Productive);

        let youtube = cache.level_for(&source, &session("youtube", "Dev")).unwrap();
        assert_eq!(youtube, ProductivityLevel::Unproductive);

        let unknown = cache.level_for(&source, &session("misc", "Other")).unwrap();
        assert_eq!(unknown, ProductivityLevel::Neutral);
    }

    #[test]
    fn test_cached_until_invalidated() {
        let source = CountingSource::default();
        source
            .set_category_productivity("Dev", ProductivityLevel::Productive)
            .unwrap();
        let cache = ProductivityCache::new();

        cache.level_for(&source, &session("code", "Dev")).unwrap();
        cache.level_for(&source, &session("code", "Dev")).unwrap();
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);

        source
            .set_category_productivity("Dev", ProductivityLevel::Unproductive)
            .unwrap();
        let stale = cache.level_for(&source, &session("code", "Dev")).unwrap();
        assert_eq!(stale, ProductivityLevel::Productive);

        cache.invalidate_category("Dev");
        let fresh = cache.level_for(&source, &session("code", "Dev")).unwrap();
        assert_eq!(fresh, ProductivityLevel::Unproductive);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let failing = CountingSource {
            fail: true,
            ..Default::default()
        };
        let cache = ProductivityCache::new();
        assert!(cache.level_for(&failing, &session("code", "Dev")).is_err());

        let working = CountingSource::default();
        assert_eq!(
            cache.level_for(&working, &session("code", "Dev")).unwrap(),
            ProductivityLevel::Neutral
        );
    }
}
