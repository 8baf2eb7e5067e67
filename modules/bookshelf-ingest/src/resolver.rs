// Get-or-create for authors and categories.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use bookshelf_common::{Entity, EntityKind};
use bookshelf_store::{CatalogStore, StoreError};

/// Resolves natural-key entities for one loader.
///
/// A creation conflict means another writer got there first, so the entity is
/// re-read instead of failing. Names resolved once are remembered for the rest
/// of the cycle; ingestion never deletes entities.
pub struct EntityResolver {
    catalog: Arc<dyn CatalogStore>,
    known: HashSet<(EntityKind, String)>,
}

impl EntityResolver {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            catalog,
            known: HashSet::new(),
        }
    }

    pub async fn resolve(&mut self, kind: EntityKind, name: &str) -> Result<Entity, StoreError> {
        let key = (kind, name.to_string());
        if self.known.contains(&key) {
            return Ok(Entity::new(kind, name));
        }

        let entity = match self.catalog.find_entity(kind, name).await? {
            Some(entity) => entity,
            None => match self.catalog.insert_entity(kind, name).await {
                Ok(entity) => entity,
                Err(e) if e.is_unique_violation() => {
                    debug!(%kind, name, "Entity created concurrently, re-reading");
                    self.catalog
                        .find_entity(kind, name)
                        .await?
                        .ok_or_else(|| StoreError::MissingEntity {
                            kind,
                            name: name.to_string(),
                        })?
                }
                Err(e) => return Err(e),
            },
        };

        self.known.insert(key);
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_store::MemoryCatalog;

    #[tokio::test]
    async fn creates_missing_entity_once() {
        let catalog = Arc::new(MemoryCatalog::new());
        let mut resolver = EntityResolver::new(catalog.clone());

        let first = resolver.resolve(EntityKind::Author, "Doe").await.unwrap();
        let second = resolver.resolve(EntityKind::Author, "Doe").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(catalog.entity_insert_attempts(), 1);
        assert_eq!(
            catalog.entity_names(EntityKind::Author).await.unwrap(),
            vec!["Doe"]
        );
    }

    #[tokio::test]
    async fn existing_entity_is_not_recreated() {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog
            .insert_entity(EntityKind::Category, "Fiction")
            .await
            .unwrap();

        let mut resolver = EntityResolver::new(catalog.clone());
        let entity = resolver
            .resolve(EntityKind::Category, "Fiction")
            .await
            .unwrap();

        assert_eq!(entity, Entity::new(EntityKind::Category, "Fiction"));
        assert_eq!(catalog.entity_insert_attempts(), 1);
    }

    #[tokio::test]
    async fn creation_conflict_is_treated_as_existing() {
        let catalog = Arc::new(MemoryCatalog::new().race_entity(EntityKind::Author, "Doe"));
        let mut resolver = EntityResolver::new(catalog.clone());

        let entity = resolver.resolve(EntityKind::Author, "Doe").await.unwrap();

        assert_eq!(entity.name, "Doe");
        assert_eq!(
            catalog.entity_names(EntityKind::Author).await.unwrap(),
            vec!["Doe"]
        );
    }

    #[tokio::test]
    async fn same_name_different_kind_is_distinct() {
        let catalog = Arc::new(MemoryCatalog::new());
        let mut resolver = EntityResolver::new(catalog.clone());

        resolver.resolve(EntityKind::Author, "History").await.unwrap();
        resolver.resolve(EntityKind::Category, "History").await.unwrap();

        assert_eq!(catalog.entity_insert_attempts(), 2);
    }
}
