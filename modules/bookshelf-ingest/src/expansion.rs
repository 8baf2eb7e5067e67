//! Follow-up cycles seeded from the catalog's own authors and categories.
//!
//! Each hop snapshots the entity names stored so far, turns them into
//! `inauthor:` / `subject:` queries and runs a full cycle for them. Names
//! created during a hop are only picked up by the next hop, and a query is
//! never issued twice within one expansion.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use bookshelf_common::EntityKind;
use bookshelf_store::CatalogStore;

use crate::loader::LoaderStats;
use crate::pipeline::{CycleReport, Pipeline};

/// How far expansion may go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionBudget {
    /// Number of follow-up cycles. Zero disables expansion.
    pub max_hops: usize,
    /// Cap on queries issued per hop.
    pub max_queries: Option<usize>,
}

impl Default for ExpansionBudget {
    fn default() -> Self {
        Self {
            max_hops: 1,
            max_queries: None,
        }
    }
}

impl ExpansionBudget {
    pub fn disabled() -> Self {
        Self {
            max_hops: 0,
            max_queries: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HopReport {
    pub hop: usize,
    pub queries: Vec<String>,
    pub cycle: CycleReport,
}

#[derive(Debug, Clone, Default)]
pub struct ExpansionReport {
    pub hops: Vec<HopReport>,
}

impl ExpansionReport {
    pub fn queries_issued(&self) -> usize {
        self.hops.iter().map(|h| h.queries.len()).sum()
    }

    pub fn loader_totals(&self) -> LoaderStats {
        let mut totals = LoaderStats::default();
        for hop in &self.hops {
            totals.merge(&hop.cycle.loader);
        }
        totals
    }
}

/// Scoped search query for an entity name, e.g. `inauthor:Doe`.
pub fn entity_query(kind: EntityKind, name: &str) -> String {
    format!("{}:{}", kind.search_operator(), name)
}

pub struct ExpansionController<'a> {
    pipeline: &'a Pipeline,
    catalog: Arc<dyn CatalogStore>,
    budget: ExpansionBudget,
    queried: HashSet<String>,
}

impl<'a> ExpansionController<'a> {
    pub fn new(
        pipeline: &'a Pipeline,
        catalog: Arc<dyn CatalogStore>,
        budget: ExpansionBudget,
    ) -> Self {
        Self {
            pipeline,
            catalog,
            budget,
            queried: HashSet::new(),
        }
    }

    /// Mark queries as already issued, typically the initial cycle's batch.
    pub fn exclude<I, S>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queried.extend(queries.into_iter().map(Into::into));
        self
    }

    /// Run hops until the budget is spent or a hop has nothing new to ask.
    ///
    /// Fails only if the entity names cannot be read from the store.
    pub async fn run(mut self) -> Result<ExpansionReport> {
        let mut report = ExpansionReport::default();

        for hop in 1..=self.budget.max_hops {
            let queries = self.next_batch().await?;
            if queries.is_empty() {
                info!(hop, "Expansion found no new names, stopping");
                break;
            }

            info!(hop, queries = queries.len(), "Starting expansion hop");
            let cycle = self
                .pipeline
                .ingest_in(&queries, Arc::clone(&self.catalog))
                .await?;
            report.hops.push(HopReport {
                hop,
                queries,
                cycle,
            });
        }

        info!(
            hops = report.hops.len(),
            queries = report.queries_issued(),
            "Expansion complete"
        );
        Ok(report)
    }

    async fn next_batch(&mut self) -> Result<Vec<String>> {
        let mut batch = Vec::new();
        for kind in [EntityKind::Author, EntityKind::Category] {
            for name in self.catalog.entity_names(kind).await? {
                if name.trim().is_empty() {
                    continue;
                }
                let query = entity_query(kind, &name);
                if self.queried.insert(query.clone()) {
                    batch.push(query);
                }
            }
        }

        if let Some(limit) = self.budget.max_queries {
            // Queries past the cap stay eligible for a later hop.
            if batch.len() > limit {
                for dropped in batch.split_off(limit) {
                    self.queried.remove(&dropped);
                }
            }
        }
        Ok(batch)
    }
}
