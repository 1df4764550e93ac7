//! Synchronization engine
//!
//! One call to [`SyncEngine::synchronize`] is one run: crawl the listing,
//! extract every item page, then reconcile the result against the store.
//! All per-run bookkeeping lives in a [`RunState`] owned by that call and is
//! dropped when it returns.
//!
//! Nothing in here is fatal. Fetch, extraction and store failures become
//! strings in the report and the run moves on to the next item.

use crate::config::{CatalogConfig, Config};
use crate::crawler::{ListingCrawler, PageFetcher};
use crate::extract::{slug_from_url, CatalogItem, DateRangeParser, ItemExtractor, ScheduleRange};
use crate::robots::{fetch_robots, RobotsPolicy};
use crate::storage::{EventFields, EventStore, StoredEvent};
use crate::sync::key::{derive_key, has_prefix, parse_key};
use crate::sync::{ItemSummary, SyncPhase, SyncReport};
use crate::{Result, SyncError};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use url::Url;

/// Per-run accumulator
struct RunState {
    phase: SyncPhase,
    /// Item URLs gathered by the listing crawl, in first-seen order
    urls: Vec<String>,
    /// Slugs whose page could not be fetched or extracted this run
    unresolved_slugs: HashSet<String>,
    /// Keys already reconciled in this run
    processed: HashSet<String>,
    /// Keys created in this run
    created: HashSet<String>,
    report: SyncReport,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: SyncPhase::Crawling,
            urls: Vec::new(),
            unresolved_slugs: HashSet::new(),
            processed: HashSet::new(),
            created: HashSet::new(),
            report: SyncReport::default(),
        }
    }

    fn advance(&mut self, to: SyncPhase) -> Result<()> {
        if !self.phase.can_transition_to(to) {
            return Err(SyncError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!("Sync phase {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    fn record_error(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.report.errors.push(message);
    }

    fn mark_unresolved(&mut self, url: &str) {
        if let Some(slug) = slug_from_url(url) {
            self.unresolved_slugs.insert(slug);
        }
    }
}

/// Crawls the catalog and reconciles it against an [`EventStore`]
pub struct SyncEngine<F: PageFetcher> {
    fetcher: F,
    catalog: CatalogConfig,
    extractor: ItemExtractor,
    /// Product token checked against robots.txt; `None` skips the check
    robots_agent: Option<String>,
}

impl<F: PageFetcher> SyncEngine<F> {
    /// Creates an engine whose date parser assumes the current year
    pub fn new(fetcher: F, config: &Config) -> Result<Self> {
        let extractor = ItemExtractor::new(
            DateRangeParser::new()?,
            &config.catalog.default_currency,
        )?;
        Ok(Self::with_extractor(fetcher, config, extractor))
    }

    /// Creates an engine with a prepared extractor
    pub fn with_extractor(fetcher: F, config: &Config, extractor: ItemExtractor) -> Self {
        let robots_agent = config
            .catalog
            .respect_robots
            .then(|| config.user_agent.crawler_name.clone());

        Self {
            fetcher,
            catalog: config.catalog.clone(),
            extractor,
            robots_agent,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Runs one synchronization against `store`
    ///
    /// Only a malformed catalog configuration makes this return an error;
    /// everything that goes wrong while running is reported in the
    /// [`SyncReport`].
    pub async fn synchronize<S: EventStore + ?Sized>(&self, store: &mut S) -> Result<SyncReport> {
        let mut run = RunState::new();
        let base_url = Url::parse(&self.catalog.base_url)?;

        tracing::info!("Crawling catalog listing at {}", base_url);
        self.crawl(&mut run).await?;

        run.advance(SyncPhase::Extracting)?;
        let robots = match &self.robots_agent {
            Some(_) => fetch_robots(&self.fetcher, &base_url).await,
            None => RobotsPolicy::allow_all(),
        };
        let items = self.extract_items(&mut run, &robots).await;

        run.advance(SyncPhase::Reconciling)?;
        self.reconcile(&mut run, &items, store);

        run.advance(SyncPhase::Done)?;
        tracing::info!(
            "Sync finished: {} created, {} updated, {} archived, {} errors",
            run.report.created,
            run.report.updated,
            run.report.archived,
            run.report.errors.len()
        );

        Ok(run.report)
    }

    async fn crawl(&self, run: &mut RunState) -> Result<()> {
        let outcome = ListingCrawler::new(&self.fetcher, &self.catalog)?
            .collect_all()
            .await;

        tracing::info!(
            "Listing crawl: {} item URLs from {} pages{}",
            outcome.urls.len(),
            outcome.pages_fetched,
            if outcome.hit_page_ceiling {
                " (page ceiling reached)"
            } else {
                ""
            }
        );
        if let Some(failure) = outcome.failure {
            run.record_error(format!("Listing crawl aborted: {}", failure));
        }

        run.urls = outcome.urls;
        Ok(())
    }

    /// Fetches and extracts each item page in turn, pausing between fetches
    async fn extract_items(&self, run: &mut RunState, robots: &RobotsPolicy) -> Vec<CatalogItem> {
        let delay = self.item_delay(robots);
        let urls = std::mem::take(&mut run.urls);
        let mut items = Vec::with_capacity(urls.len());
        let mut fetched_any = false;

        for url in &urls {
            if let Some(agent) = &self.robots_agent {
                if !robots.is_allowed(url, agent) {
                    tracing::info!("Skipping {} (disallowed by robots.txt)", url);
                    continue;
                }
            }

            if fetched_any && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            fetched_any = true;

            let html = match self.fetcher.fetch_text(url).await {
                Ok(html) => html,
                Err(e) => {
                    run.mark_unresolved(url);
                    run.record_error(format!("Failed to fetch item: {}", e));
                    continue;
                }
            };

            match self.extractor.extract(&html, url) {
                Ok(item) => {
                    run.report.items.push(ItemSummary {
                        name: item.name.clone(),
                        schedule_count: item.schedules.len(),
                    });
                    items.push(item);
                }
                Err(e) => {
                    run.mark_unresolved(url);
                    run.record_error(format!("Dropped item: {}", e));
                }
            }
        }

        run.urls = urls;
        items
    }

    /// Configured item delay, raised to the robots.txt crawl delay if longer
    fn item_delay(&self, robots: &RobotsPolicy) -> Duration {
        let configured = Duration::from_millis(self.catalog.item_delay_ms);
        self.robots_agent
            .as_deref()
            .and_then(|agent| robots.crawl_delay(agent))
            .map_or(configured, |requested| requested.max(configured))
    }

    fn reconcile<S: EventStore + ?Sized>(
        &self,
        run: &mut RunState,
        items: &[CatalogItem],
        store: &mut S,
    ) {
        let prefix = self.catalog.key_prefix.as_str();

        let existing: HashMap<String, StoredEvent> = match store.get_all_events() {
            Ok(events) => events
                .into_iter()
                .filter_map(|event| {
                    let key = event.external_id()?.to_string();
                    has_prefix(prefix, &key).then_some((key, event))
                })
                .collect(),
            Err(e) => {
                run.record_error(format!("Failed to load stored events: {}", e));
                return;
            }
        };
        tracing::debug!("{} stored events under prefix '{}'", existing.len(), prefix);

        for item in items {
            for schedule in &item.schedules {
                let key = derive_key(prefix, &item.slug, schedule.start);
                if !run.processed.insert(key.clone()) {
                    tracing::debug!("Duplicate departure {} skipped", key);
                    continue;
                }

                let fields = event_fields(item, schedule, &key);
                match existing.get(&key) {
                    Some(event) => match store.update_event(event.id, &fields) {
                        Ok(()) => {
                            if event.archived {
                                tracing::info!("Restored archived event {}", key);
                            }
                            run.report.updated += 1;
                        }
                        Err(e) => run.record_error(format!("Failed to update {}: {}", key, e)),
                    },
                    None => match store.create_event(&fields) {
                        Ok(_) => {
                            run.report.created += 1;
                            run.created.insert(key);
                        }
                        Err(e) => run.record_error(format!("Failed to create {}: {}", key, e)),
                    },
                }
            }
        }
        tracing::debug!("{} events created this run", run.created.len());

        let mut vanished: Vec<(&String, &StoredEvent)> = existing
            .iter()
            .filter(|(key, event)| !event.archived && !run.processed.contains(*key))
            .filter(|(key, _)| {
                parse_key(prefix, key)
                    .map_or(true, |(slug, _)| !run.unresolved_slugs.contains(&slug))
            })
            .collect();
        vanished.sort_by_key(|(_, event)| event.id);

        for (key, event) in vanished {
            match store.archive_event(event.id) {
                Ok(()) => {
                    tracing::info!("Archived vanished event {}", key);
                    run.report.archived += 1;
                }
                Err(e) => run.record_error(format!("Failed to archive {}: {}", key, e)),
            }
        }
    }
}

fn event_fields(item: &CatalogItem, schedule: &ScheduleRange, key: &str) -> EventFields {
    EventFields {
        external_id: Some(key.to_string()),
        name: item.name.clone(),
        source_url: Some(item.source_url.clone()),
        price: item.price,
        currency: item.currency.clone(),
        category: item.category,
        duration_days: item.duration_days,
        locations: item.locations.clone(),
        start_date: schedule.start,
        end_date: schedule.end,
        description: item.description.clone(),
    }
}
