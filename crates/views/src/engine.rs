//! Change processing: keeps output rows in step with documents and designs.

use std::sync::Arc;
use std::time::Instant;

use doc_store::{
    BaseStore, BaseStoreExt, Change, DbName, DocId, Document, Etag, Output, Record, RunStamp,
    ScanFilter,
};
use futures_util::{TryStreamExt, stream};

use crate::design::{CompiledView, compile_design};
use crate::script::{Emitted, ScriptBudget};
use crate::{Result, ViewError};

/// Tuning for the view engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Limits applied to every map-function run.
    pub budget: ScriptBudget,
    /// How many documents a design cascade indexes at once.
    pub cascade_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            budget: ScriptBudget::default(),
            cascade_concurrency: 8,
        }
    }
}

/// Maintains view output rows from delivered changes.
///
/// Output keys are derived from the design and document versions a run was
/// computed from, so processing the same change twice writes the same rows.
/// Reordered deliveries are compensated by re-reading the document after a
/// run and retiring rows computed from a version that has since been
/// replaced. That recheck narrows the race window but does not close it.
pub struct ViewEngine<S: BaseStore> {
    store: S,
    config: EngineConfig,
}

impl<S: BaseStore> ViewEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Applies one change to the view outputs of its database.
    #[tracing::instrument(skip_all, fields(database = %change.database, id = %change.id, change = %change.key))]
    pub async fn process(&self, change: &Change) -> Result<()> {
        tracing::debug!(
            create = change.is_create(),
            delete = change.is_delete(),
            "processing change"
        );
        if change.version_after.is_some() {
            let key = Document::create_key(&change.database, &change.id);
            match self.store.load::<Document>(&key).await? {
                Some(doc) => {
                    self.update(&doc).await?;
                    if doc.is_design {
                        self.cascade(&doc).await?;
                    }
                    self.recheck(&doc).await;
                }
                None => tracing::debug!("document deleted before processing, skipping"),
            }
        }

        if let Some(before) = &change.version_before {
            self.retire(&change.database, &change.id, before).await?;
        }

        metrics::counter!("views_changes_processed").increment(1);
        Ok(())
    }

    /// Runs every design of the document's database over `doc`.
    ///
    /// A script failure in one design only drops that design's rows for this
    /// document.
    #[tracing::instrument(skip_all, fields(database = %doc.database, id = %doc.id, version = %doc.version))]
    pub async fn update(&self, doc: &Document) -> Result<()> {
        let designs: Vec<Document> = self
            .store
            .find(&ScanFilter::designs_in(&doc.database))
            .await?;

        for design in &designs {
            let outcome = match compile_design(design) {
                Ok(views) => self.run(design, Arc::new(views), doc).await,
                Err(err) => Err(err.into()),
            };
            self.absorb_script_error(design, doc, outcome)?;
        }

        tracing::debug!(designs = designs.len(), "document indexed");
        Ok(())
    }

    /// Runs every view of `design` over `doc` and stores the emitted rows.
    ///
    /// Nothing is stored if any view fails. Returns the number of rows
    /// written.
    pub async fn execute(&self, design: &Document, doc: &Document) -> Result<usize> {
        let views = compile_design(design)?;
        self.run(design, Arc::new(views), doc).await
    }

    /// Removes every output row computed from `version` of document `id`.
    ///
    /// For a design document this also removes the rows every other document
    /// produced under that design version.
    #[tracing::instrument(skip(self))]
    pub async fn retire(&self, database: &DbName, id: &DocId, version: &Etag) -> Result<usize> {
        let mut filters = vec![ScanFilter::outputs_of_doc_version(database, version)];
        if id.is_design() {
            filters.push(ScanFilter::outputs_of_design_version(database, version));
        }

        let mut retired = 0;
        for filter in &filters {
            let outputs: Vec<Output> = self.store.find(filter).await?;
            for output in outputs {
                if self.store.remove::<Output>(&output.key).await? {
                    retired += 1;
                }
            }
        }

        metrics::counter!("views_outputs_retired").increment(retired as u64);
        tracing::debug!(retired, "outputs retired");
        Ok(retired)
    }

    /// Re-indexes every document of the database with a changed design.
    async fn cascade(&self, design: &Document) -> Result<()> {
        let views = match compile_design(design) {
            Ok(views) => Arc::new(views),
            Err(err) => {
                tracing::warn!(design = %design.id, error = %err, "design cannot be compiled, skipping re-index");
                metrics::counter!("views_script_errors").increment(1);
                return Ok(());
            }
        };

        let docs: Vec<Document> = self
            .store
            .find(&ScanFilter::documents_in(&design.database))
            .await?;
        let total = docs.len();
        let started = Instant::now();

        stream::iter(docs.into_iter().map(Ok::<_, ViewError>))
            .try_for_each_concurrent(self.config.cascade_concurrency.max(1), |doc| {
                let views = Arc::clone(&views);
                async move {
                    let outcome = self.run(design, views, &doc).await;
                    self.absorb_script_error(design, &doc, outcome)
                }
            })
            .await?;

        tracing::info!(
            design = %design.id,
            documents = total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "design re-indexed"
        );
        Ok(())
    }

    /// Retires the rows of `doc` if it was replaced while being indexed.
    ///
    /// Failures are logged, never returned.
    async fn recheck(&self, doc: &Document) {
        let current = match self.store.load::<Document>(&doc.key()).await {
            Ok(current) => current.map(|d| d.version),
            Err(err) => {
                tracing::warn!(error = %err, "version recheck failed");
                return;
            }
        };
        if current == Some(doc.version) {
            return;
        }

        metrics::counter!("views_stale_runs_compensated").increment(1);
        match self.retire(&doc.database, &doc.id, &doc.version).await {
            Ok(retired) => {
                tracing::info!(stale = %doc.version, retired, "document changed during indexing")
            }
            Err(err) => tracing::warn!(error = %err, "failed to retire stale outputs"),
        }
    }

    async fn run(
        &self,
        design: &Document,
        views: Arc<Vec<CompiledView>>,
        doc: &Document,
    ) -> Result<usize> {
        let stamp = RunStamp::of(design, doc);
        let body = doc.body.clone();
        let budget = self.config.budget.clone();
        let started = Instant::now();

        // Maps are CPU bound; keep them off the async workers.
        let emitted = tokio::task::spawn_blocking(move || {
            views
                .iter()
                .map(|view| {
                    view.map
                        .run(&body, &budget)
                        .map(|rows| (view.name.clone(), rows))
                })
                .collect::<std::result::Result<Vec<(String, Vec<Emitted>)>, _>>()
        })
        .await
        .map_err(|err| ViewError::Worker(err.to_string()))??;

        metrics::histogram!("views_execute_seconds").record(started.elapsed().as_secs_f64());

        let mut written = 0;
        for (view, rows) in emitted {
            for (index, row) in rows.into_iter().enumerate() {
                let output = Output::new(&stamp, &view, index as u32, row.key, row.value);
                self.store.store(&output).await?;
                written += 1;
            }
        }

        metrics::counter!("views_outputs_written").increment(written as u64);
        Ok(written)
    }

    fn absorb_script_error(
        &self,
        design: &Document,
        doc: &Document,
        outcome: Result<usize>,
    ) -> Result<()> {
        match outcome {
            Ok(_) => Ok(()),
            Err(ViewError::Script(err)) => {
                tracing::warn!(
                    design = %design.id,
                    doc = %doc.id,
                    error = %err,
                    "map function failed"
                );
                metrics::counter!("views_script_errors").increment(1);
                Ok(())
            }
            Err(other) => Err(other),
        }
    }
}
