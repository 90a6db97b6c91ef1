//! Turns a backend query into a store query and the store's answer into rows.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::catalog::{self, FieldCatalog, Service};
use crate::error::Result;
use crate::filter::{translate_fields, translate_filter};
use crate::protocol::QueryParameters;
use crate::provider::{ContentProvider, ContentQuery, Record};
use crate::row::{materialize, ResultRow};

/// Everything decided before the store is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub service: Service,
    pub catalog: &'static FieldCatalog,
    pub fields: Vec<String>,
    pub query: ContentQuery,
    pub limit: i64,
}

/// Resolves catalog, projection, selection and sort. `None` when the service is unknown.
pub fn plan(requested: &str, parameters: &QueryParameters, prompt: &str, now: DateTime<Utc>) -> Result<Option<QueryPlan>> {
    let Some(service) = Service::parse(requested) else {
        return Ok(None);
    };
    let (source, catalog) = catalog::resolve(service, &parameters.fields);
    let projection = catalog.projection(requested, &parameters.fields)?;
    let selection = translate_filter(parameters, catalog, prompt, now)?;
    let sort_order = translate_fields(&parameters.sort, catalog);
    let limit = usize::try_from(parameters.limit).unwrap_or(0);
    Ok(Some(QueryPlan {
        service,
        catalog,
        fields: parameters.fields.clone(),
        query: ContentQuery {
            source,
            projection,
            selection: selection.selection,
            arguments: selection.arguments,
            sort_order,
            limit,
        },
        limit: parameters.limit,
    }))
}

pub fn execute<P: ContentProvider + ?Sized>(
    provider: &P,
    service: &str,
    parameters: &QueryParameters,
    prompt: &str,
    now: DateTime<Utc>,
) -> Result<Vec<ResultRow>> {
    let Some(plan) = plan(service, parameters, prompt, now)? else {
        debug!(service, "unsupported service, nothing to query");
        return Ok(Vec::new());
    };
    let query = &plan.query;
    if query.limit == 0 {
        debug!(service, limit = plan.limit, "non-positive limit, nothing to query");
        return Ok(Vec::new());
    }
    debug!(
        uri = query.source.uri(),
        projection = ?query.projection,
        selection = %query.selection,
        args = ?query.arguments,
        sort = %query.sort_order,
        limit = plan.limit,
        "querying"
    );
    let records = provider.query(query)?;
    Ok(materialize_rows(&records, &plan))
}

/// Shapes at most `plan.limit` records; every row carries every requested field.
pub fn materialize_rows(records: &[Record], plan: &QueryPlan) -> Vec<ResultRow> {
    records
        .iter()
        .take(plan.query.limit)
        .map(|record| {
            let mut row = ResultRow::new();
            for field in &plan.fields {
                let value = plan.catalog.column(field).and_then(|column| record.get(column));
                row.insert(field.as_str(), materialize(value));
            }
            row
        })
        .collect()
}

/// A provider paired with the clock used for relative dates.
pub struct Dispatcher<P> {
    provider: P,
    clock: fn() -> DateTime<Utc>,
}
impl<P: ContentProvider> Dispatcher<P> {
    pub fn new(provider: P) -> Self {
        Self { provider, clock: Utc::now }
    }
    pub fn with_clock(provider: P, clock: fn() -> DateTime<Utc>) -> Self {
        Self { provider, clock }
    }
    pub fn provider(&self) -> &P {
        &self.provider
    }
    pub fn execute(&self, service: &str, parameters: &QueryParameters, prompt: &str) -> Result<Vec<ResultRow>> {
        execute(&self.provider, service, parameters, prompt, (self.clock)())
    }
}
