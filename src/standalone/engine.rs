use std::fmt::Debug;
use std::hash::Hash;

use log::debug;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::format::{Format, Location, Record, Records, Source};
use crate::store::IntermediateStore;

/// How a job's phases are scheduled.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Map every record, then reduce every key, on the calling thread.
    #[default]
    Sequential,
    /// Map contiguous shards of the input and reduce keys on the rayon pool.
    Parallel,
}

/// What a mapper can emit into.
///
/// Intermediate pairs go to the [`IntermediateStore`]; results emitted
/// straight from the map phase end up ahead of every reducer result.
pub struct MapContext<K, V, R> {
    store: IntermediateStore<K, V>,
    results: Vec<R>,
}

impl<K, V, R> Default for MapContext<K, V, R> {
    fn default() -> Self {
        Self {
            store: IntermediateStore::default(),
            results: Vec::new(),
        }
    }
}

impl<K: Hash + Eq + Clone, V, R> MapContext<K, V, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit_intermediate(&mut self, key: K, value: V) {
        self.store.emit_intermediate(key, value);
    }

    pub fn emit(&mut self, result: R) {
        self.results.push(result);
    }

    fn absorb(&mut self, shard: Self) {
        self.store.absorb(shard.store);
        self.results.extend(shard.results);
    }
}

impl<K, V, R> MapContext<K, V, R> {
    pub fn store(&self) -> &IntermediateStore<K, V> {
        &self.store
    }

    pub fn into_parts(self) -> (IntermediateStore<K, V>, Vec<R>) {
        (self.store, self.results)
    }
}

/// What a reducer can emit into.
pub struct ReduceContext<R> {
    results: Vec<R>,
}

impl<R> Default for ReduceContext<R> {
    fn default() -> Self {
        Self::with_results(Vec::new())
    }
}

impl<R> ReduceContext<R> {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_results(results: Vec<R>) -> Self {
        Self { results }
    }

    pub fn emit(&mut self, result: R) {
        self.results.push(result);
    }

    pub fn into_results(self) -> Vec<R> {
        self.results
    }
}

/// Runs `mapper` over every record, in order, and returns what it emitted.
///
/// Stops at the first record the adapter fails to produce or the mapper
/// fails on.
pub fn perform_map<K, V, R, M>(
    records: impl IntoIterator<Item = Result<(Location, Record)>>,
    mapper: &M,
) -> Result<MapContext<K, V, R>>
where
    K: Hash + Eq + Clone,
    M: Fn(Record, &mut MapContext<K, V, R>) -> anyhow::Result<()>,
{
    let mut cx = MapContext::new();
    let mut mapped = 0usize;
    for item in records {
        let (location, record) = item?;
        mapper(record, &mut cx).map_err(|err| Error::Map {
            location,
            source: err.into(),
        })?;
        mapped += 1;
    }
    debug!(
        "mapped {} records into {} keys ({} values)",
        mapped,
        cx.store.len(),
        cx.store.value_count()
    );
    Ok(cx)
}

/// Calls `reducer` once per distinct key with all of its values.
///
/// The returned results start with whatever the mapper emitted directly.
pub fn perform_reduce<K, V, R, F>(map_output: MapContext<K, V, R>, reducer: &F) -> Result<Vec<R>>
where
    K: Debug,
    F: Fn(&K, Vec<V>, &mut ReduceContext<R>) -> anyhow::Result<()>,
{
    let (store, results) = map_output.into_parts();
    let keys = store.len();
    let mut cx = ReduceContext::with_results(results);
    for (key, values) in store.into_groups() {
        reducer(&key, values, &mut cx).map_err(|err| reduce_error(&key, err))?;
    }
    debug!("reduced {} keys into {} results", keys, cx.results.len());
    Ok(cx.results)
}

/// Runs a whole job on the calling thread: read, map, group, reduce.
pub fn execute<K, V, R, M, F>(
    sources: impl IntoIterator<Item = Source>,
    format: Format,
    mapper: M,
    reducer: F,
) -> Result<Vec<R>>
where
    K: Hash + Eq + Clone + Debug,
    M: Fn(Record, &mut MapContext<K, V, R>) -> anyhow::Result<()>,
    F: Fn(&K, Vec<V>, &mut ReduceContext<R>) -> anyhow::Result<()>,
{
    let map_output = perform_map(Records::new(sources, format), &mapper)?;
    perform_reduce(map_output, &reducer)
}

/// Like [`execute`], but maps and reduces on the rayon thread pool.
///
/// The input is decoded up front, up to the first record the adapter fails
/// to produce, and split into contiguous shards, each mapped into its own
/// store. Shards are merged in input order before any reducer runs, so
/// every key sees its values in the same order as with [`execute`].
/// Reducer results are concatenated in key order.
///
/// Failures are reported as [`execute`] would report them: the mapper
/// error on the earliest record, else the adapter error, else the reducer
/// error on the earliest key.
pub fn execute_parallel<K, V, R, M, F>(
    sources: impl IntoIterator<Item = Source>,
    format: Format,
    mapper: M,
    reducer: F,
) -> Result<Vec<R>>
where
    K: Hash + Eq + Clone + Debug + Send,
    V: Send,
    R: Send,
    M: Fn(Record, &mut MapContext<K, V, R>) -> anyhow::Result<()> + Sync,
    F: Fn(&K, Vec<V>, &mut ReduceContext<R>) -> anyhow::Result<()> + Sync,
{
    let mut records = Vec::new();
    let mut decode_error = None;
    for item in Records::new(sources, format) {
        match item {
            Ok(record) => records.push(record),
            Err(err) => {
                decode_error = Some(err);
                break;
            }
        }
    }
    let shard_size = records
        .len()
        .div_ceil(rayon::current_num_threads())
        .max(1);
    debug!("mapping {} records in shards of {}", records.len(), shard_size);

    let shards: Vec<Result<MapContext<K, V, R>>> = records
        .into_par_iter()
        .chunks(shard_size)
        .map(|shard| perform_map(shard.into_iter().map(Ok), &mapper))
        .collect();
    let mut map_output = MapContext::new();
    for shard in shards {
        map_output.absorb(shard?);
    }
    if let Some(err) = decode_error {
        return Err(err);
    }

    let (store, mut results) = map_output.into_parts();
    let groups: Vec<(K, Vec<V>)> = store.into_groups().collect();
    let keys = groups.len();
    let reduced: Vec<Result<Vec<R>>> = groups
        .into_par_iter()
        .map(|(key, values)| {
            let mut cx = ReduceContext::new();
            reducer(&key, values, &mut cx).map_err(|err| reduce_error(&key, err))?;
            Ok(cx.into_results())
        })
        .collect();
    for key_results in reduced {
        results.extend(key_results?);
    }
    debug!("reduced {} keys into {} results", keys, results.len());
    Ok(results)
}

/// Runs a job with the given scheduling [`Mode`].
pub fn run<K, V, R, M, F>(
    mode: Mode,
    sources: impl IntoIterator<Item = Source>,
    format: Format,
    mapper: M,
    reducer: F,
) -> Result<Vec<R>>
where
    K: Hash + Eq + Clone + Debug + Send,
    V: Send,
    R: Send,
    M: Fn(Record, &mut MapContext<K, V, R>) -> anyhow::Result<()> + Sync,
    F: Fn(&K, Vec<V>, &mut ReduceContext<R>) -> anyhow::Result<()> + Sync,
{
    match mode {
        Mode::Sequential => execute(sources, format, mapper, reducer),
        Mode::Parallel => execute_parallel(sources, format, mapper, reducer),
    }
}

fn reduce_error<K: Debug>(key: &K, err: anyhow::Error) -> Error {
    Error::Reduce {
        key: format!("{key:?}"),
        source: err.into(),
    }
}
