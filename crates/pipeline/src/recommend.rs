//! Per-user recommendation lists from both model families.
//!
//! Each user is handled independently: candidates are generated, run through
//! a [`FilterPipeline`] and ranked. Users are processed in parallel with rayon
//! and the results gathered into a [`TopNTable`].

use crate::filter_pipeline::FilterPipeline;
use crate::top_n::{TopNTable, top_n};
use crate::traits::UserContext;
use anyhow::Result;
use data_loader::{DataIndex, UserId};
use models::{ContentModels, FactorizationModel, ItemFeatureMatrix, PredictionEntry, PredictionSource};
use rayon::prelude::*;
use tracing::{info, instrument};

/// Content-based top-N for every modeled user, restricted to unrated items
#[instrument(skip(index, models, features))]
pub fn content_top_n(
    index: &DataIndex,
    models: &ContentModels,
    features: &ItemFeatureMatrix,
    n: usize,
) -> Result<TopNTable> {
    let users: Vec<UserId> = models.iter().map(|(user_id, _)| *user_id).collect();
    rank_users(
        PredictionSource::Content,
        index,
        &users,
        &FilterPipeline::for_content(),
        n,
        |user_id| models.predict_user(features, user_id),
    )
}

/// Collaborative top-N over each user's anti-testset
#[instrument(skip(index, model))]
pub fn collaborative_top_n(
    index: &DataIndex,
    model: &FactorizationModel,
    n: usize,
) -> Result<TopNTable> {
    let users: Vec<UserId> = index.users().filter(|&u| model.knows_user(u)).collect();
    rank_users(
        PredictionSource::Collaborative,
        index,
        &users,
        &FilterPipeline::for_collaborative(),
        n,
        |user_id| Some(model.anti_testset_for(index, user_id)),
    )
}

fn rank_users<F>(
    source: PredictionSource,
    index: &DataIndex,
    users: &[UserId],
    pipeline: &FilterPipeline,
    n: usize,
    candidates: F,
) -> Result<TopNTable>
where
    F: Fn(UserId) -> Option<Vec<PredictionEntry>> + Sync,
{
    let lists = users
        .par_iter()
        .filter_map(|&user_id| candidates(user_id).map(|c| (user_id, c)))
        .map(|(user_id, candidates)| {
            let context = UserContext::from_index(index, user_id);
            let kept = pipeline.apply(candidates, &context)?;
            Ok((user_id, top_n(kept, n)))
        })
        .collect::<Result<Vec<_>>>()?;

    let table = TopNTable::from_lists(lists);
    info!(
        "Built {} top-{} lists: {} users, {} rows",
        source.name(),
        n,
        table.num_users(),
        table.num_rows()
    );
    Ok(table)
}
