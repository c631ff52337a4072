use std::collections::BTreeSet;

use log::{debug, warn};

use crate::{
    errors::ResultExt,
    param::{ParamGroups, ParamService},
    storage::ParamRepo,
    Result,
};

/// Cache-aside decorator over a [`ParamService`].
///
/// A stored group set that fails validation counts as a miss and is fetched again.
#[derive(Debug, Clone)]
pub struct CachedParamService<S, R> {
    inner: S,
    repo: R,
}

impl<S, R> CachedParamService<S, R> {
    pub fn new(inner: S, repo: R) -> Self {
        Self { inner, repo }
    }
}

impl<S, R> ParamService for CachedParamService<S, R>
where
    S: ParamService,
    R: ParamRepo,
{
    async fn params(&self, height: u64) -> Result<ParamGroups> {
        let context = || format!("CachedParamService::params [#{}]", height);

        let stale = match self.repo.fetch_params(height).await.context(context())? {
            Some(params) => match params.validate() {
                Ok(()) => return Ok(params),
                Err(e) => {
                    warn!("Ignoring cached params at #{}: {}", height, e);
                    true
                }
            },
            None => false,
        };

        let params = self.inner.params(height).await?;
        if stale {
            self.repo.replace_params(&params).await.context(context())?;
            debug!("Replaced cached params #{}", height);
        } else {
            self.repo.insert_params(&params).await.context(context())?;
            debug!("Cached params #{}", height);
        }

        Ok(params)
    }

    async fn cached_heights(&self) -> Result<BTreeSet<u64>> {
        self.repo
            .fetch_all_heights()
            .await
            .context("CachedParamService::cached_heights")
    }
}
