use std::collections::BTreeSet;

use crate::{
    errors::ResultExt,
    param::{ParamGroups, ParamService},
    provider::Provider,
    Error, Result,
};

#[derive(Debug, Clone)]
pub struct ParamFetcher<P> {
    provider: P,
}

impl<P> ParamFetcher<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P> ParamService for ParamFetcher<P>
where
    P: Provider,
{
    async fn params(&self, height: u64) -> Result<ParamGroups> {
        let context = || format!("ParamFetcher::params [#{}]", height);

        let params = self
            .provider
            .get_all_params(height)
            .await
            .context(context())?;

        let groups = ParamGroups::from_rpc(height, params);
        if groups.is_empty() {
            return Err(Error::ParamsNotFound(height));
        }
        groups.validate().context(context())?;

        Ok(groups)
    }

    async fn cached_heights(&self) -> Result<BTreeSet<u64>> {
        Ok(BTreeSet::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{provider::AllParams, testing::StubProvider};

    #[tokio::test]
    async fn test_no_params_is_an_error() {
        let provider = StubProvider::default().with_params(3, AllParams::default());
        let fetcher = ParamFetcher::new(provider);

        assert!(matches!(
            fetcher.params(3).await,
            Err(Error::ParamsNotFound(3))
        ));
    }

    #[tokio::test]
    async fn test_partial_groups_fail_validation() {
        let mut params = crate::testing::full_params();
        params.auth_params.clear();
        let fetcher = ParamFetcher::new(StubProvider::default().with_params(3, params));

        assert!(matches!(
            fetcher.params(3).await,
            Err(Error::Decode {
                source: crate::errors::DecodeError::EmptyParamGroup("auth_params"),
                ..
            })
        ));
    }
}
