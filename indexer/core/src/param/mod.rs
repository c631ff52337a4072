use std::{
    collections::{BTreeMap, BTreeSet},
    future::Future,
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{
    errors::DecodeError,
    provider::{AllParams, RpcParam},
    utils::{parse_float, parse_int},
    Result,
};

mod fetcher;
pub use fetcher::ParamFetcher;

mod cache;
pub use cache::CachedParamService;

pub const APP_PARAMS: &str = "app_params";
pub const AUTH_PARAMS: &str = "auth_params";
pub const GOV_PARAMS: &str = "gov_params";
pub const NODE_PARAMS: &str = "node_params";
pub const POCKET_PARAMS: &str = "pocket_params";

/// Key/value pairs of one named param group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGroup(BTreeMap<String, String>);

impl ParamGroup {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Result<&str, DecodeError> {
        self.0
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| DecodeError::MissingParam(key.to_string()))
    }

    /// Reads an integer param. A non-numeric value is an error, never a zero.
    pub fn get_u64(&self, key: &str) -> Result<u64, DecodeError> {
        parse_int(key, self.get(key)?)
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, DecodeError> {
        parse_float(key, self.get(key)?)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<RpcParam> for ParamGroup {
    fn from_iter<I: IntoIterator<Item = RpcParam>>(iter: I) -> Self {
        Self(iter.into_iter().map(|p| (p.key, p.value)).collect())
    }
}

impl<K, V> FromIterator<(K, V)> for ParamGroup
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The five network param groups in force at a height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamGroups {
    pub height: u64,
    pub app: ParamGroup,
    pub auth: ParamGroup,
    pub gov: ParamGroup,
    pub node: ParamGroup,
    pub pocket: ParamGroup,
}

impl ParamGroups {
    pub fn from_rpc(height: u64, params: AllParams) -> Self {
        Self {
            height,
            app: params.app_params.into_iter().collect(),
            auth: params.auth_params.into_iter().collect(),
            gov: params.gov_params.into_iter().collect(),
            node: params.node_params.into_iter().collect(),
            pocket: params.pocket_params.into_iter().collect(),
        }
    }

    pub fn groups(&self) -> [(&'static str, &ParamGroup); 5] {
        [
            (APP_PARAMS, &self.app),
            (AUTH_PARAMS, &self.auth),
            (GOV_PARAMS, &self.gov),
            (NODE_PARAMS, &self.node),
            (POCKET_PARAMS, &self.pocket),
        ]
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut ParamGroup> {
        match name {
            APP_PARAMS => Some(&mut self.app),
            AUTH_PARAMS => Some(&mut self.auth),
            GOV_PARAMS => Some(&mut self.gov),
            NODE_PARAMS => Some(&mut self.node),
            POCKET_PARAMS => Some(&mut self.pocket),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups().iter().all(|(_, group)| group.is_empty())
    }

    /// Every group must be non-empty.
    pub fn validate(&self) -> Result<(), DecodeError> {
        match self.groups().into_iter().find(|(_, group)| group.is_empty()) {
            Some((name, _)) => Err(DecodeError::EmptyParamGroup(name)),
            None => Ok(()),
        }
    }
}

/// Reward-relevant params extracted from a [`ParamGroups`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkParams {
    pub relays_to_tokens_multiplier: f64,
    pub dao_allocation: u64,
    pub proposer_percentage: u64,
    /// Blocks after which an unproven claim expires.
    pub claim_expiration: u64,
}

impl NetworkParams {
    pub fn from_groups(groups: &ParamGroups) -> Result<Self, DecodeError> {
        Ok(Self {
            relays_to_tokens_multiplier: groups.node.get_f64("pos/RelaysToTokensMultiplier")?,
            dao_allocation: groups.node.get_u64("pos/DAOAllocation")?,
            proposer_percentage: groups.node.get_u64("pos/ProposerPercentage")?,
            claim_expiration: groups.pocket.get_u64("pocketcore/ClaimExpiration")?,
        })
    }
}

pub trait ParamService: Send + Sync {
    fn params(&self, height: u64) -> impl Future<Output = Result<ParamGroups>> + Send;

    fn cached_heights(&self) -> impl Future<Output = Result<BTreeSet<u64>>> + Send;
}

impl<S> ParamService for Arc<S>
where
    S: ParamService,
{
    fn params(&self, height: u64) -> impl Future<Output = Result<ParamGroups>> + Send {
        (**self).params(height)
    }

    fn cached_heights(&self) -> impl Future<Output = Result<BTreeSet<u64>>> + Send {
        (**self).cached_heights()
    }
}
