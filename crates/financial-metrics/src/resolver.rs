use finsight_core::{EntityRecord, MarketDataProvider, ReportError, Ticker};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("no ticker matches '{0}'")]
    NoMatch(String),

    #[error("ticker search failed: {0}")]
    Provider(ReportError),
}

impl From<ResolveError> for ReportError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NoMatch(name) => ReportError::ResolutionFailure(name),
            ResolveError::Provider(inner) => inner,
        }
    }
}

/// Maps free-text company names onto exchange tickers via the provider's search.
#[derive(Clone)]
pub struct EntityResolver {
    provider: Arc<dyn MarketDataProvider>,
}

impl EntityResolver {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    /// Top-ranked ticker for `name`, or `None` when nothing matches or the search fails.
    pub async fn resolve(&self, name: &str) -> Option<Ticker> {
        match self.resolve_detailed(name).await {
            Ok(record) => record.ticker,
            Err(ResolveError::NoMatch(_)) => None,
            Err(ResolveError::Provider(e)) => {
                tracing::warn!("Ticker lookup for '{}' failed: {}", name, e);
                None
            }
        }
    }

    /// Like [`resolve`](Self::resolve) but keeps "no match" and "provider error" apart.
    pub async fn resolve_detailed(&self, name: &str) -> Result<EntityRecord, ResolveError> {
        // the name goes to the provider unmodified
        let matches = self
            .provider
            .search(name)
            .await
            .map_err(ResolveError::Provider)?;

        let top = matches
            .into_iter()
            .find(|m| !m.symbol.trim().is_empty())
            .ok_or_else(|| ResolveError::NoMatch(name.to_string()))?;

        tracing::debug!("Resolved '{}' -> {}", name, top.symbol);

        Ok(EntityRecord {
            display_name: name.to_string(),
            ticker: Some(Ticker::new(top.symbol.trim())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeMarket;

    #[tokio::test]
    async fn test_resolves_top_match() {
        let market = FakeMarket::new().with_quotes("Apple Inc.", &["AAPL", "APC.F"]);
        let resolver = EntityResolver::new(Arc::new(market));
        assert_eq!(resolver.resolve("Apple Inc.").await, Some(Ticker::new("AAPL")));
    }

    #[tokio::test]
    async fn test_name_is_passed_through_unmodified() {
        let market = Arc::new(FakeMarket::new().with_quotes("Tata Motors Ltd.", &["TATAMOTORS.NS"]));
        let resolver = EntityResolver::new(market.clone());
        resolver.resolve("Tata Motors Ltd.").await;
        assert_eq!(market.searches(), vec!["Tata Motors Ltd.".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_name_is_absent() {
        let resolver = EntityResolver::new(Arc::new(FakeMarket::new()));
        assert_eq!(resolver.resolve("Unknown Corp XYZ123").await, None);
        assert_eq!(
            resolver.resolve_detailed("Unknown Corp XYZ123").await,
            Err(ResolveError::NoMatch("Unknown Corp XYZ123".to_string()))
        );
    }

    #[tokio::test]
    async fn test_provider_error_is_absent_but_distinguishable() {
        let resolver = EntityResolver::new(Arc::new(FakeMarket::new().failing_search()));
        assert_eq!(resolver.resolve("Apple").await, None);
        assert!(matches!(
            resolver.resolve_detailed("Apple").await,
            Err(ResolveError::Provider(ReportError::DataUnavailable(_)))
        ));
    }

    #[test]
    fn test_no_match_maps_to_resolution_failure() {
        let err: ReportError = ResolveError::NoMatch("Foo".to_string()).into();
        assert_eq!(err, ReportError::ResolutionFailure("Foo".to_string()));
    }
}
