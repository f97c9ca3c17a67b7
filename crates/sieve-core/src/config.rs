use std::time::Duration;

use url::Url;

use crate::quality::{DEFAULT_MIN_CONTENT_LENGTH, DEFAULT_MIN_RATIO, QualityGate};
use crate::strategy::{
    RenderRequest, Strategy, StrategyPolicy, navigation_script, relative_path, site_root,
};

/// Default cap on extracted content carried in a result.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 10_000;

/// Default cap on the raw markup snapshot carried in a result.
pub const DEFAULT_HTML_SNAPSHOT_CHARS: usize = 50_000;

/// Strategy engine configuration.
///
/// Passed in at construction so the engine never reads the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub min_content_length: usize,
    pub min_ratio: f64,
    /// Strategies in the order they are tried.
    pub strategies: Vec<Strategy>,
    pub direct: StrategyPolicy,
    pub spa_with_delay: StrategyPolicy,
    pub navigate_from_home: StrategyPolicy,
    /// Wait on the home page before looking for the target link.
    pub settle_delay: Duration,
    /// Wait after clicking the target link.
    pub click_delay: Duration,
    pub max_content_chars: usize,
    pub html_snapshot_chars: usize,
    /// Run the keyword error scan even on candidates the gate accepted.
    pub strict_error_scan: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
            min_ratio: DEFAULT_MIN_RATIO,
            strategies: Strategy::ALL.to_vec(),
            direct: StrategyPolicy::new(Duration::from_secs(1), Duration::from_secs(30)),
            spa_with_delay: StrategyPolicy::new(Duration::from_secs(5), Duration::from_secs(60)),
            navigate_from_home: StrategyPolicy::new(
                Duration::from_secs(6),
                Duration::from_secs(60),
            ),
            settle_delay: Duration::from_secs(3),
            click_delay: Duration::from_secs(4),
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            html_snapshot_chars: DEFAULT_HTML_SNAPSHOT_CHARS,
            strict_error_scan: true,
        }
    }
}

impl EngineConfig {
    pub fn with_min_content_length(mut self, min: usize) -> Self {
        self.min_content_length = min;
        self
    }

    pub fn with_min_ratio(mut self, ratio: f64) -> Self {
        self.min_ratio = ratio;
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_policy(mut self, strategy: Strategy, policy: StrategyPolicy) -> Self {
        match strategy {
            Strategy::Direct => self.direct = policy,
            Strategy::SpaWithDelay => self.spa_with_delay = policy,
            Strategy::NavigateFromHome => self.navigate_from_home = policy,
        }
        self
    }

    pub fn with_navigation_delays(mut self, settle: Duration, click: Duration) -> Self {
        self.settle_delay = settle;
        self.click_delay = click;
        self
    }

    pub fn with_strict_error_scan(mut self, enabled: bool) -> Self {
        self.strict_error_scan = enabled;
        self
    }

    /// Zero every delay. Handy for tests and for renderers that ignore timing.
    pub fn without_delays(mut self) -> Self {
        for policy in [
            &mut self.direct,
            &mut self.spa_with_delay,
            &mut self.navigate_from_home,
        ] {
            policy.render_delay = Duration::ZERO;
        }
        self.settle_delay = Duration::ZERO;
        self.click_delay = Duration::ZERO;
        self
    }

    pub fn quality_gate(&self) -> QualityGate {
        QualityGate::new(self.min_content_length, self.min_ratio)
    }

    pub fn policy(&self, strategy: Strategy) -> StrategyPolicy {
        match strategy {
            Strategy::Direct => self.direct,
            Strategy::SpaWithDelay => self.spa_with_delay,
            Strategy::NavigateFromHome => self.navigate_from_home,
        }
    }

    /// Build the render request for one strategy against `target`.
    ///
    /// Navigation from the home page degenerates to the SPA policy on the
    /// root when the target has no path of its own.
    pub fn plan(&self, strategy: Strategy, target: &Url) -> RenderRequest {
        match strategy {
            Strategy::Direct | Strategy::SpaWithDelay => {
                RenderRequest::load(strategy, target, self.policy(strategy))
            }
            Strategy::NavigateFromHome => {
                let root = site_root(target);
                let path = relative_path(target);

                if path.is_empty() {
                    let policy = self.spa_with_delay;
                    return RenderRequest {
                        strategy,
                        load_url: root,
                        target_url: target.to_string(),
                        render_delay: policy.render_delay,
                        page_timeout: policy.page_timeout,
                        script: None,
                    };
                }

                let policy = self.navigate_from_home;
                RenderRequest {
                    strategy,
                    script: Some(navigation_script(
                        &path,
                        target.as_str(),
                        self.settle_delay,
                        self.click_delay,
                    )),
                    load_url: root,
                    target_url: target.to_string(),
                    render_delay: policy.render_delay,
                    page_timeout: policy.page_timeout,
                }
            }
        }
    }
}
