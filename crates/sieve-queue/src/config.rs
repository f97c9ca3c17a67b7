use std::fmt;
use std::str::FromStr;

use sieve_core::AppError;

pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";
pub const DEFAULT_JOB_QUEUE: &str = "crawl_jobs";
pub const DEFAULT_RESULT_QUEUE: &str = "crawl_results";

/// How results travel back to requesters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultRouting {
    /// One result list shared by all requesters; each scans it for its own id.
    #[default]
    Shared,
    /// One result list per job, keyed `{result_queue}:{job_id}`.
    PerJob,
}

impl ResultRouting {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultRouting::Shared => "shared",
            ResultRouting::PerJob => "per_job",
        }
    }
}

impl fmt::Display for ResultRouting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResultRouting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shared" => Ok(ResultRouting::Shared),
            "per_job" | "per-job" => Ok(ResultRouting::PerJob),
            _ => Err(format!("Unknown result routing: {s}")),
        }
    }
}

/// Connection and naming settings for the queue pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub redis_url: String,
    pub job_queue: String,
    pub result_queue: String,
    pub routing: ResultRouting,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            job_queue: DEFAULT_JOB_QUEUE.to_string(),
            result_queue: DEFAULT_RESULT_QUEUE.to_string(),
            routing: ResultRouting::Shared,
        }
    }
}

impl QueueConfig {
    /// Read configuration from environment variables.
    ///
    /// - `REDIS_URL` (optional, defaults to `redis://localhost:6379/0`)
    /// - `CRAWL_JOB_QUEUE` (optional, defaults to `crawl_jobs`)
    /// - `CRAWL_RESULT_QUEUE` (optional, defaults to `crawl_results`)
    /// - `CRAWL_RESULT_ROUTING` (optional, `shared` or `per_job`)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str, default: &str| -> Result<String, AppError> {
            match lookup(key) {
                None => Ok(default.to_string()),
                Some(raw) if raw.trim().is_empty() => {
                    Err(AppError::ConfigError(format!("{key} must not be empty")))
                }
                Some(raw) => Ok(raw.trim().to_string()),
            }
        };

        let redis_url = var("REDIS_URL", DEFAULT_REDIS_URL)?;
        if !(redis_url.starts_with("redis://") || redis_url.starts_with("rediss://")) {
            return Err(AppError::ConfigError(format!(
                "Invalid REDIS_URL '{redis_url}': must start with redis:// or rediss://"
            )));
        }

        let job_queue = var("CRAWL_JOB_QUEUE", DEFAULT_JOB_QUEUE)?;
        let result_queue = var("CRAWL_RESULT_QUEUE", DEFAULT_RESULT_QUEUE)?;
        if job_queue == result_queue {
            return Err(AppError::ConfigError(
                "CRAWL_JOB_QUEUE and CRAWL_RESULT_QUEUE must differ".into(),
            ));
        }

        let routing = match lookup("CRAWL_RESULT_ROUTING") {
            None => ResultRouting::Shared,
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid CRAWL_RESULT_ROUTING '{raw}': must be 'shared' or 'per_job'"
                ))
            })?,
        };

        Ok(Self {
            redis_url,
            job_queue,
            result_queue,
            routing,
        })
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = url.into();
        self
    }

    pub fn with_queue_names(
        mut self,
        job_queue: impl Into<String>,
        result_queue: impl Into<String>,
    ) -> Self {
        self.job_queue = job_queue.into();
        self.result_queue = result_queue.into();
        self
    }

    pub fn with_routing(mut self, routing: ResultRouting) -> Self {
        self.routing = routing;
        self
    }

    /// Key of the list holding `job_id`'s result under per-job routing.
    pub fn per_job_key(&self, job_id: &str) -> String {
        format!("{}:{job_id}", self.result_queue)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = QueueConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, QueueConfig::default());
        assert_eq!(config.redis_url, "redis://localhost:6379/0");
        assert_eq!(config.job_queue, "crawl_jobs");
        assert_eq!(config.result_queue, "crawl_results");
        assert_eq!(config.routing, ResultRouting::Shared);
    }

    #[test]
    fn test_reads_overrides() {
        let config = QueueConfig::from_lookup(lookup(&[
            ("REDIS_URL", "redis://cache:6380/2"),
            ("CRAWL_JOB_QUEUE", "jobs"),
            ("CRAWL_RESULT_QUEUE", "results"),
            ("CRAWL_RESULT_ROUTING", "per_job"),
        ]))
        .unwrap();

        assert_eq!(config.redis_url, "redis://cache:6380/2");
        assert_eq!(config.job_queue, "jobs");
        assert_eq!(config.routing, ResultRouting::PerJob);
        assert_eq!(config.per_job_key("abc"), "results:abc");
    }

    #[test]
    fn test_rejects_invalid_values() {
        for vars in [
            vec![("REDIS_URL", "http://cache")],
            vec![("CRAWL_JOB_QUEUE", "  ")],
            vec![("CRAWL_JOB_QUEUE", "q"), ("CRAWL_RESULT_QUEUE", "q")],
            vec![("CRAWL_RESULT_ROUTING", "broadcast")],
        ] {
            let err = QueueConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, AppError::ConfigError(_)), "{vars:?}");
        }
    }

    #[test]
    fn test_routing_parse() {
        assert_eq!("PER-JOB".parse::<ResultRouting>(), Ok(ResultRouting::PerJob));
        assert_eq!(ResultRouting::PerJob.to_string(), "per_job");
    }
}
