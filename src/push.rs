//! Pushgateway sink.
//!
//! Collected gauge samples are loaded into a fresh registry and pushed in one
//! shot under a single job name. The gateway client is blocking, so the push
//! itself runs on the blocking thread pool.

use prometheus::{IntGauge, Opts, Registry};
use tracing::info;

use crate::{error::Error, metrics::Metric};

/// Builds a registry holding one gauge per collected metric.
///
/// # Errors
///
/// Returns [`Error::Push`] when a metric name fails the sink's charset rules
/// or collides with an already registered gauge.
pub fn build_registry(metrics: &[Metric]) -> Result<Registry, Error> {
    let registry = Registry::new();

    for metric in metrics {
        let gauge = IntGauge::with_opts(Opts::new(&metric.name, &metric.description))
            .map_err(|e| Error::push("registry", format!("gauge '{}': {e}", metric.name)))?;
        gauge.set(metric.value);
        registry
            .register(Box::new(gauge))
            .map_err(|e| Error::push("registry", format!("gauge '{}': {e}", metric.name)))?;
    }

    Ok(registry)
}

/// Pushes a batch of metrics to a Pushgateway under the given job name.
///
/// # Errors
///
/// Returns [`Error::Push`] when registry assembly or the gateway request
/// fails.
pub async fn push_metrics(metrics: Vec<Metric>, target: &str, job: &str) -> Result<(), Error> {
    info!(target_gateway = target, job, count = metrics.len(), "pushing metrics");

    let registry = build_registry(&metrics)?;
    let families = registry.gather();
    let target_owned = target.to_owned();
    let job_owned = job.to_owned();

    // prometheus::push_metrics does blocking HTTP I/O.
    tokio::task::spawn_blocking(move || {
        prometheus::push_metrics(
            &job_owned,
            std::collections::HashMap::new(),
            &target_owned,
            families,
            None
        )
        .map_err(|e| Error::push(&target_owned, e.to_string()))
    })
    .await
    .map_err(|e| Error::push(target, format!("push task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::build_registry;
    use crate::metrics::Metric;

    fn metric(name: &str, value: i64) -> Metric {
        Metric {
            name:        name.to_owned(),
            value,
            description: format!("Count of {name}")
        }
    }

    #[test]
    fn registry_holds_one_gauge_per_metric() {
        let metrics =
            vec![metric("org_repo_open_issues", 4), metric("org_repo_open_pulls", 2)];
        let registry = build_registry(&metrics).expect("expected registry");

        let families = registry.gather();
        assert_eq!(families.len(), 2);

        let open_issues = families
            .iter()
            .find(|family| family.get_name() == "org_repo_open_issues")
            .expect("expected gauge family");
        assert_eq!(open_issues.get_metric()[0].get_gauge().get_value() as i64, 4);
    }

    #[test]
    fn registry_rejects_malformed_names() {
        let metrics = vec![metric("bad name with spaces", 1)];
        assert!(build_registry(&metrics).is_err());
    }

    #[test]
    fn registry_rejects_duplicate_names() {
        let metrics = vec![metric("org_repo_open_issues", 1), metric("org_repo_open_issues", 2)];
        assert!(build_registry(&metrics).is_err());
    }
}
