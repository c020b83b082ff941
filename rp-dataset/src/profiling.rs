//! Per-stage timing reports that compile to no-ops without the `profiling` feature.

#[cfg(feature = "profiling")]
use crate::common::*;

#[cfg(feature = "profiling")]
static PROFILING_CONFIG: Lazy<ProfilingConfig> = Lazy::new(|| {
    match envy::prefixed("RPDATA_").from_env::<ProfilingConfig>() {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "failed to load profiling environment variables, fallback to default values: {:?}",
                err
            );
            Default::default()
        }
    }
});

#[cfg(feature = "profiling")]
static REGISTERED_TIMINGS: Lazy<dashmap::DashSet<&'static str>> =
    Lazy::new(dashmap::DashSet::new);

/// Profiling options read from `RPDATA_*` environment variables.
#[cfg(feature = "profiling")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilingConfig {
    /// Comma-separated timing names to report. Every timing is reported if unset.
    pub profiling_whitelist: Option<HashSet<String>>,
}

#[cfg(feature = "profiling")]
#[derive(Debug)]
pub struct Timing {
    name: &'static str,
    instant: Instant,
    events: Vec<(&'static str, Duration)>,
}

#[cfg(not(feature = "profiling"))]
#[derive(Debug)]
pub struct Timing;

impl Timing {
    pub fn new(name: &'static str) -> Self {
        #[cfg(feature = "profiling")]
        {
            if REGISTERED_TIMINGS.insert(name) {
                info!("registered timing profile '{}'", name);
            }

            Self {
                name,
                instant: Instant::now(),
                events: vec![],
            }
        }

        #[cfg(not(feature = "profiling"))]
        {
            let _ = name;
            Self
        }
    }

    /// Record the time elapsed since the previous event.
    pub fn add_event(&mut self, name: &'static str) {
        #[cfg(feature = "profiling")]
        {
            self.events.push((name, self.instant.elapsed()));
            self.instant = Instant::now();
        }

        #[cfg(not(feature = "profiling"))]
        let _ = name;
    }

    pub fn report(&self) {
        #[cfg(feature = "profiling")]
        {
            let can_report = PROFILING_CONFIG
                .profiling_whitelist
                .as_ref()
                .map(|whitelist| whitelist.contains(self.name))
                .unwrap_or(true);

            if can_report {
                let total: Duration = self.events.iter().map(|(_, elapsed)| *elapsed).sum();
                info!("profiling report for '{}', total {:?}", self.name, total);
                self.events.iter().for_each(|(name, elapsed)| {
                    info!("- {}\t{:?}", name, elapsed);
                });
            }
        }
    }
}
