//! HTTP contact sensor accessory.
//!
//! Composition root tying the pieces together:
//! - `get_state()` is the host's characteristic read entry point. It serves
//!   the exposed value while the cache is fresh and queries the sensor
//!   endpoint otherwise.
//! - `handle_notification()` is the push entry point. It writes the pushed
//!   value straight into the characteristic without touching the cache or
//!   the pull timer.
//!
//! The two paths are not coordinated: the characteristic is a last-writer-wins
//! cell and a late HTTP response simply overwrites a newer pushed value.

use crate::config::AccessoryConfig;
use crate::error::{Result, SensorError};
use crate::http::{HttpClient, UrlSpec, is_http_success_code};
use crate::sensors::{ACCESSORY_INFO, AccessoryInformation, ContactSensorService};
use crate::state::{FreshnessCache, PatternExtractor, PullTimer, Reading, SensorState};
use log::{Level, info, log, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Push update delivered by the notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationUpdate {
    pub characteristic: String,
    pub value: Value,
}

/// Services exposed to the host, in the order the host expects them.
#[derive(Clone, Copy)]
pub enum Service<'a> {
    Information(&'a AccessoryInformation),
    ContactSensor(&'a ContactSensorService),
}

pub struct SensorAccessory {
    name: String,
    debug: bool,
    url: UrlSpec,
    http: Arc<dyn HttpClient>,
    cache: FreshnessCache,
    extractor: PatternExtractor,
    service: ContactSensorService,
    pull_timer: Option<PullTimer>,
}

impl SensorAccessory {
    /// Build the accessory and start its pull timer, if one is configured.
    ///
    /// Fails with [`SensorError::Configuration`] when `getUrl` is missing or
    /// invalid. Must be called from within a tokio runtime when
    /// `pullInterval` is set.
    pub fn new(config: &AccessoryConfig, http: Arc<dyn HttpClient>) -> Result<Arc<Self>> {
        let url = config.url_spec()?;
        let cache = FreshnessCache::new(config.cache_ttl()?);

        let extractor = PatternExtractor::new(config.status_pattern(), config.pattern_group());
        if !extractor.group_in_range() {
            warn!(
                "[{}] patternGroupToExtract {} does not exist in pattern '{}', state extraction will fail",
                config.name,
                extractor.group(),
                extractor.pattern()
            );
        }

        let accessory = Arc::new(Self {
            name: config.name.clone(),
            debug: config.debug,
            url,
            http,
            cache,
            extractor,
            service: ContactSensorService::new(config.name.clone()),
            pull_timer: config.pull_interval().map(PullTimer::new),
        });
        accessory.start_pull_timer();

        Ok(accessory)
    }

    fn start_pull_timer(self: &Arc<Self>) {
        let Some(timer) = &self.pull_timer else {
            return;
        };

        info!(
            "[{}] Pulling state every {} ms",
            self.name,
            timer.interval().as_millis()
        );

        // Weak so the timer task never keeps the accessory alive
        let accessory = Arc::downgrade(self);
        timer.start(move || {
            let accessory = accessory.clone();
            async move {
                let Some(accessory) = accessory.upgrade() else {
                    return false;
                };
                if let Err(e) = accessory.get_state().await {
                    warn!("[{}] Scheduled refresh failed: {}", accessory.name, e);
                }
                true
            }
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &ContactSensorService {
        &self.service
    }

    pub fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    pub fn pull_timer(&self) -> Option<&PullTimer> {
        self.pull_timer.as_ref()
    }

    pub fn identify(&self) {
        info!("[{}] Identify requested!", self.name);
    }

    pub fn services(&self) -> Vec<Service<'_>> {
        vec![
            Service::Information(&ACCESSORY_INFO),
            Service::ContactSensor(&self.service),
        ]
    }

    /// Level for routine state logs, raised to info by the `debug` option.
    fn verbose_level(&self) -> Level {
        if self.debug { Level::Info } else { Level::Debug }
    }

    /// Current contact state, querying the sensor if the cache is stale.
    ///
    /// Concurrent calls are not deduplicated, each stale call issues its own
    /// request. Failures leave the exposed state untouched.
    pub async fn get_state(&self) -> Result<Reading> {
        if !self.cache.should_query() {
            let value = self.service.state().value();
            log!(
                self.verbose_level(),
                "[{}] getState() returning cached value {}{}",
                self.name,
                value,
                if self.cache.is_infinite() {
                    " (infinite cache)"
                } else {
                    ""
                }
            );
            return Ok(Reading::Cached(value));
        }

        let response = self.http.request(&self.url).await;

        // Reset after every completed exchange, successful or not
        if let Some(timer) = &self.pull_timer {
            timer.reset();
        }

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!("[{}] getState() failed: {}", self.name, e);
                return Err(e);
            }
        };

        if !is_http_success_code(response.status) {
            warn!(
                "[{}] getState() returned http error: {}",
                self.name, response.status
            );
            return Err(SensorError::HttpStatus(response.status));
        }

        let token = match self.extractor.extract(&response.body) {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    "[{}] getState() error occurred while extracting state from body: {}",
                    self.name, e
                );
                return Err(e.into());
            }
        };

        let Some(state) = SensorState::from_token(token) else {
            info!(
                "[{}] getState() did not find opened or closed in body: {}",
                self.name, response.body
            );
            return Ok(Reading::NoChange);
        };

        log!(
            self.verbose_level(),
            "[{}] getState is currently at {}",
            self.name,
            state
        );

        self.cache.queried();
        self.service.state().update_value(state);
        Ok(Reading::Fetched(state))
    }

    /// Apply a pushed update.
    ///
    /// The value is written as-is. Updates for characteristics this accessory
    /// doesn't expose are logged and dropped.
    pub fn handle_notification(&self, update: NotificationUpdate) {
        let Some(characteristic) = self.service.characteristic(&update.characteristic) else {
            info!(
                "[{}] Encountered unknown characteristic when handling notification: {}",
                self.name, update.characteristic
            );
            return;
        };

        info!(
            "[{}] Updating '{}' to new value: {}",
            self.name, update.characteristic, update.value
        );
        characteristic.update_value(update.value);
    }
}
