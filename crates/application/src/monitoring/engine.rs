use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use domain::channel::{MeasureType, SensorReading};
use domain::room::{ComfortRange, RoomState, StateTransition, TransitionCause};
use domain::DomainError;
use infrastructure::config::MonitoringConfig;
use tracing::{debug, info, warn};

/// Room Monitoring Engine.
///
/// Turns poll cycles of sensor readings into a debounced room state and
/// reports a [`StateTransition`] only when that state meaningfully changes.
/// Holds the last known state when readings stop and flags it stale after
/// the configured timeout.
pub struct RoomMonitor {
    current: RoomState,
    /// Consecutive polls outside the band around `current`
    pending: u32,
    last_valid_at: Option<DateTime<Utc>>,
    window: Duration,
    debounce_cycles: u32,
    stale_timeout: Duration,
    hysteresis: BTreeMap<MeasureType, f64>,
    comfort: BTreeMap<MeasureType, ComfortRange>,
}

impl RoomMonitor {
    pub fn new(config: &MonitoringConfig) -> Self {
        Self {
            current: RoomState::initial(),
            pending: 0,
            last_valid_at: None,
            window: Duration::milliseconds(config.window_ms as i64),
            debounce_cycles: config.debounce_cycles.max(1),
            stale_timeout: Duration::milliseconds(config.stale_timeout_ms as i64),
            hysteresis: config.hysteresis.clone(),
            comfort: config.comfort.clone(),
        }
    }

    /// Last published state
    pub fn state(&self) -> &RoomState {
        &self.current
    }

    /// `StateStale` while the held state cannot be trusted
    pub fn health(&self) -> Result<(), DomainError> {
        if self.current.is_stale() {
            Err(DomainError::StaleState {
                since: self
                    .current
                    .last_updated()
                    .or(self.last_valid_at)
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
            })
        } else {
            Ok(())
        }
    }

    /// Continue from `published` after it could not be replaced.
    ///
    /// The next committed state then follows the snapshot readers see.
    pub fn resync(&mut self, published: RoomState) {
        warn!(
            held_version = self.current.version(),
            published_version = published.version(),
            "Room monitor resynchronized with published state"
        );
        self.pending = 0;
        self.current = published;
    }

    pub fn poll(&mut self, readings: Vec<SensorReading>) -> Option<StateTransition> {
        self.poll_at(readings, Utc::now())
    }

    /// Process one poll cycle observed at `now`
    pub fn poll_at(
        &mut self,
        readings: Vec<SensorReading>,
        now: DateTime<Utc>,
    ) -> Option<StateTransition> {
        let total = readings.len();
        let usable = self.usable(&readings);

        if usable.is_empty() {
            return self.check_stale(now);
        }
        self.last_valid_at = Some(now);

        let aggregate = self.aggregate(&usable, total);

        if self.current.is_stale() {
            info!(
                measures = aggregate.measures().len(),
                confidence = aggregate.confidence(),
                "Valid readings resumed"
            );
            return Some(self.commit(aggregate, TransitionCause::Recovered, readings));
        }

        if !self.differs(&self.current, &aggregate) {
            // Back inside the band: any pending change was a spike
            if std::mem::take(&mut self.pending) > 0 {
                debug!("Pending room state change discarded");
            }
            return None;
        }

        // The latest aggregate wins once enough polls in a row left the band
        self.pending += 1;
        if self.pending >= self.debounce_cycles {
            return Some(self.commit(aggregate, TransitionCause::Measurement, readings));
        }

        debug!(
            cycles = self.pending,
            required = self.debounce_cycles,
            "Room state change pending"
        );
        None
    }

    /// Valid readings inside the time window that do not predate the current state
    fn usable<'a>(&self, readings: &'a [SensorReading]) -> Vec<&'a SensorReading> {
        let invalid = readings.iter().filter(|r| !r.is_valid()).count();
        if invalid > 0 {
            warn!(invalid, total = readings.len(), "Invalid readings excluded from aggregation");
        }

        let Some(newest) = readings
            .iter()
            .filter(|r| r.is_valid())
            .map(|r| r.timestamp())
            .max()
        else {
            return Vec::new();
        };

        let window_start = newest - self.window;
        let floor = self.current.last_updated();

        let usable: Vec<&SensorReading> = readings
            .iter()
            .filter(|r| r.is_valid())
            .filter(|r| r.timestamp() >= window_start)
            .filter(|r| floor.is_none_or(|floor| r.timestamp() >= floor))
            .collect();

        let stale = readings.len() - invalid - usable.len();
        if stale > 0 {
            warn!(stale, "Stale readings excluded from aggregation");
        }
        usable
    }

    fn aggregate(&self, usable: &[&SensorReading], total: usize) -> RoomState {
        let mut sums: BTreeMap<MeasureType, (f64, u32)> = BTreeMap::new();
        for reading in usable {
            let entry = sums.entry(reading.measure()).or_insert((0.0, 0));
            entry.0 += reading.value();
            entry.1 += 1;
        }

        let newest = usable
            .iter()
            .map(|r| r.timestamp())
            .max()
            .into_iter()
            .chain(self.current.last_updated())
            .max()
            .unwrap_or_else(Utc::now);

        // Measures without a fresh reading keep their last known value
        let mut state = RoomState::observed(newest);
        for (measure, value) in self.current.measures() {
            state = state.with_measure(*measure, *value);
        }
        if let Some(occupancy) = self.current.occupancy() {
            state = state.with_occupancy(occupancy);
        }
        for (measure, (sum, count)) in sums {
            state = state.with_measure(measure, sum / f64::from(count));
        }

        for (measure, range) in &self.comfort {
            if let Some(value) = state.measure(*measure) {
                state = state.with_band(*measure, range.classify(value));
            }
        }

        state.with_confidence(usable.len() as f64 / total.max(1) as f64)
    }

    /// Whether `next` leaves the hysteresis band around `base`
    fn differs(&self, base: &RoomState, next: &RoomState) -> bool {
        MeasureType::ALL.iter().any(|measure| {
            match (base.measure(*measure), next.measure(*measure)) {
                (Some(a), Some(b)) => {
                    let band = self.hysteresis.get(measure).copied().unwrap_or(0.0);
                    (a - b).abs() > band
                }
                (None, Some(_)) | (Some(_), None) => true,
                (None, None) => false,
            }
        })
    }

    fn check_stale(&mut self, now: DateTime<Utc>) -> Option<StateTransition> {
        if self.current.is_stale() {
            return None;
        }

        let since = self.last_valid_at?;
        if now - since < self.stale_timeout {
            return None;
        }

        let stale = self.current.clone().into_stale();
        warn!(
            error = %DomainError::StaleState { since },
            "No valid readings, holding last known state"
        );
        Some(self.commit(stale, TransitionCause::Stale, Vec::new()))
    }

    fn commit(
        &mut self,
        next: RoomState,
        cause: TransitionCause,
        readings: Vec<SensorReading>,
    ) -> StateTransition {
        let next = next.with_version(self.current.version() + 1);
        debug_assert!(self.current.precedes(&next));

        self.pending = 0;
        let from = std::mem::replace(&mut self.current, next.clone());
        info!(
            version = next.version(),
            cause = ?cause,
            occupancy = ?next.occupancy(),
            "Room state transition"
        );
        StateTransition::new(from, next, cause, readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::channel::ChannelId;
    use domain::room::Band;

    fn config(debounce_cycles: u32) -> MonitoringConfig {
        MonitoringConfig {
            debounce_cycles,
            stale_timeout_ms: 10_000,
            window_ms: 5_000,
            ..MonitoringConfig::default()
        }
    }

    fn reading(measure: MeasureType, value: f64, at: DateTime<Utc>) -> SensorReading {
        SensorReading::valid(ChannelId::new(measure.as_str()).unwrap(), measure, value, at)
    }

    fn temp(value: f64, at: DateTime<Utc>) -> Vec<SensorReading> {
        vec![reading(MeasureType::RoomTemperature, value, at)]
    }

    /// Monitor with a settled, fresh state of 21 °C at `t0`
    fn settled(debounce_cycles: u32, t0: DateTime<Utc>) -> RoomMonitor {
        let mut monitor = RoomMonitor::new(&config(debounce_cycles));
        let transition = monitor.poll_at(temp(21.0, t0), t0).unwrap();
        assert_eq!(transition.cause, TransitionCause::Recovered);
        monitor
    }

    #[test]
    fn test_first_valid_poll_recovers_from_initial_state() {
        let t0 = Utc::now();
        let monitor = settled(3, t0);
        assert!(!monitor.state().is_stale());
        assert_eq!(monitor.state().version(), 1);
        assert_eq!(monitor.state().measure(MeasureType::RoomTemperature), Some(21.0));
        assert_eq!(
            monitor.state().band(MeasureType::RoomTemperature),
            Some(Band::Comfortable)
        );
    }

    #[test]
    fn test_change_within_hysteresis_is_ignored() {
        let t0 = Utc::now();
        let mut monitor = settled(1, t0);
        let t1 = t0 + Duration::seconds(1);
        assert!(monitor.poll_at(temp(21.4, t1), t1).is_none());
        assert_eq!(monitor.state().version(), 1);
    }

    #[test]
    fn test_debounce_requires_consecutive_cycles() {
        let t0 = Utc::now();
        let mut monitor = settled(3, t0);

        for i in 1..3 {
            let t = t0 + Duration::seconds(i);
            assert!(monitor.poll_at(temp(25.0, t), t).is_none(), "cycle {i}");
        }
        let t3 = t0 + Duration::seconds(3);
        let transition = monitor.poll_at(temp(25.0, t3), t3).unwrap();

        assert_eq!(transition.cause, TransitionCause::Measurement);
        assert_eq!(transition.from.measure(MeasureType::RoomTemperature), Some(21.0));
        assert_eq!(transition.to.measure(MeasureType::RoomTemperature), Some(25.0));
        assert_eq!(transition.to.band(MeasureType::RoomTemperature), Some(Band::High));
        assert_eq!(transition.readings.len(), 1);
    }

    #[test]
    fn test_single_cycle_spike_is_suppressed() {
        let t0 = Utc::now();
        let mut monitor = settled(2, t0);

        let t1 = t0 + Duration::seconds(1);
        assert!(monitor.poll_at(temp(30.0, t1), t1).is_none());
        let t2 = t0 + Duration::seconds(2);
        assert!(monitor.poll_at(temp(21.0, t2), t2).is_none());
        let t3 = t0 + Duration::seconds(3);
        assert!(monitor.poll_at(temp(30.0, t3), t3).is_none());
        assert_eq!(monitor.state().measure(MeasureType::RoomTemperature), Some(21.0));
    }

    #[test]
    fn test_steady_rise_is_published() {
        let t0 = Utc::now();
        let mut monitor = settled(3, t0);

        // Every poll differs from the previous one by more than the band
        let mut published = Vec::new();
        for i in 1..=20 {
            let t = t0 + Duration::seconds(i);
            if let Some(transition) = monitor.poll_at(temp(21.0 + i as f64, t), t) {
                assert_eq!(transition.cause, TransitionCause::Measurement);
                published.push(transition.to.measure(MeasureType::RoomTemperature));
            }
        }

        assert_eq!(
            published,
            [24.0, 27.0, 30.0, 33.0, 36.0, 39.0].map(Some).to_vec()
        );
        assert_eq!(monitor.state().version(), 7);
        assert!(!monitor.state().is_stale());
    }

    #[test]
    fn test_resync_continues_from_published_state() {
        let t0 = Utc::now();
        let mut monitor = settled(2, t0);
        let t1 = t0 + Duration::seconds(1);
        assert!(monitor.poll_at(temp(30.0, t1), t1).is_none());

        let published = RoomState::observed(t1)
            .with_measure(MeasureType::RoomTemperature, 22.0)
            .with_version(4);
        monitor.resync(published);
        assert_eq!(monitor.state().version(), 4);

        // The pending change was dropped with the old base
        let t2 = t0 + Duration::seconds(2);
        assert!(monitor.poll_at(temp(30.0, t2), t2).is_none());
        let t3 = t0 + Duration::seconds(3);
        let transition = monitor.poll_at(temp(30.0, t3), t3).unwrap();
        assert_eq!(transition.from.version(), 4);
        assert_eq!(transition.to.version(), 5);
        assert_eq!(transition.from.measure(MeasureType::RoomTemperature), Some(22.0));
    }

    #[test]
    fn test_invalid_readings_are_excluded() {
        let t0 = Utc::now();
        let mut monitor = settled(1, t0);
        let t1 = t0 + Duration::seconds(1);
        let readings = vec![
            reading(MeasureType::RoomTemperature, 23.0, t1),
            SensorReading::invalid(
                ChannelId::new("dht22-b").unwrap(),
                MeasureType::RoomTemperature,
                90.0,
                t1,
            ),
        ];

        let transition = monitor.poll_at(readings, t1).unwrap();
        assert_eq!(transition.to.measure(MeasureType::RoomTemperature), Some(23.0));
        assert_eq!(transition.to.confidence(), 0.5);
    }

    #[test]
    fn test_readings_outside_window_are_excluded() {
        let t0 = Utc::now();
        let mut monitor = settled(1, t0);
        let t1 = t0 + Duration::seconds(20);
        let readings = vec![
            reading(MeasureType::RoomTemperature, 23.0, t1),
            // Belongs to an older window
            reading(MeasureType::RoomTemperature, 40.0, t1 - Duration::seconds(10)),
        ];

        let transition = monitor.poll_at(readings, t1).unwrap();
        assert_eq!(transition.to.measure(MeasureType::RoomTemperature), Some(23.0));
    }

    #[test]
    fn test_readings_older_than_state_cannot_roll_back() {
        let t0 = Utc::now();
        let mut monitor = settled(1, t0);
        let earlier = t0 - Duration::seconds(1);
        assert!(monitor.poll_at(temp(30.0, earlier), t0).is_none());
        assert_eq!(monitor.state().last_updated(), Some(t0));
    }

    #[test]
    fn test_occupancy_is_averaged_and_rounded() {
        let t0 = Utc::now();
        let mut monitor = RoomMonitor::new(&config(1));
        let readings = vec![
            reading(MeasureType::Occupancy, 2.0, t0),
            reading(MeasureType::Occupancy, 3.0, t0),
        ];
        let transition = monitor.poll_at(readings, t0).unwrap();
        assert_eq!(transition.to.occupancy(), Some(3));
    }

    #[test]
    fn test_measures_without_fresh_readings_are_held() {
        let t0 = Utc::now();
        let mut monitor = settled(1, t0);
        let t1 = t0 + Duration::seconds(1);
        let transition = monitor
            .poll_at(vec![reading(MeasureType::Humidity, 45.0, t1)], t1)
            .unwrap();
        assert_eq!(transition.to.measure(MeasureType::RoomTemperature), Some(21.0));
        assert_eq!(transition.to.measure(MeasureType::Humidity), Some(45.0));
    }

    #[test]
    fn test_all_invalid_holds_state_then_goes_stale() {
        let t0 = Utc::now();
        let mut monitor = settled(1, t0);
        let bad = |at| {
            vec![SensorReading::invalid(
                ChannelId::new("dht22").unwrap(),
                MeasureType::RoomTemperature,
                f64::NAN,
                at,
            )]
        };

        let t1 = t0 + Duration::seconds(5);
        assert!(monitor.poll_at(bad(t1), t1).is_none());
        assert!(monitor.health().is_ok());

        let t2 = t0 + Duration::seconds(11);
        let transition = monitor.poll_at(bad(t2), t2).unwrap();
        assert_eq!(transition.cause, TransitionCause::Stale);
        assert!(transition.to.is_stale());
        assert_eq!(transition.to.measure(MeasureType::RoomTemperature), Some(21.0));
        assert_eq!(transition.to.last_updated(), Some(t0));
        assert!(matches!(monitor.health(), Err(DomainError::StaleState { .. })));

        // Stale is raised once
        let t3 = t0 + Duration::seconds(12);
        assert!(monitor.poll_at(bad(t3), t3).is_none());

        // Recovery is immediate
        let t4 = t0 + Duration::seconds(13);
        let transition = monitor.poll_at(temp(21.0, t4), t4).unwrap();
        assert_eq!(transition.cause, TransitionCause::Recovered);
        assert!(!transition.to.is_stale());
    }

    #[test]
    fn test_never_valid_stays_initial() {
        let mut monitor = RoomMonitor::new(&config(1));
        let now = Utc::now() + Duration::seconds(60);
        assert!(monitor.poll_at(Vec::new(), now).is_none());
        assert!(monitor.state().is_stale());
        assert_eq!(monitor.state().version(), 0);
    }
}
