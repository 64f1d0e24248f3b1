//! Earliest-arrival search over the connection list.
//!
//! A label-setting scan in the connection-scan family: connections are
//! visited in departure order, each one trying to extend the labels already
//! present at its boarding stop. Every stop keeps a small bounded set of
//! the best labels seen so far, which is what lets the search return the K
//! best arrivals instead of a single earliest one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, instrument};

use crate::domain::{GtfsTime, StopIdx, TripIdx};
use crate::feed::FeedStore;

use super::config::PlannerConfig;
use super::connections::Connection;

/// Handle for cooperatively cancelling a running search.
///
/// Cloned handles share state; a caller keeps one clone and hands the other
/// to the planner, then sets the flag from a timer or signal handler. The
/// scan checks it at connection-list boundaries, so cancellation is prompt
/// but never tears down a half-updated label set.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a fresh, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the search observing this flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true once `cancel` has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Error from a search aborted through its [`CancelFlag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("search cancelled")]
pub struct Cancelled;

/// Index into the search's label arena.
///
/// Predecessor links are arena indices rather than references: a label is
/// always created after its predecessor, so links only ever point backwards
/// and the whole chain dies with the arena at the end of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LabelIdx(u32);

impl LabelIdx {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
impl LabelIdx {
    /// Test-only constructor for hand-built arenas.
    pub(crate) fn test(index: u32) -> Self {
        LabelIdx(index)
    }
}

/// A tentative arrival at a stop.
#[derive(Debug, Clone)]
pub(crate) struct Label {
    /// Stop this label arrives at.
    pub stop: StopIdx,
    /// Arrival time at `stop`.
    pub arrival: GtfsTime,
    /// Trip ridden into `stop`; `None` for the synthetic origin labels.
    pub trip: Option<TripIdx>,
    /// Predecessor label, `None` at the origin.
    pub pred: Option<LabelIdx>,
    /// Stop the incoming connection was boarded at.
    pub board_stop: Option<StopIdx>,
    /// Departure time of the incoming connection.
    pub departure: Option<GtfsTime>,
    /// Departure time of the first boarding on this chain; used to prefer
    /// shorter rides among equal arrivals.
    pub origin_departure: Option<GtfsTime>,
    /// Number of connections ridden on this chain.
    pub hops: u32,
}

/// Everything the journey builder needs from a finished scan.
#[derive(Debug)]
pub(crate) struct SearchOutcome {
    /// All labels created during the scan.
    pub arena: Vec<Label>,
    /// Labels at destination stops, best first.
    pub ranked: Vec<LabelIdx>,
}

impl SearchOutcome {
    pub fn label(&self, idx: LabelIdx) -> &Label {
        &self.arena[idx.index()]
    }
}

/// Runs the scan and returns ranked destination labels.
///
/// `connections` must be sorted by departure; origins receive synthetic
/// labels at `earliest`. Returns an outcome with an empty ranking when no
/// destination is reachable; routing impossibility is not an error.
#[instrument(skip_all, fields(
    connections = connections.len(),
    origins = origins.len(),
    destinations = destinations.len(),
))]
pub(crate) fn scan(
    feed: &FeedStore,
    connections: &[Connection],
    origins: &[StopIdx],
    destinations: &HashSet<StopIdx>,
    earliest: GtfsTime,
    config: &PlannerConfig,
    cancel: &CancelFlag,
) -> Result<SearchOutcome, Cancelled> {
    let mut search = Scan {
        feed,
        arena: Vec::new(),
        per_stop: HashMap::new(),
        bound: config.label_bound(),
    };

    for &origin in origins {
        search.insert(Label {
            stop: origin,
            arrival: earliest,
            trip: None,
            pred: None,
            board_stop: None,
            departure: None,
            origin_departure: None,
            hops: 0,
        });
    }

    let check_interval = config.cancel_check_interval.max(1);
    let min_transfer = config.min_transfer_secs;
    // Kth-best arrival at any destination; once every remaining connection
    // departs after it, nothing can improve the result set.
    let mut cutoff: Option<GtfsTime> = None;
    let mut scanned = 0usize;

    for connection in connections {
        if scanned % check_interval == 0 && cancel.is_cancelled() {
            return Err(Cancelled);
        }
        scanned += 1;

        if cutoff.is_some_and(|a_star| connection.departure > a_star) {
            break;
        }

        let Some(reachable) = search.per_stop.get(&connection.from) else {
            continue;
        };
        // Labels are sorted by arrival; everything after the first label
        // arriving too late is also too late.
        let boardable: Vec<LabelIdx> = reachable
            .iter()
            .copied()
            .take_while(|&idx| search.arena[idx.index()].arrival <= connection.departure)
            .collect();

        let mut improved_destination = false;
        for pred_idx in boardable {
            let pred = &search.arena[pred_idx.index()];
            let feasible = match pred.trip {
                // Staying on the same trip is always allowed.
                Some(trip) if trip == connection.trip => true,
                // Changing trips needs the minimum transfer time.
                Some(_) => {
                    connection.departure.saturating_since(pred.arrival) >= min_transfer
                }
                // First boarding; waiting at the origin costs nothing.
                None => true,
            };
            if !feasible {
                continue;
            }

            let label = Label {
                stop: connection.to,
                arrival: connection.arrival,
                trip: Some(connection.trip),
                pred: Some(pred_idx),
                board_stop: Some(connection.from),
                departure: Some(connection.departure),
                origin_departure: pred.origin_departure.or(Some(connection.departure)),
                hops: pred.hops + 1,
            };
            if search.insert(label) && destinations.contains(&connection.to) {
                improved_destination = true;
            }
        }

        if improved_destination {
            cutoff = search.kth_best_arrival(destinations, config.max_results);
        }
    }

    let ranked = search.ranked_destination_labels(destinations);
    debug!(
        scanned,
        labels = search.arena.len(),
        reached = ranked.len(),
        "scan complete"
    );

    Ok(SearchOutcome {
        arena: search.arena,
        ranked,
    })
}

struct Scan<'a> {
    feed: &'a FeedStore,
    arena: Vec<Label>,
    /// Labels per stop, best first under `compare`.
    per_stop: HashMap<StopIdx, Vec<LabelIdx>>,
    bound: usize,
}

impl Scan<'_> {
    /// Inserts a label into its stop's bounded set.
    ///
    /// Returns false when the label is dominated: the set is full of
    /// strictly better labels, or a label on the same trip via the same
    /// predecessor already arrives no later.
    fn insert(&mut self, label: Label) -> bool {
        let stop = label.stop;
        let pos = {
            let list = self
                .per_stop
                .get(&stop)
                .map(Vec::as_slice)
                .unwrap_or_default();

            if list.len() >= self.bound {
                let worst = &self.arena[list[list.len() - 1].index()];
                if label.arrival >= worst.arrival {
                    return false;
                }
            }

            for &idx in list {
                let existing = &self.arena[idx.index()];
                if existing.trip == label.trip
                    && existing.pred == label.pred
                    && existing.arrival <= label.arrival
                {
                    return false;
                }
            }

            let pos = list
                .iter()
                .position(|&idx| self.compare(&label, &self.arena[idx.index()]).is_lt())
                .unwrap_or(list.len());
            if pos >= self.bound {
                return false;
            }
            pos
        };

        let idx = LabelIdx(self.arena.len() as u32);
        self.arena.push(label);
        let list = self.per_stop.entry(stop).or_default();
        list.insert(pos, idx);
        list.truncate(self.bound);
        true
    }

    /// Label ordering: earliest arrival first; among equal arrivals prefer
    /// the later departure from the origin (the shorter ride), then fewer
    /// hops, then the lexicographically smaller trip id.
    fn compare(&self, a: &Label, b: &Label) -> std::cmp::Ordering {
        a.arrival
            .cmp(&b.arrival)
            .then_with(|| b.origin_departure.cmp(&a.origin_departure))
            .then_with(|| a.hops.cmp(&b.hops))
            .then_with(|| {
                let trip_id = |l: &Label| l.trip.map(|t| self.feed.trip_id(t));
                trip_id(a).cmp(&trip_id(b))
            })
    }

    /// The Kth-smallest arrival over all destination labels, or `None`
    /// while fewer than K exist.
    fn kth_best_arrival(&self, destinations: &HashSet<StopIdx>, k: usize) -> Option<GtfsTime> {
        let mut arrivals: Vec<GtfsTime> = destinations
            .iter()
            .filter_map(|stop| self.per_stop.get(stop))
            .flatten()
            .map(|idx| self.arena[idx.index()].arrival)
            .collect();
        if arrivals.len() < k {
            return None;
        }
        arrivals.sort();
        Some(arrivals[k - 1])
    }

    /// All labels that actually travelled to a destination, best first.
    fn ranked_destination_labels(&self, destinations: &HashSet<StopIdx>) -> Vec<LabelIdx> {
        let mut ranked: Vec<LabelIdx> = destinations
            .iter()
            .filter_map(|stop| self.per_stop.get(stop))
            .flatten()
            .copied()
            // An origin label sitting at a destination is a zero-length
            // journey, not a result.
            .filter(|idx| self.arena[idx.index()].pred.is_some())
            .collect();
        ranked.sort_by(|&a, &b| {
            let (a, b) = (&self.arena[a.index()], &self.arena[b.index()]);
            self.compare(a, b)
                .then_with(|| self.feed.stop_id(a.stop).cmp(self.feed.stop_id(b.stop)))
        });
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{CalendarRow, FeedTables, RouteRow, StopRow, StopTimeRow, TripRow};
    use crate::planner::connections::build_connections;
    use chrono::NaiveDate;

    fn stop(id: &str) -> StopRow {
        StopRow {
            stop_id: id.to_string(),
            stop_name: format!("{id} station"),
            parent_station: None,
            location_type: None,
        }
    }

    fn call(trip: &str, stop: &str, seq: u32, arr: &str, dep: &str) -> StopTimeRow {
        StopTimeRow {
            trip_id: trip.to_string(),
            stop_id: stop.to_string(),
            stop_sequence: seq,
            arrival: Some(GtfsTime::parse(arr).unwrap()),
            departure: Some(GtfsTime::parse(dep).unwrap()),
        }
    }

    fn trip(id: &str) -> TripRow {
        TripRow {
            trip_id: id.to_string(),
            route_id: "R1".to_string(),
            service_id: "DAILY".to_string(),
        }
    }

    fn feed(stop_ids: &[&str], stop_times: Vec<StopTimeRow>, trips: Vec<TripRow>) -> FeedStore {
        FeedStore::build(FeedTables {
            stops: stop_ids.iter().map(|id| stop(id)).collect(),
            stop_times,
            trips,
            routes: vec![RouteRow {
                route_id: "R1".to_string(),
                short_name: Some("IC 3".to_string()),
                long_name: None,
            }],
            calendar: vec![CalendarRow {
                service_id: "DAILY".to_string(),
                weekdays: [true; 7],
                start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            }],
            calendar_dates: vec![],
        })
    }

    fn t(s: &str) -> GtfsTime {
        GtfsTime::parse(s).unwrap()
    }

    fn run(
        feed: &FeedStore,
        origin: &str,
        destination: &str,
        earliest: &str,
        config: &PlannerConfig,
    ) -> SearchOutcome {
        let active = feed.active_services(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        let connections = build_connections(feed, &active, t(earliest));
        let origins = vec![feed.lookup_stop(origin).unwrap()];
        let destinations: HashSet<StopIdx> =
            [feed.lookup_stop(destination).unwrap()].into_iter().collect();
        scan(
            feed,
            &connections,
            &origins,
            &destinations,
            t(earliest),
            config,
            &CancelFlag::new(),
        )
        .unwrap()
    }

    #[test]
    fn direct_connection_is_found() {
        let feed = feed(
            &["A", "B"],
            vec![
                call("T1", "A", 1, "08:00:00", "08:00:00"),
                call("T1", "B", 2, "09:30:00", "09:30:00"),
            ],
            vec![trip("T1")],
        );

        let outcome = run(&feed, "A", "B", "08:00:00", &PlannerConfig::default());

        assert_eq!(outcome.ranked.len(), 1);
        let label = outcome.label(outcome.ranked[0]);
        assert_eq!(label.arrival, t("09:30:00"));
        assert_eq!(label.hops, 1);
    }

    #[test]
    fn unreachable_destination_yields_empty_ranking() {
        let feed = feed(
            &["A", "B", "C"],
            vec![
                call("T1", "A", 1, "08:00:00", "08:00:00"),
                call("T1", "B", 2, "09:30:00", "09:30:00"),
            ],
            vec![trip("T1")],
        );

        let outcome = run(&feed, "A", "C", "08:00:00", &PlannerConfig::default());
        assert!(outcome.ranked.is_empty());
    }

    #[test]
    fn departure_before_query_time_is_not_boardable() {
        let feed = feed(
            &["A", "B"],
            vec![
                call("T1", "A", 1, "07:00:00", "07:00:00"),
                call("T1", "B", 2, "08:00:00", "08:00:00"),
            ],
            vec![trip("T1")],
        );

        let outcome = run(&feed, "A", "B", "07:30:00", &PlannerConfig::default());
        assert!(outcome.ranked.is_empty());
    }

    #[test]
    fn ranking_orders_by_arrival() {
        let feed = feed(
            &["A", "B"],
            vec![
                call("T1", "A", 1, "08:00:00", "08:00:00"),
                call("T1", "B", 2, "09:30:00", "09:30:00"),
                call("T2", "A", 1, "08:10:00", "08:10:00"),
                call("T2", "B", 2, "09:20:00", "09:20:00"),
            ],
            vec![trip("T1"), trip("T2")],
        );

        let outcome = run(&feed, "A", "B", "08:05:00", &PlannerConfig::default());

        assert_eq!(outcome.ranked.len(), 2);
        assert_eq!(outcome.label(outcome.ranked[0]).arrival, t("09:20:00"));
        assert_eq!(outcome.label(outcome.ranked[1]).arrival, t("09:30:00"));
    }

    #[test]
    fn transfer_respects_minimum_transfer_time() {
        let stop_times = vec![
            call("T1", "A", 1, "08:00:00", "08:00:00"),
            call("T1", "C", 2, "08:40:00", "08:40:00"),
            call("T2", "C", 1, "08:45:00", "08:45:00"),
            call("T2", "B", 2, "09:30:00", "09:30:00"),
        ];

        let feed_mtt0 = feed(&["A", "B", "C"], stop_times, vec![trip("T1"), trip("T2")]);
        let outcome = run(&feed_mtt0, "A", "B", "08:00:00", &PlannerConfig::default());
        assert_eq!(outcome.ranked.len(), 1);

        // With a 600 s minimum the 300 s change at C is infeasible.
        let config = PlannerConfig::default().with_min_transfer_secs(600);
        let outcome = run(&feed_mtt0, "A", "B", "08:00:00", &config);
        assert!(outcome.ranked.is_empty());
    }

    #[test]
    fn same_trip_continuation_ignores_transfer_time() {
        // One trip calling A -> C -> B with a 5 minute dwell at C; even a
        // large MTT must not break riding through.
        let feed = feed(
            &["A", "B", "C"],
            vec![
                call("T1", "A", 1, "08:00:00", "08:00:00"),
                call("T1", "C", 2, "08:40:00", "08:45:00"),
                call("T1", "B", 3, "09:30:00", "09:30:00"),
            ],
            vec![trip("T1")],
        );

        let config = PlannerConfig::default().with_min_transfer_secs(600);
        let outcome = run(&feed, "A", "B", "08:00:00", &config);

        assert_eq!(outcome.ranked.len(), 1);
        assert_eq!(outcome.label(outcome.ranked[0]).arrival, t("09:30:00"));
    }

    #[test]
    fn first_boarding_waives_transfer_time() {
        // The origin label waits 30 minutes at A; MTT must not apply to it.
        let feed = feed(
            &["A", "B"],
            vec![
                call("T1", "A", 1, "08:30:00", "08:30:00"),
                call("T1", "B", 2, "09:00:00", "09:00:00"),
            ],
            vec![trip("T1")],
        );

        let config = PlannerConfig::default().with_min_transfer_secs(3_600);
        let outcome = run(&feed, "A", "B", "08:00:00", &config);
        assert_eq!(outcome.ranked.len(), 1);
    }

    #[test]
    fn equal_arrivals_prefer_later_departure() {
        let feed = feed(
            &["A", "B"],
            vec![
                call("T1", "A", 1, "08:00:00", "08:00:00"),
                call("T1", "B", 2, "09:30:00", "09:30:00"),
                call("T2", "A", 1, "08:20:00", "08:20:00"),
                call("T2", "B", 2, "09:30:00", "09:30:00"),
            ],
            vec![trip("T1"), trip("T2")],
        );

        let outcome = run(&feed, "A", "B", "08:00:00", &PlannerConfig::default());

        assert_eq!(outcome.ranked.len(), 2);
        // Same arrival; the shorter ride (T2, departing later) ranks first.
        assert_eq!(
            outcome.label(outcome.ranked[0]).departure,
            Some(t("08:20:00"))
        );
    }

    #[test]
    fn label_bound_caps_labels_per_stop() {
        // Five parallel trips into B; a bound of 2 keeps only the two best.
        let mut stop_times = Vec::new();
        for i in 0..5 {
            let id = format!("T{i}");
            stop_times.push(call(&id, "A", 1, "08:00:00", "08:00:00"));
            stop_times.push(call(&id, "B", 2, &format!("09:0{i}:00"), &format!("09:0{i}:00")));
        }
        let trips = (0..5).map(|i| trip(&format!("T{i}"))).collect();
        let feed = feed(&["A", "B"], stop_times, trips);

        let config = PlannerConfig {
            max_labels_per_stop: Some(2),
            ..PlannerConfig::default()
        };
        let outcome = run(&feed, "A", "B", "08:00:00", &config);

        assert_eq!(outcome.ranked.len(), 2);
        assert_eq!(outcome.label(outcome.ranked[0]).arrival, t("09:00:00"));
        assert_eq!(outcome.label(outcome.ranked[1]).arrival, t("09:01:00"));
    }

    #[test]
    fn cancel_flag_aborts_scan() {
        let feed = feed(
            &["A", "B"],
            vec![
                call("T1", "A", 1, "08:00:00", "08:00:00"),
                call("T1", "B", 2, "09:30:00", "09:30:00"),
            ],
            vec![trip("T1")],
        );

        let active = feed.active_services(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        let connections = build_connections(&feed, &active, t("08:00:00"));
        let origins = vec![feed.lookup_stop("A").unwrap()];
        let destinations: HashSet<StopIdx> =
            [feed.lookup_stop("B").unwrap()].into_iter().collect();

        let cancel = CancelFlag::new();
        cancel.cancel();
        let result = scan(
            &feed,
            &connections,
            &origins,
            &destinations,
            t("08:00:00"),
            &PlannerConfig::default(),
            &cancel,
        );
        assert_eq!(result.unwrap_err(), Cancelled);
    }

    #[test]
    fn scan_is_deterministic() {
        let mut stop_times = Vec::new();
        let mut trips_rows = Vec::new();
        for i in 0..6 {
            let id = format!("T{i}");
            stop_times.push(call(&id, "A", 1, "08:00:00", "08:00:00"));
            stop_times.push(call(&id, "C", 2, "08:30:00", "08:31:00"));
            stop_times.push(call(&id, "B", 3, "09:30:00", "09:30:00"));
            trips_rows.push(trip(&id));
        }
        let feed = feed(&["A", "B", "C"], stop_times, trips_rows);

        let collect = || {
            let outcome = run(&feed, "A", "B", "08:00:00", &PlannerConfig::default());
            outcome
                .ranked
                .iter()
                .map(|&idx| {
                    let l = outcome.label(idx);
                    (l.arrival, l.trip, l.departure)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(collect(), collect());
    }
}
