use formats::{FeatureCollection, GeoJsonError};
use futures_util::stream::{FuturesUnordered, Stream, StreamExt};
use layers::OverlayCategory;
use layers::vector::Overlay;
use runtime::config::ViewerConfig;
use runtime::session::{MapSession, SessionError};
use serde::Serialize;
use tracing::{debug, warn};

use crate::fetch::{DatasetFetcher, FetchError};
use crate::request::DatasetRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    Fetch(FetchError),
    Parse(GeoJsonError),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Fetch(e) => write!(f, "{e}"),
            LoadError::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Fetch(e) => Some(e),
            LoadError::Parse(e) => Some(e),
        }
    }
}

impl From<FetchError> for LoadError {
    fn from(e: FetchError) -> Self {
        LoadError::Fetch(e)
    }
}

impl From<GeoJsonError> for LoadError {
    fn from(e: GeoJsonError) -> Self {
        LoadError::Parse(e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub category: OverlayCategory,
    pub url: String,
    pub cause: LoadError,
}

/// Result of one fetch-parse-build pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(Overlay),
    Failed(LoadFailure),
}

impl LoadOutcome {
    pub fn category(&self) -> OverlayCategory {
        match self {
            LoadOutcome::Loaded(overlay) => overlay.category,
            LoadOutcome::Failed(failure) => failure.category,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }

    /// Hands the outcome to the session: a loaded overlay goes on the map,
    /// a failure is logged and leaves its category absent.
    pub fn apply_to(self, session: &mut MapSession) -> Result<(), SessionError> {
        match self {
            LoadOutcome::Loaded(overlay) => session.add_overlay(overlay),
            LoadOutcome::Failed(failure) => {
                session.record_load_failure(failure.category, &failure.cause);
                Ok(())
            }
        }
    }
}

async fn fetch_and_build<F>(fetcher: &F, request: &DatasetRequest) -> Result<Overlay, LoadError>
where
    F: DatasetFetcher + ?Sized,
{
    let body = fetcher.fetch(&request.url).await?;
    let collection = FeatureCollection::from_geojson_str(&body)?;
    Ok(Overlay::from_collection(request.category, &collection))
}

/// Runs one pipeline: fetch the dataset, parse it, build its overlay.
pub async fn load_dataset<F>(fetcher: &F, request: DatasetRequest) -> LoadOutcome
where
    F: DatasetFetcher + ?Sized,
{
    debug!(category = %request.category, url = %request.url, "fetching dataset");
    match fetch_and_build(fetcher, &request).await {
        Ok(overlay) => LoadOutcome::Loaded(overlay),
        Err(cause) => LoadOutcome::Failed(LoadFailure {
            category: request.category,
            url: request.url,
            cause,
        }),
    }
}

/// Categories that loaded or failed, each in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded: Vec<OverlayCategory>,
    pub failed: Vec<OverlayCategory>,
}

impl LoadReport {
    fn record(&mut self, category: OverlayCategory, loaded: bool) {
        if loaded {
            self.loaded.push(category);
        } else {
            self.failed.push(category);
        }
    }
}

/// Starts every dataset pipeline at once and reports results as they finish.
pub struct DatasetLoader<'f, F: ?Sized> {
    fetcher: &'f F,
    requests: Vec<DatasetRequest>,
}

impl<'f, F> DatasetLoader<'f, F>
where
    F: DatasetFetcher + ?Sized,
{
    pub fn new(fetcher: &'f F, requests: Vec<DatasetRequest>) -> Self {
        Self { fetcher, requests }
    }

    pub fn for_config(fetcher: &'f F, config: &ViewerConfig) -> Self {
        Self::new(fetcher, DatasetRequest::defaults(config))
    }

    pub fn requests(&self) -> &[DatasetRequest] {
        &self.requests
    }

    /// Outcomes in completion order. Dropping the stream cancels whatever is
    /// still in flight.
    pub fn outcomes(&self) -> impl Stream<Item = LoadOutcome> + '_ {
        self.requests
            .iter()
            .cloned()
            .map(|request| load_dataset(self.fetcher, request))
            .collect::<FuturesUnordered<_>>()
    }

    /// Drives every pipeline to completion, applying each outcome to
    /// `session` as soon as it arrives. Outcomes the session rejects are
    /// left out of the report.
    pub async fn load_into(&self, session: &mut MapSession) -> LoadReport {
        let mut report = LoadReport::default();
        let mut outcomes = std::pin::pin!(self.outcomes());
        while let Some(outcome) = outcomes.next().await {
            let category = outcome.category();
            let loaded = outcome.is_loaded();
            match outcome.apply_to(session) {
                Ok(()) => report.record(category, loaded),
                Err(e) => warn!("{category} outcome dropped: {e}"),
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::rc::Rc;
    use std::task::{Context, Poll};

    use futures_util::future;

    use foundation::{LatLng, LatLngBounds};
    use pretty_assertions::assert_eq;
    use runtime::event_bus::EventKind;

    use super::*;
    use crate::fetch::BoxFuture;

    /// Pending for `remaining` polls, then ready.
    struct YieldTimes {
        remaining: usize,
    }

    impl Future for YieldTimes {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.remaining == 0 {
                return Poll::Ready(());
            }
            self.remaining -= 1;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    /// Serves canned responses, each after a chosen number of yields so tests
    /// control the completion order.
    #[derive(Default)]
    struct ScriptedFetcher {
        responses: HashMap<String, (usize, Result<String, FetchError>)>,
    }

    impl ScriptedFetcher {
        fn respond(mut self, url: &str, delay: usize, response: Result<&str, FetchError>) -> Self {
            self.responses
                .insert(url.to_string(), (delay, response.map(str::to_string)));
            self
        }
    }

    impl DatasetFetcher for ScriptedFetcher {
        fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
            Box::pin(async move {
                let Some((delay, response)) = self.responses.get(url) else {
                    return Err(FetchError::Status { code: 404 });
                };
                YieldTimes { remaining: *delay }.await;
                response.clone()
            })
        }
    }

    /// Sets its flag when dropped.
    struct DropFlag(Rc<Cell<bool>>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    /// Like `ScriptedFetcher`, except that one URL never answers.
    struct StalledFetcher {
        inner: ScriptedFetcher,
        stalled_url: &'static str,
        dropped: Rc<Cell<bool>>,
    }

    impl DatasetFetcher for StalledFetcher {
        fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, FetchError>> {
            if url != self.stalled_url {
                return self.inner.fetch(url);
            }
            let flag = DropFlag(Rc::clone(&self.dropped));
            Box::pin(async move {
                let _flag = flag;
                future::pending::<Result<String, FetchError>>().await
            })
        }
    }

    const POINTS: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"name":"Nairobi"},
         "geometry":{"type":"Point","coordinates":[36.817223,-1.286389]}}]}"#;

    const LINES: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{},
         "geometry":{"type":"LineString","coordinates":[[36.0,-1.0],[37.5,0.5]]}}]}"#;

    const POLYGONS: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"name":"Park"},
         "geometry":{"type":"Polygon","coordinates":[[[36.7,-1.4],[36.9,-1.4],[36.9,-1.2],[36.7,-1.4]]]}}]}"#;

    const EMPTY: &str = r#"{"type":"FeatureCollection","features":[]}"#;

    fn requests() -> Vec<DatasetRequest> {
        DatasetRequest::defaults(&ViewerConfig::default())
    }

    fn fetcher(delays: [usize; 3]) -> ScriptedFetcher {
        ScriptedFetcher::default()
            .respond("data/points.geojson", delays[0], Ok(POINTS))
            .respond("data/data/lines.geojson", delays[1], Ok(LINES))
            .respond("data/data/data/polygons.geojson", delays[2], Ok(POLYGONS))
    }

    fn run(fetcher: &ScriptedFetcher) -> (MapSession, LoadReport) {
        let mut session = MapSession::new(&ViewerConfig::default());
        let loader = DatasetLoader::new(fetcher, requests());
        let report = pollster::block_on(loader.load_into(&mut session));
        (session, report)
    }

    #[test]
    fn load_dataset_builds_overlay() {
        let f = fetcher([0, 0, 0]);
        let request = DatasetRequest::new(OverlayCategory::Points, "data/points.geojson");
        let outcome = pollster::block_on(load_dataset(&f, request));
        let LoadOutcome::Loaded(overlay) = outcome else {
            panic!("expected overlay, got {outcome:?}");
        };
        assert_eq!(overlay.category, OverlayCategory::Points);
        assert_eq!(overlay.shapes[0].label, "Nairobi");
    }

    #[test]
    fn outcomes_arrive_in_completion_order() {
        let f = fetcher([4, 0, 2]);
        let loader = DatasetLoader::new(&f, requests());
        let order: Vec<OverlayCategory> =
            pollster::block_on(loader.outcomes().map(|o| o.category()).collect());
        assert_eq!(
            order,
            vec![
                OverlayCategory::Lines,
                OverlayCategory::Polygons,
                OverlayCategory::Points
            ]
        );
    }

    #[test]
    fn every_completion_order_gives_the_same_map() {
        let delays = [
            [0, 2, 4],
            [0, 4, 2],
            [2, 0, 4],
            [4, 0, 2],
            [2, 4, 0],
            [4, 2, 0],
        ];
        let states: Vec<_> = delays
            .iter()
            .map(|d| {
                let (session, report) = run(&fetcher(*d));
                assert!(report.failed.is_empty());
                (session.bounds(), *session.view(), session.control().clone())
            })
            .collect();

        for s in &states[1..] {
            assert_eq!(s, &states[0]);
        }
        let bounds = states[0].0.expect("bounds");
        assert_eq!(bounds.south_west, LatLng::new(-1.4, 36.0));
        assert_eq!(bounds.north_east, LatLng::new(0.5, 37.5));
        assert_eq!(states[0].2.overlays.len(), 3);
        assert!(states[0].2.overlays.iter().all(|o| o.visible));
        assert_eq!(states[0].2.base_layers.iter().filter(|b| b.active).count(), 1);
    }

    #[test]
    fn nairobi_scenario_with_missing_polygons() {
        let f = ScriptedFetcher::default()
            .respond("data/points.geojson", 1, Ok(POINTS))
            .respond("data/data/lines.geojson", 0, Ok(LINES));
        let (session, report) = run(&f);

        assert_eq!(report.failed, vec![OverlayCategory::Polygons]);
        assert_eq!(session.control().overlay_names(), vec!["Points", "Lines"]);
        assert!(session.overlay(OverlayCategory::Polygons).is_none());

        let points = session.overlay(OverlayCategory::Points).expect("points");
        assert_eq!(points.shapes[0].popup_html(), "<b>Nairobi</b>");
        let lines = session.overlay(OverlayCategory::Lines).expect("lines");
        assert_eq!(lines.shapes[0].popup_html(), "<b>Line feature</b>");

        let expected = LatLngBounds::new(LatLng::new(-1.286389, 36.0), LatLng::new(0.5, 37.5));
        assert_eq!(session.bounds(), Some(expected));

        let errors: Vec<&str> = session
            .events()
            .iter()
            .filter(|e| e.kind == EventKind::LoadFailed)
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(errors, vec!["Polygons error: HTTP 404"]);
    }

    #[test]
    fn malformed_response_only_drops_its_category() {
        let f = fetcher([0, 1, 2]).respond("data/data/lines.geojson", 0, Ok("{not json"));
        let (session, report) = run(&f);

        assert_eq!(report.failed, vec![OverlayCategory::Lines]);
        assert_eq!(report.loaded.len(), 2);
        assert_eq!(session.control().overlay_names(), vec!["Points", "Polygons"]);
        let failure = session
            .events()
            .iter()
            .find(|e| e.kind.is_error())
            .expect("failure event");
        assert!(failure.message.starts_with("Lines error: JSON parse error"));
    }

    #[test]
    fn transport_failure_is_reported() {
        let f = fetcher([0, 0, 0]).respond(
            "data/points.geojson",
            0,
            Err(FetchError::Transport("connection refused".to_string())),
        );
        let request = DatasetRequest::new(OverlayCategory::Points, "data/points.geojson");
        let outcome = pollster::block_on(load_dataset(&f, request));
        assert_eq!(
            outcome,
            LoadOutcome::Failed(LoadFailure {
                category: OverlayCategory::Points,
                url: "data/points.geojson".to_string(),
                cause: LoadError::Fetch(FetchError::Transport("connection refused".to_string())),
            })
        );
    }

    #[test]
    fn empty_collection_keeps_other_bounds() {
        let f = fetcher([0, 0, 0]).respond("data/data/data/polygons.geojson", 0, Ok(EMPTY));
        let (session, report) = run(&f);
        assert!(report.failed.is_empty());
        assert_eq!(session.control().overlays.len(), 3);
        let bounds = session.bounds().expect("bounds");
        assert_eq!(bounds.south_west, LatLng::new(-1.286389, 36.0));
    }

    #[test]
    fn duplicate_outcome_is_ignored() {
        let f = fetcher([0, 0, 0]);
        let mut requests = requests();
        requests.push(DatasetRequest::new(OverlayCategory::Points, "data/points.geojson"));
        let mut session = MapSession::new(&ViewerConfig::default());
        let report = pollster::block_on(DatasetLoader::new(&f, requests).load_into(&mut session));

        assert_eq!(report.loaded.len(), 3);
        assert!(report.failed.is_empty());
        assert_eq!(session.overlays().count(), 3);
        assert_eq!(session.control().overlays.len(), 3);
    }

    #[test]
    fn all_failures_leave_initial_view() {
        let f = ScriptedFetcher::default();
        let (session, report) = run(&f);
        assert_eq!(report.failed.len(), 3);
        assert!(session.bounds().is_none());
        assert_eq!(session.view().zoom, 6.0);
        assert!(session.control().overlays.is_empty());
    }

    #[test]
    fn feature_without_geometry_does_not_drop_category() {
        let body = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"Nairobi"},
             "geometry":{"type":"Point","coordinates":[36.817223,-1.286389]}},
            {"type":"Feature","properties":{"name":"orphan"}}]}"#;
        let f = ScriptedFetcher::default().respond("data/points.geojson", 0, Ok(body));
        let request = DatasetRequest::new(OverlayCategory::Points, "data/points.geojson");
        let outcome = pollster::block_on(load_dataset(&f, request));
        let LoadOutcome::Loaded(overlay) = outcome else {
            panic!("expected overlay, got {outcome:?}");
        };
        assert_eq!(overlay.feature_count, 2);
        assert_eq!(overlay.shapes.len(), 1);
        assert_eq!(overlay.shapes[0].popup_html(), "<b>Nairobi</b>");
    }

    #[test]
    fn pending_category_stays_off_the_map_and_is_cancelled_on_drop() {
        let dropped = Rc::new(Cell::new(false));
        let f = StalledFetcher {
            inner: fetcher([1, 0, 0]),
            stalled_url: "data/data/data/polygons.geojson",
            dropped: Rc::clone(&dropped),
        };
        let loader = DatasetLoader::new(&f, requests());
        let mut session = MapSession::new(&ViewerConfig::default());
        {
            let mut outcomes = std::pin::pin!(loader.outcomes().take(2));
            pollster::block_on(async {
                while let Some(outcome) = outcomes.next().await {
                    outcome.apply_to(&mut session).expect("apply");
                }
            });
            assert!(!dropped.get());
        }
        assert!(dropped.get());

        assert_eq!(session.control().overlay_names(), vec!["Points", "Lines"]);
        assert!(session.overlay(OverlayCategory::Polygons).is_none());
        let expected = LatLngBounds::new(LatLng::new(-1.286389, 36.0), LatLng::new(0.5, 37.5));
        assert_eq!(session.bounds(), Some(expected));
    }
}
