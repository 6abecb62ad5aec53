//! Unit tests for the engine adapter.

use super::*;
use crate::breaker::CallError;
use crate::domain::{Coord, PeriodExtremity};
use crate::kraken::types::{
    EngineCoord, EngineJourney, EngineMatrix, EngineMatrixRow, EnginePlace, EngineRoutingResponse,
    EngineSection, EngineStreetNetwork,
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;

type Responder = dyn Fn(&EngineRequest) -> Result<EngineResponse, CallError> + Send + Sync;

/// Engine answering from a closure and recording what it was sent.
struct ScriptedEngine {
    respond: Box<Responder>,
    requests: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedEngine {
    fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&EngineRequest) -> Result<EngineResponse, CallError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> serde_json::Value {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl EngineRpc for ScriptedEngine {
    async fn send(&self, request: &EngineRequest) -> Result<EngineResponse, CallError> {
        self.requests
            .lock()
            .unwrap()
            .push(serde_json::to_value(request).unwrap());
        (self.respond)(request)
    }
}

fn t(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, h, m, 0).unwrap()
}

fn place(uri: &str, lon: f64, lat: f64) -> Place {
    Place::new(uri, PlaceKind::Address, Coord::new(lon, lat).unwrap())
}

fn engine_place(uri: &str, lon: f64, lat: f64) -> EnginePlace {
    EnginePlace {
        uri: uri.into(),
        name: String::new(),
        embedded_type: Some("address".into()),
        coord: EngineCoord { lon, lat },
        poi_type: None,
    }
}

fn engine_section(
    section_type: &str,
    mode: Option<&str>,
    from: &str,
    to: &str,
    begin: i64,
    duration: i64,
) -> EngineSection {
    EngineSection {
        section_type: section_type.into(),
        origin: engine_place(from, 0.0, 0.0),
        destination: engine_place(to, 0.0, 0.0),
        begin_date_time: begin,
        end_date_time: begin + duration,
        duration,
        length: duration as f64 * 10.0,
        street_network: mode.map(|m| EngineStreetNetwork {
            mode: m.into(),
            coordinates: vec![],
        }),
    }
}

fn journey_response(sections: Vec<EngineSection>) -> EngineResponse {
    let departure = sections.first().map(|s| s.begin_date_time).unwrap_or(0);
    let duration: i64 = sections.iter().map(|s| s.duration).sum();
    EngineResponse {
        journeys: vec![EngineJourney {
            duration,
            departure_date_time: departure,
            arrival_date_time: departure + duration,
            sections,
        }],
        ..Default::default()
    }
}

fn kraken(engine: Arc<ScriptedEngine>, modes: &[StreetNetworkMode]) -> Kraken {
    Kraken::new("kraken", modes, engine, BreakerConfig::default())
}

fn car_journey(_: &EngineRequest) -> Result<EngineResponse, CallError> {
    let start = t(10, 0).timestamp();
    Ok(journey_response(vec![engine_section(
        "street_network",
        Some("car"),
        "a",
        "b",
        start,
        600,
    )]))
}

#[tokio::test]
async fn direct_path_within_bounds_calls_engine() {
    let engine = ScriptedEngine::new(car_journey);
    let kraken = kraken(engine.clone(), &[StreetNetworkMode::Car]);
    let origin = place("a", 0.0, 0.0);
    let destination = place("b", 0.01, 0.01);

    let response = kraken
        .direct_path(
            DirectPathQuery::new(
                StreetNetworkMode::Car,
                &origin,
                &destination,
                PeriodExtremity::departure(t(10, 0)),
                StreetNetworkPathType::Direct,
            ),
            &RoutingParams::new("req-1"),
        )
        .await
        .unwrap();

    assert_eq!(engine.call_count(), 1);
    assert_eq!(response.journeys.len(), 1);

    let sent = engine.last_request();
    assert_eq!(sent["requested_api"], "DIRECT_PATH");
    assert_eq!(sent["request_id"], "req-1");
    assert_eq!(sent["direct_path"]["origin"]["place"], "0;0");
    assert_eq!(sent["direct_path"]["clockwise"], true);
}

#[tokio::test]
async fn direct_path_beyond_distance_skips_engine() {
    let engine = ScriptedEngine::new(car_journey);
    let kraken = kraken(engine.clone(), &[StreetNetworkMode::Car]);
    let origin = place("a", 0.0, 0.0);
    let destination = place("b", 50.0, 50.0);

    let response = kraken
        .direct_path(
            DirectPathQuery::new(
                StreetNetworkMode::Car,
                &origin,
                &destination,
                PeriodExtremity::departure(t(10, 0)),
                StreetNetworkPathType::Direct,
            ),
            &RoutingParams::new("req-1"),
        )
        .await
        .unwrap();

    assert!(response.is_empty());
    assert!(response.no_solution.is_none());
    assert_eq!(engine.call_count(), 0);
}

#[tokio::test]
async fn direct_path_beyond_duration_skips_engine() {
    let engine = ScriptedEngine::new(car_journey);
    let kraken = kraken(engine.clone(), &[StreetNetworkMode::Walking]);
    let origin = place("a", 0.0, 0.0);
    let destination = place("b", 0.01, 0.01);
    // ~1572m at 1 m/s is ~26 minutes, above a 10 minute bound
    let params = RoutingParams::new("req")
        .with_speed(StreetNetworkMode::Walking, 1.0)
        .with_direct_path_bounds(StreetNetworkMode::Walking, 50_000.0, 600);

    let response = kraken
        .direct_path(
            DirectPathQuery::new(
                StreetNetworkMode::Walking,
                &origin,
                &destination,
                PeriodExtremity::departure(t(10, 0)),
                StreetNetworkPathType::Direct,
            ),
            &params,
        )
        .await
        .unwrap();

    assert!(response.is_empty());
    assert_eq!(engine.call_count(), 0);
}

#[tokio::test]
async fn fallback_is_never_prefiltered() {
    let engine = ScriptedEngine::new(car_journey);
    let kraken = kraken(engine.clone(), &[StreetNetworkMode::Car]);
    let origin = place("a", 0.0, 0.0);
    let destination = place("b", 50.0, 50.0);

    kraken
        .direct_path(
            DirectPathQuery::new(
                StreetNetworkMode::Car,
                &origin,
                &destination,
                PeriodExtremity::departure(t(10, 0)),
                StreetNetworkPathType::BeginningFallback,
            ),
            &RoutingParams::default(),
        )
        .await
        .unwrap();

    assert_eq!(engine.call_count(), 1);
}

#[tokio::test]
async fn ending_fallback_car_is_computed_backwards_and_reversed() {
    // The engine is asked b -> a and answers b -> p -> a
    let engine = ScriptedEngine::new(|_| {
        let start = t(17, 0).timestamp();
        Ok(journey_response(vec![
            engine_section("street_network", Some("car"), "b", "p", start, 900),
            engine_section("street_network", Some("walking"), "p", "a", start + 900, 300),
        ]))
    });
    let kraken = kraken(engine.clone(), &[StreetNetworkMode::Car]);
    let origin = place("a", 0.0, 0.0);
    let destination = place("b", 0.01, 0.01);
    let anchor = PeriodExtremity::arrival(t(18, 0));

    let response = kraken
        .direct_path(
            DirectPathQuery::new(
                StreetNetworkMode::Car,
                &origin,
                &destination,
                anchor,
                StreetNetworkPathType::EndingFallback,
            ),
            &RoutingParams::default(),
        )
        .await
        .unwrap();

    let sent = engine.last_request();
    assert_eq!(sent["direct_path"]["origin"]["place"], "0.01;0.01");
    assert_eq!(sent["direct_path"]["destination"]["place"], "0;0");

    let journey = response.first().unwrap();
    assert_eq!(journey.arrival_date_time, t(18, 0));
    assert_eq!(journey.duration, Duration::seconds(1200));
    assert_eq!(journey.visited_places(), vec!["a", "p", "b"]);
    assert_eq!(journey.sections[0].mode, Some(StreetNetworkMode::Walking));
    assert_eq!(journey.sections[0].id, "section_0");
    assert!(journey.check_invariants().is_ok());
}

#[tokio::test]
async fn ending_fallback_walking_is_not_inverted() {
    let engine = ScriptedEngine::new(car_journey);
    let kraken = kraken(engine.clone(), &[StreetNetworkMode::Walking]);
    let origin = place("a", 0.0, 0.0);
    let destination = place("b", 0.01, 0.01);

    kraken
        .direct_path(
            DirectPathQuery::new(
                StreetNetworkMode::Walking,
                &origin,
                &destination,
                PeriodExtremity::arrival(t(18, 0)),
                StreetNetworkPathType::EndingFallback,
            ),
            &RoutingParams::default(),
        )
        .await
        .unwrap();

    let sent = engine.last_request();
    assert_eq!(sent["direct_path"]["origin"]["place"], "0;0");
    assert_eq!(sent["direct_path"]["clockwise"], false);
}

#[tokio::test]
async fn bss_walk_only_is_reported_as_walking() {
    let engine = ScriptedEngine::new(|_| {
        Ok(journey_response(vec![engine_section(
            "street_network",
            Some("bss"),
            "a",
            "b",
            t(10, 0).timestamp(),
            600,
        )]))
    });
    let kraken = kraken(engine, &[StreetNetworkMode::Bss]);
    let origin = place("a", 0.0, 0.0);
    let destination = place("b", 0.01, 0.01);

    let response = kraken
        .direct_path(
            DirectPathQuery::new(
                StreetNetworkMode::Bss,
                &origin,
                &destination,
                PeriodExtremity::departure(t(10, 0)),
                StreetNetworkPathType::Direct,
            ),
            &RoutingParams::default(),
        )
        .await
        .unwrap();

    let journey = response.first().unwrap();
    assert_eq!(journey.sections[0].mode, Some(StreetNetworkMode::Walking));
    assert_eq!(journey.durations.walking, Duration::seconds(600));
    assert_eq!(journey.durations.bss, Duration::zero());
}

#[tokio::test]
async fn bss_with_rent_and_put_back_keeps_bss() {
    let engine = ScriptedEngine::new(|_| {
        let s = t(10, 0).timestamp();
        Ok(journey_response(vec![
            engine_section("street_network", Some("walking"), "a", "s1", s, 120),
            engine_section("bss_rent", None, "s1", "s1", s + 120, 60),
            engine_section("street_network", Some("bike"), "s1", "s2", s + 180, 600),
            engine_section("bss_put_back", None, "s2", "s2", s + 780, 60),
            engine_section("street_network", Some("walking"), "s2", "b", s + 840, 120),
        ]))
    });
    let kraken = kraken(engine, &[StreetNetworkMode::Bss]);
    let origin = place("a", 0.0, 0.0);
    let destination = place("b", 0.01, 0.01);

    let response = kraken
        .direct_path(
            DirectPathQuery::new(
                StreetNetworkMode::Bss,
                &origin,
                &destination,
                PeriodExtremity::departure(t(10, 0)),
                StreetNetworkPathType::Direct,
            ),
            &RoutingParams::default(),
        )
        .await
        .unwrap();

    let journey = response.first().unwrap();
    assert_eq!(journey.sections[0].mode, Some(StreetNetworkMode::Bss));
    assert_eq!(journey.sections.len(), 5);
}

#[tokio::test]
async fn engine_no_solution_is_a_response_not_an_error() {
    let engine = ScriptedEngine::new(|_| {
        Ok(EngineResponse {
            error: Some(EngineError {
                id: "no_destination".into(),
                message: "destination not on the network".into(),
            }),
            ..Default::default()
        })
    });
    let kraken = kraken(engine, &[StreetNetworkMode::Walking]);
    let origin = place("a", 0.0, 0.0);
    let destination = place("b", 0.01, 0.01);

    let response = kraken
        .direct_path(
            DirectPathQuery::new(
                StreetNetworkMode::Walking,
                &origin,
                &destination,
                PeriodExtremity::departure(t(10, 0)),
                StreetNetworkPathType::Direct,
            ),
            &RoutingParams::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.no_solution.unwrap().code,
        NoSolutionCode::NoDestination
    );
}

#[tokio::test]
async fn engine_internal_error_is_technical() {
    let engine = ScriptedEngine::new(|_| {
        Ok(EngineResponse {
            error: Some(EngineError {
                id: "internal_error".into(),
                message: "boom".into(),
            }),
            ..Default::default()
        })
    });
    let kraken = kraken(engine, &[StreetNetworkMode::Walking]);
    let origin = place("a", 0.0, 0.0);
    let destination = place("b", 0.01, 0.01);

    let err = kraken
        .direct_path(
            DirectPathQuery::new(
                StreetNetworkMode::Walking,
                &origin,
                &destination,
                PeriodExtremity::departure(t(10, 0)),
                StreetNetworkPathType::Direct,
            ),
            &RoutingParams::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StreetNetworkError::Technical(_)));
}

#[tokio::test]
async fn transport_failures_open_the_breaker() {
    let engine = ScriptedEngine::new(|_| {
        Err(CallError::Transport {
            message: "connection refused".into(),
        })
    });
    let kraken = Kraken::new(
        "kraken",
        &[StreetNetworkMode::Walking],
        engine.clone(),
        BreakerConfig::default().with_fail_max(2),
    );
    let origin = place("a", 0.0, 0.0);
    let destination = place("b", 0.01, 0.01);
    let query = DirectPathQuery::new(
        StreetNetworkMode::Walking,
        &origin,
        &destination,
        PeriodExtremity::departure(t(10, 0)),
        StreetNetworkPathType::Direct,
    );
    let params = RoutingParams::default();

    for _ in 0..2 {
        assert!(kraken.direct_path(query, &params).await.is_err());
    }
    let err = kraken.direct_path(query, &params).await.unwrap_err();

    assert!(matches!(
        err,
        StreetNetworkError::Call(CallError::BreakerOpen { .. })
    ));
    assert_eq!(engine.call_count(), 2);
}

fn matrix_response(statuses: &[(&str, i64)]) -> EngineResponse {
    EngineResponse {
        sn_routing_matrix: Some(EngineMatrix {
            rows: vec![EngineMatrixRow {
                routing_response: statuses
                    .iter()
                    .map(|(s, d)| EngineRoutingResponse {
                        duration: *d,
                        routing_status: (*s).into(),
                    })
                    .collect(),
            }],
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn n_by_one_matrix_is_swapped() {
    let engine = ScriptedEngine::new(|_| {
        Ok(matrix_response(&[("reached", 300), ("unreached", 0), ("reached", 120)]))
    });
    let kraken = kraken(engine.clone(), &[StreetNetworkMode::Walking]);
    let origins = vec![
        place("p1", 0.0, 0.0),
        place("p2", 0.1, 0.0),
        place("p3", 0.2, 0.0),
    ];
    let destination = vec![place("d", 0.3, 0.0)];

    let rows = kraken
        .routing_matrix(
            &origins,
            &destination,
            StreetNetworkMode::Walking,
            Duration::minutes(30),
            &RoutingParams::default(),
        )
        .await
        .unwrap();

    let sent = engine.last_request();
    assert_eq!(sent["requested_api"], "STREET_NETWORK_ROUTING_MATRIX");
    assert_eq!(sent["sn_routing_matrix"]["origins"].as_array().unwrap().len(), 1);
    assert_eq!(sent["sn_routing_matrix"]["destinations"].as_array().unwrap().len(), 3);
    assert_eq!(sent["sn_routing_matrix"]["max_duration"], 1800);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].duration(), Some(Duration::seconds(120)));
}

#[tokio::test]
async fn many_by_many_matrix_fails_loudly() {
    let engine = ScriptedEngine::new(|_| Ok(matrix_response(&[])));
    let kraken = kraken(engine.clone(), &[StreetNetworkMode::Walking]);
    let many = vec![place("p1", 0.0, 0.0), place("p2", 0.1, 0.0)];

    let err = kraken
        .routing_matrix(
            &many,
            &many,
            StreetNetworkMode::Walking,
            Duration::minutes(30),
            &RoutingParams::default(),
        )
        .await
        .unwrap_err();

    assert!(!err.is_recoverable());
    assert_eq!(engine.call_count(), 0);
}

#[tokio::test]
async fn matrix_with_wrong_length_is_invalid() {
    let engine = ScriptedEngine::new(|_| Ok(matrix_response(&[("reached", 10)])));
    let kraken = kraken(engine, &[StreetNetworkMode::Walking]);
    let origin = vec![place("o", 0.0, 0.0)];
    let destinations = vec![place("d1", 0.1, 0.0), place("d2", 0.2, 0.0)];

    let err = kraken
        .routing_matrix(
            &origin,
            &destinations,
            StreetNetworkMode::Walking,
            Duration::minutes(30),
            &RoutingParams::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StreetNetworkError::InvalidResponse { .. }));
}

#[tokio::test]
async fn places_nearby_filters_parkings() {
    let engine = ScriptedEngine::new(|_| {
        let mut parking = engine_place("poi:parking", 0.001, 0.0);
        parking.embedded_type = Some("poi".into());
        parking.poi_type = Some("poi_type:amenity:parking".into());
        let mut shop = engine_place("poi:shop", 0.002, 0.0);
        shop.embedded_type = Some("poi".into());
        shop.poi_type = Some("poi_type:shop".into());
        Ok(EngineResponse {
            places_nearby: vec![parking, shop],
            ..Default::default()
        })
    });
    let kraken = kraken(engine.clone(), &[StreetNetworkMode::Walking]);
    let origin = place("d", 0.0, 0.0);
    let query = NearbyQuery {
        origin: &origin,
        mode: StreetNetworkMode::Walking,
        max_duration: Duration::minutes(10),
        max_count: 5,
        object_types: vec![PlaceKind::Poi],
        poi_type: Some("poi_type:amenity:parking".into()),
        forbidden_uris: vec![],
        allowed_ids: vec![],
    };

    let places = kraken
        .places_nearby(&query, &RoutingParams::default().with_speed(StreetNetworkMode::Walking, 1.0))
        .await
        .unwrap();

    assert_eq!(places.len(), 1);
    assert_eq!(places[0].uri(), "poi:parking");
    let sent = engine.last_request();
    assert_eq!(sent["places_nearby"]["distance"], 600.0);
    assert_eq!(sent["places_nearby"]["types"][0], "poi");
}

#[test]
fn status_reports_breaker() {
    let engine = ScriptedEngine::new(car_journey);
    let kraken = kraken(engine, &[StreetNetworkMode::Walking, StreetNetworkMode::Bike]);
    let status = kraken.status();

    assert_eq!(status.id, "kraken");
    assert_eq!(status.class, "Kraken");
    assert_eq!(status.timeout, Some(10));
    assert!(status.circuit_breaker.is_some());
}

#[test]
fn path_key_ignores_extremity() {
    let engine = ScriptedEngine::new(car_journey);
    let kraken = kraken(engine, &[StreetNetworkMode::Car]);
    let a = kraken.make_path_key(
        StreetNetworkMode::Car,
        "a",
        "b",
        StreetNetworkPathType::BeginningFallback,
        PeriodExtremity::departure(t(10, 0)),
    );
    let b = kraken.make_path_key(
        StreetNetworkMode::Car,
        "a",
        "b",
        StreetNetworkPathType::BeginningFallback,
        PeriodExtremity::departure(t(11, 0)),
    );
    assert_eq!(a, b);
    assert_eq!(a.period_extremity, None);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The pre-filter never skips a path shorter than both bounds
        #[test]
        fn short_paths_are_never_skipped(
            lon in -1.0f64..1.0,
            lat in -1.0f64..1.0,
            d_lon in -0.01f64..0.01,
            d_lat in -0.01f64..0.01,
        ) {
            let origin = place("o", lon, lat);
            let destination = place("d", lon + d_lon, lat + d_lat);
            let params = RoutingParams::default();
            prop_assert!(!exceeds_direct_path_bounds(
                StreetNetworkMode::Car,
                &origin,
                &destination,
                &params,
            ));
        }
    }
}
