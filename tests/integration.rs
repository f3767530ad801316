use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use courier_compliance::api::rest::router;
use courier_compliance::engine::crosswalk::{CrossingPoint, StaticCrosswalkSource};
use courier_compliance::engine::monitor::run_compliance_monitor;
use courier_compliance::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn shared_state(crossings: Vec<CrossingPoint>) -> Arc<AppState> {
    Arc::new(AppState::new(
        1024,
        Arc::new(StaticCrosswalkSource::new(crossings)),
    ))
}

fn setup() -> axum::Router {
    router(shared_state(Vec::new()))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn empty_post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn address(barangay: &str) -> Value {
    json!({
        "region": { "code": "130000000", "name": "NCR" },
        "province": { "code": "137400000", "name": "Metro Manila" },
        "municipality": { "code": "137404000", "name": "Quezon City" },
        "barangay": { "code": "137404020", "name": barangay }
    })
}

async fn create_driver(app: &axum::Router, name: &str, lat: f64, lng: f64) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/drivers",
            json!({
                "name": name,
                "branch": "north",
                "location": { "lat": lat, "lng": lng },
                "preferred_routes": [{
                    "region": "NCR",
                    "province": "Metro Manila",
                    "municipality": "Quezon City",
                    "barangay": "Bagong Pag-asa"
                }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

async fn create_parcel(app: &axum::Router, barangay: &str, lat: f64, lng: f64) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/parcels",
            json!({
                "recipient": "Juan dela Cruz",
                "address": address(barangay),
                "destination": { "lat": lat, "lng": lng }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["drivers"], 0);
    assert_eq!(body["parcels"], 0);
    assert_eq!(body["crosswalk_pass"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("overspeeding_drivers"));
}

#[tokio::test]
async fn create_driver_empty_name_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/drivers",
            json!({ "name": "  ", "branch": "north" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_drivers_filters_by_status() {
    let app = setup();
    let id = create_driver(&app, "Rina", 14.65, 121.03).await;
    create_driver(&app, "Marco", 14.66, 121.04).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/drivers/{id}/status"),
            json!({ "status": "offline" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_request("/drivers?status=offline"))
        .await
        .unwrap();
    let offline = body_json(res).await;
    assert_eq!(offline.as_array().unwrap().len(), 1);
    assert_eq!(offline[0]["name"], "Rina");

    let res = app.oneshot(get_request("/drivers?branch=south")).await.unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn telemetry_updates_location_and_speed() {
    let app = setup();
    let id = create_driver(&app, "Rina", 14.6000, 121.0000).await;

    let res = app
        .oneshot(json_request(
            "PATCH",
            &format!("/drivers/{id}/telemetry"),
            json!({ "location": { "lat": 14.6090, "lng": 121.0000 }, "speed": 41.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["location"]["lat"], 14.609);
    assert_eq!(body["speed"], 41.0);
    assert_eq!(body["top_speed"], 41.0);
    assert!(body["distance_km"].as_f64().unwrap() > 0.9);
}

#[tokio::test]
async fn zones_round_trip_and_missing_branch_is_404() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(get_request("/branches/north/zones"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/branches/north/zones",
            json!({
                "zones": [
                    { "name": "School", "location": { "lat": 14.65, "lng": 121.03 },
                      "radius": 200, "speed_limit": 20, "category": "Slowdown" },
                    { "name": "Broken", "location": { "lat": 14.65, "lng": 121.03 },
                      "radius": "wide", "speed_limit": 20, "category": "Slowdown" }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.oneshot(get_request("/branches/north/zones")).await.unwrap();
    let zones = body_json(res).await;
    assert_eq!(zones.as_array().unwrap().len(), 2);
    assert!(zones[1]["radius"].is_null());
}

#[tokio::test]
async fn get_nonexistent_parcel_returns_404() {
    let app = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/parcels/{fake_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assignment_flow_and_eta() {
    let app = setup();
    let driver_id = create_driver(&app, "Rina", 14.6000, 121.0000).await;
    let matching = create_parcel(&app, "bagong pag-asa", 14.6090, 121.0000).await;
    create_parcel(&app, "Krus na Ligas", 14.6100, 121.0100).await;

    let res = app
        .clone()
        .oneshot(get_request(&format!("/drivers/{driver_id}/eta")))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["eta"], "N/A");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/drivers/{driver_id}/parcels")))
        .await
        .unwrap();
    let workload = body_json(res).await;
    assert_eq!(workload["assignable"].as_array().unwrap().len(), 1);
    assert_eq!(workload["assignable"][0]["id"], matching);
    assert_eq!(workload["assigned"].as_array().unwrap().len(), 0);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/parcels/{matching}/assign"),
            json!({ "driver_id": driver_id }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let parcel = body_json(res).await;
    assert_eq!(parcel["status"], "Out for Delivery");
    assert_eq!(parcel["driver_uid"], driver_id);
    assert_eq!(parcel["driver_name"], "Rina");

    let res = app
        .clone()
        .oneshot(get_request(&format!("/drivers/{driver_id}/parcels")))
        .await
        .unwrap();
    let workload = body_json(res).await;
    assert_eq!(workload["assignable"].as_array().unwrap().len(), 0);
    assert_eq!(workload["assigned"][0]["id"], matching);

    // ~1 km at the 45 km/h default plus one 3 minute stop.
    let res = app
        .clone()
        .oneshot(get_request(&format!("/drivers/{driver_id}/eta")))
        .await
        .unwrap();
    let eta = body_json(res).await;
    assert_eq!(eta["eta"], "4m - 5m");
    assert_eq!(eta["estimate"]["stops"], 1);

    let res = app
        .clone()
        .oneshot(empty_post(&format!("/parcels/{matching}/unassign")))
        .await
        .unwrap();
    let parcel = body_json(res).await;
    assert_eq!(parcel["status"], "Pending");
    assert!(parcel["driver_uid"].is_null());

    let res = app.oneshot(get_request("/parcels?status=Pending")).await.unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn eta_rejects_half_an_origin() {
    let app = setup();
    let driver_id = create_driver(&app, "Rina", 14.6, 121.0).await;

    let res = app
        .oneshot(get_request(&format!("/drivers/{driver_id}/eta?lat=14.6")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delivered_parcels_show_up_in_analytics() {
    let app = setup();
    let driver_id = create_driver(&app, "Rina", 14.6, 121.0).await;
    let parcel_id = create_parcel(&app, "Bagong Pag-asa", 14.61, 121.0).await;

    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/parcels/{parcel_id}/assign"),
            json!({ "driver_id": driver_id }),
        ))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/parcels/{parcel_id}/status"),
            json!({ "status": "Delivered" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.oneshot(get_request("/analytics")).await.unwrap();
    let summary = body_json(res).await;
    assert_eq!(summary["parcels_by_status"]["Delivered"], 1);
    assert_eq!(summary["drivers"][0]["delivered"], 1);
    assert_eq!(summary["total_violations"], 0);
}

#[tokio::test]
async fn overspeeding_driver_can_be_warned() {
    let state = shared_state(Vec::new());
    tokio::spawn(run_compliance_monitor(state.clone()));
    let app = router(state.clone());

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/branches/north/zones",
            json!({
                "zones": [{ "name": "Market", "location": { "lat": 14.6500, "lng": 121.0300 },
                            "radius": 300, "speed_limit": 60, "category": "Slowdown" }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let driver_id = create_driver(&app, "Rina", 14.6510, 121.0300).await;
    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/drivers/{driver_id}/telemetry"),
            json!({ "speed_kmh": 65.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let res = app.clone().oneshot(get_request("/compliance")).await.unwrap();
    let compliance = body_json(res).await;
    assert_eq!(compliance[0]["state"], "Overspeeding");
    assert_eq!(compliance[0]["applicable_limit"], 60.0);

    let res = app
        .clone()
        .oneshot(empty_post(&format!("/drivers/{driver_id}/warnings")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let violation = body_json(res).await;
    assert_eq!(violation["speed_at_issue"], 65.0);

    let res = app
        .oneshot(get_request(&format!("/drivers/{driver_id}")))
        .await
        .unwrap();
    let driver = body_json(res).await;
    assert_eq!(driver["violations"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn driver_on_a_crossing_is_held_to_crosswalk_limit() {
    let state = shared_state(vec![CrossingPoint {
        lat: 14.65005,
        lon: 121.0300,
    }]);
    tokio::spawn(run_compliance_monitor(state.clone()));
    let app = router(state.clone());

    let driver_id = create_driver(&app, "Marco", 14.6500, 121.0300).await;
    app.clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/drivers/{driver_id}/telemetry"),
            json!({ "speed_kmh": 18.0 }),
        ))
        .await
        .unwrap();

    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let res = app.oneshot(get_request("/compliance")).await.unwrap();
    let compliance = body_json(res).await;
    assert_eq!(compliance[0]["in_crosswalk"], true);
    assert_eq!(compliance[0]["applicable_limit"], 10.0);
    assert_eq!(compliance[0]["state"], "Overspeeding");
}
