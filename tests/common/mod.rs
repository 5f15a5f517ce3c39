//! Shared fixtures for the HTTP integration tests

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use matapi::config::ServiceConfig;
use matapi::http_server::HttpServer;
use matapi::routes::mount_all;
use matapi::store::MemoryStore;

pub const PRIVILEGED: &str = "staff";
pub const UNRESTRICTED: &str = "internal";

/// Five materials; `mp-3` carries a restricted license
pub fn materials() -> Value {
    json!([
        {
            "material_id": "mp-1",
            "formula_pretty": "Cr2O3",
            "formula_anonymous": "A2B3",
            "chemsys": "Cr-O",
            "elements": ["Cr", "O"],
            "nelements": 2,
            "composition_reduced": {"Cr": 2.0, "O": 3.0},
            "band_gap": 3.2,
            "density": 5.2,
            "deprecated": false,
            "builder_meta": {"license": "BY-C"}
        },
        {
            "material_id": "mp-2",
            "formula_pretty": "Fe2O3",
            "formula_anonymous": "A2B3",
            "chemsys": "Fe-O",
            "elements": ["Fe", "O"],
            "nelements": 2,
            "composition_reduced": {"Fe": 2.0, "O": 3.0},
            "band_gap": 2.1,
            "density": 5.3,
            "deprecated": false,
            "builder_meta": {"license": "BY-C"}
        },
        {
            "material_id": "mp-3",
            "formula_pretty": "SiO2",
            "formula_anonymous": "AB2",
            "chemsys": "O-Si",
            "elements": ["O", "Si"],
            "nelements": 2,
            "composition_reduced": {"Si": 1.0, "O": 2.0},
            "band_gap": 5.6,
            "density": 2.6,
            "deprecated": false,
            "builder_meta": {"license": "BY-NC"}
        },
        {
            "material_id": "mp-4",
            "formula_pretty": "LiFePO4",
            "formula_anonymous": "ABCD4",
            "chemsys": "Fe-Li-O-P",
            "elements": ["Fe", "Li", "O", "P"],
            "nelements": 4,
            "composition_reduced": {"Li": 1.0, "Fe": 1.0, "P": 1.0, "O": 4.0},
            "band_gap": 3.7,
            "density": 3.6,
            "deprecated": false,
            "builder_meta": {"license": "BY-C"}
        },
        {
            "material_id": "mp-5",
            "formula_pretty": "Si",
            "formula_anonymous": "A",
            "chemsys": "Si",
            "elements": ["Si"],
            "nelements": 1,
            "composition_reduced": {"Si": 1.0},
            "band_gap": 0.6,
            "density": 2.3,
            "deprecated": false,
            "builder_meta": {"license": "BY-C"}
        }
    ])
}

pub fn descriptions() -> Value {
    json!([
        {"material_id": "mp-1", "formula_pretty": "Cr2O3", "description": "Corundum-structured chromium oxide"},
        {"material_id": "mp-2", "formula_pretty": "Fe2O3", "description": "Hematite, an iron oxide"},
        {"material_id": "mp-4", "formula_pretty": "LiFePO4", "description": "Olivine cathode for Li-ion batteries"}
    ])
}

pub fn embeddings() -> Value {
    json!([
        {"material_id": "mp-1", "embedding": [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]},
        {"material_id": "mp-2", "embedding": [0.9, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]},
        {"material_id": "mp-4", "embedding": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]}
    ])
}

pub fn calculation_files() -> Value {
    json!([
        {"object_key": "raw/mp-1/vasprun.xml.gz", "material_id": "mp-1"},
        {"object_key": "raw/mp-2/relax #1.json", "material_id": "mp-2"}
    ])
}

/// Seeded data directory plus the config pointing at it
pub fn seeded_config() -> (TempDir, ServiceConfig) {
    let dir = TempDir::new().unwrap();
    let seeds = [
        ("materials", materials()),
        ("descriptions", descriptions()),
        ("embeddings", embeddings()),
        ("calculation_files", calculation_files()),
    ];
    for (name, docs) in seeds {
        std::fs::write(
            dir.path().join(format!("{}.json", name)),
            serde_json::to_vec(&docs).unwrap(),
        )
        .unwrap();
    }

    let mut config = ServiceConfig {
        data_dir: Some(dir.path().to_path_buf()),
        default_limit: 10,
        max_limit: 50,
        ..ServiceConfig::default()
    };
    config.access.privileged_groups = vec![PRIVILEGED.to_string()];
    config.access.unrestricted_groups = vec![UNRESTRICTED.to_string()];
    config.object_store.signing_secret = "test-secret".to_string();
    (dir, config)
}

/// Router over freshly seeded collections
pub fn app() -> (TempDir, Router) {
    let (dir, config) = seeded_config();
    let store = MemoryStore::new();
    let mounted = mount_all(&store, &config).unwrap();
    (dir, HttpServer::with_config(&config, &mounted).router())
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    send(router, Method::GET, uri, &[], None).await
}

/// `material_id`s of the returned documents, in order
pub fn ids(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["material_id"].as_str().unwrap().to_string())
        .collect()
}
