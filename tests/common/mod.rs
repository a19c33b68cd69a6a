#![allow(dead_code)]

use cdn_asset_scanner::rate_limit::Clock;
use cdn_asset_scanner::ScanConfig;
use chrono::{DateTime, TimeDelta, Utc};
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ORG: &str = "companieshouse";

/// Clock that advances instead of sleeping and remembers every sleep.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(ManualClock {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.sleeps.lock().unwrap().push(duration);
        let mut now = self.now.lock().unwrap();
        *now = *now + TimeDelta::from_std(duration).unwrap();
        Box::pin(async {})
    }
}

pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn config(server: &MockServer) -> ScanConfig {
    let mut config = ScanConfig::new(&server.uri(), "test-token").unwrap();
    config.org = ORG.to_string();
    config
}

pub fn rate_limit_body(remaining: u32, reset: i64) -> Value {
    let used = 5000 - remaining;
    json!({
        "resources": {
            "core": {"limit": 5000, "remaining": remaining, "reset": reset, "used": used},
            "search": {"limit": 30, "remaining": 30, "reset": reset, "used": 0}
        },
        "rate": {"limit": 5000, "remaining": remaining, "reset": reset, "used": used}
    })
}

/// Quota endpoint that always reports plenty of capacity.
pub async fn mount_quota_available(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rate_limit_body(4999, 0)))
        .mount(server)
        .await;
}

pub fn search_item(repo: &str, file_path: &str) -> Value {
    json!({
        "name": file_path.rsplit('/').next().unwrap_or(file_path),
        "path": file_path,
        "sha": "0000000000000000000000000000000000000000",
        "html_url": format!("https://github.com/{}/{}/blob/main/{}", ORG, repo, file_path),
        "repository": {
            "name": repo,
            "full_name": format!("{}/{}", ORG, repo),
            "owner": {"login": ORG}
        },
        "text_matches": []
    })
}

pub fn search_body(total_count: u64, items: Vec<Value>) -> Value {
    json!({
        "total_count": total_count,
        "incomplete_results": false,
        "items": items
    })
}

pub fn query(term: &str) -> String {
    format!("{} org:{}", term, ORG)
}
