//! Simulated transport: a registered table of path-pattern handlers used for
//! deterministic runs and tests without a live network dependency.

use regex::Regex;
use serde_json::json;

/// A request as seen by a simulated handler: the url path plus parsed query
/// pairs. Handlers that model pagination read `page` from the query.
#[derive(Debug, Clone)]
pub struct SimRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl SimRequest {
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SimResponse {
    pub status: u16,
    pub body: String,
}

impl SimResponse {
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            body: value.to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

type Handler = Box<dyn Fn(&SimRequest) -> SimResponse + Send + Sync>;

/// Ordered route table. Patterns are anchored and matched against the full
/// request path; the first match wins, so specific routes (e.g.
/// `/v1/images/search`) must be registered before parameterized ones.
#[derive(Default)]
pub struct SimTable {
    routes: Vec<(Regex, Handler)>,
}

impl SimTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panics on an invalid pattern: the table is test/run configuration,
    /// not runtime input.
    pub fn route(
        mut self,
        pattern: &str,
        handler: impl Fn(&SimRequest) -> SimResponse + Send + Sync + 'static,
    ) -> Self {
        let anchored = format!("^(?:{pattern})$");
        let regex = Regex::new(&anchored)
            .unwrap_or_else(|e| panic!("invalid simulated route pattern `{pattern}`: {e}"));
        self.routes.push((regex, Box::new(handler)));
        self
    }

    /// Panics when no route matches: an unmatched path means the simulation
    /// is misconfigured, which must surface loudly rather than as a normal
    /// transport failure.
    pub(crate) fn dispatch(&self, request: &SimRequest) -> SimResponse {
        for (pattern, handler) in &self.routes {
            if pattern.is_match(&request.path) {
                return handler(request);
            }
        }
        panic!("no simulated handler matches path `{}`", request.path);
    }
}

/// Canned handlers mirroring the live API shape: one single-breed page, one
/// image object, and the image's raw content. Used for `sim://` hosts.
pub fn default_handlers() -> SimTable {
    SimTable::new()
        .route("/v1/breeds", |req| {
            if req.query_param("page") != Some("0") {
                return SimResponse::json(200, &json!([]));
            }
            SimResponse::json(200, &json!([sample_breed()]))
        })
        .route("/v1/images/search", |_| {
            SimResponse::json(200, &json!([sample_image()]))
        })
        .route("/v1/images/[A-Za-z0-9_-]+", |_| {
            SimResponse::json(200, &sample_image())
        })
        .route("/images/.+\\.jpg", |_| SimResponse {
            status: 200,
            body: "simulated image bytes".to_string(),
        })
}

fn sample_breed() -> serde_json::Value {
    json!({
        "weight": {"imperial": "7 - 10", "metric": "3 - 5"},
        "id": "aege",
        "name": "Aegean",
        "vetstreet_url": "http://www.vetstreet.com/cats/aegean-cat",
        "temperament": "Affectionate, Social, Intelligent, Playful, Active",
        "origin": "Greece",
        "country_code": "GR",
        "description": "Native to the Greek islands known as the Cyclades.",
        "life_span": "9 - 12",
        "indoor": 0,
        "alt_names": "",
        "adaptability": 5,
        "affection_level": 4,
        "child_friendly": 4,
        "dog_friendly": 4,
        "energy_level": 3,
        "grooming": 3,
        "health_issues": 1,
        "intelligence": 3,
        "shedding_level": 3,
        "social_needs": 4,
        "stranger_friendly": 4,
        "vocalisation": 3,
        "experimental": 0,
        "hairless": 0,
        "natural": 0,
        "rare": 0,
        "rex": 0,
        "suppressed_tail": 0,
        "short_legs": 0,
        "wikipedia_url": "https://en.wikipedia.org/wiki/Aegean_cat",
        "hypoallergenic": 0,
        "reference_image_id": "ozEvzdVM-"
    })
}

fn sample_image() -> serde_json::Value {
    json!({
        "id": "ozEvzdVM-",
        "url": "sim://cdn.thecatapi.com/images/ozEvzdVM-.jpg",
        "width": 1200,
        "height": 800
    })
}
