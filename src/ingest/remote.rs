//! USDA FoodData Central lookup
//!
//! Fetches amount data for the USDA food list from a configured search
//! endpoint. Unlike sheet validation, which fails fast, this path
//! inspects the whole batch of responses, logging every bad item, and
//! raises a single summary failure afterwards.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::models::{FoodRecord, FoodSource};
use crate::vector::{encode_cells, round_value, NutrientCell};

use super::context::UsdaTables;
use super::error::{IngestError, IngestResult, ValidationError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<FoundFood>,
    food_search_criteria: Option<SearchCriteria>,
}

#[derive(Debug, Deserialize)]
struct SearchCriteria {
    query: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoundFood {
    fdc_id: i64,
    description: String,
    #[serde(default)]
    food_nutrients: Vec<FoundNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoundNutrient {
    nutrient_id: i64,
    value: f64,
}

/// Fetch and build one USDA food record per USDAFoods entry.
///
/// Amounts scale by the nutrient's unit multiplier and the food's
/// grams per serving (values are reported per 100 g).
pub fn fetch_usda_foods(
    url: &str,
    usda: &UsdaTables,
    canonical_ids: &[u32],
) -> IngestResult<Vec<FoodRecord>> {
    let client = reqwest::blocking::Client::new();

    let mut food_ids: Vec<i64> = usda.foods.keys().copied().collect();
    food_ids.sort_unstable();

    debug!("requesting {} foods from `{}`...", food_ids.len(), url);

    let mut bad_response = false;
    let mut staged = Vec::with_capacity(food_ids.len());

    for food_id in food_ids {
        let qty = usda.foods[&food_id];

        let response: SearchResponse = client
            .post(url)
            .json(&serde_json::json!({ "query": food_id }))
            .send()
            .map_err(|e| IngestError::load(url, e.to_string()))?
            .json()
            .map_err(|e| IngestError::load(url, e.to_string()))?;

        if response.foods.len() != 1 {
            bad_response = true;
            let query = response
                .food_search_criteria
                .map(|c| c.query)
                .unwrap_or_else(|| food_id.to_string());
            error!(
                "request for food id {} returned {} results",
                query,
                response.foods.len()
            );
            continue;
        }

        let found = &response.foods[0];
        let mut cells: HashMap<u32, NutrientCell> = HashMap::new();
        for nutrient in &found.food_nutrients {
            let mapping = match usda.nutrients.get(&nutrient.nutrient_id) {
                Some(mapping) => mapping,
                None => continue,
            };
            // Reported per 100 g; scale to the serving quantity
            let value = round_value(mapping.multiplier * nutrient.value * qty * 0.01);
            if value != 0.0 {
                cells.insert(mapping.name_id, NutrientCell::Numeric(value));
            }
        }

        if cells.is_empty() {
            bad_response = true;
            error!(
                "request for food id {} returned no nutrients of interest",
                found.fdc_id
            );
        }

        staged.push(FoodRecord::new(
            found.fdc_id.to_string(),
            found.description.clone(),
            FoodSource::Usda,
            Some(qty),
            encode_cells(&cells, canonical_ids),
        ));
    }

    if bad_response {
        return Err(ValidationError::new("USDA lookup returned bad response(s)").into());
    }

    if staged.len() != usda.foods.len() {
        return Err(ValidationError::new("no response for one or more USDA foods").into());
    }

    info!("built {} USDA food vectors", staged.len());
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::context::UsdaNutrient;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve one canned JSON body per incoming request, in order
    fn serve_responses(bodies: Vec<String>) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            for body in bodies {
                let (mut stream, _) = listener.accept().unwrap();
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        (url, handle)
    }

    fn tables() -> UsdaTables {
        let mut usda = UsdaTables::default();
        usda.foods.insert(100, 50.0);
        usda.nutrients.insert(
            1003,
            UsdaNutrient {
                name_id: 0,
                multiplier: 2.0,
            },
        );
        usda
    }

    #[test]
    fn test_fetch_builds_scaled_vectors() {
        let body = serde_json::json!({
            "foods": [{
                "fdcId": 100,
                "description": "Cheddar cheese",
                "foodNutrients": [
                    {"nutrientId": 1003, "value": 25.0},
                    {"nutrientId": 9999, "value": 1.0}
                ]
            }]
        })
        .to_string();
        let (url, handle) = serve_responses(vec![body]);

        let foods = fetch_usda_foods(&url, &tables(), &[0, 1]).unwrap();
        handle.join().unwrap();

        assert_eq!(foods.len(), 1);
        assert_eq!(foods[0].food_id, "100");
        assert_eq!(foods[0].description, "Cheddar cheese");
        assert_eq!(foods[0].source, FoodSource::Usda);
        assert_eq!(foods[0].qty_per_serving, Some(50.0));
        // 2.0 * 25.0 * 50.0 * 0.01 = 25.0; the unmapped nutrient is skipped
        assert_eq!(foods[0].nutrients.data.as_str(), "25.0,");
    }

    #[test]
    fn test_bad_responses_accumulate_then_fail() {
        let mut usda = tables();
        usda.foods.insert(200, 10.0);

        // First response matches nothing, second is fine; the failure
        // must still surface only after both were inspected
        let empty = serde_json::json!({
            "foods": [],
            "foodSearchCriteria": {"query": "100"}
        })
        .to_string();
        let good = serde_json::json!({
            "foods": [{
                "fdcId": 200,
                "description": "Whole milk",
                "foodNutrients": [{"nutrientId": 1003, "value": 10.0}]
            }]
        })
        .to_string();
        let (url, handle) = serve_responses(vec![empty, good]);

        let err = fetch_usda_foods(&url, &usda, &[0, 1]).unwrap_err();
        handle.join().unwrap();

        match err {
            IngestError::Validation(v) => {
                assert_eq!(v.message, "USDA lookup returned bad response(s)");
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_no_nutrients_of_interest_fails() {
        let body = serde_json::json!({
            "foods": [{
                "fdcId": 100,
                "description": "Water",
                "foodNutrients": [{"nutrientId": 9999, "value": 5.0}]
            }]
        })
        .to_string();
        let (url, handle) = serve_responses(vec![body]);

        let err = fetch_usda_foods(&url, &tables(), &[0, 1]).unwrap_err();
        handle.join().unwrap();

        match err {
            IngestError::Validation(v) => {
                assert_eq!(v.message, "USDA lookup returned bad response(s)");
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_transport_failure_is_load_error() {
        // Nothing is listening here
        let err = fetch_usda_foods("http://127.0.0.1:1/search", &tables(), &[0]).unwrap_err();
        assert!(matches!(err, IngestError::Load { .. }));
    }
}
