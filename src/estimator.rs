use crate::circuit_breaker::{create_gateway_circuit_breaker, GatewayCircuitBreaker};
use crate::errors::AppError;
use crate::models::{ScrapCategory, WeightEstimate};
use crate::validation::{MAX_WEIGHT_KG, MIN_WEIGHT_KG};
use failsafe::futures::CircuitBreaker;
use serde_json::{json, Value};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a scrap weight estimation expert. Analyze the image of \
scrap material and estimate the weight in kilograms. Also identify the scrap category (paper, \
plastic, metal, or ewaste). Respond ONLY with a JSON object like: {\"weight\": 5.2, \
\"category\": \"metal\", \"confidence\": 85}. The weight should be realistic (1-50 kg range). \
The confidence is 0-100 indicating how sure you are.";

const TOOL_NAME: &str = "estimate_scrap";

/// Client for the chat-completions gateway that estimates weight and
/// category from a photo of scrap.
pub struct WeightEstimator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    breaker: GatewayCircuitBreaker,
}

impl WeightEstimator {
    pub fn new(endpoint: String, api_key: String, model: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create AI gateway client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
            breaker: create_gateway_circuit_breaker(),
        })
    }

    /// Asks the gateway for an estimate of the pictured scrap.
    ///
    /// Rate-limit and credit errors are passed through and do not count
    /// against the circuit breaker.
    pub async fn estimate(&self, image: &str) -> Result<WeightEstimate, AppError> {
        match self
            .breaker
            .call_with(counts_as_failure, self.request_estimate(image))
            .await
        {
            Ok(estimate) => Ok(estimate),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(AppError::ExternalApiError(
                "AI gateway circuit is open".to_string(),
            )),
        }
    }

    async fn request_estimate(&self, image: &str) -> Result<WeightEstimate, AppError> {
        tracing::info!("Requesting weight estimate from AI gateway ({})", self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(image))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("AI gateway request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AppError::RateLimited(
                "AI rate limit exceeded. Please try again shortly.".to_string(),
            ));
        }
        if status.as_u16() == 402 {
            return Err(AppError::PaymentRequired(
                "AI credits exhausted. Please add credits.".to_string(),
            ));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "AI gateway returned {}: {}",
                status, error_text
            )));
        }

        let data: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse AI gateway response: {}", e))
        })?;

        let estimate = extract_estimate(&data);
        tracing::info!(
            "AI estimate: {:.1} kg of {} ({}% confidence)",
            estimate.weight,
            estimate.category,
            estimate.confidence
        );
        Ok(estimate)
    }

    fn request_body(&self, image: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "Estimate the weight and category of this scrap material." },
                        { "type": "image_url", "image_url": { "url": image } }
                    ]
                }
            ],
            "tools": [{
                "type": "function",
                "function": {
                    "name": TOOL_NAME,
                    "description": "Return estimated weight, category, and confidence for scrap material in an image.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "weight": { "type": "number", "description": "Estimated weight in kg (1-50)" },
                            "category": {
                                "type": "string",
                                "enum": ScrapCategory::ALL.map(|c| c.as_str()),
                                "description": "Scrap category"
                            },
                            "confidence": { "type": "number", "description": "Confidence score 0-100" }
                        },
                        "required": ["weight", "category", "confidence"],
                        "additionalProperties": false
                    }
                }
            }],
            "tool_choice": { "type": "function", "function": { "name": TOOL_NAME } }
        })
    }
}

fn counts_as_failure(err: &AppError) -> bool {
    !matches!(err, AppError::RateLimited(_) | AppError::PaymentRequired(_))
}

/// Reads the forced tool call out of a chat-completions response.
///
/// Missing or unparsable arguments fall back to [`WeightEstimate::default`].
pub fn extract_estimate(response: &Value) -> WeightEstimate {
    let arguments = response
        .pointer("/choices/0/message/tool_calls/0/function/arguments")
        .and_then(Value::as_str);

    let Some(arguments) = arguments else {
        tracing::warn!("AI gateway response carried no tool call, using defaults");
        return WeightEstimate::default();
    };

    match serde_json::from_str::<Value>(arguments) {
        Ok(parsed) => normalize_estimate(&parsed),
        Err(e) => {
            tracing::error!("Failed to parse AI tool call arguments: {}", e);
            WeightEstimate::default()
        }
    }
}

/// Coerces model output into range. Zero or non-numeric values count as missing.
pub fn normalize_estimate(parsed: &Value) -> WeightEstimate {
    let defaults = WeightEstimate::default();

    let weight = lenient_number(parsed.get("weight"))
        .unwrap_or(defaults.weight)
        .clamp(MIN_WEIGHT_KG, MAX_WEIGHT_KG);
    let category = parsed
        .get("category")
        .and_then(Value::as_str)
        .and_then(|c| c.parse::<ScrapCategory>().ok())
        .unwrap_or(defaults.category);
    let confidence = lenient_number(parsed.get("confidence"))
        .unwrap_or(defaults.confidence)
        .clamp(0.0, 100.0);

    WeightEstimate {
        weight,
        category,
        confidence,
    }
}

fn lenient_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n != 0.0).then_some(n)
}
