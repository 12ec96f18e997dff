// =============================================================================
// GEMINI CLIENT - Google AI Studio API Integration
// =============================================================================
//
// Implementation of the `AiProvider` trait against Google's Gemini
// generateContent endpoint (https://ai.google.dev/api/generate-content).
//
// **Wire format notes:**
// - Authentication: API key is passed as a query parameter (`?key=API_KEY`).
// - Request: `contents[]` with nested `parts`; the system prompt is the
//   separate top-level `systemInstruction` field.
// - Roles: Gemini says "model" where we say "assistant".
// - Function calling: declarations go in `tools[].functionDeclarations`; a
//   call comes back as a `functionCall` part of the candidate.
//
// **Environment Variables:**
// - `GEMINI_API_KEY` - Your API key from https://aistudio.google.com/apikey
// - `GEMINI_MODEL` - Model name (default `gemini-2.0-flash`)

use crate::core::ai::{
    models::{
        AiConfig, AiProviderResponse, ChatRole, ChatTurn, FunctionCall, FunctionDef, PropertyDef,
    },
    AiProvider,
};
use crate::core::errors::{ErrorKind, UpstreamError};
use crate::infra::upstream;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SERVICE: &str = "Gemini";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================

/// A single part of content. Responses mix text parts and function-call
/// parts, so every field is optional.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct GeminiFunctionCall {
    name: String,

    /// Usually an object; kept raw and normalized by the dispatch loop.
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Content {
    /// "user" or "model". Absent on system instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

/// See: https://ai.google.dev/api/generate-content#generationconfig
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

// =============================================================================
// TOOL DEFINITIONS - REQUEST SIDE
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,

    /// Omitted for functions without arguments; Gemini rejects an empty
    /// `properties` object.
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<GeminiFunctionParameters>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFunctionParameters {
    #[serde(rename = "type")]
    param_type: String,

    properties: BTreeMap<String, GeminiPropertySchema>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    required: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPropertySchema {
    #[serde(rename = "type")]
    prop_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    enum_values: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<Box<GeminiPropertySchema>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
}

// =============================================================================
// RESPONSE STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,

    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,

    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

// =============================================================================
// GEMINI CLIENT IMPLEMENTATION
// =============================================================================

pub struct GeminiClient {
    client: Client,

    /// Missing keys are reported per request, not at startup.
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn text_part(text: String) -> Part {
        Part {
            text: Some(text),
            function_call: None,
        }
    }

    /// Converts a chat turn to Gemini's `Content`, renaming "assistant" to
    /// "model".
    fn convert_turn(turn: &ChatTurn) -> Content {
        let role = match turn.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "model",
        };

        Content {
            role: Some(role.to_string()),
            parts: vec![Self::text_part(turn.content.clone())],
        }
    }

    fn convert_property(prop: &PropertyDef) -> GeminiPropertySchema {
        GeminiPropertySchema {
            prop_type: prop.prop_type.clone(),
            description: prop.description.clone(),
            enum_values: prop.enum_values.clone(),
            items: prop
                .items
                .as_ref()
                .map(|item| Box::new(Self::convert_property(item))),
        }
    }

    /// All declarations go into a single tool object.
    fn convert_functions(functions: &[FunctionDef]) -> Vec<GeminiTool> {
        if functions.is_empty() {
            return Vec::new();
        }

        let function_declarations = functions
            .iter()
            .map(|func| GeminiFunctionDeclaration {
                name: func.name.clone(),
                description: func.description.clone(),
                parameters: (!func.parameters.properties.is_empty()).then(|| {
                    GeminiFunctionParameters {
                        param_type: func.parameters.param_type.clone(),
                        properties: func
                            .parameters
                            .properties
                            .iter()
                            .map(|(name, prop)| (name.clone(), Self::convert_property(prop)))
                            .collect(),
                        required: func.parameters.required.clone(),
                    }
                }),
            })
            .collect();

        vec![GeminiTool {
            function_declarations,
        }]
    }

    fn build_request(
        turns: &[ChatTurn],
        functions: &[FunctionDef],
        config: &AiConfig,
    ) -> GenerateContentRequest {
        let system_instruction = config
            .system_prompt
            .as_ref()
            .filter(|p| !p.trim().is_empty())
            .map(|prompt| Content {
                role: None,
                parts: vec![Self::text_part(prompt.clone())],
            });

        let generation_config = (config.temperature.is_some() || config.max_tokens.is_some())
            .then(|| GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_tokens,
            });

        GenerateContentRequest {
            contents: turns.iter().map(Self::convert_turn).collect(),
            system_instruction,
            generation_config,
            tools: Self::convert_functions(functions),
        }
    }

    /// Reads the first candidate: its text parts are concatenated and its
    /// first function-call part (if any) is returned.
    fn parse_response(body: GenerateContentResponse) -> Result<AiProviderResponse, UpstreamError> {
        let Some(candidate) = body.candidates.into_iter().next() else {
            let reason = body
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(UpstreamError::new(
                SERVICE,
                ErrorKind::InvalidResponse,
                format!("Empty response from model ({})", reason),
            ));
        };

        let parts = candidate.content.parts;
        let content: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();

        let mut calls = parts.into_iter().filter_map(|p| p.function_call);
        let function_call = calls.next().map(|fc| FunctionCall {
            name: fc.name,
            args: fc.args,
        });
        let ignored = calls.count();
        if ignored > 0 {
            tracing::debug!(ignored, "Ignoring additional function calls in Gemini response");
        }

        tracing::debug!(
            content_chars = content.len(),
            function_call = function_call.as_ref().map(|f| f.name.as_str()),
            finish_reason = candidate.finish_reason.as_deref(),
            "Gemini response received"
        );

        Ok(AiProviderResponse {
            content,
            function_call,
        })
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn chat_complete(
        &self,
        turns: &[ChatTurn],
        functions: &[FunctionDef],
        config: &AiConfig,
    ) -> Result<AiProviderResponse, UpstreamError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(UpstreamError::new(
                SERVICE,
                ErrorKind::Authentication,
                "GEMINI_API_KEY is not set",
            ));
        };

        let url = format!("{}/models/{}:generateContent", BASE_URL, config.model);
        let request = Self::build_request(turns, functions, config);

        // Never log the URL with the key attached.
        tracing::debug!(
            model = %config.model,
            turns = turns.len(),
            functions = functions.len(),
            "Sending Gemini request"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| upstream::from_reqwest(SERVICE, e.without_url()))?;

        let body: GenerateContentResponse = upstream::read_json(SERVICE, response).await?;
        Self::parse_response(body)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::models::FunctionParameters;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<AiProviderResponse, UpstreamError> {
        GeminiClient::parse_response(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_convert_turn_assistant_to_model() {
        let content = GeminiClient::convert_turn(&ChatTurn {
            role: ChatRole::Assistant,
            content: "Hi there!".to_string(),
        });

        assert_eq!(content.role.as_deref(), Some("model"));
        assert_eq!(content.parts[0].text.as_deref(), Some("Hi there!"));
    }

    #[test]
    fn test_request_serialization() {
        let functions = vec![
            FunctionDef {
                name: "create_calendar_event".to_string(),
                description: "Creates an event".to_string(),
                parameters: FunctionParameters::object()
                    .required_property("summary", PropertyDef::string("Title"))
                    .property("attendees", PropertyDef::string_array("Emails")),
            },
            FunctionDef {
                name: "say_hello_world".to_string(),
                description: "Hello".to_string(),
                parameters: FunctionParameters::object(),
            },
        ];
        let config = AiConfig {
            system_prompt: Some("Be brief.".to_string()),
            ..Default::default()
        };

        let request =
            GeminiClient::build_request(&[ChatTurn::user("hello")], &functions, &config);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(value["systemInstruction"].get("role").is_none());
        assert!(value.get("generationConfig").is_none());

        let declarations = &value["tools"][0]["functionDeclarations"];
        assert_eq!(declarations[0]["parameters"]["required"], json!(["summary"]));
        assert_eq!(
            declarations[0]["parameters"]["properties"]["attendees"]["items"]["type"],
            "string"
        );
        assert!(declarations[1].get("parameters").is_none());
    }

    #[test]
    fn test_no_functions_means_no_tools_field() {
        let request =
            GeminiClient::build_request(&[ChatTurn::user("hi")], &[], &AiConfig::default());
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("tools").is_none());
    }

    #[test]
    fn test_parse_text_response() {
        let response = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        assert_eq!(response.content, "Hello there");
        assert!(response.function_call.is_none());
    }

    #[test]
    fn test_parse_first_function_call_only() {
        let response = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "On it."},
                    {"functionCall": {"name": "say_hello_world", "args": {}}},
                    {"functionCall": {"name": "read_calendar_events", "args": {"max_results": 3}}}
                ]}
            }]
        }))
        .unwrap();

        assert_eq!(response.content, "On it.");
        let call = response.function_call.unwrap();
        assert_eq!(call.name, "say_hello_world");
        assert_eq!(call.args, json!({}));
    }

    #[test]
    fn test_parse_function_call_without_text() {
        let response = parse(json!({
            "candidates": [{
                "content": {"parts": [{"functionCall": {"name": "say_hello_world"}}]}
            }]
        }))
        .unwrap();

        assert_eq!(response.content, "");
        assert_eq!(response.function_call.unwrap().args, serde_json::Value::Null);
    }

    #[test]
    fn test_blocked_prompt_is_invalid_response() {
        let err = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidResponse);
        assert!(err.message.contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let client = GeminiClient::new(Client::new(), Some("  ".to_string()));
        let err = client
            .chat_complete(&[ChatTurn::user("hi")], &[], &AiConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Authentication);
        assert!(!err.is_retryable());
    }
}
