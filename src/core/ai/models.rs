use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    #[serde(alias = "model")]
    Assistant,
}

/// One message of a conversation, as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    #[cfg(test)]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Sent as the provider's system instruction when present.
    pub system_prompt: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: None,
            max_tokens: None,
            system_prompt: None,
        }
    }
}

// =============================================================================
// FUNCTION DECLARATIONS
// =============================================================================

/// A callable function advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: FunctionParameters,
}

/// JSON-schema-like description of a function's arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParameters {
    /// Always "object" for function parameters.
    pub param_type: String,
    pub properties: BTreeMap<String, PropertyDef>,
    pub required: Vec<String>,
}

impl FunctionParameters {
    pub fn object() -> Self {
        Self {
            param_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn property(mut self, name: &str, def: PropertyDef) -> Self {
        self.properties.insert(name.to_string(), def);
        self
    }

    pub fn required_property(mut self, name: &str, def: PropertyDef) -> Self {
        self.required.push(name.to_string());
        self.property(name, def)
    }
}

/// Schema for a single parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// "string", "number", "integer", "boolean", "array" or "object".
    pub prop_type: String,
    pub description: Option<String>,
    pub enum_values: Option<Vec<String>>,
    /// Element schema for arrays.
    pub items: Option<Box<PropertyDef>>,
}

impl PropertyDef {
    fn typed(prop_type: &str, description: &str) -> Self {
        Self {
            prop_type: prop_type.to_string(),
            description: Some(description.to_string()),
            enum_values: None,
            items: None,
        }
    }

    pub fn string(description: &str) -> Self {
        Self::typed("string", description)
    }

    pub fn integer(description: &str) -> Self {
        Self::typed("integer", description)
    }

    pub fn boolean(description: &str) -> Self {
        Self::typed("boolean", description)
    }

    pub fn string_array(description: &str) -> Self {
        Self {
            items: Some(Box::new(Self {
                prop_type: "string".to_string(),
                description: None,
                enum_values: None,
                items: None,
            })),
            ..Self::typed("array", description)
        }
    }
}

// =============================================================================
// PROVIDER RESPONSES
// =============================================================================

/// A function call requested by the model. `args` is whatever the provider
/// sent: usually an object, sometimes a JSON-encoded string.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: serde_json::Value,
}

/// What a provider returns for one generation request.
#[derive(Debug, Clone, Default)]
pub struct AiProviderResponse {
    /// Concatenated text of the first candidate.
    pub content: String,

    /// The first function call of the first candidate, if any.
    pub function_call: Option<FunctionCall>,
}
