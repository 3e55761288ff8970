//! Tool catalog and tool-call resolution.
//!
//! Each tool maps to one gateway path. The `*_by_id` tools splice their id
//! parameter into the path; every other tool forwards its arguments as query
//! string pairs.

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::mcp::protocol::{params_object, ErrorCode, ErrorObject};
use crate::mcp::upstream::{GatewayClient, UpstreamError};

/// Type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Free text.
    String,
    /// Non-negative integer.
    Integer,
}

impl ParamKind {
    const fn schema_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }
}

/// Declarative description of one tool parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: &'static str,
    /// Parameter type.
    pub kind: ParamKind,
    /// Whether the caller must supply it.
    pub required: bool,
    /// What the parameter is for.
    pub description: &'static str,
}

/// Where a tool call is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `GET /{path}` with all arguments as query parameters.
    Collection(&'static str),
    /// `GET /{collection}/{id}` where `id` is taken from `id_param`.
    Item {
        /// Collection path segment.
        collection: &'static str,
        /// Name of the argument holding the id.
        id_param: &'static str,
    },
}

/// A tool advertised to clients.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    /// Tool (and method) name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Gateway route.
    pub route: Route,
    /// Accepted parameters.
    pub params: &'static [ParamSpec],
}

const PAGE: ParamSpec = ParamSpec {
    name: "page",
    kind: ParamKind::Integer,
    required: false,
    description: "Page number, starting at 1 (default: 1)",
};

const LIMIT: ParamSpec = ParamSpec {
    name: "limit",
    kind: ParamKind::Integer,
    required: false,
    description: "Items per page (default: 10)",
};

/// The static tool catalog.
pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "search_pokemon_cards",
        description: "Search Pokémon cards by name, set, type and rarity. \
                      Returns a page of cards plus pagination details.",
        route: Route::Collection("cards"),
        params: &[
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                required: false,
                description: "Card name, e.g. 'Charizard'",
            },
            ParamSpec {
                name: "set",
                kind: ParamKind::String,
                required: false,
                description: "Set name, e.g. 'Base'",
            },
            ParamSpec {
                name: "type",
                kind: ParamKind::String,
                required: false,
                description: "Energy type, e.g. 'Fire'",
            },
            ParamSpec {
                name: "rarity",
                kind: ParamKind::String,
                required: false,
                description: "Rarity, e.g. 'Rare Holo'",
            },
            PAGE,
            LIMIT,
        ],
    },
    ToolSpec {
        name: "get_pokemon_card_by_id",
        description: "Fetch a single Pokémon card by its id.",
        route: Route::Item {
            collection: "cards",
            id_param: "card_id",
        },
        params: &[ParamSpec {
            name: "card_id",
            kind: ParamKind::String,
            required: true,
            description: "Card id, e.g. 'base1-4'",
        }],
    },
    ToolSpec {
        name: "get_pokemon_card_price",
        description: "Look up TCGplayer market prices for the first card matching a name.",
        route: Route::Collection("card_price"),
        params: &[ParamSpec {
            name: "card_name",
            kind: ParamKind::String,
            required: true,
            description: "Card name, e.g. 'Charizard'",
        }],
    },
    ToolSpec {
        name: "list_pokemon_sets",
        description: "List Pokémon TCG sets, optionally filtered by name.",
        route: Route::Collection("sets"),
        params: &[
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                required: false,
                description: "Set name filter, e.g. 'Jungle'",
            },
            PAGE,
            LIMIT,
        ],
    },
    ToolSpec {
        name: "get_pokemon_set_by_id",
        description: "Fetch a single Pokémon TCG set by its id.",
        route: Route::Item {
            collection: "sets",
            id_param: "set_id",
        },
        params: &[ParamSpec {
            name: "set_id",
            kind: ParamKind::String,
            required: true,
            description: "Set id, e.g. 'base1'",
        }],
    },
    ToolSpec {
        name: "list_pokemon_types",
        description: "List all Pokémon energy types.",
        route: Route::Collection("types"),
        params: &[],
    },
    ToolSpec {
        name: "list_pokemon_supertypes",
        description: "List all card supertypes (Pokémon, Trainer, Energy).",
        route: Route::Collection("supertypes"),
        params: &[],
    },
    ToolSpec {
        name: "list_pokemon_subtypes",
        description: "List all card subtypes.",
        route: Route::Collection("subtypes"),
        params: &[],
    },
    ToolSpec {
        name: "list_pokemon_rarities",
        description: "List all card rarities.",
        route: Route::Collection("rarities"),
        params: &[],
    },
];

/// Looks up a tool by name.
#[must_use]
pub fn find_tool(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|tool| tool.name == name)
}

/// A tool definition as sent in `tools/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// A tool call resolved to a gateway request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCall {
    /// Path segments below the gateway base URL.
    pub segments: Vec<String>,
    /// Query string pairs.
    pub query: Vec<(String, String)>,
}

/// Failure of a tool call.
#[derive(Error, Debug)]
pub enum ToolError {
    /// No tool has this name.
    #[error("Tool not recognized: {0}")]
    NotFound(String),

    /// The arguments do not fit the tool's parameters.
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments {
        /// Tool name.
        tool: String,
        /// What was wrong.
        message: String,
    },

    /// The gateway call failed.
    #[error("{source}")]
    Upstream {
        /// Tool name.
        tool: String,
        /// The gateway failure.
        #[source]
        source: UpstreamError,
    },
}

impl ToolError {
    /// Converts the failure into a protocol error object.
    #[must_use]
    pub fn to_error_object(&self) -> ErrorObject {
        let data = match self {
            Self::NotFound(tool) => json!({ "tool": tool, "kind": "tool_not_found" }),
            Self::InvalidArguments { tool, .. } => {
                json!({ "tool": tool, "kind": "invalid_arguments" })
            }
            Self::Upstream { tool, source } => {
                let mut data = json!({ "tool": tool, "kind": source.kind() });
                if let Some(status) = source.status() {
                    data["status"] = json!(status);
                }
                data
            }
        };
        ErrorObject::with_message(ErrorCode::ToolCallFailed, self.to_string()).with_data(data)
    }
}

impl ToolSpec {
    /// Returns the JSON Schema describing this tool's parameters.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    json!({ "type": p.kind.schema_type(), "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Returns the `tools/list` entry for this tool.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }

    /// Maps arguments onto the gateway path and query.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] if a required parameter is
    /// missing or an integer parameter is not a non-negative integer.
    pub fn resolve(&self, arguments: &Map<String, Value>) -> Result<ResolvedCall, ToolError> {
        for spec in self.params {
            match arguments.get(spec.name).filter(|v| !v.is_null()) {
                None if spec.required => {
                    return Err(self.invalid(format!("missing required parameter '{}'", spec.name)))
                }
                Some(value) if spec.kind == ParamKind::Integer && as_count(value).is_none() => {
                    return Err(self.invalid(format!(
                        "parameter '{}' must be a non-negative integer",
                        spec.name
                    )))
                }
                _ => {}
            }
        }

        let (segments, skip) = match self.route {
            Route::Collection(path) => (vec![path.to_string()], None),
            Route::Item {
                collection,
                id_param,
            } => {
                let id = arguments
                    .get(id_param)
                    .and_then(query_value)
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| {
                        self.invalid(format!("parameter '{id_param}' must not be empty"))
                    })?;
                (vec![collection.to_string(), id], Some(id_param))
            }
        };

        let query = arguments
            .iter()
            .filter(|(key, _)| Some(key.as_str()) != skip)
            .filter_map(|(key, value)| query_value(value).map(|v| (key.clone(), v)))
            .collect();

        Ok(ResolvedCall { segments, query })
    }

    fn invalid(&self, message: String) -> ToolError {
        ToolError::InvalidArguments {
            tool: self.name.to_string(),
            message,
        }
    }
}

/// Accepts JSON integers and numeric strings.
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Renders an argument as a query string value; `null` is dropped.
fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            Some(value.to_string())
        }
    }
}

/// Executes tool calls against the gateway.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    gateway: GatewayClient,
}

impl ToolRunner {
    /// Creates a runner that forwards to `gateway`.
    #[must_use]
    pub const fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }

    /// Resolves `name` and performs its single gateway call.
    ///
    /// On success the gateway's JSON body is returned unchanged.
    ///
    /// # Errors
    ///
    /// See [`ToolError`].
    pub async fn call(&self, name: &str, arguments: Option<&Value>) -> Result<Value, ToolError> {
        let tool = find_tool(name).ok_or_else(|| {
            warn!(tool = %name, "Unknown tool requested");
            ToolError::NotFound(name.to_string())
        })?;

        let arguments = params_object(arguments)
            .ok_or_else(|| tool.invalid("arguments must be an object".to_string()))?;

        let call = tool.resolve(&arguments)?;
        info!(tool = %name, path = ?call.segments, "Executing tool");

        let segments: Vec<&str> = call.segments.iter().map(String::as_str).collect();
        self.gateway
            .get_json(&segments, &call.query)
            .await
            .map_err(|source| ToolError::Upstream {
                tool: name.to_string(),
                source,
            })
    }
}
