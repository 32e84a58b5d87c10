use std::sync::Arc;

use mask_canvas::{EditPayload, EditorMessage, ImageDimensions, decode_data_url, normalize};
use rmcp::{
    handler::server::tool::IntoCallToolResult, model::{CallToolResult, Content, ServerCapabilities, ServerInfo}, schemars, tool, Error as McpError, ServerHandler
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use crate::{
    auth::{InMemorySessions, SessionProvider},
    client::ImageEditClient,
    error::EditError,
    request::{EditOptions, EditRequest, EditResponse, ImageSize},
    store::{ExampleStore, InMemoryExampleStore},
};

pub const SECRET_MESSAGE: &str = "you can now see this secret message!";

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct HelloRequest {
    #[schemars(description = "Name or text to greet")]
    pub text: String,
}

/// Request for a guarded tool
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct SessionRequest {
    #[schemars(description = "Session token issued by the authentication provider")]
    pub session_token: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NormalizeRequest {
    #[schemars(description = "Image as a data URL or bare base64")]
    pub data: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct EditImageRequest {
    #[schemars(description = "Square PNG image as a data URL or bare base64")]
    pub image: String,
    #[schemars(description = "PNG mask of the same size; transparent pixels mark the editable region")]
    pub mask: Option<String>,
    #[schemars(description = "Description of the desired edit", length(min = 1, max = 1000))]
    pub prompt: String,
    #[schemars(description = "Output size: 256x256, 512x512 or 1024x1024")]
    pub size: Option<ImageSize>,
    #[schemars(description = "Number of images to generate", range(min = 1, max = 10))]
    pub n: Option<u8>,
}

#[derive(Debug, Serialize, schemars::JsonSchema, TS)]
#[ts(export)]
pub struct GreetingResponse {
    pub greeting: String,
}

#[derive(Debug, Serialize, schemars::JsonSchema, TS)]
#[ts(export)]
pub struct NormalizeResponse {
    #[schemars(description = "Normalized square image as a PNG data URL")]
    pub data_url: String,
    pub dimensions: ImageDimensions,
    pub source_dimensions: ImageDimensions,
    #[schemars(description = "Top-left corner of the crop in the source image")]
    pub offset: [u32; 2],
}

impl IntoCallToolResult for GreetingResponse {
    fn into_call_tool_result(self) -> Result<CallToolResult, McpError> {
        json_result(&self)
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize response: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn to_mcp_error(error: EditError) -> McpError {
    let message = error.to_string();
    match error {
        EditError::Unauthorized => McpError::invalid_request(message, None),
        EditError::InvalidRequest(_) | EditError::Canvas(_) => McpError::invalid_params(message, None),
        _ => McpError::internal_error(message, None),
    }
}

/// MCP server exposing the image-edit router
#[derive(Clone)]
pub struct ImageEditServer {
    client: Option<Arc<ImageEditClient>>,
    sessions: Arc<dyn SessionProvider>,
    store: Arc<dyn ExampleStore>,
}

impl ImageEditServer {
    pub fn new(
        client: Option<ImageEditClient>,
        sessions: Arc<dyn SessionProvider>,
        store: Arc<dyn ExampleStore>,
    ) -> Self {
        Self {
            client: client.map(Arc::new),
            sessions,
            store,
        }
    }

    /// Server without a remote client, backed by in-memory sessions and storage
    pub fn offline() -> Self {
        Self::new(
            None,
            Arc::new(InMemorySessions::default()),
            Arc::new(InMemoryExampleStore::new()),
        )
    }

    pub fn greeting(text: &str) -> GreetingResponse {
        GreetingResponse {
            greeting: format!("Hello {}", text),
        }
    }

    /// Resolve the caller's session or refuse
    pub fn secret_message(&self, session_token: Option<&str>) -> Result<&'static str, EditError> {
        let session = session_token
            .and_then(|token| self.sessions.session(token))
            .ok_or(EditError::Unauthorized)?;
        info!("Secret message requested by {}", session.user.name);
        Ok(SECRET_MESSAGE)
    }

    /// Validate the request and pass it through to the hosted endpoint
    pub async fn edited_image(&self, request: EditImageRequest) -> Result<EditResponse, EditError> {
        let EditImageRequest { image, mask, prompt, size, n } = request;
        let defaults = EditOptions::default();
        let options = EditOptions {
            size: size.unwrap_or(defaults.size),
            n: n.unwrap_or(defaults.n),
            ..defaults
        };
        let request = EditRequest::from_payload(&EditPayload { image, mask, prompt }, options)?;

        let client = self.client.as_ref().ok_or(EditError::MissingApiKey)?;
        client.edit(&request).await
    }

    pub fn normalized(data: &str) -> Result<NormalizeResponse, EditError> {
        let normalized = normalize(&decode_data_url(data)?)?;
        let (x, y) = normalized.offset();
        Ok(NormalizeResponse {
            data_url: normalized.to_data_url()?,
            dimensions: normalized.dimensions(),
            source_dimensions: normalized.source_dimensions(),
            offset: [x, y],
        })
    }
}

impl Default for ImageEditServer {
    fn default() -> Self {
        Self::offline()
    }
}

#[tool(tool_box)]
impl ImageEditServer {
    #[tool(description = "Return a greeting for the given text")]
    fn hello(&self, #[tool(aggr)] HelloRequest { text }: HelloRequest) -> GreetingResponse {
        Self::greeting(&text)
    }

    #[tool(description = "List all stored example records")]
    fn get_all(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.store.find_many())
    }

    #[tool(description = "Return the secret message. Requires a valid session token")]
    fn get_secret_message(
        &self,
        #[tool(aggr)] SessionRequest { session_token }: SessionRequest,
    ) -> Result<CallToolResult, McpError> {
        match self.secret_message(session_token.as_deref()) {
            Ok(message) => Ok(CallToolResult::success(vec![Content::text(message)])),
            Err(e) => {
                warn!("Refused unauthenticated call to get_secret_message");
                Err(to_mcp_error(e))
            }
        }
    }

    #[tool(description = "Crop an image to its centered square and return it as a PNG data URL")]
    fn normalize_image(
        &self,
        #[tool(aggr)] NormalizeRequest { data }: NormalizeRequest,
    ) -> Result<CallToolResult, McpError> {
        let response = Self::normalized(&data).map_err(to_mcp_error)?;
        json_result(&response)
    }

    #[tool(description = "Edit the transparent region of an image according to a prompt")]
    async fn get_edited_image(
        &self,
        #[tool(aggr)] request: EditImageRequest,
    ) -> Result<CallToolResult, McpError> {
        let response = self.edited_image(request).await.map_err(to_mcp_error)?;
        json_result(&response)
    }

    #[tool(description = "Get the JSON schema of the messages that drive the mask editor")]
    fn get_editor_schema(&self) -> String {
        let schema = EditorMessage::schema();
        serde_json::to_string_pretty(&schema)
            .unwrap_or_else(|e| format!("Failed to serialize schema: {}", e))
    }
}

#[tool(tool_box)]
impl ServerHandler for ImageEditServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Image Edit Server - normalize uploads to squares and request AI edits of the masked (transparent) region of an image.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
