//! MCP server for the ErgoAI engine.
//!
//! Exposes queries, file loading, inline code, syntax checking and help as MCP
//! tools over stdio transport using the rmcp SDK. Engine failures come back as
//! tool results flagged as errors, never as protocol errors.

use std::path::PathBuf;

use ergo_runtime::{
    CodeRequest, EngineError, ErgoEngine, FileRequest, HelpRequest, QueryRequest, SyntaxRequest,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parameter structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RunQueryParams {
    /// The ErgoAI query to execute. Must end with a period (.). Do NOT include the ?- prefix.
    pub query: String,
    /// Optional module name to query against (default: "main")
    pub module: Option<String>,
    /// Optional timeout in milliseconds (default: 30000, max: 300000)
    pub timeout: Option<u64>,
    /// Optional working directory for file operations
    pub working_directory: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RunFileParams {
    /// Path to the .ergo file to load. Can be absolute or relative to the working directory.
    pub file_path: String,
    /// Module name to load the file into (default: "main"). Use different modules to organize knowledge.
    pub module: Option<String>,
    /// Optional array of queries to execute after loading the file. Each query must end with a period.
    pub queries: Option<Vec<String>>,
    /// Optional timeout in milliseconds (default: 60000, max: 300000)
    pub timeout: Option<u64>,
    /// Optional working directory. If not specified, uses the directory containing the file.
    pub working_directory: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RunCodeParams {
    /// ErgoAI code to execute. Can include facts, rules, and queries. Each statement must end with a period.
    pub code: String,
    /// Module to execute the code in (default: "main"). Different modules provide separate namespaces.
    pub module: Option<String>,
    /// Optional timeout in milliseconds (default: 60000, max: 300000)
    pub timeout: Option<u64>,
    /// Optional working directory for any file operations
    pub working_directory: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckSyntaxParams {
    /// ErgoAI code to check for syntax errors
    pub code: String,
    /// Optional timeout in milliseconds (default: 30000)
    pub timeout: Option<u64>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetHelpParams {
    /// Optional help topic. Leave empty for general help, or specify a topic like "load", "query", etc.
    pub topic: Option<String>,
    /// Optional timeout in milliseconds (default: 15000)
    pub timeout: Option<u64>,
}

// ---------------------------------------------------------------------------
// Server struct
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ErgoMcpServer {
    engine: ErgoEngine,
    tool_router: ToolRouter<Self>,
}

// ---------------------------------------------------------------------------
// Tool definitions
// ---------------------------------------------------------------------------

#[tool_router]
impl ErgoMcpServer {
    pub fn new(engine: ErgoEngine) -> Self {
        Self {
            engine,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Execute an ErgoAI query and return the results.\nThe query should be valid ErgoAI syntax and must end with a period (.).\nIn ErgoAI, queries in the interactive shell do NOT use the ?- prefix.\n\nExamples:\n- \"mortal(?X).\" - Find all X that are mortal\n- \"john[age -> ?A].\" - Get John's age\n- \"?X : Person.\" - Find all instances of Person class\n\nThe tool returns query results, any warnings, and any errors."
    )]
    async fn run_ergo_query(
        &self,
        Parameters(params): Parameters<RunQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .engine
            .run_query(QueryRequest {
                query: params.query,
                module: params.module,
                timeout_ms: params.timeout,
                working_directory: params.working_directory.map(PathBuf::from),
            })
            .await;
        Ok(tool_result(outcome))
    }

    #[tool(
        description = "Load and execute an ErgoAI file (.ergo).\nThis loads the file into a module and optionally executes queries from it.\n\nThe file should contain valid ErgoAI code including facts, rules, and optionally queries.\nQueries in files should use the ?- prefix.\n\nReturns load status, any query results, warnings, and errors."
    )]
    async fn run_ergo_file(
        &self,
        Parameters(params): Parameters<RunFileParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .engine
            .run_file(FileRequest {
                file_path: params.file_path,
                module: params.module,
                queries: params.queries.unwrap_or_default(),
                timeout_ms: params.timeout,
                working_directory: params.working_directory.map(PathBuf::from),
            })
            .await;
        Ok(tool_result(outcome))
    }

    #[tool(
        description = "Execute inline ErgoAI code (facts, rules, and queries).\nThis is useful for testing small code snippets or adding facts/rules dynamically.\n\nThe code can include:\n- Facts: \"man(socrates).\"\n- Rules: \"mortal(?X) :- man(?X).\"\n- Queries: Use run_ergo_query for queries, or include them prefixed with ?- here\n\nReturns execution results, warnings, and errors."
    )]
    async fn run_ergo_code(
        &self,
        Parameters(params): Parameters<RunCodeParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .engine
            .run_code(CodeRequest {
                code: params.code,
                module: params.module,
                timeout_ms: params.timeout,
                working_directory: params.working_directory.map(PathBuf::from),
            })
            .await;
        Ok(tool_result(outcome))
    }

    #[tool(
        description = "Check ErgoAI code for syntax errors without executing it.\nThis compiles the code and reports any syntax errors or warnings.\n\nUseful for validating code before execution."
    )]
    async fn check_ergo_syntax(
        &self,
        Parameters(params): Parameters<CheckSyntaxParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .engine
            .check_syntax(SyntaxRequest {
                code: params.code,
                timeout_ms: params.timeout,
            })
            .await;
        Ok(tool_result(outcome))
    }

    #[tool(
        description = "Get help information about ErgoAI shell commands and syntax.\nReturns the built-in help documentation from ErgoAI."
    )]
    async fn get_ergo_help(
        &self,
        Parameters(params): Parameters<GetHelpParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .engine
            .help(HelpRequest {
                topic: params.topic,
                timeout_ms: params.timeout,
            })
            .await;
        Ok(match outcome {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => error_result(&e),
        })
    }
}

// ---------------------------------------------------------------------------
// ServerHandler: #[tool_handler] generates list_tools and call_tool
// ---------------------------------------------------------------------------

#[tool_handler]
impl ServerHandler for ErgoMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "ErgoAI reasoning engine: run queries, load .ergo files, execute inline \
                 facts and rules, check syntax and read the built-in help"
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pretty JSON for a structured outcome, or an error result.
fn tool_result<T: Serialize>(outcome: Result<T, EngineError>) -> CallToolResult {
    match outcome {
        Ok(payload) => match serde_json::to_string_pretty(&payload) {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(e) => error_text(&e.to_string()),
        },
        Err(e) => error_result(&e),
    }
}

fn error_result(error: &EngineError) -> CallToolResult {
    if error.is_timeout() {
        tracing::warn!("{}", error);
    } else {
        tracing::debug!("Tool call failed: {}", error);
    }
    error_text(&error.to_string())
}

fn error_text(message: &str) -> CallToolResult {
    let json = serde_json::json!({
        "success": false,
        "error": message,
    });
    let text = serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string());
    CallToolResult::error(vec![Content::text(text)])
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Start the MCP server over stdio transport.
pub async fn start_mcp_server(engine: ErgoEngine) -> anyhow::Result<()> {
    tracing::info!("ErgoAI MCP server starting on stdio");
    let service = ErgoMcpServer::new(engine).serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
