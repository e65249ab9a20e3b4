use crate::tools::dispatch::ScoutService;
use crate::tools::schemas::analyze_diff::AnalyzeDiffRequest;
use crate::tools::schemas::find::{
    FindApiRequest, FindClassRequest, FindConfigRequest, FindControllerRequest,
    FindCronRequest, FindDbSchemaRequest, FindMethodRequest, FindObserverRequest,
    FindPluginRequest, FindPreferenceRequest, FindQueryRequest, FindTemplateRequest,
};
use crate::tools::schemas::index::{IndexRequest, StatsRequest};
use crate::tools::schemas::module_structure::ModuleStructureRequest;
use crate::tools::schemas::search::SearchRequest;
use crate::tools::schemas::trace::TraceFlowRequest;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use serde::Serialize;
use serde_json::Value;

pub(super) fn build_tool_router() -> ToolRouter<ScoutService> {
    ScoutService::tool_router()
}

/// Arguments as the caller sent them, for request logs and feedback.
fn args_of<T: Serialize>(request: &T) -> Value {
    serde_json::to_value(request).unwrap_or(Value::Null)
}

#[tool_router]
impl ScoutService {
    #[tool(
        description = "Semantic search over the indexed project. The intent (plugin, controller, config, template, ...) is inferred from the query and used to re-rank hits."
    )]
    pub async fn search(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("search", args, super::search::search(self, request)).await
    }

    #[tool(
        description = "Find a PHP class by short or fully qualified name; the class file itself ranks first."
    )]
    pub async fn find_class(
        &self,
        Parameters(request): Parameters<FindClassRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_class", args, super::find::find_class(self, request)).await
    }

    #[tool(description = "Find a method implementation, optionally within a class.")]
    pub async fn find_method(
        &self,
        Parameters(request): Parameters<FindMethodRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_method", args, super::find::find_method(self, request)).await
    }

    #[tool(
        description = "Search XML configuration, optionally restricted to one kind (di, routes, system, events, webapi, module, layout, acl, crontab, db_schema, graphql)."
    )]
    pub async fn find_config(
        &self,
        Parameters(request): Parameters<FindConfigRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_config", args, super::find::find_config(self, request)).await
    }

    #[tool(
        description = "Find .phtml templates, optionally within an area (frontend, adminhtml, base)."
    )]
    pub async fn find_template(
        &self,
        Parameters(request): Parameters<FindTemplateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_template", args, super::find::find_template(self, request)).await
    }

    #[tool(
        description = "Find plugins (interceptors) and their di.xml declarations for a class or method."
    )]
    pub async fn find_plugin(
        &self,
        Parameters(request): Parameters<FindPluginRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_plugin", args, super::find::find_plugin(self, request)).await
    }

    #[tool(description = "Find observers and events.xml wiring for an event.")]
    pub async fn find_observer(
        &self,
        Parameters(request): Parameters<FindObserverRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_observer", args, super::find::find_observer(self, request)).await
    }

    #[tool(
        description = "Find di.xml preferences (implementation overrides) for an interface or class."
    )]
    pub async fn find_preference(
        &self,
        Parameters(request): Parameters<FindPreferenceRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_preference", args, super::find::find_preference(self, request)).await
    }

    #[tool(
        description = "Find REST endpoints: webapi.xml routes and the service contracts behind them."
    )]
    pub async fn find_api(
        &self,
        Parameters(request): Parameters<FindApiRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_api", args, super::find::find_api(self, request)).await
    }

    #[tool(description = "Find the controller serving a route (frontName/controller/action).")]
    pub async fn find_controller(
        &self,
        Parameters(request): Parameters<FindControllerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_controller", args, super::find::find_controller(self, request)).await
    }

    #[tool(description = "Find Block classes.")]
    pub async fn find_block(
        &self,
        Parameters(request): Parameters<FindQueryRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_block", args, super::find::find_block(self, request)).await
    }

    #[tool(description = "Find cron jobs: crontab.xml entries and their classes.")]
    pub async fn find_cron(
        &self,
        Parameters(request): Parameters<FindCronRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_cron", args, super::find::find_cron(self, request)).await
    }

    #[tool(description = "Find GraphQL schema definitions and resolvers.")]
    pub async fn find_graphql(
        &self,
        Parameters(request): Parameters<FindQueryRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_graphql", args, super::find::find_graphql(self, request)).await
    }

    #[tool(description = "Find db_schema.xml declarations for a table.")]
    pub async fn find_db_schema(
        &self,
        Parameters(request): Parameters<FindDbSchemaRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("find_db_schema", args, super::find::find_db_schema(self, request)).await
    }

    #[tool(description = "List the indexed files of a module (Vendor_Module) grouped by kind.")]
    pub async fn module_structure(
        &self,
        Parameters(request): Parameters<ModuleStructureRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch(
            "module_structure",
            args,
            super::module_structure::module_structure(self, request),
        )
        .await
    }

    #[tool(
        description = "Trace an entry point (route, API path, GraphQL field, event, cron job) to its handler, configuration, plugins and observers. `deep` adds preferences, layout and templates."
    )]
    pub async fn trace_flow(
        &self,
        Parameters(request): Parameters<TraceFlowRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("trace_flow", args, super::trace::trace_flow(self, request)).await
    }

    #[tool(
        description = "Classify the files changed by a commit (default HEAD) and flag risky wiring changes."
    )]
    pub async fn analyze_diff(
        &self,
        Parameters(request): Parameters<AnalyzeDiffRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("analyze_diff", args, super::analyze_diff::analyze_diff(self, request)).await
    }

    #[tool(
        description = "Rebuild the search index for the source root (or a given path). Clears cached results."
    )]
    pub async fn index(
        &self,
        Parameters(request): Parameters<IndexRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("index", args, super::index::index(self, request)).await
    }

    #[tool(description = "Engine statistics, index state, cache size and engine channel status.")]
    pub async fn stats(
        &self,
        Parameters(request): Parameters<StatsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = args_of(&request);
        self.dispatch("stats", args, super::index::stats(self, request)).await
    }
}
