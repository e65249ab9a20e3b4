//! Targeted `find_*` tools. Each one turns its structured arguments into an engine query
//! and a fixed boost plan, then shares the hits renderer with `search`.

use super::search::{effective_limit, required, run_hits};
use crate::tools::dispatch::{ScoutService, ToolOutcome};
use crate::tools::schemas::find::{
    FindApiRequest, FindClassRequest, FindConfigRequest, FindControllerRequest,
    FindCronRequest, FindDbSchemaRequest, FindMethodRequest, FindObserverRequest,
    FindPluginRequest, FindPreferenceRequest, FindQueryRequest, FindTemplateRequest,
};
use scout_protocol::ErrorEnvelope;
use scout_search::{route_controller_marker, BoostPlan, BoostRule, SearchIntent};

const TARGET_BOOST: f32 = 0.6;

/// Engine query, intent label and boost plan for one find call.
#[derive(Debug)]
struct FindQuery {
    query: String,
    intent: &'static str,
    plan: BoostPlan,
}

impl FindQuery {
    fn new(query: String, intent: SearchIntent) -> Self {
        Self {
            query,
            intent: intent.label(),
            plan: intent.boost_plan(),
        }
    }

    fn boost(mut self, rule: BoostRule) -> Self {
        self.plan.rules.push(rule);
        self
    }

    async fn run(self, service: &ScoutService, limit: Option<usize>) -> ToolOutcome {
        run_hits(service, self.query, effective_limit(limit), self.intent, self.plan).await
    }
}

fn class_query(request: &FindClassRequest) -> Result<FindQuery, ErrorEnvelope> {
    let class = required(&request.class_name, "className")?;
    let qualified = match request.namespace.as_deref().map(str::trim) {
        Some(ns) if !ns.is_empty() && !class.contains('\\') => {
            format!("{}\\{class}", ns.trim_end_matches('\\'))
        }
        _ => class.to_string(),
    };
    Ok(FindQuery::new(format!("class {qualified}"), SearchIntent::Class))
}

fn method_query(request: &FindMethodRequest) -> Result<FindQuery, ErrorEnvelope> {
    let method = required(&request.method_name, "methodName")?;
    let query = match request.class_name.as_deref().map(str::trim) {
        Some(class) if !class.is_empty() => format!("function {method} class {class}"),
        _ => format!("function {method}"),
    };
    Ok(FindQuery::new(query, SearchIntent::Method))
}

fn config_query(request: &FindConfigRequest) -> Result<FindQuery, ErrorEnvelope> {
    let query = required(&request.query, "query")?;
    let find = match request.config_type {
        Some(kind) => FindQuery::new(
            format!("{} {query}", kind.label()),
            SearchIntent::Config(kind),
        ),
        None => FindQuery {
            query: format!("config {query}"),
            intent: "config",
            plan: BoostPlan::default()
                .with_rule(BoostRule::path("/etc/"))
                .expecting("xml"),
        },
    };
    Ok(find)
}

fn template_query(request: &FindTemplateRequest) -> Result<FindQuery, ErrorEnvelope> {
    let query = required(&request.query, "query")?;
    let find = FindQuery::new(format!("template {query}"), SearchIntent::Template);
    Ok(match request.area.as_deref().map(str::trim) {
        Some(area) if !area.is_empty() => {
            find.boost(BoostRule::path(format!("/view/{}/", area.to_ascii_lowercase())))
        }
        _ => find,
    })
}

fn plugin_query(request: &FindPluginRequest) -> Result<FindQuery, ErrorEnvelope> {
    let class = required(&request.target_class, "targetClass")?;
    let query = match request.target_method.as_deref().map(str::trim) {
        Some(method) if !method.is_empty() => format!("plugin for {class} {method}"),
        _ => format!("plugin for {class}"),
    };
    Ok(FindQuery::new(query, SearchIntent::Plugin))
}

fn controller_query(request: &FindControllerRequest) -> Result<FindQuery, ErrorEnvelope> {
    let route = required(&request.route, "route")?;
    let words = route
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let find = FindQuery::new(format!("{words} controller execute"), SearchIntent::Controller)
        .boost(BoostRule::path(route_controller_marker(route)).with_weight(TARGET_BOOST));
    Ok(match request.area.as_deref().map(str::trim) {
        Some(area) if area.eq_ignore_ascii_case("adminhtml") => {
            find.boost(BoostRule::path("/Controller/Adminhtml/"))
        }
        _ => find,
    })
}

fn api_query(request: &FindApiRequest) -> Result<FindQuery, ErrorEnvelope> {
    let query = required(&request.query, "query")?;
    let query = match request.method.as_deref().map(str::trim) {
        Some(method) if !method.is_empty() => {
            format!("webapi route {} {query}", method.to_ascii_uppercase())
        }
        _ => format!("webapi route {query}"),
    };
    Ok(FindQuery::new(query, SearchIntent::Api))
}

pub(in crate::tools::dispatch) async fn find_class(
    service: &ScoutService,
    request: FindClassRequest,
) -> ToolOutcome {
    class_query(&request)?.run(service, request.limit).await
}

pub(in crate::tools::dispatch) async fn find_method(
    service: &ScoutService,
    request: FindMethodRequest,
) -> ToolOutcome {
    method_query(&request)?.run(service, request.limit).await
}

pub(in crate::tools::dispatch) async fn find_config(
    service: &ScoutService,
    request: FindConfigRequest,
) -> ToolOutcome {
    config_query(&request)?.run(service, request.limit).await
}

pub(in crate::tools::dispatch) async fn find_template(
    service: &ScoutService,
    request: FindTemplateRequest,
) -> ToolOutcome {
    template_query(&request)?.run(service, request.limit).await
}

pub(in crate::tools::dispatch) async fn find_plugin(
    service: &ScoutService,
    request: FindPluginRequest,
) -> ToolOutcome {
    plugin_query(&request)?.run(service, request.limit).await
}

pub(in crate::tools::dispatch) async fn find_observer(
    service: &ScoutService,
    request: FindObserverRequest,
) -> ToolOutcome {
    let event = required(&request.event_name, "eventName")?;
    FindQuery::new(format!("observer for event {event}"), SearchIntent::Observer)
        .run(service, request.limit)
        .await
}

pub(in crate::tools::dispatch) async fn find_preference(
    service: &ScoutService,
    request: FindPreferenceRequest,
) -> ToolOutcome {
    let name = required(&request.interface_name, "interfaceName")?;
    FindQuery::new(format!("preference for {name}"), SearchIntent::Preference)
        .run(service, request.limit)
        .await
}

pub(in crate::tools::dispatch) async fn find_api(
    service: &ScoutService,
    request: FindApiRequest,
) -> ToolOutcome {
    api_query(&request)?.run(service, request.limit).await
}

pub(in crate::tools::dispatch) async fn find_controller(
    service: &ScoutService,
    request: FindControllerRequest,
) -> ToolOutcome {
    controller_query(&request)?.run(service, request.limit).await
}

pub(in crate::tools::dispatch) async fn find_block(
    service: &ScoutService,
    request: FindQueryRequest,
) -> ToolOutcome {
    let query = required(&request.query, "query")?;
    FindQuery::new(format!("block {query}"), SearchIntent::Block)
        .run(service, request.limit)
        .await
}

pub(in crate::tools::dispatch) async fn find_cron(
    service: &ScoutService,
    request: FindCronRequest,
) -> ToolOutcome {
    let job = required(&request.job_name, "jobName")?;
    FindQuery::new(format!("cron job {job}"), SearchIntent::Cron)
        .run(service, request.limit)
        .await
}

pub(in crate::tools::dispatch) async fn find_graphql(
    service: &ScoutService,
    request: FindQueryRequest,
) -> ToolOutcome {
    let query = required(&request.query, "query")?;
    FindQuery::new(format!("graphql resolver {query}"), SearchIntent::Resolver)
        .run(service, request.limit)
        .await
}

pub(in crate::tools::dispatch) async fn find_db_schema(
    service: &ScoutService,
    request: FindDbSchemaRequest,
) -> ToolOutcome {
    let table = required(&request.table_name, "tableName")?;
    FindQuery::new(format!("db_schema.xml table {table}"), SearchIntent::DbSchema)
        .run(service, request.limit)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scout_protocol::ErrorCode;
    use scout_search::ConfigKind;

    #[test]
    fn class_query_prefixes_namespace_once() {
        let request = FindClassRequest {
            class_name: "CartRepository".to_string(),
            namespace: Some("Magento\\Quote\\Model\\".to_string()),
            limit: None,
        };
        let find = class_query(&request).unwrap();
        assert_eq!(find.query, "class Magento\\Quote\\Model\\CartRepository");
        assert_eq!(find.intent, "class");

        let qualified = FindClassRequest {
            class_name: "Magento\\Quote\\Model\\Quote".to_string(),
            namespace: Some("Other".to_string()),
            limit: None,
        };
        assert_eq!(
            class_query(&qualified).unwrap().query,
            "class Magento\\Quote\\Model\\Quote"
        );
    }

    #[test]
    fn blank_required_argument_is_invalid() {
        let request = FindMethodRequest {
            method_name: "  ".to_string(),
            class_name: None,
            limit: None,
        };
        let err = method_query(&request).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
        assert!(err.message.contains("methodName"));
    }

    #[test]
    fn config_kind_selects_its_file() {
        let typed = FindConfigRequest {
            query: "cart repository".to_string(),
            config_type: Some(ConfigKind::Di),
            limit: None,
        };
        let find = config_query(&typed).unwrap();
        assert_eq!(find.query, "di cart repository");
        assert!(find
            .plan
            .rules
            .iter()
            .any(|rule| rule == &BoostRule::file_name("di.xml").with_weight(0.5)));

        let untyped = FindConfigRequest {
            config_type: None,
            ..typed
        };
        let find = config_query(&untyped).unwrap();
        assert_eq!(find.intent, "config");
        assert_eq!(find.plan.expected_file_type.as_deref(), Some("xml"));
    }

    #[test]
    fn controller_query_boosts_route_class_and_admin_area() {
        let request = FindControllerRequest {
            route: "sales/order_create/save".to_string(),
            area: Some("adminhtml".to_string()),
            limit: Some(3),
        };
        let find = controller_query(&request).unwrap();
        assert_eq!(find.query, "sales order_create save controller execute");
        assert!(find.plan.rules.contains(
            &BoostRule::path("/Controller/OrderCreate/Save").with_weight(TARGET_BOOST)
        ));
        assert!(find
            .plan
            .rules
            .contains(&BoostRule::path("/Controller/Adminhtml/")));
    }

    #[test]
    fn template_area_adds_view_rule() {
        let request = FindTemplateRequest {
            query: "minicart".to_string(),
            area: Some("Frontend".to_string()),
            limit: None,
        };
        let find = template_query(&request).unwrap();
        assert!(find.plan.rules.contains(&BoostRule::path("/view/frontend/")));
    }

    #[test]
    fn api_method_is_uppercased() {
        let request = FindApiRequest {
            query: "/V1/carts/mine".to_string(),
            method: Some("put".to_string()),
            limit: None,
        };
        assert_eq!(
            api_query(&request).unwrap().query,
            "webapi route PUT /V1/carts/mine"
        );
    }
}
