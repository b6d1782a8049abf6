//! Actions: the steps an instance runs against its services.
//!
//! Documents never name an action's Rust variant. The `actions` factory reads
//! the compound `verb[/service[/name]]` keys and picks the variant; see
//! [`crate::actions`] for the grammar.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::{schema, variants};

const TIMEOUT: &str = "timeout";
const WHEN: &str = "when,enum=always|on_success|on_failure,default=on_success";
const ON_FAILURE: &str = "on_failure,enum=fail|ignore|skip,default=fail";
const METHOD: &str = "method,enum=GET|HEAD|DELETE|POST|PUT|PATCH|OPTIONS,default=GET";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Action {
    Bench(BenchAction),
    Execute(ExecuteAction),
    Start(StartAction),
    Stop(StopAction),
    Restart(RestartAction),
    Reload(ReloadAction),
    Request(RequestAction),
    CustomExpectation(CustomExpectationAction),
    MetricsExpectation(MetricsExpectationAction),
    OutputExpectation(OutputExpectationAction),
    ResponseExpectation(ResponseExpectationAction),
    Not(NotAction),
    Parallel(ParallelAction),
    Sequential(SequentialAction),
}

impl Default for Action {
    fn default() -> Self {
        Action::Sequential(SequentialAction::default())
    }
}

variants!(Action {
    Bench,
    Execute,
    Start,
    Stop,
    Restart,
    Reload,
    Request,
    CustomExpectation,
    MetricsExpectation,
    OutputExpectation,
    ResponseExpectation,
    Not,
    Parallel,
    Sequential,
});

impl Action {
    /// The leading segment of the action key this variant is written as.
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Bench(_) => "bench",
            Action::Execute(_) => "execute",
            Action::Start(_) => "start",
            Action::Stop(_) => "stop",
            Action::Restart(_) => "restart",
            Action::Reload(_) => "reload",
            Action::Request(_) => "request",
            Action::CustomExpectation(_)
            | Action::MetricsExpectation(_)
            | Action::OutputExpectation(_)
            | Action::ResponseExpectation(_) => "expect",
            Action::Not(_) => "not",
            Action::Parallel(_) => "parallel",
            Action::Sequential(_) => "sequential",
        }
    }

    /// The service this action targets. A negation reports the service of
    /// the action it wraps; groups report their own default service.
    pub fn service(&self) -> &str {
        match self {
            Action::Bench(a) => &a.service,
            Action::Execute(a) => &a.service,
            Action::Start(a) => &a.service,
            Action::Stop(a) => &a.service,
            Action::Restart(a) => &a.service,
            Action::Reload(a) => &a.service,
            Action::Request(a) => &a.service,
            Action::CustomExpectation(a) => &a.service,
            Action::MetricsExpectation(a) => &a.service,
            Action::OutputExpectation(a) => &a.service,
            Action::ResponseExpectation(a) => &a.service,
            Action::Not(a) => a.action.service(),
            Action::Parallel(a) => &a.service,
            Action::Sequential(a) => &a.service,
        }
    }

    pub(crate) fn set_service(&mut self, service: &str) {
        let slot = match self {
            Action::Bench(a) => &mut a.service,
            Action::Execute(a) => &mut a.service,
            Action::Start(a) => &mut a.service,
            Action::Stop(a) => &mut a.service,
            Action::Restart(a) => &mut a.service,
            Action::Reload(a) => &mut a.service,
            Action::Request(a) => &mut a.service,
            Action::CustomExpectation(a) => &mut a.service,
            Action::MetricsExpectation(a) => &mut a.service,
            Action::OutputExpectation(a) => &mut a.service,
            Action::ResponseExpectation(a) => &mut a.service,
            Action::Parallel(a) => &mut a.service,
            Action::Sequential(a) => &mut a.service,
            Action::Not(_) => return,
        };
        *slot = service.to_string();
    }

    /// Apply the third key segment: the result id for requests, benches and
    /// executions, the display name for expectations and sequences.
    pub(crate) fn set_custom_name(&mut self, name: &str) {
        let slot = match self {
            Action::Bench(a) => &mut a.id,
            Action::Execute(a) => &mut a.id,
            Action::Request(a) => &mut a.id,
            Action::CustomExpectation(a) => &mut a.name,
            Action::MetricsExpectation(a) => &mut a.name,
            Action::OutputExpectation(a) => &mut a.name,
            Action::ResponseExpectation(a) => &mut a.name,
            Action::Sequential(a) => &mut a.name,
            _ => return,
        };
        *slot = name.to_string();
    }
}

// -- workload actions ---------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BenchAction {
    pub service: String,
    pub id: String,
    pub frequency: i32,
    pub duration: i32,
    pub path: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    BenchAction {
        service => "service",
        id => "id,default=last",
        frequency => "frequency",
        duration => "duration",
        path => "path,default=/",
        method => METHOD,
        headers => "headers",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecuteAction {
    pub service: String,
    pub id: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    ExecuteAction {
        service => "service",
        id => "id,default=last",
        command => "command",
        args => "args",
        env => "env",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestAction {
    pub service: String,
    pub id: String,
    pub scheme: String,
    pub path: String,
    pub encode_path: bool,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    RequestAction {
        service => "service",
        id => "id,default=last",
        scheme => "scheme,enum=http|https,default=http",
        path => "path,default=/",
        encode_path => "encode_path,default=true",
        method => METHOD,
        headers => "headers",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

// -- service lifecycle --------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StartAction {
    pub service: String,
    pub services: Vec<String>,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    StartAction {
        service => "service",
        services => "services",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StopAction {
    pub service: String,
    pub services: Vec<String>,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    StopAction {
        service => "service",
        services => "services",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RestartAction {
    pub service: String,
    pub services: Vec<String>,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    RestartAction {
        service => "service",
        services => "services",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReloadAction {
    pub service: String,
    pub services: Vec<String>,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    ReloadAction {
        service => "service",
        services => "services",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

// -- expectations -------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomExpectationAction {
    pub service: String,
    pub name: String,
    pub custom: CustomExpectation,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    CustomExpectationAction {
        service => "service",
        name => "name",
        custom => "custom",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

/// A named, externally defined check with free-form parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomExpectation {
    pub name: String,
    pub parameters: BTreeMap<String, String>,
}

schema! {
    CustomExpectation {
        name => "name",
        parameters => "parameters",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsExpectationAction {
    pub service: String,
    pub name: String,
    pub metrics: MetricsExpectation,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    MetricsExpectationAction {
        service => "service",
        name => "name",
        metrics => "metrics",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsExpectation {
    /// Id of the bench whose metrics are checked.
    pub id: String,
    pub rules: Vec<MetricRule>,
}

schema! {
    MetricsExpectation {
        id => "id,default=last",
        rules => "rules",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricRule {
    pub metric: String,
    pub operator: String,
    pub value: f64,
}

schema! {
    MetricRule {
        metric => "metric",
        operator => "operator,enum=eq|ne|lt|gt|le|ge,default=eq",
        value => "value",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputExpectationAction {
    pub service: String,
    pub name: String,
    pub output: OutputExpectation,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    OutputExpectationAction {
        service => "service",
        name => "name",
        output => "output",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputExpectation {
    pub order: String,
    #[serde(rename = "match")]
    pub match_mode: String,
    #[serde(rename = "type")]
    pub output_type: String,
    pub messages: Vec<String>,
}

schema! {
    OutputExpectation {
        order => "order,enum=fixed|random,default=fixed",
        match_mode => "match,enum=exact|regexp,default=exact",
        output_type => "type,enum=stdout|stderr|any,default=any",
        messages => "messages",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseExpectationAction {
    pub service: String,
    pub name: String,
    pub response: ResponseExpectation,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    ResponseExpectationAction {
        service => "service",
        name => "name",
        response => "response",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseExpectation {
    /// Id of the request whose response is checked.
    pub request: String,
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
}

schema! {
    ResponseExpectation {
        request => "request,default=last",
        headers => "headers",
        body => "body,keys=content|pattern,string=content",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseBody {
    pub content: String,
    pub pattern: String,
    pub render_template: bool,
}

schema! {
    ResponseBody {
        content => "content",
        pattern => "pattern",
        render_template => "render_template,default=true",
    }
}

// -- composition --------------------------------------------------------------

/// Inverts the outcome of the wrapped action.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotAction {
    pub action: Box<Action>,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    NotAction {
        action => "action,factory=action",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParallelAction {
    pub service: String,
    pub actions: Vec<Action>,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    ParallelAction {
        service => "service",
        actions => "actions,factory=actions",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SequentialAction {
    pub service: String,
    pub name: String,
    pub actions: Vec<Action>,
    pub timeout: i32,
    pub when: String,
    pub on_failure: String,
}

schema! {
    SequentialAction {
        service => "service",
        name => "name",
        actions => "actions,factory=actions",
        timeout => TIMEOUT,
        when => WHEN,
        on_failure => ON_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs() {
        assert_eq!(Action::Bench(BenchAction::default()).verb(), "bench");
        assert_eq!(
            Action::OutputExpectation(OutputExpectationAction::default()).verb(),
            "expect"
        );
        assert_eq!(Action::default().verb(), "sequential");
    }

    #[test]
    fn not_reports_wrapped_service() {
        let inner = Action::Stop(StopAction {
            service: "fpm".into(),
            ..StopAction::default()
        });
        let not = Action::Not(NotAction {
            action: Box::new(inner),
            ..NotAction::default()
        });
        assert_eq!(not.service(), "fpm");
    }

    #[test]
    fn custom_name_targets_id_or_name() {
        let mut request = Action::Request(RequestAction::default());
        request.set_custom_name("login");
        let Action::Request(r) = &request else { unreachable!() };
        assert_eq!(r.id, "login");

        let mut expect = Action::ResponseExpectation(ResponseExpectationAction::default());
        expect.set_custom_name("body check");
        let Action::ResponseExpectation(e) = &expect else { unreachable!() };
        assert_eq!(e.name, "body check");

        let mut start = Action::Start(StartAction::default());
        start.set_custom_name("ignored");
        assert_eq!(start, Action::Start(StartAction::default()));
    }

    #[test]
    fn set_service_skips_not() {
        let mut not = Action::Not(NotAction::default());
        not.set_service("fpm");
        assert_eq!(not.service(), "");
    }
}
