//! The actions grammar.
//!
//! Each entry of an `actions` list is either a bare string or a map with a
//! single compound key `verb[/service[/name]]`:
//!
//! ```yaml
//! actions:
//!   - bench/fpm                 # bench and execute only, verb/service
//!   - start/fpm:
//!       timeout: 5000
//!   - request/fpm/login:        # third segment is the request id
//!       path: /login
//!   - expect/fpm:
//!       response:
//!         body: "welcome"
//!   - not:
//!       action:
//!         expect/fpm:
//!           output:
//!             messages: ["error"]
//!   - parallel:
//!       - stop/fpm
//!       - stop/nginx
//! ```
//!
//! The key picks the variant; the payload is walked into it like any other
//! struct, so payload defaults and directives apply.

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::RigfileError;
use crate::factory::downcast;
use crate::schema::Node;
use crate::types::{
    Action, BenchAction, CustomExpectationAction, ExecuteAction, MetricsExpectationAction,
    NotAction, OutputExpectationAction, ParallelAction, ReloadAction, RequestAction,
    ResponseExpectationAction, RestartAction, SequentialAction, StartAction, StopAction,
};
use crate::walker::{Walker, mismatch, value_kind};

/// Payload keys every expectation accepts besides its type key.
const EXPECTATION_KEYS: &[&str] = &["service", "timeout", "when", "name", "on_failure"];

const EXPECTATION_TYPES: &[&str] = &["custom", "metrics", "output", "response"];

/// Factory for a list of actions.
pub(crate) fn create_actions(
    w: &mut Walker<'_>,
    data: &Value,
    target: &mut dyn Node,
) -> Result<(), RigfileError> {
    let items = data.as_array().ok_or_else(|| mismatch("list", data))?;
    let actions: &mut Vec<Action> = downcast(target, "actions")?;
    actions.clear();
    w.location_mut().start_array();
    for (index, item) in items.iter().enumerate() {
        w.location_mut().set_index(index);
        let action = parse_action(w, item)?;
        actions.push(action);
    }
    w.location_mut().end_array();
    Ok(())
}

/// Factory for a single nested action.
pub(crate) fn create_action(
    w: &mut Walker<'_>,
    data: &Value,
    target: &mut dyn Node,
) -> Result<(), RigfileError> {
    let slot: &mut Box<Action> = downcast(target, "action")?;
    **slot = parse_action(w, data)?;
    Ok(())
}

/// Parse one action entry.
pub fn parse_action(w: &mut Walker<'_>, entry: &Value) -> Result<Action, RigfileError> {
    w.descend(|w| match entry {
        Value::String(raw) => parse_shorthand(w, raw),
        Value::Object(map) => match (map.len(), map.iter().next()) {
            (1, Some((key, payload))) => parse_keyed(w, key, payload),
            (0, _) => Err(invalid("{}", "empty action map")),
            (n, _) => {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                Err(invalid(
                    &keys.join(", "),
                    format!("action map must have exactly one key, got {n}"),
                ))
            }
        },
        other => Err(RigfileError::UnsupportedActionType(value_kind(other))),
    })
}

/// `verb/service`, for the verbs that need no payload.
fn parse_shorthand(w: &mut Walker<'_>, raw: &str) -> Result<Action, RigfileError> {
    let segments: Vec<&str> = raw.split('/').collect();
    let &[verb, service] = segments.as_slice() else {
        return Err(invalid(
            raw,
            format!(
                "string action must be verb/service, got {} segments",
                segments.len()
            ),
        ));
    };
    if verb.is_empty() || service.is_empty() {
        return Err(invalid(raw, "empty segment"));
    }
    let action = match verb {
        "bench" => Action::Bench(BenchAction::default()),
        "execute" => Action::Execute(ExecuteAction::default()),
        _ => return Err(RigfileError::UnknownAction(raw.to_string())),
    };
    let mut action = build(w, action, &Value::Object(Map::new()))?;
    action.set_service(service);
    trace!(action = raw, "parsed shorthand action");
    Ok(action)
}

struct ActionKey<'k> {
    raw: &'k str,
    verb: &'k str,
    service: Option<&'k str>,
    name: Option<&'k str>,
}

impl<'k> ActionKey<'k> {
    fn parse(raw: &'k str) -> Result<Self, RigfileError> {
        let segments: Vec<&str> = raw.split('/').collect();
        if segments.len() > 3 {
            return Err(invalid(
                raw,
                format!("expected verb[/service[/name]], got {} segments", segments.len()),
            ));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid(raw, "empty segment"));
        }
        Ok(Self {
            raw,
            verb: segments[0],
            service: segments.get(1).copied(),
            name: segments.get(2).copied(),
        })
    }

    fn require_service(&self) -> Result<&'k str, RigfileError> {
        self.service.ok_or_else(|| {
            invalid(self.raw, format!("service name required for action {}", self.verb))
        })
    }

    fn forbid_service(&self) -> Result<(), RigfileError> {
        match self.service {
            Some(_) => Err(invalid(
                self.raw,
                format!("service name not allowed for action {}", self.verb),
            )),
            None => Ok(()),
        }
    }

    fn forbid_name(&self) -> Result<(), RigfileError> {
        match self.name {
            Some(_) => Err(invalid(
                self.raw,
                format!("custom name not allowed for action {}", self.verb),
            )),
            None => Ok(()),
        }
    }
}

fn parse_keyed(w: &mut Walker<'_>, raw: &str, payload: &Value) -> Result<Action, RigfileError> {
    let key = ActionKey::parse(raw)?;
    trace!(action = raw, "parsing action");
    let action = match key.verb {
        "expect" => return parse_expectation(w, &key, payload),
        "not" => {
            key.forbid_service()?;
            let map = payload.as_object().ok_or_else(|| mismatch("map", payload))?;
            if !map.contains_key("action") {
                return Err(invalid(raw, "not requires a nested action"));
            }
            return build(w, Action::Not(NotAction::default()), payload);
        }
        "parallel" => {
            key.forbid_name()?;
            build_group(w, Action::Parallel(ParallelAction::default()), payload)?
        }
        "sequential" => build_group(w, Action::Sequential(SequentialAction::default()), payload)?,
        "start" | "stop" | "restart" | "reload" => {
            key.require_service()?;
            key.forbid_name()?;
            let action = match key.verb {
                "start" => Action::Start(StartAction::default()),
                "stop" => Action::Stop(StopAction::default()),
                "restart" => Action::Restart(RestartAction::default()),
                _ => Action::Reload(ReloadAction::default()),
            };
            build(w, action, payload)?
        }
        "request" | "bench" | "execute" => {
            key.require_service()?;
            let action = match key.verb {
                "request" => Action::Request(RequestAction::default()),
                "bench" => Action::Bench(BenchAction::default()),
                _ => Action::Execute(ExecuteAction::default()),
            };
            build(w, action, payload)?
        }
        _ => return Err(RigfileError::UnknownAction(raw.to_string())),
    };
    Ok(apply_key(action, &key))
}

fn parse_expectation(
    w: &mut Walker<'_>,
    key: &ActionKey<'_>,
    payload: &Value,
) -> Result<Action, RigfileError> {
    let map = match payload {
        Value::Null => return Err(RigfileError::MissingExpectationType),
        Value::Object(map) => map,
        other => return Err(mismatch("map", other)),
    };
    let mut kind: Option<&str> = None;
    for name in map.keys() {
        if EXPECTATION_KEYS.contains(&name.as_str()) {
            continue;
        }
        if !EXPECTATION_TYPES.contains(&name.as_str()) {
            return Err(RigfileError::InvalidExpectationKey(name.clone()));
        }
        if let Some(first) = kind {
            return Err(RigfileError::MultipleExpectationTypes {
                first: first.to_string(),
                second: name.clone(),
            });
        }
        kind = Some(name);
    }
    let action = match kind {
        Some("custom") => Action::CustomExpectation(CustomExpectationAction::default()),
        Some("metrics") => Action::MetricsExpectation(MetricsExpectationAction::default()),
        Some("output") => Action::OutputExpectation(OutputExpectationAction::default()),
        Some("response") => Action::ResponseExpectation(ResponseExpectationAction::default()),
        _ => return Err(RigfileError::MissingExpectationType),
    };
    let action = build(w, action, payload)?;
    Ok(apply_key(action, key))
}

/// Walk `payload` into `action`. A missing payload yields the defaults.
fn build(w: &mut Walker<'_>, mut action: Action, payload: &Value) -> Result<Action, RigfileError> {
    match payload {
        Value::Null => w.assign(&Value::Object(Map::new()), &mut action)?,
        Value::Object(_) => w.assign(payload, &mut action)?,
        other => return Err(mismatch("map", other)),
    }
    Ok(action)
}

/// Groups also accept a bare list as their `actions`.
fn build_group(w: &mut Walker<'_>, action: Action, payload: &Value) -> Result<Action, RigfileError> {
    match payload {
        Value::Array(_) => {
            let wrapped = Value::Object(Map::from_iter([("actions".to_string(), payload.clone())]));
            build(w, action, &wrapped)
        }
        _ => build(w, action, payload),
    }
}

/// Service and name segments from the key win over the payload.
fn apply_key(mut action: Action, key: &ActionKey<'_>) -> Action {
    if let Some(service) = key.service {
        action.set_service(service);
    }
    if let Some(name) = key.name {
        action.set_custom_name(name);
    }
    action
}

fn invalid(action: &str, reason: impl Into<String>) -> RigfileError {
    RigfileError::InvalidAction {
        action: action.to_string(),
        reason: reason.into(),
    }
}
