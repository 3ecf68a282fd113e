//! Request building.
//!
//! [`build`] turns a descriptor plus the `key=value` arguments of one
//! invocation into a [`Request`]. All validation happens here, so a request
//! that fails to build never reaches the network.

use crate::catalog::{DESTINATION_CHAR, Descriptor, Mandatory, Method};
use crate::config::Config;
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field name to raw value, as typed on the command line.
pub type FieldMap = BTreeMap<String, String>;

/// A request ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Path below the API root, already percent-encoded.
    pub path: String,
    pub body: Option<String>,
}

/// Parse positional `name=value` arguments. Later duplicates win.
pub fn parse_fields<I, S>(args: I) -> Result<FieldMap>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut fields = FieldMap::new();
    for arg in args {
        let arg = arg.as_ref();
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| Error::MalformedArgument(arg.to_string()))?;
        fields.insert(name.to_string(), value.to_string());
    }
    Ok(fields)
}

/// Build a declare/delete/close/purge/publish/get request.
pub fn build(descriptor: &Descriptor, fields: &FieldMap, config: &Config) -> Result<Request> {
    if let Some(unknown) = fields.keys().find(|name| !descriptor.accepts(name)) {
        return Err(Error::UnknownField(unknown.clone()));
    }
    validate_mandatory(descriptor, fields)?;

    let mut values = Map::new();
    for name in descriptor.field_names() {
        let value = match fields.get(name) {
            Some(raw) if descriptor.is_json(name) => parse_json_lenient(name, raw),
            Some(raw) => Value::String(raw.clone()),
            None => match default_for(descriptor, name) {
                Some(value) => value,
                None => continue,
            },
        };
        values.insert(name.to_string(), value);
    }

    if let Some(fixup) = descriptor.fixup {
        fixup(&mut values)?;
    }

    let path = expand_uri(descriptor, &values, config.target_vhost())?;

    let body = if descriptor.verb.sends_body() {
        let placeholders = descriptor.placeholders();
        let consumed = |name: &str| {
            placeholders.contains(&name)
                || (name == "destination_type" && placeholders.contains(&DESTINATION_CHAR))
        };
        let body: Map<String, Value> = values
            .into_iter()
            .filter(|(name, _)| !consumed(name) && !descriptor.is_client_only(name))
            .collect();
        Some(Value::Object(body).to_string())
    } else {
        None
    };

    log::debug!("{} {} {}: {}", descriptor.verb, descriptor.kind, descriptor.method, path);
    Ok(Request {
        method: descriptor.method,
        path,
        body,
    })
}

/// Build a list/show request.
///
/// `columns` are the columns asked for on the command line; they are sent
/// as the `columns` query parameter together with the sort options.
pub fn build_listing(descriptor: &Descriptor, columns: &[String], config: &Config) -> Result<Request> {
    if !descriptor.verb.is_listing() {
        return Err(Error::usage(format!(
            "{} {} is not a listing",
            descriptor.verb, descriptor.kind
        )));
    }

    let mut path = descriptor.uri.to_string();
    if descriptor.vhost_scoped {
        if let Some(vhost) = &config.vhost {
            path.push('/');
            path.push_str(&urlencoding::encode(vhost));
        }
    }

    let mut query = Vec::new();
    if !columns.is_empty() {
        let encoded: Vec<String> = columns
            .iter()
            .map(|c| urlencoding::encode(c).into_owned())
            .collect();
        query.push(format!("columns={}", encoded.join(",")));
    }
    if let Some(sort) = &config.sort {
        query.push(format!("sort={}", urlencoding::encode(sort)));
    }
    if config.sort_reverse {
        query.push("sort_reverse=true".to_string());
    }
    if !query.is_empty() {
        path.push('?');
        path.push_str(&query.join("&"));
    }

    log::debug!("{} {}: GET {}", descriptor.verb, descriptor.kind, path);
    Ok(Request {
        method: descriptor.method,
        path,
        body: None,
    })
}

/// Columns to request and display: explicit ones, else the descriptor's
/// defaults when the format is tabular.
pub fn listing_columns(descriptor: &Descriptor, requested: &[String], config: &Config) -> Vec<String> {
    if !requested.is_empty() {
        return requested.to_vec();
    }
    if config.format.uses_default_columns() {
        descriptor.columns.iter().map(|c| (*c).to_string()).collect()
    } else {
        Vec::new()
    }
}

fn validate_mandatory(descriptor: &Descriptor, fields: &FieldMap) -> Result<()> {
    for entry in descriptor.mandatory {
        match entry {
            Mandatory::Field(name) => {
                if !fields.contains_key(*name) {
                    return Err(Error::MissingField((*name).to_string()));
                }
            }
            Mandatory::OneOf(group) => {
                let supplied: Vec<&str> = group
                    .iter()
                    .copied()
                    .filter(|name| fields.contains_key(*name))
                    .collect();
                if supplied.len() != 1 {
                    return Err(Error::AlternativeFields {
                        group: group.join("|"),
                        supplied: if supplied.is_empty() {
                            "none".to_string()
                        } else {
                            supplied.join(", ")
                        },
                    });
                }
            }
        }
    }
    Ok(())
}

fn default_for(descriptor: &Descriptor, name: &str) -> Option<Value> {
    descriptor
        .optional
        .iter()
        .find(|(n, _)| *n == name)
        .and_then(|(_, default)| default.value())
}

/// Values that are not valid JSON are sent as plain strings.
///
/// This keeps `name=value` shorthand working for JSON fields, at the cost
/// of turning malformed JSON (a truncated object, say) into a string.
fn parse_json_lenient(name: &str, raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| {
        log::debug!("{} is not valid JSON, sending it as a string", name);
        Value::String(raw.to_string())
    })
}

fn expand_uri(descriptor: &Descriptor, values: &Map<String, Value>, vhost: &str) -> Result<String> {
    let template = descriptor.uri;
    let mut path = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        path.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| Error::usage(format!("malformed URI template {template}")))?;
        let raw = placeholder_value(&after[..end], values, vhost)?;
        path.push_str(&urlencoding::encode(&raw));
        rest = &after[end + 1..];
    }
    path.push_str(rest);

    Ok(path)
}

fn placeholder_value(name: &str, values: &Map<String, Value>, vhost: &str) -> Result<String> {
    if name == DESTINATION_CHAR {
        return match values.get("destination_type").and_then(Value::as_str) {
            Some("queue") => Ok("q".to_string()),
            Some("exchange") => Ok("e".to_string()),
            Some(other) => Err(Error::usage(format!(
                "destination_type must be queue or exchange, got {other}"
            ))),
            None => Err(Error::MissingField("destination_type".to_string())),
        };
    }

    match values.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(Error::usage(format!(
            "{name} cannot be used in a path: {other}"
        ))),
        None if name == "vhost" => Ok(vhost.to_string()),
        None => Err(Error::MissingField(name.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Verb};
    use crate::config::{OutputFormat, PartialConfig};
    use serde_json::json;

    fn config() -> Config {
        PartialConfig::defaults().finish().unwrap()
    }

    fn fields(args: &[&str]) -> FieldMap {
        parse_fields(args).unwrap()
    }

    fn declare(kind: &str, args: &[&str]) -> Result<Request> {
        let descriptor = Catalog::global().lookup(Verb::Declare, kind)?;
        build(descriptor, &fields(args), &config())
    }

    fn body(request: &Request) -> Value {
        serde_json::from_str(request.body.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn test_parse_fields() {
        let parsed = fields(&["name=q1", "arguments={\"a\":\"b=c\"}", "name=q2"]);
        assert_eq!(parsed["name"], "q2");
        assert_eq!(parsed["arguments"], "{\"a\":\"b=c\"}");
    }

    #[test]
    fn test_parse_fields_rejects_missing_equals() {
        let err = parse_fields(["name"]).unwrap_err();
        assert!(matches!(err, Error::MalformedArgument(_)));
    }

    #[test]
    fn test_declare_exchange() {
        let request = declare("exchange", &["name=ex1", "type=direct"]).unwrap();
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.path, "/exchanges/%2F/ex1");
        assert_eq!(
            body(&request),
            json!({
                "type": "direct",
                "auto_delete": "false",
                "durable": "true",
                "internal": "false",
                "arguments": {}
            })
        );
        assert_eq!(
            request.body.as_deref(),
            Some(r#"{"type":"direct","auto_delete":"false","durable":"true","internal":"false","arguments":{}}"#)
        );
    }

    #[test]
    fn test_explicit_value_overrides_default() {
        let request = declare("exchange", &["name=ex1", "type=fanout", "durable=false"]).unwrap();
        assert_eq!(body(&request)["durable"], "false");
        assert_eq!(body(&request)["internal"], "false");
    }

    #[test]
    fn test_missing_mandatory_field() {
        let err = declare("exchange", &["name=ex1"]).unwrap_err();
        match err {
            Error::MissingField(name) => assert_eq!(name, "type"),
            other => panic!("Expected Error::MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_field() {
        let err = declare("exchange", &["name=ex1", "type=direct", "colour=blue"]).unwrap_err();
        match err {
            Error::UnknownField(name) => assert_eq!(name, "colour"),
            other => panic!("Expected Error::UnknownField, got {other:?}"),
        }
    }

    #[test]
    fn test_alternative_group_needs_exactly_one() {
        let none = declare("user", &["name=bob", "tags=administrator"]).unwrap_err();
        assert!(matches!(none, Error::AlternativeFields { .. }));
        assert!(none.to_string().contains("password|password_hash"));

        let both = declare(
            "user",
            &["name=bob", "tags=", "password=s3cret", "password_hash=abc"],
        )
        .unwrap_err();
        assert!(matches!(both, Error::AlternativeFields { .. }));

        let request = declare("user", &["name=bob", "tags=", "password=s3cret"]).unwrap();
        assert_eq!(request.path, "/users/bob");
        assert_eq!(body(&request), json!({"password": "s3cret", "tags": ""}));

        let request = declare("user", &["name=bob", "tags=", "password_hash=abc"]).unwrap();
        assert_eq!(body(&request), json!({"password_hash": "abc", "tags": ""}));
    }

    #[test]
    fn test_json_field_object_and_string_fallback() {
        let request = declare(
            "parameter",
            &["component=federation", "name=p1", r#"value={"a":1}"#],
        )
        .unwrap();
        assert_eq!(request.path, "/parameters/federation/%2F/p1");
        assert_eq!(body(&request), json!({"value": {"a": 1}}));

        let request = declare("parameter", &["component=federation", "name=p1", "value=hello"]).unwrap();
        assert_eq!(body(&request), json!({"value": "hello"}));
    }

    #[test]
    fn test_policy_priority_default_is_number() {
        let request = declare(
            "policy",
            &["name=ha", "pattern=.*", r#"definition={"max-length":10}"#],
        )
        .unwrap();
        assert_eq!(request.path, "/policies/%2F/ha");
        assert_eq!(
            body(&request),
            json!({"pattern": ".*", "definition": {"max-length": 10}, "priority": 0})
        );

        let request = declare(
            "policy",
            &["name=ha", "pattern=.*", "definition={}", "priority=5", "apply-to=queues"],
        )
        .unwrap();
        assert_eq!(body(&request)["priority"], 5);
        assert_eq!(body(&request)["apply-to"], "queues");
    }

    #[test]
    fn test_queue_type_fixup() {
        let request = declare("queue", &["name=q1", "queue_type=classic"]).unwrap();
        assert_eq!(request.path, "/queues/%2F/q1");
        let body = body(&request);
        assert_eq!(body["arguments"]["x-queue-type"], "classic");
        assert!(body.get("queue_type").is_none());
        assert!(body.get("node").is_none());
    }

    #[test]
    fn test_binding_declare_uses_destination_char() {
        let request = declare(
            "binding",
            &["source=amq.topic", "destination=q1", "routing_key=a.#"],
        )
        .unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/bindings/%2F/e/amq.topic/q/q1");
        assert_eq!(body(&request), json!({"routing_key": "a.#", "arguments": {}}));

        let request = declare(
            "binding",
            &["source=ex1", "destination=ex2", "destination_type=exchange"],
        )
        .unwrap();
        assert_eq!(request.path, "/bindings/%2F/e/ex1/e/ex2");

        let err = declare(
            "binding",
            &["source=ex1", "destination=ex2", "destination_type=topic"],
        )
        .unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn test_binding_delete_uses_properties_key() {
        let descriptor = Catalog::global().lookup(Verb::Delete, "binding").unwrap();
        let first = build(
            descriptor,
            &fields(&[
                "source=ex1",
                "destination_type=queue",
                "destination=q1",
                "properties_key=rk.one",
            ]),
            &config(),
        )
        .unwrap();
        let second = build(
            descriptor,
            &fields(&[
                "source=ex1",
                "destination_type=queue",
                "destination=q1",
                "properties_key=rk.two",
            ]),
            &config(),
        )
        .unwrap();
        assert_eq!(first.method, Method::Delete);
        assert_eq!(first.path, "/bindings/%2F/e/ex1/q/q1/rk.one");
        assert_eq!(second.path, "/bindings/%2F/e/ex1/q/q1/rk.two");
        assert!(first.body.is_none());

        let default_key = build(
            descriptor,
            &fields(&["source=ex1", "destination_type=queue", "destination=q1"]),
            &config(),
        )
        .unwrap();
        assert_eq!(default_key.path, "/bindings/%2F/e/ex1/q/q1/~");
    }

    #[test]
    fn test_vhost_from_config_and_fields() {
        let mut config = config();
        config.vhost = Some("staging env".to_string());
        let descriptor = Catalog::global().lookup(Verb::Delete, "queue").unwrap();
        let request = build(descriptor, &fields(&["name=q/1"]), &config).unwrap();
        assert_eq!(request.path, "/queues/staging%20env/q%2F1");

        let descriptor = Catalog::global().lookup(Verb::Declare, "permission").unwrap();
        let request = build(
            descriptor,
            &fields(&[
                "vhost=other",
                "user=bob",
                "configure=.*",
                "write=.*",
                "read=.*",
            ]),
            &config,
        )
        .unwrap();
        assert_eq!(request.path, "/permissions/other/bob");
        assert_eq!(
            body(&request),
            json!({"configure": ".*", "write": ".*", "read": ".*"})
        );
    }

    #[test]
    fn test_declare_vhost_is_used_without_vhost_flag() {
        let mut config = config();
        config.declare_vhost = "dev".to_string();
        let descriptor = Catalog::global().lookup(Verb::Purge, "queue").unwrap();
        let request = build(descriptor, &fields(&["name=q1"]), &config).unwrap();
        assert_eq!(request.method, Method::Delete);
        assert_eq!(request.path, "/queues/dev/q1/contents");
        assert!(request.body.is_none());
    }

    #[test]
    fn test_close_connection() {
        let descriptor = Catalog::global().lookup(Verb::Close, "connection").unwrap();
        let request = build(
            descriptor,
            &fields(&["name=127.0.0.1:5000 -> 127.0.0.1:5672"]),
            &config(),
        )
        .unwrap();
        assert_eq!(
            request.path,
            "/connections/127.0.0.1%3A5000%20-%3E%20127.0.0.1%3A5672"
        );
    }

    #[test]
    fn test_publish() {
        let descriptor = Catalog::global().lookup_verb(Verb::Publish).unwrap();
        let request = build(
            descriptor,
            &fields(&["routing_key=q1", "payload=hello"]),
            &config(),
        )
        .unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/exchanges/%2F/amq.default/publish");
        assert_eq!(
            body(&request),
            json!({
                "routing_key": "q1",
                "payload": "hello",
                "properties": {},
                "payload_encoding": "string"
            })
        );
    }

    #[test]
    fn test_get_strips_client_only_fields() {
        let descriptor = Catalog::global().lookup_verb(Verb::Get).unwrap();
        let request = build(
            descriptor,
            &fields(&["queue=q1", "payload_file=/tmp/out.bin"]),
            &config(),
        )
        .unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/queues/%2F/q1/get");
        assert_eq!(
            body(&request),
            json!({"count": "1", "ackmode": "ack_requeue_true", "encoding": "auto"})
        );
    }

    #[test]
    fn test_listing_paths() {
        let catalog = Catalog::global();
        let mut config = config();

        let queues = catalog.lookup(Verb::List, "queues").unwrap();
        let request = build_listing(queues, &[], &config).unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, "/queues");

        config.vhost = Some("/".to_string());
        config.sort = Some("messages".to_string());
        config.sort_reverse = true;
        let columns = vec!["name".to_string(), "messages".to_string()];
        let request = build_listing(queues, &columns, &config).unwrap();
        assert_eq!(
            request.path,
            "/queues/%2F?columns=name,messages&sort=messages&sort_reverse=true"
        );

        let users = catalog.lookup(Verb::List, "users").unwrap();
        let request = build_listing(users, &[], &config).unwrap();
        assert_eq!(request.path, "/users?sort=messages&sort_reverse=true");
    }

    #[test]
    fn test_build_listing_rejects_mutations() {
        let descriptor = Catalog::global().lookup(Verb::Delete, "queue").unwrap();
        assert!(build_listing(descriptor, &[], &config()).is_err());
    }

    #[test]
    fn test_listing_columns() {
        let descriptor = Catalog::global().lookup(Verb::List, "queues").unwrap();
        let mut config = config();
        assert_eq!(
            listing_columns(descriptor, &[], &config),
            vec!["name".to_string(), "messages".to_string()]
        );
        let requested = vec!["durable".to_string()];
        assert_eq!(listing_columns(descriptor, &requested, &config), requested);

        config.format = OutputFormat::RawJson;
        assert!(listing_columns(descriptor, &[], &config).is_empty());
    }
}
