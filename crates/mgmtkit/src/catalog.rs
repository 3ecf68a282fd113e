//! Static metadata for every manageable resource kind.
//!
//! Each (verb, kind) pair maps to a [`Descriptor`] that says which fields
//! are mandatory, which are optional and with what default, which must be
//! sent as JSON, and which URI template the request goes to. The request
//! builder is generic over this data; kind-specific behaviour lives in
//! descriptor fields and fixups, never in per-kind code paths.
//!
//! The catalog is assembled once by [`Catalog::build`] and never mutated.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

// ============================================================================
// Verbs and methods
// ============================================================================

/// Operation requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    List,
    Show,
    Declare,
    Delete,
    Close,
    Purge,
    Publish,
    Get,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Show => "show",
            Self::Declare => "declare",
            Self::Delete => "delete",
            Self::Close => "close",
            Self::Purge => "purge",
            Self::Publish => "publish",
            Self::Get => "get",
        }
    }

    /// HTTP method used unless a descriptor overrides it.
    pub fn method(&self) -> Method {
        match self {
            Self::List | Self::Show => Method::Get,
            Self::Declare | Self::Publish => Method::Put,
            Self::Delete | Self::Close | Self::Purge => Method::Delete,
            // Fetching can consume messages, so it is not a GET
            Self::Get => Method::Post,
        }
    }

    /// Whether requests for this verb carry the field map as a JSON body.
    pub fn sends_body(&self) -> bool {
        matches!(self, Self::Declare | Self::Publish | Self::Get)
    }

    /// Read-only verbs whose URI is a plain collection path.
    pub fn is_listing(&self) -> bool {
        matches!(self, Self::List | Self::Show)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Fields
// ============================================================================

/// A mandatory entry: one name, or a group of which exactly one is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mandatory {
    Field(&'static str),
    OneOf(&'static [&'static str]),
}

impl Mandatory {
    pub fn names(&self) -> &[&'static str] {
        match self {
            Self::Field(name) => std::slice::from_ref(name),
            Self::OneOf(names) => names,
        }
    }
}

/// Default of an optional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// Leave the field out when not supplied.
    Omit,
    Str(&'static str),
    Int(i64),
    EmptyObject,
}

impl FieldDefault {
    pub fn value(&self) -> Option<Value> {
        match self {
            Self::Omit => None,
            Self::Str(s) => Some(Value::String((*s).to_string())),
            Self::Int(n) => Some(Value::from(*n)),
            Self::EmptyObject => Some(Value::Object(Map::new())),
        }
    }
}

/// Transform applied to the assembled field map before submission.
pub type Fixup = fn(&mut Map<String, Value>) -> Result<()>;

/// Placeholder derived from `destination_type` rather than supplied directly.
pub const DESTINATION_CHAR: &str = "destination_char";

// ============================================================================
// Descriptor
// ============================================================================

/// Metadata for one (verb, kind) pair.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub kind: &'static str,
    pub verb: Verb,
    pub method: Method,
    /// URI template below the API root, with `{name}` placeholders.
    pub uri: &'static str,
    pub mandatory: &'static [Mandatory],
    pub optional: &'static [(&'static str, FieldDefault)],
    /// Fields whose values are parsed as JSON.
    pub json: &'static [&'static str],
    /// Fields consumed by the client and never sent to the broker.
    pub client_only: &'static [&'static str],
    /// Listings only: append `/{vhost}` when a vhost is selected.
    pub vhost_scoped: bool,
    /// Listings only: columns shown when none are requested.
    pub columns: &'static [&'static str],
    pub fixup: Option<Fixup>,
}

impl Descriptor {
    fn new(verb: Verb, kind: &'static str, uri: &'static str) -> Self {
        Self {
            kind,
            verb,
            method: verb.method(),
            uri,
            mandatory: &[],
            optional: &[],
            json: &[],
            client_only: &[],
            vhost_scoped: false,
            columns: &[],
            fixup: None,
        }
    }

    fn mandatory(mut self, mandatory: &'static [Mandatory]) -> Self {
        self.mandatory = mandatory;
        self
    }

    fn optional(mut self, optional: &'static [(&'static str, FieldDefault)]) -> Self {
        self.optional = optional;
        self
    }

    fn json(mut self, json: &'static [&'static str]) -> Self {
        self.json = json;
        self
    }

    fn client_only(mut self, client_only: &'static [&'static str]) -> Self {
        self.client_only = client_only;
        self
    }

    fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    fn fixup(mut self, fixup: Fixup) -> Self {
        self.fixup = Some(fixup);
        self
    }

    fn listing(mut self, vhost_scoped: bool, columns: &'static [&'static str]) -> Self {
        self.vhost_scoped = vhost_scoped;
        self.columns = columns;
        self
    }

    /// Every field name the descriptor accepts, mandatory first.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.mandatory
            .iter()
            .flat_map(|m| m.names().iter().copied())
            .chain(self.optional.iter().map(|(name, _)| *name))
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.field_names().any(|n| n == name)
    }

    pub fn is_json(&self, name: &str) -> bool {
        self.json.contains(&name)
    }

    pub fn is_client_only(&self, name: &str) -> bool {
        self.client_only.contains(&name)
    }

    /// Placeholder names in the URI template, in order.
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.uri;
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    names.push(&after[..end]);
                    rest = &after[end + 1..];
                }
                None => break,
            }
        }
        names
    }
}

// ============================================================================
// Descriptor data
// ============================================================================

/// URI templates shared by declare and delete.
const URIS: &[(&str, &str)] = &[
    ("exchange", "/exchanges/{vhost}/{name}"),
    ("queue", "/queues/{vhost}/{name}"),
    (
        "binding",
        "/bindings/{vhost}/e/{source}/{destination_char}/{destination}",
    ),
    ("vhost", "/vhosts/{name}"),
    ("user", "/users/{name}"),
    ("permission", "/permissions/{vhost}/{user}"),
    ("parameter", "/parameters/{component}/{vhost}/{name}"),
    ("policy", "/policies/{vhost}/{name}"),
    ("operator_policy", "/operator-policies/{vhost}/{name}"),
    ("vhost_limit", "/vhost-limits/{vhost}/{name}"),
];

/// Binding delete needs the properties key to tell bindings apart.
const BINDING_DELETE_URI: &str =
    "/bindings/{vhost}/e/{source}/{destination_char}/{destination}/{properties_key}";

fn shared_uri(kind: &str) -> &'static str {
    URIS.iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, uri)| *uri)
        .unwrap_or_default()
}

use FieldDefault::{EmptyObject, Int, Omit, Str};
use Mandatory::{Field, OneOf};

const POLICY_MANDATORY: &[Mandatory] =
    &[Field("name"), Field("pattern"), Field("definition")];
const POLICY_OPTIONAL: &[(&str, FieldDefault)] = &[("priority", Int(0)), ("apply-to", Omit)];
const POLICY_JSON: &[&str] = &["definition", "priority"];

fn listings() -> Vec<Descriptor> {
    let list = |kind: &'static str, path: &'static str, vhost_scoped: bool, columns: &'static [&'static str]| {
        Descriptor::new(Verb::List, kind, path).listing(vhost_scoped, columns)
    };
    vec![
        list("connections", "/connections", false, &["name", "user", "channels"]),
        list("channels", "/channels", false, &["name", "user"]),
        list("consumers", "/consumers", true, &[]),
        list("exchanges", "/exchanges", true, &["name", "type"]),
        list("queues", "/queues", true, &["name", "messages"]),
        list(
            "bindings",
            "/bindings",
            true,
            &["source", "destination", "routing_key"],
        ),
        list("users", "/users", false, &[]),
        list("vhosts", "/vhosts", false, &["name", "messages"]),
        list("permissions", "/permissions", false, &[]),
        list("nodes", "/nodes", false, &["name", "type", "mem_used"]),
        list("parameters", "/parameters", false, &[]),
        list("policies", "/policies", false, &[]),
        list("operator_policies", "/operator-policies", false, &[]),
        list("vhost_limits", "/vhost-limits", false, &[]),
        Descriptor::new(Verb::Show, "overview", "/overview").listing(
            false,
            &[
                "rabbitmq_version",
                "cluster_name",
                "queue_totals.messages",
                "object_totals.queues",
            ],
        ),
    ]
}

fn declarables() -> Vec<Descriptor> {
    let declare = |kind: &'static str| Descriptor::new(Verb::Declare, kind, shared_uri(kind));
    vec![
        declare("exchange")
            .mandatory(&[Field("name"), Field("type")])
            .optional(&[
                ("auto_delete", Str("false")),
                ("durable", Str("true")),
                ("internal", Str("false")),
                ("arguments", EmptyObject),
            ])
            .json(&["arguments"]),
        declare("queue")
            .mandatory(&[Field("name")])
            .optional(&[
                ("auto_delete", Str("false")),
                ("durable", Str("true")),
                ("arguments", EmptyObject),
                ("node", Omit),
                ("queue_type", Omit),
            ])
            .json(&["arguments"])
            .fixup(fold_queue_type),
        // Bindings are created by POSTing to the collection
        declare("binding")
            .mandatory(&[Field("source"), Field("destination")])
            .optional(&[
                ("destination_type", Str("queue")),
                ("routing_key", Str("")),
                ("arguments", EmptyObject),
            ])
            .json(&["arguments"])
            .method(Method::Post),
        declare("vhost")
            .mandatory(&[Field("name")])
            .optional(&[("tracing", Omit)]),
        declare("user")
            .mandatory(&[
                Field("name"),
                OneOf(&["password", "password_hash"]),
                Field("tags"),
            ])
            .optional(&[("hashing_algorithm", Omit)]),
        declare("permission").mandatory(&[
            Field("vhost"),
            Field("user"),
            Field("configure"),
            Field("write"),
            Field("read"),
        ]),
        declare("parameter")
            .mandatory(&[Field("component"), Field("name"), Field("value")])
            .json(&["value"]),
        declare("policy")
            .mandatory(POLICY_MANDATORY)
            .optional(POLICY_OPTIONAL)
            .json(POLICY_JSON),
        declare("operator_policy")
            .mandatory(POLICY_MANDATORY)
            .optional(POLICY_OPTIONAL)
            .json(POLICY_JSON),
        declare("vhost_limit")
            .mandatory(&[Field("vhost"), Field("name"), Field("value")])
            .json(&["value"]),
    ]
}

fn deletables() -> Vec<Descriptor> {
    let delete = |kind: &'static str| Descriptor::new(Verb::Delete, kind, shared_uri(kind));
    vec![
        delete("exchange").mandatory(&[Field("name")]),
        delete("queue").mandatory(&[Field("name")]),
        Descriptor::new(Verb::Delete, "binding", BINDING_DELETE_URI)
            .mandatory(&[
                Field("source"),
                Field("destination_type"),
                Field("destination"),
            ])
            .optional(&[("properties_key", Str("~"))]),
        delete("vhost").mandatory(&[Field("name")]),
        delete("user").mandatory(&[Field("name")]),
        delete("permission").mandatory(&[Field("vhost"), Field("user")]),
        delete("parameter").mandatory(&[Field("component"), Field("name")]),
        delete("policy").mandatory(&[Field("name")]),
        delete("operator_policy").mandatory(&[Field("name")]),
        delete("vhost_limit").mandatory(&[Field("vhost"), Field("name")]),
    ]
}

fn extra_verbs() -> Vec<Descriptor> {
    vec![
        Descriptor::new(Verb::Close, "connection", "/connections/{name}")
            .mandatory(&[Field("name")]),
        Descriptor::new(Verb::Purge, "queue", "/queues/{vhost}/{name}/contents")
            .mandatory(&[Field("name")]),
        // The publish endpoint only accepts POST
        Descriptor::new(
            Verb::Publish,
            "message",
            "/exchanges/{vhost}/{exchange}/publish",
        )
        .mandatory(&[Field("routing_key")])
        .optional(&[
            ("payload", Omit),
            ("properties", EmptyObject),
            ("exchange", Str("amq.default")),
            ("payload_encoding", Str("string")),
        ])
        .json(&["properties"])
        .method(Method::Post),
        Descriptor::new(Verb::Get, "message", "/queues/{vhost}/{queue}/get")
            .mandatory(&[Field("queue")])
            .optional(&[
                ("count", Str("1")),
                ("ackmode", Str("ack_requeue_true")),
                ("payload_file", Omit),
                ("encoding", Str("auto")),
            ])
            .client_only(&["payload_file"]),
    ]
}

/// Fold `queue_type` into `arguments["x-queue-type"]`.
fn fold_queue_type(fields: &mut Map<String, Value>) -> Result<()> {
    let Some(queue_type) = fields.remove("queue_type") else {
        return Ok(());
    };

    let arguments = fields
        .entry("arguments")
        .or_insert_with(|| Value::Object(Map::new()));
    match arguments {
        Value::Object(map) => {
            map.insert("x-queue-type".to_string(), queue_type);
            Ok(())
        }
        _ => Err(Error::usage(
            "queue arguments must be a JSON object when queue_type is given",
        )),
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Read-only lookup from (verb, kind) to descriptor.
#[derive(Debug)]
pub struct Catalog {
    descriptors: Vec<Descriptor>,
}

static CATALOG: OnceLock<Catalog> = OnceLock::new();

impl Catalog {
    /// Assemble every descriptor.
    pub fn build() -> Self {
        let mut descriptors = listings();
        descriptors.extend(declarables());
        descriptors.extend(deletables());
        descriptors.extend(extra_verbs());
        Self { descriptors }
    }

    /// Process-wide catalog, built on first use.
    pub fn global() -> &'static Catalog {
        CATALOG.get_or_init(Catalog::build)
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Kinds available for a verb, in catalog order.
    pub fn kinds(&self, verb: Verb) -> Vec<&'static str> {
        self.descriptors
            .iter()
            .filter(|d| d.verb == verb)
            .map(|d| d.kind)
            .collect()
    }

    pub fn lookup(&self, verb: Verb, kind: &str) -> Result<&Descriptor> {
        self.descriptors
            .iter()
            .find(|d| d.verb == verb && d.kind == kind)
            .ok_or_else(|| Error::UnknownKind {
                verb: verb.to_string(),
                kind: kind.to_string(),
                known: self.kinds(verb).join(", "),
            })
    }

    /// The single descriptor of a verb that takes no kind (publish, get).
    pub fn lookup_verb(&self, verb: Verb) -> Result<&Descriptor> {
        self.descriptors
            .iter()
            .find(|d| d.verb == verb)
            .ok_or_else(|| Error::usage(format!("no descriptor for {verb}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
