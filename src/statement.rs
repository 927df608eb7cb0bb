//! Statement - an immutable fact tying an actor, verb, and object together,
//! plus the bidirectional mapping between the nested external xAPI shape and
//! the flat stored row.
//!
//! The mapping is two pure functions: [`extract`] (inbound) pulls natural keys
//! and creation defaults out of an external statement, and [`render`]
//! (outbound) reconstructs the external shape from a stored row and its three
//! resolved entities. Neither touches the database.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::actor::{self, Actor, NewActor};
use crate::object::{self, LearningObject, NewObject};
use crate::verb::{NewVerb, Verb};
use crate::{Error, Result};

/// Language tag used for display names in the external shape
pub const LANG: &str = "en-US";

/// A stored statement row. References its actor/verb/object by id; `result`
/// and `context` are opaque JSON payloads passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: i64,
    pub actor_id: i64,
    pub verb_id: i64,
    pub object_id: i64,
    pub result: Option<Value>,
    pub context: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub stored_at: DateTime<Utc>,
}

// ========== External (xAPI) shape ==========

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XapiActor {
    #[serde(rename = "objectType", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mbox: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XapiVerb {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XapiDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XapiObject {
    #[serde(rename = "objectType", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<XapiDefinition>,
}

/// The external statement shape, used both inbound (submitted by callers) and
/// outbound (reconstructed from stored rows, with defaults filled in).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XapiStatement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub actor: XapiActor,
    pub verb: XapiVerb,
    pub object: XapiObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// The inbound extraction result: one creation-default bundle per entity,
/// plus the pass-through payloads and the normalized event timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementParts {
    pub actor: NewActor,
    pub verb: NewVerb,
    pub object: NewObject,
    pub result: Option<Value>,
    pub context: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Parse a caller-supplied timestamp into UTC.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, and bare
/// dates (midnight UTC). Offset-less forms are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }
    Err(Error::UnparseableTimestamp(raw.to_string()))
}

fn lang_value(map: &Option<BTreeMap<String, String>>) -> Option<String> {
    map.as_ref().and_then(|m| m.get(LANG)).cloned()
}

fn lang_map(value: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert(LANG.to_string(), value.to_string());
    map
}

/// Inbound mapping: extract natural keys and creation defaults from an
/// external statement.
///
/// Fails with `MissingNaturalKey` when `actor.mbox`, `verb.id`, or
/// `object.id` is absent or empty, and `UnparseableTimestamp` when a supplied
/// timestamp does not parse. An absent timestamp becomes the current time.
pub fn extract(external: &XapiStatement) -> Result<StatementParts> {
    let mbox = match external.actor.mbox.as_deref() {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => return Err(Error::MissingNaturalKey("actor.mbox")),
    };
    let verb_iri = match external.verb.id.as_deref() {
        Some(i) if !i.is_empty() => i.to_string(),
        _ => return Err(Error::MissingNaturalKey("verb.id")),
    };
    let object_iri = match external.object.id.as_deref() {
        Some(i) if !i.is_empty() => i.to_string(),
        _ => return Err(Error::MissingNaturalKey("object.id")),
    };

    let timestamp = match external.timestamp.as_deref() {
        Some(raw) => parse_timestamp(raw)?,
        None => Utc::now(),
    };

    let definition = external.object.definition.as_ref();

    Ok(StatementParts {
        actor: NewActor {
            mbox,
            name: external.actor.name.clone(),
            object_type: external.actor.object_type.clone(),
            account_homepage: None,
            account_name: None,
        },
        verb: NewVerb {
            iri: verb_iri,
            name: lang_value(&external.verb.display),
        },
        object: NewObject {
            iri: object_iri,
            name: definition.and_then(|d| lang_value(&d.name)),
            activity_type: external.object.object_type.clone(),
            description: definition.and_then(|d| lang_value(&d.description)),
        },
        result: external.result.clone(),
        context: external.context.clone(),
        timestamp,
    })
}

/// Outbound mapping: reconstruct the external shape from a stored statement
/// and its three resolved entities. A defaults-filled superset of whatever
/// the caller originally supplied.
pub fn render(
    statement: &Statement,
    actor: &Actor,
    verb: &Verb,
    object: &LearningObject,
) -> XapiStatement {
    let object_type = if actor.object_type.is_empty() {
        actor::DEFAULT_OBJECT_TYPE.to_string()
    } else {
        actor.object_type.clone()
    };
    let activity_type = if object.activity_type.is_empty() {
        object::DEFAULT_OBJECT_TYPE.to_string()
    } else {
        object.activity_type.clone()
    };

    XapiStatement {
        id: Some(statement.id),
        actor: XapiActor {
            object_type: Some(object_type),
            name: (!actor.name.is_empty()).then(|| actor.name.clone()),
            mbox: Some(actor.mbox.clone()),
        },
        verb: XapiVerb {
            id: Some(verb.iri.clone()),
            display: (!verb.name.is_empty()).then(|| lang_map(&verb.name)),
        },
        object: XapiObject {
            object_type: Some(activity_type),
            id: Some(object.iri.clone()),
            definition: Some(XapiDefinition {
                name: (!object.name.is_empty()).then(|| lang_map(&object.name)),
                description: object
                    .description
                    .as_deref()
                    .map(lang_map),
            }),
        },
        result: statement.result.clone(),
        context: statement.context.clone(),
        timestamp: Some(statement.timestamp.to_rfc3339()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_external() -> XapiStatement {
        serde_json::from_value(json!({
            "actor": {"mbox": "mailto:a@x.com", "name": "A"},
            "verb": {"id": "urn:v", "display": {"en-US": "completed"}},
            "object": {"id": "urn:o", "definition": {"name": {"en-US": "Mod1"}}}
        }))
        .unwrap()
    }

    #[test]
    fn test_extract_natural_keys_and_defaults() {
        let parts = extract(&sample_external()).unwrap();
        assert_eq!(parts.actor.mbox, "mailto:a@x.com");
        assert_eq!(parts.actor.name.as_deref(), Some("A"));
        assert_eq!(parts.verb.iri, "urn:v");
        assert_eq!(parts.verb.name.as_deref(), Some("completed"));
        assert_eq!(parts.object.iri, "urn:o");
        assert_eq!(parts.object.name.as_deref(), Some("Mod1"));
        assert!(parts.result.is_none());
    }

    #[test]
    fn test_extract_rejects_missing_mbox() {
        let mut external = sample_external();
        external.actor.mbox = None;
        assert!(matches!(
            extract(&external),
            Err(Error::MissingNaturalKey("actor.mbox"))
        ));

        external.actor.mbox = Some(String::new());
        assert!(matches!(
            extract(&external),
            Err(Error::MissingNaturalKey("actor.mbox"))
        ));
    }

    #[test]
    fn test_extract_rejects_empty_verb_iri() {
        let mut external = sample_external();
        external.verb.id = Some(String::new());
        assert!(matches!(
            extract(&external),
            Err(Error::MissingNaturalKey("verb.id"))
        ));
    }

    #[test]
    fn test_extract_passes_payloads_through() {
        let mut external = sample_external();
        external.result = Some(json!({"success": true, "score": {"scaled": 0.85}}));
        external.context = Some(json!({"platform": "LMS"}));
        let parts = extract(&external).unwrap();
        assert_eq!(parts.result, external.result);
        assert_eq!(parts.context, external.context);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-01-15T10:30:00Z").is_ok());
        assert!(parse_timestamp("2024-01-15T10:30:00+02:00").is_ok());
        assert!(parse_timestamp("2024-01-15 10:30:00").is_ok());
        assert!(parse_timestamp("2024-01-15").is_ok());
        assert!(matches!(
            parse_timestamp("not-a-date"),
            Err(Error::UnparseableTimestamp(_))
        ));
    }

    #[test]
    fn test_extract_defaults_timestamp_to_now() {
        let before = Utc::now();
        let parts = extract(&sample_external()).unwrap();
        assert!(parts.timestamp >= before);
        assert!(parts.timestamp <= Utc::now());
    }

    #[test]
    fn test_render_fills_defaults() {
        let now = Utc::now();
        let statement = Statement {
            id: 1,
            actor_id: 1,
            verb_id: 1,
            object_id: 1,
            result: None,
            context: None,
            timestamp: now,
            stored_at: now,
        };
        let actor = Actor {
            id: 1,
            name: "A".to_string(),
            mbox: "mailto:a@x.com".to_string(),
            mbox_sha1sum: None,
            object_type: String::new(),
            account_homepage: None,
            account_name: None,
            created_at: now,
        };
        let verb = Verb {
            id: 1,
            name: "completed".to_string(),
            iri: "urn:v".to_string(),
            created_at: now,
        };
        let object = LearningObject {
            id: 1,
            name: "Mod1".to_string(),
            activity_type: String::new(),
            iri: "urn:o".to_string(),
            description: None,
            created_at: now,
        };

        let out = render(&statement, &actor, &verb, &object);
        assert_eq!(out.actor.object_type.as_deref(), Some("Agent"));
        assert_eq!(out.object.object_type.as_deref(), Some("Activity"));
        assert_eq!(out.verb.display.unwrap().get(LANG).unwrap(), "completed");
        let definition = out.object.definition.unwrap();
        assert_eq!(definition.name.unwrap().get(LANG).unwrap(), "Mod1");
        assert!(definition.description.is_none());
    }
}
