/// Membership record canonicalization
///
/// Clients describe memberships in several JSON shapes. All of them reduce to
/// a [`MemberSpec`] of a username and a [`RoleKey`]:
///
/// | Input | Result |
/// |---|---|
/// | `"alice"` | alice, default role |
/// | `{"user": "alice"}` | alice, default role |
/// | `{"user": {"username": "alice"}}` | alice, default role |
/// | `{"username": "alice"}` | alice, default role |
/// | `..., "role": "Manager"` | role by name |
/// | `..., "role": "3"` or `"role": 3` | role by id |
/// | `..., "role": {"id": 3, "name": "x"}` | role by id (id wins) |
/// | `..., "role": {"name": "Manager"}` | role by name |
///
/// Anything else is `invalid_membership` with the offending record attached
/// as detail. That includes a nested `{"username": {"username": "x"}}`, a
/// record naming both `user` and `username`, and empty usernames.
///
/// # Example
///
/// ```
/// use depot_shared::canonical::{canonicalize, MemberSpec};
/// use depot_shared::models::role::RoleKey;
/// use serde_json::json;
///
/// let specs = canonicalize(&json!(["alice", {"user": "bob", "role": "Manager"}])).unwrap();
/// assert_eq!(specs[0], MemberSpec { user: "alice".into(), role: RoleKey::Id(4) });
/// assert_eq!(specs[1], MemberSpec { user: "bob".into(), role: RoleKey::Name("Manager".into()) });
///
/// let err = canonicalize(&json!({"username": {"username": "x"}})).unwrap_err();
/// assert_eq!(err.code(), "invalid_membership");
/// ```

use serde_json::{Map, Value};

use crate::error::DepotError;
use crate::models::role::RoleKey;

/// A membership request in canonical form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSpec {
    pub user: String,
    pub role: RoleKey,
}

/// The single operation a PATCH `members` value resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembersPatch {
    /// `{"add": [...]}`, a bare list, or a single record
    Add(Vec<MemberSpec>),

    /// `{"remove": [...]}`; roles are ignored
    Remove(Vec<MemberSpec>),

    /// `{"removeUser": "name"}`
    RemoveUser(String),
}

fn invalid(record: &Value) -> DepotError {
    DepotError::invalid("membership", Some(record.clone()))
}

/// Canonicalizes one record or a list of records
pub fn canonicalize(input: &Value) -> Result<Vec<MemberSpec>, DepotError> {
    match input {
        Value::Array(records) => records.iter().map(canonicalize_record).collect(),
        record => Ok(vec![canonicalize_record(record)?]),
    }
}

/// Canonicalizes exactly one record
pub fn canonicalize_record(record: &Value) -> Result<MemberSpec, DepotError> {
    match record {
        Value::String(username) => Ok(MemberSpec {
            user: non_empty(username, record)?,
            role: RoleKey::default(),
        }),
        Value::Object(fields) => Ok(MemberSpec {
            user: user_of(fields, record)?,
            role: role_of(fields.get("role"), record)?,
        }),
        _ => Err(invalid(record)),
    }
}

fn non_empty(username: &str, record: &Value) -> Result<String, DepotError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        Err(invalid(record))
    } else {
        Ok(trimmed.to_string())
    }
}

fn user_of(fields: &Map<String, Value>, record: &Value) -> Result<String, DepotError> {
    match (fields.get("user"), fields.get("username")) {
        (Some(Value::String(username)), None) => non_empty(username, record),
        (Some(Value::Object(user)), None) => match user.get("username") {
            Some(Value::String(username)) => non_empty(username, record),
            _ => Err(invalid(record)),
        },
        (None, Some(Value::String(username))) => non_empty(username, record),
        _ => Err(invalid(record)),
    }
}

fn role_of(role: Option<&Value>, record: &Value) -> Result<RoleKey, DepotError> {
    match role {
        None | Some(Value::Null) => Ok(RoleKey::default()),
        Some(Value::Number(_)) => role_id(role, record),
        Some(Value::String(name)) if !name.trim().is_empty() => Ok(RoleKey::parse(name)),
        Some(Value::Object(fields)) => match (fields.get("id"), fields.get("name")) {
            (Some(id), _) if !id.is_null() => role_id(Some(id), record),
            (_, Some(Value::String(name))) if !name.trim().is_empty() => {
                Ok(RoleKey::Name(name.clone()))
            }
            _ => Err(invalid(record)),
        },
        _ => Err(invalid(record)),
    }
}

fn role_id(id: Option<&Value>, record: &Value) -> Result<RoleKey, DepotError> {
    match id {
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(RoleKey::Id)
            .ok_or_else(|| invalid(record)),
        Some(Value::String(s)) => match RoleKey::parse(s) {
            RoleKey::Id(id) => Ok(RoleKey::Id(id)),
            RoleKey::Name(_) => Err(invalid(record)),
        },
        _ => Err(invalid(record)),
    }
}

/// Resolves a PATCH `members` value to exactly one operation
pub fn parse_members_patch(members: &Value) -> Result<MembersPatch, DepotError> {
    let Value::Object(fields) = members else {
        return Ok(MembersPatch::Add(canonicalize(members)?));
    };

    let operations: Vec<&str> = ["add", "remove", "removeUser"]
        .into_iter()
        .filter(|key| fields.contains_key(*key))
        .collect();

    match operations.as_slice() {
        [] => Ok(MembersPatch::Add(canonicalize(members)?)),
        [op] if fields.len() == 1 => match (*op, &fields[*op]) {
            ("add", list) => Ok(MembersPatch::Add(canonicalize(list)?)),
            ("remove", list) => Ok(MembersPatch::Remove(canonicalize(list)?)),
            (_, Value::String(username)) => {
                Ok(MembersPatch::RemoveUser(non_empty(username, members)?))
            }
            _ => Err(invalid(members)),
        },
        _ => Err(invalid(members)),
    }
}
