//! Subcommand handlers.
//!
//! Each handler returns a JSON value; `main` prints it.

use anyhow::{Result, bail};
use fabryk_rbac::{Assignment, Item, RbacStore, Rule};
use serde_json::{Value, json};

use crate::Command;

fn item_json(item: &Item) -> Value {
    json!({
        "name": item.name,
        "type": item.kind.as_str(),
        "description": item.description,
        "rule": item.rule_name,
        "data": item.data.as_deref().map(String::from_utf8_lossy),
        "created_at": item.created_at.map(|t| t.to_rfc3339()),
        "updated_at": item.updated_at.map(|t| t.to_rfc3339()),
    })
}

fn rule_json(rule: &Rule) -> Value {
    json!({
        "name": rule.name,
        "data": rule.data.as_deref().map(String::from_utf8_lossy),
        "created_at": rule.created_at.map(|t| t.to_rfc3339()),
        "updated_at": rule.updated_at.map(|t| t.to_rfc3339()),
    })
}

fn assignment_json(assignment: &Assignment) -> Value {
    json!({
        "user": assignment.user_id,
        "role": assignment.role_name,
        "created_at": assignment.created_at.to_rfc3339(),
    })
}

fn items_json(items: &[Item]) -> Value {
    Value::Array(items.iter().map(item_json).collect())
}

/// Execute one subcommand against `store`.
pub(crate) async fn run(store: &RbacStore, command: Command) -> Result<Value> {
    let output = match command {
        Command::Items { kind } => items_json(&store.get_items(kind).await?),
        Command::Item { name } => match store.get_item(&name).await? {
            Some(item) => item_json(&item),
            None => bail!("item '{name}' not found"),
        },
        Command::Rules => Value::Array(store.get_rules().await?.iter().map(rule_json).collect()),
        Command::Children { item } => items_json(&store.get_children(&item).await?),
        Command::Parents { item } => items_json(&store.get_parents(&item).await?),
        Command::Roles { user } => Value::Array(
            store
                .get_assignments(&user)
                .await?
                .iter()
                .map(assignment_json)
                .collect(),
        ),
        Command::Users { role } => json!(store.get_user_ids_by_role(&role).await?),
        Command::Assign { role, user } => assignment_json(&store.assign(&role, &user).await?),
        Command::Revoke { role, user } => {
            json!({ "revoked": store.revoke(&role, &user).await? })
        }
        Command::RevokeAll { user } => json!({ "revoked": store.revoke_all(&user).await? }),
        Command::RemoveItems { kind } => {
            json!({ "removed": store.remove_all_items(kind).await? })
        }
        Command::RemoveRules => json!({ "removed": store.remove_all_rules().await? }),
        Command::PurgeAssignments => {
            json!({ "removed": store.remove_all_assignments().await? })
        }
        Command::Reset { yes } => {
            if !yes {
                bail!("refusing to delete '{}*' without --yes", store.keys().namespace());
            }
            json!({ "removed": store.remove_all().await? })
        }
    };
    Ok(output)
}
