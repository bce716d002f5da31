use serde_json::Value;
use tracing::debug;

use super::Category;
use crate::value::ConfigDocument;
use crate::Error;

/// Replaces the `Topics` array of the descriptor named `name` in place.
///
/// Only the in-memory document changes; nothing is written to the store.
pub(crate) fn replace_topics(
    doc: &mut ConfigDocument,
    category: Category,
    name: &str,
    topics: &[String],
) -> Result<(), Error> {
    if !category.has_topics() {
        return Err(Error::Unsupported(format!("topics on {category}")));
    }

    let elements = doc
        .json_mut()
        .get_mut(category.array_key())
        .and_then(Value::as_array_mut)
        .filter(|a| !a.is_empty())
        .ok_or(Error::EmptyCategory(category))?;

    let descriptor = elements
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .find(|obj| obj.get("Name").and_then(Value::as_str) == Some(name))
        .ok_or_else(|| Error::InterfaceNotFound {
            category,
            name: name.to_string(),
        })?;

    descriptor.insert(
        "Topics".to_string(),
        Value::Array(topics.iter().cloned().map(Value::String).collect()),
    );
    debug!(%category, name, count = topics.len(), "replaced topics");
    Ok(())
}
