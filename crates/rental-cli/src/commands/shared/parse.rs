use serde::de::DeserializeOwned;

/// Parse a `snake_case` enum value through serde. Hyphens are accepted in
/// place of underscores.
pub fn parse_enum<T>(raw: &str, field: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let normalized = raw.replace('-', "_");
    serde_json::from_value(serde_json::Value::String(normalized))
        .map_err(|error| anyhow::anyhow!("invalid {field} '{raw}': {error}"))
}

/// Event types are stored upper-case; accept any case on the command line.
pub fn parse_event_type(raw: &str) -> anyhow::Result<rental_core::enums::EventType> {
    parse_enum(&raw.to_ascii_uppercase(), "event type")
}
