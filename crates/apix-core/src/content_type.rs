use serde_json::{Map, Value};

pub const APPLICATION_JSON: &str = "application/json";

/// Pick the media type to describe a body: `application/json` when present,
/// otherwise the first entry in document order.
pub fn choose_content_type(content: Option<&Map<String, Value>>) -> Option<(&str, &Value)> {
    let content = content?;
    content
        .get_key_value(APPLICATION_JSON)
        .or_else(|| content.iter().next())
        .map(|(media_type, media)| (media_type.as_str(), media))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn content(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_json_wins_regardless_of_position() {
        let map = content(json!({
            "text/plain": {"schema": {"type": "string"}},
            "application/json": {"schema": {"type": "object"}},
        }));
        let (media_type, media) = choose_content_type(Some(&map)).unwrap();
        assert_eq!(media_type, "application/json");
        assert_eq!(media["schema"]["type"], "object");
    }

    #[test]
    fn test_falls_back_to_first_entry() {
        let map = content(json!({
            "text/plain": {"schema": {"type": "string"}},
            "application/xml": {},
        }));
        let (media_type, media) = choose_content_type(Some(&map)).unwrap();
        assert_eq!(media_type, "text/plain");
        assert_eq!(media["schema"]["type"], "string");
    }

    #[test]
    fn test_empty_or_absent_selects_nothing() {
        assert!(choose_content_type(Some(&Map::new())).is_none());
        assert!(choose_content_type(None).is_none());
    }
}
