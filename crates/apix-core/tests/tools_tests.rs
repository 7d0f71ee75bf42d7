mod common;

use apix_core::index::MatchFields;
use apix_core::tools::{
    DEFAULT_SEARCH_LIMIT, ToolOutput, get_request_schema, get_response_schema, search_operations,
};
use apix_core::{DerefLimits, ErrorCode, OpenApiStore};
use serde_json::{Value, json};
use tempfile::TempDir;

use common::{CYCLE_REF, DUPLICATE, EDGE_CASES, MINIMAL, UNREACHABLE_BASE_URL, cached_store};

fn error_of<T: std::fmt::Debug>(output: ToolOutput<T>) -> (ErrorCode, Value) {
    match output {
        ToolOutput::Err(envelope) => (
            envelope.error.code,
            Value::Object(envelope.error.details),
        ),
        ToolOutput::Ok(value) => panic!("expected an error envelope, got {value:?}"),
    }
}

fn ok_of<T>(output: ToolOutput<T>) -> T {
    match output {
        ToolOutput::Ok(value) => value,
        ToolOutput::Err(envelope) => panic!("expected a result, got {:?}", envelope.error),
    }
}

#[test]
fn search_returns_matching_operations() {
    let (_dir, mut store) = cached_store(MINIMAL);
    let found = ok_of(search_operations(
        &mut store,
        "ping",
        None,
        Some("GET"),
        DEFAULT_SEARCH_LIMIT,
    ));
    assert_eq!(found[0].operation_id, "ping");
    assert_eq!(found.len(), 2);
}

#[test]
fn search_accepts_partial_match_fields() {
    let (_dir, mut store) = cached_store(MINIMAL);
    let fields: MatchFields = serde_json::from_value(json!({"path": false})).unwrap();
    let found = ok_of(search_operations(&mut store, "/ping", Some(fields), None, 10));
    assert!(found.is_empty());
}

#[test]
fn search_rejects_non_positive_limit_without_loading() {
    // No cache and an unreachable server: the limit check must come first.
    let dir = TempDir::new().unwrap();
    let mut store = OpenApiStore::new(UNREACHABLE_BASE_URL, dir.path());
    for limit in [0, -3] {
        let (code, details) = error_of(search_operations(&mut store, "", None, None, limit));
        assert_eq!(code, ErrorCode::BadInput);
        assert_eq!(details["limit"], limit);
    }
}

#[test]
fn search_serializes_as_plain_array() {
    let (_dir, mut store) = cached_store(MINIMAL);
    let output = search_operations(&mut store, "deleteUser", None, None, 1);
    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(value[0]["operationId"], "deleteUser");
    assert_eq!(value[0]["method"], "DELETE");
}

#[test]
fn unreachable_server_yields_fetch_failed_envelope() {
    let dir = TempDir::new().unwrap();
    let mut store = OpenApiStore::new(UNREACHABLE_BASE_URL, dir.path());
    let output = search_operations(&mut store, "", None, None, 5);
    let value = serde_json::to_value(&output).unwrap();
    assert_eq!(value["error"]["code"], "OPENAPI_FETCH_FAILED");
    assert_eq!(value["error"]["details"]["baseUrl"], UNREACHABLE_BASE_URL);
    assert!(value["error"]["message"].as_str().unwrap().contains("openapi.json"));
}

#[test]
fn duplicate_ids_yield_invalid_document_envelope() {
    let (_dir, mut store) = cached_store(DUPLICATE);
    let (code, details) = error_of(search_operations(&mut store, "", None, None, 5));
    assert_eq!(code, ErrorCode::OpenApiInvalid);
    assert_eq!(details["operationId"], "dup");
}

#[test]
fn request_schema_merges_path_item_and_operation_parameters() {
    let (_dir, mut store) = cached_store(MINIMAL);
    let req = ok_of(get_request_schema(
        &mut store,
        "getUser",
        DerefLimits::default(),
    ));

    assert_eq!(req.method.as_str(), "GET");
    assert_eq!(req.path, "/users/{id}");
    // The operation-level definition wins over the path-item one.
    assert_eq!(
        req.params.path.properties["id"],
        json!({"type": "string", "format": "uuid"})
    );
    assert_eq!(req.params.path.required, ["id"]);
    assert_eq!(req.params.query.required, ["verbose"]);
    assert!(req.params.header.properties.is_empty());
    assert!(req.components.is_none());
}

#[test]
fn request_schema_reads_parameter_schema_from_content() {
    let (_dir, mut store) = cached_store(MINIMAL);
    let req = ok_of(get_request_schema(
        &mut store,
        "listUsers",
        DerefLimits::default(),
    ));

    assert_eq!(
        req.params.header.properties["X-Trace"],
        json!({"type": "string"})
    );
    assert!(req.params.header.required.is_empty());
    assert_eq!(
        req.params.query.properties["limit"],
        json!({"type": "integer", "minimum": 1})
    );
    assert!(req.params.query.required.is_empty());
    // `in: body` and non-object entries are skipped.
    assert_eq!(req.params.query.properties.len(), 1);
}

#[test]
fn request_schema_prefers_json_body_and_inlines_refs() {
    let (_dir, mut store) = cached_store(MINIMAL);
    let req = ok_of(get_request_schema(
        &mut store,
        "createUser",
        DerefLimits::default(),
    ));

    assert_eq!(
        req.body.selected_content_type.as_deref(),
        Some("application/json")
    );
    assert!(req.body.required);
    assert_eq!(
        req.body.schema,
        json!({
            "type": "object",
            "properties": {"name": {"type": "string", "minLength": 1}}
        })
    );
    assert!(req.components.is_none());
}

#[test]
fn request_schema_without_body_serializes_empty_body() {
    let (_dir, mut store) = cached_store(MINIMAL);
    let output = get_request_schema(&mut store, "deleteUser", DerefLimits::default());
    let value = serde_json::to_value(&output).unwrap();

    assert_eq!(
        value["body"],
        json!({"selectedContentType": null, "required": false, "schema": {}})
    );
    assert_eq!(
        value["params"]["cookie"],
        json!({"type": "object", "properties": {}, "required": []})
    );
    assert_eq!(value["params"]["path"]["required"], json!(["id"]));
    assert!(value.get("components").is_none());
}

#[test]
fn request_schema_null_body_is_treated_as_absent() {
    let (_dir, mut store) = cached_store(EDGE_CASES);
    let req = ok_of(get_request_schema(
        &mut store,
        "bodyIsNull",
        DerefLimits::default(),
    ));
    assert_eq!(req.body.selected_content_type, None);
    assert!(!req.body.required);
}

#[test]
fn request_schema_unknown_operation() {
    let (_dir, mut store) = cached_store(MINIMAL);
    let (code, details) = error_of(get_request_schema(
        &mut store,
        "nope",
        DerefLimits::default(),
    ));
    assert_eq!(code, ErrorCode::OperationNotFound);
    assert_eq!(details["operationId"], "nope");
}

#[test]
fn request_schema_error_codes() {
    let (_dir, mut store) = cached_store(EDGE_CASES);
    let cases = [
        ("paramWithoutSchema", ErrorCode::ParamSchemaMissing),
        ("bodyWithoutContent", ErrorCode::RequestBodyMissing),
        ("bodyWithEmptyContent", ErrorCode::RequestBodyMissing),
        ("bodyWithoutSchema", ErrorCode::RequestBodySchemaMissing),
        ("bodyNotAnObject", ErrorCode::RequestBodyInvalid),
    ];
    for (operation_id, expected) in cases {
        let (code, _) = error_of(get_request_schema(
            &mut store,
            operation_id,
            DerefLimits::default(),
        ));
        assert_eq!(code, expected, "{operation_id}");
    }
}

#[test]
fn request_schema_error_details() {
    let (_dir, mut store) = cached_store(EDGE_CASES);

    let (_, details) = error_of(get_request_schema(
        &mut store,
        "paramWithoutSchema",
        DerefLimits::default(),
    ));
    assert_eq!(details, json!({"name": "q", "in": "query"}));

    let (_, details) = error_of(get_request_schema(
        &mut store,
        "bodyWithoutSchema",
        DerefLimits::default(),
    ));
    assert_eq!(details, json!({"contentType": "application/json"}));
}

#[test]
fn request_schema_without_refs_omits_components() {
    let (_dir, mut store) = cached_store(CYCLE_REF);
    // The parameters of get_user hold no refs.
    let req = ok_of(get_request_schema(
        &mut store,
        "get_user",
        DerefLimits::default(),
    ));
    assert!(req.components.is_none());
    assert_eq!(req.params.path.required, ["id"]);
}

#[test]
fn request_schema_with_cycle_ships_components() {
    let (_dir, mut store) = cached_store(CYCLE_REF);
    let req = ok_of(get_request_schema(
        &mut store,
        "put_user",
        DerefLimits::default(),
    ));

    assert!(req.body.required);
    assert_eq!(req.body.schema["properties"]["id"], json!({"type": "string"}));
    assert_eq!(
        req.body.schema["properties"]["manager"],
        json!({"$ref": "#/components/schemas/User"})
    );
    let components = req.components.expect("components should be attached");
    assert_eq!(components["schemas"]["User"]["type"], "object");

    let value = serde_json::to_value(
        get_request_schema(&mut store, "put_user", DerefLimits::default()),
    )
    .unwrap();
    assert!(value["components"]["schemas"]["User"].is_object());
}

#[test]
fn response_schema_keeps_status_order_and_placeholders() {
    let (_dir, mut store) = cached_store(MINIMAL);
    let resp = ok_of(get_response_schema(
        &mut store,
        "createUser",
        DerefLimits::default(),
    ));

    let codes: Vec<&str> = resp.responses.keys().map(String::as_str).collect();
    assert_eq!(codes, ["201", "400", "default"]);

    let created = &resp.responses["201"];
    assert_eq!(
        created.selected_content_type.as_deref(),
        Some("application/json")
    );
    assert_eq!(created.schema["required"], json!(["id"]));
    assert_eq!(
        created.schema["properties"]["name"],
        json!({"type": "string", "minLength": 1})
    );

    for code in ["400", "default"] {
        assert_eq!(resp.responses[code].selected_content_type, None);
        assert_eq!(resp.responses[code].schema, json!({}));
    }
    assert!(resp.components.is_none());
}

#[test]
fn response_schema_falls_back_to_first_content_type() {
    let (_dir, mut store) = cached_store(MINIMAL);
    let resp = ok_of(get_response_schema(
        &mut store,
        "ping",
        DerefLimits::default(),
    ));
    let ok = &resp.responses["200"];
    assert_eq!(ok.selected_content_type.as_deref(), Some("text/plain"));
    assert_eq!(ok.schema, json!({"type": "string"}));
}

#[test]
fn response_schema_with_cycle_ships_components() {
    let (_dir, mut store) = cached_store(CYCLE_REF);
    let output = get_response_schema(&mut store, "get_user", DerefLimits::default());
    let value = serde_json::to_value(&output).unwrap();

    let schema = &value["responses"]["200"]["schema"];
    assert_eq!(
        schema["properties"]["manager"],
        json!({"$ref": "#/components/schemas/User"})
    );
    assert_eq!(
        value["components"]["schemas"]["User"]["type"],
        "object"
    );
}

#[test]
fn response_schema_budget_cutoff_ships_components() {
    let (_dir, mut store) = cached_store(MINIMAL);
    let limits = DerefLimits {
        max_depth: 20,
        max_nodes: 0,
    };
    let resp = ok_of(get_response_schema(&mut store, "getUser", limits));
    assert_eq!(
        resp.responses["200"].schema,
        json!({"$ref": "#/components/schemas/User"})
    );
    let components = resp.components.expect("components should be attached");
    assert!(components["schemas"]["Name"].is_object());
}

#[test]
fn response_schema_degrades_malformed_content() {
    let (_dir, mut store) = cached_store(EDGE_CASES);
    let resp = ok_of(get_response_schema(
        &mut store,
        "responseDegrades",
        DerefLimits::default(),
    ));
    assert_eq!(resp.responses.len(), 2);
    for body in resp.responses.values() {
        assert_eq!(body.selected_content_type, None);
        assert_eq!(body.schema, json!({}));
    }
}

#[test]
fn response_schema_error_codes() {
    let (_dir, mut store) = cached_store(EDGE_CASES);

    let (code, _) = error_of(get_response_schema(
        &mut store,
        "noResponses",
        DerefLimits::default(),
    ));
    assert_eq!(code, ErrorCode::ResponsesMissing);

    let (code, details) = error_of(get_response_schema(
        &mut store,
        "responseWithoutSchema",
        DerefLimits::default(),
    ));
    assert_eq!(code, ErrorCode::ResponseSchemaMissing);
    assert_eq!(details, json!({"statusCode": "200"}));

    let (code, details) = error_of(get_response_schema(
        &mut store,
        "brokenRef",
        DerefLimits::default(),
    ));
    assert_eq!(code, ErrorCode::InternalError);
    assert_eq!(details["ref"], "#/components/schemas/Missing");
}
