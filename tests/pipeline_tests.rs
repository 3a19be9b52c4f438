//! End-to-end tests for the compilation pipeline
//!
//! Documents under `tests/fixtures/` are compiled through the filesystem
//! source; smaller scenarios use in-memory documents.

use std::fs;
use std::path::{Path, PathBuf};

use interface_compiler::{
    generate, ArtifactManifest, CompileError, Compilation, CompilerConfig, FsSource, GenerationContext,
    InterfaceDescription, JsonSchemaWriter, MemorySource, MiniJinjaRenderer, OutputRegistry, TypeKind,
};
use serde_json::{json, Value};

fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn compile_fixture(document: &str) -> Result<InterfaceDescription, CompileError> {
    Compilation::with_source(FsSource::new(fixtures_path()))?.load(document)
}

const MAPPING: &str = r#"
```yaml
examples:
  entityInterfaceMapping:
    httpRoutes: payments
---
Payment: payments
```
"#;

const TYPES: &str = r#"
```yaml
typeDefs:
  entityType:
    entityType:
      type: string
      enum: [Payment]
```
"#;

const ROUTES: &str = r#"
```yaml
httpRoutes:
  payments:
    route: /api/payments/<id>
```
"#;

// =============================================================================
// Assembly
// =============================================================================

#[test]
fn test_fixture_compiles() {
    let description = compile_fixture("payments/api.md").unwrap();

    assert_eq!(description.name, "payments_api");
    assert_eq!(
        description.type_defs.keys().collect::<Vec<_>>(),
        vec!["entityType", "PaymentRequest", "PaymentReceipt", "OrderEvent", "Legacy"]
    );
    assert!(description.type_defs["Legacy"].is_none());
    assert_eq!(description.root_types(), vec!["PaymentRequest", "PaymentReceipt"]);

    let route = &description.http_routes["payments"];
    assert_eq!(route.mount_point, "payments");
    assert_eq!(route.prefix, "/api/payments");
    assert_eq!(route.params, vec!["paymentId"]);

    let subject = &description.subjects["orderEvents"];
    assert_eq!(subject.base_subject, "orders");
    assert_eq!(subject.wildcard_subject(), "orders.*.>");

    let flow = &description.examples["paymentFlow"];
    assert_eq!(flow.len(), 2);
    assert_eq!(flow[0].id, "Create_a_payment");
    assert_eq!(flow[0].example, json!({"amount": 12.5, "currency": "EUR"}));
    assert_eq!(flow[1].id, "paymentFlow_2");
}

#[test]
fn test_shorthand_expanded_through_pipeline() {
    let description = compile_fixture("payments/api.md").unwrap();
    let request = description.type_def("PaymentRequest").unwrap();

    match &request.property("metadata").unwrap().kind {
        TypeKind::Dictionary(Some(items)) => assert_eq!(items.type_name(), Some("string")),
        other => panic!("Expected Dictionary, got {:?}", other),
    }
    let receipt = description.type_def("PaymentReceipt").unwrap();
    assert_eq!(
        receipt.property("lines").unwrap().to_json_schema(),
        json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {"sku": {"type": "string"}, "quantity": {"type": "integer"}}
            }
        })
    );
}

#[test]
fn test_include_unions_type_defs() {
    let source = MemorySource::new()
        .with_document(
            "docs/main.md",
            format!(
                "Include.Interface: [more](more.md)\n{}{}{}\n```yaml\ntypeDefs:\n  A: string\n```\n",
                TYPES, ROUTES, MAPPING
            ),
        )
        .with_document("docs/more.md", "```yaml\ntypeDefs:\n  B: number\n```\n");

    let description = Compilation::with_source(source).unwrap().load("docs/main.md").unwrap();
    assert_eq!(description.name, "docs_main");
    assert_eq!(
        description.type_defs.keys().collect::<Vec<_>>(),
        vec!["B", "entityType", "A"]
    );
}

#[test]
fn test_include_cycle_is_reported() {
    match compile_fixture("cycle/a.md").unwrap_err() {
        CompileError::IncludeCycle { chain } => {
            assert_eq!(chain.len(), 3);
            assert_eq!(chain.first(), chain.last());
            assert!(chain[1].ends_with("cycle/b.md"));
        }
        other => panic!("Expected IncludeCycle, got {:?}", other),
    }
}

#[test]
fn test_cross_reference_failure_names_pair() {
    let source = MemorySource::new().with_document(
        "api.md",
        format!(
            "{}{}\n```yaml\nexamples:\n  entityInterfaceMapping:\n    httpRoutes: payments\n---\nPayment: refunds\n```\n",
            TYPES, ROUTES
        ),
    );
    let err = Compilation::with_source(source).unwrap().load("api.md").unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, CompileError::CrossReference(_)));
    assert!(message.contains("'refunds'"));
    assert!(message.contains("'Payment'"));
    assert!(message.contains("[payments]"));
}

#[test]
fn test_malformed_route_is_fatal() {
    let source = MemorySource::new().with_document(
        "api.md",
        format!("{}{}```yaml\nhttpRoutes:\n  broken:\n    route: no-slash\n```\n", TYPES, MAPPING),
    );
    let err = Compilation::with_source(source).unwrap().load("api.md").unwrap_err();
    assert!(matches!(err, CompileError::Validation { kind: "httpRoutes", .. }));
}

#[test]
fn test_missing_mapping_is_fatal() {
    let source = MemorySource::new().with_document("api.md", format!("{}{}", TYPES, ROUTES));
    let err = Compilation::with_source(source).unwrap().load("api.md").unwrap_err();
    assert!(err.to_string().contains("entityInterfaceMapping"));
}

#[test]
fn test_mapping_with_empty_body_is_fatal() {
    let source = MemorySource::new().with_document(
        "api.md",
        format!(
            "{}{}\n```yaml\nexamples:\n  entityInterfaceMapping:\n    httpRoutes: payments\n---\n```\n",
            TYPES, ROUTES
        ),
    );
    let err = Compilation::with_source(source).unwrap().load("api.md").unwrap_err();
    assert!(matches!(err, CompileError::CrossReference(_)));
    assert!(err.to_string().contains("has no example body"), "{}", err);
}

#[test]
fn test_subject_starting_with_wildcard() {
    let source = MemorySource::new().with_document(
        "api.md",
        format!(
            "{}{}{}\n```yaml\nsubjects:\n  tenantOrders:\n    subject: <tenant>.orders\n```\n",
            TYPES, ROUTES, MAPPING
        ),
    );
    let description = Compilation::with_source(source).unwrap().load("api.md").unwrap();
    let subject = &description.subjects["tenantOrders"];
    assert_eq!(subject.base_subject, "");
    assert_eq!(subject.parts, vec!["tenant", "orders"]);
    assert_eq!(subject.wildcard_subject(), "*.*");
}

// =============================================================================
// Registry and Generation
// =============================================================================

#[test]
fn test_registry_for_fixture() {
    let description = compile_fixture("payments/api.md").unwrap();
    let registry = OutputRegistry::build(&description, &CompilerConfig::default()).unwrap();

    let keys: Vec<&str> = registry.entries().map(|entry| entry.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "PaymentRequest-rootType-json",
            "PaymentReceipt-rootType-json",
            "PaymentRequest-rootType-py",
            "PaymentReceipt-rootType-py",
            "payments_api-httpRoutes-py",
            "payments_api-subjects-py",
            "payments_api-examples-json",
        ]
    );
    assert_eq!(
        registry.lookup("PaymentRequest", "rootType-py").unwrap().path,
        PathBuf::from("dist/python/PaymentRequest.py")
    );
}

#[test]
fn test_build_writes_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = CompilerConfig::default();
    config.output.dist_root = dir.path().to_path_buf();

    let description = compile_fixture("payments/api.md").unwrap();
    let registry = OutputRegistry::build(&description, &config).unwrap();
    let ctx = GenerationContext::new(&description, &registry, &MiniJinjaRenderer, &JsonSchemaWriter);
    let report = generate(&ctx, &config).unwrap();

    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.written.len(), registry.len());

    let schema: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("json/PaymentRequest.schema.json")).unwrap())
            .unwrap();
    assert_eq!(schema["title"], json!("PaymentRequest"));
    assert_eq!(schema["description"], json!("A request to move money"));
    assert_eq!(schema["properties"]["metadata"]["additionalProperties"], json!({"type": "string"}));
    assert!(schema["$defs"].get("OrderEvent").is_some());
    assert!(schema["$defs"].get("Legacy").is_none());

    let model = fs::read_to_string(dir.path().join("python/PaymentRequest.py")).unwrap();
    assert!(model.contains("class PaymentRequest(dict):"));
    assert!(model.contains("\"currency\","));

    let routes = fs::read_to_string(dir.path().join("python/payments_api_routes.py")).unwrap();
    assert!(routes.contains("methods=[\"GET\", \"POST\", ]"));
    assert!(routes.contains("\"PaymentReceipt\": \"PaymentReceipt\""));

    let subjects = fs::read_to_string(dir.path().join("python/payments_api_subjects.py")).unwrap();
    assert!(subjects.contains("\"orderEvents\": Subject("));
    assert!(subjects.contains("base_subject=\"orders\""));
    assert!(subjects.contains("message_type=\"OrderEvent\""));

    let examples: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("examples/payments_api_examples.json")).unwrap())
            .unwrap();
    assert_eq!(examples["interface"], json!("payments_api"));
    assert_eq!(examples["examples"]["paymentFlow"][0]["id"], json!("Create_a_payment"));

    let manifest: ArtifactManifest =
        serde_json::from_str(&fs::read_to_string(dir.path().join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest.artifacts.len(), report.written.len());
    for entry in &manifest.artifacts {
        let content = fs::read(dir.path().join(&entry.path)).unwrap();
        assert!(entry.checksum.verify(&content), "checksum mismatch for {}", entry.key);
    }
}
