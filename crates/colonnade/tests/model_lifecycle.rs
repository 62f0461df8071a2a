//! Save/remove pipeline, change tracking and finders against the mock driver.

use std::sync::{Arc, Mutex};

use colonnade::{
    ColonnadeConfig, Consistency, Context, Document, Filter, FindOptions, HookError, HookEvent,
    Model, ModelError, QueryEntry, QueryError, QueryOptions, ResultSet, Schema, StatementKind,
    Value, Virtual, WireValue,
};
use colonnade_test_utils::{fixtures, init_test_logging, MockDriver};
use serde_json::json;

fn setup(schema: Schema, name: &str) -> (Arc<MockDriver>, Context, Model) {
    init_test_logging();
    let driver = MockDriver::shared();
    let ctx = Context::new(driver.clone());
    let model = ctx.register(name, schema).unwrap();
    (driver, ctx, model)
}

fn event_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

// =============================================================================
// Insert / update
// =============================================================================

#[tokio::test]
async fn test_save_new_document_inserts_every_field() {
    let (driver, _ctx, dogs) = setup(fixtures::dog_schema(), "Dogs");

    let mut rex = dogs.create([("dog_id", Value::from(1)), ("breed", Value::from("lab"))]).unwrap();
    assert!(rex.is_new());
    rex.save(&QueryOptions::default()).await.unwrap();

    let executed = driver.last_executed().unwrap();
    assert_eq!(
        executed.query,
        "INSERT INTO dogs (dog_id, breed, age, tags) VALUES (?, ?, ?, ?)"
    );
    assert_eq!(
        executed.params,
        vec![
            WireValue::Int(1),
            WireValue::Text("lab".into()),
            WireValue::Null,
            WireValue::Null,
        ]
    );
    assert!(!rex.is_new());
    assert!(rex.modified().is_empty());
}

#[tokio::test]
async fn test_synthesized_id_is_generated_on_insert() {
    let (driver, _ctx, notes) = setup(fixtures::note_schema(), "Notes");

    let mut note = notes.create([("title", "groceries")]).unwrap();
    assert!(note.value("id").is_none());
    note.save(&QueryOptions::default()).await.unwrap();

    let id = note.value("id").and_then(Value::as_uuid).expect("id assigned");
    let executed = driver.last_executed().unwrap();
    assert_eq!(executed.query, "INSERT INTO notes (title, body, id) VALUES (?, ?, ?)");
    assert_eq!(executed.params[2], WireValue::Uuid(id));
}

#[tokio::test]
async fn test_explicit_id_is_kept() {
    let (driver, _ctx, notes) = setup(fixtures::note_schema(), "Notes");
    let id = uuid::Uuid::new_v4();

    let mut note = notes.create([("title", Value::from("x")), ("id", Value::from(id))]).unwrap();
    note.save(&QueryOptions::default()).await.unwrap();

    assert_eq!(driver.last_executed().unwrap().params[2], WireValue::Uuid(id));
}

#[tokio::test]
async fn test_values_are_marshaled_for_their_column() {
    let schema = Schema::builder()
        .field("id", colonnade::FieldDefinition::new(colonnade::ColumnType::Int).primary())
        .field("seen_at", colonnade::ColumnType::Timestamp)
        .field("visits", colonnade::ColumnType::BigInt)
        .build()
        .unwrap();
    let (driver, _ctx, sightings) = setup(schema, "Sightings");
    let seen_at = chrono::DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);

    let mut sighting = sightings
        .create([
            ("id", Value::from(1)),
            ("seen_at", Value::from(seen_at)),
            ("visits", Value::from(3)),
        ])
        .unwrap();
    sighting.save(&QueryOptions::default()).await.unwrap();
    assert_eq!(
        driver.last_executed().unwrap().params,
        vec![
            WireValue::Int(1),
            WireValue::Timestamp(seen_at.timestamp_millis()),
            WireValue::BigInt(3),
        ]
    );

    sighting.set("visits", "many").unwrap();
    let err = sighting.save(&QueryOptions::default()).await.unwrap_err();
    assert!(matches!(
        err,
        ModelError::Query(QueryError::Type { ref field, .. }) if field == "visits"
    ));
}

#[tokio::test]
async fn test_update_writes_only_modified_fields() {
    let (driver, _ctx, dogs) = setup(fixtures::dog_schema(), "Dogs");

    let mut rex = dogs.create([("dog_id", 1), ("age", 3)]).unwrap();
    rex.save(&QueryOptions::default()).await.unwrap();

    rex.set("breed", "pug").unwrap();
    rex.set("age", 4).unwrap();
    assert_eq!(rex.modified(), &["breed".to_string(), "age".to_string()]);
    rex.save(&QueryOptions::new().ttl(120)).await.unwrap();

    let executed = driver.last_executed().unwrap();
    assert_eq!(
        executed.query,
        "UPDATE dogs USING TTL 120 SET breed = ?, age = ? WHERE dog_id = ?"
    );
    assert_eq!(
        executed.params,
        vec![WireValue::Text("pug".into()), WireValue::Int(4), WireValue::Int(1)]
    );
    assert!(rex.modified().is_empty());
}

#[tokio::test]
async fn test_save_without_changes_sends_nothing() {
    let (driver, _ctx, dogs) = setup(fixtures::dog_schema(), "Dogs");

    let mut rex = dogs.create([("dog_id", 1)]).unwrap();
    rex.save(&QueryOptions::default()).await.unwrap();
    assert_eq!(driver.executed().len(), 1);

    let statement = rex.save_statement(&QueryOptions::default()).await.unwrap();
    assert_eq!(statement.kind(), StatementKind::Noop);

    rex.save(&QueryOptions::default()).await.unwrap();
    assert_eq!(driver.executed().len(), 1);
}

#[tokio::test]
async fn test_mark_modified_includes_mutated_container() {
    let (driver, _ctx, dogs) = setup(fixtures::dog_schema(), "Dogs");
    driver.push_rows(ResultSet::new(vec![fixtures::row(&[
        ("dog_id", WireValue::Int(1)),
        ("age", WireValue::Int(2)),
        ("tags", WireValue::List(vec![WireValue::Text("good".into())])),
    ])]));

    let mut rex = dogs
        .find_one(&Filter::new().eq("dog_id", 1), &FindOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert!(!rex.is_new());

    // In-place mutation is invisible without mark_modified.
    if let Some(Value::List(tags)) = rex.value_mut("tags") {
        tags.push(Value::from("loud"));
    }
    rex.set("age", 3).unwrap();
    let statement = rex.save_statement(&QueryOptions::default()).await.unwrap();
    assert_eq!(statement.query(), "UPDATE dogs SET age = ? WHERE dog_id = ?");

    rex.mark_modified("tags");
    let statement = rex.save_statement(&QueryOptions::default()).await.unwrap();
    assert_eq!(statement.query(), "UPDATE dogs SET age = ?, tags = ? WHERE dog_id = ?");
    assert_eq!(
        statement.params()[1],
        WireValue::List(vec![WireValue::Text("good".into()), WireValue::Text("loud".into())])
    );
}

#[tokio::test]
async fn test_tracked_containers_mark_modified() {
    let (_driver, _ctx, kennels) = setup(fixtures::kennel_schema(), "Kennels");

    let mut spot = kennels
        .create([("owner", Value::from("ann")), ("dog_id", Value::from(7))])
        .unwrap();
    spot.mark_persisted();

    {
        let mut attrs = spot.tracked_map("attrs").unwrap();
        assert!(attrs.is_empty());
        attrs.insert("color", "brown");
        assert_eq!(attrs.insert("color", "black"), Some(Value::from("brown")));
    }
    assert_eq!(spot.modified(), &["attrs".to_string()]);

    let statement = spot.save_statement(&QueryOptions::default()).await.unwrap();
    assert_eq!(
        statement.query(),
        "UPDATE kennels SET attrs = ? WHERE owner = ? AND dog_id = ?"
    );
    assert_eq!(
        statement.params()[0],
        WireValue::Map(vec![(WireValue::Text("color".into()), WireValue::Text("black".into()))])
    );

    assert!(matches!(
        spot.tracked_list("attrs"),
        Err(ModelError::NotAContainer { expected: "list", .. })
    ));
}

#[tokio::test]
async fn test_tracked_list_without_changes_stays_clean() {
    let (_driver, _ctx, dogs) = setup(fixtures::dog_schema(), "Dogs");
    let mut rex = dogs.create([("dog_id", 1)]).unwrap();
    rex.mark_persisted();

    assert_eq!(rex.tracked_list("tags").unwrap().len(), 0);
    assert!(rex.modified().is_empty());

    rex.tracked_list("tags").unwrap().push("good");
    assert!(rex.is_modified("tags"));
    assert_eq!(rex.value("tags"), Some(&Value::List(vec![Value::from("good")])));
}

// =============================================================================
// Validation and hooks
// =============================================================================

#[tokio::test]
async fn test_required_field_fails_before_compile() {
    let (driver, _ctx, notes) = setup(fixtures::note_schema(), "Notes");

    let mut note = notes.create([("body", "no title")]).unwrap();
    let err = note.save(&QueryOptions::default()).await.unwrap_err();

    assert_eq!(err.validation_message(), Some("Field: title is required."));
    assert!(driver.executed().is_empty());
    assert!(note.is_new());
}

#[tokio::test]
async fn test_custom_validator_fails_fast() {
    let mut schema = fixtures::dog_schema();
    schema.validate_field(
        "age",
        |v| v.and_then(Value::as_i64).map(|age| age >= 0).unwrap_or(true),
        "age must not be negative",
    );
    schema.validate_field("age", |_| false, "never reached");
    let (driver, _ctx, dogs) = setup(schema, "Dogs");

    let mut rex = dogs.create([("dog_id", 1), ("age", -2)]).unwrap();
    let err = rex.save(&QueryOptions::default()).await.unwrap_err();
    assert_eq!(err.validation_message(), Some("age must not be negative"));
    assert!(driver.executed().is_empty());
}

#[tokio::test]
async fn test_pipeline_order() {
    let log = event_log();
    let mut schema = fixtures::dog_schema();

    let l = log.clone();
    schema.post(HookEvent::Validate, move |_doc| l.lock().unwrap().push("post:validate".into())).unwrap();
    let l = log.clone();
    schema
        .pre(HookEvent::Save, move |doc| {
            let l = l.clone();
            Box::pin(async move {
                l.lock().unwrap().push("pre:save:1".into());
                doc.set("age", 10)?;
                Ok(())
            })
        })
        .unwrap();
    let l = log.clone();
    schema
        .pre(HookEvent::Save, move |_doc| {
            let l = l.clone();
            Box::pin(async move {
                l.lock().unwrap().push("pre:save:2".into());
                Ok(())
            })
        })
        .unwrap();
    let l = log.clone();
    schema
        .post(HookEvent::Save, move |doc| {
            l.lock().unwrap().push(format!("post:save:new={}", doc.is_new()))
        })
        .unwrap();
    let l = log.clone();
    schema.post(HookEvent::Init, move |_doc| l.lock().unwrap().push("post:init".into())).unwrap();

    let (driver, _ctx, dogs) = setup(schema, "Dogs");
    let mut rex = dogs.create([("dog_id", 1)]).unwrap();
    rex.save(&QueryOptions::default()).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "post:init",
            "post:validate",
            "pre:save:1",
            "pre:save:2",
            "post:save:new=false",
        ]
    );
    // The pre hook's mutation made it into the insert.
    assert_eq!(driver.last_executed().unwrap().params[2], WireValue::Int(10));
}

#[tokio::test]
async fn test_pre_hook_error_short_circuits() {
    let log = event_log();
    let mut schema = fixtures::dog_schema();
    schema
        .pre(HookEvent::Save, |_doc| Box::pin(async { Err::<(), _>(HookError::new("kennel closed")) }))
        .unwrap();
    let l = log.clone();
    schema
        .pre(HookEvent::Save, move |_doc| {
            let l = l.clone();
            Box::pin(async move {
                l.lock().unwrap().push("second".to_string());
                Ok(())
            })
        })
        .unwrap();
    let l = log.clone();
    schema.post(HookEvent::Save, move |_doc| l.lock().unwrap().push("post".to_string())).unwrap();

    let (driver, _ctx, dogs) = setup(schema, "Dogs");
    let mut rex = dogs.create([("dog_id", 1)]).unwrap();
    let err = rex.save(&QueryOptions::default()).await.unwrap_err();

    assert_eq!(err, ModelError::Hook(HookError::new("kennel closed")));
    assert!(log.lock().unwrap().is_empty());
    assert!(driver.executed().is_empty());
    assert!(rex.is_new());
}

#[tokio::test]
async fn test_driver_error_keeps_dirty_state() {
    let (driver, _ctx, dogs) = setup(fixtures::dog_schema(), "Dogs");
    driver.fail_when("INSERT", colonnade::DriverError::Timeout("write timeout".into()));

    let mut rex = dogs.create([("dog_id", 1)]).unwrap();
    rex.set("age", 2).unwrap();
    let err = rex.save(&QueryOptions::default()).await.unwrap_err();

    assert!(matches!(err, ModelError::Driver(_)));
    assert!(rex.is_new());
    assert!(rex.is_modified("age"));
}

// =============================================================================
// Remove
// =============================================================================

#[tokio::test]
async fn test_remove_runs_hooks_and_deletes_by_key() {
    let log = event_log();
    let mut schema = fixtures::dog_schema();
    let l = log.clone();
    schema
        .pre(HookEvent::Remove, move |_doc| {
            let l = l.clone();
            Box::pin(async move {
                l.lock().unwrap().push("pre:remove".to_string());
                Ok(())
            })
        })
        .unwrap();
    let l = log.clone();
    schema.post(HookEvent::Remove, move |_doc| l.lock().unwrap().push("post:remove".to_string())).unwrap();

    let (driver, _ctx, dogs) = setup(schema, "Dogs");
    let mut rex = dogs.create([("dog_id", 9)]).unwrap();
    rex.remove(&QueryOptions::new().consistency(Consistency::All)).await.unwrap();

    let executed = driver.last_executed().unwrap();
    assert_eq!(executed.query, "DELETE FROM dogs WHERE dog_id = ?");
    assert_eq!(executed.params, vec![WireValue::Int(9)]);
    assert_eq!(executed.options.consistency, Some(Consistency::All));
    assert_eq!(*log.lock().unwrap(), vec!["pre:remove", "post:remove"]);
}

#[tokio::test]
async fn test_remove_without_key_fails() {
    let (driver, _ctx, dogs) = setup(fixtures::dog_schema(), "Dogs");
    let mut stray = dogs.create([("breed", "mutt")]).unwrap();

    let err = stray.remove(&QueryOptions::default()).await.unwrap_err();
    assert_eq!(err, ModelError::Query(QueryError::MissingKey("dog_id".into())));
    assert!(driver.executed().is_empty());
}

#[tokio::test]
async fn test_remove_statement_is_not_executed() {
    let (driver, _ctx, kennels) = setup(fixtures::kennel_schema(), "Kennels");
    let mut spot = kennels
        .create([("owner", Value::from("ann")), ("dog_id", Value::from(7))])
        .unwrap();

    let statement = spot.remove_statement(&QueryOptions::default()).await.unwrap();
    assert_eq!(statement.query(), "DELETE FROM kennels WHERE owner = ? AND dog_id = ?");
    assert!(driver.executed().is_empty());
}

// =============================================================================
// Fields, virtuals, finders
// =============================================================================

#[tokio::test]
async fn test_virtual_fields() {
    let mut schema = Schema::builder()
        .field("id", colonnade::FieldDefinition::new(colonnade::ColumnType::Int).primary())
        .field("first", colonnade::ColumnType::Text)
        .field("last", colonnade::ColumnType::Text)
        .build()
        .unwrap();
    schema.virtual_field(
        "full_name",
        Virtual::getter(|doc: &Document| {
            let part = |name: &str| doc.value(name).and_then(Value::as_str).unwrap_or("").to_string();
            Value::from(format!("{} {}", part("first"), part("last")))
        })
        .with_setter(|doc: &mut Document, value: Value| {
            let text = value.as_str().unwrap_or_default().to_string();
            let (first, last) = text.split_once(' ').unwrap_or((text.as_str(), ""));
            doc.set("first", first)?;
            doc.set("last", last)
        }),
    );
    schema.virtual_field("shout", Virtual::getter(|_doc: &Document| Value::from("WOOF")));

    let (driver, _ctx, people) = setup(schema, "People");
    let mut ann = people.create([("id", Value::from(1)), ("full_name", Value::from("Ann Lee"))]).unwrap();

    assert_eq!(ann.get("first"), Some(Value::from("Ann")));
    assert_eq!(ann.get("full_name"), Some(Value::from("Ann Lee")));
    assert_eq!(
        ann.set("shout", "quiet"),
        Err(ModelError::ReadOnlyVirtual("shout".into()))
    );

    ann.save(&QueryOptions::default()).await.unwrap();
    assert_eq!(
        driver.last_executed().unwrap().query,
        "INSERT INTO people (id, first, last) VALUES (?, ?, ?)"
    );
}

#[tokio::test]
async fn test_create_rejects_unknown_fields() {
    let (_driver, _ctx, dogs) = setup(fixtures::dog_schema(), "Dogs");
    let err = dogs.create([("color", "red")]).unwrap_err();
    assert_eq!(err, ModelError::UnknownField("color".into()));

    let doc = dogs.create_from_json(&json!({"dog_id": 4, "tags": ["a"]})).unwrap();
    assert_eq!(doc.value("dog_id"), Some(&Value::Int(4)));
    assert!(matches!(
        dogs.create_from_json(&json!([1])).unwrap_err(),
        ModelError::InvalidValues(_)
    ));
}

#[tokio::test]
async fn test_find_hydrates_documents() {
    let inits = Arc::new(Mutex::new(0usize));
    let mut schema = fixtures::dog_schema();
    let counter = inits.clone();
    schema.post(HookEvent::Init, move |_doc| *counter.lock().unwrap() += 1).unwrap();

    let (driver, _ctx, dogs) = setup(schema, "Dogs");
    driver.push_rows(ResultSet::new(vec![
        fixtures::row(&[
            ("dog_id", WireValue::Int(1)),
            ("breed", WireValue::Text("lab".into())),
            ("legacy", WireValue::Text("ignored".into())),
        ]),
        fixtures::row(&[("dog_id", WireValue::Int(2)), ("breed", WireValue::Null)]),
    ]));

    let found = dogs
        .find(
            &Filter::from_json(&json!({"breed": {"$in": ["lab", "pug"]}})).unwrap(),
            &FindOptions::new().limit(5).allow_filtering(),
        )
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(found[0].value("breed"), Some(&Value::from("lab")));
    assert!(found[0].value("legacy").is_none());
    assert_eq!(found[1].value("breed"), Some(&Value::Null));
    assert!(found.iter().all(|d| !d.is_new() && d.modified().is_empty()));
    assert_eq!(*inits.lock().unwrap(), 2);

    let executed = driver.last_executed().unwrap();
    assert_eq!(
        executed.query,
        "SELECT * FROM dogs WHERE breed IN (?, ?) LIMIT 5 ALLOW FILTERING"
    );
}

#[tokio::test]
async fn test_find_one_limits_to_one() {
    let (driver, _ctx, dogs) = setup(fixtures::dog_schema(), "Dogs");
    let none = dogs
        .find_one(&Filter::new().eq("dog_id", 3), &FindOptions::new())
        .await
        .unwrap();
    assert!(none.is_none());
    assert_eq!(
        driver.last_executed().unwrap().query,
        "SELECT * FROM dogs WHERE dog_id = ? LIMIT 1"
    );
}

#[tokio::test]
async fn test_custom_query() {
    let mut schema = fixtures::dog_schema();
    schema.add_query([
        (
            "by_breed",
            QueryEntry::finder(|model: Model, args: serde_json::Value| async move {
                let breed = args["breed"].as_str().unwrap_or_default().to_string();
                model
                    .find(&Filter::new().eq("breed", breed), &FindOptions::new())
                    .await
            }),
        ),
        ("not_a_function", QueryEntry::from(json!(42))),
    ]);

    let (driver, _ctx, dogs) = setup(schema, "Dogs");
    let found = dogs.query("by_breed", json!({"breed": "lab"})).await.unwrap();
    assert!(found.is_empty());
    assert_eq!(
        driver.last_executed().unwrap().params,
        vec![WireValue::Text("lab".into())]
    );

    let err = dogs.query("not_a_function", json!({})).await.unwrap_err();
    assert_eq!(err, ModelError::UnknownQuery("not_a_function".into()));
}

// =============================================================================
// Context defaults
// =============================================================================

#[tokio::test]
async fn test_context_default_consistency_and_debug() {
    init_test_logging();
    let driver = MockDriver::shared();
    let config = ColonnadeConfig {
        default_consistency: Some(Consistency::LocalQuorum),
        debug_queries: true,
        ..Default::default()
    };
    let ctx = Context::with_config(driver.clone(), config);
    let dogs = ctx.register("Dogs", fixtures::dog_schema()).unwrap();

    let mut rex = dogs.create([("dog_id", 1)]).unwrap();
    rex.save(&QueryOptions::default()).await.unwrap();
    let executed = driver.last_executed().unwrap();
    assert_eq!(executed.options.consistency, Some(Consistency::LocalQuorum));
    assert!(executed.options.debug);

    rex.set("age", 1).unwrap();
    rex.save(&QueryOptions::new().consistency(Consistency::One)).await.unwrap();
    assert_eq!(driver.last_executed().unwrap().options.consistency, Some(Consistency::One));
}

#[tokio::test]
async fn test_context_registry() {
    let (_driver, ctx, _dogs) = setup(fixtures::dog_schema(), "Dogs");

    assert_eq!(ctx.model("Dogs").unwrap().table_name(), "dogs");
    assert_eq!(ctx.model("Cats").unwrap_err(), ModelError::UnknownModel("Cats".into()));
    assert!(matches!(
        ctx.register("bad-name", fixtures::dog_schema()).unwrap_err(),
        ModelError::Schema(colonnade::SchemaError::InvalidIdentifier(_))
    ));

    ctx.register("Notes", fixtures::note_schema()).unwrap();
    let names: Vec<String> = ctx.models().iter().map(|m| m.name().to_string()).collect();
    assert_eq!(names, vec!["Dogs", "Notes"]);
}
