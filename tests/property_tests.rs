//! Property tests for the relation language and match generation

use cypher_sink::{
    decode_relations, encode_relations, parse_relations, Direction, FieldValue, QueryCompiler, Record,
    RecordSchema, RelationParseError, RelationSpec, Schema, SchemaField,
};
use proptest::prelude::*;
use std::sync::Arc;

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Outgoing), Just(Direction::Incoming)]
}

/// Relations with distinct target fields
fn arb_relations() -> impl Strategy<Value = Vec<RelationSpec>> {
    prop::collection::btree_set("[a-z][a-z0-9_]{0,8}", 1..6).prop_flat_map(|fields| {
        let fields: Vec<String> = fields.into_iter().collect();
        let n = fields.len();
        (
            Just(fields),
            prop::collection::vec("[A-Za-z_][A-Za-z0-9_ -]{0,10}[A-Za-z0-9_]", n),
            prop::collection::vec(arb_direction(), n),
        )
            .prop_map(|(fields, labels, directions)| {
                fields
                    .into_iter()
                    .zip(labels)
                    .zip(directions)
                    .map(|((field, label), direction)| RelationSpec::new(label, direction, field))
                    .collect()
            })
    })
}

fn to_text(specs: &[RelationSpec]) -> String {
    specs
        .iter()
        .map(|s| format!("{}:{}({})", s.edge_label, s.direction.token(), s.field))
        .collect::<Vec<_>>()
        .join(", ")
}

fn targets(specs: &[RelationSpec]) -> Vec<&str> {
    specs.iter().map(|s| s.field.as_str()).collect()
}

#[derive(Debug, Clone)]
enum Scalar {
    Boolean(Option<bool>),
    Long(Option<i64>),
    Double(Option<f64>),
    String(Option<String>),
}

impl Scalar {
    fn schema(&self) -> Schema {
        let inner = match self {
            Scalar::Boolean(_) => Schema::Boolean,
            Scalar::Long(_) => Schema::Long,
            Scalar::Double(_) => Schema::Double,
            Scalar::String(_) => Schema::String,
        };
        Schema::nullable(inner)
    }

    fn value(&self) -> FieldValue {
        let value = match self.clone() {
            Scalar::Boolean(v) => v.map(FieldValue::Boolean),
            Scalar::Long(v) => v.map(FieldValue::Long),
            Scalar::Double(v) => v.map(FieldValue::Double),
            Scalar::String(v) => v.map(FieldValue::String),
        };
        value.unwrap_or(FieldValue::Null)
    }
}

fn arb_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        proptest::option::of(any::<bool>()).prop_map(Scalar::Boolean),
        proptest::option::of(any::<i64>()).prop_map(Scalar::Long),
        proptest::option::of(-1e9f64..1e9).prop_map(Scalar::Double),
        proptest::option::of("[a-z' ]{0,8}").prop_map(Scalar::String),
    ]
}

proptest! {
    #[test]
    fn prop_relation_text_normalizes_idempotently(specs in arb_relations()) {
        let fields = targets(&specs);
        let parsed = parse_relations(&to_text(&specs), &fields).unwrap();
        prop_assert_eq!(&parsed, &specs);

        let wire = encode_relations(&parsed);
        let decoded = decode_relations(&wire).unwrap();
        prop_assert_eq!(&decoded, &parsed);
        prop_assert_eq!(parse_relations(&to_text(&decoded), &fields).unwrap(), parsed);
    }

    #[test]
    fn prop_repeated_target_is_rejected(
        specs in arb_relations(),
        pick in any::<prop::sample::Index>(),
        label in "[A-Z]{1,8}",
        direction in arb_direction(),
    ) {
        let repeated = pick.get(&specs).field.clone();
        let mut with_repeat = specs.clone();
        with_repeat.push(RelationSpec::new(label, direction, repeated.clone()));

        let fields = targets(&specs);
        prop_assert_eq!(
            parse_relations(&to_text(&with_repeat), &fields).unwrap_err(),
            RelationParseError::DuplicateTarget { field: repeated.clone() }
        );
        prop_assert_eq!(
            decode_relations(&encode_relations(&with_repeat)).unwrap_err(),
            RelationParseError::DuplicateTarget { field: repeated }
        );
    }

    #[test]
    fn prop_scalar_only_records_match_nothing(
        scalars in prop::collection::btree_map("f_[a-z]{1,6}", arb_scalar(), 0..8),
    ) {
        let mut fields = vec![
            SchemaField::new("type", Schema::String),
            SchemaField::new("uid", Schema::String),
        ];
        fields.extend(scalars.iter().map(|(name, scalar)| SchemaField::new(name.as_str(), scalar.schema())));
        let schema = Arc::new(RecordSchema::new("Item", fields).unwrap());

        let mut builder = Record::builder(schema).set("type", "Item").set("uid", "i1");
        for (name, scalar) in &scalars {
            builder = builder.set(name.as_str(), scalar.value());
        }
        let record = builder.build().unwrap();

        let compiler = QueryCompiler::default();
        let related = compiler.related(&record).unwrap();
        prop_assert!(related.clauses.is_empty());
        prop_assert!(related.bindings.is_empty());

        let statement = compiler.compile_create(&record, &[]).unwrap();
        let expected_prefix = "MERGE (m:item {uid:'i1'";
        prop_assert!(statement.text().starts_with(expected_prefix));
        prop_assert_eq!(statement.aliases, vec!["m".to_string()]);
    }
}
