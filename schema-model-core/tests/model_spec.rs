use std::sync::Arc;

use schema_model_core::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use speculate2::speculate;

fn address_model() -> Arc<ModelType> {
    ModelType::builder("Address")
        .schema(
            Schema::new()
                .field("city", "string")
                .field("zip", Directive::rule("isPostalCode", [json!("BR")])),
        )
        .build()
}

fn user_model(address: &Arc<ModelType>) -> Arc<ModelType> {
    ModelType::builder("User")
        .schema(
            Schema::new()
                .field("id", "number")
                .field("first_name", "string")
                .field("last_name", "string?")
                .field("age", "number")
                .field("email", "isEmail")
                .field("born", "date")
                .field("meta", "any")
                .field("address", address)
                .field("previous_addresses", address),
        )
        .computed("full_name", |user| {
            let first = user.field("first_name").and_then(FieldValue::as_str).unwrap_or("");
            match user.field("last_name").and_then(FieldValue::as_str) {
                Some(last) => json!(format!("{} {}", first, last)),
                None => json!(first),
            }
        })
        .build()
}

#[derive(Serialize)]
struct NewUser {
    first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    age: Option<u32>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct UserView {
    first_name: String,
    full_name: String,
}

speculate! {
    before {
        let address = address_model();
        let user = user_model(&address);
    }

    describe "construct" {
        it "keeps matching scalars unchanged" {
            let ann = user.construct(&json!({"first_name": "Ann", "age": 30})).unwrap();
            assert_eq!(ann.get("first_name"), Some(json!("Ann")));
            assert_eq!(ann.get("age"), Some(json!(30)));
            assert_eq!(ann.model().name(), "User");
        }

        it "rejects a value of the wrong primitive type" {
            let err = user.construct(&json!({"first_name": "Ann", "age": "30"})).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        }

        it "rejects attributes missing from the schema" {
            let err = user.construct(&json!({"nickname": "A"})).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnknownAttribute);
            assert!(err.to_string().contains("nickname"));
        }

        it "runs named rules" {
            assert!(user.construct(&json!({"email": "a@b.com"})).is_ok());
            let err = user.construct(&json!({"email": "bad"})).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }

        it "builds nested sub-models as new instances" {
            let input = json!({"address": {"city": "X", "zip": "01310-100"}});
            let ann = user.construct(&input).unwrap();
            let home = ann.field("address").and_then(FieldValue::as_model).unwrap();
            assert!(Arc::ptr_eq(home.model(), &address));
            assert_eq!(home.get("city"), Some(json!("X")));
            assert_eq!(ann.get("address"), Some(input["address"].clone()));
        }

        it "validates nested sub-models with their own schema" {
            let err = user.construct(&json!({"address": {"city": 1}})).unwrap_err();
            match &err {
                ModelError::TypeMismatch { model, attr, .. } => {
                    assert_eq!(model, "Address");
                    assert_eq!(attr, "city");
                }
                other => panic!("unexpected error {:?}", other),
            }
            let err = user.construct(&json!({"address": {"zip": "123"}})).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }

        it "builds arrays under a sub-model as collections in order" {
            let ann = user.construct(&json!({
                "previous_addresses": [{"city": "A"}, {"city": "B"}, {"city": "C"}]
            })).unwrap();
            let previous = ann
                .field("previous_addresses")
                .and_then(FieldValue::as_collection)
                .unwrap();
            let cities: Vec<_> = previous.iter().map(|a| a.get("city").unwrap()).collect();
            assert_eq!(cities, vec![json!("A"), json!("B"), json!("C")]);
        }

        it "keeps raw JSON for any fields" {
            let ann = user.construct(&json!({"meta": {"tags": ["x"]}})).unwrap();
            assert_eq!(ann.field("meta"), Some(&FieldValue::Scalar(json!({"tags": ["x"]}))));
        }

        it "parses date fields" {
            let ann = user.construct(&json!({"born": "1990-05-01"})).unwrap();
            assert!(ann.field("born").and_then(FieldValue::as_date).is_some());
            assert_eq!(ann.get("born"), Some(json!("1990-05-01T00:00:00+00:00")));
        }

        it "accepts null only for nullable fields" {
            let ann = user.construct(&json!({"last_name": null})).unwrap();
            assert!(ann.field("last_name").unwrap().is_null());
            let err = user.construct(&json!({"first_name": null})).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        }

        it "exposes computed fields next to stored ones" {
            let ann = user.construct(&json!({"first_name": "Ann", "last_name": "Lee"})).unwrap();
            assert_eq!(ann.keys(), vec!["first_name", "last_name", "full_name"]);
            assert_eq!(ann.get("full_name"), Some(json!("Ann Lee")));
            assert_eq!(
                serde_json::to_value(&ann).unwrap(),
                json!({"first_name": "Ann", "last_name": "Lee", "full_name": "Ann Lee"})
            );
        }

        it "converts into typed views" {
            let ann = user.construct(&json!({"first_name": "Ann"})).unwrap();
            let view: UserView = ann.to_typed().unwrap();
            assert_eq!(view, UserView { first_name: "Ann".into(), full_name: "Ann".into() });
        }
    }

    describe "schema-less models" {
        it "accept any plain object" {
            let loose = ModelType::builder("Loose").build();
            let data = json!({"a": 1, "b": [1, 2], "c": {"d": null}, "e": "x"});
            let instance = loose.construct(&data).unwrap();
            assert_eq!(instance.to_value(), data);
        }

        it "still reject malformed top-level input" {
            let loose = ModelType::builder("Loose").build();
            let err = loose.construct(&json!([1, 2])).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    describe "construct_collection" {
        it "preserves length and order" {
            let data = json!([{"id": 3}, {"id": 1}, {"id": 2}]);
            let users = user.construct_collection(&data).unwrap();
            assert_eq!(users.len(), 3);
            for (i, item) in users.iter().enumerate() {
                assert_eq!(item.get("id").as_ref(), Some(&data[i]["id"]));
            }
        }

        it "returns an empty collection for an empty array" {
            assert!(user.construct_collection(&json!([])).unwrap().is_empty());
        }
    }

    describe "create_from" {
        it "skips fields serde leaves out" {
            let ann = user.create_from(&NewUser {
                first_name: "Ann".into(),
                last_name: None,
                age: Some(30),
            }).unwrap();
            assert!(ann.field("last_name").is_none());
            assert_eq!(ann.get("age"), Some(json!(30)));
        }
    }

    describe "set_values" {
        it "validates and applies defined keys" {
            let mut ann = user.construct(&json!({"first_name": "Ann", "age": 30})).unwrap();
            ann.set_values(&json!({"age": 31, "email": "ann@example.com"})).unwrap();
            assert_eq!(ann.get("age"), Some(json!(31)));
            assert_eq!(ann.get("first_name"), Some(json!("Ann")));
            assert_eq!(ann.get("email"), Some(json!("ann@example.com")));
        }

        it "rejects null, arrays and primitives" {
            let mut ann = user.construct(&json!({})).unwrap();
            for data in [Value::Null, json!([]), json!("x"), json!(1)] {
                let err = ann.set_values(&data).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::InvalidArgument);
            }
        }

        it "leaves undefined entries untouched when patching" {
            let mut ann = user.construct(&json!({"first_name": "Ann", "age": 30})).unwrap();
            ann.patch([("first_name", None), ("age", Some(json!(40)))]).unwrap();
            assert_eq!(ann.get("first_name"), Some(json!("Ann")));
            assert_eq!(ann.get("age"), Some(json!(40)));
        }

        it "builds a sub-model through set_value" {
            let mut ann = user.construct(&json!({})).unwrap();
            ann.set_value("address", &json!({"city": "Y"})).unwrap();
            let home = ann.field("address").and_then(FieldValue::as_model).unwrap();
            assert_eq!(home.get("city"), Some(json!("Y")));
        }
    }

    describe "reactive handles" {
        it "wraps created collections with find_by_id" {
            let users = user
                .create_collection(&json!([{"id": 1, "first_name": "Ann"}, {"id": 2, "first_name": "Bob"}]))
                .unwrap();
            let bob = users.find_by_id(2).unwrap();
            assert_eq!(bob.get("first_name"), Some(json!("Bob")));
            assert!(users.find_by_id(3).is_none());
        }

        it "wraps a single instance" {
            let ann = user.create(&json!({"first_name": "Ann"})).unwrap();
            ann.update(|u| u.set_value("age", &json!(5)).unwrap());
            assert_eq!(ann.get().get("age"), Some(json!(5)));
        }
    }
}
