//! Collection properties over generated widget payloads.

use apientity_testkit::prelude::*;
use proptest::prelude::*;
use serde_json::Value;
use std::collections::HashSet;

fn ids(widgets: &ApiCollection<Widget>) -> Vec<ObjectId> {
    widgets.objects().iter().filter_map(|w| w.identifier()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn identifiers_stay_unique(first in widget_array_strategy(), second in widget_array_strategy()) {
        let widgets = ApiCollection::<Widget>::new();
        widgets.parse(&first).unwrap();
        widgets.parse(&second).unwrap();

        let all = ids(&widgets);
        let unique: HashSet<_> = all.iter().cloned().collect();
        prop_assert_eq!(all.len(), unique.len());
    }

    #[test]
    fn merging_twice_changes_nothing(payload in widget_array_strategy()) {
        let keyed: Vec<Value> = elements_of(&payload)
            .iter()
            .filter(|e| e.get("id").is_some())
            .cloned()
            .collect();

        let widgets = ApiCollection::<Widget>::new();
        widgets.parse_array(&keyed).unwrap();
        let before: HashSet<_> = ids(&widgets).into_iter().collect();
        let count = widgets.len();

        widgets.parse_array(&keyed).unwrap();
        let after: HashSet<_> = ids(&widgets).into_iter().collect();
        prop_assert_eq!(widgets.len(), count);
        prop_assert_eq!(after, before);
    }

    #[test]
    fn last_payload_wins_per_identifier(payload in widget_array_strategy()) {
        let widgets = ApiCollection::<Widget>::new();
        widgets.parse(&payload).unwrap();

        for element in elements_of(&payload) {
            let Some(id) = element.get("id").and_then(ObjectId::from_value) else {
                continue;
            };
            let last = elements_of(&payload)
                .iter()
                .filter(|e| e.get("id").and_then(ObjectId::from_value).as_ref() == Some(&id))
                .last()
                .and_then(|e| e.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let member = widgets.object_with_identifier(&id).unwrap();
            prop_assert_eq!(Some(member.read(|w| w.name.clone())), last);
        }
    }
}
