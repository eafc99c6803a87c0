use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_OTP_GROUP_LINK: &str = "https://t.me/+p2ppOgkSosNhZGI1";
pub const DEFAULT_TIMEZONE: &str = "Asia/Dhaka";
pub const DEFAULT_JOB_ID: &str = "daily_merge_job";

/// A number category shown in the "Get Number" menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainButton {
    pub name: String,
    #[serde(default)]
    pub sub_buttons: Vec<String>,
}

impl MainButton {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), sub_buttons: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySchedule {
    /// Local time of the daily merge, `HH:MM` (24h).
    pub time: Option<String>,
    pub timezone: String,
    pub job_id: String,
}

impl Default for DeliverySchedule {
    fn default() -> Self {
        Self {
            time: None,
            timezone: DEFAULT_TIMEZONE.to_owned(),
            job_id: DEFAULT_JOB_ID.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    pub buttons: Vec<MainButton>,
    pub users: BTreeMap<u64, UserProfile>,
    /// main button -> sub button -> index of the next line to hand out
    pub number_progress: BTreeMap<String, BTreeMap<String, usize>>,
    pub blacklist: Vec<u64>,
    pub user_2fa_secrets: BTreeMap<u64, String>,
    pub otp_group_link: String,
    pub file_submission_buttons: Vec<String>,
    pub delivery_schedule: DeliverySchedule,
}

impl Default for Data {
    fn default() -> Self {
        Self {
            buttons: Vec::new(),
            users: BTreeMap::new(),
            number_progress: BTreeMap::new(),
            blacklist: Vec::new(),
            user_2fa_secrets: BTreeMap::new(),
            otp_group_link: DEFAULT_OTP_GROUP_LINK.to_owned(),
            file_submission_buttons: Vec::new(),
            delivery_schedule: DeliverySchedule::default(),
        }
    }
}

#[derive(Clone, Copy)]
enum Kind {
    Array,
    Object,
    String,
}

impl Kind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Kind::Array => value.is_array(),
            Kind::Object => value.is_object(),
            Kind::String => value.is_string(),
        }
    }
}

const LAYOUT: [(&str, Kind); 8] = [
    ("buttons", Kind::Array),
    ("users", Kind::Object),
    ("number_progress", Kind::Object),
    ("blacklist", Kind::Array),
    ("user_2fa_secrets", Kind::Object),
    ("otp_group_link", Kind::String),
    ("file_submission_buttons", Kind::Array),
    ("delivery_schedule", Kind::Object),
];

impl Data {
    /// Builds the data from an arbitrary json document, replacing every missing or
    /// malformed key with its default. The flag tells whether anything was fixed.
    pub fn repair(value: Value) -> (Self, bool) {
        let defaults = match serde_json::to_value(Data::default()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let mut fixed = false;
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                log::warn!("data root is not an object ({}), resetting it", type_name(&other));
                fixed = true;
                Map::new()
            }
        };

        for (key, kind) in LAYOUT {
            let valid = map.get(key).map(|v| kind.matches(v)).unwrap_or(false);
            if !valid {
                log::warn!("key '{}' is missing or has the wrong type, resetting it to the default value", key);
                map.insert(key.to_owned(), defaults.get(key).cloned().unwrap_or(Value::Null));
                fixed = true;
            }
        }

        if let Some(Value::Array(items)) = map.remove("buttons") {
            let (buttons, converted) = repair_buttons(items);
            fixed |= converted;
            map.insert("buttons".to_owned(), Value::Array(buttons));
        }

        // every key now has the right json type, but the nested shape may still be off
        let mut data = Data::default();
        macro_rules! take {
            ($field:ident) => {
                match map.remove(stringify!($field)).map(serde_json::from_value) {
                    Some(Ok(value)) => data.$field = value,
                    Some(Err(e)) => {
                        log::warn!("key '{}' is malformed ({}), resetting it to the default value", stringify!($field), e);
                        fixed = true;
                    }
                    None => fixed = true,
                }
            };
        }
        take!(buttons);
        take!(users);
        take!(number_progress);
        take!(blacklist);
        take!(user_2fa_secrets);
        take!(otp_group_link);
        take!(file_submission_buttons);
        take!(delivery_schedule);
        (data, fixed)
    }
}

fn repair_buttons(items: Vec<Value>) -> (Vec<Value>, bool) {
    let mut fixed = false;
    let mut buttons = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(name) => {
                log::info!("converting old button '{}' to the new format", name);
                buttons.push(serde_json::json!({ "name": name, "sub_buttons": [] }));
                fixed = true;
            }
            Value::Object(mut button) if button.get("name").map(Value::is_string).unwrap_or(false) => {
                if !button.get("sub_buttons").map(Value::is_array).unwrap_or(false) {
                    button.insert("sub_buttons".to_owned(), Value::Array(Vec::new()));
                    fixed = true;
                }
                buttons.push(Value::Object(button));
            }
            other => {
                log::warn!("invalid item in 'buttons': {}, skipping", other);
                fixed = true;
            }
        }
    }
    (buttons, fixed)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_gets_defaults() {
        let (data, fixed) = Data::repair(json!({}));
        assert!(fixed);
        assert_eq!(data, Data::default());
    }

    #[test]
    fn valid_document_is_untouched() {
        let mut original = Data::default();
        original.buttons.push(MainButton { name: "OTT".into(), sub_buttons: vec!["Netflix".into()] });
        original.blacklist.push(42);
        original.users.insert(
            42,
            UserProfile { first_name: "Rafi".into(), last_name: None, username: Some("rafi".into()) },
        );
        original.delivery_schedule.time = Some("19:45".into());
        let value = serde_json::to_value(&original).unwrap();

        let (data, fixed) = Data::repair(value);
        assert!(!fixed);
        assert_eq!(data, original);
    }

    #[test]
    fn wrong_types_are_reset_and_the_rest_survives() {
        let value = json!({
            "buttons": "nope",
            "users": {},
            "number_progress": {"OTT": {"Netflix": 3}},
            "blacklist": {},
            "user_2fa_secrets": {},
            "otp_group_link": "",
            "file_submission_buttons": ["Netflix"],
            "delivery_schedule": {"time": "10:30", "timezone": "Asia/Dhaka", "job_id": "daily_merge_job"}
        });
        let (data, fixed) = Data::repair(value);
        assert!(fixed);
        assert!(data.buttons.is_empty());
        assert!(data.blacklist.is_empty());
        assert_eq!(data.number_progress["OTT"]["Netflix"], 3);
        assert_eq!(data.otp_group_link, "");
        assert_eq!(data.file_submission_buttons, vec!["Netflix".to_owned()]);
        assert_eq!(data.delivery_schedule.time.as_deref(), Some("10:30"));
    }

    #[test]
    fn legacy_buttons_are_converted() {
        let value = json!({
            "buttons": ["OTT", {"name": "Mail"}, {"name": "Social", "sub_buttons": ["FB"]}, 12, {"title": "x"}]
        });
        let (data, fixed) = Data::repair(value);
        assert!(fixed);
        assert_eq!(
            data.buttons,
            vec![
                MainButton::new("OTT"),
                MainButton::new("Mail"),
                MainButton { name: "Social".into(), sub_buttons: vec!["FB".into()] },
            ]
        );
    }

    #[test]
    fn non_object_root_is_replaced() {
        let (data, fixed) = Data::repair(json!([1, 2, 3]));
        assert!(fixed);
        assert_eq!(data, Data::default());
    }

    #[test]
    fn user_ids_are_stored_as_string_keys() {
        let mut data = Data::default();
        data.user_2fa_secrets.insert(7, "JBSWY3DPEHPK3PXP".into());
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["user_2fa_secrets"]["7"], "JBSWY3DPEHPK3PXP");
    }
}
