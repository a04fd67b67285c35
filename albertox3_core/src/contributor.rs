use serde_yaml::Value;

/// Values which mean "not set" in the contributor table.
const FALSE_DATA: [&str; 10] = [
    "0", "-1", "none", "nan", "false", "/", "()", "[]", "{}", "set()",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contributor {
    pub name: String,
    pub discord_id: Option<u64>,
    pub github_id: Option<u64>,
    pub github_node_id: Option<String>,
}

impl Contributor {
    /// Builds a contributor from raw config values, every falsy value is treated as absent.
    #[must_use]
    pub fn from_values(name: &str, discord: &Value, github_id: &Value, github_node_id: &Value) -> Self {
        Contributor {
            name: name.to_owned(),
            discord_id: present(discord).and_then(|raw| raw.parse().ok()),
            github_id: present(github_id).and_then(|raw| raw.parse().ok()),
            github_node_id: present(github_node_id),
        }
    }

    #[must_use]
    pub fn discord_mention(&self) -> Option<String> {
        self.discord_id.map(|id| format!("<@{id}>"))
    }
}

fn present(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Null => return None,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_owned(),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => return None,
    };

    if FALSE_DATA.contains(&raw.to_lowercase().as_str()) {
        None
    } else {
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_contributor() {
        let c = Contributor::from_values(
            "AlbertUnruh",
            &Value::from(546320163276849162_u64),
            &Value::from(73029826_u64),
            &Value::from("MDQ6VXNlcjczMDI5ODI2"),
        );

        assert_eq!(c.discord_id, Some(546320163276849162));
        assert_eq!(c.github_id, Some(73029826));
        assert_eq!(c.github_node_id.as_deref(), Some("MDQ6VXNlcjczMDI5ODI2"));
        assert_eq!(c.discord_mention().as_deref(), Some("<@546320163276849162>"));
    }

    #[test]
    fn falsy_values_are_absent() {
        for raw in ["0", "-1", "None", "NaN", "false", "/", "()", "[]", "{}", "set()"] {
            let c = Contributor::from_values("x", &Value::from(raw), &Value::Null, &Value::from(raw));
            assert_eq!(c.discord_id, None, "{raw}");
            assert_eq!(c.github_node_id, None, "{raw}");
        }

        let c = Contributor::from_values("x", &Value::from(-1), &Value::from(0), &Value::Bool(false));
        assert_eq!(c, Contributor {
            name: "x".into(),
            discord_id: None,
            github_id: None,
            github_node_id: None,
        });
        assert_eq!(c.discord_mention(), None);
    }
}
